use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PublishError>;

/// Everything that can stop (or degrade) a publish run.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("config file not found: {}", path.display())]
    ConfigMissing { path: PathBuf },

    #[error("failed to parse config file {}: {source}", path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: dotenvy::Error,
    },

    #[error("invalid service name '{name}': must be a single directory name")]
    InvalidServiceName { name: String },

    #[error("build context directory not found: {}", path.display())]
    ContextMissing { path: PathBuf },

    #[error("build descriptor not found: {}", path.display())]
    DescriptorMissing { path: PathBuf },

    #[error("malformed version '{value}': expected MAJOR.MINOR.PATCH")]
    MalformedVersion { value: String },

    #[error("cannot apply {mode} bump to {version}: component overflows")]
    VersionOverflow { version: String, mode: String },

    #[error("failed to parse project metadata {}: {source}", path.display())]
    MetadataParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{step} failed with exit code {code}")]
    ExternalTool { step: String, code: i32 },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PublishError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PublishError::Io {
            path: path.into(),
            source,
        }
    }

    /// Process exit status for this failure. External tool failures
    /// propagate the tool's own code.
    pub fn exit_code(&self) -> i32 {
        match self {
            PublishError::ExternalTool { code, .. } if *code != 0 => *code,
            _ => 1,
        }
    }
}
