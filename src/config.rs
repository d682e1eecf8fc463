use crate::env::EnvFile;
use crate::error::Result;
use std::path::{Path, PathBuf};

pub const ENV_FILE_NAME: &str = ".env";
pub const REGISTRY_KEY: &str = "REGISTRY_URL";
pub const PACKER_BIN_KEY: &str = "PACKER_BIN";
pub const DOCKER_BIN_KEY: &str = "DOCKER_BIN";

/// Settings every later step reads, resolved once from the env file.
#[derive(Debug, Clone)]
pub struct Config {
    pub root: PathBuf,
    /// Registry host images are tagged and pushed to.
    pub registry: String,
    pub packer_bin: String,
    pub docker_bin: String,
}

impl Config {
    /// Load `<root>/.env`, or `env_file` when given.
    pub fn load(root: &Path, env_file: Option<&Path>) -> Result<Self> {
        let path = env_file
            .map(Path::to_path_buf)
            .unwrap_or_else(|| root.join(ENV_FILE_NAME));
        let env = EnvFile::load(&path)?;
        Ok(Self::from_env(root, &env))
    }

    pub fn from_env(root: &Path, env: &EnvFile) -> Self {
        let registry = env
            .get(REGISTRY_KEY)
            .map(|r| r.trim().trim_end_matches('/').to_string())
            .unwrap_or_default();
        if registry.is_empty() {
            tracing::warn!("{REGISTRY_KEY} is not set; images will be tagged without a registry host");
        }

        Self {
            root: root.to_path_buf(),
            registry,
            packer_bin: env.get_or(PACKER_BIN_KEY, "packer"),
            docker_bin: env.get_or(DOCKER_BIN_KEY, "docker"),
        }
    }

    /// `<registry>/<service>`, or just the service when no registry is set.
    pub fn repository(&self, service: &str) -> String {
        if self.registry.is_empty() {
            service.to_string()
        } else {
            format!("{}/{}", self.registry, service)
        }
    }
}
