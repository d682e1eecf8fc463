use crate::error::{PublishError, Result};
use std::path::{Component, Path, PathBuf};

pub const DESCRIPTOR_FILE: &str = "Dockerfile";
pub const METADATA_FILE: &str = "package.json";
pub const TEMPLATE_FILE: &str = "build.pkr.hcl";
pub const LOG_FILE: &str = "build.log";

/// The per-service directory holding everything one image build needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildContext {
    pub service: String,
    pub dir: PathBuf,
    pub descriptor: PathBuf,
    pub metadata: PathBuf,
    pub template: PathBuf,
    pub log: PathBuf,
}

impl BuildContext {
    /// Resolve `<root>/<service>` and check the directory and its
    /// descriptor exist. Nothing is created or repaired here.
    pub fn locate(root: &Path, service: &str) -> Result<Self> {
        validate_service_name(service)?;

        let dir = root.join(service);
        if !dir.is_dir() {
            return Err(PublishError::ContextMissing { path: dir });
        }

        let descriptor = dir.join(DESCRIPTOR_FILE);
        if !descriptor.is_file() {
            return Err(PublishError::DescriptorMissing { path: descriptor });
        }

        Ok(Self {
            service: service.to_string(),
            metadata: dir.join(METADATA_FILE),
            template: dir.join(TEMPLATE_FILE),
            log: root.join(LOG_FILE),
            descriptor,
            dir,
        })
    }
}

fn validate_service_name(service: &str) -> Result<()> {
    let mut components = Path::new(service).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(PublishError::InvalidServiceName {
            name: service.to_string(),
        }),
    }
}
