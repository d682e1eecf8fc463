use crate::cli::Options;
use crate::config::Config;
use crate::context::BuildContext;
use crate::docker::{self, CleanupStatus};
use crate::error::Result;
use crate::image;
use crate::packer;
use crate::runner::ProcessRunner;
use crate::template::{self, TemplateVars};
use crate::version;
use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Loading,
    Validating,
    Detecting,
    Versioning,
    Templating,
    Building,
    Cleaning,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Loading => "loading",
            Stage::Validating => "validating",
            Stage::Detecting => "detecting",
            Stage::Versioning => "versioning",
            Stage::Templating => "templating",
            Stage::Building => "building",
            Stage::Cleaning => "cleaning",
            Stage::Done => "done",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub service: String,
    pub version: String,
    pub base_image: String,
    pub template_path: PathBuf,
    /// Set when `--dry-run` stopped the run before anything was written.
    pub rendered: Option<String>,
    pub cleanup: Option<CleanupStatus>,
}

/// Ordered, fail-fast publish run. Only the cleanup stage is allowed to fail
/// without failing the run.
pub struct Pipeline<'a> {
    options: &'a Options,
    runner: &'a dyn ProcessRunner,
}

impl<'a> Pipeline<'a> {
    pub fn new(options: &'a Options, runner: &'a dyn ProcessRunner) -> Self {
        Self { options, runner }
    }

    pub async fn run(&self) -> Result<RunReport> {
        let opts = self.options;

        enter(Stage::Loading);
        let config = Config::load(&opts.root, opts.env_file.as_deref())?;
        self.run_with_config(&config).await
    }

    /// Everything after config loading; split out so callers that already
    /// hold a [`Config`] can skip the env file.
    pub async fn run_with_config(&self, config: &Config) -> Result<RunReport> {
        let opts = self.options;

        enter(Stage::Validating);
        let ctx = BuildContext::locate(&config.root, &opts.service)?;

        enter(Stage::Detecting);
        let base_image = image::detect_from_file(&ctx.descriptor);

        enter(Stage::Versioning);
        let resolved = version::resolve(&ctx.metadata, opts.bump, !opts.dry_run)?;
        let version = resolved.version();

        enter(Stage::Templating);
        let repository = config.repository(&ctx.service);
        let vars = TemplateVars {
            service: &ctx.service,
            version: &version,
            base_image: &base_image,
            repository: &repository,
        };

        let mut report = RunReport {
            service: ctx.service.clone(),
            version: version.clone(),
            base_image: base_image.clone(),
            template_path: ctx.template.clone(),
            rendered: None,
            cleanup: None,
        };

        if opts.dry_run {
            tracing::info!("dry run: skipping template write, build and cleanup");
            report.rendered = Some(template::render(&vars));
            enter(Stage::Done);
            return Ok(report);
        }
        template::write(&ctx.template, &vars)?;

        enter(Stage::Building);
        packer::build(self.runner, &config.packer_bin, &ctx, &version, opts.log).await?;
        tracing::info!(image = %repository, version = %version, "published");

        if opts.cleanup {
            enter(Stage::Cleaning);
            report.cleanup =
                Some(docker::prune_images(self.runner, &config.docker_bin, &ctx.dir).await);
        }

        enter(Stage::Done);
        Ok(report)
    }
}

fn enter(stage: Stage) {
    tracing::debug!(%stage, "entering stage");
}
