use crate::version::BumpMode;
use clap::Parser;
use std::path::PathBuf;

/// Build a service image with packer and push it to the configured registry
#[derive(Parser, Debug, Clone)]
#[command(
    name = "svc-publish",
    version,
    about = "Build a service image with packer and push it to the configured registry",
    long_about = "Reads <root>/.env, detects the base image from <root>/<service>/Dockerfile, \
                  bumps the version in <root>/<service>/package.json, writes build.pkr.hcl and \
                  runs `packer init` + `packer build` in the service directory.\n\n\
                  Examples:\n  \
                  svc-publish --name api\n  \
                  svc-publish --name api --minor --log\n  \
                  svc-publish --name worker --major --cleanup"
)]
pub struct CliArgs {
    #[arg(short = 'n', long, value_name = "SERVICE", help = "Service directory to build")]
    pub name: String,

    #[arg(long, help = "Copy `packer build` output to <root>/build.log")]
    pub log: bool,

    #[arg(long, help = "Prune dangling local images after a successful build")]
    pub cleanup: bool,

    #[arg(long, conflicts_with = "major", help = "Bump the minor version instead of patch")]
    pub minor: bool,

    #[arg(long, help = "Bump the major version instead of patch")]
    pub major: bool,

    #[arg(
        long,
        env = "SVC_PUBLISH_ROOT",
        value_name = "DIR",
        help = "Directory holding .env and the service directories [default: current directory]"
    )]
    pub root: Option<PathBuf>,

    #[arg(long, value_name = "PATH", help = "Env file to load instead of <root>/.env")]
    pub env_file: Option<PathBuf>,

    #[arg(long, help = "Resolve and print the template without writing or building anything")]
    pub dry_run: bool,

    #[arg(long, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(short = 'v', long, help = "Verbose logging")]
    pub verbose: bool,

    #[arg(short = 'q', long, conflicts_with = "verbose", help = "Only log errors")]
    pub quiet: bool,
}

/// Parsed run options. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    pub service: String,
    pub root: PathBuf,
    pub env_file: Option<PathBuf>,
    pub log: bool,
    pub cleanup: bool,
    pub bump: BumpMode,
    pub dry_run: bool,
}

/// Exit status for a failed `try_parse`: 1 for usage errors, 0 for
/// `--help` / `--version` (clap reports those as errors too).
pub fn usage_exit_code(err: &clap::Error) -> i32 {
    if err.use_stderr() {
        1
    } else {
        0
    }
}

impl CliArgs {
    pub fn bump_mode(&self) -> BumpMode {
        if self.major {
            BumpMode::Major
        } else if self.minor {
            BumpMode::Minor
        } else {
            BumpMode::Patch
        }
    }

    pub fn into_options(self, cwd: PathBuf) -> Options {
        let bump = self.bump_mode();
        Options {
            service: self.name,
            root: self.root.unwrap_or(cwd),
            env_file: self.env_file,
            log: self.log,
            cleanup: self.cleanup,
            bump,
            dry_run: self.dry_run,
        }
    }
}
