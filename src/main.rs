use anyhow::Result;
use clap::Parser;
use svc_publish::cli::{self, CliArgs};
use svc_publish::docker::CleanupStatus;
use svc_publish::logging;
use svc_publish::runner::SystemRunner;
use svc_publish::Pipeline;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = match CliArgs::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let code = cli::usage_exit_code(&e);
            let _ = e.print();
            std::process::exit(code);
        }
    };

    logging::init(logging::resolve_level(
        args.log_level.as_deref(),
        args.verbose,
        args.quiet,
    ));

    let cwd = std::env::current_dir()?;
    let options = args.into_options(cwd);
    let runner = SystemRunner::new();

    match Pipeline::new(&options, &runner).run().await {
        Ok(report) => {
            if let Some(rendered) = &report.rendered {
                print!("{rendered}");
                return Ok(());
            }
            println!(
                "✅ {} {} built from {} and pushed",
                report.service, report.version, report.base_image
            );
            if let Some(CleanupStatus::Failed(reason)) = &report.cleanup {
                eprintln!("⚠️  cleanup failed: {reason}");
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(e.exit_code());
        }
    }
}
