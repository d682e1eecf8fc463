use crate::context::{BuildContext, TEMPLATE_FILE};
use crate::error::{PublishError, Result};
use crate::runner::{Invocation, ProcessRunner};

/// `packer init` then `packer build -var version=<v>`, both inside the
/// build context. The build step's output is teed to the context's log
/// file when `tee_log` is set.
pub async fn build(
    runner: &dyn ProcessRunner,
    packer_bin: &str,
    ctx: &BuildContext,
    version: &str,
    tee_log: bool,
) -> Result<()> {
    let init = Invocation::new(packer_bin, ["init", TEMPLATE_FILE], &ctx.dir);
    run_step(runner, "packer init", &init).await?;

    let version_var = format!("version={version}");
    let mut execute = Invocation::new(
        packer_bin,
        ["build", "-var", version_var.as_str(), TEMPLATE_FILE],
        &ctx.dir,
    );
    if tee_log {
        execute = execute.tee_to(&ctx.log);
    }
    run_step(runner, "packer build", &execute).await?;

    Ok(())
}

async fn run_step(runner: &dyn ProcessRunner, step: &str, invocation: &Invocation) -> Result<()> {
    tracing::info!(command = %invocation.display(), "running {step}");
    let out = runner.run(invocation).await?;
    if !out.success() {
        if let Some(log) = &invocation.tee {
            tracing::error!(log = %log.display(), "{step} failed; output kept for inspection");
        }
        return Err(PublishError::ExternalTool {
            step: step.to_string(),
            code: out.code,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockRunner;
    use std::fs;
    use tempfile::TempDir;

    fn context(root: &TempDir) -> BuildContext {
        fs::create_dir(root.path().join("api")).unwrap();
        fs::write(root.path().join("api/Dockerfile"), "FROM alpine\n").unwrap();
        BuildContext::locate(root.path(), "api").unwrap()
    }

    #[tokio::test]
    async fn init_then_build_with_version_var() {
        let root = TempDir::new().unwrap();
        let ctx = context(&root);
        let mock = MockRunner::new();

        build(&mock, "packer", &ctx, "2.4.0", false).await.unwrap();

        let calls = mock.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].display(), "packer init build.pkr.hcl");
        assert_eq!(calls[1].display(), "packer build -var version=2.4.0 build.pkr.hcl");
        assert!(calls.iter().all(|c| c.cwd == ctx.dir));
        assert_eq!(calls[1].tee, None);
    }

    #[tokio::test]
    async fn failed_init_skips_build() {
        let root = TempDir::new().unwrap();
        let ctx = context(&root);
        let mock = MockRunner::new();
        mock.add_response(1, "plugin download failed\n");

        let err = build(&mock, "packer", &ctx, "1.0.0", true).await.unwrap_err();
        assert!(matches!(err, PublishError::ExternalTool { ref step, code: 1 } if step == "packer init"));
        assert_eq!(mock.calls().len(), 1);
    }

    #[tokio::test]
    async fn failed_build_keeps_log_and_propagates_code() {
        let root = TempDir::new().unwrap();
        let ctx = context(&root);
        let mock = MockRunner::new();
        mock.add_response(0, "");
        mock.add_response(3, "Build 'docker' errored\n");

        let err = build(&mock, "packer", &ctx, "1.0.0", true).await.unwrap_err();
        assert_eq!(err.exit_code(), 3);
        assert_eq!(mock.calls()[1].tee.as_deref(), Some(ctx.log.as_path()));
        assert_eq!(fs::read_to_string(&ctx.log).unwrap(), "Build 'docker' errored\n");
    }
}
