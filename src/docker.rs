use crate::runner::{Invocation, ProcessRunner};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanupStatus {
    Pruned,
    Failed(String),
}

/// `docker image prune -f`. Failures are logged and returned, never raised:
/// by the time this runs the image has already been published.
pub async fn prune_images(runner: &dyn ProcessRunner, docker_bin: &str, cwd: &Path) -> CleanupStatus {
    let invocation = Invocation::new(docker_bin, ["image", "prune", "-f"], cwd);
    tracing::info!(command = %invocation.display(), "pruning dangling images");

    match runner.run(&invocation).await {
        Ok(out) if out.success() => CleanupStatus::Pruned,
        Ok(out) => {
            let reason = format!("{} exited with code {}", invocation.display(), out.code);
            tracing::warn!("cleanup failed: {reason}");
            CleanupStatus::Failed(reason)
        }
        Err(e) => {
            tracing::warn!("cleanup failed: {e}");
            CleanupStatus::Failed(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockRunner;

    #[tokio::test]
    async fn prune_success() {
        let mock = MockRunner::new();
        let status = prune_images(&mock, "docker", Path::new("/tmp")).await;
        assert_eq!(status, CleanupStatus::Pruned);
        assert_eq!(mock.calls()[0].display(), "docker image prune -f");
    }

    #[tokio::test]
    async fn prune_failure_is_reported_not_raised() {
        let mock = MockRunner::new();
        mock.add_response(125, "Cannot connect to the Docker daemon\n");
        let status = prune_images(&mock, "docker", Path::new("/tmp")).await;
        assert_eq!(
            status,
            CleanupStatus::Failed("docker image prune -f exited with code 125".to_string())
        );
    }
}
