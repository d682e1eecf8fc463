use crate::error::{PublishError, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::io::Write as _;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;

/// One external command to run to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    /// Also copy combined output to this file (truncated first).
    pub tee: Option<PathBuf>,
}

impl Invocation {
    pub fn new<I, S>(program: impl Into<String>, args: I, cwd: impl Into<PathBuf>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            cwd: cwd.into(),
            tee: None,
        }
    }

    pub fn tee_to(mut self, path: impl Into<PathBuf>) -> Self {
        self.tee = Some(path.into());
        self
    }

    /// `program arg1 arg2`, for messages.
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProcessOutput {
    pub code: i32,
    /// Interleaved stdout and stderr lines.
    pub output: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.code == 0
    }
}

/// Seam between the pipeline and real binaries.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    async fn run(&self, invocation: &Invocation) -> Result<ProcessOutput>;
}

/// Runs commands on the host, echoing their output to the terminal as it
/// arrives.
#[derive(Debug, Clone, Default)]
pub struct SystemRunner {
    quiet: bool,
}

impl SystemRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture output without echoing it.
    pub fn quiet() -> Self {
        Self { quiet: true }
    }
}

#[async_trait]
impl ProcessRunner for SystemRunner {
    async fn run(&self, invocation: &Invocation) -> Result<ProcessOutput> {
        tracing::debug!(command = %invocation.display(), cwd = %invocation.cwd.display(), "spawning");

        let mut child = Command::new(&invocation.program)
            .args(&invocation.args)
            .current_dir(&invocation.cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| PublishError::Spawn {
                program: invocation.program.clone(),
                source,
            })?;

        let (tx, mut rx) = mpsc::unbounded_channel::<Vec<u8>>();
        if let Some(stdout) = child.stdout.take() {
            forward_lines(stdout, tx.clone());
        }
        if let Some(stderr) = child.stderr.take() {
            forward_lines(stderr, tx.clone());
        }
        drop(tx);

        let mut log = match &invocation.tee {
            Some(path) => {
                let file = tokio::fs::File::create(path)
                    .await
                    .map_err(|e| PublishError::io(path, e))?;
                Some((file, path))
            }
            None => None,
        };

        let mut output = String::new();
        while let Some(line) = rx.recv().await {
            if !self.quiet {
                let mut stdout = std::io::stdout().lock();
                let _ = stdout.write_all(&line).and_then(|_| stdout.flush());
            }
            if let Some((file, path)) = log.as_mut() {
                file.write_all(&line)
                    .await
                    .map_err(|e| PublishError::io(path.as_path(), e))?;
            }
            output.push_str(&String::from_utf8_lossy(&line));
        }

        if let Some((mut file, path)) = log {
            file.flush().await.map_err(|e| PublishError::io(path, e))?;
        }

        let status = child
            .wait()
            .await
            .map_err(|e| PublishError::io(&invocation.cwd, e))?;
        let code = status.code().unwrap_or(if status.success() { 0 } else { 1 });
        tracing::debug!(command = %invocation.display(), code, "process exited");

        Ok(ProcessOutput { code, output })
    }
}

/// Send newline-terminated raw lines from `reader` until EOF. Bytes are not
/// decoded here, so the pipe keeps draining whatever the tool prints.
fn forward_lines<R>(reader: R, tx: mpsc::UnboundedSender<Vec<u8>>)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut r = BufReader::new(reader);
        loop {
            let mut buf = Vec::new();
            match r.read_until(b'\n', &mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(_) => {
                    if !buf.ends_with(b"\n") {
                        buf.push(b'\n');
                    }
                    let _ = tx.send(buf);
                }
            }
        }
    });
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn captures_stdout_and_stderr() {
        let dir = TempDir::new().unwrap();
        let inv = Invocation::new("sh", ["-c", "echo out; echo err 1>&2"], dir.path());
        let out = SystemRunner::quiet().run(&inv).await.unwrap();
        assert!(out.success());
        assert!(out.output.contains("out\n"));
        assert!(out.output.contains("err\n"));
    }

    #[tokio::test]
    async fn reports_exit_code() {
        let dir = TempDir::new().unwrap();
        let inv = Invocation::new("sh", ["-c", "exit 7"], dir.path());
        let out = SystemRunner::quiet().run(&inv).await.unwrap();
        assert_eq!(out.code, 7);
        assert!(!out.success());
    }

    #[tokio::test]
    async fn tees_output_to_file() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("build.log");
        std::fs::write(&log, "previous run\n").unwrap();

        let inv = Invocation::new("sh", ["-c", "echo building; exit 2"], dir.path()).tee_to(&log);
        let out = SystemRunner::quiet().run(&inv).await.unwrap();

        assert_eq!(out.code, 2);
        assert_eq!(std::fs::read_to_string(&log).unwrap(), "building\n");
    }

    #[tokio::test]
    async fn invalid_utf8_does_not_stop_draining() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("build.log");
        let script = "printf 'start\\n\\377\\n'; i=0; \
                      while [ $i -lt 20000 ]; do echo line$i; i=$((i+1)); done; echo after";
        let inv = Invocation::new("sh", ["-c", script], dir.path()).tee_to(&log);
        let out = SystemRunner::quiet().run(&inv).await.unwrap();

        assert_eq!(out.code, 0);
        assert!(out.output.starts_with("start\n\u{FFFD}\n"));
        assert!(out.output.ends_with("after\n"));

        let bytes = std::fs::read(&log).unwrap();
        assert!(bytes.starts_with(b"start\n\xff\n"));
        assert!(bytes.ends_with(b"line19999\nafter\n"));
    }

    #[tokio::test]
    async fn unterminated_last_line_is_kept() {
        let dir = TempDir::new().unwrap();
        let inv = Invocation::new("sh", ["-c", "printf 'no newline'"], dir.path());
        let out = SystemRunner::quiet().run(&inv).await.unwrap();
        assert_eq!(out.output, "no newline\n");
    }

    #[tokio::test]
    async fn missing_binary_is_a_spawn_error() {
        let dir = TempDir::new().unwrap();
        let inv = Invocation::new("svc-publish-no-such-binary", Vec::<String>::new(), dir.path());
        let err = SystemRunner::quiet().run(&inv).await.unwrap_err();
        assert!(matches!(err, PublishError::Spawn { .. }));
    }

    #[test]
    fn display_joins_program_and_args() {
        let inv = Invocation::new("packer", ["init", "build.pkr.hcl"], "/tmp");
        assert_eq!(inv.display(), "packer init build.pkr.hcl");
    }
}
