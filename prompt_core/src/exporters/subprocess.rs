use crate::{error::*, exporters::Exporter};
use async_trait::async_trait;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::{JoinError, JoinHandle};
use tokio::time::Instant;
use tracing::{debug, warn};

pub const DEFAULT_SHELL: &str = "sh";

type CaptureTask = JoinHandle<std::io::Result<Vec<u8>>>;

/// Runs a shell command and serves its standard output.
#[derive(Debug, Clone)]
pub struct SubprocessExporter {
    command: String,
    shell: String,
    timeout: Option<Duration>,
}

#[derive(Debug)]
struct Completed {
    status: ExitStatus,
    stdout: Vec<u8>,
}

impl SubprocessExporter {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            shell: DEFAULT_SHELL.to_string(),
            timeout: None,
        }
    }

    pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = shell.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn run(&self) -> Result<Vec<u8>> {
        let mut child = self.spawn()?;
        // The probe leads its own process group, whose id is the child's pid.
        let group = child.id();
        let stdout = self.capture(child.stdout.take(), "stdout")?;
        let stderr = self.capture(child.stderr.take(), "stderr")?;
        let abort_handles = [stdout.abort_handle(), stderr.abort_handle()];

        let started = Instant::now();
        let completed = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.collect(&mut child, stdout, stderr))
                .await
                .ok(),
            None => Some(self.collect(&mut child, stdout, stderr).await),
        };

        let Some(completed) = completed else {
            let limit = self.timeout.unwrap_or_default();
            for handle in &abort_handles {
                handle.abort();
            }
            self.terminate(&mut child, group).await;
            return Err(PromptError::ProbeTimeout {
                command: self.command.clone(),
                after: limit,
            });
        };

        let completed = completed?;
        let elapsed = started.elapsed();

        if !completed.status.success() {
            return Err(PromptError::NonZeroExit {
                command: self.command.clone(),
                status: completed.status,
            });
        }

        debug!("Process {:?} finished successfully in {:?}", self.command, elapsed);
        Ok(terminate_line(completed.stdout))
    }

    fn spawn(&self) -> Result<Child> {
        let mut command = Command::new(&self.shell);
        command
            .arg("-c")
            .arg(&self.command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        #[cfg(unix)]
        {
            command.process_group(0);
        }

        command.spawn().map_err(|source| PromptError::Spawn {
            command: self.command.clone(),
            source,
        })
    }

    /// Kills everything the probe started, then reaps the shell.
    async fn terminate(&self, child: &mut Child, group: Option<u32>) {
        #[cfg(unix)]
        {
            use nix::errno::Errno;
            use nix::sys::signal::{killpg, Signal};
            use nix::unistd::Pid;

            if let Some(pid) = group {
                match killpg(Pid::from_raw(pid as i32), Signal::SIGKILL) {
                    Ok(()) | Err(Errno::ESRCH) => {}
                    Err(e) => warn!("Failed to kill process group of {:?}: {}", self.command, e),
                }
            }
        }
        #[cfg(not(unix))]
        let _ = group;

        // `id()` is gone once the shell has been reaped.
        if child.id().is_some() {
            if let Err(e) = child.kill().await {
                warn!("Failed to kill timed out process {:?}: {}", self.command, e);
            }
        }
    }

    fn capture<R>(&self, stream: Option<R>, name: &'static str) -> Result<CaptureTask>
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let mut stream = stream.ok_or_else(|| PromptError::CaptureIncomplete {
            command: self.command.clone(),
            stream: name,
        })?;

        Ok(tokio::spawn(async move {
            let mut buf = Vec::new();
            stream.read_to_end(&mut buf).await?;
            Ok(buf)
        }))
    }

    async fn collect(
        &self,
        child: &mut Child,
        stdout: CaptureTask,
        stderr: CaptureTask,
    ) -> Result<Completed> {
        let status = child.wait().await;
        self.finish(status, stdout, stderr).await
    }

    // Both capture tasks are joined before the exit status is looked at.
    async fn finish(
        &self,
        status: std::io::Result<ExitStatus>,
        stdout: CaptureTask,
        stderr: CaptureTask,
    ) -> Result<Completed> {
        let status = match status {
            Ok(status) => status,
            Err(e) => {
                stdout.abort();
                stderr.abort();
                return Err(e.into());
            }
        };
        let (stdout, stderr) = tokio::join!(stdout, stderr);

        let stderr = self.settle(stderr, "stderr");
        if let Ok(bytes) = &stderr {
            if !bytes.is_empty() {
                warn!(
                    "[stderr from {:?}] {}",
                    self.command,
                    String::from_utf8_lossy(bytes).trim_end()
                );
            }
        }

        let stdout = self.settle(stdout, "stdout")?;
        stderr?;

        Ok(Completed { status, stdout })
    }

    fn settle(
        &self,
        joined: std::result::Result<std::io::Result<Vec<u8>>, JoinError>,
        stream: &'static str,
    ) -> Result<Vec<u8>> {
        match joined {
            Ok(Ok(bytes)) => Ok(bytes),
            Ok(Err(source)) => Err(PromptError::Capture {
                command: self.command.clone(),
                stream,
                source,
            }),
            Err(_) => Err(PromptError::CaptureIncomplete {
                command: self.command.clone(),
                stream,
            }),
        }
    }
}

/// Metric text must end with a newline so outputs can be concatenated.
pub(crate) fn terminate_line(mut bytes: Vec<u8>) -> Vec<u8> {
    if bytes.last().is_some_and(|b| *b != b'\n') {
        bytes.push(b'\n');
    }
    bytes
}

#[async_trait]
impl Exporter for SubprocessExporter {
    async fn produce(&self) -> Result<Vec<u8>> {
        self.run().await
    }

    fn describe(&self) -> String {
        format!("{} -c {:?}", self.shell, self.command)
    }
}
