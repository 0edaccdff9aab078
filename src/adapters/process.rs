use crate::domain::model::InvocationOutcome;
use crate::domain::ports::Invoker;
use crate::domain::settings::{ProcessSettings, MAX_MODEL_OUTPUT_BYTES};
use crate::utils::error::{ModerationError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdout, Command};

/// How long the pipes may stay open once the script itself has exited.
const OUTPUT_DRAIN: Duration = Duration::from_millis(250);

/// 以子行程執行模型腳本：`<interpreter> <script> <text>`
///
/// 路徑在建構時解析並檢查；缺少工作目錄或腳本屬於設定錯誤，不會啟動任何行程。
#[derive(Debug, Clone)]
pub struct ProcessInvoker {
    interpreter: PathBuf,
    script: PathBuf,
    working_directory: PathBuf,
    deadline: Duration,
}

impl ProcessInvoker {
    pub fn new(settings: &ProcessSettings) -> Result<Self> {
        if settings.deadline.is_zero() {
            return Err(ModerationError::InvalidConfigValueError {
                field: "model.timeout_seconds".to_string(),
                value: "0".to_string(),
                reason: "Deadline must be greater than zero".to_string(),
            });
        }

        let working_directory =
            std::path::absolute(&settings.working_directory).map_err(|e| {
                ModerationError::ConfigError {
                    message: format!(
                        "Invalid model working directory '{}': {}",
                        settings.working_directory.display(),
                        e
                    ),
                }
            })?;
        let script = resolve_against(&working_directory, &settings.script_path);
        verify_layout(&working_directory, &script)?;

        let interpreter = resolve_interpreter(settings, &working_directory);
        tracing::debug!("Using model interpreter: {}", interpreter.display());

        Ok(Self {
            interpreter,
            script,
            working_directory,
            deadline: settings.deadline,
        })
    }

    pub fn interpreter(&self) -> &Path {
        &self.interpreter
    }

    pub fn script(&self) -> &Path {
        &self.script
    }

    fn command(&self, text: &str) -> Command {
        let mut command = Command::new(&self.interpreter);
        command
            .arg(&self.script)
            .arg(text)
            .current_dir(&self.working_directory)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        command.process_group(0);
        command
    }
}

#[async_trait]
impl Invoker for ProcessInvoker {
    async fn invoke(&self, text: &str) -> InvocationOutcome {
        // the files may have gone away since startup
        if let Err(e) = verify_layout(&self.working_directory, &self.script) {
            tracing::error!("❌ {}", e);
            return InvocationOutcome::ProcessFailure {
                exit_code: None,
                reason: e.to_string(),
            };
        }

        tracing::debug!("Starting model script: {}", self.script.display());

        let mut child = match self.command(text).spawn() {
            Ok(child) => child,
            Err(e) => {
                return InvocationOutcome::ProcessFailure {
                    exit_code: None,
                    reason: format!("Failed to start {}: {}", self.interpreter.display(), e),
                };
            }
        };

        let group = ProcessGroup::of(&child);

        let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
            group.kill();
            let _ = child.kill().await;
            return InvocationOutcome::ProcessFailure {
                exit_code: None,
                reason: "Child output streams were not captured".to_string(),
            };
        };

        let mut output = Vec::new();
        let finished = tokio::time::timeout(
            self.deadline,
            run_to_exit(&mut child, stdout, stderr, &mut output),
        )
        .await;

        match finished {
            Ok(Ok(status)) if status.success() => {
                tracing::debug!("Model script executed successfully");
                InvocationOutcome::Success(output)
            }
            Ok(Ok(status)) => {
                tracing::debug!(
                    "Model script output: {}",
                    String::from_utf8_lossy(&output).trim()
                );
                tracing::error!("Model script failed with {}", status);
                InvocationOutcome::ProcessFailure {
                    exit_code: status.code(),
                    reason: format!("Model script failed with {}", status),
                }
            }
            Ok(Err(e)) => {
                group.kill();
                if let Err(kill_err) = child.kill().await {
                    tracing::debug!("Kill after I/O error failed: {}", kill_err);
                }
                InvocationOutcome::ProcessFailure {
                    exit_code: None,
                    reason: format!("Error reading model script output: {}", e),
                }
            }
            Err(_) => {
                group.kill();
                if let Err(kill_err) = child.kill().await {
                    tracing::debug!("Kill after deadline failed: {}", kill_err);
                }
                tracing::error!(
                    "Model script did not complete within {:?}, killed",
                    self.deadline
                );
                InvocationOutcome::Timeout
            }
        }
    }

    async fn check_ready(&self) -> Result<()> {
        verify_layout(&self.working_directory, &self.script)?;
        tracing::info!(
            "✅ Model script ready: {} (interpreter: {})",
            self.script.display(),
            self.interpreter.display()
        );
        Ok(())
    }

    fn timeout(&self) -> Duration {
        self.deadline
    }

    fn describe(&self) -> String {
        format!(
            "process {} {}",
            self.interpreter.display(),
            self.script.display()
        )
    }
}

fn resolve_against(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

fn verify_layout(working_directory: &Path, script: &Path) -> Result<()> {
    if !working_directory.is_dir() {
        return Err(ModerationError::ConfigError {
            message: format!(
                "Model working directory does not exist: {}",
                working_directory.display()
            ),
        });
    }

    std::fs::read_dir(working_directory).map_err(|e| ModerationError::ConfigError {
        message: format!(
            "Model working directory is not readable: {} ({})",
            working_directory.display(),
            e
        ),
    })?;

    if !script.is_file() {
        return Err(ModerationError::ConfigError {
            message: format!("Model script does not exist: {}", script.display()),
        });
    }

    Ok(())
}

/// The virtual-env interpreter when enabled and present, otherwise the default one.
fn resolve_interpreter(settings: &ProcessSettings, working_directory: &Path) -> PathBuf {
    if let (Some(venv), true) = (&settings.virtual_env_path, settings.use_virtual_env) {
        let venv = resolve_against(working_directory, venv);
        if venv.exists() {
            return venv;
        }
        tracing::warn!(
            "Virtual env interpreter not found at {}, using {}",
            venv.display(),
            settings.default_interpreter
        );
    }

    PathBuf::from(&settings.default_interpreter)
}

/// 腳本所屬的行程群組；離開時整組終止，包含腳本留在背景的子行程
struct ProcessGroup {
    #[cfg_attr(not(unix), allow(dead_code))]
    leader: Option<u32>,
}

impl ProcessGroup {
    fn of(child: &Child) -> Self {
        Self { leader: child.id() }
    }

    #[cfg(unix)]
    fn kill(&self) {
        use nix::errno::Errno;
        use nix::sys::signal::{killpg, Signal};
        use nix::unistd::Pid;

        let Some(pgid) = self.leader.and_then(|id| i32::try_from(id).ok()) else {
            return;
        };
        match killpg(Pid::from_raw(pgid), Signal::SIGKILL) {
            Ok(()) | Err(Errno::ESRCH) => {}
            Err(e) => tracing::debug!("Failed to kill process group {}: {}", pgid, e),
        }
    }

    #[cfg(not(unix))]
    fn kill(&self) {}
}

impl Drop for ProcessGroup {
    fn drop(&mut self) {
        self.kill();
    }
}

// exit status of the script; output read after the exit only for OUTPUT_DRAIN
async fn run_to_exit(
    child: &mut Child,
    stdout: ChildStdout,
    stderr: ChildStderr,
    output: &mut Vec<u8>,
) -> std::io::Result<ExitStatus> {
    let reading = collect_merged_output(stdout, stderr, output);
    tokio::pin!(reading);

    tokio::select! {
        read = &mut reading => {
            read?;
            child.wait().await
        }
        status = child.wait() => {
            let status = status?;
            match tokio::time::timeout(OUTPUT_DRAIN, &mut reading).await {
                Ok(read) => read?,
                Err(_) => tracing::warn!(
                    "Model script exited but its output pipes are still open, ignoring the rest"
                ),
            }
            Ok(status)
        }
    }
}

// stdout and stderr interleaved line by line in arrival order, bytes passed through as-is
async fn collect_merged_output(
    stdout: ChildStdout,
    stderr: ChildStderr,
    merged: &mut Vec<u8>,
) -> std::io::Result<()> {
    let limit = MAX_MODEL_OUTPUT_BYTES as u64 + 1;
    let mut out_reader = BufReader::new(stdout.take(limit));
    let mut err_reader = BufReader::new(stderr.take(limit));
    let mut out_line = Vec::new();
    let mut err_line = Vec::new();
    let mut out_done = false;
    let mut err_done = false;

    while !(out_done && err_done) {
        tokio::select! {
            read = out_reader.read_until(b'\n', &mut out_line), if !out_done => {
                out_done = read? == 0;
                append_line(merged, &mut out_line)?;
            }
            read = err_reader.read_until(b'\n', &mut err_line), if !err_done => {
                err_done = read? == 0;
                if !err_line.is_empty() {
                    tracing::debug!(
                        "Model script stderr: {}",
                        String::from_utf8_lossy(&err_line).trim_end()
                    );
                }
                append_line(merged, &mut err_line)?;
            }
        }
    }

    Ok(())
}

fn append_line(merged: &mut Vec<u8>, line: &mut Vec<u8>) -> std::io::Result<()> {
    if merged.len() + line.len() > MAX_MODEL_OUTPUT_BYTES {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("model output exceeded {} bytes", MAX_MODEL_OUTPUT_BYTES),
        ));
    }
    merged.append(line);
    Ok(())
}
