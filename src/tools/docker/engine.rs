use std::{process::Stdio, time::Instant};

use base64::Engine as _;
use secrecy::ExposeSecret;
use serde_json::json;
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWriteExt},
    process::Command,
};

use super::{DockerErrorKind, DockerExecutionConfig, DockerExecutionError, PullPolicy};

/// Exit code of a process killed with SIGKILL, which is how the kernel OOM
/// killer ends a container.
const SIGKILL_EXIT_CODE: i64 = 137;

#[derive(Debug)]
struct CommandOutput {
    success: bool,
    stdout: String,
    stderr: String,
}

#[derive(Debug)]
struct RunOutput {
    stdout: Vec<u8>,
    stderr: Vec<u8>,
    truncated: bool,
}

/// Runs untrusted code inside a throwaway container through the Docker CLI.
///
/// Every execution creates a fresh container with the limits of its
/// [`DockerExecutionConfig`], pipes the code in on stdin, and removes the
/// container afterwards whatever the outcome.
#[derive(Debug, Clone)]
pub struct DockerCodeExecutionEngine {
    config: DockerExecutionConfig,
}

impl DockerCodeExecutionEngine {
    pub fn new(config: DockerExecutionConfig) -> Result<Self, DockerExecutionError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &DockerExecutionConfig {
        &self.config
    }

    fn docker(&self) -> Command {
        let mut cmd = Command::new(&self.config.docker_binary);
        if let Some(host) = &self.config.docker_host {
            cmd.env("DOCKER_HOST", host);
        }
        if let Some(tls) = &self.config.tls {
            if tls.verify {
                cmd.env("DOCKER_TLS_VERIFY", "1");
            }
            if let Some(path) = &tls.cert_path {
                cmd.env("DOCKER_CERT_PATH", path);
            }
        }
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    async fn run_docker(&self, mut cmd: Command) -> Result<CommandOutput, DockerExecutionError> {
        let output = cmd.output().await.map_err(|e| {
            DockerExecutionError::new(
                DockerErrorKind::DockerNotAvailable,
                format!("cannot run {}: {}", self.config.docker_binary, e),
            )
        })?;
        Ok(CommandOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    /// Checks that the CLI can reach a daemon.
    pub async fn check_available(&self) -> Result<(), DockerExecutionError> {
        let mut cmd = self.docker();
        cmd.args(["version", "--format", "{{.Server.Version}}"]);
        let output = self.run_docker(cmd).await?;
        if !output.success {
            return Err(DockerExecutionError::new(
                DockerErrorKind::DockerNotAvailable,
                output.stderr.trim(),
            ));
        }
        log::debug!("Docker daemon version {}", output.stdout.trim());
        Ok(())
    }

    async fn image_present(&self, image: &str) -> Result<bool, DockerExecutionError> {
        let mut cmd = self.docker();
        cmd.args(["image", "inspect", "--format", "{{.Id}}", image]);
        let output = self.run_docker(cmd).await?;
        Ok(output.success)
    }

    /// `config.json` of a throwaway `DOCKER_CONFIG` directory, so pulls with
    /// registry credentials never touch the user's own login state.
    fn registry_config(&self) -> Option<serde_json::Value> {
        let auth = self.config.registry_auth.as_ref()?;
        let token = base64::engine::general_purpose::STANDARD.encode(format!(
            "{}:{}",
            auth.username,
            auth.password.expose_secret()
        ));
        let mut auths = serde_json::Map::new();
        auths.insert(auth.server_address.clone(), json!({ "auth": token }));
        Some(json!({ "auths": auths }))
    }

    async fn pull(&self, image: &str) -> Result<(), DockerExecutionError> {
        log::info!("Pulling image {}", image);
        let mut cmd = self.docker();
        cmd.args(["pull", "--quiet", image]);

        let config_dir = match self.registry_config() {
            Some(config) => {
                let dir = tempfile::tempdir().map_err(|e| {
                    DockerExecutionError::new(DockerErrorKind::ImagePullFailed, e.to_string())
                })?;
                std::fs::write(dir.path().join("config.json"), config.to_string()).map_err(
                    |e| DockerExecutionError::new(DockerErrorKind::ImagePullFailed, e.to_string()),
                )?;
                cmd.env("DOCKER_CONFIG", dir.path());
                Some(dir)
            }
            None => None,
        };

        let output = self.run_docker(cmd).await?;
        drop(config_dir);
        if output.success {
            return Ok(());
        }
        let stderr = output.stderr.trim().to_string();
        let lower = stderr.to_lowercase();
        let kind = if lower.contains("not found")
            || lower.contains("manifest unknown")
            || lower.contains("pull access denied")
            || lower.contains("does not exist")
        {
            DockerErrorKind::ImageNotFound
        } else {
            DockerErrorKind::ImagePullFailed
        };
        Err(DockerExecutionError::new(
            kind,
            format!("pull of {} failed: {}", image, stderr),
        ))
    }

    /// Makes the image available locally according to the pull policy.
    pub async fn ensure_image(&self, image: &str) -> Result<(), DockerExecutionError> {
        match self.config.pull_policy {
            PullPolicy::Always => self.pull(image).await,
            PullPolicy::IfNotPresent => {
                if self.image_present(image).await? {
                    Ok(())
                } else {
                    self.pull(image).await
                }
            }
            PullPolicy::Never => {
                if self.image_present(image).await? {
                    Ok(())
                } else {
                    Err(DockerExecutionError::new(
                        DockerErrorKind::ImageNotFound,
                        format!("image {} is not present and pull policy is never", image),
                    ))
                }
            }
        }
    }

    /// Arguments of `docker create` for one execution.
    ///
    /// The container reads the code from stdin into `main.<ext>` inside the
    /// working directory and runs `command` on it.
    pub fn create_args(&self, image: &str, file_extension: &str, command: &str) -> Vec<String> {
        let config = &self.config;
        let mut args: Vec<String> = vec![
            "create".into(),
            "--interactive".into(),
            "--label".into(),
            "langchain.sandbox=true".into(),
            "--security-opt".into(),
            "no-new-privileges".into(),
        ];
        if let Some(memory) = &config.memory_limit {
            args.extend(["--memory".into(), memory.clone()]);
            // swap equal to memory means no swap on top of the limit
            let swap = config.memory_swap_limit.clone().unwrap_or(memory.clone());
            args.extend(["--memory-swap".into(), swap]);
        }
        if config.network_disabled {
            args.extend(["--network".into(), "none".into()]);
        }
        for cap in &config.cap_drop {
            args.extend(["--cap-drop".into(), cap.clone()]);
        }
        if let Some(user) = &config.user {
            args.extend(["--user".into(), user.clone()]);
        }
        if config.read_only_rootfs {
            args.push("--read-only".into());
        }
        // world-writable so any --user can write the code file
        args.extend([
            "--tmpfs".into(),
            format!(
                "{}:rw,exec,size={},mode=1777",
                config.working_dir, config.tmpfs_size
            ),
        ]);
        args.extend(["--workdir".into(), config.working_dir.clone()]);
        for (key, value) in &config.environment_variables {
            args.extend(["--env".into(), format!("{}={}", key, value)]);
        }
        if let Some(shares) = config.cpu_shares {
            args.extend(["--cpu-shares".into(), shares.to_string()]);
        }
        if let Some(quota) = config.cpu_quota {
            args.extend(["--cpu-quota".into(), quota.to_string()]);
        }
        if let Some(pids) = config.pids_limit {
            args.extend(["--pids-limit".into(), pids.to_string()]);
        }
        let file = format!("main.{}", file_extension);
        args.extend([
            image.to_string(),
            "sh".into(),
            "-c".into(),
            format!("cat > {file} && exec {command} {file}"),
        ]);
        args
    }

    async fn create(
        &self,
        image: &str,
        file_extension: &str,
        command: &str,
    ) -> Result<String, DockerExecutionError> {
        let mut cmd = self.docker();
        cmd.args(self.create_args(image, file_extension, command));
        let output = self.run_docker(cmd).await?;
        let id = output.stdout.trim().to_string();
        if !output.success || id.is_empty() {
            return Err(DockerExecutionError::new(
                DockerErrorKind::ContainerCreateFailed,
                output.stderr.trim(),
            ));
        }
        Ok(id)
    }

    async fn start_attached(
        &self,
        container: &str,
        code: &str,
    ) -> Result<RunOutput, DockerExecutionError> {
        let mut cmd = self.docker();
        cmd.args(["start", "--attach", "--interactive", container])
            .stdin(Stdio::piped());
        let mut child = cmd.spawn().map_err(|e| {
            DockerExecutionError::new(DockerErrorKind::DockerNotAvailable, e.to_string())
        })?;

        if let Some(mut stdin) = child.stdin.take() {
            let code = code.as_bytes().to_vec();
            tokio::spawn(async move {
                // The process may exit before reading all of it.
                let _ = stdin.write_all(&code).await;
                drop(stdin);
            });
        }

        let cap = self.config.max_output_bytes;
        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let stdout_task = tokio::spawn(async move { read_capped(stdout, cap).await });
        let stderr_task = tokio::spawn(async move { read_capped(stderr, cap).await });

        let start = Instant::now();
        match tokio::time::timeout(self.config.timeout, child.wait()).await {
            Ok(Ok(_)) => {
                let (stdout, stdout_truncated) = stdout_task.await.unwrap_or_default();
                let (stderr, stderr_truncated) = stderr_task.await.unwrap_or_default();
                log::debug!(
                    "Container {} finished in {}ms",
                    container,
                    start.elapsed().as_millis()
                );
                Ok(RunOutput {
                    stdout,
                    stderr,
                    truncated: stdout_truncated || stderr_truncated,
                })
            }
            Ok(Err(e)) => Err(DockerExecutionError::new(
                DockerErrorKind::ExecutionFailed,
                e.to_string(),
            )),
            Err(_) => {
                stdout_task.abort();
                stderr_task.abort();
                Err(DockerExecutionError::new(
                    DockerErrorKind::ExecutionTimeout,
                    format!("execution exceeded {}s", self.config.timeout.as_secs_f64()),
                ))
            }
        }
    }

    /// `(oom_killed, exit_code)` of a finished container.
    async fn inspect_state(&self, container: &str) -> Result<(bool, i64), DockerExecutionError> {
        let mut cmd = self.docker();
        cmd.args([
            "inspect",
            "--format",
            "{{.State.OOMKilled}} {{.State.ExitCode}}",
            container,
        ]);
        let output = self.run_docker(cmd).await?;
        parse_state(&output.stdout).ok_or_else(|| {
            DockerExecutionError::new(
                DockerErrorKind::ExecutionFailed,
                format!("cannot inspect container {}: {}", container, output.stderr.trim()),
            )
        })
    }

    async fn remove(&self, container: &str) {
        let mut cmd = self.docker();
        cmd.args(["rm", "--force", "--volumes", container]);
        match cmd.output().await {
            Ok(output) if output.status.success() => {}
            Ok(output) => log::warn!(
                "Failed to remove container {}: {}",
                container,
                String::from_utf8_lossy(&output.stderr).trim()
            ),
            Err(e) => log::warn!("Failed to remove container {}: {}", container, e),
        }
    }

    async fn run_in(&self, container: &str, code: &str) -> Result<String, DockerExecutionError> {
        let output = self.start_attached(container, code).await?;
        let (oom_killed, exit_code) = self.inspect_state(container).await?;
        classify(output, oom_killed, exit_code, self.config.max_output_bytes)
    }

    /// Runs `code` with `command` in a fresh container of `image` and returns
    /// its trimmed stdout.
    ///
    /// `command` is the interpreter invocation (`python3`, `node`), given the
    /// code file as its last argument.
    pub async fn execute(
        &self,
        image: &str,
        file_extension: &str,
        code: &str,
        command: &str,
    ) -> Result<String, DockerExecutionError> {
        if image.trim().is_empty() || command.trim().is_empty() {
            return Err(DockerExecutionError::invalid_configuration(
                "image and command must not be empty",
            ));
        }
        if file_extension.is_empty() || !file_extension.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err(DockerExecutionError::invalid_configuration(format!(
                "invalid file extension {:?}",
                file_extension
            )));
        }

        self.check_available().await?;
        self.ensure_image(image).await?;
        let container = self.create(image, file_extension, command).await?;
        log::debug!("Created container {} from {}", container, image);

        let result = self.run_in(&container, code).await;
        self.remove(&container).await;
        if let Err(e) = &result {
            log::warn!("Execution in {} failed: {}", image, e);
        }
        result
    }
}

fn parse_state(output: &str) -> Option<(bool, i64)> {
    let mut parts = output.split_whitespace();
    let oom_killed = parts.next()?.parse::<bool>().ok()?;
    let exit_code = parts.next()?.parse::<i64>().ok()?;
    Some((oom_killed, exit_code))
}

fn classify(
    output: RunOutput,
    oom_killed: bool,
    exit_code: i64,
    max_output_bytes: usize,
) -> Result<String, DockerExecutionError> {
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    if oom_killed || exit_code == SIGKILL_EXIT_CODE {
        return Err(DockerExecutionError::new(
            DockerErrorKind::ResourceLimitExceeded,
            format!("container was killed (exit {}, OOM {})", exit_code, oom_killed),
        )
        .with_exit_code(exit_code));
    }
    if output.truncated {
        return Err(DockerExecutionError::new(
            DockerErrorKind::OutputLimitExceeded,
            format!("output exceeded {} bytes", max_output_bytes),
        )
        .with_exit_code(exit_code));
    }
    if exit_code != 0 {
        let message = if stderr.is_empty() {
            format!("exit code {}", exit_code)
        } else {
            stderr
        };
        return Err(
            DockerExecutionError::new(DockerErrorKind::ExecutionFailed, message)
                .with_exit_code(exit_code),
        );
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Reads a stream up to `cap` bytes and drains the rest so the writer never
/// blocks. The flag reports whether anything was cut.
async fn read_capped<R: AsyncRead + Unpin>(handle: Option<R>, cap: usize) -> (Vec<u8>, bool) {
    let mut buf = Vec::new();
    let Some(mut handle) = handle else {
        return (buf, false);
    };
    let _ = (&mut handle)
        .take(cap as u64 + 1)
        .read_to_end(&mut buf)
        .await;
    if buf.len() <= cap {
        return (buf, false);
    }
    buf.truncate(cap);
    let _ = tokio::io::copy(&mut handle, &mut tokio::io::sink()).await;
    (buf, true)
}
