use std::io;
use std::time::Duration;

use subprocess::{Exec, ExitStatus, Redirection};
use webextract_core::Target;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("failed to start `{program}`: {message}")]
    Spawn { program: String, message: String },
    #[error("{host}: `{command}` timed out after {seconds}s")]
    Timeout {
        host: String,
        command: String,
        seconds: u64,
    },
    #[error("{host}: `{command}` failed ({status}): {stderr}")]
    Exit {
        host: String,
        command: String,
        status: String,
        stderr: String,
    },
    #[error("{host}: io error: {source}")]
    Io {
        host: String,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub exit_status: Option<i32>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_status == Some(0)
    }

    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_text(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }

    pub fn status_label(&self) -> String {
        match self.exit_status {
            Some(code) => format!("exit status {}", code),
            None => "no exit status".to_string(),
        }
    }
}

/// Runs commands on a target host as the target's user.
pub trait RemoteExecutor {
    fn execute(&self, target: &Target, command: &str) -> Result<CommandOutput, TransportError>;

    /// Full contents of `remote_path`. Any stderr or a non-zero exit fails the whole fetch.
    fn fetch_file(&self, target: &Target, remote_path: &str) -> Result<Vec<u8>, TransportError> {
        let command = format!("cat {}", shell_quote(remote_path));
        let output = self.execute(target, &command)?;
        if !output.success() || !output.stderr.is_empty() {
            return Err(TransportError::Exit {
                host: target.label(),
                command,
                status: output.status_label(),
                stderr: output.stderr_text().trim().to_string(),
            });
        }
        Ok(output.stdout)
    }
}

pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

#[derive(Debug, Clone)]
pub struct SshOptions {
    pub program: String,
    pub password_program: String,
    pub connect_timeout: Duration,
    pub command_timeout: Duration,
}

impl Default for SshOptions {
    fn default() -> Self {
        Self {
            program: "ssh".to_string(),
            password_program: "sshpass".to_string(),
            connect_timeout: Duration::from_secs(30),
            command_timeout: Duration::from_secs(600),
        }
    }
}

/// Exit status the OpenSSH client uses for its own failures.
const SSH_CLIENT_FAILURE: i32 = 255;

/// A password without a key goes through `sshpass -e`; otherwise batch mode.
#[derive(Debug, Clone, Default)]
pub struct SshExecutor {
    options: SshOptions,
}

impl SshExecutor {
    pub fn new(options: SshOptions) -> Self {
        Self { options }
    }

    fn build(&self, target: &Target, command: &str) -> (String, Exec) {
        let credentials = &target.credentials;
        let use_password = credentials.key_file.is_none() && credentials.password.is_some();
        let (program, mut exec) = match credentials.password.as_deref() {
            Some(password) if use_password => (
                self.options.password_program.clone(),
                Exec::cmd(&self.options.password_program)
                    .env("SSHPASS", password)
                    .arg("-e")
                    .arg(&self.options.program),
            ),
            _ => (
                self.options.program.clone(),
                Exec::cmd(&self.options.program),
            ),
        };
        exec = exec.arg("-n").arg("-o").arg(format!(
            "ConnectTimeout={}",
            self.options.connect_timeout.as_secs().max(1)
        ));
        exec = exec.arg("-o").arg("LogLevel=ERROR");
        if !use_password {
            exec = exec.arg("-o").arg("BatchMode=yes");
        }
        if let Some(key_file) = credentials.key_file.as_deref() {
            exec = exec.arg("-i").arg(key_file);
        }
        exec = exec
            .arg("-l")
            .arg(&target.username)
            .arg(&target.host)
            .arg(command)
            .stdout(Redirection::Pipe)
            .stderr(Redirection::Pipe);
        (program, exec)
    }
}

impl RemoteExecutor for SshExecutor {
    fn execute(&self, target: &Target, command: &str) -> Result<CommandOutput, TransportError> {
        let (program, exec) = self.build(target, command);
        let mut process = exec.popen().map_err(|err| TransportError::Spawn {
            program,
            message: err.to_string(),
        })?;

        let mut comm = process
            .communicate_start(None)
            .limit_time(self.options.command_timeout);
        let (stdout, stderr) = match comm.read() {
            Ok(captured) => captured,
            Err(err) => {
                let _ = process.kill();
                let _ = process.wait();
                if err.error.kind() == io::ErrorKind::TimedOut {
                    return Err(TransportError::Timeout {
                        host: target.label(),
                        command: command.to_string(),
                        seconds: self.options.command_timeout.as_secs(),
                    });
                }
                return Err(TransportError::Io {
                    host: target.label(),
                    source: err.error,
                });
            }
        };

        let status = process.wait().map_err(|err| TransportError::Io {
            host: target.label(),
            source: io::Error::other(err.to_string()),
        })?;
        let exit_status = match status {
            ExitStatus::Exited(code) => Some(code as i32),
            _ => None,
        };
        let output = CommandOutput {
            stdout: stdout.unwrap_or_default(),
            stderr: stderr.unwrap_or_default(),
            exit_status,
        };
        if exit_status.is_none() || exit_status == Some(SSH_CLIENT_FAILURE) {
            return Err(TransportError::Exit {
                host: target.label(),
                command: command.to_string(),
                status: output.status_label(),
                stderr: output.stderr_text().trim().to_string(),
            });
        }
        tracing::trace!(
            host = %target.host,
            command,
            stdout_bytes = output.stdout.len(),
            stderr_bytes = output.stderr.len(),
            "remote command finished"
        );
        Ok(output)
    }
}
