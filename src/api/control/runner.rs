//! Launches the external motor control script for one action

use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;
use std::process::Stdio;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, error, info, warn};

/// Script runner configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RunnerConfig {
    /// Program that executes the script
    #[serde(default = "default_interpreter")]
    pub interpreter: String,

    /// Control script handed to the interpreter as its first argument
    #[serde(default = "default_script_path")]
    pub script_path: PathBuf,
}

fn default_interpreter() -> String {
    "python3".to_string()
}

fn default_script_path() -> PathBuf {
    PathBuf::from("main.py")
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            interpreter: default_interpreter(),
            script_path: default_script_path(),
        }
    }
}

impl RunnerConfig {
    pub fn from_env(mut self) -> Self {
        if let Ok(val) = std::env::var("CONTROL_INTERPRETER") {
            if !val.is_empty() {
                self.interpreter = val;
            }
        }

        if let Ok(val) = std::env::var("CONTROL_SCRIPT_PATH") {
            if !val.is_empty() {
                self.script_path = PathBuf::from(val);
            }
        }

        self
    }
}

/// Launch failures (the script never ran)
#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Captured result of one script run
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptOutput {
    /// Exit code; `None` when the process was killed by a signal
    pub exit_code: Option<i32>,
    /// Terminating signal, if any
    pub signal: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ScriptOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Runs the control script for an action token
#[async_trait]
pub trait ScriptRunner: Send + Sync {
    /// Run the script with `action` as its only argument and wait for it to exit
    async fn run(&self, action: &str) -> Result<ScriptOutput, RunnerError>;

    /// Arguments the script is launched with for `action`, used in error messages
    fn argv(&self, action: &str) -> Vec<String> {
        vec![action.to_string()]
    }
}

/// Runs the script as a child process
pub struct ProcessRunner {
    config: RunnerConfig,
}

impl ProcessRunner {
    pub fn new(config: RunnerConfig) -> Self {
        if !config.script_path.exists() {
            warn!(
                "Control script {} does not exist yet; actions will fail until it is installed",
                config.script_path.display()
            );
        }

        Self { config }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }
}

#[async_trait]
impl ScriptRunner for ProcessRunner {
    async fn run(&self, action: &str) -> Result<ScriptOutput, RunnerError> {
        info!("Running control script: {}", self.argv(action).join(" "));

        let output = Command::new(&self.config.interpreter)
            .arg(&self.config.script_path)
            .arg(action)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|source| RunnerError::Spawn {
                program: self.config.interpreter.clone(),
                source,
            })?;

        let result = ScriptOutput {
            exit_code: output.status.code(),
            signal: exit_signal(&output.status),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        };

        if result.success() {
            info!("Control script succeeded for action {}", action);
        } else {
            error!(
                "Control script exited with code {:?} signal {:?}",
                result.exit_code, result.signal
            );
            debug!("stdout: {}", result.stdout);
            debug!("stderr: {}", result.stderr);
        }

        Ok(result)
    }

    fn argv(&self, action: &str) -> Vec<String> {
        vec![
            self.config.interpreter.clone(),
            self.config.script_path.display().to_string(),
            action.to_string(),
        ]
    }
}

#[cfg(unix)]
fn exit_signal(status: &std::process::ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn exit_signal(_status: &std::process::ExitStatus) -> Option<i32> {
    None
}
