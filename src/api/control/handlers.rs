use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

use crate::api::control::models::{ControlRequest, ControlResponse, MISSING_ACTION};
use crate::api::control::runner::{RunnerError, ScriptOutput, ScriptRunner};
use crate::metrics::METRICS;

/// Control API state
#[derive(Clone)]
pub struct ControlState {
    pub runner: Arc<dyn ScriptRunner>,
}

impl ControlState {
    pub fn new(runner: Arc<dyn ScriptRunner>) -> Self {
        Self { runner }
    }
}

/// Control endpoint failures
#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    #[error("{}", MISSING_ACTION)]
    MissingAction,

    #[error("Request body too large")]
    PayloadTooLarge,

    #[error("Error executing command: {0}")]
    Launch(#[from] RunnerError),

    #[error(
        "Error executing command: Command '{}' {}",
        render_argv(.command),
        describe_exit(.exit_code, .signal)
    )]
    Failed {
        command: Vec<String>,
        exit_code: Option<i32>,
        signal: Option<i32>,
        stderr: String,
    },
}

/// Render arguments as a list literal, e.g. `['python3', 'main.py', 'on']`
fn render_argv(command: &[String]) -> String {
    let quoted: Vec<String> = command.iter().map(|arg| quote_arg(arg)).collect();
    format!("[{}]", quoted.join(", "))
}

fn quote_arg(arg: &str) -> String {
    let quote = if arg.contains('\'') && !arg.contains('"') { '"' } else { '\'' };
    let mut out = String::with_capacity(arg.len() + 2);
    out.push(quote);
    for c in arg.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

fn describe_exit(exit_code: &Option<i32>, signal: &Option<i32>) -> String {
    match (exit_code, signal) {
        (Some(code), _) => format!("returned non-zero exit status {}.", code),
        (None, Some(sig)) => match signal_name(*sig) {
            Some(name) => format!("died with <Signals.{}: {}>.", name, sig),
            None => format!("died with unknown signal {}.", sig),
        },
        (None, None) => "died with unknown signal.".to_string(),
    }
}

/// Linux signal numbering
fn signal_name(signal: i32) -> Option<&'static str> {
    let name = match signal {
        1 => "SIGHUP",
        2 => "SIGINT",
        3 => "SIGQUIT",
        4 => "SIGILL",
        5 => "SIGTRAP",
        6 => "SIGABRT",
        7 => "SIGBUS",
        8 => "SIGFPE",
        9 => "SIGKILL",
        10 => "SIGUSR1",
        11 => "SIGSEGV",
        12 => "SIGUSR2",
        13 => "SIGPIPE",
        14 => "SIGALRM",
        15 => "SIGTERM",
        _ => return None,
    };
    Some(name)
}

impl IntoResponse for ControlError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        let (status, body) = match self {
            Self::MissingAction => (StatusCode::BAD_REQUEST, ControlResponse::error(message)),
            Self::PayloadTooLarge => (StatusCode::PAYLOAD_TOO_LARGE, ControlResponse::error(message)),
            Self::Launch(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ControlResponse::error(message).with_stderr(""),
            ),
            Self::Failed { stderr, .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ControlResponse::error(message).with_stderr(stderr),
            ),
        };
        (status, Json(body)).into_response()
    }
}

/// Run an eraser motor action
///
/// POST /control
pub async fn control(
    State(state): State<ControlState>,
    payload: Result<Json<ControlRequest>, JsonRejection>,
) -> Response {
    let start = Instant::now();

    let response = run_control(&state, payload).await.into_response();

    METRICS.record_request("control", response.status().as_u16(), start.elapsed());
    response
}

async fn run_control(
    state: &ControlState,
    payload: Result<Json<ControlRequest>, JsonRejection>,
) -> Result<Json<ControlResponse>, ControlError> {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            return Err(ControlError::PayloadTooLarge);
        }
        Err(rejection) => {
            debug!("Unreadable control request body: {}", rejection);
            ControlRequest::default()
        }
    };

    let action = request.action().ok_or(ControlError::MissingAction)?;

    info!("Control request: action={}", action);

    let output = state.runner.run(action).await.map_err(|e| {
        METRICS.record_script_run("launch_error");
        error!("Control script could not be launched: {}", e);
        ControlError::Launch(e)
    })?;

    let ScriptOutput {
        exit_code,
        signal,
        stdout,
        stderr,
    } = output;

    if exit_code != Some(0) {
        METRICS.record_script_run("failed");
        return Err(ControlError::Failed {
            command: state.runner.argv(action),
            exit_code,
            signal,
            stderr,
        });
    }

    METRICS.record_script_run("success");
    Ok(Json(ControlResponse::success(action, stdout)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failed(command: &[&str], exit_code: Option<i32>, signal: Option<i32>) -> ControlError {
        ControlError::Failed {
            command: command.iter().map(|s| s.to_string()).collect(),
            exit_code,
            signal,
            stderr: String::new(),
        }
    }

    #[test]
    fn test_failed_message_format() {
        let err = failed(&["python3", "/opt/eraser/main.py", "bad"], Some(1), None);
        assert_eq!(
            err.to_string(),
            "Error executing command: Command '['python3', '/opt/eraser/main.py', 'bad']' returned non-zero exit status 1."
        );
    }

    #[test]
    fn test_signal_exit_message() {
        let err = failed(&["python3", "main.py", "off"], None, Some(9));
        assert_eq!(
            err.to_string(),
            "Error executing command: Command '['python3', 'main.py', 'off']' died with <Signals.SIGKILL: 9>."
        );

        let err = failed(&["python3", "main.py", "off"], None, Some(64));
        assert!(err.to_string().ends_with("died with unknown signal 64."));
    }

    #[test]
    fn test_argument_quoting() {
        assert_eq!(render_argv(&[]), "[]");
        assert_eq!(
            render_argv(&["it's".to_string(), "a\\b".to_string(), "say \"hi\" it's".to_string()]),
            r#"["it's", 'a\\b', 'say "hi" it\'s']"#
        );
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ControlError::MissingAction.into_response().status(),
            StatusCode::BAD_REQUEST
        );

        let launch = ControlError::Launch(RunnerError::Spawn {
            program: "python3".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        });
        assert_eq!(launch.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);

        assert_eq!(
            ControlError::PayloadTooLarge.into_response().status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
    }
}
