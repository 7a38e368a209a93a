//! Integration tests for the control service

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;
use whiteboard_services::api::build_control_router;
use whiteboard_services::api::control::{
    ControlState, ProcessRunner, RunnerConfig, RunnerError, ScriptOutput, ScriptRunner,
};
use whiteboard_services::config::ServerConfig;

/// Runner double returning a fixed outcome and recording the actions it saw
struct MockRunner {
    output: ScriptOutput,
    actions: Mutex<Vec<String>>,
}

impl MockRunner {
    fn exiting(code: i32, stdout: &str, stderr: &str) -> Arc<Self> {
        Arc::new(Self {
            output: ScriptOutput {
                exit_code: Some(code),
                signal: None,
                stdout: stdout.to_string(),
                stderr: stderr.to_string(),
            },
            actions: Mutex::new(Vec::new()),
        })
    }

    fn actions(&self) -> Vec<String> {
        self.actions.lock().unwrap().clone()
    }
}

#[async_trait]
impl ScriptRunner for MockRunner {
    async fn run(&self, action: &str) -> Result<ScriptOutput, RunnerError> {
        self.actions.lock().unwrap().push(action.to_string());
        Ok(self.output.clone())
    }

    fn argv(&self, action: &str) -> Vec<String> {
        vec!["python3".to_string(), "main.py".to_string(), action.to_string()]
    }
}

fn router(runner: Arc<dyn ScriptRunner>) -> Router {
    build_control_router(ControlState::new(runner), &ServerConfig::control_default())
}

fn router_with_limit(runner: Arc<dyn ScriptRunner>, max_body_bytes: usize) -> Router {
    let server = ServerConfig {
        max_body_bytes,
        ..ServerConfig::control_default()
    };
    build_control_router(ControlState::new(runner), &server)
}

async fn post_control(app: Router, body: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri("/control")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_missing_action_is_rejected() {
    for body in [r#"{}"#, r#"{"action": null}"#, r#"{"action": ""}"#, "[1, 2"] {
        let runner = MockRunner::exiting(0, "", "");
        let (status, json) = post_control(router(runner.clone()), body).await;

        assert_eq!(status, StatusCode::BAD_REQUEST, "body: {}", body);
        assert_eq!(
            json,
            json!({ "status": "error", "message": "Missing action parameter" })
        );
        assert!(runner.actions().is_empty());
    }
}

#[tokio::test]
async fn test_successful_action() {
    let runner = MockRunner::exiting(0, "done", "");
    let (status, json) = post_control(router(runner.clone()), r#"{"action": "open"}"#).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "success");
    assert_eq!(json["output"], "done");
    assert_eq!(json["message"], "Command open executed successfully");
    assert_eq!(runner.actions(), vec!["open".to_string()]);
}

#[tokio::test]
async fn test_failed_action_reports_stderr() {
    let runner = MockRunner::exiting(1, "", "fail");
    let (status, json) = post_control(router(runner), r#"{"action": "bad"}"#).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["status"], "error");
    assert_eq!(json["stderr"], "fail");
    assert_eq!(
        json["message"],
        "Error executing command: Command '['python3', 'main.py', 'bad']' returned non-zero exit status 1."
    );
    assert!(json.get("output").is_none());
}

#[tokio::test]
async fn test_action_is_passed_verbatim() {
    let runner = MockRunner::exiting(0, "", "");
    let (status, _) = post_control(router(runner.clone()), r#"{"action": "move --steps 200"}"#).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(runner.actions(), vec!["move --steps 200".to_string()]);
}

#[tokio::test]
async fn test_oversized_body_gets_json_413() {
    let runner = MockRunner::exiting(0, "", "");
    let body = r#"{"action": "on", "padding": "xxxxxxxxxxxxxxxx"}"#;
    let (status, json) = post_control(router_with_limit(runner.clone(), 16), body).await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(
        json,
        json!({ "status": "error", "message": "Request body too large" })
    );
    assert!(runner.actions().is_empty());
}

#[tokio::test]
async fn test_preflight_allows_any_header() {
    let app = router(MockRunner::exiting(0, "", ""));
    let preflight = Request::builder()
        .method("OPTIONS")
        .uri("/control")
        .header("origin", "http://raspberrypi.local:3000")
        .header("access-control-request-method", "POST")
        .header("access-control-request-headers", "content-type, x-requested-with")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(preflight).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("access-control-allow-headers").unwrap(),
        "*"
    );
    assert_eq!(
        response.headers().get("access-control-allow-origin").unwrap(),
        "*"
    );
}

#[tokio::test]
async fn test_unlaunchable_interpreter() {
    let runner = ProcessRunner::new(RunnerConfig {
        interpreter: "/nonexistent/interpreter-for-tests".to_string(),
        script_path: "main.py".into(),
    });
    let (status, json) = post_control(router(Arc::new(runner)), r#"{"action": "on"}"#).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["status"], "error");
    assert_eq!(json["stderr"], "");
    assert!(json["message"]
        .as_str()
        .unwrap()
        .starts_with("Error executing command:"));
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = router(MockRunner::exiting(0, "", ""));
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let health: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(health["status"], "ok");
    assert_eq!(health["service"], "control-service");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = router(MockRunner::exiting(0, "done", ""));
    let _ = post_control(app.clone(), r#"{"action": "on"}"#).await;

    let response = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("control_script_runs_total"));
}

#[cfg(unix)]
mod process {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn script(body: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{}", body).unwrap();
        file.flush().unwrap();
        file
    }

    fn shell_runner(script: &NamedTempFile) -> ProcessRunner {
        ProcessRunner::new(RunnerConfig {
            interpreter: "sh".to_string(),
            script_path: script.path().to_path_buf(),
        })
    }

    #[tokio::test]
    async fn test_script_receives_action() {
        let file = script(r#"echo "moved $1""#);
        let runner = shell_runner(&file);

        let output = runner.run("on").await.unwrap();
        assert!(output.success());
        assert_eq!(output.stdout, "moved on\n");
        assert_eq!(output.stderr, "");
    }

    #[tokio::test]
    async fn test_script_failure_captured() {
        let file = script("echo partial; echo 'motor stalled' >&2; exit 3");
        let runner = shell_runner(&file);

        let output = runner.run("off").await.unwrap();
        assert_eq!(output.exit_code, Some(3));
        assert_eq!(output.stdout, "partial\n");
        assert_eq!(output.stderr, "motor stalled\n");
    }

    #[tokio::test]
    async fn test_end_to_end_with_real_script() {
        let file = script(r#"if [ "$1" = "on" ]; then echo started; else echo "unknown action $1" >&2; exit 2; fi"#);
        let app = router(Arc::new(shell_runner(&file)));

        let (status, json) = post_control(app.clone(), r#"{"action": "on"}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["output"], "started\n");

        let (status, json) = post_control(app, r#"{"action": "sideways"}"#).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["stderr"], "unknown action sideways\n");
        assert!(json["message"]
            .as_str()
            .unwrap()
            .ends_with("returned non-zero exit status 2."));
    }

    #[tokio::test]
    async fn test_killed_script_reports_signal() {
        let file = script("kill -9 $$");
        let runner = shell_runner(&file);

        let output = runner.run("on").await.unwrap();
        assert_eq!(output.exit_code, None);
        assert_eq!(output.signal, Some(9));

        let app = router(Arc::new(runner));
        let (status, json) = post_control(app, r#"{"action": "on"}"#).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(json["message"]
            .as_str()
            .unwrap()
            .ends_with("', 'on']' died with <Signals.SIGKILL: 9>."));
    }
}
