use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use hmac::{Hmac, Mac};
use sha1::Sha1;
use std::sync::{Arc, Mutex};
use tower::ServiceExt; // For `oneshot`
use webhook_dispatch::runner::{CommandRunner, ExitError};
use webhook_dispatch::{AppState, Configuration, app};

pub const SECRET: &str = "It's a Secret to Everybody";

#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub command: String,
    pub args: Vec<String>,
    pub cwd: String,
}

/// Records every command instead of running it. Commands named in `failing`
/// report a non-zero exit.
#[derive(Default)]
pub struct RecordingRunner {
    pub calls: Mutex<Vec<Call>>,
    pub failing: Vec<String>,
}

#[async_trait]
impl CommandRunner for RecordingRunner {
    async fn run(&self, command: &str, args: &[String], cwd: &str) -> Result<(), ExitError> {
        self.calls.lock().unwrap().push(Call {
            command: command.to_string(),
            args: args.to_vec(),
            cwd: cwd.to_string(),
        });
        if self.failing.iter().any(|c| c == command) {
            return Err(ExitError::Other("exit status: 1".to_string()));
        }
        Ok(())
    }
}

impl RecordingRunner {
    pub fn failing(commands: &[&str]) -> Self {
        Self {
            failing: commands.iter().map(|c| c.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn commands(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|c| c.command.clone())
            .collect()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

pub struct TestApp {
    pub router: Router,
    pub runner: Arc<RecordingRunner>,
    pub route: String,
}

impl TestApp {
    pub fn new(config: Configuration) -> Self {
        Self::with_runner(config, RecordingRunner::default())
    }

    pub fn with_runner(config: Configuration, runner: RecordingRunner) -> Self {
        let runner = Arc::new(runner);
        let route = config.webhook_route();
        let state = Arc::new(AppState::new(config, runner.clone()));
        Self {
            router: app(state),
            runner,
            route,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, String) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    /// A signed JSON `push` delivery to the webhook route.
    pub fn push(&self, body: &[u8]) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(&self.route)
            .header("content-type", "application/json")
            .header("x-github-event", "push")
            .header("x-hub-signature", sign(SECRET, body))
            .body(Body::from(body.to_vec()))
            .unwrap()
    }
}

pub fn sign(secret: &str, body: &[u8]) -> String {
    let mut mac = Hmac::<Sha1>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(body);
    format!("sha1={}", hex::encode(mac.finalize().into_bytes()))
}

pub fn config(json: serde_json::Value) -> Configuration {
    Configuration::from_json_str(&json.to_string()).unwrap()
}

pub fn push_payload(repo: &str) -> Vec<u8> {
    serde_json::to_vec(&serde_json::json!({
        "ref": "refs/heads/main",
        "before": "9049f1265b7d61be4a8904a9a27120d2064dab3b",
        "after": "0d1a26e67d8f5eaf1f6ba5c57fc3c7d91ac0fd1c",
        "commits": [
            {
                "id": "0d1a26e67d8f5eaf1f6ba5c57fc3c7d91ac0fd1c",
                "message": "Update README.md",
                "author": {"name": "baxterthehacker", "email": "baxter@example.com", "username": "baxterthehacker"}
            }
        ],
        "head_commit": {
            "id": "0d1a26e67d8f5eaf1f6ba5c57fc3c7d91ac0fd1c",
            "message": "Update README.md"
        },
        "repository": {
            "id": 35129377,
            "name": repo.rsplit('/').next().unwrap_or(repo),
            "full_name": repo,
            "html_url": format!("https://github.com/{}", repo)
        },
        "pusher": {"name": "baxterthehacker", "email": "baxter@example.com"}
    }))
    .unwrap()
}
