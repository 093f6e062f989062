#[allow(dead_code)]
mod common;

use async_trait::async_trait;
use common::{config, push_payload};
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use webhook_dispatch::runner::{CommandRunner, ExitError};
use webhook_dispatch::{AppState, app};

/// Takes `delay` per command and records when each one starts and finishes.
struct SlowRunner {
    delay: Duration,
    events: Mutex<Vec<String>>,
}

#[async_trait]
impl CommandRunner for SlowRunner {
    async fn run(&self, command: &str, _args: &[String], _cwd: &str) -> Result<(), ExitError> {
        self.events.lock().unwrap().push(format!("start {}", command));
        tokio::time::sleep(self.delay).await;
        self.events.lock().unwrap().push(format!("finish {}", command));
        Ok(())
    }
}

#[tokio::test]
async fn commands_finish_after_client_hangs_up() {
    let runner = Arc::new(SlowRunner {
        delay: Duration::from_millis(500),
        events: Mutex::new(Vec::new()),
    });
    let configuration = config(json!({
        "Repositories": [{"Repository": "a/b", "Commands": [{"Command": "one"}, {"Command": "two"}]}]
    }));
    let state = Arc::new(AppState::new(configuration, runner.clone()));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app(state)).await.unwrap();
    });

    let body = push_payload("a/b");
    let mut request = format!(
        "POST / HTTP/1.1\r\nHost: {}\r\nContent-Type: application/json\r\nX-GitHub-Event: push\r\nContent-Length: {}\r\n\r\n",
        addr,
        body.len()
    )
    .into_bytes();
    request.extend_from_slice(&body);

    let mut client = TcpStream::connect(addr).await.unwrap();
    client.write_all(&request).await.unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    drop(client);

    for _ in 0..40 {
        if runner.events.lock().unwrap().len() == 4 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    assert_eq!(
        *runner.events.lock().unwrap(),
        vec!["start one", "finish one", "start two", "finish two"]
    );
}
