//! Shared utilities for integration tests.

use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use token_minter::blockchain::MemoryLedger;
use token_minter::custody::MemoryCustody;
use token_minter::http::SseDecoder;
use token_minter::lifecycle::{Services, Shutdown};
use token_minter::minting::{CheckpointStore, Minter, StatusBoard};
use token_minter::wallet::WalletSession;
use token_minter::{HttpServer, MinterConfig};

/// A minter served on an ephemeral port, backed by an in-memory ledger.
#[allow(dead_code)]
pub struct TestServer {
    pub addr: SocketAddr,
    pub ledger: Arc<MemoryLedger>,
    pub custody: Arc<MemoryCustody>,
    pub minter: Arc<Minter>,
    pub shutdown: Shutdown,
    pub client: reqwest::Client,
}

#[allow(dead_code)]
impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn get_json(&self, path: &str) -> Value {
        self.client
            .get(self.url(path))
            .send()
            .await
            .expect("minter unreachable")
            .json()
            .await
            .expect("response is not JSON")
    }

    pub async fn post_json(&self, path: &str, body: Value) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .json(&body)
            .send()
            .await
            .expect("minter unreachable")
    }

    /// Poll the status board until the attempt is done or failed.
    pub async fn wait_for_terminal(&self) -> Value {
        for _ in 0..500 {
            let status = self.get_json("/api/status").await;
            if status["phase"] == "done" || status["phase"] == "failed" {
                return status;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("mint attempt did not finish");
    }
}

/// Start a server over `ledger`.
pub async fn spawn_server(ledger: MemoryLedger) -> TestServer {
    let ledger = Arc::new(ledger);
    let custody = Arc::new(MemoryCustody::new());
    let minter = Arc::new(Minter::new(
        ledger.clone(),
        custody.clone(),
        CheckpointStore::in_memory(),
        WalletSession::default(),
        Arc::new(StatusBoard::default()),
    ));
    let services = Services {
        ledger: ledger.clone(),
        minter: minter.clone(),
    };

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server = HttpServer::new(MinterConfig::default(), services, shutdown.clone());
    tokio::spawn(async move {
        let _ = server.run(listener).await;
    });

    let client = reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap();

    TestServer {
        addr,
        ledger,
        custody,
        minter,
        shutdown,
        client,
    }
}

/// Read SSE frames until `stop` returns true for an event name, or the stream ends.
///
/// Returns `(event, data)` pairs in arrival order.
#[allow(dead_code)]
pub async fn read_events(
    mut response: reqwest::Response,
    stop: impl Fn(&str) -> bool,
) -> Vec<(String, Value)> {
    let mut events = Vec::new();
    let mut decoder = SseDecoder::new();

    let read = async {
        while let Some(chunk) = response.chunk().await.unwrap() {
            for frame in decoder.push(&chunk) {
                let value: Value = serde_json::from_str(&frame.data).unwrap();
                let done = stop(&frame.event);
                events.push((frame.event, value));
                if done {
                    return;
                }
            }
        }
    };
    tokio::time::timeout(Duration::from_secs(5), read)
        .await
        .expect("event stream stalled");
    events
}
