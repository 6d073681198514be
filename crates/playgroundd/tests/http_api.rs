//! Share API over a real socket, driven through `ShareClient`.

use std::sync::Arc;

use playground_share::{
    FsShareStore, MemoryShareStore, ShareClient, ShareError, ShareId, ShareService, ShareStore,
    SHARE_ROUTE,
};
use tokio::sync::oneshot;

struct TestServer {
    base_url: String,
    stop: Option<oneshot::Sender<()>>,
    task: tokio::task::JoinHandle<std::io::Result<()>>,
}

impl TestServer {
    async fn start(store: Arc<dyn ShareStore>, max_bytes: usize) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (stop, stopped) = oneshot::channel::<()>();
        let app = playgroundd::router(ShareService::new(store, max_bytes));
        let task = tokio::spawn(playgroundd::serve(listener, app, async {
            stopped.await.ok();
        }));

        Self {
            base_url: format!("http://{}", addr),
            stop: Some(stop),
            task,
        }
    }

    fn client(&self) -> ShareClient {
        ShareClient::new(&self.base_url)
    }

    async fn stop(mut self) {
        if let Some(stop) = self.stop.take() {
            stop.send(()).ok();
        }
        self.task.await.unwrap().unwrap();
    }
}

#[tokio::test]
async fn test_put_then_get() {
    let server = TestServer::start(Arc::new(MemoryShareStore::new()), 1024 * 1000).await;
    let client = server.client();

    let code = "variable \"region\" {\n  default = \"us\"\n}\n";
    let id = client.put(code).await.unwrap();
    assert_eq!(id, ShareId::for_code(code));

    let record = client.get(&id).await.unwrap();
    assert_eq!(record.code, code);

    // Same source, same id.
    assert_eq!(client.put(code).await.unwrap(), id);

    server.stop().await;
}

#[tokio::test]
async fn test_unknown_id_is_not_found() {
    let server = TestServer::start(Arc::new(MemoryShareStore::new()), 1024).await;

    let id: ShareId = "0123456789".parse().unwrap();
    match server.client().get(&id).await {
        Err(ShareError::NotFound { id }) => assert_eq!(id, "0123456789"),
        other => panic!("Expected NotFound, got {:?}", other),
    }

    server.stop().await;
}

#[tokio::test]
async fn test_oversized_payload_rejected_with_limit() {
    let store = Arc::new(MemoryShareStore::new());
    let server = TestServer::start(store.clone(), 100).await;

    match server.client().put(&"x".repeat(200)).await {
        Err(ShareError::PayloadTooLarge { size, limit }) => {
            assert_eq!(size, 211);
            assert_eq!(limit, 100);
        }
        other => panic!("Expected PayloadTooLarge, got {:?}", other),
    }
    assert!(store.is_empty());

    server.stop().await;
}

#[tokio::test]
async fn test_payload_at_limit_accepted() {
    let server = TestServer::start(Arc::new(MemoryShareStore::new()), 100).await;

    // {"code":"..."} adds 11 bytes of envelope.
    let id = server.client().put(&"x".repeat(89)).await.unwrap();
    assert_eq!(id.as_str().len(), 10);

    server.stop().await;
}

#[tokio::test]
async fn test_bad_requests_are_400() {
    let server = TestServer::start(Arc::new(MemoryShareStore::new()), 1024).await;
    let http = reqwest::Client::new();
    let url = format!("{}{}", server.base_url, SHARE_ROUTE);

    let resp = http
        .post(&url)
        .header("content-type", "application/json")
        .body("{\"source\": 1}")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);

    let resp = http
        .get(format!("{}/not-an-id", url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("invalid share id"));
    assert!(body.get("limit").is_none());

    server.stop().await;
}

#[tokio::test]
async fn test_filesystem_store_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let code = "output \"x\" { value = 1 }";

    let server =
        TestServer::start(Arc::new(FsShareStore::new(dir.path()).unwrap()), 1024).await;
    let id = server.client().put(code).await.unwrap();
    server.stop().await;

    let server =
        TestServer::start(Arc::new(FsShareStore::new(dir.path()).unwrap()), 1024).await;
    assert_eq!(server.client().get(&id).await.unwrap().code, code);
    server.stop().await;
}

#[tokio::test]
async fn test_health() {
    let server = TestServer::start(Arc::new(MemoryShareStore::new()), 1024).await;
    let body: serde_json::Value = reqwest::get(format!("{}/health", server.base_url))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], playground_core::VERSION);
    server.stop().await;
}
