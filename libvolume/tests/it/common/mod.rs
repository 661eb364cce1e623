use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use hyper::{Body, Request, StatusCode};
use libvolume::mount::{MountEngine, MountHandle, MountOptions};
use libvolume::store::FileRemoteStore;
use libvolume::transport::PluginServer;
use libvolume::{Driver, VolumeError};
use tempfile::TempDir;
use tokio::net::UnixStream;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Mount engine that records calls instead of mounting anything.
#[derive(Default)]
pub struct RecordingEngine {
    pub attached: Mutex<Vec<(PathBuf, String)>>,
    pub detached: Mutex<Vec<PathBuf>>,
}

#[async_trait]
impl MountEngine for RecordingEngine {
    async fn attach(
        &self,
        path: &Path,
        remote_ref: &str,
        _options: &MountOptions,
    ) -> Result<MountHandle, VolumeError> {
        self.attached
            .lock()
            .unwrap()
            .push((path.to_path_buf(), remote_ref.to_owned()));
        Ok(MountHandle {
            mountpoint: path.to_path_buf(),
            remote: remote_ref.to_owned(),
        })
    }

    async fn detach(&self, path: &Path) -> Result<(), VolumeError> {
        self.detached.lock().unwrap().push(path.to_path_buf());
        Ok(())
    }
}

pub type TestDriver = Driver<FileRemoteStore, RecordingEngine>;

/// A driver served on a unix socket inside a scratch directory.
pub struct PluginHarness {
    pub dir: TempDir,
    pub socket: PathBuf,
    pub driver: Arc<TestDriver>,
    shutdown: oneshot::Sender<()>,
    server: JoinHandle<Result<(), VolumeError>>,
}

impl PluginHarness {
    pub async fn start() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let socket = dir.path().join("plugins/test.sock");
        let driver = Arc::new(Driver::new(
            dir.path().join("volumes"),
            FileRemoteStore::new(dir.path().join("remotes.json")),
            RecordingEngine::default(),
        ));

        let server = PluginServer::bind(&socket, None, Arc::clone(&driver)).unwrap();
        let (shutdown, rx) = oneshot::channel();
        let server = tokio::spawn(server.serve_until(async move {
            let _ = rx.await;
        }));

        Self {
            dir,
            socket,
            driver,
            shutdown,
            server,
        }
    }

    pub fn base_dir(&self) -> PathBuf {
        self.dir.path().join("volumes")
    }

    /// POST `body` to `endpoint` and return the status and decoded reply.
    pub async fn post(&self, endpoint: &str, body: &str) -> (StatusCode, serde_json::Value) {
        let request = Request::post(endpoint)
            .header("host", "plugin")
            .body(Body::from(body.to_owned()))
            .unwrap();
        self.send(request).await
    }

    /// Send `request` on a fresh connection.
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let stream = UnixStream::connect(&self.socket).await.unwrap();
        let (mut sender, connection) = hyper::client::conn::handshake(stream).await.unwrap();
        tokio::spawn(connection);

        let response = sender.send_request(request).await.unwrap();
        let status = response.status();
        let content_type = response
            .headers()
            .get(hyper::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        assert_eq!(
            content_type.as_deref(),
            Some(libvolume::message::CONTENT_TYPE)
        );

        let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    pub async fn close(self) {
        let _ = self.shutdown.send(());
        self.server.await.unwrap().unwrap();
        assert!(!self.socket.exists(), "socket should be removed on shutdown");
    }
}
