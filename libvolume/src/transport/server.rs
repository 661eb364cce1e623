//! Plugin socket server and request dispatch.

use std::convert::Infallible;
use std::future::Future;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use hyper::body::HttpBody;
use hyper::server::conn::Http;
use hyper::service::service_fn;
use hyper::{Body, Method, Request, Response, StatusCode, header};
use nix::unistd::{Gid, chown};
use tokio::net::UnixListener;
use tracing::{debug, error, info, instrument, warn};

use crate::error::VolumeError;
use crate::message::{CONTENT_TYPE, Endpoint, PluginRequest, PluginResponse};
use crate::plugin::VolumePlugin;

/// Permission bits of the plugin socket.
const SOCKET_MODE: u32 = 0o660;

/// Upper bound on a request body.
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// HTTP status and JSON body of a plugin reply.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub status: StatusCode,
    pub body: serde_json::Value,
}

impl Reply {
    fn new(status: StatusCode, response: &PluginResponse) -> Self {
        Self {
            status,
            body: response.to_json(),
        }
    }
}

/// Route a decoded request to the matching [`VolumePlugin`] call.
pub async fn dispatch<T: VolumePlugin + ?Sized>(
    handler: &T,
    request: PluginRequest,
) -> PluginResponse {
    let result = match request {
        PluginRequest::Activate => Ok(PluginResponse::Activated),
        PluginRequest::Create { name, options } => handler
            .create(&name, options)
            .await
            .map(|()| PluginResponse::Ok),
        PluginRequest::Remove(name) => handler.remove(&name).await.map(|()| PluginResponse::Ok),
        PluginRequest::List => handler.list().await.map(PluginResponse::Volumes),
        PluginRequest::Get(name) => handler.get(&name).await.map(PluginResponse::Volume),
        PluginRequest::Path(name) => handler.path(&name).await.map(PluginResponse::Mountpoint),
        PluginRequest::Mount(req) => handler.mount(&req).await.map(PluginResponse::Mountpoint),
        PluginRequest::Unmount(req) => handler.unmount(&req).await.map(|()| PluginResponse::Ok),
        PluginRequest::Capabilities => handler
            .capabilities()
            .await
            .map(PluginResponse::Capabilities),
    };
    result.unwrap_or_else(PluginResponse::from)
}

/// Decode the body posted to `path`, dispatch it and build the reply.
///
/// Unknown paths answer 404, failures 500, both with an `Err` body.
pub async fn handle<T: VolumePlugin + ?Sized>(handler: &T, path: &str, body: &[u8]) -> Reply {
    let Some(endpoint) = Endpoint::from_path(path) else {
        warn!(%path, "unknown plugin endpoint");
        let response = PluginResponse::from(VolumeError::InvalidRequest(format!(
            "unknown endpoint {path}"
        )));
        return Reply::new(StatusCode::NOT_FOUND, &response);
    };

    let response = match PluginRequest::decode(endpoint, body) {
        Ok(request) => {
            debug!(%request, "plugin request received");
            dispatch(handler, request).await
        }
        Err(e) => PluginResponse::from(e),
    };

    if let PluginResponse::Error(message) = &response {
        warn!(%path, error = %message, "plugin request failed");
        return Reply::new(StatusCode::INTERNAL_SERVER_ERROR, &response);
    }
    Reply::new(StatusCode::OK, &response)
}

/// Serves a [`VolumePlugin`] on a unix socket.
pub struct PluginServer<T: ?Sized> {
    listener: UnixListener,
    socket_path: PathBuf,
    handler: Arc<T>,
}

impl<T> PluginServer<T>
where
    T: VolumePlugin + ?Sized + 'static,
{
    /// Bind the plugin socket at `socket_path`.
    ///
    /// The parent directory is created if needed and a stale socket from a
    /// previous run is removed. The socket gets mode `0660` and, when `gid`
    /// is given, that group.
    pub fn bind(
        socket_path: impl Into<PathBuf>,
        gid: Option<u32>,
        handler: Arc<T>,
    ) -> Result<Self, VolumeError> {
        let socket_path = socket_path.into();
        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| VolumeError::fs(parent, e))?;
        }
        match std::fs::remove_file(&socket_path) {
            Ok(()) => debug!(path = %socket_path.display(), "removed stale socket"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(VolumeError::fs(&socket_path, e)),
        }

        let listener = UnixListener::bind(&socket_path).map_err(|e| {
            VolumeError::Transport(format!("bind {}: {e}", socket_path.display()))
        })?;

        std::fs::set_permissions(&socket_path, std::fs::Permissions::from_mode(SOCKET_MODE))
            .map_err(|e| VolumeError::fs(&socket_path, e))?;
        if let Some(gid) = gid {
            chown(&socket_path, None, Some(Gid::from_raw(gid)))
                .map_err(|e| VolumeError::fs(&socket_path, e.into()))?;
        }

        info!(path = %socket_path.display(), ?gid, "volume plugin listening");
        Ok(Self {
            listener,
            socket_path,
            handler,
        })
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Accept connections until the listener fails.
    ///
    /// Every connection is served on its own Tokio task.
    pub async fn serve(&self) -> Result<(), VolumeError> {
        loop {
            let (stream, _) = self.listener.accept().await.map_err(VolumeError::transport)?;
            let handler = Arc::clone(&self.handler);
            tokio::spawn(async move {
                let service = service_fn(move |req| {
                    let handler = Arc::clone(&handler);
                    async move { Ok::<_, Infallible>(Self::handle_request(req, &*handler).await) }
                });
                if let Err(e) = Http::new().serve_connection(stream, service).await {
                    error!(error = %e, "plugin connection error");
                }
            });
        }
    }

    /// Serve until `shutdown` resolves, then remove the socket file.
    pub async fn serve_until<F>(self, shutdown: F) -> Result<(), VolumeError>
    where
        F: Future<Output = ()>,
    {
        let result = tokio::select! {
            result = self.serve() => result,
            () = shutdown => Ok(()),
        };
        if let Err(e) = std::fs::remove_file(&self.socket_path) {
            warn!(path = %self.socket_path.display(), error = %e, "failed to remove socket");
        }
        info!(path = %self.socket_path.display(), "volume plugin stopped");
        result
    }

    #[instrument(skip_all, fields(path = %req.uri().path()))]
    async fn handle_request(req: Request<Body>, handler: &T) -> Response<Body> {
        if req.method() != Method::POST {
            let reply = Reply::new(
                StatusCode::METHOD_NOT_ALLOWED,
                &PluginResponse::Error(format!("method {} not allowed", req.method())),
            );
            return Self::into_response(reply);
        }

        let path = req.uri().path().to_owned();
        let body = match read_body(req.into_body()).await {
            Ok(body) => body,
            Err(e) => {
                let reply = Reply::new(StatusCode::BAD_REQUEST, &PluginResponse::from(e));
                return Self::into_response(reply);
            }
        };

        Self::into_response(handle(handler, &path, &body).await)
    }

    fn into_response(reply: Reply) -> Response<Body> {
        let mut response = Response::new(Body::from(reply.body.to_string()));
        *response.status_mut() = reply.status;
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static(CONTENT_TYPE),
        );
        response
    }
}

/// Collect the request body, giving up as soon as it passes
/// [`MAX_BODY_BYTES`].
async fn read_body(mut body: Body) -> Result<Vec<u8>, VolumeError> {
    let too_large =
        || VolumeError::InvalidRequest(format!("request body exceeds {MAX_BODY_BYTES} bytes"));

    // A declared Content-Length shows up as the lower bound.
    if body.size_hint().lower() > MAX_BODY_BYTES as u64 {
        return Err(too_large());
    }

    let mut buf = Vec::new();
    while let Some(chunk) = body.data().await {
        let chunk = chunk.map_err(VolumeError::transport)?;
        if buf.len() + chunk.len() > MAX_BODY_BYTES {
            return Err(too_large());
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(buf)
}
