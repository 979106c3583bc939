use std::{convert::Infallible, future::Future, io, net::SocketAddr, pin::Pin, sync::Arc};

use http::{Request, Response, StatusCode};
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::{
    body::{Body, Bytes, Incoming},
    server::conn::http1,
    service::Service,
};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;

use crate::app::{error_page, WebApplication};

type BoxedFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

pub struct Server {
    addr: SocketAddr,
    app: Arc<WebApplication>,
}

impl Server {
    pub fn new(addr: SocketAddr, app: WebApplication) -> Self {
        Self {
            addr,
            app: Arc::new(app),
        }
    }

    pub async fn bind(self) -> io::Result<()> {
        let listener = TcpListener::bind(self.addr).await?;
        self.serve(listener).await
    }

    /// Accept connections from an already bound `listener`.
    pub async fn serve(self, listener: TcpListener) -> io::Result<()> {
        tracing::info!(addr = %listener.local_addr()?, "listening");

        loop {
            let (stream, peer) = listener.accept().await?;
            let service = AppService {
                app: Arc::clone(&self.app),
            };

            // Use an adapter to access something implementing `tokio::io` traits as if they implement
            // `hyper::rt` IO traits.
            let io = TokioIo::new(stream);

            // Spawn a tokio task to serve multiple connections concurrently
            tokio::task::spawn(async move {
                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    tracing::warn!(%peer, error = %err, "error serving connection");
                }
            });
        }
    }
}

/// Adapts a [`WebApplication`] to hyper's service interface.
#[derive(Clone)]
struct AppService {
    app: Arc<WebApplication>,
}

impl Service<Request<Incoming>> for AppService {
    type Response = Response<Full<Bytes>>;
    type Error = Infallible;
    type Future = BoxedFuture<Result<Self::Response, Self::Error>>;

    fn call(&self, req: Request<Incoming>) -> Self::Future {
        let app = Arc::clone(&self.app);

        Box::pin(async move {
            let max_body_size = app.settings().http.max_body_size;
            let response = match collect_body(req, max_body_size).await {
                // Handlers are synchronous and may block on session or
                // template I/O.
                Ok(req) => tokio::task::spawn_blocking(move || app.dispatch(req))
                    .await
                    .unwrap_or_else(|err| {
                        tracing::error!(error = %err, "dispatch task failed");
                        error_page(StatusCode::INTERNAL_SERVER_ERROR)
                    }),
                Err(status) => error_page(status),
            };
            Ok(response.map(Full::new))
        })
    }
}

async fn collect_body(req: Request<Incoming>, limit: u64) -> Result<Request<Bytes>, StatusCode> {
    if req.body().size_hint().lower() > limit {
        return Err(StatusCode::PAYLOAD_TOO_LARGE);
    }

    let limit = usize::try_from(limit).unwrap_or(usize::MAX);
    let (parts, body) = req.into_parts();
    let body = Limited::new(body, limit)
        .collect()
        .await
        .map_err(|err| {
            if err.downcast_ref::<LengthLimitError>().is_some() {
                StatusCode::PAYLOAD_TOO_LARGE
            } else {
                tracing::debug!(error = %err, "could not read request body");
                StatusCode::BAD_REQUEST
            }
        })?
        .to_bytes();
    Ok(Request::from_parts(parts, body))
}
