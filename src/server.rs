//! A minimal HTTP listener that serves the current frame of a mirror as PNG.
//!
//! Every GET request is answered with the latest complete frame, whatever path
//! was requested. Requests are served by `hyper` on a `tokio` runtime, which is
//! driven by a background thread of its own.

use std::convert::Infallible;
use std::net::{SocketAddr, TcpListener};
use std::thread;
use std::time::Duration;

use hyper::header::{ALLOW, CONTENT_TYPE};
use hyper::server::conn::AddrStream;
use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Method, Request, Response, Server, StatusCode};
use tokio::runtime;
use tokio::sync::oneshot;

use crate::errors::*;
use crate::mirror::Snapshot;
use crate::settings::ServerParams;

/// Limits the bytes buffered while reading a request head.
const MAX_HEAD_BYTES: usize = 16 * 1024;

pub struct SnapshotServer {
    address: SocketAddr,
    quit: Option<oneshot::Sender<()>>,
    worker: Option<thread::JoinHandle<()>>,
}

impl SnapshotServer {
    /// Binds `params.address` and starts serving `snapshot` on a background
    /// thread.
    pub fn bind(params: &ServerParams, snapshot: Snapshot) -> Result<Self> {
        params.validate()?;

        let listener = TcpListener::bind(params.address.as_str())?;
        let address = listener.local_addr()?;

        let runtime = runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        let (quit, signal) = oneshot::channel::<()>();
        let server = {
            // The listener is registered with the reactor of this runtime.
            let _guard = runtime.enter();

            let make = make_service_fn(move |stream: &AddrStream| {
                let peer = stream.remote_addr();
                let snapshot = snapshot.clone();
                async move {
                    Ok::<_, Infallible>(service_fn(move |request| {
                        Self::serve(request, snapshot.clone(), peer)
                    }))
                }
            });

            Server::from_tcp(listener)?
                .http1_keepalive(false)
                .http1_max_buf_size(MAX_HEAD_BYTES)
                .http1_header_read_timeout(Duration::from_millis(params.header_timeout_ms))
                .serve(make)
                .with_graceful_shutdown(async move {
                    let _ = signal.await;
                })
        };

        let worker = thread::Builder::new()
            .name("snapshot-server".into())
            .spawn(move || {
                if let Err(err) = runtime.block_on(server) {
                    error!("[SnapshotServer] stops unexpectedly: {}", err);
                }
            })?;

        info!("[SnapshotServer] listens on {}.", address);

        Ok(SnapshotServer {
            address,
            quit: Some(quit),
            worker: Some(worker),
        })
    }

    /// Gets the address actually bound, which resolves port `0`.
    #[inline]
    pub fn local_addr(&self) -> SocketAddr {
        self.address
    }

    /// Stops accepting connections. Requests in flight are completed.
    pub fn shutdown(&mut self) {
        if let Some(quit) = self.quit.take() {
            let _ = quit.send(());
        }

        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("[SnapshotServer] server thread panicked.");
            }

            info!("[SnapshotServer] stops listening on {}.", self.address);
        }
    }

    async fn serve(
        request: Request<Body>,
        snapshot: Snapshot,
        peer: SocketAddr,
    ) -> ::std::result::Result<Response<Body>, hyper::http::Error> {
        if request.method() != Method::GET {
            debug!(
                "[SnapshotServer] rejects {} {} from {}.",
                request.method(),
                request.uri(),
                peer
            );

            return Response::builder()
                .status(StatusCode::METHOD_NOT_ALLOWED)
                .header(ALLOW, "GET")
                .body(Body::empty());
        }

        // Encoding holds the read lock of the frame, so it is kept off the
        // reactor.
        let encoded = tokio::task::spawn_blocking(move || {
            let mut body = Vec::new();
            snapshot.write_png(&mut body).map(|_| body)
        })
        .await;

        match encoded {
            Ok(Ok(body)) => {
                trace!("[SnapshotServer] serves {} bytes to {}.", body.len(), peer);
                Response::builder()
                    .header(CONTENT_TYPE, "image/png")
                    .body(Body::from(body))
            }
            Ok(Err(err)) => {
                error!("[SnapshotServer] failed to serve {}: {}", peer, err);
                Self::failure()
            }
            Err(err) => {
                error!("[SnapshotServer] encoder of {} panicked: {}", peer, err);
                Self::failure()
            }
        }
    }

    fn failure() -> ::std::result::Result<Response<Body>, hyper::http::Error> {
        Response::builder()
            .status(StatusCode::INTERNAL_SERVER_ERROR)
            .body(Body::empty())
    }
}

impl Drop for SnapshotServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}
