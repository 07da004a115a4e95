#![allow(dead_code)]

use std::{
    io::Write,
    net::SocketAddr,
    path::{Path, PathBuf},
    sync::Mutex,
};

use axum::{
    body::{Body, Bytes},
    http::{
        header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE},
        Response, StatusCode,
    },
    routing::get,
    Router,
};
use futures_util::StreamExt;
use idf_core::{
    environment::{EnvironmentError, EnvironmentStore},
    progress::ProgressEvent,
};
use tokio::{net::TcpListener, sync::mpsc::UnboundedReceiver};

pub struct TestHttpServer {
    addr: SocketAddr,
}

impl TestHttpServer {
    pub async fn spawn(router: Router) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        Self { addr }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }
}

/// Serves `body` with a known length and an optional `Content-Disposition`.
pub fn file_route(router: Router, path: &str, body: Vec<u8>, disposition: Option<&'static str>) -> Router {
    router.route(
        path,
        get(move || {
            let body = body.clone();
            async move {
                let mut response = Response::builder()
                    .status(StatusCode::OK)
                    .header(CONTENT_TYPE, "application/zip")
                    .header(CONTENT_LENGTH, body.len());
                if let Some(disposition) = disposition {
                    response = response.header(CONTENT_DISPOSITION, disposition);
                }
                response.body(Body::from(body)).unwrap()
            }
        }),
    )
}

/// Serves `body` in `pieces` chunks without a `Content-Length`.
pub fn chunked_route(router: Router, path: &str, body: Vec<u8>, pieces: usize) -> Router {
    router.route(
        path,
        get(move || {
            let body = body.clone();
            async move {
                let size = body.len().div_ceil(pieces);
                let chunks = body
                    .chunks(size)
                    .map(|chunk| Ok::<_, std::io::Error>(Bytes::copy_from_slice(chunk)))
                    .collect::<Vec<_>>();

                Response::builder()
                    .status(StatusCode::OK)
                    .body(Body::from_stream(futures_util::stream::iter(chunks)))
                    .unwrap()
            }
        }),
    )
}

/// Announces `declared` bytes, sends `sent` bytes and then never finishes.
pub fn stalling_route(router: Router, path: &str, declared: usize, sent: usize) -> Router {
    router.route(
        path,
        get(move || async move {
            let stream = futures_util::stream::iter(vec![Ok::<_, std::io::Error>(Bytes::from(vec![7_u8; sent]))])
                .chain(futures_util::stream::pending());

            Response::builder()
                .status(StatusCode::OK)
                .header(CONTENT_LENGTH, declared)
                .body(Body::from_stream(stream))
                .unwrap()
        }),
    )
}

/// Accepts the request and never answers it.
pub fn hanging_route(router: Router, path: &str) -> Router {
    router.route(
        path,
        get(|| async {
            futures_util::future::pending::<()>().await;
            StatusCode::OK
        }),
    )
}

/// Streams `pieces` chunks of `piece` bytes as fast as the client reads them.
pub fn flowing_route(router: Router, path: &str, piece: usize, pieces: usize) -> Router {
    router.route(
        path,
        get(move || async move {
            let stream = futures_util::stream::iter(0..pieces)
                .map(move |_| Ok::<_, std::io::Error>(Bytes::from(vec![3_u8; piece])));

            Response::builder()
                .status(StatusCode::OK)
                .header(CONTENT_LENGTH, piece * pieces)
                .body(Body::from_stream(stream))
                .unwrap()
        }),
    )
}

pub fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    let options = zip::write::FileOptions::default();

    for (name, data) in entries {
        if name.ends_with('/') {
            writer.add_directory(*name, options).unwrap();
        } else {
            writer.start_file(*name, options).unwrap();
            writer.write_all(data).unwrap();
        }
    }

    writer.finish().unwrap().into_inner()
}

/// Records every write instead of touching a real environment.
#[derive(Default)]
pub struct RecordingEnvironment {
    writes: Mutex<Vec<(String, PathBuf)>>,
}

impl RecordingEnvironment {
    pub fn writes(&self) -> Vec<(String, PathBuf)> {
        self.writes.lock().unwrap().clone()
    }
}

impl EnvironmentStore for RecordingEnvironment {
    fn set_variable(&self, key: &str, value: &Path) -> Result<(), EnvironmentError> {
        self.writes
            .lock()
            .unwrap()
            .push((key.to_string(), value.to_path_buf()));
        Ok(())
    }
}

/// Waits until the first `Worked` event arrives.
pub async fn wait_for_work(rx: &mut UnboundedReceiver<ProgressEvent>) {
    while let Some(event) = rx.recv().await {
        if matches!(event, ProgressEvent::Worked { .. }) {
            return;
        }
    }
    panic!("progress channel closed before any work was reported");
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}
