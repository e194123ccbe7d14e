use std::collections::HashMap;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder;
use tokio::net::TcpListener;

/// A request as seen by the fake log store.
#[derive(Clone, Debug)]
pub struct Received {
    pub method: String,
    pub path: String,
    pub headers: HashMap<String, String>,
    pub body: String,
}

pub type Store = Arc<Mutex<Vec<Received>>>;

pub struct Collector {
    pub addr: SocketAddr,
    pub store: Store,
}

impl Collector {
    /// Base URL for an emitter endpoint, e.g. `http://127.0.0.1:PORT/api/default`.
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    pub fn received(&self) -> Vec<Received> {
        self.store.lock().unwrap().clone()
    }
}

/// Start a loopback HTTP server answering every request with `status`.
pub async fn start(status: StatusCode) -> Collector {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind collector listener");
    let addr = listener.local_addr().unwrap();
    let store: Store = Arc::new(Mutex::new(Vec::new()));
    let store_clone = store.clone();

    tokio::spawn(async move {
        loop {
            let (stream, _) = listener
                .accept()
                .await
                .expect("failed to accept connection");
            let store = store_clone.clone();
            tokio::spawn(async move {
                let service = service_fn(move |req| {
                    let store = store.clone();
                    handle(req, store, status)
                });
                let _ = Builder::new(TokioExecutor::new())
                    .serve_connection(TokioIo::new(stream), service)
                    .await;
            });
        }
    });

    Collector { addr, store }
}

/// An address nothing listens on.
pub async fn closed_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

async fn handle<B>(
    req: Request<B>,
    store: Store,
    status: StatusCode,
) -> Result<Response<Full<Bytes>>, Infallible>
where
    B: hyper::body::Body<Data = Bytes> + Send + 'static,
{
    let method = req.method().to_string();
    let path = req.uri().path().to_owned();

    let mut headers = HashMap::new();
    for (name, value) in req.headers() {
        if let Ok(v) = value.to_str() {
            headers.insert(name.as_str().to_owned(), v.to_owned());
        }
    }

    let body = req
        .collect()
        .await
        .map(|c| c.to_bytes())
        .unwrap_or_default();

    store.lock().unwrap().push(Received {
        method,
        path,
        headers,
        body: String::from_utf8_lossy(&body).into_owned(),
    });

    Ok(Response::builder()
        .status(status)
        .body(Full::from(r#"{"code":200}"#))
        .unwrap())
}
