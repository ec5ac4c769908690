//! In-process HTTP server standing in for the certificate source in tests.

use axum::{extract::State, http::StatusCode, routing::get, Router};
use parking_lot::Mutex;
use std::{
    net::{Ipv4Addr, SocketAddr},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::{net::TcpListener, task::JoinHandle, time::sleep};

#[derive(Clone, Debug)]
struct Reply {
    status: StatusCode,
    body: String,
    delay: Option<Duration>,
}

#[derive(Debug)]
struct UpstreamState {
    reply: Mutex<Reply>,
    hits: AtomicUsize,
}

pub struct Upstream {
    addr: SocketAddr,
    state: Arc<UpstreamState>,
    task: JoinHandle<()>,
}

impl Upstream {
    pub async fn start(status: StatusCode, body: &str) -> Self {
        let state = Arc::new(UpstreamState {
            reply: Mutex::new(Reply {
                status,
                body: body.to_owned(),
                delay: None,
            }),
            hits: AtomicUsize::new(0),
        });

        let router = Router::new()
            .route("/certs.json", get(Self::handle))
            .with_state(state.clone());

        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        let addr = listener.local_addr().unwrap();
        let task = tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Self { addr, state, task }
    }

    /// A URL on localhost where nothing is listening.
    pub async fn unused_url() -> String {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{}/certs.json", addr)
    }

    pub fn url(&self) -> String {
        format!("http://{}/certs.json", self.addr)
    }

    pub fn respond(&self, status: StatusCode, body: &str) {
        let mut reply = self.state.reply.lock();
        reply.status = status;
        reply.body = body.to_owned();
        reply.delay = None;
    }

    pub fn delay(&self, delay: Duration) {
        self.state.reply.lock().delay = Some(delay);
    }

    pub fn hits(&self) -> usize {
        self.state.hits.load(Ordering::SeqCst)
    }

    async fn handle(State(state): State<Arc<UpstreamState>>) -> (StatusCode, String) {
        state.hits.fetch_add(1, Ordering::SeqCst);
        let reply = state.reply.lock().clone();
        if let Some(delay) = reply.delay {
            sleep(delay).await;
        }
        (reply.status, reply.body)
    }
}

impl Drop for Upstream {
    fn drop(&mut self) {
        self.task.abort();
    }
}
