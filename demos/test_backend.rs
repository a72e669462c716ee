//! demos/test_backend.rs
//! Run: cargo run --example test_backend -- <port> [name]
//!
//! A backend the routing server can sit in front of: `GET /health` reports
//! `{"status":"UP"}`, `POST /api/echo` returns the JSON body with a `port`
//! field added (anything else is echoed unchanged).

use hyper::{
    header::{HeaderValue, CONTENT_TYPE},
    service::{make_service_fn, service_fn},
    Body, Method, Request, Response, Server, StatusCode,
};
use rand::Rng;
use serde_json::{json, Value};
use std::{
    convert::Infallible,
    net::SocketAddr,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::time::sleep;

#[derive(Clone)]
struct BackendState {
    port: u16,
    name: String,
    req_counter: Arc<AtomicU64>,
    healthy_flag: Arc<AtomicBool>,
    slow_ms: u64,
    fail_pct: f64,
}

async fn handle(req: Request<Body>, state: BackendState) -> Result<Response<Body>, Infallible> {
    let path = req.uri().path().to_owned();

    match (req.method(), path.as_str()) {
        (&Method::GET, "/health") => Ok(health(&state)),
        (&Method::POST, "/api/echo") => Ok(echo(req, &state).await),
        _ => Ok(text(StatusCode::NOT_FOUND, "Not Found")),
    }
}

fn health(state: &BackendState) -> Response<Body> {
    if state.healthy_flag.load(Ordering::SeqCst) {
        json_response(StatusCode::OK, &json!({ "status": "UP" }))
    } else {
        json_response(StatusCode::SERVICE_UNAVAILABLE, &json!({ "status": "DOWN" }))
    }
}

async fn echo(req: Request<Body>, state: &BackendState) -> Response<Body> {
    let n = state.req_counter.fetch_add(1, Ordering::SeqCst) + 1;

    if state.slow_ms > 0 {
        sleep(Duration::from_millis(state.slow_ms)).await;
    }

    if state.fail_pct > 0.0 && rand::thread_rng().gen_bool(state.fail_pct / 100.0) {
        return text(StatusCode::INTERNAL_SERVER_ERROR, "Injected failure");
    }

    let bytes = match hyper::body::to_bytes(req.into_body()).await {
        Ok(bytes) => bytes,
        Err(_) => return text(StatusCode::BAD_REQUEST, "Unreadable body"),
    };

    println!("[{}] echo #{} on port {}", state.name, n, state.port);
    match serde_json::from_slice::<Value>(&bytes) {
        Ok(Value::Object(mut map)) => {
            map.insert("port".into(), json!(state.port));
            json_response(StatusCode::OK, &Value::Object(map))
        }
        _ => Response::new(Body::from(bytes)),
    }
}

fn json_response(status: StatusCode, value: &Value) -> Response<Body> {
    let mut response = Response::new(Body::from(value.to_string()));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

fn text(status: StatusCode, message: &'static str) -> Response<Body> {
    let mut response = Response::new(Body::from(message));
    *response.status_mut() = status;
    response
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let port: u16 = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "9001".into())
        .parse()?;
    let name = std::env::args()
        .nth(2)
        .or_else(|| std::env::var("BACKEND_NAME").ok())
        .unwrap_or_else(|| format!("backend-{port}"));

    let slow_ms = std::env::var("SLOW_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(0);
    let fail_pct = std::env::var("FAIL_PCT").ok().and_then(|v| v.parse().ok()).unwrap_or(0.0);
    let flip_secs: Option<u64> = std::env::var("HEALTH_FLIP_SECS")
        .ok()
        .and_then(|v| v.parse().ok());

    let state = BackendState {
        port,
        name: name.clone(),
        req_counter: Arc::new(AtomicU64::new(0)),
        healthy_flag: Arc::new(AtomicBool::new(true)),
        slow_ms,
        fail_pct,
    };

    if let Some(secs) = flip_secs {
        let st = state.clone();
        tokio::spawn(async move {
            loop {
                sleep(Duration::from_secs(secs)).await;
                let cur = st.healthy_flag.load(Ordering::SeqCst);
                st.healthy_flag.store(!cur, Ordering::SeqCst);
                println!(
                    "[{}] Health flipped to {}",
                    st.name,
                    if !cur { "UP" } else { "DOWN" }
                );
            }
        });
    }

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let make_svc = make_service_fn(move |_conn| {
        let st = state.clone();
        async move { Ok::<_, Infallible>(service_fn(move |req| handle(req, st.clone()))) }
    });

    println!(
        "Demo backend '{}' on http://{}  [slow={}ms fail={}%]",
        name, addr, slow_ms, fail_pct
    );

    Server::bind(&addr).serve(make_svc).await?;
    Ok(())
}
