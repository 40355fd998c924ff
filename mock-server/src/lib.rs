use std::{collections::BTreeMap, convert::Infallible, sync::Arc, time::Duration};

use axum::{
    body::{Body, Bytes},
    extract::{Path, Query, State},
    http::{
        header::{CONTENT_TYPE, COOKIE, SET_COOKIE},
        HeaderMap, HeaderValue, Method, Uri,
    },
    response::{IntoResponse, Redirect, Response},
    routing::{any, get},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;

/// What the server saw, returned by `/echo`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Echo {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    /// Lower-case header names; repeated headers are joined with `, `.
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: u32,
    pub name: String,
}

#[derive(Clone)]
struct ServerState {
    name: Arc<str>,
}

pub fn app() -> Router {
    app_named("mock")
}

/// Router whose `/whoami` answers `name`, to tell servers apart.
pub fn app_named(name: &str) -> Router {
    Router::new()
        .route("/echo", any(echo))
        .route("/redirect/{n}", get(redirect))
        .route("/bytes/{n}", get(bytes))
        .route("/json", get(json_item))
        .route("/xml", get(xml_item))
        .route("/html", get(html))
        .route("/cookies", get(cookies))
        .route("/cookies/set", get(set_cookies))
        .route("/slow/{ms}", get(slow))
        .route("/drip/{ms}", get(drip))
        .route("/whoami", get(whoami))
        .with_state(ServerState { name: name.into() })
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

pub async fn run_named(listener: TcpListener, name: &str) -> Result<(), std::io::Error> {
    axum::serve(listener, app_named(name)).await
}

async fn echo(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Json<Echo> {
    let mut seen: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in &headers {
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        seen.entry(name.as_str().to_string())
            .and_modify(|v| {
                v.push_str(", ");
                v.push_str(&value);
            })
            .or_insert(value);
    }
    Json(Echo {
        method: method.to_string(),
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        headers: seen,
        body: String::from_utf8_lossy(&body).into_owned(),
    })
}

/// `n` more hops, then `done`.
async fn redirect(Path(n): Path<u32>) -> Response {
    if n == 0 {
        return "done".into_response();
    }
    Redirect::to(&format!("/redirect/{}", n - 1)).into_response()
}

async fn bytes(Path(n): Path<usize>) -> impl IntoResponse {
    ([(CONTENT_TYPE, "application/octet-stream")], vec![b'a'; n])
}

async fn json_item() -> Json<Item> {
    Json(Item {
        id: 1,
        name: "widget".to_string(),
    })
}

async fn xml_item() -> impl IntoResponse {
    (
        [(CONTENT_TYPE, "application/xml")],
        "<item><id>1</id><name>widget</name></item>",
    )
}

async fn html() -> impl IntoResponse {
    (
        [(CONTENT_TYPE, "text/html; charset=utf-8")],
        "&lt;p&gt;fish &amp; chips&lt;/p&gt;",
    )
}

async fn cookies(headers: HeaderMap) -> String {
    headers
        .get(COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string()
}

/// Every query pair becomes a `Set-Cookie`.
async fn set_cookies(Query(pairs): Query<BTreeMap<String, String>>) -> impl IntoResponse {
    let mut headers = HeaderMap::new();
    for (name, value) in pairs {
        if let Ok(v) = HeaderValue::from_str(&format!("{name}={value}; Path=/")) {
            headers.append(SET_COOKIE, v);
        }
    }
    (headers, "set")
}

async fn slow(Path(ms): Path<u64>) -> &'static str {
    tokio::time::sleep(Duration::from_millis(ms)).await;
    "slow"
}

/// Headers and `a` right away, then `b` after `ms` milliseconds.
async fn drip(Path(ms): Path<u64>) -> Body {
    let chunks = futures_util::stream::unfold(0u8, move |step| async move {
        match step {
            0 => Some((Ok::<_, Infallible>(Bytes::from_static(b"a")), 1)),
            1 => {
                tokio::time::sleep(Duration::from_millis(ms)).await;
                Some((Ok(Bytes::from_static(b"b")), 2))
            }
            _ => None,
        }
    });
    Body::from_stream(chunks)
}

async fn whoami(State(state): State<ServerState>) -> String {
    state.name.to_string()
}
