use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::net::TcpListener;
use tracing::debug;

pub use axum::http::StatusCode;

/// API key accepted by the default state; the client sends it when no key is
/// configured.
pub const DEFAULT_API_KEY: &str = "test";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub postcode: String,
    pub number: u32,
    pub street: String,
    pub city: String,
    pub municipality: String,
    pub province: String,
}

/// A raw response returned verbatim for one postcode/number pair.
#[derive(Clone, Debug)]
pub struct CannedResponse {
    pub status: StatusCode,
    pub body: String,
}

#[derive(Debug)]
pub struct MockState {
    api_key: String,
    addresses: HashMap<(String, String), Address>,
    canned: HashMap<(String, String), CannedResponse>,
    hits: AtomicUsize,
}

impl MockState {
    /// A state accepting `api_key` and seeded with the fixture addresses.
    pub fn new(api_key: &str) -> Self {
        let mut state = Self {
            api_key: api_key.to_string(),
            addresses: HashMap::new(),
            canned: HashMap::new(),
            hits: AtomicUsize::new(0),
        };
        for address in fixtures() {
            state = state.with_address(address);
        }
        state
    }

    pub fn with_address(mut self, address: Address) -> Self {
        let key = (address.postcode.clone(), address.number.to_string());
        self.addresses.insert(key, address);
        self
    }

    pub fn with_canned(mut self, postcode: &str, number: &str, status: StatusCode, body: &str) -> Self {
        self.canned.insert(
            (postcode.to_string(), number.to_string()),
            CannedResponse {
                status,
                body: body.to_string(),
            },
        );
        self
    }

    /// Number of lookup requests received, including rejected ones.
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

impl Default for MockState {
    fn default() -> Self {
        Self::new(DEFAULT_API_KEY)
    }
}

pub fn fixtures() -> Vec<Address> {
    vec![
        Address {
            postcode: "6545CA".to_string(),
            number: 29,
            street: "Waldeck Pyrmontsingel".to_string(),
            city: "Nijmegen".to_string(),
            municipality: "Nijmegen".to_string(),
            province: "Gelderland".to_string(),
        },
        Address {
            postcode: "1012JS".to_string(),
            number: 1,
            street: "Dam".to_string(),
            city: "Amsterdam".to_string(),
            municipality: "Amsterdam".to_string(),
            province: "Noord-Holland".to_string(),
        },
        Address {
            postcode: "9712CP".to_string(),
            number: 1,
            street: "Grote Markt".to_string(),
            city: "Groningen".to_string(),
            municipality: "Groningen".to_string(),
            province: "Groningen".to_string(),
        },
    ]
}

pub type Db = Arc<MockState>;

pub fn app() -> Router {
    app_with_state(Arc::new(MockState::default()))
}

pub fn app_with_state(state: Db) -> Router {
    Router::new()
        .route("/v3/lookup/{postcode}/{number}", get(lookup))
        .with_state(state)
}

pub async fn run(listener: TcpListener, state: Db) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_state(state)).await
}

async fn lookup(
    State(db): State<Db>,
    Path((postcode, number)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    db.hits.fetch_add(1, Ordering::SeqCst);
    debug!(%postcode, %number, "lookup");

    let key = headers.get("x-api-key").and_then(|v| v.to_str().ok());
    if key != Some(db.api_key.as_str()) {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "title": "Invalid API key" })),
        )
            .into_response();
    }

    let id = (postcode, number);
    if let Some(canned) = db.canned.get(&id) {
        return (canned.status, canned.body.clone()).into_response();
    }

    match db.addresses.get(&id) {
        Some(address) => Json(address.clone()).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "title": "Resource not found" })),
        )
            .into_response(),
    }
}
