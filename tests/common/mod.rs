// Common test utilities and fixtures

use axum::Router;
use axum::body::Body;
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Json;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Mock HTML pages and backend responses
#[allow(dead_code)]
pub mod fixtures {
    pub const APPLICATION_PAGE: &str = r#"
    <!DOCTYPE html>
    <html>
    <head><title>Apply</title></head>
    <body>
        <form id="apply">
            <h2>Senior Engineer</h2>
            <label for="email">Email</label>
            <input id="email" name="email" type="email">
            <label for="given">First name</label>
            <input id="given" name="first_name">
            <textarea id="cover" name="cover"></textarea>
            <select id="country" name="country">
                <option value="">Choose</option>
                <option value="fr">France</option>
                <option value="de">Germany</option>
            </select>
        </form>
    </body>
    </html>
    "#;

    pub const RESPONSE: &str = concat!(
        "Based on your resume, here are my suggestions.\n",
        r#"<action> type({"id": "email"}, "ada@example.com") </action>"#,
        "\nNext the name:\n",
        r#"<action> type({"label": "first name"}, "Ada") </action>"#,
        r#"<action> type({oops}, "ignored") </action>"#,
        r#"<action> type({"name": "cover"}, "Hello,\n\nI build engines.") </action>"#,
        r#"<action> type({"id": "country"}, "GERMANY") </action>"#,
        "\nGood luck!"
    );
}

/// Write `content` into `dir/name`
#[allow(dead_code)]
pub fn write_fixture(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).expect("Failed to write fixture");
    path
}

#[derive(Clone)]
struct MockState {
    requests: Arc<Mutex<Vec<Value>>>,
    chunks: Vec<Vec<u8>>,
    fail_mid_stream: bool,
}

/// Local stand-in for the autofill backend
#[allow(dead_code)]
pub struct MockBackend {
    pub url: String,
    requests: Arc<Mutex<Vec<Value>>>,
}

#[allow(dead_code)]
impl MockBackend {
    /// Serve `body` in chunks of `chunk_size` bytes
    pub async fn start(body: &str, chunk_size: usize) -> Self {
        Self::spawn(body, chunk_size, false).await
    }

    /// Serve the chunks, then break the connection
    pub async fn start_failing(body: &str, chunk_size: usize) -> Self {
        Self::spawn(body, chunk_size, true).await
    }

    async fn spawn(body: &str, chunk_size: usize, fail_mid_stream: bool) -> Self {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let state = MockState {
            requests: requests.clone(),
            chunks: body
                .as_bytes()
                .chunks(chunk_size.max(1))
                .map(<[u8]>::to_vec)
                .collect(),
            fail_mid_stream,
        };

        let app = Router::new()
            .route("/autofil", post(autofill))
            .route("/documents", get(documents))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock backend");
        let addr = listener.local_addr().expect("No local address");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Mock backend failed");
        });

        MockBackend {
            url: format!("http://{}", addr),
            requests,
        }
    }

    /// Autofill request bodies received so far
    pub fn requests(&self) -> Vec<Value> {
        self.requests.lock().expect("Poisoned").clone()
    }
}

async fn autofill(State(state): State<MockState>, Json(request): Json<Value>) -> Response {
    state.requests.lock().expect("Poisoned").push(request);

    let mut items: Vec<Result<Vec<u8>, std::io::Error>> =
        state.chunks.iter().cloned().map(Ok).collect();
    if state.fail_mid_stream {
        items.push(Err(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "backend crashed",
        )));
    }
    Body::from_stream(tokio_stream::iter(items)).into_response()
}

async fn documents(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
    let docs = match params.get("user_id").map(String::as_str) {
        Some("user-1") => json!([
            {"id": "d1", "name": "resume.pdf"},
            {"id": "d2", "name": "cover-letter.pdf"}
        ]),
        _ => json!([]),
    };
    Json(json!({ "docs": docs }))
}
