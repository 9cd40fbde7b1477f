//! In-process fake of the messaging backend, served by axum on 127.0.0.1:0.

#![allow(dead_code)]

use std::sync::Arc;

use axum::extract::{Multipart, Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{json, Value};

pub const TOKEN: &str = "tok";
pub const PASSWORD: &str = "secret";

/// One multipart field as the server received it
#[derive(Debug, Clone)]
pub struct Field {
    pub name: String,
    pub file_name: Option<String>,
    pub bytes: Vec<u8>,
}

impl Field {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

pub fn field<'a>(fields: &'a [Field], name: &str) -> Option<&'a Field> {
    fields.iter().find(|f| f.name == name)
}

#[derive(Debug, Default)]
pub struct FakeState {
    pub me: String,
    pub users: Vec<Value>,
    pub messages: Vec<Value>,
    pub groups: Vec<Value>,
    pub fail_messages: bool,
    pub user_lookups: usize,
    pub sent: Vec<Vec<Field>>,
    pub registrations: Vec<Vec<Field>>,
    pub profile_updates: Vec<Vec<Field>>,
    pub contacts_added: Vec<(String, String)>,
    pub groups_created: Vec<Value>,
}

impl FakeState {
    /// u1 (Awa) talks to u2 privately, is in group g1 with u3, and has a
    /// message from u4, whom the server does not know.
    pub fn fixture() -> Self {
        Self {
            me: "u1".to_string(),
            users: vec![
                json!({"id": "u1", "name": "Awa", "status": "en ligne", "groups": ["g1"]}),
                json!({"id": "u2", "name": "Moussa", "avatar": "/avatars/u2.png"}),
                json!({"id": "u3", "name": "Fatou"}),
            ],
            messages: vec![
                json!({"id": 1, "sender": "u1", "recipient": "u2", "content": "salut",
                       "timestamp": "2024-01-01T10:00:00Z", "type": "text"}),
                json!({"id": 2, "sender": "u2", "recipient": "u1", "content": "ça va ?",
                       "timestamp": "2024-01-01T10:01:00Z"}),
                json!({"id": 3, "sender": "u3", "recipient": "g1", "content": "bonjour",
                       "timestamp": "2024-01-01T10:02:00Z", "type": "text"}),
                json!({"id": 4, "sender": "u4", "recipient": "u1", "content": "hello",
                       "timestamp": "2024-01-01T10:03:00Z", "type": "text"}),
            ],
            groups: vec![
                json!({"id": "g1", "name": "Famille", "members": ["u1", "u3"]}),
                json!({"id": "g2", "name": "Travail", "members": ["u2", "u3"]}),
            ],
            ..Default::default()
        }
    }
}

pub type Shared = Arc<Mutex<FakeState>>;

pub struct FakeServer {
    pub base_url: String,
    pub state: Shared,
}

pub async fn start(state: FakeState) -> FakeServer {
    let state = Arc::new(Mutex::new(state));
    let app = Router::new()
        .route("/api/users/login", post(login))
        .route("/api/users/register", post(register))
        .route("/api/users/me", get(me).put(update_me))
        .route("/api/users/by-username/:name", get(user_by_username))
        .route("/api/users/:id", get(user_by_id))
        .route("/api/users/:id/contacts", post(add_contact))
        .route("/api/messages", get(list_messages).post(send_message))
        .route("/api/groups", get(list_groups).post(create_group))
        .route("/api/groups/:id", get(group_by_id))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    FakeServer {
        base_url: format!("http://{addr}"),
        state,
    }
}

type Reply = Result<Json<Value>, StatusCode>;

fn authorize(headers: &HeaderMap) -> Result<(), StatusCode> {
    let expected = format!("Bearer {TOKEN}");
    match headers.get("authorization").and_then(|v| v.to_str().ok()) {
        Some(value) if value == expected => Ok(()),
        _ => Err(StatusCode::UNAUTHORIZED),
    }
}

async fn read_fields(mut multipart: Multipart) -> Vec<Field> {
    let mut fields = Vec::new();
    while let Some(part) = multipart.next_field().await.unwrap() {
        let name = part.name().unwrap_or_default().to_string();
        let file_name = part.file_name().map(str::to_string);
        let bytes = part.bytes().await.unwrap().to_vec();
        fields.push(Field {
            name,
            file_name,
            bytes,
        });
    }
    fields
}

fn find_user(state: &FakeState, id: &str) -> Option<Value> {
    state.users.iter().find(|u| u["id"] == id).cloned()
}

async fn login(Json(body): Json<Value>) -> Reply {
    if body["password"] == PASSWORD {
        Ok(Json(json!({ "token": TOKEN })))
    } else {
        Err(StatusCode::UNAUTHORIZED)
    }
}

async fn register(State(state): State<Shared>, multipart: Multipart) -> Reply {
    let fields = read_fields(multipart).await;
    state.lock().registrations.push(fields);
    Ok(Json(json!({ "token": "tok-new" })))
}

async fn me(State(state): State<Shared>, headers: HeaderMap) -> Reply {
    authorize(&headers)?;
    let state = state.lock();
    find_user(&state, &state.me)
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

async fn update_me(State(state): State<Shared>, headers: HeaderMap, multipart: Multipart) -> Reply {
    authorize(&headers)?;
    let fields = read_fields(multipart).await;
    let mut state = state.lock();
    let name = field(&fields, "name").map(Field::text).unwrap_or_default();
    let status = field(&fields, "status").map(Field::text).unwrap_or_default();
    state.profile_updates.push(fields);
    let mut user = find_user(&state, &state.me).ok_or(StatusCode::NOT_FOUND)?;
    user["name"] = json!(name);
    user["status"] = json!(status);
    Ok(Json(user))
}

async fn user_by_id(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Reply {
    authorize(&headers)?;
    let mut state = state.lock();
    state.user_lookups += 1;
    find_user(&state, &id).map(Json).ok_or(StatusCode::NOT_FOUND)
}

async fn user_by_username(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(name): Path<String>,
) -> Reply {
    authorize(&headers)?;
    let state = state.lock();
    state
        .users
        .iter()
        .find(|u| u["name"] == name.as_str())
        .cloned()
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

async fn add_contact(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(contact): Json<String>,
) -> Reply {
    authorize(&headers)?;
    state.lock().contacts_added.push((id, contact));
    Ok(Json(json!({})))
}

async fn list_messages(State(state): State<Shared>, headers: HeaderMap) -> Reply {
    authorize(&headers)?;
    let state = state.lock();
    if state.fail_messages {
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }
    Ok(Json(Value::Array(state.messages.clone())))
}

async fn send_message(State(state): State<Shared>, headers: HeaderMap, multipart: Multipart) -> Reply {
    authorize(&headers)?;
    let fields = read_fields(multipart).await;
    let message: Value = field(&fields, "message")
        .and_then(|f| serde_json::from_slice(&f.bytes).ok())
        .ok_or(StatusCode::BAD_REQUEST)?;
    let mut state = state.lock();
    state.messages.push(message.clone());
    state.sent.push(fields);
    Ok(Json(message))
}

async fn list_groups(State(state): State<Shared>, headers: HeaderMap) -> Reply {
    authorize(&headers)?;
    Ok(Json(Value::Array(state.lock().groups.clone())))
}

async fn group_by_id(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Reply {
    authorize(&headers)?;
    let state = state.lock();
    state
        .groups
        .iter()
        .find(|g| g["id"] == id.as_str())
        .cloned()
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

async fn create_group(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Reply {
    authorize(&headers)?;
    let mut state = state.lock();
    let group = json!({
        "id": 90 + state.groups.len(),
        "name": body["name"],
        "members": body["members"],
    });
    state.groups.push(group.clone());
    state.groups_created.push(body);
    Ok(Json(group))
}
