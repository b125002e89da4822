//! Client tests against a fake PostgREST / auth server on loopback.

use std::sync::{
  Arc, Mutex,
  atomic::{AtomicUsize, Ordering},
};

use axum::{
  Router,
  extract::{Query, State},
  http::{HeaderMap, Method, StatusCode, Uri, header},
  response::IntoResponse,
};
use drill_core::{
  ErrorKind,
  attempt::AttemptDraft,
  identity::{Identity, Session},
  note::NoteUpdate,
  schema::Table,
  store::{Connector, IdentityProvider, NoteStore, SettingsStore, record_attempt},
};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::{ProjectClient, SharedClient, SupabaseConnector};

// ─── Fake server ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct Recorded {
  method:  Method,
  path:    String,
  params:  Vec<(String, String)>,
  headers: HeaderMap,
  body:    String,
}

impl Recorded {
  fn param(&self, name: &str) -> Option<&str> {
    self
      .params
      .iter()
      .find(|(k, _)| k == name)
      .map(|(_, v)| v.as_str())
  }

  fn header(&self, name: &str) -> Option<&str> {
    self.headers.get(name).and_then(|v| v.to_str().ok())
  }

  fn json(&self) -> Value { serde_json::from_str(&self.body).unwrap() }
}

type Responder = Box<dyn Fn(&Recorded) -> (StatusCode, Value) + Send + Sync>;

struct Fake {
  requests: Mutex<Vec<Recorded>>,
  respond:  Responder,
}

impl Fake {
  fn requests(&self) -> Vec<Recorded> { self.requests.lock().unwrap().clone() }
}

async fn handle(
  State(fake): State<Arc<Fake>>,
  method: Method,
  uri: Uri,
  Query(params): Query<Vec<(String, String)>>,
  headers: HeaderMap,
  body: String,
) -> impl IntoResponse {
  let recorded = Recorded {
    method,
    path: uri.path().to_owned(),
    params,
    headers,
    body,
  };
  let (status, body) = (fake.respond)(&recorded);
  fake.requests.lock().unwrap().push(recorded);
  (
    status,
    [(header::CONTENT_TYPE, "application/json")],
    body.to_string(),
  )
}

async fn serve(
  respond: impl Fn(&Recorded) -> (StatusCode, Value) + Send + Sync + 'static,
) -> (String, Arc<Fake>) {
  let fake = Arc::new(Fake {
    requests: Mutex::new(Vec::new()),
    respond:  Box::new(respond),
  });
  let app = Router::new().fallback(handle).with_state(Arc::clone(&fake));
  let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
  let addr = listener.local_addr().unwrap();
  tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
  (format!("http://{addr}"), fake)
}

async fn project(base: &str) -> ProjectClient {
  SupabaseConnector::new()
    .unwrap()
    .connect(base, "anon-key")
    .await
    .unwrap()
}

fn note_json(id: Uuid, title: &str) -> Value {
  json!({
    "id": id,
    "user_id": "u1",
    "title": title,
    "question": "q",
    "standard_answer": null,
    "key_points": null,
    "created_at": "2024-05-01T10:00:00.123456+00:00",
    "updated_at": "2024-05-01T10:00:00.123456+00:00"
  })
}

fn attempt_json(note_id: Uuid, number: i32) -> Value {
  json!({
    "id": Uuid::new_v4(),
    "note_id": note_id,
    "attempt_number": number,
    "answer_content": "SELECT 1",
    "is_correct": true,
    "correction": null,
    "error_content": null,
    "usecase": null,
    "created_at": "2024-05-01T10:00:00+00:00"
  })
}

fn session() -> Session { Session::new(Identity::new("u1", "u1@example.com"), "user-jwt") }

// ─── Project client ──────────────────────────────────────────────────────────

#[tokio::test]
async fn missing_table_probe_is_schema() {
  let (base, fake) = serve(|_| {
    (
      StatusCode::NOT_FOUND,
      json!({
        "code": "PGRST205",
        "message": "Could not find the table 'public.notes' in the schema cache"
      }),
    )
  })
  .await;

  let err = project(&base).await.probe(Table::Notes).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Schema);

  let req = &fake.requests()[0];
  assert_eq!(req.path, "/rest/v1/notes");
  assert_eq!(req.param("limit"), Some("1"));
  assert_eq!(req.header("apikey"), Some("anon-key"));
  assert_eq!(req.header("authorization"), Some("Bearer anon-key"));
}

#[tokio::test]
async fn rejected_key_is_configuration() {
  let (base, _) = serve(|_| (StatusCode::UNAUTHORIZED, json!({ "message": "Invalid API key" }))).await;
  let err = project(&base).await.list_notes().await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Configuration);
}

#[tokio::test]
async fn unreachable_backend_is_backend() {
  let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
  let addr = listener.local_addr().unwrap();
  drop(listener);

  let err = project(&format!("http://{addr}"))
    .await
    .probe(Table::Notes)
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Backend);
}

#[tokio::test]
async fn malformed_url_is_configuration() {
  let err = SupabaseConnector::new()
    .unwrap()
    .connect("not a url", "anon")
    .await
    .err()
    .unwrap();
  assert_eq!(err.kind(), ErrorKind::Configuration);
}

#[tokio::test]
async fn aggregate_read_embeds_attempts() {
  let note_id = Uuid::new_v4();
  let (base, fake) = serve(move |_| {
    let mut row = note_json(note_id, "Joins");
    row["attempts"] = json!([attempt_json(note_id, 2), attempt_json(note_id, 1)]);
    (StatusCode::OK, json!([row]))
  })
  .await;

  let rows = project(&base).await.list_notes_with_attempts().await.unwrap();
  assert_eq!(rows.len(), 1);
  assert_eq!(rows[0].note.id, note_id);
  assert_eq!(rows[0].attempts.len(), 2);

  let req = &fake.requests()[0];
  assert_eq!(req.param("select"), Some("*,attempts(*)"));
  assert_eq!(req.param("order"), Some("updated_at.desc"));
}

#[tokio::test]
async fn get_note_without_rows_is_not_found() {
  let (base, fake) = serve(|_| (StatusCode::OK, json!([]))).await;
  let id = Uuid::new_v4();
  let err = project(&base).await.get_note(id).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::NotFound);
  assert_eq!(fake.requests()[0].param("id"), Some(format!("eq.{id}").as_str()));
}

#[tokio::test]
async fn update_note_restamps_updated_at() {
  let id = Uuid::new_v4();
  let (base, fake) = serve(move |_| (StatusCode::OK, json!([note_json(id, "Renamed")]))).await;

  let note = project(&base)
    .await
    .update_note(id, NoteUpdate {
      title: Some(" Renamed ".into()),
      standard_answer: Some(None),
      ..NoteUpdate::default()
    })
    .await
    .unwrap();
  assert_eq!(note.title, "Renamed");

  let req = &fake.requests()[0];
  assert_eq!(req.method, Method::PATCH);
  assert_eq!(req.header("prefer"), Some("return=representation"));
  let body = req.json();
  assert_eq!(body["title"], "Renamed");
  assert!(body["standard_answer"].is_null());
  assert!(body.get("question").is_none());
  assert!(body["updated_at"].is_string());
}

#[tokio::test]
async fn record_attempt_retries_after_a_duplicate_number() {
  let note_id = Uuid::new_v4();
  let posts = AtomicUsize::new(0);
  let (base, fake) = serve(move |req| match req.method {
    Method::GET => (StatusCode::OK, json!([])),
    _ if posts.fetch_add(1, Ordering::SeqCst) == 0 => (
      StatusCode::CONFLICT,
      json!({ "code": "23505", "message": "duplicate key value violates unique constraint" }),
    ),
    _ => (StatusCode::CREATED, json!([attempt_json(note_id, 1)])),
  })
  .await;

  let attempt = record_attempt(&project(&base).await, note_id, AttemptDraft::correct("SELECT 1"))
    .await
    .unwrap();
  assert_eq!(attempt.attempt_number, 1);

  let methods: Vec<_> = fake.requests().into_iter().map(|r| r.method).collect();
  assert_eq!(methods, vec![Method::GET, Method::POST, Method::GET, Method::POST]);
  let insert = fake.requests()[1].json();
  assert_eq!(insert["attempt_number"], 1);
  assert_eq!(insert["note_id"], json!(note_id));
}

// ─── Shared client ───────────────────────────────────────────────────────────

#[tokio::test]
async fn settings_upsert_uses_the_user_token() {
  let (base, fake) = serve(|req| {
    let body = req.json();
    (
      StatusCode::CREATED,
      json!([{
        "id": Uuid::new_v4(),
        "user_id": body["user_id"],
        "supabase_url": body["supabase_url"],
        "supabase_anon_key": body["supabase_anon_key"],
        "created_at": "2024-05-01T10:00:00+00:00",
        "updated_at": body["updated_at"]
      }]),
    )
  })
  .await;
  let shared = SharedClient::new(&base, "shared-anon").unwrap();

  let saved = shared
    .save_settings(&session(), "https://p.supabase.co", "pk")
    .await
    .unwrap();
  assert_eq!(saved.user_id, "u1");
  assert_eq!(saved.supabase_url, "https://p.supabase.co");

  let req = &fake.requests()[0];
  assert_eq!(req.path, "/rest/v1/user_settings");
  assert_eq!(req.param("on_conflict"), Some("user_id"));
  assert_eq!(
    req.header("prefer"),
    Some("resolution=merge-duplicates,return=representation")
  );
  assert_eq!(req.header("apikey"), Some("shared-anon"));
  assert_eq!(req.header("authorization"), Some("Bearer user-jwt"));
}

#[tokio::test]
async fn missing_settings_row_is_none() {
  let (base, fake) = serve(|_| (StatusCode::OK, json!([]))).await;
  let shared = SharedClient::new(&base, "shared-anon").unwrap();
  assert!(shared.get_settings(&session()).await.unwrap().is_none());
  assert_eq!(fake.requests()[0].param("user_id"), Some("eq.u1"));
}

#[tokio::test]
async fn token_lookup_maps_rejection_to_none() {
  let (base, _) = serve(|req| match req.header("authorization") {
    Some("Bearer good") => (
      StatusCode::OK,
      json!({ "id": "u1", "email": "u1@example.com", "user_metadata": {} }),
    ),
    _ => (StatusCode::UNAUTHORIZED, json!({ "msg": "invalid JWT" })),
  })
  .await;
  let shared = SharedClient::new(&base, "shared-anon").unwrap();

  let session = shared.session_for_token("good").await.unwrap().unwrap();
  assert_eq!(session.user_id(), "u1");
  assert_eq!(session.access_token, "good");
  assert!(shared.session_for_token("bad").await.unwrap().is_none());
}

#[tokio::test]
async fn wrong_password_is_rejected_credentials() {
  let (base, fake) = serve(|_| {
    (
      StatusCode::BAD_REQUEST,
      json!({ "error": "invalid_grant", "error_description": "Invalid login credentials" }),
    )
  })
  .await;
  let shared = SharedClient::new(&base, "shared-anon").unwrap();

  let err = shared
    .sign_in_with_password("u1@example.com", "wrong")
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Configuration);
  assert!(err.to_string().contains("Invalid login credentials"));

  let req = &fake.requests()[0];
  assert_eq!(req.path, "/auth/v1/token");
  assert_eq!(req.param("grant_type"), Some("password"));
  assert_eq!(req.json()["email"], "u1@example.com");
}

#[tokio::test]
async fn sign_up_pending_confirmation_has_no_session() {
  let (base, _) = serve(|_| {
    (
      StatusCode::OK,
      json!({ "id": "u2", "email": "u2@example.com", "confirmation_sent_at": "2024-05-01T10:00:00Z" }),
    )
  })
  .await;
  let shared = SharedClient::new(&base, "shared-anon").unwrap();
  assert!(shared.sign_up("u2@example.com", "pw").await.unwrap().is_none());
}
