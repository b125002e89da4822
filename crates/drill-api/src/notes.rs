//! Handlers for `/notes` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/notes` | Optional `?q=` matching title or question |
//! | `POST`   | `/notes` | Body: `{"title":…,"question":…,"standard_answer"?,"key_points"?}` |
//! | `GET`    | `/notes/summary` | Dashboard counts; optional `?q=` |
//! | `GET`    | `/notes/:id` | The note with its attempts, 404 if not found |
//! | `PATCH`  | `/notes/:id` | Partial update; `null` clears a nullable field |
//! | `DELETE` | `/notes/:id` | Cascades to attempts |

use axum::{
  Json,
  extract::{Path, Query},
  http::StatusCode,
  response::IntoResponse,
};
use drill_core::{
  note::{NewNote, Note, NoteUpdate, NoteWithAttempts},
  store::{Connector, NoteStore},
  summary::{LibrarySummary, filter_notes, matches_query, summarize},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{error::ApiError, extract::Connected};

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
  #[serde(default)]
  pub q: String,
}

// ─── List ────────────────────────────────────────────────────────────────────

/// `GET /notes[?q=<text>]`
pub async fn list<C>(
  db: Connected<C>,
  Query(params): Query<SearchParams>,
) -> Result<Json<Vec<Note>>, ApiError>
where
  C: Connector,
{
  let notes = db.client.list_notes().await?;
  Ok(Json(filter_notes(notes, &params.q)))
}

/// `GET /notes/summary[?q=<text>]`
pub async fn summary<C>(
  db: Connected<C>,
  Query(params): Query<SearchParams>,
) -> Result<Json<LibrarySummary>, ApiError>
where
  C: Connector,
{
  let rows = db
    .client
    .list_notes_with_attempts()
    .await?
    .into_iter()
    .filter(|row| matches_query(&row.note, &params.q))
    .collect();
  Ok(Json(summarize(rows)))
}

// ─── Create ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub title:           String,
  pub question:        String,
  #[serde(default)]
  pub standard_answer: Option<String>,
  #[serde(default)]
  pub key_points:      Option<String>,
}

/// `POST /notes`
pub async fn create<C>(
  db: Connected<C>,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  C: Connector,
{
  if body.title.trim().is_empty() || body.question.trim().is_empty() {
    return Err(ApiError::BadRequest("title and question are required".into()));
  }
  let input = NewNote {
    user_id:         db.session.user_id().to_owned(),
    title:           body.title,
    question:        body.question,
    standard_answer: body.standard_answer,
    key_points:      body.key_points,
  };
  let note = db.client.create_note(input).await?;
  Ok((StatusCode::CREATED, Json(note)))
}

// ─── Get / update / delete one ───────────────────────────────────────────────

/// `GET /notes/:id`
pub async fn get_one<C>(
  db: Connected<C>,
  Path(id): Path<Uuid>,
) -> Result<Json<NoteWithAttempts>, ApiError>
where
  C: Connector,
{
  let note = db.client.get_note(id).await?;
  let attempts = db.client.list_attempts(id).await?;
  let mut row = NoteWithAttempts { note, attempts };
  row.sort_attempts();
  Ok(Json(row))
}

/// `PATCH /notes/:id`
pub async fn update<C>(
  db: Connected<C>,
  Path(id): Path<Uuid>,
  Json(update): Json<NoteUpdate>,
) -> Result<Json<Note>, ApiError>
where
  C: Connector,
{
  let blank = |v: &Option<String>| v.as_deref().is_some_and(|s| s.trim().is_empty());
  if blank(&update.title) || blank(&update.question) {
    return Err(ApiError::BadRequest("title and question cannot be blank".into()));
  }
  Ok(Json(db.client.update_note(id, update).await?))
}

/// `DELETE /notes/:id`
pub async fn delete<C>(
  db: Connected<C>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
  C: Connector,
{
  db.client.delete_note(id).await?;
  Ok(StatusCode::NO_CONTENT)
}
