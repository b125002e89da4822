//! Handlers for attempt endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/notes/:id/attempts` | Attempt number ascending |
//! | `POST`   | `/notes/:id/attempts` | Body: `{"answer_content":…,"is_correct":…,…}`; numbered by the server |
//! | `PATCH`  | `/attempts/:id` | Partial update; `null` clears a nullable field |
//! | `DELETE` | `/attempts/:id` | The number is not reused |

use axum::{Json, extract::Path, http::StatusCode, response::IntoResponse};
use drill_core::{
  attempt::{Attempt, AttemptDraft, AttemptUpdate},
  store::{Connector, NoteStore, record_attempt},
};
use uuid::Uuid;

use crate::{error::ApiError, extract::Connected};

/// `GET /notes/:id/attempts`
pub async fn list<C>(
  db: Connected<C>,
  Path(note_id): Path<Uuid>,
) -> Result<Json<Vec<Attempt>>, ApiError>
where
  C: Connector,
{
  Ok(Json(db.client.list_attempts(note_id).await?))
}

/// `POST /notes/:id/attempts`
pub async fn create<C>(
  db: Connected<C>,
  Path(note_id): Path<Uuid>,
  Json(draft): Json<AttemptDraft>,
) -> Result<impl IntoResponse, ApiError>
where
  C: Connector,
{
  if draft.answer_content.trim().is_empty() {
    return Err(ApiError::BadRequest("answer_content is required".into()));
  }
  // Surface a missing note as 404 rather than a constraint failure.
  db.client.get_note(note_id).await?;
  let attempt = record_attempt(&*db.client, note_id, draft).await?;
  Ok((StatusCode::CREATED, Json(attempt)))
}

/// `PATCH /attempts/:id`
pub async fn update<C>(
  db: Connected<C>,
  Path(id): Path<Uuid>,
  Json(update): Json<AttemptUpdate>,
) -> Result<Json<Attempt>, ApiError>
where
  C: Connector,
{
  if update
    .answer_content
    .as_deref()
    .is_some_and(|s| s.trim().is_empty())
  {
    return Err(ApiError::BadRequest("answer_content cannot be blank".into()));
  }
  Ok(Json(db.client.update_attempt(id, update).await?))
}

/// `DELETE /attempts/:id`
pub async fn delete<C>(
  db: Connected<C>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
  C: Connector,
{
  db.client.delete_attempt(id).await?;
  Ok(StatusCode::NO_CONTENT)
}
