use axum::{
    Json,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use tracing::{info, warn};
use uuid::Uuid;

use thoughts_db::models::ThoughtRow;
use thoughts_types::api::{ListQuery, ThoughtPage, ThoughtRequest};
use thoughts_types::models::Thought;

use crate::error::ApiError;
use crate::extract::{AuthUser, MaybeAuthUser};
use crate::state::AppState;

pub const MIN_MESSAGE_LEN: usize = 5;
pub const MAX_MESSAGE_LEN: usize = 140;

const DEFAULT_PAGE: u32 = 1;
const DEFAULT_LIMIT: u32 = 5;

/// GET /thoughts — newest first, `page`/`limit` pagination.
pub async fn list_thoughts(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<ListQuery>, ApiError>,
) -> Result<Json<ThoughtPage>, ApiError> {
    let page = query.page.filter(|&p| p > 0).unwrap_or(DEFAULT_PAGE);
    let limit = query.limit.filter(|&l| l > 0).unwrap_or(DEFAULT_LIMIT);
    let offset = u64::from(page - 1) * u64::from(limit);

    let (rows, total) = state
        .with_db(move |db| Ok((db.list_thoughts(limit, offset)?, db.count_thoughts()?)))
        .await?;

    Ok(Json(ThoughtPage {
        thoughts: rows.into_iter().map(thought_from_row).collect(),
        page,
        limit,
        total,
        total_pages: total.div_ceil(u64::from(limit)),
    }))
}

/// GET /thoughts/{id}
pub async fn get_thought(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Thought>, ApiError> {
    let id = parse_id(&id)?;
    let row = state
        .with_db(move |db| db.get_thought(&id.to_string()))
        .await?
        .ok_or(ApiError::NotFound("Thought"))?;

    Ok(Json(thought_from_row(row)))
}

/// POST /thoughts — attaches the caller as author when a valid token is sent.
pub async fn create_thought(
    State(state): State<AppState>,
    MaybeAuthUser(user): MaybeAuthUser,
    WithRejection(Json(req), _): WithRejection<Json<ThoughtRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let message = validate_message(req.message)?;
    let thought_id = Uuid::new_v4();
    let author = user.map(|u| u.id.to_string());

    let row = state
        .with_db(move |db| db.insert_thought(&thought_id.to_string(), &message, author.as_deref()))
        .await?;

    Ok((StatusCode::CREATED, Json(thought_from_row(row))))
}

/// POST /thoughts/{id}/like
pub async fn like_thought(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Thought>, ApiError> {
    let id = parse_id(&id)?;
    let row = state
        .with_db(move |db| db.like_thought(&id.to_string()))
        .await?
        .ok_or(ApiError::NotFound("Thought"))?;

    Ok(Json(thought_from_row(row)))
}

/// PATCH /thoughts/{id} — author only, or anyone for anonymous thoughts.
/// The body is looked at after the id, existence and ownership checks.
pub async fn update_thought(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    body: Result<Json<ThoughtRequest>, JsonRejection>,
) -> Result<Json<Thought>, ApiError> {
    let id = parse_id(&id)?;
    owned_thought(&state, id, user.id).await?;
    let Json(req) = body.map_err(ApiError::from)?;
    let message = validate_message(req.message)?;

    let row = state
        .with_db(move |db| db.update_thought_message(&id.to_string(), &message))
        .await?
        // Deleted between the ownership check and the update
        .ok_or(ApiError::NotFound("Thought"))?;

    Ok(Json(thought_from_row(row)))
}

/// DELETE /thoughts/{id} — same rules as PATCH.
pub async fn delete_thought(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&id)?;
    owned_thought(&state, id, user.id).await?;

    let deleted = state
        .with_db(move |db| db.delete_thought(&id.to_string()))
        .await?;
    if !deleted {
        return Err(ApiError::NotFound("Thought"));
    }

    info!("User {} deleted thought {}", user.id, id);
    Ok(StatusCode::NO_CONTENT)
}

/// Loads the thought and checks that `user_id` may change it.
async fn owned_thought(state: &AppState, id: Uuid, user_id: Uuid) -> Result<Thought, ApiError> {
    let row = state
        .with_db(move |db| db.get_thought(&id.to_string()))
        .await?
        .ok_or(ApiError::NotFound("Thought"))?;

    let thought = thought_from_row(row);
    if !thought.can_be_changed_by(user_id) {
        warn!("User {} tried to modify thought {} they do not own", user_id, id);
        return Err(ApiError::Forbidden("You can only change your own thoughts"));
    }
    Ok(thought)
}

fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    raw.parse().map_err(|_| ApiError::InvalidId(raw.to_string()))
}

/// Trims, then checks the length in characters.
fn validate_message(message: Option<String>) -> Result<String, ApiError> {
    let message = message
        .ok_or_else(|| ApiError::Validation("Message is required".into()))?
        .trim()
        .to_string();

    let len = message.chars().count();
    if len < MIN_MESSAGE_LEN {
        return Err(ApiError::Validation(format!(
            "Message must be at least {} characters",
            MIN_MESSAGE_LEN
        )));
    }
    if len > MAX_MESSAGE_LEN {
        return Err(ApiError::Validation(format!(
            "Message must be at most {} characters",
            MAX_MESSAGE_LEN
        )));
    }
    Ok(message)
}

fn thought_from_row(row: ThoughtRow) -> Thought {
    Thought {
        id: row.id.parse().unwrap_or_else(|e| {
            warn!("Corrupt thought id '{}': {}", row.id, e);
            Uuid::default()
        }),
        created_by: row.created_by.as_deref().and_then(|raw| {
            raw.parse::<Uuid>()
                .inspect_err(|e| warn!("Corrupt created_by '{}' on thought '{}': {}", raw, row.id, e))
                .ok()
        }),
        created_at: row.created_at.parse().unwrap_or_else(|e| {
            warn!("Corrupt created_at '{}' on thought '{}': {}", row.created_at, row.id, e);
            chrono::DateTime::default()
        }),
        hearts: u64::try_from(row.hearts).unwrap_or_default(),
        message: row.message,
    }
}
