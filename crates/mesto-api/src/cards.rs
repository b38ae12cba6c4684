use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use mesto_db::models::CardRow;
use mesto_types::api::{CardResponse, CreateCardRequest, MessageResponse};

use crate::error::ApiError;
use crate::guard::ensure_can_mutate;
use crate::middleware::Identity;
use crate::state::AppState;
use crate::store;
use crate::validation::{ValidJson, parse_id};

fn corrupt(what: &str, value: &str, card: &str) -> ApiError {
    ApiError::unexpected(anyhow::anyhow!("corrupt {what} '{value}' on card '{card}'"))
}

pub(crate) fn card_response(row: CardRow) -> Result<CardResponse, ApiError> {
    let id: Uuid = row.id.parse().map_err(|_| corrupt("id", &row.id, &row.id))?;
    let owner: Uuid = row
        .owner_id
        .parse()
        .map_err(|_| corrupt("owner_id", &row.owner_id, &row.id))?;
    let likes = row
        .likes
        .iter()
        .map(|user_id| user_id.parse().map_err(|_| corrupt("like", user_id, &row.id)))
        .collect::<Result<Vec<Uuid>, _>>()?;
    let created_at = DateTime::parse_from_rfc3339(&row.created_at)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|_| corrupt("created_at", &row.created_at, &row.id))?;

    Ok(CardResponse {
        id,
        name: row.name,
        link: row.link,
        owner,
        likes,
        created_at,
    })
}

/// GET /cards — newest first.
pub async fn list_cards(
    State(state): State<AppState>,
    _identity: Identity,
) -> Result<impl IntoResponse, ApiError> {
    let rows = store::run(&state, |db| db.list_cards()).await?;
    let cards = rows
        .into_iter()
        .map(card_response)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(cards))
}

/// POST /cards — the caller becomes the immutable owner.
pub async fn create_card(
    State(state): State<AppState>,
    identity: Identity,
    ValidJson(req): ValidJson<CreateCardRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let card_id = Uuid::new_v4();
    let owner_id = identity.user_id().to_string();

    let row = store::run(&state, move |db| {
        db.create_card(&card_id.to_string(), &req.name, &req.link, &owner_id)
    })
    .await?;

    info!("Card {} created by {}", card_id, identity.user_id());
    Ok((StatusCode::CREATED, Json(card_response(row)?)))
}

/// DELETE /cards/{card_id} — owner only.
pub async fn delete_card(
    State(state): State<AppState>,
    identity: Identity,
    Path(card_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let card_id = parse_id("cardId", &card_id)?;

    store::run(&state, move |db| {
        let id = card_id.to_string();
        let row = db.get_card(&id)?.ok_or(ApiError::NotFound("Card not found"))?;
        let card = card_response(row)?;

        ensure_can_mutate(identity, &card, "You can only delete your own cards")?;

        // Gone between the read and the delete: someone else got there first
        if !db.delete_card(&id)? {
            return Err(ApiError::NotFound("Card not found"));
        }
        Ok(())
    })
    .await?;

    info!("Card {} deleted by {}", card_id, identity.user_id());
    Ok(Json(MessageResponse::new("Card deleted")))
}

/// PUT /cards/{card_id}/likes — add the caller to the likes; repeat calls
/// are no-ops.
pub async fn like_card(
    State(state): State<AppState>,
    identity: Identity,
    Path(card_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let card_id = parse_id("cardId", &card_id)?.to_string();
    let user_id = identity.user_id().to_string();

    let row = store::run(&state, move |db| db.add_like(&card_id, &user_id))
        .await?
        .ok_or(ApiError::NotFound("Card not found"))?;
    Ok(Json(card_response(row)?))
}

/// DELETE /cards/{card_id}/likes — remove the caller from the likes; repeat
/// calls are no-ops.
pub async fn unlike_card(
    State(state): State<AppState>,
    identity: Identity,
    Path(card_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let card_id = parse_id("cardId", &card_id)?.to_string();
    let user_id = identity.user_id().to_string();

    let row = store::run(&state, move |db| db.remove_like(&card_id, &user_id))
        .await?
        .ok_or(ApiError::NotFound("Card not found"))?;
    Ok(Json(card_response(row)?))
}
