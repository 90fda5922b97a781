//! HTTP request handlers

use super::AppContext;
use crate::engine::{DrawOutcome, Phase};
use crate::error::Error;
use crate::selection::{MoveDirection, Popularity, SelectionFilters};
use crate::selection::filters::normalize_choice;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use tt_common::{SavedCollection, Tune, TuneId};
use uuid::Uuid;

/// Error body, also used for plain acknowledgements
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    status: String,
}

impl StatusResponse {
    fn ok() -> Json<Self> {
        Json(Self {
            status: "ok".to_string(),
        })
    }
}

type ApiError = (StatusCode, Json<StatusResponse>);
type ApiResult<T> = Result<Json<T>, ApiError>;

fn error_response(e: Error) -> ApiError {
    let status = match &e {
        Error::NotFound(_) | Error::Common(tt_common::Error::NotFound(_)) => StatusCode::NOT_FOUND,
        Error::BadRequest(_) | Error::Common(tt_common::Error::InvalidInput(_)) => {
            StatusCode::BAD_REQUEST
        }
        Error::Busy => StatusCode::CONFLICT,
        Error::Config(_) => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status.is_server_error() {
        error!("Request failed: {}", e);
    } else {
        warn!("Request rejected: {}", e);
    }

    (
        status,
        Json(StatusResponse {
            status: format!("error: {}", e),
        }),
    )
}

// ============================================================================
// Response / request types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub module: String,
    pub version: String,
    pub tunes: usize,
    pub phase: Phase,
}

/// Answer to every draw request
#[derive(Debug, Serialize)]
pub struct DrawResponse {
    /// "drawn", "busy" or "empty"
    pub status: String,
    pub tunes: Vec<Tune>,
}

impl From<DrawOutcome> for DrawResponse {
    fn from(outcome: DrawOutcome) -> Self {
        Self {
            status: outcome.status().to_string(),
            tunes: outcome.into_tunes(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DrawStateResponse {
    pub phase: Phase,
    pub tunes: Vec<Tune>,
}

#[derive(Debug, Serialize)]
pub struct TunesResponse {
    pub tunes: Vec<Tune>,
}

#[derive(Debug, Serialize)]
pub struct MoveResponse {
    pub moved: bool,
    pub tunes: Vec<Tune>,
}

#[derive(Debug, Serialize)]
pub struct FavoritesResponse {
    pub tune_ids: Vec<TuneId>,
}

#[derive(Debug, Serialize)]
pub struct FavoriteToggleResponse {
    pub tune_id: TuneId,
    pub favorite: bool,
}

#[derive(Debug, Deserialize)]
pub struct KeysQuery {
    #[serde(rename = "type")]
    pub tune_type: Option<String>,
    pub popularity: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SeedRequest {
    pub tune_id: TuneId,
}

#[derive(Debug, Deserialize)]
pub struct MoveRequest {
    pub index: usize,
    pub direction: MoveDirection,
}

#[derive(Debug, Deserialize)]
pub struct SaveCollectionRequest {
    pub title: String,
}

// ============================================================================
// Health and catalog
// ============================================================================

/// GET /health
pub async fn health(State(ctx): State<AppContext>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        module: "tt-dispatch".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        tunes: ctx.engine.catalog().await.len(),
        phase: ctx.engine.phase(),
    })
}

/// GET /catalog/tunes - full ranked catalog, for external search indexers
pub async fn list_tunes(State(ctx): State<AppContext>) -> Json<Vec<Tune>> {
    Json(ctx.engine.catalog().await.tunes().to_vec())
}

/// GET /catalog/types
pub async fn list_types(State(ctx): State<AppContext>) -> Json<Vec<String>> {
    Json(ctx.engine.catalog().await.available_types())
}

/// GET /catalog/keys?type=&popularity=
pub async fn list_keys(
    State(ctx): State<AppContext>,
    Query(query): Query<KeysQuery>,
) -> ApiResult<Vec<String>> {
    let popularity = match query.popularity.as_deref() {
        Some(p) => p
            .parse::<Popularity>()
            .map_err(|e| error_response(Error::BadRequest(e)))?,
        None => Popularity::Any,
    };
    let tune_type = normalize_choice(query.tune_type.as_deref());

    Ok(Json(
        ctx.engine
            .catalog()
            .await
            .available_keys(tune_type.as_deref(), popularity),
    ))
}

// ============================================================================
// Filters
// ============================================================================

/// GET /filters
pub async fn get_filters(State(ctx): State<AppContext>) -> Json<SelectionFilters> {
    Json(ctx.engine.filters().await)
}

/// POST /filters
pub async fn set_filters(
    State(ctx): State<AppContext>,
    Json(filters): Json<SelectionFilters>,
) -> Json<SelectionFilters> {
    ctx.engine.set_filters(filters).await;
    Json(ctx.engine.filters().await)
}

// ============================================================================
// Draws
// ============================================================================

/// GET /draw
pub async fn get_draw(State(ctx): State<AppContext>) -> Json<DrawStateResponse> {
    Json(DrawStateResponse {
        phase: ctx.engine.phase(),
        tunes: ctx.engine.draw().await,
    })
}

/// POST /draw/spin
pub async fn spin(State(ctx): State<AppContext>) -> Json<DrawResponse> {
    Json(ctx.engine.spin().await.into())
}

/// POST /draw/spin-with - one-off filters, stored filters unchanged
pub async fn spin_with(
    State(ctx): State<AppContext>,
    Json(filters): Json<SelectionFilters>,
) -> Json<DrawResponse> {
    Json(ctx.engine.spin_with(filters).await.into())
}

/// POST /draw/spin-matching
pub async fn spin_matching(State(ctx): State<AppContext>) -> Json<DrawResponse> {
    Json(ctx.engine.spin_matching().await.into())
}

/// POST /draw/seed
pub async fn seed_and_spin(
    State(ctx): State<AppContext>,
    Json(req): Json<SeedRequest>,
) -> ApiResult<DrawResponse> {
    info!("Seeded spin around tune {}", req.tune_id);
    match ctx.engine.seed_and_spin(req.tune_id).await {
        Ok(outcome) => Ok(Json(outcome.into())),
        Err(e) => Err(error_response(e)),
    }
}

/// POST /draw/more
pub async fn draw_one_more(State(ctx): State<AppContext>) -> Json<DrawResponse> {
    Json(ctx.engine.draw_one_more().await.into())
}

/// POST /draw/reset - commit the draw into the working sequence
pub async fn reset_draw(State(ctx): State<AppContext>) -> ApiResult<TunesResponse> {
    let tunes = ctx.engine.reset_draw().await.map_err(error_response)?;
    Ok(Json(TunesResponse { tunes }))
}

/// POST /draw/move
pub async fn move_in_draw(
    State(ctx): State<AppContext>,
    Json(req): Json<MoveRequest>,
) -> ApiResult<MoveResponse> {
    let moved = ctx
        .engine
        .move_in_draw(req.index, req.direction)
        .await
        .map_err(error_response)?;
    Ok(Json(MoveResponse {
        moved,
        tunes: ctx.engine.draw().await,
    }))
}

/// DELETE /draw/:tune_id
pub async fn remove_from_draw(
    State(ctx): State<AppContext>,
    Path(tune_id): Path<u64>,
) -> ApiResult<StatusResponse> {
    let removed = ctx
        .engine
        .remove_from_draw(TuneId(tune_id))
        .await
        .map_err(error_response)?;
    if removed {
        Ok(StatusResponse::ok())
    } else {
        Err(error_response(Error::NotFound(format!("tune {} is not in the draw", tune_id))))
    }
}

// ============================================================================
// Working sequence
// ============================================================================

/// GET /set
pub async fn get_working(State(ctx): State<AppContext>) -> Json<TunesResponse> {
    Json(TunesResponse {
        tunes: ctx.engine.working().await,
    })
}

/// DELETE /set/:tune_id
pub async fn remove_from_working(
    State(ctx): State<AppContext>,
    Path(tune_id): Path<u64>,
) -> ApiResult<StatusResponse> {
    let removed = ctx
        .engine
        .remove_from_working(TuneId(tune_id))
        .await
        .map_err(error_response)?;
    if removed {
        Ok(StatusResponse::ok())
    } else {
        Err(error_response(Error::NotFound(format!(
            "tune {} is not in the working sequence",
            tune_id
        ))))
    }
}

/// POST /set/clear
pub async fn clear_all(State(ctx): State<AppContext>) -> ApiResult<StatusResponse> {
    ctx.engine.clear_all().await.map_err(error_response)?;
    Ok(StatusResponse::ok())
}

// ============================================================================
// Favorites
// ============================================================================

/// GET /favorites
pub async fn list_favorites(State(ctx): State<AppContext>) -> Json<FavoritesResponse> {
    Json(FavoritesResponse {
        tune_ids: ctx.engine.favorites().await,
    })
}

/// POST /favorites/:tune_id/toggle
pub async fn toggle_favorite(
    State(ctx): State<AppContext>,
    Path(tune_id): Path<u64>,
) -> Json<FavoriteToggleResponse> {
    let tune_id = TuneId(tune_id);
    let favorite = ctx.engine.toggle_favorite(tune_id).await;
    Json(FavoriteToggleResponse { tune_id, favorite })
}

// ============================================================================
// Saved collections
// ============================================================================

/// GET /collections
pub async fn list_collections(State(ctx): State<AppContext>) -> ApiResult<Vec<SavedCollection>> {
    ctx.engine
        .list_collections()
        .await
        .map(Json)
        .map_err(error_response)
}

/// POST /collections - save the working sequence
pub async fn save_collection(
    State(ctx): State<AppContext>,
    Json(req): Json<SaveCollectionRequest>,
) -> Result<(StatusCode, Json<SavedCollection>), ApiError> {
    match ctx.engine.save_collection(&req.title).await {
        Ok(collection) => Ok((StatusCode::CREATED, Json(collection))),
        Err(e) => Err(error_response(e)),
    }
}

/// POST /collections/:id/load
pub async fn load_collection(
    State(ctx): State<AppContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<SavedCollection> {
    ctx.engine
        .load_saved_collection(id)
        .await
        .map(Json)
        .map_err(error_response)
}

/// DELETE /collections/:id
pub async fn delete_collection(
    State(ctx): State<AppContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusResponse> {
    match ctx.engine.delete_collection(id).await {
        Ok(true) => Ok(StatusResponse::ok()),
        Ok(false) => Err(error_response(Error::NotFound(format!("collection {}", id)))),
        Err(e) => Err(error_response(e)),
    }
}
