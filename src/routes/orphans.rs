use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{delete, get, post, put},
};

use crate::{
    auth::{
        CurrentUser,
        policy::{self, ORPHAN_CREATE, ORPHAN_DELETE, ORPHAN_WRITE},
    },
    entities::{orphan, orphan_update, sea_orm_active_enums::NotificationKind},
    error::ApiResult,
    response::ApiResponse,
    router::AppState,
    services::orphans::{
        self, NewOrphan, NewProgressUpdate, OrphanDetail, OrphanFilter, OrphanUpdate, OrphanView,
    },
    util::pagination::PageParams,
};

pub fn routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(self::get::list).merge(policy::restrict(
                post(self::post::create),
                state,
                ORPHAN_CREATE,
            )),
        )
        .route(
            "/{id}",
            get(self::get::detail)
                .merge(policy::restrict(put(self::put::update), state, ORPHAN_WRITE))
                .merge(policy::restrict(
                    delete(self::delete::remove),
                    state,
                    ORPHAN_DELETE,
                )),
        )
        .route(
            "/{id}/updates",
            get(self::get::updates).merge(policy::restrict(
                post(self::post::add_update),
                state,
                ORPHAN_WRITE,
            )),
        )
}

mod get {
    use super::*;

    pub async fn list(
        State(state): State<AppState>,
        Query(page): Query<PageParams>,
        Query(filter): Query<OrphanFilter>,
    ) -> ApiResult<ApiResponse<Vec<OrphanView>>> {
        let (orphans, pagination) = orphans::list(&state.db, filter, page).await?;
        Ok(ApiResponse::paged(orphans, pagination))
    }

    pub async fn detail(
        State(state): State<AppState>,
        Path(id): Path<i32>,
    ) -> ApiResult<ApiResponse<OrphanDetail>> {
        Ok(ApiResponse::ok(orphans::get(&state.db, id).await?))
    }

    pub async fn updates(
        State(state): State<AppState>,
        Path(id): Path<i32>,
        Query(page): Query<PageParams>,
    ) -> ApiResult<ApiResponse<Vec<orphan_update::Model>>> {
        let (updates, pagination) = orphans::updates(&state.db, id, page).await?;
        Ok(ApiResponse::paged(updates, pagination))
    }
}

mod post {
    use super::*;

    pub async fn create(
        State(state): State<AppState>,
        user: CurrentUser,
        Json(input): Json<NewOrphan>,
    ) -> ApiResult<ApiResponse<orphan::Model>> {
        let orphan = orphans::create(&state.db, &user, input).await?;
        Ok(ApiResponse::created(orphan))
    }

    pub async fn add_update(
        State(state): State<AppState>,
        user: CurrentUser,
        Path(id): Path<i32>,
        Json(input): Json<NewProgressUpdate>,
    ) -> ApiResult<ApiResponse<orphan_update::Model>> {
        let update = orphans::add_update(&state.db, &user, id, input).await?;

        let orphan = orphans::find(&state.db, id).await?;
        let title = format!("New update for {} {}", orphan.first_name, orphan.last_name);
        for sponsor_id in orphans::active_sponsor_ids(&state.db, id).await? {
            state
                .notifier
                .notify(
                    &state.db,
                    sponsor_id,
                    NotificationKind::Sponsorship,
                    &title,
                    &update.title,
                    Some(orphan.id),
                )
                .await;
        }

        Ok(ApiResponse::created(update))
    }
}

mod put {
    use super::*;

    pub async fn update(
        State(state): State<AppState>,
        user: CurrentUser,
        Path(id): Path<i32>,
        Json(input): Json<OrphanUpdate>,
    ) -> ApiResult<ApiResponse<orphan::Model>> {
        let orphan = orphans::update(&state.db, &user, id, input).await?;
        Ok(ApiResponse::ok(orphan))
    }
}

mod delete {
    use super::*;

    pub async fn remove(
        State(state): State<AppState>,
        Path(id): Path<i32>,
    ) -> ApiResult<ApiResponse<()>> {
        orphans::delete(&state.db, id).await?;
        Ok(ApiResponse::message("Orphan deleted"))
    }
}
