use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{delete, get, post, put},
};
use sea_orm::ActiveEnum;
use serde::{Deserialize, Serialize};

use crate::{
    auth::{
        CurrentUser,
        policy::{self, ORPHANAGE_VERIFY},
    },
    entities::{
        orphan, orphanage, review,
        sea_orm_active_enums::{NotificationKind, VerificationStatus},
    },
    error::ApiResult,
    response::ApiResponse,
    router::AppState,
    services::orphanages::{
        self, NewOrphanage, NewReview, OrphanageDetail, OrphanageFilter, OrphanageUpdate,
        OrphanageView, RatingSummary, ReviewView,
    },
    util::pagination::PageParams,
};

#[derive(Debug, Deserialize)]
pub struct Verification {
    #[serde(alias = "status")]
    verification_status: VerificationStatus,
}

#[derive(Debug, Serialize)]
pub struct ReviewPage {
    reviews: Vec<ReviewView>,
    summary: RatingSummary,
}

pub fn routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(self::get::list).post(self::post::create))
        .route("/{id}", get(self::get::detail).put(self::put::update))
        .route(
            "/{id}/verification",
            policy::restrict(put(self::put::verification), state, ORPHANAGE_VERIFY),
        )
        .route("/{id}/orphans", get(self::get::orphans))
        .route(
            "/{id}/reviews",
            get(self::get::reviews).post(self::post::add_review),
        )
        .route(
            "/{id}/reviews/{review_id}",
            delete(self::delete::remove_review),
        )
}

mod get {
    use super::*;

    pub async fn list(
        State(state): State<AppState>,
        Query(page): Query<PageParams>,
        Query(filter): Query<OrphanageFilter>,
    ) -> ApiResult<ApiResponse<Vec<OrphanageView>>> {
        let (orphanages, pagination) = orphanages::list(&state.db, filter, page).await?;
        Ok(ApiResponse::paged(orphanages, pagination))
    }

    pub async fn detail(
        State(state): State<AppState>,
        Path(id): Path<i32>,
    ) -> ApiResult<ApiResponse<OrphanageDetail>> {
        Ok(ApiResponse::ok(orphanages::get(&state.db, id).await?))
    }

    pub async fn orphans(
        State(state): State<AppState>,
        Path(id): Path<i32>,
        Query(page): Query<PageParams>,
    ) -> ApiResult<ApiResponse<Vec<orphan::Model>>> {
        let (orphans, pagination) = orphanages::orphans(&state.db, id, page).await?;
        Ok(ApiResponse::paged(orphans, pagination))
    }

    pub async fn reviews(
        State(state): State<AppState>,
        Path(id): Path<i32>,
        Query(page): Query<PageParams>,
    ) -> ApiResult<ApiResponse<ReviewPage>> {
        let (reviews, summary, pagination) = orphanages::reviews(&state.db, id, page).await?;
        Ok(ApiResponse::paged(ReviewPage { reviews, summary }, pagination))
    }
}

mod post {
    use super::*;

    pub async fn create(
        State(state): State<AppState>,
        user: CurrentUser,
        Json(input): Json<NewOrphanage>,
    ) -> ApiResult<ApiResponse<orphanage::Model>> {
        let orphanage = orphanages::create(&state.db, &user, input).await?;

        state
            .notifier
            .notify_admins(
                &state.db,
                NotificationKind::System,
                "New orphanage awaiting verification",
                &format!("{} ({}) was registered", orphanage.name, orphanage.location),
                Some(orphanage.id),
            )
            .await;

        Ok(ApiResponse::created(orphanage))
    }

    pub async fn add_review(
        State(state): State<AppState>,
        user: CurrentUser,
        Path(id): Path<i32>,
        Json(input): Json<NewReview>,
    ) -> ApiResult<ApiResponse<review::Model>> {
        let review = orphanages::add_review(&state.db, &user, id, input).await?;

        let orphanage = orphanages::find(&state.db, id).await?;
        if let Some(contact_id) = orphanage.contact_person_id {
            state
                .notifier
                .notify(
                    &state.db,
                    contact_id,
                    NotificationKind::System,
                    "New review",
                    &format!(
                        "{} received a {}-star review",
                        orphanage.name, review.rating
                    ),
                    Some(orphanage.id),
                )
                .await;
        }

        Ok(ApiResponse::created(review))
    }
}

mod put {
    use super::*;

    pub async fn update(
        State(state): State<AppState>,
        user: CurrentUser,
        Path(id): Path<i32>,
        Json(input): Json<OrphanageUpdate>,
    ) -> ApiResult<ApiResponse<orphanage::Model>> {
        let orphanage = orphanages::update(&state.db, &user, id, input).await?;
        Ok(ApiResponse::ok(orphanage))
    }

    pub async fn verification(
        State(state): State<AppState>,
        Path(id): Path<i32>,
        Json(Verification {
            verification_status,
        }): Json<Verification>,
    ) -> ApiResult<ApiResponse<orphanage::Model>> {
        let orphanage = orphanages::set_verification(&state.db, id, verification_status).await?;

        if let Some(contact) = orphanages::contact_person(&state.db, &orphanage).await? {
            let status = verification_status.to_value();
            state
                .notifier
                .notify(
                    &state.db,
                    contact.id,
                    NotificationKind::System,
                    "Orphanage verification update",
                    &format!("{} verification status: {}", orphanage.name, status),
                    Some(orphanage.id),
                )
                .await;
            state.notifier.email(
                contact.email.clone(),
                "Orphanage verification update",
                "orphanage_verification.html",
                minijinja::context! {
                    name => contact.first_name,
                    orphanage_name => orphanage.name.clone(),
                    status => status,
                },
            );
        }

        Ok(ApiResponse::ok(orphanage))
    }
}

mod delete {
    use super::*;

    pub async fn remove_review(
        State(state): State<AppState>,
        user: CurrentUser,
        Path((id, review_id)): Path<(i32, i32)>,
    ) -> ApiResult<ApiResponse<()>> {
        orphanages::delete_review(&state.db, &user, id, review_id).await?;
        Ok(ApiResponse::message("Review deleted"))
    }
}
