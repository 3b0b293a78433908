use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post, put},
};
use sea_orm::ActiveEnum;

use super::{StatusChange, recipient};
use crate::{
    auth::{
        CurrentUser,
        policy::{self, SPONSORSHIP_STATS},
    },
    entities::{
        sea_orm_active_enums::{NotificationKind, SponsorshipStatus},
        sponsorship,
    },
    error::ApiResult,
    response::ApiResponse,
    router::AppState,
    services::{
        orphans,
        sponsorships::{
            self, NewSponsorship, Payment, SponsorshipDetail, SponsorshipFilter,
            SponsorshipStats, SponsorshipView,
        },
    },
    util::pagination::PageParams,
};

pub fn routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(self::get::list).post(self::post::create))
        .route(
            "/stats",
            policy::restrict(get(self::get::stats), state, SPONSORSHIP_STATS),
        )
        .route("/{id}", get(self::get::detail))
        .route("/{id}/status", put(self::put::status))
        .route("/{id}/payment", post(self::post::payment))
}

/// Notifies and emails the sponsor about `sponsorship`.
async fn tell_sponsor(state: &AppState, sponsorship: &sponsorship::Model, headline: &str) {
    let orphan_name = orphans::find(&state.db, sponsorship.orphan_id)
        .await
        .map(|o| format!("{} {}", o.first_name, o.last_name))
        .unwrap_or_default();

    state
        .notifier
        .notify(
            &state.db,
            sponsorship.sponsor_id,
            NotificationKind::Sponsorship,
            headline,
            &format!("Sponsorship of {orphan_name}: {}", sponsorship.status.to_value()),
            Some(sponsorship.id),
        )
        .await;

    if let Some(sponsor) = recipient(&state.db, sponsorship.sponsor_id).await {
        state.notifier.email(
            sponsor.email,
            headline,
            "sponsorship.html",
            minijinja::context! {
                name => sponsor.first_name,
                headline => headline,
                orphan_name => orphan_name,
                amount => format!("{:.2}", sponsorship.monthly_amount),
                frequency => sponsorship.payment_frequency.to_value(),
                next_payment_date => sponsorship.next_payment_date,
            },
        );
    }
}

mod get {
    use super::*;

    pub async fn list(
        State(state): State<AppState>,
        user: CurrentUser,
        Query(page): Query<PageParams>,
        Query(filter): Query<SponsorshipFilter>,
    ) -> ApiResult<ApiResponse<Vec<SponsorshipView>>> {
        let (sponsorships, pagination) =
            sponsorships::list(&state.db, &user, filter, page).await?;
        Ok(ApiResponse::paged(sponsorships, pagination))
    }

    pub async fn detail(
        State(state): State<AppState>,
        user: CurrentUser,
        Path(id): Path<i32>,
    ) -> ApiResult<ApiResponse<SponsorshipDetail>> {
        Ok(ApiResponse::ok(sponsorships::get(&state.db, &user, id).await?))
    }

    pub async fn stats(
        State(state): State<AppState>,
    ) -> ApiResult<ApiResponse<SponsorshipStats>> {
        Ok(ApiResponse::ok(sponsorships::stats(&state.db).await?))
    }
}

mod post {
    use super::*;

    pub async fn create(
        State(state): State<AppState>,
        user: CurrentUser,
        Json(input): Json<NewSponsorship>,
    ) -> ApiResult<ApiResponse<Payment>> {
        let payment = sponsorships::create(&state.db, user.id(), input).await?;

        tell_sponsor(&state, &payment.sponsorship, "Thank you for sponsoring a child").await;
        state
            .notifier
            .notify_admins(
                &state.db,
                NotificationKind::Sponsorship,
                "New sponsorship",
                &format!(
                    "{} started sponsoring orphan #{}",
                    user.0.full_name(),
                    payment.sponsorship.orphan_id
                ),
                Some(payment.sponsorship.id),
            )
            .await;

        Ok(ApiResponse::created(payment))
    }

    pub async fn payment(
        State(state): State<AppState>,
        user: CurrentUser,
        Path(id): Path<i32>,
    ) -> ApiResult<ApiResponse<Payment>> {
        let payment = sponsorships::process_payment(&state.db, &user, id).await?;
        tell_sponsor(&state, &payment.sponsorship, "Sponsorship payment received").await;
        Ok(ApiResponse::ok(payment).with_message("Payment processed"))
    }
}

mod put {
    use super::*;

    pub async fn status(
        State(state): State<AppState>,
        user: CurrentUser,
        Path(id): Path<i32>,
        Json(StatusChange { status }): Json<StatusChange<SponsorshipStatus>>,
    ) -> ApiResult<ApiResponse<sponsorship::Model>> {
        let (sponsorship, changed) =
            sponsorships::set_status(&state.db, &user, id, status).await?;
        if changed {
            tell_sponsor(&state, &sponsorship, "Sponsorship status updated").await;
        }
        Ok(ApiResponse::ok(sponsorship))
    }
}
