use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, put},
};
use sea_orm::ActiveEnum;
use serde::Deserialize;

use super::{StatusChange, recipient};
use crate::{
    auth::{
        CurrentUser,
        policy::{self, DONATION_REVIEW, DONATION_STATS},
    },
    entities::{
        donation,
        sea_orm_active_enums::{DonationStatus, NotificationKind},
    },
    error::ApiResult,
    response::ApiResponse,
    router::AppState,
    services::{
        campaigns,
        donations::{self, DonationDetail, DonationFilter, DonationStats, NewDonation},
    },
    util::pagination::PageParams,
};

#[derive(Debug, Deserialize)]
pub struct Receipt {
    receipt_url: String,
}

pub fn routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(self::get::list).post(self::post::create))
        .route(
            "/stats",
            policy::restrict(get(self::get::stats), state, DONATION_STATS),
        )
        .route("/{id}", get(self::get::detail))
        .route(
            "/{id}/status",
            policy::restrict(put(self::put::status), state, DONATION_REVIEW),
        )
        .route("/{id}/receipt", put(self::put::receipt))
}

mod get {
    use super::*;

    pub async fn list(
        State(state): State<AppState>,
        user: CurrentUser,
        Query(page): Query<PageParams>,
        Query(filter): Query<DonationFilter>,
    ) -> ApiResult<ApiResponse<Vec<donation::Model>>> {
        let (donations, pagination) = donations::list(&state.db, &user, filter, page).await?;
        Ok(ApiResponse::paged(donations, pagination))
    }

    pub async fn detail(
        State(state): State<AppState>,
        user: CurrentUser,
        Path(id): Path<i32>,
    ) -> ApiResult<ApiResponse<DonationDetail>> {
        Ok(ApiResponse::ok(donations::get(&state.db, &user, id).await?))
    }

    pub async fn stats(State(state): State<AppState>) -> ApiResult<ApiResponse<DonationStats>> {
        Ok(ApiResponse::ok(donations::stats(&state.db).await?))
    }
}

mod post {
    use super::*;

    pub async fn create(
        State(state): State<AppState>,
        user: CurrentUser,
        Json(input): Json<NewDonation>,
    ) -> ApiResult<ApiResponse<donation::Model>> {
        let donation = donations::create(&state.db, user.id(), input).await?;

        state
            .notifier
            .notify_admins(
                &state.db,
                NotificationKind::Donation,
                "New donation received",
                &format!(
                    "{} donated {:.2} ({})",
                    user.0.full_name(),
                    donation.amount,
                    donation.donation_type
                ),
                Some(donation.id),
            )
            .await;

        let campaign_title = match donation.campaign_id {
            Some(campaign_id) => campaigns::find(&state.db, campaign_id)
                .await
                .ok()
                .map(|c| c.title),
            None => None,
        };
        state.notifier.email(
            user.0.email.clone(),
            "Thank you for your donation",
            "donation_receipt.html",
            minijinja::context! {
                name => user.0.first_name.clone(),
                donation_id => donation.id,
                amount => format!("{:.2}", donation.amount),
                donation_type => donation.donation_type.clone(),
                category => donation.category.to_value(),
                campaign_title => campaign_title,
            },
        );

        Ok(ApiResponse::created(donation))
    }
}

mod put {
    use super::*;

    pub async fn status(
        State(state): State<AppState>,
        Path(id): Path<i32>,
        Json(StatusChange { status }): Json<StatusChange<DonationStatus>>,
    ) -> ApiResult<ApiResponse<donation::Model>> {
        let (donation, changed) = donations::update_status(&state.db, id, status).await?;

        if changed {
            let status = donation.status.to_value();
            state
                .notifier
                .notify(
                    &state.db,
                    donation.donor_id,
                    NotificationKind::Donation,
                    "Donation status updated",
                    &format!("Your donation #{} is now {}", donation.id, status),
                    Some(donation.id),
                )
                .await;
            if let Some(donor) = recipient(&state.db, donation.donor_id).await {
                state.notifier.email(
                    donor.email,
                    "Donation status updated",
                    "donation_status.html",
                    minijinja::context! {
                        name => donor.first_name,
                        donation_id => donation.id,
                        status => status,
                    },
                );
            }
        }

        Ok(ApiResponse::ok(donation))
    }

    pub async fn receipt(
        State(state): State<AppState>,
        user: CurrentUser,
        Path(id): Path<i32>,
        Json(Receipt { receipt_url }): Json<Receipt>,
    ) -> ApiResult<ApiResponse<donation::Model>> {
        let donation = donations::attach_receipt(&state.db, &user, id, receipt_url).await?;
        Ok(ApiResponse::ok(donation).with_message("Receipt attached"))
    }
}
