use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post, put},
};
use sea_orm::ActiveEnum;

use super::recipient;
use crate::{
    auth::{
        CurrentUser,
        policy::{self, DELIVERY_CREATE, DELIVERY_WRITE},
    },
    entities::{delivery, sea_orm_active_enums::NotificationKind},
    error::ApiResult,
    response::ApiResponse,
    router::AppState,
    services::deliveries::{
        self, DeliveryChange, DeliveryDetail, DeliveryFilter, DeliveryUpdate, NewDelivery,
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
                DELIVERY_CREATE,
            )),
        )
        .route(
            "/{id}",
            get(self::get::detail).merge(policy::restrict(
                put(self::put::update),
                state,
                DELIVERY_WRITE,
            )),
        )
}

/// Notifies and emails the donor behind `change`.
async fn tell_donor(state: &AppState, change: &DeliveryChange) {
    let DeliveryChange {
        delivery, donation, ..
    } = change;
    let status = delivery.status.to_value();

    state
        .notifier
        .notify(
            &state.db,
            donation.donor_id,
            NotificationKind::Delivery,
            "Delivery update",
            &format!("Delivery for donation #{} is {}", donation.id, status),
            Some(delivery.id),
        )
        .await;

    if let Some(donor) = recipient(&state.db, donation.donor_id).await {
        state.notifier.email(
            donor.email,
            "Delivery update",
            "delivery_update.html",
            minijinja::context! {
                name => donor.first_name,
                donation_id => donation.id,
                status => status,
                carrier => delivery.carrier.clone(),
                tracking_number => delivery.tracking_number.clone(),
                estimated_delivery => delivery.estimated_delivery,
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
        Query(filter): Query<DeliveryFilter>,
    ) -> ApiResult<ApiResponse<Vec<delivery::Model>>> {
        let (deliveries, pagination) = deliveries::list(&state.db, &user, filter, page).await?;
        Ok(ApiResponse::paged(deliveries, pagination))
    }

    pub async fn detail(
        State(state): State<AppState>,
        user: CurrentUser,
        Path(id): Path<i32>,
    ) -> ApiResult<ApiResponse<DeliveryDetail>> {
        Ok(ApiResponse::ok(deliveries::get(&state.db, &user, id).await?))
    }
}

mod post {
    use super::*;

    pub async fn create(
        State(state): State<AppState>,
        user: CurrentUser,
        Json(input): Json<NewDelivery>,
    ) -> ApiResult<ApiResponse<delivery::Model>> {
        let change = deliveries::create(&state.db, &user, input).await?;
        tell_donor(&state, &change).await;
        Ok(ApiResponse::created(change.delivery))
    }
}

mod put {
    use super::*;

    pub async fn update(
        State(state): State<AppState>,
        user: CurrentUser,
        Path(id): Path<i32>,
        Json(input): Json<DeliveryUpdate>,
    ) -> ApiResult<ApiResponse<delivery::Model>> {
        let change = deliveries::update(&state.db, &user, id, input).await?;
        if change.status_changed {
            tell_donor(&state, &change).await;
        }
        Ok(ApiResponse::ok(change.delivery))
    }
}
