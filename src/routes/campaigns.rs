use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};

use crate::{
    auth::{
        CurrentUser,
        policy::{self, CAMPAIGN_CREATE, CAMPAIGN_STATS},
    },
    entities::{campaign, sea_orm_active_enums::NotificationKind},
    error::ApiResult,
    response::ApiResponse,
    router::AppState,
    services::campaigns::{
        self, CampaignDetail, CampaignFilter, CampaignStats, CampaignUpdate, CampaignView,
        NewCampaign, PublicDonation,
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
                CAMPAIGN_CREATE,
            )),
        )
        .route(
            "/stats",
            policy::restrict(get(self::get::stats), state, CAMPAIGN_STATS),
        )
        .route("/{id}", get(self::get::detail).put(self::put::update))
        .route("/{id}/donations", get(self::get::donations))
}

/// Tells past donors about a new campaign. Best-effort.
async fn announce(state: &AppState, campaign: &campaign::Model) {
    let audience = match campaigns::launch_audience(&state.db).await {
        Ok(audience) => audience,
        Err(e) => {
            tracing::warn!(campaign_id = campaign.id, "Failed to load launch audience: {:?}", e);
            return;
        }
    };
    let link = format!("{}/api/v1/campaigns/{}", state.notifier.base_url(), campaign.id);
    let title = format!("New campaign: {}", campaign.title);

    for donor in audience {
        state
            .notifier
            .notify(
                &state.db,
                donor.id,
                NotificationKind::Campaign,
                &title,
                &campaign.description,
                Some(campaign.id),
            )
            .await;
        state.notifier.email(
            donor.email,
            &title,
            "campaign_launch.html",
            minijinja::context! {
                name => donor.first_name,
                title => campaign.title.clone(),
                description => campaign.description.clone(),
                target_amount => format!("{:.2}", campaign.target_amount),
                end_date => campaign.end_date,
                link => link.clone(),
            },
        );
    }
}

mod get {
    use super::*;

    pub async fn list(
        State(state): State<AppState>,
        Query(page): Query<PageParams>,
        Query(filter): Query<CampaignFilter>,
    ) -> ApiResult<ApiResponse<Vec<CampaignView>>> {
        let (campaigns, pagination) = campaigns::list(&state.db, filter, page).await?;
        Ok(ApiResponse::paged(campaigns, pagination))
    }

    pub async fn detail(
        State(state): State<AppState>,
        Path(id): Path<i32>,
    ) -> ApiResult<ApiResponse<CampaignDetail>> {
        Ok(ApiResponse::ok(campaigns::get(&state.db, id).await?))
    }

    pub async fn donations(
        State(state): State<AppState>,
        Path(id): Path<i32>,
        Query(page): Query<PageParams>,
    ) -> ApiResult<ApiResponse<Vec<PublicDonation>>> {
        let (donations, pagination) = campaigns::donations(&state.db, id, page).await?;
        Ok(ApiResponse::paged(donations, pagination))
    }

    pub async fn stats(State(state): State<AppState>) -> ApiResult<ApiResponse<CampaignStats>> {
        Ok(ApiResponse::ok(campaigns::stats(&state.db).await?))
    }
}

mod post {
    use super::*;

    pub async fn create(
        State(state): State<AppState>,
        user: CurrentUser,
        Json(input): Json<NewCampaign>,
    ) -> ApiResult<ApiResponse<campaign::Model>> {
        let campaign = campaigns::create(&state.db, &user, input).await?;
        announce(&state, &campaign).await;
        Ok(ApiResponse::created(campaign))
    }
}

mod put {
    use super::*;

    pub async fn update(
        State(state): State<AppState>,
        user: CurrentUser,
        Path(id): Path<i32>,
        Json(input): Json<CampaignUpdate>,
    ) -> ApiResult<ApiResponse<campaign::Model>> {
        let campaign = campaigns::update(&state.db, &user, id, input).await?;
        Ok(ApiResponse::ok(campaign))
    }
}
