use std::collections::HashMap;

use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, FromQueryResult, QueryFilter,
    QueryOrder, QuerySelect, Set, sea_query::Expr,
};
use serde::{Deserialize, Serialize};

use crate::{
    auth::CurrentUser,
    entities::{
        campaign, donation, orphanage,
        sea_orm_active_enums::{CampaignStatus, DonationStatus},
        user,
    },
    error::{ApiError, ApiResult},
    response::Pagination,
    services::orphanages::ensure_manages,
    util::{
        dates::today,
        pagination::{PageParams, fetch_page},
    },
};

/// Cap on donors told about a newly launched campaign.
pub const LAUNCH_AUDIENCE_LIMIT: u64 = 100;

#[derive(Debug, Clone, Deserialize)]
pub struct NewCampaign {
    pub title: String,
    pub description: String,
    pub target_amount: f64,
    pub start_date: Option<NaiveDate>,
    pub end_date: NaiveDate,
    pub orphanage_id: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CampaignUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub target_amount: Option<f64>,
    pub end_date: Option<NaiveDate>,
    pub status: Option<CampaignStatus>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignFilter {
    pub status: Option<CampaignStatus>,
    pub orphanage_id: Option<i32>,
    pub min_target: Option<f64>,
    pub max_target: Option<f64>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct CampaignView {
    #[serde(flatten)]
    pub campaign: campaign::Model,
    pub donation_count: i64,
    pub progress_percentage: i64,
}

#[derive(Debug, Serialize)]
pub struct CampaignDetail {
    #[serde(flatten)]
    pub view: CampaignView,
    pub orphanage_name: Option<String>,
}

/// A campaign donation as shown to the public: anonymous donors stay unnamed.
#[derive(Debug, Serialize)]
pub struct PublicDonation {
    pub id: i32,
    pub amount: f64,
    pub status: DonationStatus,
    pub is_anonymous: bool,
    pub donor_name: Option<String>,
    pub created_at: chrono::NaiveDateTime,
}

#[derive(Debug, Serialize)]
pub struct CampaignStats {
    pub total_campaigns: u64,
    pub active_campaigns: u64,
    pub completed_campaigns: u64,
    pub cancelled_campaigns: u64,
    pub total_target: f64,
    pub total_raised: f64,
    pub fully_funded: u64,
}

#[derive(Debug, FromQueryResult)]
struct DonationCount {
    campaign_id: i32,
    count: i64,
}

pub async fn create(
    db: &DatabaseConnection,
    actor: &CurrentUser,
    input: NewCampaign,
) -> ApiResult<campaign::Model> {
    if input.title.trim().is_empty() || input.description.trim().is_empty() {
        return Err(ApiError::validation("Please provide a title and description"));
    }
    if !input.target_amount.is_finite() || input.target_amount <= 0.0 {
        return Err(ApiError::validation("Target amount must be greater than zero"));
    }
    let start_date = input.start_date.unwrap_or_else(today);
    if input.end_date < start_date {
        return Err(ApiError::validation("End date must be on or after the start date"));
    }
    if let Some(orphanage_id) = input.orphanage_id {
        ensure_manages(db, actor, orphanage_id).await?;
    }

    let now = Utc::now().naive_utc();
    let campaign = campaign::ActiveModel {
        title: Set(input.title.trim().to_string()),
        description: Set(input.description),
        target_amount: Set(input.target_amount),
        current_amount: Set(0.0),
        start_date: Set(start_date),
        end_date: Set(input.end_date),
        status: Set(CampaignStatus::Active),
        orphanage_id: Set(input.orphanage_id),
        created_by: Set(actor.id()),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;

    tracing::info!(campaign_id = campaign.id, "campaign created");
    Ok(campaign)
}

pub async fn update(
    db: &DatabaseConnection,
    actor: &CurrentUser,
    campaign_id: i32,
    input: CampaignUpdate,
) -> ApiResult<campaign::Model> {
    let campaign = find(db, campaign_id).await?;
    if campaign.created_by != actor.id() && !actor.is_admin() {
        return Err(ApiError::forbidden());
    }
    if let Some(target) = input.target_amount {
        if !target.is_finite() || target <= 0.0 {
            return Err(ApiError::validation("Target amount must be greater than zero"));
        }
    }
    if let Some(end_date) = input.end_date {
        if end_date < campaign.start_date {
            return Err(ApiError::validation("End date must be on or after the start date"));
        }
    }

    let mut campaign: campaign::ActiveModel = campaign.into();
    if let Some(title) = input.title {
        campaign.title = Set(title);
    }
    if let Some(description) = input.description {
        campaign.description = Set(description);
    }
    if let Some(target) = input.target_amount {
        campaign.target_amount = Set(target);
    }
    if let Some(end_date) = input.end_date {
        campaign.end_date = Set(end_date);
    }
    if let Some(status) = input.status {
        campaign.status = Set(status);
    }
    campaign.updated_at = Set(Utc::now().naive_utc());

    Ok(campaign.update(db).await?)
}

pub async fn find(db: &DatabaseConnection, campaign_id: i32) -> ApiResult<campaign::Model> {
    campaign::Entity::find_by_id(campaign_id)
        .one(db)
        .await?
        .ok_or_else(|| ApiError::not_found("Campaign"))
}

pub async fn get(db: &DatabaseConnection, campaign_id: i32) -> ApiResult<CampaignDetail> {
    let campaign = find(db, campaign_id).await?;
    let orphanage_name = match campaign.orphanage_id {
        Some(id) => orphanage::Entity::find_by_id(id)
            .one(db)
            .await?
            .map(|o| o.name),
        None => None,
    };
    let mut views = with_counts(db, vec![campaign]).await?;
    let view = views.pop().ok_or_else(|| ApiError::not_found("Campaign"))?;

    Ok(CampaignDetail {
        view,
        orphanage_name,
    })
}

pub async fn list(
    db: &DatabaseConnection,
    filter: CampaignFilter,
    page: PageParams,
) -> ApiResult<(Vec<CampaignView>, Pagination)> {
    let mut query = campaign::Entity::find();
    if let Some(status) = filter.status {
        query = query.filter(campaign::Column::Status.eq(status));
    }
    if let Some(orphanage_id) = filter.orphanage_id {
        query = query.filter(campaign::Column::OrphanageId.eq(orphanage_id));
    }
    if let Some(min) = filter.min_target {
        query = query.filter(campaign::Column::TargetAmount.gte(min));
    }
    if let Some(max) = filter.max_target {
        query = query.filter(campaign::Column::TargetAmount.lte(max));
    }
    if let Some(start) = filter.start_date {
        query = query.filter(campaign::Column::StartDate.gte(start));
    }
    if let Some(end) = filter.end_date {
        query = query.filter(campaign::Column::EndDate.lte(end));
    }

    let query = query
        .order_by_desc(campaign::Column::CreatedAt)
        .order_by_desc(campaign::Column::Id);
    let (campaigns, pagination) = fetch_page(db, query, page).await?;

    Ok((with_counts(db, campaigns).await?, pagination))
}

async fn with_counts(
    db: &DatabaseConnection,
    campaigns: Vec<campaign::Model>,
) -> ApiResult<Vec<CampaignView>> {
    let ids: Vec<i32> = campaigns.iter().map(|c| c.id).collect();
    let counts: HashMap<i32, i64> = donation::Entity::find()
        .select_only()
        .column(donation::Column::CampaignId)
        .column_as(Expr::col(donation::Column::Id).count(), "count")
        .filter(donation::Column::CampaignId.is_in(ids))
        .filter(donation::Column::Status.ne(DonationStatus::Rejected))
        .group_by(donation::Column::CampaignId)
        .into_model::<DonationCount>()
        .all(db)
        .await?
        .into_iter()
        .map(|c| (c.campaign_id, c.count))
        .collect();

    Ok(campaigns
        .into_iter()
        .map(|campaign| CampaignView {
            donation_count: counts.get(&campaign.id).copied().unwrap_or(0),
            progress_percentage: campaign.progress_percentage(),
            campaign,
        })
        .collect())
}

pub async fn donations(
    db: &DatabaseConnection,
    campaign_id: i32,
    page: PageParams,
) -> ApiResult<(Vec<PublicDonation>, Pagination)> {
    find(db, campaign_id).await?;

    let query = donation::Entity::find()
        .find_also_related(user::Entity)
        .filter(donation::Column::CampaignId.eq(campaign_id))
        .filter(donation::Column::Status.ne(DonationStatus::Rejected))
        .order_by_desc(donation::Column::CreatedAt)
        .order_by_desc(donation::Column::Id);
    let (rows, pagination) = fetch_page(db, query, page).await?;

    let donations = rows
        .into_iter()
        .map(|(d, donor)| PublicDonation {
            id: d.id,
            amount: d.amount,
            status: d.status,
            is_anonymous: d.is_anonymous,
            donor_name: if d.is_anonymous {
                None
            } else {
                donor.map(|u| u.full_name())
            },
            created_at: d.created_at,
        })
        .collect();

    Ok((donations, pagination))
}

pub async fn stats(db: &DatabaseConnection) -> ApiResult<CampaignStats> {
    let campaigns = campaign::Entity::find().all(db).await?;
    let count = |status: CampaignStatus| {
        campaigns.iter().filter(|c| c.status == status).count() as u64
    };

    Ok(CampaignStats {
        total_campaigns: campaigns.len() as u64,
        active_campaigns: count(CampaignStatus::Active),
        completed_campaigns: count(CampaignStatus::Completed),
        cancelled_campaigns: count(CampaignStatus::Cancelled),
        total_target: campaigns.iter().map(|c| c.target_amount).sum(),
        total_raised: campaigns.iter().map(|c| c.current_amount).sum(),
        fully_funded: campaigns
            .iter()
            .filter(|c| c.current_amount >= c.target_amount)
            .count() as u64,
    })
}

/// Donors with at least one completed donation, most recent first.
pub async fn launch_audience(db: &DatabaseConnection) -> ApiResult<Vec<user::Model>> {
    let donor_ids: Vec<i32> = donation::Entity::find()
        .select_only()
        .column(donation::Column::DonorId)
        .filter(donation::Column::Status.eq(DonationStatus::Completed))
        .group_by(donation::Column::DonorId)
        .order_by_desc(Expr::col(donation::Column::CreatedAt).max())
        .limit(LAUNCH_AUDIENCE_LIMIT)
        .into_tuple()
        .all(db)
        .await?;

    Ok(user::Entity::find()
        .filter(user::Column::Id.is_in(donor_ids))
        .all(db)
        .await?)
}
