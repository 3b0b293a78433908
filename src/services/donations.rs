//! Donation ledger: creation, status review and the campaign running totals
//! that depend on them.
//!
//! `campaign.current_amount` always equals the sum of the campaign's
//! non-rejected donations. Every write that can move that sum happens in the
//! same transaction as the campaign update.

use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    EntityTrait, FromQueryResult, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
    sea_query::Expr,
};
use serde::{Deserialize, Serialize};

use crate::{
    auth::CurrentUser,
    entities::{
        campaign, delivery, delivery_status_history, donation, orphan, orphanage,
        sea_orm_active_enums::{CampaignStatus, DeliveryStatus, DonationCategory, DonationStatus},
    },
    error::{ApiError, ApiResult},
    response::Pagination,
    util::pagination::{PageParams, fetch_page},
};

#[derive(Debug, Clone, Deserialize)]
pub struct NewDonation {
    pub amount: f64,
    pub donation_type: String,
    pub category: DonationCategory,
    pub payment_method: Option<String>,
    pub transaction_id: Option<String>,
    pub orphan_id: Option<i32>,
    pub orphanage_id: Option<i32>,
    pub campaign_id: Option<i32>,
    pub description: Option<String>,
    #[serde(default)]
    pub is_anonymous: bool,
    pub pickup_address: Option<String>,
    pub delivery_address: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DonationFilter {
    #[serde(rename = "type")]
    pub donation_type: Option<String>,
    pub status: Option<DonationStatus>,
    pub category: Option<DonationCategory>,
    pub min_amount: Option<f64>,
    pub max_amount: Option<f64>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub donor_id: Option<i32>,
    pub orphan_id: Option<i32>,
    pub orphanage_id: Option<i32>,
    pub campaign_id: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct DonationDetail {
    #[serde(flatten)]
    pub donation: donation::Model,
    pub delivery: Option<delivery::Model>,
}

#[derive(Debug, Serialize, FromQueryResult)]
pub struct Bucket {
    pub key: String,
    pub count: i64,
    pub total: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct DonationStats {
    pub total_count: i64,
    pub total_amount: f64,
    pub by_status: Vec<Bucket>,
    pub by_category: Vec<Bucket>,
}

/// Inserts a pending donation, its delivery record when in-kind, and
/// credits the campaign, all in one transaction.
pub async fn create(
    db: &DatabaseConnection,
    donor_id: i32,
    input: NewDonation,
) -> ApiResult<donation::Model> {
    if !input.amount.is_finite() || input.amount <= 0.0 {
        return Err(ApiError::validation("Donation amount must be greater than zero"));
    }
    if input.donation_type.trim().is_empty() {
        return Err(ApiError::validation(
            "Please provide amount, donation type, and category",
        ));
    }

    let donation = db
        .transaction::<_, donation::Model, ApiError>(|txn| {
            Box::pin(async move {
                if let Some(orphan_id) = input.orphan_id {
                    orphan::Entity::find_by_id(orphan_id)
                        .one(txn)
                        .await?
                        .ok_or_else(|| ApiError::not_found("Orphan"))?;
                }
                if let Some(orphanage_id) = input.orphanage_id {
                    orphanage::Entity::find_by_id(orphanage_id)
                        .one(txn)
                        .await?
                        .ok_or_else(|| ApiError::not_found("Orphanage"))?;
                }
                if let Some(campaign_id) = input.campaign_id {
                    let campaign = campaign::Entity::find_by_id(campaign_id)
                        .one(txn)
                        .await?
                        .ok_or_else(|| ApiError::not_found("Campaign"))?;
                    if campaign.status != CampaignStatus::Active {
                        return Err(ApiError::validation("Campaign is not active"));
                    }
                }

                let now = Utc::now().naive_utc();
                let donation = donation::ActiveModel {
                    donor_id: Set(donor_id),
                    amount: Set(input.amount),
                    donation_type: Set(input.donation_type.trim().to_string()),
                    category: Set(input.category),
                    status: Set(DonationStatus::Pending),
                    payment_method: Set(input.payment_method),
                    transaction_id: Set(input.transaction_id),
                    orphan_id: Set(input.orphan_id),
                    orphanage_id: Set(input.orphanage_id),
                    campaign_id: Set(input.campaign_id),
                    sponsorship_id: Set(None),
                    description: Set(input.description),
                    is_anonymous: Set(input.is_anonymous),
                    receipt_url: Set(None),
                    created_at: Set(now),
                    updated_at: Set(now),
                    ..Default::default()
                }
                .insert(txn)
                .await?;

                if donation.category == DonationCategory::InKind {
                    open_delivery(
                        txn,
                        donation.id,
                        donor_id,
                        input.pickup_address,
                        input.delivery_address,
                    )
                    .await?;
                }

                if let Some(campaign_id) = donation.campaign_id {
                    adjust_campaign_total(txn, campaign_id, donation.amount).await?;
                }

                Ok(donation)
            })
        })
        .await?;

    tracing::info!(
        donation_id = donation.id,
        donor_id,
        amount = donation.amount,
        "donation created"
    );
    Ok(donation)
}

/// Moves a donation to `status`, debiting or re-crediting its campaign when
/// the donation leaves or re-enters the counted set. Setting the status a
/// donation already has is a no-op, so repeated rejections debit once.
pub async fn update_status(
    db: &DatabaseConnection,
    donation_id: i32,
    status: DonationStatus,
) -> ApiResult<(donation::Model, bool)> {
    db.transaction::<_, (donation::Model, bool), ApiError>(|txn| {
        Box::pin(async move {
            let current = donation::Entity::find_by_id(donation_id)
                .one(txn)
                .await?
                .ok_or_else(|| ApiError::not_found("Donation"))?;

            if current.status == status {
                return Ok((current, false));
            }

            let result = donation::Entity::update_many()
                .col_expr(donation::Column::Status, Expr::value(status))
                .col_expr(
                    donation::Column::UpdatedAt,
                    Expr::value(Utc::now().naive_utc()),
                )
                .filter(donation::Column::Id.eq(donation_id))
                .filter(donation::Column::Status.eq(current.status))
                .exec(txn)
                .await?;
            if result.rows_affected == 0 {
                return Err(ApiError::Conflict(
                    "Donation was modified concurrently, please retry".into(),
                ));
            }

            if let Some(campaign_id) = current.campaign_id {
                let was_counted = current.status != DonationStatus::Rejected;
                let is_counted = status != DonationStatus::Rejected;
                let delta = match (was_counted, is_counted) {
                    (true, false) => -current.amount,
                    (false, true) => current.amount,
                    _ => 0.0,
                };
                if delta != 0.0 {
                    adjust_campaign_total(txn, campaign_id, delta).await?;
                }
            }

            let updated = donation::Entity::find_by_id(donation_id)
                .one(txn)
                .await?
                .ok_or_else(|| ApiError::not_found("Donation"))?;
            Ok((updated, true))
        })
    })
    .await
    .map_err(ApiError::from)
}

pub async fn list(
    db: &DatabaseConnection,
    actor: &CurrentUser,
    filter: DonationFilter,
    page: PageParams,
) -> ApiResult<(Vec<donation::Model>, Pagination)> {
    let mut query = donation::Entity::find();

    if !actor.is_admin() {
        query = query.filter(donation::Column::DonorId.eq(actor.id()));
    } else if let Some(donor_id) = filter.donor_id {
        query = query.filter(donation::Column::DonorId.eq(donor_id));
    }
    if let Some(donation_type) = filter.donation_type {
        query = query.filter(donation::Column::DonationType.eq(donation_type));
    }
    if let Some(status) = filter.status {
        query = query.filter(donation::Column::Status.eq(status));
    }
    if let Some(category) = filter.category {
        query = query.filter(donation::Column::Category.eq(category));
    }
    if let Some(min) = filter.min_amount {
        query = query.filter(donation::Column::Amount.gte(min));
    }
    if let Some(max) = filter.max_amount {
        query = query.filter(donation::Column::Amount.lte(max));
    }
    if let Some(start) = filter.start_date.and_then(|d| d.and_hms_opt(0, 0, 0)) {
        query = query.filter(donation::Column::CreatedAt.gte(start));
    }
    if let Some(end) = filter.end_date.and_then(|d| d.and_hms_opt(23, 59, 59)) {
        query = query.filter(donation::Column::CreatedAt.lte(end));
    }
    if let Some(orphan_id) = filter.orphan_id {
        query = query.filter(donation::Column::OrphanId.eq(orphan_id));
    }
    if let Some(orphanage_id) = filter.orphanage_id {
        query = query.filter(donation::Column::OrphanageId.eq(orphanage_id));
    }
    if let Some(campaign_id) = filter.campaign_id {
        query = query.filter(donation::Column::CampaignId.eq(campaign_id));
    }

    let query = query
        .order_by_desc(donation::Column::CreatedAt)
        .order_by_desc(donation::Column::Id);
    Ok(fetch_page(db, query, page).await?)
}

pub async fn find_visible(
    db: &DatabaseConnection,
    actor: &CurrentUser,
    donation_id: i32,
) -> ApiResult<donation::Model> {
    let donation = donation::Entity::find_by_id(donation_id)
        .one(db)
        .await?
        .ok_or_else(|| ApiError::not_found("Donation"))?;

    if donation.donor_id != actor.id() && !actor.is_admin() {
        return Err(ApiError::forbidden());
    }
    Ok(donation)
}

pub async fn get(
    db: &DatabaseConnection,
    actor: &CurrentUser,
    donation_id: i32,
) -> ApiResult<DonationDetail> {
    let donation = find_visible(db, actor, donation_id).await?;
    let delivery = delivery::Entity::find()
        .filter(delivery::Column::DonationId.eq(donation.id))
        .one(db)
        .await?;

    Ok(DonationDetail { donation, delivery })
}

pub async fn attach_receipt(
    db: &DatabaseConnection,
    actor: &CurrentUser,
    donation_id: i32,
    receipt_url: String,
) -> ApiResult<donation::Model> {
    if receipt_url.trim().is_empty() {
        return Err(ApiError::validation("Please provide a receipt reference"));
    }
    let donation = find_visible(db, actor, donation_id).await?;

    let mut donation: donation::ActiveModel = donation.into();
    donation.receipt_url = Set(Some(receipt_url));
    donation.updated_at = Set(Utc::now().naive_utc());
    Ok(donation.update(db).await?)
}

pub async fn stats(db: &DatabaseConnection) -> ApiResult<DonationStats> {
    let by_status = buckets(db, donation::Column::Status).await?;
    let by_category = buckets(db, donation::Column::Category).await?;
    let total_count = by_status.iter().map(|b| b.count).sum();
    let total_amount = by_status.iter().filter_map(|b| b.total).sum();

    Ok(DonationStats {
        total_count,
        total_amount,
        by_status,
        by_category,
    })
}

async fn buckets<C: ConnectionTrait>(db: &C, column: donation::Column) -> ApiResult<Vec<Bucket>> {
    Ok(donation::Entity::find()
        .select_only()
        .column_as(column, "key")
        .column_as(Expr::col(donation::Column::Id).count(), "count")
        .column_as(Expr::col(donation::Column::Amount).sum(), "total")
        .group_by(column)
        .into_model::<Bucket>()
        .all(db)
        .await?)
}

/// Adds `delta` to a campaign's running total in a single UPDATE.
pub(crate) async fn adjust_campaign_total(
    txn: &DatabaseTransaction,
    campaign_id: i32,
    delta: f64,
) -> ApiResult<()> {
    let result = campaign::Entity::update_many()
        .col_expr(
            campaign::Column::CurrentAmount,
            Expr::col(campaign::Column::CurrentAmount).add(delta),
        )
        .col_expr(
            campaign::Column::UpdatedAt,
            Expr::value(Utc::now().naive_utc()),
        )
        .filter(campaign::Column::Id.eq(campaign_id))
        .exec(txn)
        .await?;
    if result.rows_affected == 0 {
        return Err(ApiError::not_found("Campaign"));
    }
    Ok(())
}

/// Creates the delivery record for an in-kind donation with its first
/// history entry.
pub(crate) async fn open_delivery(
    txn: &DatabaseTransaction,
    donation_id: i32,
    changed_by: i32,
    pickup_address: Option<String>,
    delivery_address: Option<String>,
) -> ApiResult<delivery::Model> {
    let now = Utc::now().naive_utc();
    let delivery = delivery::ActiveModel {
        donation_id: Set(donation_id),
        status: Set(DeliveryStatus::Preparing),
        pickup_address: Set(pickup_address),
        delivery_address: Set(delivery_address),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(txn)
    .await?;

    delivery_status_history::ActiveModel {
        delivery_id: Set(delivery.id),
        status: Set(DeliveryStatus::Preparing),
        changed_by: Set(Some(changed_by)),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(txn)
    .await?;

    Ok(delivery)
}
