//! Sponsorship ledger.
//!
//! An orphan has at most one active sponsorship and `orphan.is_sponsored`
//! mirrors whether it has one. Every status change recomputes the flag inside
//! the same transaction. Creation and re-activation first write the orphan
//! row, which serializes concurrent attempts on the same orphan before the
//! active-sponsorship check runs.

use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait, sea_query::Expr,
};
use serde::{Deserialize, Serialize};

use crate::{
    auth::CurrentUser,
    entities::{
        donation, orphan,
        sea_orm_active_enums::{
            DonationCategory, DonationStatus, PaymentFrequency, SponsorshipStatus,
        },
        sponsorship,
    },
    error::{ApiError, ApiResult},
    response::Pagination,
    util::{
        dates::{next_payment_date, today},
        pagination::{PageParams, fetch_page},
    },
};

pub const SPONSORSHIP_DONATION_TYPE: &str = "sponsorship";

#[derive(Debug, Clone, Deserialize)]
pub struct NewSponsorship {
    pub orphan_id: i32,
    pub monthly_amount: f64,
    pub payment_frequency: Option<PaymentFrequency>,
    pub start_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SponsorshipFilter {
    pub status: Option<SponsorshipStatus>,
    pub orphan_id: Option<i32>,
    pub sponsor_id: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct SponsorshipView {
    #[serde(flatten)]
    pub sponsorship: sponsorship::Model,
    pub orphan_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SponsorshipDetail {
    #[serde(flatten)]
    pub sponsorship: sponsorship::Model,
    pub orphan: Option<orphan::Model>,
    pub payments: Vec<donation::Model>,
}

/// A sponsorship together with the donation recording the payment just taken.
#[derive(Debug, Serialize)]
pub struct Payment {
    pub sponsorship: sponsorship::Model,
    pub donation: donation::Model,
}

#[derive(Debug, Serialize)]
pub struct SponsorshipStats {
    pub total: u64,
    pub active: u64,
    pub paused: u64,
    pub terminated: u64,
    pub total_paid: f64,
    pub monthly_commitment: f64,
    pub sponsored_orphans: u64,
}

pub async fn create(
    db: &DatabaseConnection,
    sponsor_id: i32,
    input: NewSponsorship,
) -> ApiResult<Payment> {
    if !input.monthly_amount.is_finite() || input.monthly_amount <= 0.0 {
        return Err(ApiError::validation("Sponsorship amount must be greater than zero"));
    }
    let frequency = input.payment_frequency.unwrap_or(PaymentFrequency::Monthly);
    let start_date = input.start_date.unwrap_or_else(today);
    let next_date = next_payment_date(start_date, frequency)
        .ok_or_else(|| ApiError::validation("Start date is out of range"))?;

    let payment = db
        .transaction::<_, Payment, ApiError>(|txn| {
            Box::pin(async move {
                claim_orphan(txn, input.orphan_id).await?;
                if active_count(txn, input.orphan_id, None).await? > 0 {
                    return Err(ApiError::Conflict(
                        "This orphan already has an active sponsorship".into(),
                    ));
                }

                let orphan = orphan::Entity::find_by_id(input.orphan_id)
                    .one(txn)
                    .await?
                    .ok_or_else(|| ApiError::not_found("Orphan"))?;

                let now = Utc::now().naive_utc();
                let sponsorship = sponsorship::ActiveModel {
                    sponsor_id: Set(sponsor_id),
                    orphan_id: Set(input.orphan_id),
                    monthly_amount: Set(input.monthly_amount),
                    start_date: Set(start_date),
                    end_date: Set(None),
                    status: Set(SponsorshipStatus::Active),
                    payment_frequency: Set(frequency),
                    last_payment_date: Set(Some(start_date)),
                    next_payment_date: Set(next_date),
                    total_paid: Set(input.monthly_amount),
                    payment_count: Set(1),
                    created_at: Set(now),
                    updated_at: Set(now),
                    ..Default::default()
                }
                .insert(txn)
                .await?;

                let donation = record_payment(
                    txn,
                    &sponsorship,
                    orphan.orphanage_id,
                    "First sponsorship payment",
                )
                .await?;

                Ok(Payment {
                    sponsorship,
                    donation,
                })
            })
        })
        .await?;

    tracing::info!(
        sponsorship_id = payment.sponsorship.id,
        orphan_id = payment.sponsorship.orphan_id,
        sponsor_id,
        "sponsorship created"
    );
    Ok(payment)
}

/// Changes a sponsorship's status. `terminated` is final; re-activating a
/// paused sponsorship fails while the orphan has another active one.
pub async fn set_status(
    db: &DatabaseConnection,
    actor: &CurrentUser,
    sponsorship_id: i32,
    status: SponsorshipStatus,
) -> ApiResult<(sponsorship::Model, bool)> {
    let (actor_id, is_admin) = (actor.id(), actor.is_admin());

    let (updated, changed) = db
        .transaction::<_, (sponsorship::Model, bool), ApiError>(|txn| {
            Box::pin(async move {
                let current = sponsorship::Entity::find_by_id(sponsorship_id)
                    .one(txn)
                    .await?
                    .ok_or_else(|| ApiError::not_found("Sponsorship"))?;
                if current.sponsor_id != actor_id && !is_admin {
                    return Err(ApiError::forbidden());
                }
                if current.status == status {
                    return Ok((current, false));
                }
                if current.status == SponsorshipStatus::Terminated {
                    return Err(ApiError::validation(
                        "A terminated sponsorship cannot be changed",
                    ));
                }

                let orphan_id = current.orphan_id;
                claim_orphan(txn, orphan_id).await?;
                if status == SponsorshipStatus::Active
                    && active_count(txn, orphan_id, Some(current.id)).await? > 0
                {
                    return Err(ApiError::Conflict(
                        "This orphan already has an active sponsorship".into(),
                    ));
                }

                let now = Utc::now().naive_utc();
                let end_date = match status {
                    SponsorshipStatus::Terminated => Some(now.date()),
                    _ => None,
                };
                let result = sponsorship::Entity::update_many()
                    .col_expr(sponsorship::Column::Status, Expr::value(status))
                    .col_expr(sponsorship::Column::EndDate, Expr::value(end_date))
                    .col_expr(sponsorship::Column::UpdatedAt, Expr::value(now))
                    .filter(sponsorship::Column::Id.eq(current.id))
                    .filter(sponsorship::Column::Status.eq(current.status))
                    .exec(txn)
                    .await?;
                if result.rows_affected == 0 {
                    return Err(ApiError::Conflict(
                        "Sponsorship was modified concurrently, please retry".into(),
                    ));
                }

                refresh_orphan_flag(txn, orphan_id).await?;

                let updated = sponsorship::Entity::find_by_id(current.id)
                    .one(txn)
                    .await?
                    .ok_or_else(|| ApiError::not_found("Sponsorship"))?;
                Ok((updated, true))
            })
        })
        .await?;

    if changed {
        tracing::info!(sponsorship_id, status = ?updated.status, "sponsorship status changed");
    }
    Ok((updated, changed))
}

/// Records one installment: a completed donation plus the advanced schedule.
pub async fn process_payment(
    db: &DatabaseConnection,
    actor: &CurrentUser,
    sponsorship_id: i32,
) -> ApiResult<Payment> {
    let current = find_visible(db, actor, sponsorship_id).await?;
    if current.status != SponsorshipStatus::Active {
        return Err(ApiError::validation(
            "Payments can only be processed for active sponsorships",
        ));
    }
    let paid_on = today();
    let next_date = next_payment_date(current.next_payment_date, current.payment_frequency)
        .ok_or_else(|| ApiError::validation("Next payment date is out of range"))?;

    db.transaction::<_, Payment, ApiError>(|txn| {
        Box::pin(async move {
            let result = sponsorship::Entity::update_many()
                .col_expr(
                    sponsorship::Column::TotalPaid,
                    Expr::col(sponsorship::Column::TotalPaid).add(current.monthly_amount),
                )
                .col_expr(
                    sponsorship::Column::PaymentCount,
                    Expr::col(sponsorship::Column::PaymentCount).add(1),
                )
                .col_expr(
                    sponsorship::Column::LastPaymentDate,
                    Expr::value(Some(paid_on)),
                )
                .col_expr(sponsorship::Column::NextPaymentDate, Expr::value(next_date))
                .col_expr(
                    sponsorship::Column::UpdatedAt,
                    Expr::value(Utc::now().naive_utc()),
                )
                .filter(sponsorship::Column::Id.eq(current.id))
                .filter(sponsorship::Column::Status.eq(SponsorshipStatus::Active))
                .filter(sponsorship::Column::PaymentCount.eq(current.payment_count))
                .exec(txn)
                .await?;
            if result.rows_affected == 0 {
                return Err(ApiError::Conflict(
                    "Sponsorship was modified concurrently, please retry".into(),
                ));
            }

            let orphanage_id = orphan::Entity::find_by_id(current.orphan_id)
                .one(txn)
                .await?
                .and_then(|o| o.orphanage_id);
            let sponsorship = sponsorship::Entity::find_by_id(current.id)
                .one(txn)
                .await?
                .ok_or_else(|| ApiError::not_found("Sponsorship"))?;
            let donation =
                record_payment(txn, &sponsorship, orphanage_id, "Sponsorship payment").await?;

            Ok(Payment {
                sponsorship,
                donation,
            })
        })
    })
    .await
    .map_err(ApiError::from)
}

pub async fn find_visible(
    db: &DatabaseConnection,
    actor: &CurrentUser,
    sponsorship_id: i32,
) -> ApiResult<sponsorship::Model> {
    let sponsorship = sponsorship::Entity::find_by_id(sponsorship_id)
        .one(db)
        .await?
        .ok_or_else(|| ApiError::not_found("Sponsorship"))?;

    if sponsorship.sponsor_id != actor.id() && !actor.is_admin() {
        return Err(ApiError::forbidden());
    }
    Ok(sponsorship)
}

pub async fn get(
    db: &DatabaseConnection,
    actor: &CurrentUser,
    sponsorship_id: i32,
) -> ApiResult<SponsorshipDetail> {
    let sponsorship = find_visible(db, actor, sponsorship_id).await?;
    let orphan = orphan::Entity::find_by_id(sponsorship.orphan_id)
        .one(db)
        .await?;
    let payments = donation::Entity::find()
        .filter(donation::Column::SponsorshipId.eq(sponsorship.id))
        .order_by_desc(donation::Column::CreatedAt)
        .order_by_desc(donation::Column::Id)
        .all(db)
        .await?;

    Ok(SponsorshipDetail {
        sponsorship,
        orphan,
        payments,
    })
}

pub async fn list(
    db: &DatabaseConnection,
    actor: &CurrentUser,
    filter: SponsorshipFilter,
    page: PageParams,
) -> ApiResult<(Vec<SponsorshipView>, Pagination)> {
    let mut query = sponsorship::Entity::find().find_also_related(orphan::Entity);

    if !actor.is_admin() {
        query = query.filter(sponsorship::Column::SponsorId.eq(actor.id()));
    } else if let Some(sponsor_id) = filter.sponsor_id {
        query = query.filter(sponsorship::Column::SponsorId.eq(sponsor_id));
    }
    if let Some(status) = filter.status {
        query = query.filter(sponsorship::Column::Status.eq(status));
    }
    if let Some(orphan_id) = filter.orphan_id {
        query = query.filter(sponsorship::Column::OrphanId.eq(orphan_id));
    }

    let query = query
        .order_by_desc(sponsorship::Column::CreatedAt)
        .order_by_desc(sponsorship::Column::Id);
    let (rows, pagination) = fetch_page(db, query, page).await?;

    let views = rows
        .into_iter()
        .map(|(sponsorship, orphan)| SponsorshipView {
            sponsorship,
            orphan_name: orphan.map(|o| format!("{} {}", o.first_name, o.last_name)),
        })
        .collect();
    Ok((views, pagination))
}

pub async fn stats(db: &DatabaseConnection) -> ApiResult<SponsorshipStats> {
    let sponsorships = sponsorship::Entity::find().all(db).await?;
    let count = |status: SponsorshipStatus| {
        sponsorships.iter().filter(|s| s.status == status).count() as u64
    };
    let sponsored_orphans = orphan::Entity::find()
        .filter(orphan::Column::IsSponsored.eq(true))
        .count(db)
        .await?;

    Ok(SponsorshipStats {
        total: sponsorships.len() as u64,
        active: count(SponsorshipStatus::Active),
        paused: count(SponsorshipStatus::Paused),
        terminated: count(SponsorshipStatus::Terminated),
        total_paid: sponsorships.iter().map(|s| s.total_paid).sum(),
        monthly_commitment: sponsorships
            .iter()
            .filter(|s| s.status == SponsorshipStatus::Active)
            .map(|s| s.monthly_amount)
            .sum(),
        sponsored_orphans,
    })
}

/// Marks the orphan sponsored. The write takes the orphan's row lock so that
/// concurrent sponsorship changes for one orphan run one at a time.
async fn claim_orphan(txn: &DatabaseTransaction, orphan_id: i32) -> ApiResult<()> {
    let result = orphan::Entity::update_many()
        .col_expr(orphan::Column::IsSponsored, Expr::value(true))
        .filter(orphan::Column::Id.eq(orphan_id))
        .exec(txn)
        .await?;
    if result.rows_affected == 0 {
        return Err(ApiError::not_found("Orphan"));
    }
    Ok(())
}

async fn active_count(
    txn: &DatabaseTransaction,
    orphan_id: i32,
    excluding: Option<i32>,
) -> ApiResult<u64> {
    let mut query = sponsorship::Entity::find()
        .filter(sponsorship::Column::OrphanId.eq(orphan_id))
        .filter(sponsorship::Column::Status.eq(SponsorshipStatus::Active));
    if let Some(id) = excluding {
        query = query.filter(sponsorship::Column::Id.ne(id));
    }
    Ok(query.count(txn).await?)
}

/// Sets `is_sponsored` from the orphan's active sponsorships.
async fn refresh_orphan_flag(txn: &DatabaseTransaction, orphan_id: i32) -> ApiResult<bool> {
    let sponsored = active_count(txn, orphan_id, None).await? > 0;
    orphan::Entity::update_many()
        .col_expr(orphan::Column::IsSponsored, Expr::value(sponsored))
        .col_expr(
            orphan::Column::UpdatedAt,
            Expr::value(Utc::now().naive_utc()),
        )
        .filter(orphan::Column::Id.eq(orphan_id))
        .exec(txn)
        .await?;
    Ok(sponsored)
}

async fn record_payment(
    txn: &DatabaseTransaction,
    sponsorship: &sponsorship::Model,
    orphanage_id: Option<i32>,
    description: &str,
) -> ApiResult<donation::Model> {
    let now = Utc::now().naive_utc();
    Ok(donation::ActiveModel {
        donor_id: Set(sponsorship.sponsor_id),
        amount: Set(sponsorship.monthly_amount),
        donation_type: Set(SPONSORSHIP_DONATION_TYPE.to_string()),
        category: Set(DonationCategory::Monetary),
        status: Set(DonationStatus::Completed),
        payment_method: Set(None),
        transaction_id: Set(None),
        orphan_id: Set(Some(sponsorship.orphan_id)),
        orphanage_id: Set(orphanage_id),
        campaign_id: Set(None),
        sponsorship_id: Set(Some(sponsorship.id)),
        description: Set(Some(description.to_string())),
        is_anonymous: Set(false),
        receipt_url: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(txn)
    .await?)
}
