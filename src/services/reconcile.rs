//! Ledger audit. Recomputes the cached campaign totals and orphan
//! sponsorship flags from the rows they summarize.

use std::collections::HashMap;

use chrono::Utc;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, FromQueryResult, QueryFilter,
    QueryOrder, QuerySelect, TransactionTrait, sea_query::Expr,
};
use serde::Serialize;

use crate::{
    entities::{
        campaign, donation, orphan,
        sea_orm_active_enums::{DonationStatus, SponsorshipStatus},
        sponsorship,
    },
    error::{ApiError, ApiResult},
};

const AMOUNT_TOLERANCE: f64 = 0.005;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CampaignDrift {
    pub campaign_id: i32,
    pub recorded: f64,
    pub expected: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SponsoredFlagDrift {
    pub orphan_id: i32,
    pub recorded: bool,
    pub expected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateSponsorship {
    pub orphan_id: i32,
    pub active_sponsorships: i64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct LedgerReport {
    pub campaigns_checked: usize,
    pub orphans_checked: usize,
    pub campaign_totals: Vec<CampaignDrift>,
    pub sponsored_flags: Vec<SponsoredFlagDrift>,
    /// Reported only; choosing which sponsorship survives is left to an admin.
    pub duplicate_sponsorships: Vec<DuplicateSponsorship>,
    pub repaired: bool,
}

impl LedgerReport {
    pub fn is_clean(&self) -> bool {
        self.campaign_totals.is_empty()
            && self.sponsored_flags.is_empty()
            && self.duplicate_sponsorships.is_empty()
    }
}

#[derive(Debug, FromQueryResult)]
struct CampaignSum {
    campaign_id: i32,
    total: Option<f64>,
}

#[derive(Debug, FromQueryResult)]
struct ActiveCount {
    orphan_id: i32,
    count: i64,
}

pub async fn audit<C: ConnectionTrait>(db: &C) -> ApiResult<LedgerReport> {
    let sums: HashMap<i32, f64> = donation::Entity::find()
        .select_only()
        .column(donation::Column::CampaignId)
        .column_as(Expr::col(donation::Column::Amount).sum(), "total")
        .filter(donation::Column::CampaignId.is_not_null())
        .filter(donation::Column::Status.ne(DonationStatus::Rejected))
        .group_by(donation::Column::CampaignId)
        .into_model::<CampaignSum>()
        .all(db)
        .await?
        .into_iter()
        .map(|s| (s.campaign_id, s.total.unwrap_or(0.0)))
        .collect();

    let campaigns: Vec<(i32, f64)> = campaign::Entity::find()
        .select_only()
        .column(campaign::Column::Id)
        .column(campaign::Column::CurrentAmount)
        .order_by_asc(campaign::Column::Id)
        .into_tuple()
        .all(db)
        .await?;

    let campaign_totals = campaigns
        .iter()
        .filter_map(|&(campaign_id, recorded)| {
            let expected = sums.get(&campaign_id).copied().unwrap_or(0.0);
            ((recorded - expected).abs() > AMOUNT_TOLERANCE).then_some(CampaignDrift {
                campaign_id,
                recorded,
                expected,
            })
        })
        .collect();

    let active: HashMap<i32, i64> = sponsorship::Entity::find()
        .select_only()
        .column(sponsorship::Column::OrphanId)
        .column_as(Expr::col(sponsorship::Column::Id).count(), "count")
        .filter(sponsorship::Column::Status.eq(SponsorshipStatus::Active))
        .group_by(sponsorship::Column::OrphanId)
        .into_model::<ActiveCount>()
        .all(db)
        .await?
        .into_iter()
        .map(|c| (c.orphan_id, c.count))
        .collect();

    let orphans: Vec<(i32, bool)> = orphan::Entity::find()
        .select_only()
        .column(orphan::Column::Id)
        .column(orphan::Column::IsSponsored)
        .order_by_asc(orphan::Column::Id)
        .into_tuple()
        .all(db)
        .await?;

    let sponsored_flags = orphans
        .iter()
        .filter_map(|&(orphan_id, recorded)| {
            let expected = active.get(&orphan_id).is_some_and(|n| *n > 0);
            (recorded != expected).then_some(SponsoredFlagDrift {
                orphan_id,
                recorded,
                expected,
            })
        })
        .collect();

    let mut duplicate_sponsorships: Vec<DuplicateSponsorship> = active
        .iter()
        .filter(|(_, n)| **n > 1)
        .map(|(&orphan_id, &active_sponsorships)| DuplicateSponsorship {
            orphan_id,
            active_sponsorships,
        })
        .collect();
    duplicate_sponsorships.sort_by_key(|d| d.orphan_id);

    Ok(LedgerReport {
        campaigns_checked: campaigns.len(),
        orphans_checked: orphans.len(),
        campaign_totals,
        sponsored_flags,
        duplicate_sponsorships,
        repaired: false,
    })
}

/// Audits and rewrites every drifted cached value in one transaction.
pub async fn repair(db: &DatabaseConnection) -> ApiResult<LedgerReport> {
    let report = db
        .transaction::<_, LedgerReport, ApiError>(|txn| {
            Box::pin(async move {
                let mut report = audit(txn).await?;
                let now = Utc::now().naive_utc();

                for drift in &report.campaign_totals {
                    campaign::Entity::update_many()
                        .col_expr(campaign::Column::CurrentAmount, Expr::value(drift.expected))
                        .col_expr(campaign::Column::UpdatedAt, Expr::value(now))
                        .filter(campaign::Column::Id.eq(drift.campaign_id))
                        .exec(txn)
                        .await?;
                }
                for drift in &report.sponsored_flags {
                    orphan::Entity::update_many()
                        .col_expr(orphan::Column::IsSponsored, Expr::value(drift.expected))
                        .col_expr(orphan::Column::UpdatedAt, Expr::value(now))
                        .filter(orphan::Column::Id.eq(drift.orphan_id))
                        .exec(txn)
                        .await?;
                }

                report.repaired = true;
                Ok(report)
            })
        })
        .await?;

    tracing::info!(
        campaigns = report.campaign_totals.len(),
        orphans = report.sponsored_flags.len(),
        duplicates = report.duplicate_sponsorships.len(),
        "ledger repaired"
    );
    Ok(report)
}
