//! Delivery tracking for in-kind donations.
//!
//! preparing -> in_transit | failed, in_transit -> delivered | failed.
//! Every status change appends one row to the status history.

use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveEnum, ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, RelationTrait, Set, TransactionTrait, sea_query::JoinType,
};
use serde::{Deserialize, Serialize};

use crate::{
    auth::CurrentUser,
    entities::{
        delivery, delivery_status_history, donation,
        sea_orm_active_enums::{DeliveryStatus, DonationCategory},
    },
    error::{ApiError, ApiResult},
    response::Pagination,
    services::donations::open_delivery,
    util::{
        dates::today,
        pagination::{PageParams, fetch_page},
    },
};

#[derive(Debug, Clone, Deserialize)]
pub struct NewDelivery {
    pub donation_id: i32,
    pub pickup_address: Option<String>,
    pub delivery_address: Option<String>,
    pub carrier: Option<String>,
    pub tracking_number: Option<String>,
    pub estimated_delivery: Option<NaiveDate>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeliveryUpdate {
    pub status: Option<DeliveryStatus>,
    pub pickup_address: Option<String>,
    pub delivery_address: Option<String>,
    pub carrier: Option<String>,
    pub tracking_number: Option<String>,
    pub estimated_delivery: Option<NaiveDate>,
    pub actual_delivery: Option<NaiveDate>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryFilter {
    pub status: Option<DeliveryStatus>,
    pub donation_id: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct DeliveryDetail {
    #[serde(flatten)]
    pub delivery: delivery::Model,
    pub donation: Option<donation::Model>,
    pub status_history: Vec<delivery_status_history::Model>,
}

/// The result of a write: the delivery, its donation and whether the status moved.
#[derive(Debug)]
pub struct DeliveryChange {
    pub delivery: delivery::Model,
    pub donation: donation::Model,
    pub status_changed: bool,
}

pub fn can_transition(from: DeliveryStatus, to: DeliveryStatus) -> bool {
    use DeliveryStatus::*;
    matches!(
        (from, to),
        (Preparing, InTransit) | (Preparing, Failed) | (InTransit, Delivered) | (InTransit, Failed)
    )
}

pub async fn create(
    db: &DatabaseConnection,
    actor: &CurrentUser,
    input: NewDelivery,
) -> ApiResult<DeliveryChange> {
    let actor_id = actor.id();
    db.transaction::<_, DeliveryChange, ApiError>(|txn| {
        Box::pin(async move {
            let donation = donation::Entity::find_by_id(input.donation_id)
                .one(txn)
                .await?
                .ok_or_else(|| ApiError::not_found("Donation"))?;
            if donation.category != DonationCategory::InKind {
                return Err(ApiError::validation(
                    "Delivery tracking is only available for in-kind donations",
                ));
            }
            let existing = delivery::Entity::find()
                .filter(delivery::Column::DonationId.eq(donation.id))
                .one(txn)
                .await?;
            if existing.is_some() {
                return Err(ApiError::Conflict(
                    "Delivery tracking already exists for this donation".into(),
                ));
            }

            let delivery = open_delivery(
                txn,
                donation.id,
                actor_id,
                input.pickup_address,
                input.delivery_address,
            )
            .await?;
            let mut delivery: delivery::ActiveModel = delivery.into();
            delivery.carrier = Set(input.carrier);
            delivery.tracking_number = Set(input.tracking_number);
            delivery.estimated_delivery = Set(input.estimated_delivery);
            delivery.notes = Set(input.notes);
            let delivery = delivery.update(txn).await?;

            Ok(DeliveryChange {
                delivery,
                donation,
                status_changed: true,
            })
        })
    })
    .await
    .map_err(ApiError::from)
}

pub async fn update(
    db: &DatabaseConnection,
    actor: &CurrentUser,
    delivery_id: i32,
    input: DeliveryUpdate,
) -> ApiResult<DeliveryChange> {
    let actor_id = actor.id();
    let change = db
        .transaction::<_, DeliveryChange, ApiError>(|txn| {
            Box::pin(async move {
                let (current, donation) = delivery::Entity::find_by_id(delivery_id)
                    .find_also_related(donation::Entity)
                    .one(txn)
                    .await?
                    .ok_or_else(|| ApiError::not_found("Delivery"))?;
                let donation = donation.ok_or_else(|| ApiError::not_found("Donation"))?;

                let new_status = input.status.filter(|s| *s != current.status);
                if let Some(to) = new_status {
                    if !can_transition(current.status, to) {
                        return Err(ApiError::validation(format!(
                            "Cannot change delivery status from {} to {}",
                            current.status.to_value(),
                            to.to_value()
                        )));
                    }
                }

                let now = Utc::now().naive_utc();
                let previous_status = current.status;
                let mut delivery: delivery::ActiveModel = current.into();
                if let Some(to) = new_status {
                    delivery.status = Set(to);
                }
                if input.pickup_address.is_some() {
                    delivery.pickup_address = Set(input.pickup_address);
                }
                if input.delivery_address.is_some() {
                    delivery.delivery_address = Set(input.delivery_address);
                }
                if input.carrier.is_some() {
                    delivery.carrier = Set(input.carrier);
                }
                if input.tracking_number.is_some() {
                    delivery.tracking_number = Set(input.tracking_number);
                }
                if input.estimated_delivery.is_some() {
                    delivery.estimated_delivery = Set(input.estimated_delivery);
                }
                if input.notes.is_some() {
                    delivery.notes = Set(input.notes);
                }
                match (new_status, input.actual_delivery) {
                    (_, Some(date)) => delivery.actual_delivery = Set(Some(date)),
                    (Some(DeliveryStatus::Delivered), None) => {
                        delivery.actual_delivery = Set(Some(today()))
                    }
                    _ => {}
                }
                delivery.updated_at = Set(now);

                // Guard the status column so a racing writer cannot skip a history row.
                let result = delivery::Entity::update_many()
                    .set(delivery)
                    .filter(delivery::Column::Id.eq(delivery_id))
                    .filter(delivery::Column::Status.eq(previous_status))
                    .exec(txn)
                    .await?;
                if result.rows_affected == 0 {
                    return Err(ApiError::Conflict(
                        "Delivery was modified concurrently, please retry".into(),
                    ));
                }

                if let Some(to) = new_status {
                    delivery_status_history::ActiveModel {
                        delivery_id: Set(delivery_id),
                        status: Set(to),
                        changed_by: Set(Some(actor_id)),
                        created_at: Set(now),
                        updated_at: Set(now),
                        ..Default::default()
                    }
                    .insert(txn)
                    .await?;
                }

                let delivery = delivery::Entity::find_by_id(delivery_id)
                    .one(txn)
                    .await?
                    .ok_or_else(|| ApiError::not_found("Delivery"))?;

                Ok(DeliveryChange {
                    delivery,
                    donation,
                    status_changed: new_status.is_some(),
                })
            })
        })
        .await?;

    if change.status_changed {
        tracing::info!(
            delivery_id,
            status = ?change.delivery.status,
            "delivery status changed"
        );
    }
    Ok(change)
}

pub async fn list(
    db: &DatabaseConnection,
    actor: &CurrentUser,
    filter: DeliveryFilter,
    page: PageParams,
) -> ApiResult<(Vec<delivery::Model>, Pagination)> {
    let mut query = delivery::Entity::find();

    if !actor.is_admin() {
        query = query
            .join(JoinType::InnerJoin, delivery::Relation::Donation.def())
            .filter(donation::Column::DonorId.eq(actor.id()));
    }
    if let Some(status) = filter.status {
        query = query.filter(delivery::Column::Status.eq(status));
    }
    if let Some(donation_id) = filter.donation_id {
        query = query.filter(delivery::Column::DonationId.eq(donation_id));
    }

    let query = query
        .order_by_desc(delivery::Column::CreatedAt)
        .order_by_desc(delivery::Column::Id);
    Ok(fetch_page(db, query, page).await?)
}

pub async fn get(
    db: &DatabaseConnection,
    actor: &CurrentUser,
    delivery_id: i32,
) -> ApiResult<DeliveryDetail> {
    let (delivery, donation) = delivery::Entity::find_by_id(delivery_id)
        .find_also_related(donation::Entity)
        .one(db)
        .await?
        .ok_or_else(|| ApiError::not_found("Delivery"))?;

    let owns = donation.as_ref().is_some_and(|d| d.donor_id == actor.id());
    if !owns && !actor.is_admin() {
        return Err(ApiError::forbidden());
    }

    let status_history = delivery_status_history::Entity::find()
        .filter(delivery_status_history::Column::DeliveryId.eq(delivery.id))
        .order_by_desc(delivery_status_history::Column::CreatedAt)
        .order_by_desc(delivery_status_history::Column::Id)
        .all(db)
        .await?;

    Ok(DeliveryDetail {
        delivery,
        donation,
        status_history,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use DeliveryStatus::*;

    #[test]
    fn forward_transitions_are_allowed() {
        assert!(can_transition(Preparing, InTransit));
        assert!(can_transition(InTransit, Delivered));
        assert!(can_transition(Preparing, Failed));
        assert!(can_transition(InTransit, Failed));
    }

    #[test]
    fn terminal_and_backward_transitions_are_rejected() {
        assert!(!can_transition(Delivered, InTransit));
        assert!(!can_transition(Failed, Preparing));
        assert!(!can_transition(InTransit, Preparing));
        assert!(!can_transition(Preparing, Delivered));
    }
}
