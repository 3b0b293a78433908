use std::collections::HashMap;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    FromQueryResult, ModelTrait, QueryFilter, QueryOrder, QuerySelect, Set, SqlErr,
    sea_query::Expr,
};
use serde::{Deserialize, Serialize};

use crate::{
    auth::CurrentUser,
    entities::{orphan, orphanage, review, sea_orm_active_enums::VerificationStatus, user},
    error::{ApiError, ApiResult},
    response::Pagination,
    util::pagination::{PageParams, fetch_page},
};

#[derive(Debug, Clone, Deserialize)]
pub struct NewOrphanage {
    pub name: String,
    pub description: Option<String>,
    pub location: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrphanageUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrphanageFilter {
    pub name: Option<String>,
    pub location: Option<String>,
    pub verification_status: Option<VerificationStatus>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewReview {
    pub rating: i32,
    pub comment: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct OrphanageView {
    #[serde(flatten)]
    pub orphanage: orphanage::Model,
    pub orphan_count: i64,
}

#[derive(Debug, Serialize)]
pub struct OrphanageDetail {
    #[serde(flatten)]
    pub view: OrphanageView,
    pub contact_person: Option<ContactPerson>,
    pub rating: RatingSummary,
}

#[derive(Debug, Serialize)]
pub struct ContactPerson {
    pub id: i32,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatingSummary {
    pub average_rating: f64,
    pub total_reviews: usize,
    /// Review counts for ratings 1 through 5.
    pub histogram: [usize; 5],
}

#[derive(Debug, Serialize)]
pub struct ReviewView {
    #[serde(flatten)]
    pub review: review::Model,
    pub reviewer_name: Option<String>,
}

#[derive(Debug, FromQueryResult)]
struct OrphanCount {
    orphanage_id: i32,
    count: i64,
}

/// Admins manage every orphanage; anyone else only the ones they are the contact person for.
pub async fn ensure_manages<C: ConnectionTrait>(
    db: &C,
    actor: &CurrentUser,
    orphanage_id: i32,
) -> ApiResult<orphanage::Model> {
    let orphanage = orphanage::Entity::find_by_id(orphanage_id)
        .one(db)
        .await?
        .ok_or_else(|| ApiError::not_found("Orphanage"))?;

    if !actor.is_admin() && orphanage.contact_person_id != Some(actor.id()) {
        return Err(ApiError::Forbidden(
            "Not authorized to manage this orphanage".into(),
        ));
    }
    Ok(orphanage)
}

pub async fn find(db: &DatabaseConnection, orphanage_id: i32) -> ApiResult<orphanage::Model> {
    orphanage::Entity::find_by_id(orphanage_id)
        .one(db)
        .await?
        .ok_or_else(|| ApiError::not_found("Orphanage"))
}

pub async fn create(
    db: &DatabaseConnection,
    actor: &CurrentUser,
    input: NewOrphanage,
) -> ApiResult<orphanage::Model> {
    if input.name.trim().is_empty() || input.location.trim().is_empty() {
        return Err(ApiError::validation("Please provide a name and location"));
    }

    let now = Utc::now().naive_utc();
    let orphanage = orphanage::ActiveModel {
        name: Set(input.name.trim().to_string()),
        description: Set(input.description),
        location: Set(input.location.trim().to_string()),
        address: Set(input.address),
        phone: Set(input.phone),
        email: Set(input.email),
        contact_person_id: Set(Some(actor.id())),
        verification_status: Set(VerificationStatus::Pending),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;

    tracing::info!(orphanage_id = orphanage.id, "orphanage registered");
    Ok(orphanage)
}

pub async fn update(
    db: &DatabaseConnection,
    actor: &CurrentUser,
    orphanage_id: i32,
    input: OrphanageUpdate,
) -> ApiResult<orphanage::Model> {
    let orphanage = ensure_manages(db, actor, orphanage_id).await?;

    let mut orphanage: orphanage::ActiveModel = orphanage.into();
    if let Some(name) = input.name {
        orphanage.name = Set(name);
    }
    if input.description.is_some() {
        orphanage.description = Set(input.description);
    }
    if let Some(location) = input.location {
        orphanage.location = Set(location);
    }
    if input.address.is_some() {
        orphanage.address = Set(input.address);
    }
    if input.phone.is_some() {
        orphanage.phone = Set(input.phone);
    }
    if input.email.is_some() {
        orphanage.email = Set(input.email);
    }
    orphanage.updated_at = Set(Utc::now().naive_utc());

    Ok(orphanage.update(db).await?)
}

pub async fn set_verification(
    db: &DatabaseConnection,
    orphanage_id: i32,
    status: VerificationStatus,
) -> ApiResult<orphanage::Model> {
    let orphanage = find(db, orphanage_id).await?;

    let mut orphanage: orphanage::ActiveModel = orphanage.into();
    orphanage.verification_status = Set(status);
    orphanage.updated_at = Set(Utc::now().naive_utc());

    Ok(orphanage.update(db).await?)
}

pub async fn contact_person(
    db: &DatabaseConnection,
    orphanage: &orphanage::Model,
) -> ApiResult<Option<user::Model>> {
    Ok(orphanage.find_related(user::Entity).one(db).await?)
}

pub async fn list(
    db: &DatabaseConnection,
    filter: OrphanageFilter,
    page: PageParams,
) -> ApiResult<(Vec<OrphanageView>, Pagination)> {
    let mut query = orphanage::Entity::find();
    if let Some(name) = filter.name {
        query = query.filter(orphanage::Column::Name.contains(name));
    }
    if let Some(location) = filter.location {
        query = query.filter(orphanage::Column::Location.contains(location));
    }
    if let Some(status) = filter.verification_status {
        query = query.filter(orphanage::Column::VerificationStatus.eq(status));
    }

    let query = query.order_by_asc(orphanage::Column::Name);
    let (orphanages, pagination) = fetch_page(db, query, page).await?;

    Ok((with_counts(db, orphanages).await?, pagination))
}

async fn with_counts(
    db: &DatabaseConnection,
    orphanages: Vec<orphanage::Model>,
) -> ApiResult<Vec<OrphanageView>> {
    let ids: Vec<i32> = orphanages.iter().map(|o| o.id).collect();
    let counts: HashMap<i32, i64> = orphan::Entity::find()
        .select_only()
        .column(orphan::Column::OrphanageId)
        .column_as(Expr::col(orphan::Column::Id).count(), "count")
        .filter(orphan::Column::OrphanageId.is_in(ids))
        .group_by(orphan::Column::OrphanageId)
        .into_model::<OrphanCount>()
        .all(db)
        .await?
        .into_iter()
        .map(|c| (c.orphanage_id, c.count))
        .collect();

    Ok(orphanages
        .into_iter()
        .map(|orphanage| OrphanageView {
            orphan_count: counts.get(&orphanage.id).copied().unwrap_or(0),
            orphanage,
        })
        .collect())
}

pub async fn get(db: &DatabaseConnection, orphanage_id: i32) -> ApiResult<OrphanageDetail> {
    let orphanage = find(db, orphanage_id).await?;
    let contact_person = contact_person(db, &orphanage).await?.map(|u| ContactPerson {
        id: u.id,
        name: u.full_name(),
        email: u.email,
    });
    let ratings: Vec<i32> = review::Entity::find()
        .select_only()
        .column(review::Column::Rating)
        .filter(review::Column::OrphanageId.eq(orphanage_id))
        .into_tuple()
        .all(db)
        .await?;
    let view = with_counts(db, vec![orphanage])
        .await?
        .pop()
        .ok_or_else(|| ApiError::not_found("Orphanage"))?;

    Ok(OrphanageDetail {
        view,
        contact_person,
        rating: summarize(&ratings),
    })
}

pub async fn orphans(
    db: &DatabaseConnection,
    orphanage_id: i32,
    page: PageParams,
) -> ApiResult<(Vec<orphan::Model>, Pagination)> {
    find(db, orphanage_id).await?;
    let query = orphan::Entity::find()
        .filter(orphan::Column::OrphanageId.eq(orphanage_id))
        .order_by_asc(orphan::Column::FirstName)
        .order_by_asc(orphan::Column::Id);
    Ok(fetch_page(db, query, page).await?)
}

pub async fn reviews(
    db: &DatabaseConnection,
    orphanage_id: i32,
    page: PageParams,
) -> ApiResult<(Vec<ReviewView>, RatingSummary, Pagination)> {
    find(db, orphanage_id).await?;

    let ratings: Vec<i32> = review::Entity::find()
        .select_only()
        .column(review::Column::Rating)
        .filter(review::Column::OrphanageId.eq(orphanage_id))
        .into_tuple()
        .all(db)
        .await?;

    let query = review::Entity::find()
        .find_also_related(user::Entity)
        .filter(review::Column::OrphanageId.eq(orphanage_id))
        .order_by_desc(review::Column::CreatedAt)
        .order_by_desc(review::Column::Id);
    let (rows, pagination) = fetch_page(db, query, page).await?;
    let reviews = rows
        .into_iter()
        .map(|(review, author)| ReviewView {
            review,
            reviewer_name: author.map(|u| u.full_name()),
        })
        .collect();

    Ok((reviews, summarize(&ratings), pagination))
}

pub async fn add_review(
    db: &DatabaseConnection,
    actor: &CurrentUser,
    orphanage_id: i32,
    input: NewReview,
) -> ApiResult<review::Model> {
    if !(1..=5).contains(&input.rating) {
        return Err(ApiError::validation("Rating must be between 1 and 5"));
    }
    find(db, orphanage_id).await?;

    let existing = review::Entity::find()
        .filter(review::Column::UserId.eq(actor.id()))
        .filter(review::Column::OrphanageId.eq(orphanage_id))
        .one(db)
        .await?;
    if existing.is_some() {
        return Err(ApiError::Conflict(
            "You have already reviewed this orphanage".into(),
        ));
    }

    let now = Utc::now().naive_utc();
    review::ActiveModel {
        user_id: Set(actor.id()),
        orphanage_id: Set(orphanage_id),
        rating: Set(input.rating),
        comment: Set(input.comment),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(|e| match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            ApiError::Conflict("You have already reviewed this orphanage".into())
        }
        _ => e.into(),
    })
}

pub async fn delete_review(
    db: &DatabaseConnection,
    actor: &CurrentUser,
    orphanage_id: i32,
    review_id: i32,
) -> ApiResult<()> {
    let review = review::Entity::find_by_id(review_id)
        .filter(review::Column::OrphanageId.eq(orphanage_id))
        .one(db)
        .await?
        .ok_or_else(|| ApiError::not_found("Review"))?;

    if review.user_id != actor.id() && !actor.is_admin() {
        return Err(ApiError::forbidden());
    }
    review.delete(db).await?;
    Ok(())
}

pub fn summarize(ratings: &[i32]) -> RatingSummary {
    let mut histogram = [0usize; 5];
    for rating in ratings {
        if let Ok(idx) = usize::try_from(rating - 1) {
            if let Some(slot) = histogram.get_mut(idx) {
                *slot += 1;
            }
        }
    }
    let total_reviews = ratings.len();
    let average_rating = if total_reviews == 0 {
        0.0
    } else {
        let sum: i32 = ratings.iter().sum();
        (sum as f64 / total_reviews as f64 * 10.0).round() / 10.0
    };

    RatingSummary {
        average_rating,
        total_reviews,
        histogram,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_of_no_reviews() {
        let summary = summarize(&[]);
        assert_eq!(summary.average_rating, 0.0);
        assert_eq!(summary.total_reviews, 0);
        assert_eq!(summary.histogram, [0; 5]);
    }

    #[test]
    fn summary_rounds_to_one_decimal() {
        let summary = summarize(&[5, 4, 4]);
        assert_eq!(summary.average_rating, 4.3);
        assert_eq!(summary.histogram, [0, 0, 0, 2, 1]);
    }
}
