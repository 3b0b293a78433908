use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};

use crate::{
    auth::CurrentUser,
    entities::{
        orphan, orphan_update, orphanage, sea_orm_active_enums::SponsorshipStatus, sponsorship,
    },
    error::{ApiError, ApiResult},
    response::Pagination,
    services::orphanages::ensure_manages,
    util::{
        dates::{age_on, born_on_or_before, today},
        pagination::{PageParams, fetch_page},
    },
};

const RECENT_UPDATES: u64 = 5;

#[derive(Debug, Clone, Deserialize)]
pub struct NewOrphan {
    pub first_name: String,
    pub last_name: String,
    pub dob: NaiveDate,
    pub gender: String,
    pub orphanage_id: Option<i32>,
    pub health_status: Option<String>,
    pub education_status: Option<String>,
    pub background_story: Option<String>,
}

/// Editable profile fields. `is_sponsored` is maintained by the ledger only.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrphanUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub dob: Option<NaiveDate>,
    pub gender: Option<String>,
    pub orphanage_id: Option<i32>,
    pub health_status: Option<String>,
    pub education_status: Option<String>,
    pub background_story: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrphanFilter {
    pub gender: Option<String>,
    pub is_sponsored: Option<bool>,
    pub min_age: Option<u32>,
    pub max_age: Option<u32>,
    pub orphanage_id: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewProgressUpdate {
    pub update_type: String,
    pub title: String,
    pub description: String,
}

#[derive(Debug, Serialize)]
pub struct OrphanView {
    #[serde(flatten)]
    pub orphan: orphan::Model,
    pub age: u32,
    pub orphanage_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct OrphanDetail {
    #[serde(flatten)]
    pub view: OrphanView,
    pub has_active_sponsorship: bool,
    pub recent_updates: Vec<orphan_update::Model>,
}

fn view(orphan: orphan::Model, orphanage: Option<orphanage::Model>) -> OrphanView {
    OrphanView {
        age: age_on(orphan.dob, today()),
        orphanage_name: orphanage.map(|o| o.name),
        orphan,
    }
}

fn validate_gender(gender: &str) -> ApiResult<()> {
    match gender {
        "male" | "female" | "other" => Ok(()),
        _ => Err(ApiError::validation("Gender must be one of: male, female, other")),
    }
}

pub async fn find(db: &DatabaseConnection, orphan_id: i32) -> ApiResult<orphan::Model> {
    orphan::Entity::find_by_id(orphan_id)
        .one(db)
        .await?
        .ok_or_else(|| ApiError::not_found("Orphan"))
}

/// Managers may only touch orphans housed at an orphanage they run.
async fn ensure_can_edit(
    db: &DatabaseConnection,
    actor: &CurrentUser,
    orphanage_id: Option<i32>,
) -> ApiResult<()> {
    match orphanage_id {
        Some(id) => ensure_manages(db, actor, id).await.map(|_| ()),
        None if actor.is_admin() => Ok(()),
        None => Err(ApiError::Forbidden(
            "Only admins can manage orphans without an orphanage".into(),
        )),
    }
}

pub async fn list(
    db: &DatabaseConnection,
    filter: OrphanFilter,
    page: PageParams,
) -> ApiResult<(Vec<OrphanView>, Pagination)> {
    let mut query = orphan::Entity::find().find_also_related(orphanage::Entity);
    let today = today();

    if let Some(gender) = filter.gender {
        query = query.filter(orphan::Column::Gender.eq(gender));
    }
    if let Some(is_sponsored) = filter.is_sponsored {
        query = query.filter(orphan::Column::IsSponsored.eq(is_sponsored));
    }
    if let Some(min_age) = filter.min_age {
        if let Some(latest_dob) = born_on_or_before(min_age, today) {
            query = query.filter(orphan::Column::Dob.lte(latest_dob));
        }
    }
    if let Some(max_age) = filter.max_age {
        // Older than max_age once the next birthday passes.
        if let Some(cutoff) = born_on_or_before(max_age + 1, today) {
            query = query.filter(orphan::Column::Dob.gt(cutoff));
        }
    }
    if let Some(orphanage_id) = filter.orphanage_id {
        query = query.filter(orphan::Column::OrphanageId.eq(orphanage_id));
    }

    let query = query
        .order_by_desc(orphan::Column::CreatedAt)
        .order_by_desc(orphan::Column::Id);
    let (rows, pagination) = fetch_page(db, query, page).await?;

    Ok((
        rows.into_iter().map(|(o, home)| view(o, home)).collect(),
        pagination,
    ))
}

pub async fn get(db: &DatabaseConnection, orphan_id: i32) -> ApiResult<OrphanDetail> {
    let (orphan, orphanage) = orphan::Entity::find_by_id(orphan_id)
        .find_also_related(orphanage::Entity)
        .one(db)
        .await?
        .ok_or_else(|| ApiError::not_found("Orphan"))?;

    let active = sponsorship::Entity::find()
        .filter(sponsorship::Column::OrphanId.eq(orphan_id))
        .filter(sponsorship::Column::Status.eq(SponsorshipStatus::Active))
        .count(db)
        .await?;

    let recent_updates = orphan
        .find_related(orphan_update::Entity)
        .order_by_desc(orphan_update::Column::CreatedAt)
        .order_by_desc(orphan_update::Column::Id)
        .limit(RECENT_UPDATES)
        .all(db)
        .await?;

    Ok(OrphanDetail {
        view: view(orphan, orphanage),
        has_active_sponsorship: active > 0,
        recent_updates,
    })
}

pub async fn create(
    db: &DatabaseConnection,
    actor: &CurrentUser,
    input: NewOrphan,
) -> ApiResult<orphan::Model> {
    if input.first_name.trim().is_empty() || input.last_name.trim().is_empty() {
        return Err(ApiError::validation("Please provide first and last name"));
    }
    validate_gender(&input.gender)?;
    if input.dob > today() {
        return Err(ApiError::validation("Date of birth cannot be in the future"));
    }
    ensure_can_edit(db, actor, input.orphanage_id).await?;

    let now = Utc::now().naive_utc();
    let orphan = orphan::ActiveModel {
        first_name: Set(input.first_name.trim().to_string()),
        last_name: Set(input.last_name.trim().to_string()),
        dob: Set(input.dob),
        gender: Set(input.gender),
        orphanage_id: Set(input.orphanage_id),
        health_status: Set(input.health_status),
        education_status: Set(input.education_status),
        background_story: Set(input.background_story),
        is_sponsored: Set(false),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;

    Ok(orphan)
}

pub async fn update(
    db: &DatabaseConnection,
    actor: &CurrentUser,
    orphan_id: i32,
    input: OrphanUpdate,
) -> ApiResult<orphan::Model> {
    let orphan = find(db, orphan_id).await?;
    ensure_can_edit(db, actor, orphan.orphanage_id).await?;
    if let Some(gender) = &input.gender {
        validate_gender(gender)?;
    }
    if let Some(new_home) = input.orphanage_id {
        ensure_manages(db, actor, new_home).await?;
    }

    let mut orphan: orphan::ActiveModel = orphan.into();
    if let Some(first_name) = input.first_name {
        orphan.first_name = Set(first_name);
    }
    if let Some(last_name) = input.last_name {
        orphan.last_name = Set(last_name);
    }
    if let Some(dob) = input.dob {
        orphan.dob = Set(dob);
    }
    if let Some(gender) = input.gender {
        orphan.gender = Set(gender);
    }
    if input.orphanage_id.is_some() {
        orphan.orphanage_id = Set(input.orphanage_id);
    }
    if input.health_status.is_some() {
        orphan.health_status = Set(input.health_status);
    }
    if input.education_status.is_some() {
        orphan.education_status = Set(input.education_status);
    }
    if input.background_story.is_some() {
        orphan.background_story = Set(input.background_story);
    }
    orphan.updated_at = Set(Utc::now().naive_utc());

    Ok(orphan.update(db).await?)
}

pub async fn delete(db: &DatabaseConnection, orphan_id: i32) -> ApiResult<()> {
    let orphan = find(db, orphan_id).await?;

    let active = sponsorship::Entity::find()
        .filter(sponsorship::Column::OrphanId.eq(orphan_id))
        .filter(sponsorship::Column::Status.eq(SponsorshipStatus::Active))
        .count(db)
        .await?;
    if active > 0 {
        return Err(ApiError::Conflict(
            "Cannot delete an orphan with an active sponsorship".into(),
        ));
    }

    orphan.delete(db).await?;
    tracing::info!(orphan_id, "orphan deleted");
    Ok(())
}

pub async fn updates(
    db: &DatabaseConnection,
    orphan_id: i32,
    page: PageParams,
) -> ApiResult<(Vec<orphan_update::Model>, Pagination)> {
    find(db, orphan_id).await?;
    let query = orphan_update::Entity::find()
        .filter(orphan_update::Column::OrphanId.eq(orphan_id))
        .order_by_desc(orphan_update::Column::CreatedAt)
        .order_by_desc(orphan_update::Column::Id);
    Ok(fetch_page(db, query, page).await?)
}

pub async fn add_update(
    db: &DatabaseConnection,
    actor: &CurrentUser,
    orphan_id: i32,
    input: NewProgressUpdate,
) -> ApiResult<orphan_update::Model> {
    if input.update_type.trim().is_empty()
        || input.title.trim().is_empty()
        || input.description.trim().is_empty()
    {
        return Err(ApiError::validation(
            "Please provide update type, title and description",
        ));
    }
    let orphan = find(db, orphan_id).await?;
    ensure_can_edit(db, actor, orphan.orphanage_id).await?;

    let now = Utc::now().naive_utc();
    Ok(orphan_update::ActiveModel {
        orphan_id: Set(orphan_id),
        update_type: Set(input.update_type),
        title: Set(input.title),
        description: Set(input.description),
        created_by: Set(actor.id()),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?)
}

/// Sponsors of `orphan_id` with an active sponsorship, for update notifications.
pub async fn active_sponsor_ids(db: &DatabaseConnection, orphan_id: i32) -> ApiResult<Vec<i32>> {
    Ok(sponsorship::Entity::find()
        .select_only()
        .column(sponsorship::Column::SponsorId)
        .filter(sponsorship::Column::OrphanId.eq(orphan_id))
        .filter(sponsorship::Column::Status.eq(SponsorshipStatus::Active))
        .into_tuple()
        .all(db)
        .await?)
}
