use std::collections::HashMap;

use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveEnum, ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, FromQueryResult,
    ModelTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, SqlErr,
    TransactionTrait, sea_query::Expr,
};
use serde::{Deserialize, Serialize};

use crate::{
    auth::CurrentUser,
    entities::{
        orphanage,
        sea_orm_active_enums::{ApplicationStatus, OpportunityStatus},
        user, volunteer_application, volunteer_opportunity,
    },
    error::{ApiError, ApiResult},
    response::Pagination,
    services::orphanages::ensure_manages,
    util::pagination::{PageParams, fetch_page},
};

#[derive(Debug, Clone, Deserialize)]
pub struct NewOpportunity {
    pub orphanage_id: i32,
    pub title: String,
    pub description: String,
    pub required_skills: Option<String>,
    pub volunteers_needed: Option<i32>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OpportunityUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub required_skills: Option<String>,
    pub volunteers_needed: Option<i32>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub status: Option<OpportunityStatus>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpportunityFilter {
    pub status: Option<OpportunityStatus>,
    pub orphanage_id: Option<i32>,
    pub skills: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Application {
    pub message: Option<String>,
    pub resume_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct OpportunityView {
    #[serde(flatten)]
    pub opportunity: volunteer_opportunity::Model,
    pub orphanage_name: Option<String>,
    pub application_count: i64,
}

#[derive(Debug, Serialize)]
pub struct ApplicationView {
    #[serde(flatten)]
    pub application: volunteer_application::Model,
    pub volunteer_name: Option<String>,
    pub volunteer_email: Option<String>,
}

/// The result of an application review, with what the caller needs to notify.
#[derive(Debug)]
pub struct Review {
    pub application: volunteer_application::Model,
    pub opportunity: volunteer_opportunity::Model,
    pub changed: bool,
}

#[derive(Debug, Serialize)]
pub struct VolunteerStats {
    pub total_opportunities: u64,
    pub open_opportunities: u64,
    pub filled_opportunities: u64,
    pub total_applications: u64,
    pub pending_applications: u64,
    pub approved_applications: u64,
    pub rejected_applications: u64,
    pub completed_applications: u64,
}

#[derive(Debug, FromQueryResult)]
struct ApplicationCount {
    opportunity_id: i32,
    count: i64,
}

/// pending -> approved | rejected, approved -> completed | rejected.
pub fn can_transition(from: ApplicationStatus, to: ApplicationStatus) -> bool {
    use ApplicationStatus::*;
    matches!(
        (from, to),
        (Pending, Approved) | (Pending, Rejected) | (Approved, Completed) | (Approved, Rejected)
    )
}

pub async fn find_opportunity(
    db: &DatabaseConnection,
    opportunity_id: i32,
) -> ApiResult<volunteer_opportunity::Model> {
    volunteer_opportunity::Entity::find_by_id(opportunity_id)
        .one(db)
        .await?
        .ok_or_else(|| ApiError::not_found("Volunteer opportunity"))
}

pub async fn list_opportunities(
    db: &DatabaseConnection,
    filter: OpportunityFilter,
    page: PageParams,
) -> ApiResult<(Vec<OpportunityView>, Pagination)> {
    let status = filter.status.unwrap_or(OpportunityStatus::Open);
    let mut query = volunteer_opportunity::Entity::find()
        .find_also_related(orphanage::Entity)
        .filter(volunteer_opportunity::Column::Status.eq(status));
    if let Some(orphanage_id) = filter.orphanage_id {
        query = query.filter(volunteer_opportunity::Column::OrphanageId.eq(orphanage_id));
    }
    if let Some(skills) = filter.skills {
        query = query.filter(volunteer_opportunity::Column::RequiredSkills.contains(skills));
    }

    let query = query
        .order_by_asc(volunteer_opportunity::Column::StartDate)
        .order_by_asc(volunteer_opportunity::Column::Id);
    let (rows, pagination) = fetch_page(db, query, page).await?;

    Ok((with_counts(db, rows).await?, pagination))
}

async fn with_counts(
    db: &DatabaseConnection,
    rows: Vec<(volunteer_opportunity::Model, Option<orphanage::Model>)>,
) -> ApiResult<Vec<OpportunityView>> {
    let ids: Vec<i32> = rows.iter().map(|(o, _)| o.id).collect();
    let counts: HashMap<i32, i64> = volunteer_application::Entity::find()
        .select_only()
        .column(volunteer_application::Column::OpportunityId)
        .column_as(Expr::col(volunteer_application::Column::Id).count(), "count")
        .filter(volunteer_application::Column::OpportunityId.is_in(ids))
        .group_by(volunteer_application::Column::OpportunityId)
        .into_model::<ApplicationCount>()
        .all(db)
        .await?
        .into_iter()
        .map(|c| (c.opportunity_id, c.count))
        .collect();

    Ok(rows
        .into_iter()
        .map(|(opportunity, home)| OpportunityView {
            application_count: counts.get(&opportunity.id).copied().unwrap_or(0),
            orphanage_name: home.map(|o| o.name),
            opportunity,
        })
        .collect())
}

pub async fn get_opportunity(
    db: &DatabaseConnection,
    opportunity_id: i32,
) -> ApiResult<OpportunityView> {
    let row = volunteer_opportunity::Entity::find_by_id(opportunity_id)
        .find_also_related(orphanage::Entity)
        .one(db)
        .await?
        .ok_or_else(|| ApiError::not_found("Volunteer opportunity"))?;

    with_counts(db, vec![row])
        .await?
        .pop()
        .ok_or_else(|| ApiError::not_found("Volunteer opportunity"))
}

pub async fn create_opportunity(
    db: &DatabaseConnection,
    actor: &CurrentUser,
    input: NewOpportunity,
) -> ApiResult<volunteer_opportunity::Model> {
    if input.title.trim().is_empty() || input.description.trim().is_empty() {
        return Err(ApiError::validation("Please provide a title and description"));
    }
    let volunteers_needed = input.volunteers_needed.unwrap_or(1);
    if volunteers_needed < 1 {
        return Err(ApiError::validation("At least one volunteer must be needed"));
    }
    if input.end_date.is_some_and(|end| end < input.start_date) {
        return Err(ApiError::validation("End date must be on or after the start date"));
    }
    ensure_manages(db, actor, input.orphanage_id).await?;

    let now = Utc::now().naive_utc();
    Ok(volunteer_opportunity::ActiveModel {
        orphanage_id: Set(input.orphanage_id),
        title: Set(input.title.trim().to_string()),
        description: Set(input.description),
        required_skills: Set(input.required_skills),
        volunteers_needed: Set(volunteers_needed),
        start_date: Set(input.start_date),
        end_date: Set(input.end_date),
        status: Set(OpportunityStatus::Open),
        created_by: Set(actor.id()),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?)
}

pub async fn update_opportunity(
    db: &DatabaseConnection,
    actor: &CurrentUser,
    opportunity_id: i32,
    input: OpportunityUpdate,
) -> ApiResult<volunteer_opportunity::Model> {
    let opportunity = find_opportunity(db, opportunity_id).await?;
    ensure_manages(db, actor, opportunity.orphanage_id).await?;
    if input.volunteers_needed.is_some_and(|n| n < 1) {
        return Err(ApiError::validation("At least one volunteer must be needed"));
    }

    let mut opportunity: volunteer_opportunity::ActiveModel = opportunity.into();
    if let Some(title) = input.title {
        opportunity.title = Set(title);
    }
    if let Some(description) = input.description {
        opportunity.description = Set(description);
    }
    if input.required_skills.is_some() {
        opportunity.required_skills = Set(input.required_skills);
    }
    if let Some(needed) = input.volunteers_needed {
        opportunity.volunteers_needed = Set(needed);
    }
    if let Some(start_date) = input.start_date {
        opportunity.start_date = Set(start_date);
    }
    if input.end_date.is_some() {
        opportunity.end_date = Set(input.end_date);
    }
    if let Some(status) = input.status {
        opportunity.status = Set(status);
    }
    opportunity.updated_at = Set(Utc::now().naive_utc());

    Ok(opportunity.update(db).await?)
}

pub async fn delete_opportunity(
    db: &DatabaseConnection,
    actor: &CurrentUser,
    opportunity_id: i32,
) -> ApiResult<()> {
    let opportunity = find_opportunity(db, opportunity_id).await?;
    ensure_manages(db, actor, opportunity.orphanage_id).await?;
    opportunity.delete(db).await?;
    Ok(())
}

pub async fn apply(
    db: &DatabaseConnection,
    actor: &CurrentUser,
    opportunity_id: i32,
    input: Application,
) -> ApiResult<(volunteer_application::Model, volunteer_opportunity::Model)> {
    let opportunity = find_opportunity(db, opportunity_id).await?;
    if opportunity.status != OpportunityStatus::Open {
        return Err(ApiError::validation(
            "This opportunity is not accepting applications",
        ));
    }

    let existing = volunteer_application::Entity::find()
        .filter(volunteer_application::Column::VolunteerId.eq(actor.id()))
        .filter(volunteer_application::Column::OpportunityId.eq(opportunity_id))
        .one(db)
        .await?;
    if existing.is_some() {
        return Err(ApiError::Conflict(
            "You have already applied for this opportunity".into(),
        ));
    }

    let now = Utc::now().naive_utc();
    let application = volunteer_application::ActiveModel {
        volunteer_id: Set(actor.id()),
        opportunity_id: Set(opportunity_id),
        message: Set(input.message),
        resume_url: Set(input.resume_url),
        status: Set(ApplicationStatus::Pending),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(|e| match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            ApiError::Conflict("You have already applied for this opportunity".into())
        }
        _ => e.into(),
    })?;

    Ok((application, opportunity))
}

pub async fn list_applications(
    db: &DatabaseConnection,
    actor: &CurrentUser,
    opportunity_id: i32,
    page: PageParams,
) -> ApiResult<(Vec<ApplicationView>, Pagination)> {
    let opportunity = find_opportunity(db, opportunity_id).await?;
    ensure_manages(db, actor, opportunity.orphanage_id).await?;

    let query = volunteer_application::Entity::find()
        .find_also_related(user::Entity)
        .filter(volunteer_application::Column::OpportunityId.eq(opportunity_id))
        .order_by_desc(volunteer_application::Column::CreatedAt)
        .order_by_desc(volunteer_application::Column::Id);
    let (rows, pagination) = fetch_page(db, query, page).await?;

    let views = rows
        .into_iter()
        .map(|(application, volunteer)| ApplicationView {
            application,
            volunteer_name: volunteer.as_ref().map(|u| u.full_name()),
            volunteer_email: volunteer.map(|u| u.email),
        })
        .collect();
    Ok((views, pagination))
}

/// Reviews an application. Approving the applicant that reaches
/// `volunteers_needed` marks the opportunity filled.
pub async fn set_application_status(
    db: &DatabaseConnection,
    actor: &CurrentUser,
    application_id: i32,
    status: ApplicationStatus,
) -> ApiResult<Review> {
    let application = volunteer_application::Entity::find_by_id(application_id)
        .one(db)
        .await?
        .ok_or_else(|| ApiError::not_found("Application"))?;
    let opportunity = find_opportunity(db, application.opportunity_id).await?;
    ensure_manages(db, actor, opportunity.orphanage_id).await?;

    if application.status == status {
        return Ok(Review {
            application,
            opportunity,
            changed: false,
        });
    }
    if !can_transition(application.status, status) {
        return Err(ApiError::validation(format!(
            "Cannot change application status from {} to {}",
            application.status.to_value(),
            status.to_value()
        )));
    }

    db.transaction::<_, Review, ApiError>(|txn| {
        Box::pin(async move {
            let result = volunteer_application::Entity::update_many()
                .col_expr(volunteer_application::Column::Status, Expr::value(status))
                .col_expr(
                    volunteer_application::Column::UpdatedAt,
                    Expr::value(Utc::now().naive_utc()),
                )
                .filter(volunteer_application::Column::Id.eq(application.id))
                .filter(volunteer_application::Column::Status.eq(application.status))
                .exec(txn)
                .await?;
            if result.rows_affected == 0 {
                return Err(ApiError::Conflict(
                    "Application was modified concurrently, please retry".into(),
                ));
            }

            let mut opportunity = opportunity;
            if status == ApplicationStatus::Approved
                && opportunity.status == OpportunityStatus::Open
            {
                let approved = volunteer_application::Entity::find()
                    .filter(volunteer_application::Column::OpportunityId.eq(opportunity.id))
                    .filter(volunteer_application::Column::Status.eq(ApplicationStatus::Approved))
                    .count(txn)
                    .await?;
                if approved >= opportunity.volunteers_needed.max(0) as u64 {
                    let mut filled: volunteer_opportunity::ActiveModel = opportunity.into();
                    filled.status = Set(OpportunityStatus::Filled);
                    filled.updated_at = Set(Utc::now().naive_utc());
                    opportunity = filled.update(txn).await?;
                    tracing::info!(opportunity_id = opportunity.id, "opportunity filled");
                }
            }

            let application = volunteer_application::Entity::find_by_id(application.id)
                .one(txn)
                .await?
                .ok_or_else(|| ApiError::not_found("Application"))?;

            Ok(Review {
                application,
                opportunity,
                changed: true,
            })
        })
    })
    .await
    .map_err(ApiError::from)
}

pub async fn attach_resume(
    db: &DatabaseConnection,
    actor: &CurrentUser,
    application_id: i32,
    resume_url: String,
) -> ApiResult<volunteer_application::Model> {
    if resume_url.trim().is_empty() {
        return Err(ApiError::validation("Please provide a resume reference"));
    }
    let application = volunteer_application::Entity::find_by_id(application_id)
        .one(db)
        .await?
        .ok_or_else(|| ApiError::not_found("Application"))?;
    if application.volunteer_id != actor.id() {
        return Err(ApiError::forbidden());
    }

    let mut application: volunteer_application::ActiveModel = application.into();
    application.resume_url = Set(Some(resume_url));
    application.updated_at = Set(Utc::now().naive_utc());
    Ok(application.update(db).await?)
}

pub async fn stats(db: &DatabaseConnection) -> ApiResult<VolunteerStats> {
    let opportunities: Vec<OpportunityStatus> = volunteer_opportunity::Entity::find()
        .select_only()
        .column(volunteer_opportunity::Column::Status)
        .into_tuple()
        .all(db)
        .await?;
    let applications: Vec<ApplicationStatus> = volunteer_application::Entity::find()
        .select_only()
        .column(volunteer_application::Column::Status)
        .into_tuple()
        .all(db)
        .await?;
    let opp = |s: OpportunityStatus| opportunities.iter().filter(|o| **o == s).count() as u64;
    let app = |s: ApplicationStatus| applications.iter().filter(|a| **a == s).count() as u64;

    Ok(VolunteerStats {
        total_opportunities: opportunities.len() as u64,
        open_opportunities: opp(OpportunityStatus::Open),
        filled_opportunities: opp(OpportunityStatus::Filled),
        total_applications: applications.len() as u64,
        pending_applications: app(ApplicationStatus::Pending),
        approved_applications: app(ApplicationStatus::Approved),
        rejected_applications: app(ApplicationStatus::Rejected),
        completed_applications: app(ApplicationStatus::Completed),
    })
}

/// The orphanage behind an opportunity, for notifying its contact person.
pub async fn host_orphanage(
    db: &DatabaseConnection,
    opportunity: &volunteer_opportunity::Model,
) -> ApiResult<Option<orphanage::Model>> {
    Ok(opportunity.find_related(orphanage::Entity).one(db).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ApplicationStatus::*;

    #[test]
    fn review_transitions() {
        assert!(can_transition(Pending, Approved));
        assert!(can_transition(Pending, Rejected));
        assert!(can_transition(Approved, Completed));
        assert!(can_transition(Approved, Rejected));
    }

    #[test]
    fn completion_requires_approval() {
        assert!(!can_transition(Pending, Completed));
        assert!(!can_transition(Rejected, Approved));
        assert!(!can_transition(Completed, Pending));
    }
}
