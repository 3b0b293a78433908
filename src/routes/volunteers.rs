use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{delete, get, post, put},
};
use sea_orm::ActiveEnum;
use serde::Deserialize;

use super::{StatusChange, recipient};
use crate::{
    auth::{
        CurrentUser,
        policy::{
            self, APPLICATION_REVIEW, OPPORTUNITY_APPLY, OPPORTUNITY_WRITE, VOLUNTEER_STATS,
        },
    },
    entities::{
        sea_orm_active_enums::{ApplicationStatus, NotificationKind},
        volunteer_application, volunteer_opportunity,
    },
    error::ApiResult,
    response::ApiResponse,
    router::AppState,
    services::volunteers::{
        self, Application, ApplicationView, NewOpportunity, OpportunityFilter,
        OpportunityUpdate, OpportunityView, VolunteerStats,
    },
    util::pagination::PageParams,
};

#[derive(Debug, Deserialize)]
pub struct Resume {
    resume_url: String,
}

pub fn routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/opportunities",
            get(self::get::opportunities).merge(policy::restrict(
                post(self::post::create_opportunity),
                state,
                OPPORTUNITY_WRITE,
            )),
        )
        .route(
            "/opportunities/{id}",
            get(self::get::opportunity)
                .merge(policy::restrict(
                    put(self::put::update_opportunity),
                    state,
                    OPPORTUNITY_WRITE,
                ))
                .merge(policy::restrict(
                    delete(self::delete::remove_opportunity),
                    state,
                    OPPORTUNITY_WRITE,
                )),
        )
        .route(
            "/opportunities/{id}/apply",
            policy::restrict(post(self::post::apply), state, OPPORTUNITY_APPLY),
        )
        .route(
            "/opportunities/{id}/applications",
            policy::restrict(get(self::get::applications), state, APPLICATION_REVIEW),
        )
        .route(
            "/applications/{id}/status",
            policy::restrict(put(self::put::application_status), state, APPLICATION_REVIEW),
        )
        .route("/applications/{id}/resume", put(self::put::resume))
        .route(
            "/stats",
            policy::restrict(get(self::get::stats), state, VOLUNTEER_STATS),
        )
}

mod get {
    use super::*;

    pub async fn opportunities(
        State(state): State<AppState>,
        Query(page): Query<PageParams>,
        Query(filter): Query<OpportunityFilter>,
    ) -> ApiResult<ApiResponse<Vec<OpportunityView>>> {
        let (opportunities, pagination) =
            volunteers::list_opportunities(&state.db, filter, page).await?;
        Ok(ApiResponse::paged(opportunities, pagination))
    }

    pub async fn opportunity(
        State(state): State<AppState>,
        Path(id): Path<i32>,
    ) -> ApiResult<ApiResponse<OpportunityView>> {
        Ok(ApiResponse::ok(volunteers::get_opportunity(&state.db, id).await?))
    }

    pub async fn applications(
        State(state): State<AppState>,
        user: CurrentUser,
        Path(id): Path<i32>,
        Query(page): Query<PageParams>,
    ) -> ApiResult<ApiResponse<Vec<ApplicationView>>> {
        let (applications, pagination) =
            volunteers::list_applications(&state.db, &user, id, page).await?;
        Ok(ApiResponse::paged(applications, pagination))
    }

    pub async fn stats(State(state): State<AppState>) -> ApiResult<ApiResponse<VolunteerStats>> {
        Ok(ApiResponse::ok(volunteers::stats(&state.db).await?))
    }
}

mod post {
    use super::*;

    pub async fn create_opportunity(
        State(state): State<AppState>,
        user: CurrentUser,
        Json(input): Json<NewOpportunity>,
    ) -> ApiResult<ApiResponse<volunteer_opportunity::Model>> {
        let opportunity = volunteers::create_opportunity(&state.db, &user, input).await?;
        Ok(ApiResponse::created(opportunity))
    }

    pub async fn apply(
        State(state): State<AppState>,
        user: CurrentUser,
        Path(id): Path<i32>,
        body: Option<Json<Application>>,
    ) -> ApiResult<ApiResponse<volunteer_application::Model>> {
        let input = body.map(|Json(input)| input).unwrap_or_default();
        let (application, opportunity) = volunteers::apply(&state.db, &user, id, input).await?;

        let host = volunteers::host_orphanage(&state.db, &opportunity).await?;
        if let Some(contact_id) = host.and_then(|o| o.contact_person_id) {
            state
                .notifier
                .notify(
                    &state.db,
                    contact_id,
                    NotificationKind::Volunteer,
                    "New volunteer application",
                    &format!(
                        "{} applied for \"{}\"",
                        user.0.full_name(),
                        opportunity.title
                    ),
                    Some(application.id),
                )
                .await;
        }

        Ok(ApiResponse::created(application))
    }
}

mod put {
    use super::*;

    pub async fn update_opportunity(
        State(state): State<AppState>,
        user: CurrentUser,
        Path(id): Path<i32>,
        Json(input): Json<OpportunityUpdate>,
    ) -> ApiResult<ApiResponse<volunteer_opportunity::Model>> {
        let opportunity = volunteers::update_opportunity(&state.db, &user, id, input).await?;
        Ok(ApiResponse::ok(opportunity))
    }

    pub async fn application_status(
        State(state): State<AppState>,
        user: CurrentUser,
        Path(id): Path<i32>,
        Json(StatusChange { status }): Json<StatusChange<ApplicationStatus>>,
    ) -> ApiResult<ApiResponse<volunteer_application::Model>> {
        let review = volunteers::set_application_status(&state.db, &user, id, status).await?;

        if review.changed {
            let application = &review.application;
            let status = application.status.to_value();
            state
                .notifier
                .notify(
                    &state.db,
                    application.volunteer_id,
                    NotificationKind::Volunteer,
                    "Application status updated",
                    &format!(
                        "Your application for \"{}\" is {}",
                        review.opportunity.title, status
                    ),
                    Some(application.id),
                )
                .await;
            if let Some(volunteer) = recipient(&state.db, application.volunteer_id).await {
                state.notifier.email(
                    volunteer.email,
                    "Application status updated",
                    "application_status.html",
                    minijinja::context! {
                        name => volunteer.first_name,
                        opportunity_title => review.opportunity.title.clone(),
                        status => status,
                    },
                );
            }
        }

        Ok(ApiResponse::ok(review.application))
    }

    pub async fn resume(
        State(state): State<AppState>,
        user: CurrentUser,
        Path(id): Path<i32>,
        Json(Resume { resume_url }): Json<Resume>,
    ) -> ApiResult<ApiResponse<volunteer_application::Model>> {
        let application = volunteers::attach_resume(&state.db, &user, id, resume_url).await?;
        Ok(ApiResponse::ok(application).with_message("Resume attached"))
    }
}

mod delete {
    use super::*;

    pub async fn remove_opportunity(
        State(state): State<AppState>,
        user: CurrentUser,
        Path(id): Path<i32>,
    ) -> ApiResult<ApiResponse<()>> {
        volunteers::delete_opportunity(&state.db, &user, id).await?;
        Ok(ApiResponse::message("Volunteer opportunity deleted"))
    }
}
