use axum::{
    Router,
    extract::{Path, Query, State},
    routing::{delete, get, put},
};

use crate::{
    auth::CurrentUser,
    entities::notification,
    error::ApiResult,
    response::ApiResponse,
    router::AppState,
    services::notifications::{self, NotificationFilter},
    util::pagination::PageParams,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(self::get::list))
        .route("/read-all", put(self::put::read_all))
        .route("/{id}/read", put(self::put::read))
        .route("/{id}", delete(self::delete::remove))
}

mod get {
    use super::*;

    pub async fn list(
        State(state): State<AppState>,
        user: CurrentUser,
        Query(page): Query<PageParams>,
        Query(filter): Query<NotificationFilter>,
    ) -> ApiResult<ApiResponse<Vec<notification::Model>>> {
        let inbox = notifications::list(&state.db, &user, filter, page).await?;
        Ok(ApiResponse::paged(inbox.notifications, inbox.pagination)
            .with_unread_count(inbox.unread_count))
    }
}

mod put {
    use super::*;

    pub async fn read(
        State(state): State<AppState>,
        user: CurrentUser,
        Path(id): Path<i32>,
    ) -> ApiResult<ApiResponse<notification::Model>> {
        Ok(ApiResponse::ok(
            notifications::mark_read(&state.db, &user, id).await?,
        ))
    }

    pub async fn read_all(
        State(state): State<AppState>,
        user: CurrentUser,
    ) -> ApiResult<ApiResponse<()>> {
        let updated = notifications::mark_all_read(&state.db, &user).await?;
        Ok(ApiResponse::message(format!(
            "{updated} notifications marked as read"
        )))
    }
}

mod delete {
    use super::*;

    pub async fn remove(
        State(state): State<AppState>,
        user: CurrentUser,
        Path(id): Path<i32>,
    ) -> ApiResult<ApiResponse<()>> {
        notifications::delete(&state.db, &user, id).await?;
        Ok(ApiResponse::message("Notification deleted"))
    }
}
