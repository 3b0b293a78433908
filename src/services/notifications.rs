//! In-app notification inbox. Rows are written by [`crate::notify::Notifier`];
//! this module only reads and updates the caller's own rows.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set, sea_query::Expr,
};
use serde::Deserialize;

use crate::{
    auth::CurrentUser,
    entities::{notification, sea_orm_active_enums::NotificationKind},
    error::{ApiError, ApiResult},
    response::Pagination,
    util::pagination::{PageParams, fetch_page},
};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationFilter {
    pub is_read: Option<bool>,
    #[serde(rename = "type")]
    pub kind: Option<NotificationKind>,
}

pub struct Inbox {
    pub notifications: Vec<notification::Model>,
    pub pagination: Pagination,
    pub unread_count: u64,
}

pub async fn list(
    db: &DatabaseConnection,
    actor: &CurrentUser,
    filter: NotificationFilter,
    page: PageParams,
) -> ApiResult<Inbox> {
    let mut query = notification::Entity::find().filter(notification::Column::UserId.eq(actor.id()));
    if let Some(is_read) = filter.is_read {
        query = query.filter(notification::Column::IsRead.eq(is_read));
    }
    if let Some(kind) = filter.kind {
        query = query.filter(notification::Column::NotificationType.eq(kind));
    }
    let query = query
        .order_by_desc(notification::Column::CreatedAt)
        .order_by_desc(notification::Column::Id);

    let (notifications, pagination) = fetch_page(db, query, page).await?;
    let unread_count = unread_count(db, actor.id()).await?;

    Ok(Inbox {
        notifications,
        pagination,
        unread_count,
    })
}

pub async fn unread_count(db: &DatabaseConnection, user_id: i32) -> ApiResult<u64> {
    Ok(notification::Entity::find()
        .filter(notification::Column::UserId.eq(user_id))
        .filter(notification::Column::IsRead.eq(false))
        .count(db)
        .await?)
}

async fn find_owned(
    db: &DatabaseConnection,
    actor: &CurrentUser,
    notification_id: i32,
) -> ApiResult<notification::Model> {
    let row = notification::Entity::find_by_id(notification_id)
        .one(db)
        .await?
        .ok_or_else(|| ApiError::not_found("Notification"))?;
    if row.user_id != actor.id() {
        return Err(ApiError::forbidden());
    }
    Ok(row)
}

pub async fn mark_read(
    db: &DatabaseConnection,
    actor: &CurrentUser,
    notification_id: i32,
) -> ApiResult<notification::Model> {
    let row = find_owned(db, actor, notification_id).await?;
    if row.is_read {
        return Ok(row);
    }
    let mut row: notification::ActiveModel = row.into();
    row.is_read = Set(true);
    row.updated_at = Set(Utc::now().naive_utc());
    Ok(row.update(db).await?)
}

/// Returns how many notifications flipped to read.
pub async fn mark_all_read(db: &DatabaseConnection, actor: &CurrentUser) -> ApiResult<u64> {
    let result = notification::Entity::update_many()
        .col_expr(notification::Column::IsRead, Expr::value(true))
        .col_expr(
            notification::Column::UpdatedAt,
            Expr::value(Utc::now().naive_utc()),
        )
        .filter(notification::Column::UserId.eq(actor.id()))
        .filter(notification::Column::IsRead.eq(false))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

pub async fn delete(
    db: &DatabaseConnection,
    actor: &CurrentUser,
    notification_id: i32,
) -> ApiResult<()> {
    find_owned(db, actor, notification_id)
        .await?
        .delete(db)
        .await?;
    Ok(())
}
