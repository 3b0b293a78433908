use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// JSON envelope returned by every endpoint.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unread_count: Option<u64>,
    #[serde(skip)]
    status: Option<StatusCode>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
}

impl Pagination {
    pub fn new(total: u64, page: u64, limit: u64) -> Self {
        let total_pages = if limit == 0 { 0 } else { total.div_ceil(limit) };
        Self {
            total,
            page,
            limit,
            total_pages,
        }
    }
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            pagination: None,
            unread_count: None,
            status: None,
        }
    }

    pub fn created(data: T) -> Self {
        Self {
            status: Some(StatusCode::CREATED),
            ..Self::ok(data)
        }
    }

    pub fn paged(data: T, pagination: Pagination) -> Self {
        Self {
            pagination: Some(pagination),
            ..Self::ok(data)
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_unread_count(mut self, count: u64) -> Self {
        self.unread_count = Some(count);
        self
    }
}

impl ApiResponse<()> {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: None,
            message: Some(message.into()),
            pagination: None,
            unread_count: None,
            status: None,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = self.status.unwrap_or(StatusCode::OK);
        (status, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_pages_rounds_up() {
        assert_eq!(Pagination::new(21, 1, 10).total_pages, 3);
        assert_eq!(Pagination::new(20, 2, 10).total_pages, 2);
        assert_eq!(Pagination::new(0, 1, 10).total_pages, 0);
    }

    #[test]
    fn envelope_omits_empty_fields() {
        let value = serde_json::to_value(ApiResponse::ok(5)).unwrap();
        assert_eq!(value, serde_json::json!({ "success": true, "data": 5 }));

        let value = serde_json::to_value(ApiResponse::paged(
            Vec::<i32>::new(),
            Pagination::new(11, 2, 5),
        ))
        .unwrap();
        assert_eq!(value["pagination"]["totalPages"], 3);
    }
}
