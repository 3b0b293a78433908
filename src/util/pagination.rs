use sea_orm::{ConnectionTrait, DbErr, PaginatorTrait, SelectorTrait};
use serde::Deserialize;

use crate::response::Pagination;

pub const DEFAULT_LIMIT: u64 = 10;
pub const MAX_LIMIT: u64 = 100;
/// Highest page whose OFFSET still fits a signed 64-bit bind at `MAX_LIMIT`.
pub const MAX_PAGE: u64 = i64::MAX as u64 / MAX_LIMIT;

/// `page` / `limit` query parameters shared by every list endpoint.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

impl PageParams {
    pub fn page(&self) -> u64 {
        self.page.filter(|p| *p > 0).unwrap_or(1).min(MAX_PAGE)
    }

    pub fn limit(&self) -> u64 {
        self.limit
            .filter(|l| *l > 0)
            .unwrap_or(DEFAULT_LIMIT)
            .min(MAX_LIMIT)
    }
}

pub async fn fetch_page<'db, C, S>(
    db: &'db C,
    select: S,
    params: PageParams,
) -> Result<(Vec<<S::Selector as SelectorTrait>::Item>, Pagination), DbErr>
where
    C: ConnectionTrait,
    S: PaginatorTrait<'db, C>,
{
    let page = params.page();
    let limit = params.limit();
    let paginator = select.paginate(db, limit);
    let total = paginator.num_items().await?;
    let items = paginator.fetch_page(page - 1).await?;

    Ok((items, Pagination::new(total, page, limit)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_and_caps() {
        let params = PageParams::default();
        assert_eq!(params.page(), 1);
        assert_eq!(params.limit(), DEFAULT_LIMIT);

        let params = PageParams {
            page: Some(0),
            limit: Some(500),
        };
        assert_eq!(params.page(), 1);
        assert_eq!(params.limit(), MAX_LIMIT);
    }

    #[test]
    fn huge_pages_are_clamped() {
        let params = PageParams {
            page: Some(u64::MAX),
            limit: Some(MAX_LIMIT),
        };
        assert_eq!(params.page(), MAX_PAGE);
        let offset = (params.page() - 1).checked_mul(params.limit());
        assert!(offset.is_some_and(|o| o <= i64::MAX as u64));
    }
}
