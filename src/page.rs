//! Pagination and ordering of reference listings
use super::achievement::TimeStamp;
use super::reference::AchievementReference;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    #[default]
    CreatedAt,
    SubmittedAt,
    VerifiedAt,
    UpdatedAt,
}

impl SortField {
    /// Unknown or missing names fall back to `created_at`
    pub fn parse_or_default(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("submitted_at") => SortField::SubmittedAt,
            Some("verified_at") => SortField::VerifiedAt,
            Some("updated_at") => SortField::UpdatedAt,
            _ => SortField::CreatedAt,
        }
    }

    fn key(&self, reference: &AchievementReference) -> Option<TimeStamp> {
        match self {
            SortField::CreatedAt => Some(reference.created_at),
            SortField::SubmittedAt => reference.submitted_at,
            SortField::VerifiedAt => reference.verified_at,
            SortField::UpdatedAt => Some(reference.updated_at),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn parse_or_default(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("asc") => SortOrder::Asc,
            _ => SortOrder::Desc,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimits {
    pub default_size: u32,
    pub max_size: u32,
}

impl Default for PageLimits {
    fn default() -> Self {
        Self {
            default_size: 10,
            max_size: 100,
        }
    }
}

/// Raw query string parameters. Anything unparsable falls back to defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub sort: Option<String>,
    pub order: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListQuery {
    pub page: u32, // 1-based
    pub limit: u32,
    pub sort: SortField,
    pub order: SortOrder,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self::new(1, PageLimits::default().default_size)
    }
}

impl ListQuery {
    pub fn new(page: u32, limit: u32) -> Self {
        Self {
            page: page.max(1),
            limit: limit.max(1),
            sort: SortField::default(),
            order: SortOrder::default(),
        }
    }

    pub fn sorted_by(mut self, sort: SortField, order: SortOrder) -> Self {
        self.sort = sort;
        self.order = order;
        self
    }

    pub fn resolve(params: &PageParams, limits: PageLimits) -> Self {
        let page = params
            .page
            .as_deref()
            .and_then(|p| p.trim().parse::<i64>().ok())
            .filter(|p| *p >= 1)
            .map_or(1, |p| p.min(u32::MAX as i64) as u32);
        let limit = params
            .limit
            .as_deref()
            .and_then(|l| l.trim().parse::<i64>().ok())
            .filter(|l| *l >= 1)
            .map_or(limits.default_size, |l| {
                l.min(limits.max_size as i64) as u32
            });

        Self::new(page, limit).sorted_by(
            SortField::parse_or_default(params.sort.as_deref()),
            SortOrder::parse_or_default(params.order.as_deref()),
        )
    }

    pub fn offset(&self) -> usize {
        (self.page as usize).saturating_sub(1).saturating_mul(self.limit as usize)
    }

    /// Orders the full result set and cuts out the requested page
    pub fn apply(&self, mut references: Vec<AchievementReference>) -> Page<AchievementReference> {
        references.sort_by(|a, b| {
            let ordering = self.sort.key(a).cmp(&self.sort.key(b));
            let ordering = match self.order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            };
            ordering.then_with(|| a.id.cmp(&b.id))
        });

        let total = references.len() as u64;
        let items = references
            .into_iter()
            .skip(self.offset())
            .take(self.limit as usize)
            .collect();

        Page::new(items, self, total)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    #[serde(rename = "data")]
    pub items: Vec<T>,
    pub pagination: Pagination,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, query: &ListQuery, total: u64) -> Self {
        Self {
            items,
            pagination: Pagination {
                page: query.page,
                limit: query.limit,
                total,
                total_pages: total.div_ceil(query.limit.max(1) as u64),
            },
        }
    }

    pub fn empty(query: &ListQuery) -> Self {
        Self::new(Vec::new(), query, 0)
    }

    /// Replaces the items, keeping the ledger's page metadata
    pub fn with_items<U>(self, items: Vec<U>) -> Page<U> {
        Page {
            items,
            pagination: self.pagination,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(page: &str, limit: &str, sort: &str, order: &str) -> PageParams {
        PageParams {
            page: Some(page.into()),
            limit: Some(limit.into()),
            sort: Some(sort.into()),
            order: Some(order.into()),
        }
    }

    #[test]
    fn defaults_when_params_missing() {
        let query = ListQuery::resolve(&PageParams::default(), PageLimits::default());
        assert_eq!(query, ListQuery::default());
        assert_eq!(query.sort, SortField::CreatedAt);
        assert_eq!(query.order, SortOrder::Desc);
    }

    #[test]
    fn invalid_sort_and_order_fall_back() {
        let query = ListQuery::resolve(
            &params("2", "10", "title; drop table", "sideways"),
            PageLimits::default(),
        );
        assert_eq!(query.sort, SortField::CreatedAt);
        assert_eq!(query.order, SortOrder::Desc);
        assert_eq!(query.offset(), 10);
    }

    #[test]
    fn allow_listed_sort_is_honoured() {
        let query = ListQuery::resolve(&params("1", "5", "verified_at", "ASC"), PageLimits::default());
        assert_eq!(query.sort, SortField::VerifiedAt);
        assert_eq!(query.order, SortOrder::Asc);
    }

    #[test]
    fn limits_are_clamped() {
        let limits = PageLimits {
            default_size: 10,
            max_size: 50,
        };
        assert_eq!(ListQuery::resolve(&params("0", "500", "", ""), limits).limit, 50);
        assert_eq!(ListQuery::resolve(&params("-3", "abc", "", ""), limits).page, 1);
        assert_eq!(ListQuery::resolve(&params("1", "0", "", ""), limits).limit, 10);
    }

    #[test]
    fn hand_built_zero_page_reads_the_first_page() {
        let query = ListQuery {
            page: 0,
            limit: 0,
            ..ListQuery::default()
        };
        assert_eq!(query.offset(), 0);
        let page: Page<u8> = Page::new(vec![], &query, 5);
        assert_eq!(page.pagination.total_pages, 5);
    }

    #[test]
    fn total_pages_rounds_up() {
        let page: Page<u8> = Page::new(vec![], &ListQuery::new(1, 10), 21);
        assert_eq!(page.pagination.total_pages, 3);
        let empty: Page<u8> = Page::empty(&ListQuery::default());
        assert_eq!(empty.pagination.total_pages, 0);
    }
}
