use super::types::{FilterOrderInfo, QueryParams, SortDirection};

pub const ORDER_KEY: &str = "filter:order";
pub const SORT_KEY: &str = "filter:sort";
pub const LIMIT_KEY: &str = "filter:limit";

/// Ordering and limit requested through the query string
#[derive(Debug, Clone, PartialEq)]
pub struct QueryModifiers {
    pub order: Vec<FilterOrderInfo>,
    pub limit: Option<i64>,
}

pub struct FilterOrder;

impl FilterOrder {
    /// `filter:order=latest` sorts by newest first, an orderable column sorts by that column
    /// (ascending unless `filter:sort=desc`), anything else falls back to `id ASC`.
    pub fn modifiers(params: &QueryParams, orderable: &[&str], max_limit: Option<i64>) -> QueryModifiers {
        let sort = match params.get(SORT_KEY).map(|s| s.trim().to_ascii_lowercase()) {
            Some(dir) if dir == "desc" => SortDirection::Desc,
            _ => SortDirection::Asc,
        };

        let order = match params.get(ORDER_KEY).map(|s| s.trim()) {
            Some("latest") => FilterOrderInfo {
                column: "created_at".to_string(),
                sort: SortDirection::Desc,
            },
            Some(column) if orderable.contains(&column) => FilterOrderInfo {
                column: column.to_string(),
                sort,
            },
            _ => FilterOrderInfo {
                column: "id".to_string(),
                sort: SortDirection::Asc,
            },
        };

        let limit = params
            .get(LIMIT_KEY)
            .and_then(|s| s.trim().parse::<i64>().ok())
            .filter(|limit| *limit > 0)
            .map(|limit| match max_limit {
                Some(max) => limit.min(max),
                None => limit,
            });

        QueryModifiers {
            order: vec![order],
            limit,
        }
    }
}
