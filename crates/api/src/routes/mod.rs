//! HTTP route handlers.

pub mod auth;
pub mod customers;
pub mod dashboard;
pub mod health;
pub mod invoices;
pub mod metrics;
pub mod products;
pub mod sales;

use std::str::FromStr;

use serde::Deserialize;
use store::{ListQuery, PageRequest};

use crate::error::ApiError;

/// Query parameters shared by list endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub search: Option<String>,
    /// Invoices only.
    pub status: Option<String>,
}

impl ListParams {
    /// Builds a list query. Out-of-range paging values are clamped.
    pub fn query(&self) -> ListQuery {
        let to_u32 = |n: i64| n.clamp(0, i64::from(u32::MAX)) as u32;
        let page = PageRequest::from_params(self.page.map(to_u32), self.limit.map(to_u32));
        let query = ListQuery::new().page(page);
        match &self.search {
            Some(search) => query.search(search.as_str()),
            None => query,
        }
    }
}

/// Parses a path identifier, mapping failures to 400.
pub(crate) fn parse_id<T>(raw: &str, entity: &str) -> Result<T, ApiError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse()
        .map_err(|e| ApiError::BadRequest(format!("Invalid {entity} id: {e}")))
}
