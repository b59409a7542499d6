use crate::{InvoiceStatus, PageRequest};

/// Paged, optionally filtered listing of products or customers.
///
/// `search` is a case-insensitive substring match on the record's name.
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    pub page: PageRequest,
    pub search: Option<String>,
}

impl ListQuery {
    /// Creates a query for the first page with default size.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, page: PageRequest) -> Self {
        self.page = page;
        self
    }

    /// Filters by search text. Blank text is treated as no filter.
    pub fn search(mut self, search: impl Into<String>) -> Self {
        let search = search.into();
        let trimmed = search.trim();
        self.search = (!trimmed.is_empty()).then(|| trimmed.to_string());
        self
    }

    /// Returns true if `value` matches the search filter.
    pub fn matches(&self, value: &str) -> bool {
        match &self.search {
            Some(needle) => value.to_lowercase().contains(&needle.to_lowercase()),
            None => true,
        }
    }
}

/// Paged listing of invoices.
///
/// `search` matches the invoice number; `status` is an exact filter.
#[derive(Debug, Clone, Default)]
pub struct InvoiceQuery {
    pub list: ListQuery,
    pub status: Option<InvoiceStatus>,
}

impl InvoiceQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, page: PageRequest) -> Self {
        self.list = self.list.page(page);
        self
    }

    pub fn search(mut self, search: impl Into<String>) -> Self {
        self.list = self.list.search(search);
        self
    }

    pub fn status(mut self, status: InvoiceStatus) -> Self {
        self.status = Some(status);
        self
    }
}
