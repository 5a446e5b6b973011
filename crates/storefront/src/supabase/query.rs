//! Query-string builder for the REST table API.
//!
//! Filters use the `column=operator.value` convention, e.g. `id=eq.5` or
//! `product_id=in.(1,2,3)`.

use std::fmt::Display;

use url::Url;

/// Select columns, filters, ordering and paging for one table request.
#[derive(Debug, Clone, Default)]
pub struct Query {
    params: Vec<(String, String)>,
}

impl Query {
    /// An empty query (all rows, all columns).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Columns to return, including embedded relations such as `customer_groups(group_name)`.
    #[must_use]
    pub fn select(self, columns: &str) -> Self {
        self.param("select", columns)
    }

    /// Keep rows where `column` equals `value`.
    #[must_use]
    pub fn eq(self, column: &str, value: impl Display) -> Self {
        self.param(column, format!("eq.{value}"))
    }

    /// Keep rows where `column` is SQL `NULL`.
    #[must_use]
    pub fn is_null(self, column: &str) -> Self {
        self.param(column, "is.null")
    }

    /// Keep rows where `column` is one of `values`.
    #[must_use]
    pub fn is_in<I, V>(self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Display,
    {
        let list = values
            .into_iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(",");
        self.param(column, format!("in.({list})"))
    }

    /// Sort by `column`.
    #[must_use]
    pub fn order(self, column: &str, ascending: bool) -> Self {
        let direction = if ascending { "asc" } else { "desc" };
        self.param("order", format!("{column}.{direction}"))
    }

    /// Skip `offset` rows, then return at most `limit`.
    #[must_use]
    pub fn page(self, offset: u32, limit: u32) -> Self {
        self.param("offset", offset.to_string())
            .param("limit", limit.to_string())
    }

    /// Return at most `count` rows.
    #[must_use]
    pub fn limit(self, count: u32) -> Self {
        self.param("limit", count.to_string())
    }

    /// Columns of the unique constraint used to merge upserted rows.
    #[must_use]
    pub fn on_conflict(self, columns: &str) -> Self {
        self.param("on_conflict", columns)
    }

    /// Whether any row filter is present.
    ///
    /// Updates and deletes refuse to run unfiltered.
    #[must_use]
    pub fn has_filter(&self) -> bool {
        self.params.iter().any(|(key, _)| {
            !matches!(
                key.as_str(),
                "select" | "order" | "offset" | "limit" | "on_conflict"
            )
        })
    }

    /// Append the parameters to `url`.
    pub fn apply_to(&self, url: &mut Url) {
        if self.params.is_empty() {
            return;
        }
        let mut pairs = url.query_pairs_mut();
        for (key, value) in &self.params {
            pairs.append_pair(key, value);
        }
    }

    fn param(mut self, key: &str, value: impl Into<String>) -> Self {
        self.params.push((key.to_string(), value.into()));
        self
    }
}
