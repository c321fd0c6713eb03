//! Row queries in the PostgREST query-string dialect: `col=eq.value` filters,
//! `order=col.desc`, `limit=n`. Only equality filters are supported.

use crate::ServiceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "asc" => Some(SortOrder::Asc),
            "desc" => Some(SortOrder::Desc),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableQuery {
    table: String,
    filters: Vec<(String, String)>,
    order: Option<(String, SortOrder)>,
    limit: Option<usize>,
}

impl TableQuery {
    pub fn from(table: &str) -> Self {
        Self {
            table: table.to_string(),
            filters: Vec::new(),
            order: None,
            limit: None,
        }
    }

    pub fn eq(mut self, column: &str, value: impl Into<String>) -> Self {
        self.filters.push((column.to_string(), value.into()));
        self
    }

    pub fn order(mut self, column: &str, order: SortOrder) -> Self {
        self.order = Some((column.to_string(), order));
        self
    }

    pub fn order_desc(self, column: &str) -> Self {
        self.order(column, SortOrder::Desc)
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Equality filters as `(column, value)` pairs, in insertion order.
    pub fn filters(&self) -> &[(String, String)] {
        &self.filters
    }

    pub fn ordering(&self) -> Option<(&str, SortOrder)> {
        self.order.as_ref().map(|(c, o)| (c.as_str(), *o))
    }

    pub fn row_limit(&self) -> Option<usize> {
        self.limit
    }

    /// Encode as query-string pairs. Values are left raw; reqwest does the escaping.
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![("select".to_string(), "*".to_string())];
        for (column, value) in &self.filters {
            pairs.push((column.clone(), format!("eq.{value}")));
        }
        if let Some((column, order)) = &self.order {
            pairs.push(("order".to_string(), format!("{column}.{}", order.as_str())));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit".to_string(), limit.to_string()));
        }
        pairs
    }

    /// Decode what `to_query_pairs` produces. Used on the serving side.
    pub fn from_query_pairs<'a>(
        table: &str,
        pairs: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<Self, ServiceError> {
        let mut query = TableQuery::from(table);
        for (key, value) in pairs {
            match key {
                "select" => {
                    if value != "*" {
                        return Err(ServiceError::InvalidInput(format!(
                            "unsupported select list: {value}"
                        )));
                    }
                }
                "order" => {
                    let (column, dir) = value.rsplit_once('.').unwrap_or((value, "asc"));
                    let order = SortOrder::parse(dir).ok_or_else(|| {
                        ServiceError::InvalidInput(format!("unsupported order direction: {dir}"))
                    })?;
                    query = query.order(column, order);
                }
                "limit" => {
                    let n = value.parse::<usize>().map_err(|_| {
                        ServiceError::InvalidInput(format!("invalid limit: {value}"))
                    })?;
                    query = query.limit(n);
                }
                column => {
                    let operand = value.strip_prefix("eq.").ok_or_else(|| {
                        ServiceError::InvalidInput(format!(
                            "unsupported filter on {column}: {value}"
                        ))
                    })?;
                    query = query.eq(column, operand);
                }
            }
        }
        Ok(query)
    }
}
