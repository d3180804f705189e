//! Search and ordering helpers for list endpoints.
//!
//! `?search=` is split into terms on whitespace and commas; every term must
//! match at least one searchable column (case-insensitive substring).
//! `?ordering=` is a comma separated list of fields, `-` prefixed for
//! descending; fields outside the allowed set are ignored.

use sqlx::{Postgres, QueryBuilder};

/// One resolved `ORDER BY` item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderBy {
    pub column: &'static str,
    pub descending: bool,
}

impl OrderBy {
    pub const fn asc(column: &'static str) -> Self {
        Self {
            column,
            descending: false,
        }
    }

    pub const fn desc(column: &'static str) -> Self {
        Self {
            column,
            descending: true,
        }
    }
}

/// Split a search string into terms
pub fn search_terms(raw: Option<&str>) -> Vec<String> {
    raw.map(|s| {
        s.split(|c: char| c.is_whitespace() || c == ',')
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

/// Resolve `?ordering=` against `(public field, column)` pairs
pub fn parse_ordering(raw: Option<&str>, allowed: &[(&str, &'static str)]) -> Vec<OrderBy> {
    let Some(raw) = raw else { return Vec::new() };

    raw.split(',')
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .filter_map(|field| {
            let (descending, name) = match field.strip_prefix('-') {
                Some(name) => (true, name),
                None => (false, field),
            };
            allowed
                .iter()
                .find(|(public, _)| *public == name)
                .map(|&(_, column)| OrderBy { column, descending })
        })
        .collect()
}

/// Escape LIKE wildcards so terms match literally
pub fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// Append `AND (col1 ILIKE t OR col2 ILIKE t)` for each term
pub fn push_search(builder: &mut QueryBuilder<'_, Postgres>, terms: &[String], columns: &[&str]) {
    if columns.is_empty() {
        return;
    }
    for term in terms {
        let pattern = like_pattern(term);
        builder.push(" AND (");
        for (i, column) in columns.iter().enumerate() {
            if i > 0 {
                builder.push(" OR ");
            }
            builder.push(*column);
            builder.push(" ILIKE ");
            builder.push_bind(pattern.clone());
        }
        builder.push(")");
    }
}

/// Append `ORDER BY`, falling back to `default` when nothing was requested.
/// The id is always the last key so results are stable.
pub fn push_order_by(builder: &mut QueryBuilder<'_, Postgres>, ordering: &[OrderBy], default: OrderBy, id_column: &str) {
    let items: Vec<OrderBy> = if ordering.is_empty() {
        vec![default]
    } else {
        ordering.to_vec()
    };

    builder.push(" ORDER BY ");
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            builder.push(", ");
        }
        builder.push(item.column);
        builder.push(if item.descending { " DESC" } else { " ASC" });
    }
    builder.push(", ");
    builder.push(id_column);
}
