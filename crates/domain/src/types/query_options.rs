//! OData system query options

use serde::{Deserialize, Serialize};

use crate::constants::{
    QUERY_EXPAND, QUERY_FILTER, QUERY_ORDER_BY, QUERY_SELECT, QUERY_SKIP, QUERY_TOP,
};

/// System query options attached to a read.
///
/// Expressions are opaque server-side grammar and are not validated;
/// each setter is last-write-wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryOptions {
    pub filter: Option<String>,
    pub order_by: Option<String>,
    pub skip: Option<u64>,
    pub top: Option<u64>,
    pub select: Vec<String>,
    pub expand: Vec<String>,
}

impl QueryOptions {
    pub fn is_empty(&self) -> bool {
        self.filter.is_none()
            && self.order_by.is_none()
            && self.skip.is_none()
            && self.top.is_none()
            && self.select.is_empty()
            && self.expand.is_empty()
    }

    /// Render as `$filter=..&$orderby=..`, omitting empty options.
    pub fn to_query_string(&self) -> String {
        let mut parts = Vec::new();
        if let Some(filter) = &self.filter {
            parts.push(format!("{QUERY_FILTER}={}", urlencoding::encode(filter)));
        }
        if let Some(order_by) = &self.order_by {
            parts.push(format!("{QUERY_ORDER_BY}={}", urlencoding::encode(order_by)));
        }
        if let Some(skip) = self.skip {
            parts.push(format!("{QUERY_SKIP}={skip}"));
        }
        if let Some(top) = self.top {
            parts.push(format!("{QUERY_TOP}={top}"));
        }
        if !self.select.is_empty() {
            parts.push(format!("{QUERY_SELECT}={}", urlencoding::encode(&self.select.join(","))));
        }
        if !self.expand.is_empty() {
            parts.push(format!("{QUERY_EXPAND}={}", urlencoding::encode(&self.expand.join(","))));
        }
        parts.join("&")
    }

    /// Append the rendered options to `url`, respecting an existing query.
    pub fn apply_to(&self, url: &str) -> String {
        let query = self.to_query_string();
        if query.is_empty() {
            return url.to_string();
        }
        let separator = if url.contains('?') { '&' } else { '?' };
        format!("{url}{separator}{query}")
    }

    /// Merge select/expand lists, skipping names already present.
    pub fn include(&mut self, select: &[String], expand: &[String]) {
        for name in select {
            if !self.select.contains(name) {
                self.select.push(name.clone());
            }
        }
        for name in expand {
            if !self.expand.contains(name) {
                self.expand.push(name.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_options_render_nothing() {
        let options = QueryOptions::default();
        assert!(options.is_empty());
        assert_eq!(options.apply_to("https://host/users"), "https://host/users");
    }

    #[test]
    fn options_render_in_protocol_order() {
        let options = QueryOptions {
            filter: Some("Id eq 1".into()),
            order_by: Some("name desc".into()),
            skip: Some(10),
            top: Some(5),
            select: vec!["id".into(), "name".into()],
            expand: vec!["manager".into()],
        };
        assert_eq!(
            options.to_query_string(),
            "$filter=Id%20eq%201&$orderby=name%20desc&$skip=10&$top=5&$select=id%2Cname&$expand=manager"
        );
    }

    #[test]
    fn apply_respects_existing_query() {
        let options = QueryOptions { top: Some(2), ..Default::default() };
        assert_eq!(options.apply_to("https://host/users?x=1"), "https://host/users?x=1&$top=2");
    }

    #[test]
    fn include_deduplicates() {
        let mut options = QueryOptions { select: vec!["id".into()], ..Default::default() };
        options.include(&["id".into(), "mail".into()], &["manager".into()]);
        assert_eq!(options.select, vec!["id", "mail"]);
        assert_eq!(options.expand, vec!["manager"]);
    }
}
