use crate::errors::{QueryError, Result};
use crate::model::{FieldKind, FieldName, PageStrategy, SearchField, SearchFieldInput, SortField};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Output-format directives appended verbatim to the query, e.g. `wt=json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputFormat(pub BTreeMap<String, String>);

impl Default for OutputFormat {
    fn default() -> Self {
        Self::json()
    }
}

impl OutputFormat {
    pub fn json() -> Self {
        Self::from_pairs([("wt", "json")])
    }

    pub fn empty() -> Self {
        Self(BTreeMap::new())
    }

    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self(pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Request body as sent by a client.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct QuerySpecInput {
    #[serde(default)]
    pub search_fields: Vec<SearchFieldInput>,
    #[serde(default)]
    pub filters: Vec<SearchFieldInput>,
    #[serde(default)]
    pub sort_fields: Vec<SortField>,
    pub rows: u64,
    #[serde(default)]
    pub start: Option<u64>,
    #[serde(default)]
    pub facet_limit: Option<i64>,
    #[serde(default)]
    pub facet_sort: Option<String>,
    #[serde(default)]
    pub page_strategy: PageStrategy,
    #[serde(default)]
    pub cursor_mark: Option<String>,
    #[serde(default)]
    pub id_field: Option<FieldName>,
}

/// A validated request. Every field carries a kind; cursor paging always
/// has a tiebreak field.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuerySpec {
    pub search_fields: Vec<SearchField>,
    pub filters: Vec<SearchField>,
    pub sort_fields: Vec<SortField>,
    pub rows: u64,
    pub start: Option<u64>,
    pub facet_limit: Option<i64>,
    pub facet_sort: Option<String>,
    pub paging: Paging,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "pageStrategy", rename_all = "lowercase")]
pub enum Paging {
    Paginate,
    #[serde(rename_all = "camelCase")]
    Cursor {
        cursor_mark: Option<String>,
        id_field: FieldName,
    },
}

impl Paging {
    pub fn cursor(id_field: impl Into<FieldName>, cursor_mark: Option<String>) -> Self {
        Paging::Cursor {
            cursor_mark,
            id_field: id_field.into(),
        }
    }
}

impl QuerySpec {
    pub fn new(rows: u64) -> Self {
        Self {
            search_fields: Vec::new(),
            filters: Vec::new(),
            sort_fields: Vec::new(),
            rows,
            start: None,
            facet_limit: None,
            facet_sort: None,
            paging: Paging::Paginate,
        }
    }

    pub fn from_json(data: &str) -> Result<Self> {
        let input: QuerySpecInput =
            serde_json::from_str(data).map_err(|e| QueryError::Invalid(e.to_string()))?;
        Self::try_from(input)
    }

    /// Search fields followed by free filters, in declaration order.
    pub fn all_fields(&self) -> impl Iterator<Item = &SearchField> {
        self.search_fields.iter().chain(self.filters.iter())
    }
}

impl TryFrom<QuerySpecInput> for QuerySpec {
    type Error = QueryError;

    fn try_from(input: QuerySpecInput) -> Result<Self> {
        let paging = match input.page_strategy {
            PageStrategy::Paginate => Paging::Paginate,
            PageStrategy::Cursor => match input.id_field {
                Some(id_field) if !id_field.trim().is_empty() => Paging::Cursor {
                    cursor_mark: input.cursor_mark,
                    id_field,
                },
                Some(_) => return Err(QueryError::Invalid("idField must not be empty".into())),
                None => return Err(QueryError::MissingIdField),
            },
        };

        let search_fields = input
            .search_fields
            .into_iter()
            .map(|f| SearchField::from_input(f, None))
            .collect();
        // Untyped free filters are plain text filters.
        let filters = input
            .filters
            .into_iter()
            .map(|f| SearchField::from_input(f, Some(FieldKind::Text)))
            .collect();

        Ok(Self {
            search_fields,
            filters,
            sort_fields: input.sort_fields,
            rows: input.rows,
            start: input.start,
            facet_limit: input.facet_limit,
            facet_sort: input.facet_sort,
            paging,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> Result<QuerySpec> {
        let input: QuerySpecInput = serde_json::from_value(value).unwrap();
        QuerySpec::try_from(input)
    }

    #[test]
    fn test_untyped_filter_defaults_to_text() {
        let spec = parse(json!({
            "rows": 10,
            "filters": [{"field": "author_s", "value": "ann"}]
        }))
        .unwrap();
        assert_eq!(spec.filters[0].kind, FieldKind::Text);
    }

    #[test]
    fn test_typed_filter_keeps_its_kind() {
        let spec = parse(json!({
            "rows": 10,
            "filters": [{"field": "year_i", "type": "range", "value": [1, 2]}]
        }))
        .unwrap();
        assert_eq!(spec.filters[0].kind, FieldKind::Range);
    }

    #[test]
    fn test_untyped_search_field_is_unrecognized() {
        let spec = parse(json!({
            "rows": 10,
            "searchFields": [{"field": "author_s", "value": "ann"}]
        }))
        .unwrap();
        assert!(matches!(spec.search_fields[0].kind, FieldKind::Unrecognized(_)));
    }

    #[test]
    fn test_cursor_without_id_field_is_rejected() {
        let err = parse(json!({"rows": 10, "pageStrategy": "cursor"})).unwrap_err();
        assert_eq!(err, QueryError::MissingIdField);
        let err = parse(json!({"rows": 10, "pageStrategy": "cursor", "idField": ""})).unwrap_err();
        assert!(matches!(err, QueryError::Invalid(_)));
    }

    #[test]
    fn test_cursor_with_id_field() {
        let spec = parse(json!({
            "rows": 10,
            "pageStrategy": "cursor",
            "idField": "id",
            "cursorMark": "AoE"
        }))
        .unwrap();
        assert_eq!(spec.paging, Paging::cursor("id", Some("AoE".into())));
    }

    #[test]
    fn test_start_null_and_absent_are_none() {
        assert_eq!(parse(json!({"rows": 1, "start": null})).unwrap().start, None);
        assert_eq!(parse(json!({"rows": 1})).unwrap().start, None);
        assert_eq!(parse(json!({"rows": 1, "start": 40})).unwrap().start, Some(40));
    }

    #[test]
    fn test_from_json_reports_invalid_body() {
        let err = QuerySpec::from_json(r#"{"searchFields": []}"#).unwrap_err();
        assert!(matches!(err, QueryError::Invalid(_)));
    }
}
