use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;

pub type FieldName = String;

/// Wildcard field name: the value is used as a raw query with no field prefix.
pub const ANY_FIELD: &str = "*";

/// Declared kind of a search field. Parsing a tag never fails; tags outside
/// the known set are kept as `Unrecognized` and translate to no filter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldKind {
    Text,
    ListFacet,
    RangeFacet,
    Range,
    DateRangeFacet,
    PeriodRangeFacet,
    PeriodRange,
    Unrecognized(String),
}

impl FieldKind {
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "text" => FieldKind::Text,
            "list-facet" => FieldKind::ListFacet,
            "range-facet" => FieldKind::RangeFacet,
            "range" => FieldKind::Range,
            "date-range-facet" => FieldKind::DateRangeFacet,
            "period-range-facet" => FieldKind::PeriodRangeFacet,
            "period-range" => FieldKind::PeriodRange,
            other => FieldKind::Unrecognized(other.to_string()),
        }
    }

    pub fn tag(&self) -> &str {
        match self {
            FieldKind::Text => "text",
            FieldKind::ListFacet => "list-facet",
            FieldKind::RangeFacet => "range-facet",
            FieldKind::Range => "range",
            FieldKind::DateRangeFacet => "date-range-facet",
            FieldKind::PeriodRangeFacet => "period-range-facet",
            FieldKind::PeriodRange => "period-range",
            FieldKind::Unrecognized(tag) => tag,
        }
    }
}

impl From<String> for FieldKind {
    fn from(tag: String) -> Self {
        FieldKind::from_tag(&tag)
    }
}

impl From<FieldKind> for String {
    fn from(kind: FieldKind) -> Self {
        kind.tag().to_string()
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A search field as it arrives on the wire. `type` may be absent on free
/// filters; `value` is whatever JSON the caller sent.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SearchFieldInput {
    pub field: FieldName,
    #[serde(default, rename = "type")]
    pub kind: Option<FieldKind>,
    #[serde(default)]
    pub value: JsonValue,
    #[serde(default)]
    pub lower_bound: Option<FieldName>,
    #[serde(default)]
    pub upper_bound: Option<FieldName>,
    #[serde(default)]
    pub facet_sort: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
}

/// A fully-typed search field, ready for translation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchField {
    pub field: FieldName,
    #[serde(rename = "type")]
    pub kind: FieldKind,
    pub value: JsonValue,
    pub lower_bound: Option<FieldName>,
    pub upper_bound: Option<FieldName>,
    pub facet_sort: Option<String>,
}

impl SearchField {
    pub fn new(field: impl Into<FieldName>, kind: FieldKind, value: JsonValue) -> Self {
        Self {
            field: field.into(),
            kind,
            value,
            lower_bound: None,
            upper_bound: None,
            facet_sort: None,
        }
    }

    pub fn with_bounds(mut self, lower: impl Into<FieldName>, upper: impl Into<FieldName>) -> Self {
        self.lower_bound = Some(lower.into());
        self.upper_bound = Some(upper.into());
        self
    }

    pub fn with_facet_sort(mut self, facet_sort: impl Into<String>) -> Self {
        self.facet_sort = Some(facet_sort.into());
        self
    }

    pub(crate) fn from_input(input: SearchFieldInput, default_kind: Option<FieldKind>) -> Self {
        let kind = input
            .kind
            .or(default_kind)
            .unwrap_or_else(|| FieldKind::Unrecognized(String::new()));
        Self {
            field: input.field,
            kind,
            value: input.value,
            lower_bound: input.lower_bound,
            upper_bound: input.upper_bound,
            facet_sort: input.facet_sort,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

/// A sort selector. `value == None` means the key is inactive; `priority`
/// only tracks how many selector slots a UI shows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortField {
    pub field: FieldName,
    #[serde(default)]
    pub value: Option<SortDirection>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub priority: Option<u32>,
}

impl SortField {
    pub fn new(field: impl Into<FieldName>, value: Option<SortDirection>) -> Self {
        Self {
            field: field.into(),
            value,
            label: None,
            priority: None,
        }
    }

    pub fn key(&self) -> Option<SortKey> {
        self.value.map(|direction| SortKey {
            field: self.field.clone(),
            direction,
        })
    }
}

/// One active `field direction` entry of the `sort` parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKey {
    pub field: FieldName,
    pub direction: SortDirection,
}

impl SortKey {
    pub fn new(field: impl Into<FieldName>, direction: SortDirection) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.field, self.direction.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PageStrategy {
    #[default]
    Paginate,
    Cursor,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_field_kind_tags_round_trip_through_lookup() {
        for tag in [
            "text",
            "list-facet",
            "range-facet",
            "range",
            "date-range-facet",
            "period-range-facet",
            "period-range",
        ] {
            let kind = FieldKind::from_tag(tag);
            assert!(!matches!(kind, FieldKind::Unrecognized(_)), "{tag}");
            assert_eq!(kind.tag(), tag);
        }
    }

    #[test]
    fn test_unknown_tag_is_kept() {
        let kind: FieldKind = serde_json::from_value(json!("geo-facet")).unwrap();
        assert_eq!(kind, FieldKind::Unrecognized("geo-facet".into()));
        assert_eq!(serde_json::to_value(&kind).unwrap(), json!("geo-facet"));
    }

    #[test]
    fn test_search_field_input_camel_case() {
        let input: SearchFieldInput = serde_json::from_value(json!({
            "field": "period",
            "type": "period-range-facet",
            "value": [1, 2],
            "lowerBound": "start_i",
            "upperBound": "end_i",
            "facetSort": "count"
        }))
        .unwrap();
        assert_eq!(input.kind, Some(FieldKind::PeriodRangeFacet));
        assert_eq!(input.lower_bound.as_deref(), Some("start_i"));
        assert_eq!(input.upper_bound.as_deref(), Some("end_i"));
        assert_eq!(input.facet_sort.as_deref(), Some("count"));
    }

    #[test]
    fn test_sort_field_null_value_is_inactive() {
        let sort: SortField =
            serde_json::from_value(json!({"field": "title_s", "value": null, "priority": 10}))
                .unwrap();
        assert_eq!(sort.key(), None);
        let sort: SortField =
            serde_json::from_value(json!({"field": "title_s", "value": "desc"})).unwrap();
        assert_eq!(sort.key().unwrap().to_string(), "title_s desc");
    }
}
