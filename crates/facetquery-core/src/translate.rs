//! Per-field filter translation.
//!
//! Each search field becomes at most one filter clause in Lucene query-parser
//! syntax:
//!
//! ```text
//! title_t:budget                         - text
//! budget report                          - text on the "*" field
//! tags_ss:("a" OR "b")                   - list facet
//! year_i:[2001 TO 2005]                  - range / range facet
//! sent_on_dt:[NOW-1YEAR TO NOW]          - date range facet
//! start_i:[5 TO 10] OR end_i:[5 TO 10] OR (start_i:[* TO 5] AND end_i:[10 TO *])
//!                                        - period range
//! path_s:/mail/inbox\ 2019               - path (reserved characters escaped)
//! ```
//!
//! Malformed input never fails: the field is skipped and the reason is
//! returned instead of a clause.

use crate::config::AssemblerConfig;
use crate::model::{FieldKind, FieldName, SearchField, ANY_FIELD};
use crate::util::{encode_component, escape_reserved, scalar_text};
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::fmt;

/// A filter clause in query-parser syntax, not yet URL-encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FilterClause(String);

impl FilterClause {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn raw(&self) -> &str {
        &self.0
    }

    pub fn encoded(&self) -> String {
        encode_component(&self.0)
    }
}

impl fmt::Display for FilterClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The path field surfaces twice: as a facet declaration and as a filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PathFilter {
    pub facet_field: FieldName,
    pub filter: FilterClause,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    EmptyValue,
    TooFewBounds { required: usize, found: usize },
    ShapeMismatch { expected: &'static str },
    MissingBoundField,
    UnrecognizedKind { kind: String },
}

impl SkipReason {
    /// Stable label for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            SkipReason::EmptyValue => "empty_value",
            SkipReason::TooFewBounds { .. } => "too_few_bounds",
            SkipReason::ShapeMismatch { .. } => "shape_mismatch",
            SkipReason::MissingBoundField => "missing_bound_field",
            SkipReason::UnrecognizedKind { .. } => "unrecognized_kind",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::EmptyValue => f.write_str("empty value"),
            SkipReason::TooFewBounds { required, found } => {
                write!(f, "expected {} bounds, found {}", required, found)
            }
            SkipReason::ShapeMismatch { expected } => write!(f, "expected {}", expected),
            SkipReason::MissingBoundField => f.write_str("lowerBound/upperBound not set"),
            SkipReason::UnrecognizedKind { kind } => write!(f, "unrecognized type {:?}", kind),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Translation {
    Filter { filter: FilterClause },
    Path(PathFilter),
    Skipped(SkipReason),
}

impl Translation {
    fn filter(raw: String) -> Self {
        Translation::Filter {
            filter: FilterClause(raw),
        }
    }

    /// The clause this outcome contributes to the `fq` chain, if any.
    pub fn clause(&self) -> Option<&FilterClause> {
        match self {
            Translation::Filter { filter } => Some(filter),
            Translation::Path(path) => Some(&path.filter),
            Translation::Skipped(_) => None,
        }
    }

    pub fn skip_reason(&self) -> Option<&SkipReason> {
        match self {
            Translation::Skipped(reason) => Some(reason),
            _ => None,
        }
    }
}

/// Raw clause text, or why the field produced none.
pub type Outcome = std::result::Result<String, SkipReason>;

/// Translates search fields into filter clauses.
#[derive(Debug, Clone, Default)]
pub struct FilterTranslator {
    config: AssemblerConfig,
}

impl FilterTranslator {
    pub fn new(config: AssemblerConfig) -> Self {
        Self { config }
    }

    pub fn translate(&self, field: &SearchField) -> Translation {
        if field.field == self.config.path_field {
            return match path_filter(field) {
                Ok(raw) => Translation::Path(PathFilter {
                    facet_field: field.field.clone(),
                    filter: FilterClause(raw),
                }),
                Err(reason) => Translation::Skipped(reason),
            };
        }

        let outcome = match &field.kind {
            FieldKind::Text => text_filter(field),
            FieldKind::ListFacet => list_facet_filter(field),
            FieldKind::RangeFacet | FieldKind::Range => range_filter(field),
            FieldKind::DateRangeFacet => date_range_filter(field),
            FieldKind::PeriodRangeFacet | FieldKind::PeriodRange => period_range_filter(field),
            FieldKind::Unrecognized(kind) => Err(SkipReason::UnrecognizedKind { kind: kind.clone() }),
        };
        match outcome {
            Ok(raw) => Translation::filter(raw),
            Err(reason) => Translation::Skipped(reason),
        }
    }
}

/// Translate with the default field names.
pub fn translate(field: &SearchField) -> Translation {
    FilterTranslator::default().translate(field)
}

fn non_empty_scalar(value: &JsonValue) -> Outcome {
    match value {
        JsonValue::Null => Err(SkipReason::EmptyValue),
        JsonValue::String(s) if s.is_empty() => Err(SkipReason::EmptyValue),
        other => scalar_text(other).ok_or(SkipReason::ShapeMismatch { expected: "scalar" }),
    }
}

/// First two elements of a bounds array, rendered as clause text.
fn bounds(value: &JsonValue) -> std::result::Result<(String, String), SkipReason> {
    let items: &[JsonValue] = match value {
        JsonValue::Null => &[],
        JsonValue::Array(items) => items,
        _ => return Err(SkipReason::ShapeMismatch { expected: "array of two bounds" }),
    };
    if items.len() < 2 {
        return Err(SkipReason::TooFewBounds {
            required: 2,
            found: items.len(),
        });
    }
    let bound = |v: &JsonValue| {
        scalar_text(v).ok_or(SkipReason::ShapeMismatch { expected: "scalar bound" })
    };
    Ok((bound(&items[0])?, bound(&items[1])?))
}

pub fn text_filter(field: &SearchField) -> Outcome {
    let value = non_empty_scalar(&field.value)?;
    if field.field == ANY_FIELD {
        Ok(value)
    } else {
        Ok(format!("{}:{}", field.field, value))
    }
}

pub fn list_facet_filter(field: &SearchField) -> Outcome {
    let items: &[JsonValue] = match &field.value {
        JsonValue::Null => &[],
        JsonValue::Array(items) => items,
        _ => return Err(SkipReason::ShapeMismatch { expected: "array of values" }),
    };
    if items.is_empty() {
        return Err(SkipReason::EmptyValue);
    }
    let quoted = items
        .iter()
        .map(|v| {
            scalar_text(v)
                .map(|s| format!("\"{}\"", s))
                .ok_or(SkipReason::ShapeMismatch { expected: "scalar value" })
        })
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(format!("{}:({})", field.field, quoted.join(" OR ")))
}

pub fn range_filter(field: &SearchField) -> Outcome {
    let (lo, hi) = bounds(&field.value)?;
    Ok(format!("{}:[{} TO {}]", field.field, lo, hi))
}

/// Date ranges arrive as one string, e.g. `"NOW-1YEAR NOW"`, split on single
/// spaces.
pub fn date_range_filter(field: &SearchField) -> Outcome {
    let text = match &field.value {
        JsonValue::Null => String::new(),
        JsonValue::Array(_) | JsonValue::Object(_) => {
            return Err(SkipReason::ShapeMismatch { expected: "space-separated range" })
        }
        other => scalar_text(other).unwrap_or_default(),
    };
    let tokens: Vec<&str> = if text.is_empty() {
        Vec::new()
    } else {
        text.split(' ').collect()
    };
    if tokens.len() < 2 {
        return Err(SkipReason::TooFewBounds {
            required: 2,
            found: tokens.len(),
        });
    }
    Ok(format!("{}:[{} TO {}]", field.field, tokens[0], tokens[1]))
}

/// Matches any stored interval overlapping `[lo, hi]`: one that starts in the
/// window, ends in it, or contains it entirely.
pub fn period_range_filter(field: &SearchField) -> Outcome {
    let (lo, hi) = bounds(&field.value)?;
    let (lower, upper) = match (&field.lower_bound, &field.upper_bound) {
        (Some(l), Some(u)) if !l.is_empty() && !u.is_empty() => (l, u),
        _ => return Err(SkipReason::MissingBoundField),
    };
    Ok(format!(
        "{lower}:[{lo} TO {hi}] OR {upper}:[{lo} TO {hi}] OR ({lower}:[* TO {lo}] AND {upper}:[{hi} TO *])"
    ))
}

pub fn path_filter(field: &SearchField) -> Outcome {
    let value = non_empty_scalar(&field.value)?;
    Ok(format!("{}:{}", field.field, escape_reserved(&value)))
}
