//! Assembles a full request query string from a [`QuerySpec`].
//!
//! Parameter order in the output:
//!
//! ```text
//! q  fq...  sort  facet.field...  f.<field>.facet.sort...
//! rows  start  cursorMark  facet.limit  facet.sort  facet=on  <format pairs>
//! ```

use crate::config::AssemblerConfig;
use crate::model::{FieldKind, FieldName, SearchField, SortDirection, SortField, SortKey};
use crate::query::{OutputFormat, Paging, QuerySpec};
use crate::translate::{FilterClause, FilterTranslator, Translation};
use crate::util::encode_component;
use serde::Serialize;
use std::fmt;

/// Facet limit meaning "no limit".
pub const UNBOUNDED_FACET_LIMIT: i64 = -1;
pub const DEFAULT_FACET_SORT: &str = "index";
/// Cursor mark of the first page.
pub const INITIAL_CURSOR_MARK: &str = "*";

/// Ordered `key=value` pairs; values are stored percent-encoded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams(Vec<(String, String)>);

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a pair, percent-encoding the value.
    pub fn push(&mut self, key: impl Into<String>, value: &str) {
        self.0.push((key.into(), encode_component(value)));
    }

    pub fn push_encoded(&mut self, key: impl Into<String>, encoded: String) {
        self.0.push((key.into(), encoded));
    }

    /// First encoded value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    pub fn get_all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.0
            .iter()
            .filter(move |(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for QueryParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (key, value)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("&")?;
            }
            write!(f, "{}={}", key, value)?;
        }
        Ok(())
    }
}

/// Translation outcome of one field, tagged with the field it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldTranslation {
    pub field: FieldName,
    #[serde(rename = "type")]
    pub kind: FieldKind,
    #[serde(flatten)]
    pub translation: Translation,
}

#[derive(Debug, Clone, Default)]
pub struct QueryAssembler {
    config: AssemblerConfig,
    translator: FilterTranslator,
}

impl QueryAssembler {
    pub fn new(config: AssemblerConfig) -> Self {
        let translator = FilterTranslator::new(config.clone());
        Self { config, translator }
    }

    pub fn config(&self) -> &AssemblerConfig {
        &self.config
    }

    /// Translate search fields then free filters, logging every skipped field.
    pub fn explain(&self, spec: &QuerySpec) -> Vec<FieldTranslation> {
        spec.all_fields()
            .map(|field| {
                let translation = self.translator.translate(field);
                if let Some(reason) = translation.skip_reason() {
                    tracing::debug!(field = %field.field, kind = %field.kind, %reason, "filter skipped");
                }
                FieldTranslation {
                    field: field.field.clone(),
                    kind: field.kind.clone(),
                    translation,
                }
            })
            .collect()
    }

    /// Clauses for the `fq` chain, in field order. Skipped fields contribute nothing.
    pub fn build_filters<'a>(&self, translations: &'a [FieldTranslation]) -> Vec<&'a FilterClause> {
        translations
            .iter()
            .filter_map(|t| t.translation.clause())
            .collect()
    }

    /// Active sort keys, last-declared first, followed by the default sort
    /// and, for cursor paging, the ascending id tiebreak.
    pub fn build_sort(&self, sort_fields: &[SortField], paging: &Paging) -> Vec<SortKey> {
        let mut keys: Vec<SortKey> = sort_fields.iter().rev().filter_map(SortField::key).collect();
        let fallback = &self.config.default_sort;
        if !keys.iter().any(|k| k.field == fallback.field) {
            keys.push(fallback.clone());
        }
        if let Paging::Cursor { id_field, .. } = paging {
            keys.push(SortKey::new(id_field.clone(), SortDirection::Asc));
        }
        keys
    }

    /// Fields to facet on, de-duplicated in first-seen order. Path outcomes
    /// add the path field after the declared facets.
    pub fn facet_fields(
        &self,
        search_fields: &[SearchField],
        translations: &[FieldTranslation],
    ) -> Vec<FieldName> {
        let mut declared: Vec<FieldName> = Vec::new();
        let mut declare = |name: &FieldName| {
            if !declared.contains(name) {
                declared.push(name.clone());
            }
        };
        for field in search_fields {
            match field.kind {
                FieldKind::ListFacet | FieldKind::RangeFacet | FieldKind::DateRangeFacet => {
                    declare(&field.field)
                }
                _ => {}
            }
        }
        for field in search_fields {
            if field.kind == FieldKind::PeriodRangeFacet {
                if let (Some(lower), Some(upper)) = (&field.lower_bound, &field.upper_bound) {
                    declare(lower);
                    declare(upper);
                }
            }
        }
        for t in translations {
            if let Translation::Path(path) = &t.translation {
                declare(&path.facet_field);
            }
        }
        declared
    }

    /// Per-field `facet.sort` overrides.
    pub fn facet_sorts<'a>(&self, search_fields: &'a [SearchField]) -> Vec<(&'a str, &'a str)> {
        search_fields
            .iter()
            .filter_map(|f| match f.facet_sort.as_deref() {
                Some(sort) if !sort.is_empty() => Some((f.field.as_str(), sort)),
                _ => None,
            })
            .collect()
    }

    pub fn base_query(&self, suppress_attachmentless: bool) -> String {
        if suppress_attachmentless {
            format!("{} AND {}:*", self.config.base_query, self.config.attachment_field)
        } else {
            self.config.base_query.clone()
        }
    }

    pub fn assemble_params(
        &self,
        spec: &QuerySpec,
        format: &OutputFormat,
        suppress_attachmentless: bool,
    ) -> QueryParams {
        let translations = self.explain(spec);
        let mut params = QueryParams::new();

        params.push("q", &self.base_query(suppress_attachmentless));

        for clause in self.build_filters(&translations) {
            params.push_encoded("fq", clause.encoded());
        }

        let sort = self
            .build_sort(&spec.sort_fields, &spec.paging)
            .iter()
            .map(SortKey::to_string)
            .collect::<Vec<_>>()
            .join(",");
        params.push("sort", &sort);

        for name in self.facet_fields(&spec.search_fields, &translations) {
            params.push("facet.field", &name);
        }
        for (field, sort) in self.facet_sorts(&spec.search_fields) {
            params.push(format!("f.{}.facet.sort", encode_component(field)), sort);
        }

        params.push("rows", &spec.rows.to_string());
        if let Some(start) = spec.start {
            params.push("start", &start.to_string());
        }
        if let Paging::Cursor { cursor_mark, .. } = &spec.paging {
            let mark = cursor_mark
                .as_deref()
                .filter(|m| !m.is_empty())
                .unwrap_or(INITIAL_CURSOR_MARK);
            params.push("cursorMark", mark);
        }

        let facet_limit = spec
            .facet_limit
            .filter(|limit| *limit != 0)
            .unwrap_or(UNBOUNDED_FACET_LIMIT);
        params.push("facet.limit", &facet_limit.to_string());
        let facet_sort = spec
            .facet_sort
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_FACET_SORT);
        params.push("facet.sort", facet_sort);
        params.push("facet", "on");

        for (key, value) in &format.0 {
            params.push(encode_component(key), value);
        }

        tracing::trace!(params = params.len(), "query assembled");
        params
    }

    pub fn assemble(
        &self,
        spec: &QuerySpec,
        format: &OutputFormat,
        suppress_attachmentless: bool,
    ) -> String {
        self.assemble_params(spec, format, suppress_attachmentless)
            .to_string()
    }
}

/// Assemble with the default engine field names.
pub fn assemble(spec: &QuerySpec, format: &OutputFormat, suppress_attachmentless: bool) -> String {
    QueryAssembler::default().assemble(spec, format, suppress_attachmentless)
}
