//! Tag Dictionary Types
//!
//! A tag dictionary is a sequence of **records** (one per `<table>` element),
//! each holding an ordered list of **entries** (`<tag>` elements). Entries
//! that pass a [`TagFilter`] are projected into flat [`TagResult`]s, which is
//! the shape served to clients.
//!
//! Records are short-lived: the translator decodes one record, projects its
//! entries and drops it before reading the next.

use std::collections::BTreeMap;

use serde::Serialize;

// =============================================================================
// Decoded Records
// =============================================================================

/// A named group of entries (`<table name="...">`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    /// Table name, e.g. `EXIF` or `XMP::dc`.
    pub name: String,
    /// Entries in document order.
    pub entries: Vec<Entry>,
}

/// One tag definition inside a record (`<tag ...>`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Entry {
    /// Tag id as reported by the tool (`id` attribute).
    pub id: String,
    /// Tag name, unique within its record.
    pub name: String,
    /// Value type label, e.g. `string` or `int16u`.
    pub tag_type: String,
    /// Whether the tool can write this tag.
    pub writable: bool,
    /// Family 2 group label (`g2` attribute).
    pub group: String,
    /// Localized descriptions in document order, duplicates included.
    pub descriptions: Vec<Description>,
}

/// A localized description (`<desc lang="...">text</desc>`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Description {
    /// Language code, e.g. `en` or `de`.
    pub lang: String,
    /// Description text.
    pub text: String,
}

impl Description {
    /// Create a new description.
    #[must_use]
    pub fn new(lang: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            lang: lang.into(),
            text: text.into(),
        }
    }
}

impl Entry {
    /// Collapse the descriptions into a language map.
    ///
    /// A language appearing more than once keeps its last value.
    #[must_use]
    pub fn description_map(&self) -> BTreeMap<String, String> {
        self.descriptions
            .iter()
            .map(|d| (d.lang.clone(), d.text.clone()))
            .collect()
    }
}

impl Record {
    /// Project the entries that pass `filter`, in document order.
    pub fn matching_results<'a>(
        &'a self,
        filter: &'a TagFilter,
    ) -> impl Iterator<Item = TagResult> + 'a {
        let record_matches = filter.matches_table(&self.name);
        self.entries
            .iter()
            .filter(move |entry| record_matches && filter.matches_tag(&entry.name))
            .map(move |entry| TagResult::project(&self.name, entry))
    }
}

// =============================================================================
// Filter
// =============================================================================

/// Exact-match filter on table name and tag name.
///
/// An absent (or empty) criterion matches everything. Matching is
/// case-sensitive string equality.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagFilter {
    table: Option<String>,
    tag: Option<String>,
}

impl TagFilter {
    /// Build a filter from optional query values. Empty strings are treated
    /// as absent.
    #[must_use]
    pub fn new(table: Option<&str>, tag: Option<&str>) -> Self {
        Self {
            table: non_empty(table),
            tag: non_empty(tag),
        }
    }

    /// Filter that matches every entry.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            table: None,
            tag: None,
        }
    }

    /// Table criterion, if any.
    #[must_use]
    pub fn table(&self) -> Option<&str> {
        self.table.as_deref()
    }

    /// Tag criterion, if any.
    #[must_use]
    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    /// Whether a record with this name can contribute results.
    #[must_use]
    pub fn matches_table(&self, name: &str) -> bool {
        self.table.as_deref().is_none_or(|t| t == name)
    }

    /// Whether an entry with this name passes the tag criterion.
    #[must_use]
    pub fn matches_tag(&self, name: &str) -> bool {
        self.tag.as_deref().is_none_or(|t| t == name)
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(str::to_string)
}

// =============================================================================
// Result Projection
// =============================================================================

/// Flattened, client-facing view of one entry.
///
/// Serialized field order is `writable, path, group, description, type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagResult {
    /// Whether the tag is writable.
    pub writable: bool,
    /// `<table>:<tag>` path.
    pub path: String,
    /// Name of the table the tag came from.
    pub group: String,
    /// Language code to description text.
    pub description: BTreeMap<String, String>,
    /// Value type label.
    #[serde(rename = "type")]
    pub tag_type: String,
}

impl TagResult {
    /// Project an entry of the named record.
    #[must_use]
    pub fn project(record_name: &str, entry: &Entry) -> Self {
        Self {
            writable: entry.writable,
            path: format!("{record_name}:{}", entry.name),
            group: record_name.to_string(),
            description: entry.description_map(),
            tag_type: entry.tag_type.clone(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
