//! Core data types that flow through the fetch pipeline.
//!
//! A run starts from a [`SourceDescriptor`] and a [`RecencyFilter`], pulls
//! [`RawRecord`]s from the API and hands their fields to the reconciler
//! through the [`NoteFields`] view.

use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Identifies one remote table view: `https://host/base/{base}?table={table}&view={view}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SourceDescriptor {
    pub base_id: String,
    pub table_id: String,
    pub view_id: String,
}

impl SourceDescriptor {
    /// Parse a share URL. A URL that does not parse yields empty ids; the
    /// API calls made with them fail later and are reported there.
    pub fn from_url(url: &str) -> Self {
        let parsed = match Url::parse(url) {
            Ok(u) => u,
            Err(e) => {
                tracing::warn!(url, error = %e, "could not parse source url");
                return Self::default();
            }
        };

        let base_id = parsed
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .unwrap_or_default()
            .to_string();

        let mut table_id = String::new();
        let mut view_id = String::new();
        for (key, value) in parsed.query_pairs() {
            match key.as_ref() {
                "table" if table_id.is_empty() => table_id = value.into_owned(),
                "view" if view_id.is_empty() => view_id = value.into_owned(),
                _ => {}
            }
        }

        Self {
            base_id,
            table_id,
            view_id,
        }
    }

    /// True when both ids needed to address the search endpoint are present.
    pub fn is_addressable(&self) -> bool {
        !self.base_id.is_empty() && !self.table_id.is_empty()
    }
}

/// How recently a row must have been updated to be fetched.
///
/// The threshold is compared against the table's `UpdatedIn` column, which
/// holds the number of days since the row last changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RecencyFilter {
    pub id: &'static str,
    pub label: &'static str,
    pub threshold_days: u32,
}

pub const RECENCY_FILTERS: [RecencyFilter; 6] = [
    RecencyFilter {
        id: "day",
        label: "Notes updated today",
        threshold_days: 1,
    },
    RecencyFilter {
        id: "threeDays",
        label: "Notes updated in the past 3 days",
        threshold_days: 3,
    },
    RecencyFilter {
        id: "week",
        label: "Notes updated in the past week",
        threshold_days: 7,
    },
    RecencyFilter {
        id: "twoWeeks",
        label: "Notes updated in the past two weeks",
        threshold_days: 14,
    },
    RecencyFilter {
        id: "month",
        label: "Notes updated in the past month",
        threshold_days: 30,
    },
    RecencyFilter {
        id: "all",
        label: "All notes",
        threshold_days: 9999,
    },
];

impl RecencyFilter {
    /// Look up a preset by id. Matching ignores ASCII case.
    pub fn by_id(id: &str) -> Option<RecencyFilter> {
        RECENCY_FILTERS
            .iter()
            .find(|f| f.id.eq_ignore_ascii_case(id))
            .copied()
    }

    /// Value sent in the API filter condition.
    pub fn api_value(&self) -> String {
        self.threshold_days.to_string()
    }
}

/// One row as returned by the search endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    #[serde(default)]
    pub fields: Map<String, Value>,
}

impl RawRecord {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    pub fn note(&self) -> NoteFields<'_> {
        NoteFields(&self.fields)
    }
}

/// Read-only view of the columns the reconciler understands.
#[derive(Debug, Clone, Copy)]
pub struct NoteFields<'a>(&'a Map<String, Value>);

impl<'a> NoteFields<'a> {
    pub fn title(&self) -> Option<String> {
        self.text("Title")
    }

    pub fn body(&self) -> Option<String> {
        self.text("MD")
    }

    /// Sub folder below the source's target path. Empty means none.
    pub fn sub_folder(&self) -> Option<String> {
        self.text("SubFolder").filter(|s| !s.is_empty())
    }

    pub fn extension(&self) -> Option<String> {
        self.text("Extension").filter(|s| !s.is_empty())
    }

    fn text(&self, key: &str) -> Option<String> {
        match self.0.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }
}
