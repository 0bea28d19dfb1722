//! Company records and per-URL extraction outcomes

use crate::storage::ResultRow;

/// Placeholder for a field the detail page does not provide
pub const NOT_AVAILABLE: &str = "N/A";

/// Placeholder written for a detail page that could not be fetched
pub const DEAD_LINK: &str = "Dead Link";

/// Fields extracted from one company detail page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompanyRecord {
    pub name: Option<String>,
    pub email: Option<String>,
    pub source_url: String,
}

/// What happened to one discovered company URL
///
/// Every company URL yields exactly one outcome, so no discovered URL is
/// lost between discovery and the result store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompanyOutcome {
    /// The page was fetched and at least one field was found
    Extracted(CompanyRecord),

    /// Every fetch attempt failed; worth retrying in a later pass
    Unreachable { source_url: String },

    /// The page was fetched but carried neither a name nor an email
    EmptyButReachable { source_url: String },
}

impl CompanyOutcome {
    pub fn source_url(&self) -> &str {
        match self {
            Self::Extracted(record) => &record.source_url,
            Self::Unreachable { source_url } | Self::EmptyButReachable { source_url } => {
                source_url
            }
        }
    }

    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::Unreachable { .. })
    }

    /// Flattens the outcome into a result store row
    pub fn to_row(&self) -> ResultRow {
        match self {
            Self::Extracted(record) => ResultRow {
                name: record
                    .name
                    .clone()
                    .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
                email: record
                    .email
                    .clone()
                    .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
                source_url: record.source_url.clone(),
            },
            Self::Unreachable { source_url } => ResultRow {
                name: DEAD_LINK.to_string(),
                email: DEAD_LINK.to_string(),
                source_url: source_url.clone(),
            },
            Self::EmptyButReachable { source_url } => ResultRow {
                name: NOT_AVAILABLE.to_string(),
                email: NOT_AVAILABLE.to_string(),
                source_url: source_url.clone(),
            },
        }
    }
}
