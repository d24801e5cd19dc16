//! Pages and their permalink hierarchy

use crate::core::events::ItemKey;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Permalink path separator
pub const PATH_SEPARATOR: char = '/';

/// A permalink ending in the separator marks a root (section) page
pub fn is_root_permalink(permalink: &str) -> bool {
    permalink.ends_with(PATH_SEPARATOR)
}

/// Publication status of a page
///
/// Unknown statuses configured in the CMS are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PageStatus {
    Draft,
    Published,
    Archived,
    Other(String),
}

impl PageStatus {
    pub fn as_str(&self) -> &str {
        match self {
            PageStatus::Draft => "draft",
            PageStatus::Published => "published",
            PageStatus::Archived => "archived",
            PageStatus::Other(status) => status,
        }
    }
}

impl From<String> for PageStatus {
    fn from(status: String) -> Self {
        match status.as_str() {
            "draft" => PageStatus::Draft,
            "published" => PageStatus::Published,
            "archived" => PageStatus::Archived,
            _ => PageStatus::Other(status),
        }
    }
}

impl From<&str> for PageStatus {
    fn from(status: &str) -> Self {
        PageStatus::from(status.to_string())
    }
}

impl From<PageStatus> for String {
    fn from(status: PageStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for PageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A page row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub id: ItemKey,
    #[serde(default)]
    pub title: Option<String>,
    pub permalink: String,
    pub status: PageStatus,
}

impl Page {
    pub fn new(
        id: impl Into<ItemKey>,
        title: impl Into<String>,
        permalink: impl Into<String>,
        status: impl Into<PageStatus>,
    ) -> Self {
        Self {
            id: id.into(),
            title: Some(title.into()),
            permalink: permalink.into(),
            status: status.into(),
        }
    }

    pub fn is_root(&self) -> bool {
        is_root_permalink(&self.permalink)
    }

    /// Compact view used in log fields
    pub fn summary(&self) -> PageSummary {
        PageSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            permalink: self.permalink.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PageSummary {
    pub id: ItemKey,
    pub title: Option<String>,
    pub permalink: String,
}
