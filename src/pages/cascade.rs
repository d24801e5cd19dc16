//! Status and delete cascades from root pages to their descendants
//!
//! A root page (permalink ending in `/`) contains every page whose permalink
//! starts with its own. Matching is a plain case-insensitive prefix test with
//! no segment boundary check, so `/a/` contains `/a/b` but `/ab/` is only
//! contained by roots it literally starts with.

use crate::core::error::AutomationError;
use crate::core::events::ItemKey;
use crate::core::page::{Page, PageStatus, is_root_permalink};
use crate::core::service::PageStore;
use std::sync::Arc;

/// Case-insensitive `starts_with`
pub fn matches_prefix(root: &str, permalink: &str) -> bool {
    permalink.to_lowercase().starts_with(&root.to_lowercase())
}

/// Pages a status change of `root` applies to: the root itself and its
/// descendants, minus those already in `status`
pub fn select_status_cascade<'a>(
    pages: impl IntoIterator<Item = &'a Page>,
    root: &str,
    status: &PageStatus,
) -> Vec<ItemKey> {
    pages
        .into_iter()
        .filter(|page| matches_prefix(root, &page.permalink) && &page.status != status)
        .map(|page| page.id.clone())
        .collect()
}

/// Pages removed along with `root`; the root itself is excluded
pub fn select_delete_cascade<'a>(
    pages: impl IntoIterator<Item = &'a Page>,
    root: &str,
) -> Vec<ItemKey> {
    pages
        .into_iter()
        .filter(|page| matches_prefix(root, &page.permalink) && page.permalink != root)
        .map(|page| page.id.clone())
        .collect()
}

/// Result of cascading from one root
#[derive(Debug)]
pub struct CascadeOutcome {
    pub root: String,
    pub result: Result<Vec<ItemKey>, AutomationError>,
}

impl CascadeOutcome {
    pub fn affected(&self) -> &[ItemKey] {
        match &self.result {
            Ok(ids) => ids,
            Err(_) => &[],
        }
    }

    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Applies cascades through a [`PageStore`]
#[derive(Clone)]
pub struct CascadeResolver {
    store: Arc<dyn PageStore>,
}

impl CascadeResolver {
    pub fn new(store: Arc<dyn PageStore>) -> Self {
        Self { store }
    }

    /// Propagate `status` from `root` to its descendants
    ///
    /// Non-root permalinks never cascade and leave the store untouched.
    pub async fn on_root_status_change(&self, root: &str, status: &PageStatus) -> CascadeOutcome {
        if !is_root_permalink(root) {
            return CascadeOutcome {
                root: root.to_string(),
                result: Ok(Vec::new()),
            };
        }

        let result = self
            .store
            .update_status_by_prefix(root, status)
            .await
            .map_err(AutomationError::from);

        CascadeOutcome {
            root: root.to_string(),
            result,
        }
    }

    /// Delete every descendant of `root`
    pub async fn on_root_delete(&self, root: &str) -> CascadeOutcome {
        if !is_root_permalink(root) {
            return CascadeOutcome {
                root: root.to_string(),
                result: Ok(Vec::new()),
            };
        }

        let result = self
            .store
            .delete_by_prefix_except(root)
            .await
            .map_err(AutomationError::from);

        CascadeOutcome {
            root: root.to_string(),
            result,
        }
    }

    /// Status cascade for several roots; one failing root does not stop the rest
    pub async fn cascade_status(&self, roots: &[String], status: &PageStatus) -> Vec<CascadeOutcome> {
        let mut outcomes = Vec::with_capacity(roots.len());
        for root in roots {
            outcomes.push(self.on_root_status_change(root, status).await);
        }
        outcomes
    }

    /// Delete cascade for several roots; one failing root does not stop the rest
    pub async fn cascade_delete(&self, roots: &[String]) -> Vec<CascadeOutcome> {
        let mut outcomes = Vec::with_capacity(roots.len());
        for root in roots {
            outcomes.push(self.on_root_delete(root).await);
        }
        outcomes
    }
}
