//! Pages automation
//!
//! - `pages.items.create` (action): tell the frontend about the new page
//! - `pages.items.update` (action): cascade status changes from root pages,
//!   or propagate plain status/permalink changes, then tell the frontend
//! - `pages.items.delete` (filter): delete the descendants of root pages
//!   before the roots themselves go

use super::{HookHandler, HookOutcome, ItemResult, registry::HookRegistry};
use crate::core::error::AutomationError;
use crate::core::events::{HookAction, HookEvent, HookEventName, ItemKey};
use crate::core::module::Extension;
use crate::core::page::{Page, PageStatus, PageSummary};
use crate::core::service::PageStore;
use crate::notify::{Notifier, WebhookPayload, WebhookTarget, notify_logged};
use crate::pages::CascadeResolver;
use async_trait::async_trait;
use std::sync::Arc;

/// Extension reacting to page changes
pub struct PagesAutomationExtension {
    store: Arc<dyn PageStore>,
    notifier: Arc<dyn Notifier>,
    pages_collection: String,
    cascade_statuses: Vec<PageStatus>,
}

impl PagesAutomationExtension {
    pub fn new(
        store: Arc<dyn PageStore>,
        notifier: Arc<dyn Notifier>,
        pages_collection: impl Into<String>,
        cascade_statuses: Vec<PageStatus>,
    ) -> Self {
        Self {
            store,
            notifier,
            pages_collection: pages_collection.into(),
            cascade_statuses,
        }
    }

    fn event(&self, action: HookAction) -> String {
        HookEventName::new(&self.pages_collection, action).to_string()
    }
}

impl Extension for PagesAutomationExtension {
    fn name(&self) -> &str {
        "pages-automation"
    }

    fn register_hooks(&self, registry: &mut HookRegistry) {
        registry.action(
            self.event(HookAction::Create),
            PageCreated {
                notifier: self.notifier.clone(),
            },
        );
        registry.action(
            self.event(HookAction::Update),
            PagesUpdated {
                store: self.store.clone(),
                cascade: CascadeResolver::new(self.store.clone()),
                notifier: self.notifier.clone(),
                cascade_statuses: self.cascade_statuses.clone(),
            },
        );
        registry.filter(
            self.event(HookAction::Delete),
            PagesDeleting {
                store: self.store.clone(),
                cascade: CascadeResolver::new(self.store.clone()),
            },
        );
    }
}

fn summaries(pages: &[Page]) -> Vec<PageSummary> {
    pages.iter().map(Page::summary).collect()
}

fn keys_label(keys: &[ItemKey]) -> String {
    keys.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

/// Action on page creation
pub struct PageCreated {
    notifier: Arc<dyn Notifier>,
}

#[async_trait]
impl HookHandler for PageCreated {
    async fn handle(&self, event: &HookEvent) -> HookOutcome {
        let Some(permalink) = event.payload_str("permalink") else {
            tracing::warn!("Created page has no permalink, nothing to send");
            return HookOutcome::action(vec![ItemResult::skipped(
                "webhook",
                "created page has no permalink",
            )]);
        };

        let payload = WebhookPayload::page(permalink, event.event_name(), None);
        let result = notify_logged(self.notifier.as_ref(), WebhookTarget::Page, &payload).await;
        HookOutcome::action(vec![result])
    }
}

/// Action on page update
pub struct PagesUpdated {
    store: Arc<dyn PageStore>,
    cascade: CascadeResolver,
    notifier: Arc<dyn Notifier>,
    cascade_statuses: Vec<PageStatus>,
}

impl PagesUpdated {
    async fn cascade_roots(
        &self,
        event: &HookEvent,
        pages: &[Page],
        status: &PageStatus,
    ) -> Vec<ItemResult> {
        let roots: Vec<Page> = pages.iter().filter(|page| page.is_root()).cloned().collect();
        let permalinks: Vec<String> = roots.iter().map(|page| page.permalink.clone()).collect();

        let mut results = Vec::with_capacity(roots.len() + 1);
        for outcome in self.cascade.cascade_status(&permalinks, status).await {
            match &outcome.result {
                Ok(ids) => results.push(ItemResult::ok(
                    &outcome.root,
                    Some(format!("{} pages set to {}", ids.len(), status)),
                )),
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        permalink = %outcome.root,
                        "Could not cascade the status to the children pages"
                    );
                    results.push(ItemResult::failed(&outcome.root, e));
                }
            }
        }

        tracing::info!(pages = ?summaries(&roots), status = %status, "Cascaded status from root pages");

        let payload = WebhookPayload::pages(permalinks, event.event_name(), Some(status.to_string()));
        results.push(notify_logged(self.notifier.as_ref(), WebhookTarget::Pages, &payload).await);
        results
    }

    async fn update_each(
        &self,
        event: &HookEvent,
        pages: &[Page],
        status: &PageStatus,
    ) -> Vec<ItemResult> {
        let mut results = Vec::with_capacity(pages.len() + 1);
        for page in pages {
            match self.store.update_status(&page.id, status).await {
                Ok(()) => results.push(ItemResult::ok(&page.id, Some(status.to_string()))),
                Err(e) => {
                    let err = AutomationError::from(e);
                    tracing::error!(error = %err, page = %page.id, "Could not update the page status");
                    results.push(ItemResult::failed(&page.id, &err));
                }
            }
        }

        tracing::info!(pages = ?summaries(pages), status = %status, "Updated statuses for pages");

        let slugs = pages.iter().map(|page| page.permalink.clone()).collect();
        let payload = WebhookPayload::pages(slugs, event.event_name(), Some(status.to_string()));
        results.push(notify_logged(self.notifier.as_ref(), WebhookTarget::Pages, &payload).await);
        results
    }
}

#[async_trait]
impl HookHandler for PagesUpdated {
    async fn handle(&self, event: &HookEvent) -> HookOutcome {
        let label = keys_label(&event.keys);

        let pages = match self.store.find_by_ids(&event.keys).await {
            Ok(pages) if !pages.is_empty() => pages,
            Ok(_) => {
                let err = AutomationError::not_found("page", &label);
                tracing::error!(error = %err, "Failed to process the page update");
                return HookOutcome::action(vec![ItemResult::failed(&label, &err)]);
            }
            Err(e) => {
                let err = AutomationError::from(e);
                tracing::error!(error = %err, "Failed to load the updated pages");
                return HookOutcome::action(vec![ItemResult::failed(&label, &err)]);
            }
        };

        let status = event.payload_str("status").map(PageStatus::from);
        let results = match status {
            Some(status)
                if self.cascade_statuses.contains(&status) && pages.iter().any(Page::is_root) =>
            {
                self.cascade_roots(event, &pages, &status).await
            }
            Some(status) => self.update_each(event, &pages, &status).await,
            None => match event.payload_str("permalink") {
                Some(permalink) => {
                    let payload = WebhookPayload::page(permalink, event.event_name(), None);
                    vec![notify_logged(self.notifier.as_ref(), WebhookTarget::Page, &payload).await]
                }
                None => vec![ItemResult::skipped(&label, "no status or permalink change")],
            },
        };

        HookOutcome::action(results)
    }
}

/// Filter on page deletion
pub struct PagesDeleting {
    store: Arc<dyn PageStore>,
    cascade: CascadeResolver,
}

impl PagesDeleting {
    /// Look up every deleted key before any cascade runs
    async fn resolve(&self, keys: &[ItemKey]) -> Vec<(ItemKey, Result<Page, AutomationError>)> {
        let mut resolved = Vec::with_capacity(keys.len());
        for key in keys {
            let page = match self.store.find_by_id(key).await {
                Ok(Some(page)) => Ok(page),
                Ok(None) => Err(AutomationError::not_found("page", key)),
                Err(e) => Err(AutomationError::from(e)),
            };
            resolved.push((key.clone(), page));
        }
        resolved
    }
}

#[async_trait]
impl HookHandler for PagesDeleting {
    async fn handle(&self, event: &HookEvent) -> HookOutcome {
        let resolved = self.resolve(&event.keys).await;

        let roots: Vec<String> = resolved
            .iter()
            .filter_map(|(_, page)| page.as_ref().ok())
            .filter(|page| page.is_root())
            .map(|page| page.permalink.clone())
            .collect();
        let outcomes = self.cascade.cascade_delete(&roots).await;

        // Pages removed by any cascade of this event
        let removed: Vec<&ItemKey> = outcomes.iter().flat_map(|o| o.affected()).collect();

        let mut results = Vec::with_capacity(resolved.len());
        let mut outcomes = outcomes.iter();
        for (key, page) in &resolved {
            let page = match page {
                Ok(page) => page,
                Err(e) => {
                    tracing::error!(error = %e, page = %key, "Failed to delete the child pages");
                    results.push(ItemResult::failed(key, e));
                    continue;
                }
            };

            let outcome = if page.is_root() { outcomes.next() } else { None };

            if removed.iter().any(|id| id.matches(&page.id)) {
                results.push(ItemResult::skipped(key, "already deleted with its root"));
                continue;
            }

            match outcome.map(|o| &o.result) {
                None => results.push(ItemResult::skipped(key, "not a root page")),
                Some(Ok(deleted)) => {
                    tracing::info!(
                        deleted = deleted.len(),
                        "Child pages for the root page with permalink of '{}' have been deleted",
                        page.permalink
                    );
                    results.push(ItemResult::ok(
                        key,
                        Some(format!("{} child pages deleted", deleted.len())),
                    ));
                }
                Some(Err(e)) => {
                    tracing::error!(error = %e, page = %key, "Failed to delete the child pages");
                    results.push(ItemResult::failed(key, e));
                }
            }
        }

        HookOutcome::filter(event.payload.clone(), results)
    }
}
