//! Registry mapping event names to filters and actions

use super::{HookHandler, HookKind, HookOutcome};
use crate::core::error::AutomationError;
use crate::core::events::{HookEnvelope, HookEvent};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::Instrument;

struct Registration {
    kind: HookKind,
    handler: Arc<dyn HookHandler>,
}

/// Registry for all hook handlers of the application
///
/// Filters run first, in registration order, each receiving the payload the
/// previous one returned; actions then run with the final payload.
#[derive(Default)]
pub struct HookRegistry {
    handlers: HashMap<String, Vec<Registration>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a filter for `event` (e.g. `forms.items.create`)
    pub fn filter(&mut self, event: impl Into<String>, handler: impl HookHandler + 'static) {
        self.register(event.into(), HookKind::Filter, Arc::new(handler));
    }

    /// Register an action for `event` (e.g. `pages.items.update`)
    pub fn action(&mut self, event: impl Into<String>, handler: impl HookHandler + 'static) {
        self.register(event.into(), HookKind::Action, Arc::new(handler));
    }

    fn register(&mut self, event: String, kind: HookKind, handler: Arc<dyn HookHandler>) {
        tracing::debug!(event = %event, kind = ?kind, "Registering hook");
        self.handlers
            .entry(event)
            .or_default()
            .push(Registration { kind, handler });
    }

    /// Get all event names with at least one handler
    pub fn events(&self) -> Vec<&str> {
        let mut events: Vec<&str> = self.handlers.keys().map(|s| s.as_str()).collect();
        events.sort_unstable();
        events
    }

    pub fn handles(&self, event: &str) -> bool {
        self.handlers.contains_key(event)
    }

    /// Run every handler registered for the event
    ///
    /// Only an event without handlers is an error; handler failures are
    /// reported inside the returned outcome.
    pub async fn dispatch(&self, event: HookEvent) -> Result<HookOutcome, AutomationError> {
        let name = event.event_name();
        let registrations = self
            .handlers
            .get(&name)
            .ok_or_else(|| AutomationError::UnknownEvent(name.clone()))?;

        let envelope = HookEnvelope::new(event);
        let span = tracing::info_span!("hook", event = %name, delivery = %envelope.id);
        let mut event = envelope.event;

        let combined = async move {
            let mut combined = HookOutcome::default();

            for registration in registrations
                .iter()
                .filter(|r| r.kind == HookKind::Filter)
            {
                let outcome = registration.handler.handle(&event).await;
                if let Some(payload) = outcome.payload {
                    event.payload = payload.clone();
                    combined.payload = Some(payload);
                }
                combined.results.extend(outcome.results);
            }

            for registration in registrations
                .iter()
                .filter(|r| r.kind == HookKind::Action)
            {
                let outcome = registration.handler.handle(&event).await;
                combined.results.extend(outcome.results);
            }

            let failed = combined.failures().count();
            if failed > 0 {
                tracing::warn!(failed, "Hook finished with failed items");
            } else {
                tracing::debug!(items = combined.results.len(), "Hook finished");
            }

            combined
        }
        .instrument(span)
        .await;

        Ok(combined)
    }
}
