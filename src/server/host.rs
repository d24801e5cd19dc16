//! Server host holding the state shared by every request

use crate::config::AutomationConfig;
use crate::core::module::Extension;
use crate::hooks::HookRegistry;
use std::sync::Arc;

/// Host context containing the application state
///
/// Built once by the [`ServerBuilder`](super::ServerBuilder) and shared by
/// the request handlers behind an `Arc`.
pub struct AutomationHost {
    /// Runtime configuration
    pub config: Arc<AutomationConfig>,

    /// Filters and actions of every registered extension
    pub registry: Arc<HookRegistry>,

    /// Names of the registered extensions, in registration order
    pub extensions: Vec<String>,
}

impl AutomationHost {
    /// Build the host, letting every extension register its hooks
    pub fn from_extensions(config: AutomationConfig, extensions: &[Arc<dyn Extension>]) -> Self {
        let mut registry = HookRegistry::new();
        for extension in extensions {
            extension.register_hooks(&mut registry);
            tracing::debug!(
                extension = extension.name(),
                version = extension.version(),
                "Registered extension"
            );
        }

        Self {
            config: Arc::new(config),
            registry: Arc::new(registry),
            extensions: extensions.iter().map(|e| e.name().to_string()).collect(),
        }
    }

    /// Events with at least one handler
    pub fn events(&self) -> Vec<&str> {
        self.registry.events()
    }

    pub fn is_ready(&self) -> bool {
        !self.registry.events().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::FormCollectionsExtension;
    use crate::storage::InMemorySchemaStore;

    fn make_host(extensions: &[Arc<dyn Extension>]) -> AutomationHost {
        AutomationHost::from_extensions(AutomationConfig::default(), extensions)
    }

    #[test]
    fn test_host_without_extensions_is_not_ready() {
        let host = make_host(&[]);
        assert!(!host.is_ready());
        assert!(host.events().is_empty());
    }

    #[test]
    fn test_extension_events_are_registered() {
        let extension: Arc<dyn Extension> = Arc::new(FormCollectionsExtension::new(
            Arc::new(InMemorySchemaStore::new()),
            "forms",
            30,
        ));
        let host = make_host(&[extension]);

        assert!(host.is_ready());
        assert_eq!(host.events(), vec!["forms.items.create", "forms.items.update"]);
        assert_eq!(host.extensions, vec!["automatic-form-collections"]);
    }
}
