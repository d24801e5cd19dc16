//! Extension system
//!
//! An extension groups the hook handlers of one concern (form collections,
//! pages automation) and registers them with the [`HookRegistry`].

use crate::hooks::registry::HookRegistry;

/// Trait for a hook extension
pub trait Extension: Send + Sync {
    /// Unique extension name
    fn name(&self) -> &str;

    /// Extension version
    fn version(&self) -> &str {
        "1.0.0"
    }

    /// Register the extension's filters and actions
    fn register_hooks(&self, registry: &mut HookRegistry);
}
