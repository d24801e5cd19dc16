//! ServerBuilder for fluent API to build the hook server

use super::host::AutomationHost;
use super::router::build_router;
use crate::config::AutomationConfig;
use crate::core::module::Extension;
use anyhow::Result;
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Builder for the hook server
///
/// # Example
///
/// ```ignore
/// let app = ServerBuilder::new()
///     .with_config(config)
///     .register_extension(FormCollectionsExtension::new(store, "forms", 30))
///     .build()?;
/// ```
pub struct ServerBuilder {
    config: Option<AutomationConfig>,
    extensions: Vec<Arc<dyn Extension>>,
    custom_routes: Vec<Router>,
}

impl ServerBuilder {
    /// Create a new ServerBuilder
    pub fn new() -> Self {
        Self {
            config: None,
            extensions: Vec::new(),
            custom_routes: Vec::new(),
        }
    }

    /// Set the configuration (defaults are used otherwise)
    pub fn with_config(mut self, config: AutomationConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Add custom routes to the server
    pub fn with_custom_routes(mut self, routes: Router) -> Self {
        self.custom_routes.push(routes);
        self
    }

    /// Register an extension
    ///
    /// Its hooks are registered when the host is built, in registration order.
    pub fn register_extension(mut self, extension: impl Extension + 'static) -> Self {
        self.extensions.push(Arc::new(extension));
        self
    }

    /// Build the host shared by the request handlers
    pub fn build_host(self) -> Result<AutomationHost> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let names: Vec<&str> = self.extensions.iter().map(|e| e.name()).collect();
        if let Some(duplicate) = names
            .iter()
            .enumerate()
            .find_map(|(i, name)| names[..i].contains(name).then_some(*name))
        {
            anyhow::bail!("Extension '{}' is registered twice", duplicate);
        }

        Ok(AutomationHost::from_extensions(config, &self.extensions))
    }

    /// Build the final router
    pub fn build(mut self) -> Result<Router> {
        let custom_routes = std::mem::take(&mut self.custom_routes);
        let host = Arc::new(self.build_host()?);
        Ok(build_router(host, custom_routes))
    }

    /// Serve the application with graceful shutdown
    ///
    /// This will:
    /// - Bind to the provided address
    /// - Start serving requests
    /// - Handle SIGTERM and SIGINT (Ctrl+C) for graceful shutdown
    pub async fn serve(self, addr: &str) -> Result<()> {
        let app = self.build()?;
        let listener = TcpListener::bind(addr).await?;

        tracing::info!("Server listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Wait for SIGTERM or Ctrl+C
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM signal, initiating graceful shutdown...");
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::FormCollectionsExtension;
    use crate::storage::InMemorySchemaStore;

    fn forms_extension() -> FormCollectionsExtension {
        FormCollectionsExtension::new(Arc::new(InMemorySchemaStore::new()), "forms", 30)
    }

    #[test]
    fn test_new_creates_empty_builder() {
        let builder = ServerBuilder::new();
        assert!(builder.config.is_none());
        assert!(builder.extensions.is_empty());
        assert!(builder.custom_routes.is_empty());
    }

    #[test]
    fn test_with_custom_routes_appends_router() {
        let builder = ServerBuilder::new()
            .with_custom_routes(Router::new())
            .with_custom_routes(Router::new());
        assert_eq!(builder.custom_routes.len(), 2);
    }

    #[test]
    fn test_build_host_registers_extension_hooks() {
        let host = ServerBuilder::new()
            .register_extension(forms_extension())
            .build_host()
            .expect("build_host should succeed");
        assert!(host.registry.handles("forms.items.create"));
        assert_eq!(host.config.batch_chunk_size, 30);
    }

    #[test]
    fn test_build_host_rejects_invalid_config() {
        let config = AutomationConfig {
            batch_chunk_size: 0,
            ..Default::default()
        };
        let result = ServerBuilder::new().with_config(config).build_host();
        assert!(result.is_err());
    }

    #[test]
    fn test_build_host_rejects_duplicate_extensions() {
        let result = ServerBuilder::new()
            .register_extension(forms_extension())
            .register_extension(forms_extension())
            .build_host();
        let err_msg = format!("{}", result.err().expect("should be Err"));
        assert!(err_msg.contains("automatic-form-collections"), "{}", err_msg);
    }

    #[test]
    fn test_build_produces_router() {
        let router = ServerBuilder::new()
            .register_extension(forms_extension())
            .build();
        assert!(router.is_ok());
    }
}
