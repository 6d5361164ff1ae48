pub mod catalog;
pub mod clock;
pub mod error;
pub mod key;
pub mod lending;
pub mod models;
pub mod routes;
pub mod search;
pub mod service;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use axum::{http::HeaderName, Router};
use shelf_authz::AuthorizationGate;
use shelf_db::WorldState;
use shelf_kernel::{settings::Settings, InitCtx, Module};

use routes::BooksState;
use service::LibraryService;

/// Book catalog and lending ledger
pub struct BooksModule {
    service: Arc<LibraryService>,
    identity_header: HeaderName,
}

impl BooksModule {
    pub fn new(service: Arc<LibraryService>, identity_header: HeaderName) -> Self {
        Self {
            service,
            identity_header,
        }
    }

    pub fn service(&self) -> &Arc<LibraryService> {
        &self.service
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        if ctx.settings.catalog.seed_on_init {
            self.service
                .init_catalog()
                .context("failed to seed the book catalog")?;
        }

        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        routes::router(BooksState {
            service: self.service.clone(),
            identity_header: self.identity_header.clone(),
        })
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(routes::openapi(self.identity_header.as_str()))
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module stopped");
        Ok(())
    }
}

/// Create the books module over `state`, gated on the configured admin role
pub fn create_module(
    settings: &Settings,
    state: Arc<dyn WorldState>,
) -> anyhow::Result<Arc<dyn Module>> {
    let identity_header = HeaderName::from_bytes(settings.auth.identity_header.as_bytes())
        .with_context(|| {
            format!(
                "invalid identity header name '{}'",
                settings.auth.identity_header
            )
        })?;
    let gate = AuthorizationGate::single_role(settings.auth.admin_role.clone());
    let service = LibraryService::new(state, gate);

    Ok(Arc::new(BooksModule::new(Arc::new(service), identity_header)))
}
