pub mod books;

use std::sync::Arc;

use shelf_db::WorldState;
use shelf_kernel::{settings::Settings, ModuleRegistry};

/// Register all project-specific modules with the registry
pub fn register_all(
    registry: &mut ModuleRegistry,
    settings: &Settings,
    state: Arc<dyn WorldState>,
) -> anyhow::Result<()> {
    registry.register(books::create_module(settings, state)?)?;
    Ok(())
}
