use std::sync::Arc;

use super::Plugin;
use crate::error::Result;

/// Resolves a plugin by its base name (the part after any `provider,` scope)
///
/// Discovery and loading are up to the implementation; the registry only needs
/// a ready-to-call plugin back.
pub trait PluginLoader {
    fn load(&self, name: &str) -> Result<Arc<dyn Plugin>>;
}
