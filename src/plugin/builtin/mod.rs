mod gemini;
mod notebook_tools_filter;
mod toolcall_improvement;

use std::sync::Arc;

pub use gemini::GeminiCompat;
pub use notebook_tools_filter::NotebookToolsFilter;
pub use toolcall_improvement::ToolcallImprovement;

use super::{Plugin, PluginLoader};
use crate::error::{Result, RouterError};

/// Loader for the plugins shipped with the router
pub struct BuiltinPlugins;

impl BuiltinPlugins {
    pub const NAMES: [&'static str; 3] =
        ["gemini", "notebook-tools-filter", "toolcall-improvement"];
}

impl PluginLoader for BuiltinPlugins {
    fn load(&self, name: &str) -> Result<Arc<dyn Plugin>> {
        match name {
            "gemini" => Ok(Arc::new(GeminiCompat)),
            "notebook-tools-filter" => Ok(Arc::new(NotebookToolsFilter::default())),
            "toolcall-improvement" => Ok(Arc::new(ToolcallImprovement)),
            _ => Err(RouterError::PluginError(format!(
                "Unknown plugin {} (available: {})",
                name,
                Self::NAMES.join(", ")
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::PluginRegistry;

    #[test]
    fn test_load_builtins_with_scope() {
        let names = vec![
            "notebook-tools-filter".to_string(),
            "gemini,gemini".to_string(),
            "toolcall-improvement".to_string(),
        ];
        let registry = PluginRegistry::load(&names, &BuiltinPlugins).unwrap();

        assert_eq!(
            registry.names().collect::<Vec<_>>(),
            vec!["notebook-tools-filter", "gemini,gemini", "toolcall-improvement"]
        );
    }

    #[test]
    fn test_unknown_plugin_fails_load() {
        let names = vec!["missing".to_string()];
        let err = PluginRegistry::load(&names, &BuiltinPlugins).err().unwrap();
        assert!(err.to_string().contains("Unknown plugin missing"));
    }
}
