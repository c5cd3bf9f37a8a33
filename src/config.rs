use crate::error::{Result, RouterError};
use serde::Deserialize;
use std::collections::HashSet;
use std::env;
use std::fs;

#[derive(Debug, Clone, Deserialize)]
pub struct RouterConfig {
    #[serde(default)]
    pub server: ServerConfig,
    pub router: RouteConfig,
    pub providers: Vec<ProviderConfig>,
    /// Plugin names in invocation order; `"provider,name"` scopes a plugin
    #[serde(default)]
    pub plugins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub listen_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:3456".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RouteConfig {
    /// Fallback route as `"provider,model"`
    pub default: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    pub name: String,
    /// Full chat-completions endpoint URL
    pub api_base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub models: Vec<String>,
}

impl ProviderConfig {
    /// Environment variable that overrides this provider's API key
    pub fn api_key_var(&self) -> String {
        format!("{}_API_KEY", self.name.to_uppercase().replace('-', "_"))
    }
}

impl RouterConfig {
    /// Load configuration from TOML file
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| RouterError::ConfigError(format!("Failed to read config file: {}", e)))?;

        let mut config = Self::from_toml(&contents)?;
        config.apply_env();
        Ok(config)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents)
            .map_err(|e| RouterError::ConfigError(format!("Failed to parse config file: {}", e)))
    }

    /// Allow environment variables to override file config
    pub fn apply_env(&mut self) {
        if let Ok(listen_addr) = env::var("ROUTER_LISTEN_ADDR") {
            self.server.listen_addr = listen_addr;
        }

        for provider in &mut self.providers {
            if let Ok(api_key) = env::var(provider.api_key_var()) {
                provider.api_key = api_key;
            }
        }
    }

    pub fn provider(&self, name: &str) -> Option<&ProviderConfig> {
        self.providers.iter().find(|p| p.name == name)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.providers.is_empty() {
            return Err(RouterError::ConfigError(
                "At least one provider must be configured".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for provider in &self.providers {
            if !seen.insert(provider.name.as_str()) {
                return Err(RouterError::ConfigError(format!(
                    "Duplicate provider: {}",
                    provider.name
                )));
            }
            if provider.api_base_url.is_empty() {
                return Err(RouterError::ConfigError(format!(
                    "Provider {} has an empty api_base_url",
                    provider.name
                )));
            }
        }

        match self.router.default.split_once(',') {
            Some((provider, model)) if !model.is_empty() => {
                if self.provider(provider).is_none() {
                    return Err(RouterError::ConfigError(format!(
                        "Default route names unknown provider: {}",
                        provider
                    )));
                }
            }
            _ => {
                return Err(RouterError::ConfigError(format!(
                    "Default route must be \"provider,model\", got: {}",
                    self.router.default
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        plugins = ["notebook-tools-filter", "gemini,gemini"]

        [router]
        default = "openrouter,google/gemini-2.5-pro"

        [[providers]]
        name = "openrouter"
        api_base_url = "https://openrouter.ai/api/v1/chat/completions"
        api_key = "sk-test"
        models = ["google/gemini-2.5-pro"]

        [[providers]]
        name = "deepseek"
        api_base_url = "https://api.deepseek.com/chat/completions"
    "#;

    #[test]
    fn test_parse_config() {
        let config = RouterConfig::from_toml(SAMPLE).unwrap();

        assert_eq!(config.server.listen_addr, "127.0.0.1:3456");
        assert_eq!(config.providers.len(), 2);
        assert_eq!(config.plugins, vec!["notebook-tools-filter", "gemini,gemini"]);
        assert_eq!(config.provider("deepseek").unwrap().api_key, "");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = RouterConfig::from_toml(SAMPLE).unwrap();
        config.router.default = "openrouter".to_string();
        assert!(config.validate().is_err());

        config.router.default = "missing,model".to_string();
        assert!(config.validate().is_err());

        let mut config = RouterConfig::from_toml(SAMPLE).unwrap();
        config.providers[1].name = "openrouter".to_string();
        assert!(config.validate().is_err());

        let mut config = RouterConfig::from_toml(SAMPLE).unwrap();
        config.providers.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_api_key_var() {
        let config = RouterConfig::from_toml(SAMPLE).unwrap();
        assert_eq!(config.providers[0].api_key_var(), "OPENROUTER_API_KEY");

        let provider = ProviderConfig {
            name: "volc-engine".to_string(),
            api_base_url: "https://example.com".to_string(),
            api_key: String::new(),
            models: vec![],
        };
        assert_eq!(provider.api_key_var(), "VOLC_ENGINE_API_KEY");
    }
}
