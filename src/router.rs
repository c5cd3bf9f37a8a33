use crate::config::RouterConfig;
use crate::error::{Result, RouterError};

/// Upstream provider and model chosen for a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub provider: String,
    pub model: String,
}

/// Pick the route for a requested model.
///
/// `"provider,model"` selects explicitly; anything else falls back to the
/// configured default route.
pub fn select_route(config: &RouterConfig, requested_model: &str) -> Result<Route> {
    let route = if requested_model.contains(',') {
        requested_model
    } else {
        config.router.default.as_str()
    };

    let (provider, model) = route
        .split_once(',')
        .filter(|(_, model)| !model.is_empty())
        .ok_or_else(|| RouterError::RoutingError(format!("Invalid route: {}", route)))?;

    if config.provider(provider).is_none() {
        return Err(RouterError::RoutingError(format!(
            "Unknown provider: {}",
            provider
        )));
    }

    Ok(Route {
        provider: provider.to_string(),
        model: model.to_string(),
    })
}
