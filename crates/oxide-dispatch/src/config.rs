//! Router configuration.

use serde::{Deserialize, Serialize};

use crate::error::{Result, RouterError};
use crate::response::REDIRECT_STATUSES;

/// Settings a [`Router`](crate::Router) can be built from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Namespace class handlers are qualified with, e.g. `App::Controllers`.
    pub controller_namespace: Option<String>,
    /// Middleware response statuses that end a dispatch.
    pub redirect_statuses: Vec<u16>,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            controller_namespace: None,
            redirect_statuses: REDIRECT_STATUSES.to_vec(),
        }
    }
}

impl RouterConfig {
    /// Parses a JSON configuration.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| RouterError::config(format!("invalid router configuration: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Router;

    #[test]
    fn test_defaults() {
        let config = RouterConfig::from_json("{}").unwrap();
        assert_eq!(config, RouterConfig::default());
        assert_eq!(config.redirect_statuses, [301, 302, 303, 307, 308]);
    }

    #[test]
    fn test_from_json() {
        let config = RouterConfig::from_json(
            r#"{"controller_namespace": "App::Controllers", "redirect_statuses": [302]}"#,
        )
        .unwrap();
        assert_eq!(config.controller_namespace.as_deref(), Some("App::Controllers"));

        let router = Router::from_config(&config).unwrap();
        assert_eq!(router.controller_namespace(), Some("App::Controllers"));
        assert!(router.environment().is_redirect(302));
        assert!(!router.environment().is_redirect(301));
    }

    #[test]
    fn test_invalid() {
        assert!(matches!(
            RouterConfig::from_json("[1]"),
            Err(RouterError::Configuration(_))
        ));
        let config = RouterConfig {
            controller_namespace: Some("App\\Controllers".into()),
            ..RouterConfig::default()
        };
        assert!(Router::from_config(&config).is_err());
    }
}
