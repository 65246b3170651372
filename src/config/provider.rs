use serde::Deserialize;
use std::fmt;

use crate::config::settings::SettingsConfig;

/// ================================
/// Full service configuration
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    pub provider: ProviderConfig,
    #[serde(default)]
    pub settings: SettingsConfig,
}

/// ================================
/// Identity provider
/// ================================
#[derive(Deserialize, Clone)]
pub struct ProviderConfig {
    /// e.g. https://idp.example, token requests go to `<base_uri>/oauth/token`
    pub base_uri: String,
    pub audience: String,
    pub client_id: String,
    pub client_secret: String,
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("base_uri", &self.base_uri)
            .field("audience", &self.audience)
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .finish()
    }
}
