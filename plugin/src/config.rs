// Load-once host configuration

use serde_json::Value;

use meshbridge_core::codec;
use meshbridge_core::types::ApiKey;

/// Values the host app ships in its static configuration, read once at
/// bridge construction and used only as defaults for `initialize`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BridgeConfig {
    pub api_key: Option<ApiKey>,
    pub verbose_logging: bool,
}

impl BridgeConfig {
    /// Parse from the host's configuration object. A malformed `apiKey`
    /// silently becomes absent, per the boundary rule for identifiers.
    pub fn from_value(value: &Value) -> Self {
        let api_key = value
            .get("apiKey")
            .and_then(Value::as_str)
            .and_then(codec::decode_uuid)
            .map(ApiKey::new);
        let verbose_logging = value
            .get("verboseLogging")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        if api_key.is_none() && value.get("apiKey").is_some() {
            tracing::warn!("configured apiKey is not a canonical UUID, ignoring");
        }
        Self {
            api_key,
            verbose_logging,
        }
    }
}
