//! Startup configuration for the authentication boundary. The loader builds
//! the order-token codec exactly once so request handlers receive it by
//! reference instead of reaching for ambient globals; a process without a
//! usable codec key must not serve traffic.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::crypto::order_tokens::OrderTokenCodec;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file unreadable: {0}")]
    Io(String),
    #[error("config parse failed: {0}")]
    Parse(String),
    #[error("codec key error: {0}")]
    Codec(String),
    #[error("no usable codec key source configured")]
    MissingKeySource,
}

#[derive(Debug, Deserialize)]
pub struct CodecKeyConfig {
    /// Environment variable holding the base64-encoded 32 byte key.
    pub key_env: Option<String>,
    /// Path to a file that contains the base64-encoded key.
    pub key_path: Option<PathBuf>,
}

impl CodecKeyConfig {
    fn build_codec(&self) -> Result<OrderTokenCodec, ConfigError> {
        if let Some(var) = &self.key_env {
            return OrderTokenCodec::from_env_var(var)
                .map_err(|e| ConfigError::Codec(format!("{e}")));
        }
        if let Some(path) = &self.key_path {
            return OrderTokenCodec::from_key_file(path)
                .map_err(|e| ConfigError::Codec(format!("{e}")));
        }
        Err(ConfigError::MissingKeySource)
    }
}

#[derive(Debug, Deserialize)]
pub struct RawStorefrontConfig {
    pub codec: CodecKeyConfig,
    /// Optional validity window for order tokens, in seconds. Absent means
    /// tokens never expire.
    #[serde(rename = "orderTokenTtlSecs")]
    pub order_token_ttl_secs: Option<u64>,
}

/// Runtime values handed to the request layer at startup.
#[derive(Debug)]
pub struct RuntimeConfig {
    pub order_tokens: OrderTokenCodec,
}

/// Loads the JSON configuration file and constructs the codec. Key bytes
/// never leave this function.
pub fn load_config(path: impl AsRef<Path>) -> Result<RuntimeConfig, ConfigError> {
    let raw_json = fs::read_to_string(&path).map_err(|e| ConfigError::Io(format!("{e}")))?;
    let raw_config: RawStorefrontConfig =
        serde_json::from_str(&raw_json).map_err(|e| ConfigError::Parse(format!("{e}")))?;

    let mut codec = raw_config.codec.build_codec()?;
    if let Some(secs) = raw_config.order_token_ttl_secs {
        codec = codec.with_ttl(Duration::from_secs(secs));
    }

    Ok(RuntimeConfig {
        order_tokens: codec,
    })
}

#[cfg(test)]
mod tests {
    use super::{load_config, ConfigError};
    use base64::engine::general_purpose::STANDARD_NO_PAD;
    use base64::Engine;
    use serde_json::json;
    use std::fs;
    use tempfile::NamedTempFile;

    #[test]
    fn loads_codec_from_env_key() {
        let var = "STOREFRONT_CONFIG_KEY_TEST";
        std::env::set_var(var, STANDARD_NO_PAD.encode([3u8; 32]));

        let payload = json!({
            "codec": { "key_env": var, "key_path": null },
            "orderTokenTtlSecs": 3600
        });
        let file = NamedTempFile::new().expect("temp file");
        fs::write(file.path(), serde_json::to_vec(&payload).unwrap()).unwrap();

        let config = load_config(file.path()).expect("config should load");
        let token = config.order_tokens.encode(42).unwrap();
        assert_eq!(config.order_tokens.decode(&token).unwrap(), 42);
    }

    #[test]
    fn loads_codec_from_key_file() {
        let key_file = NamedTempFile::new().expect("temp key file");
        fs::write(key_file.path(), STANDARD_NO_PAD.encode([4u8; 32])).unwrap();

        let payload = json!({
            "codec": { "key_env": null, "key_path": key_file.path() }
        });
        let config_file = NamedTempFile::new().expect("temp file");
        fs::write(config_file.path(), serde_json::to_vec(&payload).unwrap()).unwrap();

        let config = load_config(config_file.path()).expect("config should load");
        let token = config.order_tokens.encode(7).unwrap();
        assert_eq!(config.order_tokens.decode(&token).unwrap(), 7);
    }

    #[test]
    fn missing_key_source_is_fatal() {
        let payload = json!({ "codec": { "key_env": null, "key_path": null } });
        let file = NamedTempFile::new().expect("temp file");
        fs::write(file.path(), serde_json::to_vec(&payload).unwrap()).unwrap();

        let err = load_config(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::MissingKeySource));
    }

    #[test]
    fn malformed_key_is_a_codec_error() {
        let var = "STOREFRONT_CONFIG_BAD_KEY_TEST";
        std::env::set_var(var, "not base64!");

        let payload = json!({ "codec": { "key_env": var, "key_path": null } });
        let file = NamedTempFile::new().expect("temp file");
        fs::write(file.path(), serde_json::to_vec(&payload).unwrap()).unwrap();

        let err = load_config(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Codec(_)));
    }

    #[test]
    fn missing_config_file_is_an_io_error() {
        let err = load_config("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
