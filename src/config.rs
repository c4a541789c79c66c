//! Configuration management
//!
//! Optional TOML file. Every section and field falls back to its default,
//! so an empty file is a valid configuration.
//!
//! ```toml
//! [device]
//! address = "/dev/ttyUSB0"
//! half_speed = false
//!
//! [session]
//! response_timeout_ms = 500
//! cache_policy = "always"
//! length_field = "full"
//! ```

use crate::constants::{
    DEFAULT_IDENTIFY_ATTEMPTS, DEFAULT_POLL_INTERVAL_US, DEFAULT_RESPONSE_TIMEOUT_MS,
};
use crate::error::{DvError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

// =============================================================================
// Application Configuration
// =============================================================================

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub device: DeviceConfig,
    pub session: SessionConfig,
}

/// Vocoder device selection
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Serial device path or `ip:port` of a vocoder server (empty = none)
    pub address: String,
    /// Use 230400 baud instead of 460800 on serial devices
    pub half_speed: bool,
}

// =============================================================================
// Session Configuration
// =============================================================================

/// When the controller records a requested rate or gain as current
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CachePolicy {
    /// Record the request whether or not the chip acknowledged it.
    /// A failed reconfiguration is not retried by later frames.
    #[default]
    Always,
    /// Record only acknowledged requests; a failed reconfiguration fails
    /// the frame and is retried on the next one.
    OnSuccess,
}

/// How the 16-bit payload length of inbound packets is decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LengthField {
    /// Both bytes, big-endian
    #[default]
    Full,
    /// Legacy firmware: high byte masked with 0x0F
    Masked,
}

impl LengthField {
    /// Payload length from the two length bytes
    pub fn decode(self, hi: u8, lo: u8) -> usize {
        let hi = match self {
            Self::Full => hi,
            Self::Masked => hi & 0x0F,
        };
        u16::from_be_bytes([hi, lo]) as usize
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Time budget for one response (milliseconds)
    pub response_timeout_ms: u64,
    /// Pause between empty reads (microseconds)
    pub poll_interval_us: u64,
    /// Responses inspected while waiting for the chip to identify itself
    pub identify_attempts: u32,
    /// Rate/gain cache update policy
    pub cache_policy: CachePolicy,
    /// Inbound length field decoding
    pub length_field: LengthField,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            response_timeout_ms: DEFAULT_RESPONSE_TIMEOUT_MS,
            poll_interval_us: DEFAULT_POLL_INTERVAL_US,
            identify_attempts: DEFAULT_IDENTIFY_ATTEMPTS,
            cache_policy: CachePolicy::Always,
            length_field: LengthField::Full,
        }
    }
}

impl SessionConfig {
    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_micros(self.poll_interval_us)
    }

    /// Check values that would make every exchange fail
    pub fn validate(&self) -> Result<()> {
        if self.response_timeout_ms == 0 {
            return Err(DvError::ConfigValidation {
                field: "response_timeout_ms",
                reason: "must be greater than zero".into(),
            });
        }
        if self.identify_attempts == 0 {
            return Err(DvError::ConfigValidation {
                field: "identify_attempts",
                reason: "must be greater than zero".into(),
            });
        }
        if self.poll_interval() >= self.response_timeout() {
            return Err(DvError::ConfigValidation {
                field: "poll_interval_us",
                reason: format!(
                    "{}us is not shorter than the {}ms response timeout",
                    self.poll_interval_us, self.response_timeout_ms
                ),
            });
        }
        Ok(())
    }
}

// =============================================================================
// Loading
// =============================================================================

/// Load and validate a config file
pub fn load(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path).map_err(|e| DvError::ConfigRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    let config: Config = toml::from_str(&content).map_err(|e| DvError::ConfigValidation {
        field: "config",
        reason: format!("{}: {}", path.display(), e),
    })?;

    config.session.validate()?;
    Ok(config)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_session_config_values() {
        let config = SessionConfig::default();

        assert_eq!(config.response_timeout_ms, DEFAULT_RESPONSE_TIMEOUT_MS);
        assert_eq!(config.poll_interval_us, DEFAULT_POLL_INTERVAL_US);
        assert_eq!(config.identify_attempts, DEFAULT_IDENTIFY_ATTEMPTS);
        assert_eq!(config.cache_policy, CachePolicy::Always);
        assert_eq!(config.length_field, LengthField::Full);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_empty_file() {
        let config: Config = toml::from_str("").unwrap();

        assert_eq!(config.device.address, "");
        assert!(!config.device.half_speed);
        assert_eq!(config.session.cache_policy, CachePolicy::Always);
    }

    #[test]
    fn test_config_partial_session_section() {
        let partial_toml = r#"
[session]
cache_policy = "on_success"
length_field = "masked"
"#;

        let config: Config = toml::from_str(partial_toml).unwrap();

        assert_eq!(config.session.cache_policy, CachePolicy::OnSuccess);
        assert_eq!(config.session.length_field, LengthField::Masked);
        assert_eq!(
            config.session.response_timeout_ms,
            DEFAULT_RESPONSE_TIMEOUT_MS
        );
    }

    #[test]
    fn test_config_serialize_deserialize_roundtrip() {
        let config = Config {
            device: DeviceConfig {
                address: "172.18.0.2:2345".to_string(),
                half_speed: true,
            },
            session: SessionConfig {
                response_timeout_ms: 250,
                poll_interval_us: 20,
                identify_attempts: 3,
                cache_policy: CachePolicy::OnSuccess,
                length_field: LengthField::Masked,
            },
        };

        let toml_str = toml::to_string_pretty(&config).unwrap();
        let restored: Config = toml::from_str(&toml_str).unwrap();

        assert_eq!(restored.device.address, "172.18.0.2:2345");
        assert!(restored.device.half_speed);
        assert_eq!(restored.session.response_timeout_ms, 250);
        assert_eq!(restored.session.identify_attempts, 3);
        assert_eq!(restored.session.cache_policy, CachePolicy::OnSuccess);
        assert_eq!(restored.session.length_field, LengthField::Masked);
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let config = SessionConfig {
            response_timeout_ms: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(DvError::ConfigValidation {
                field: "response_timeout_ms",
                ..
            })
        ));
    }

    #[test]
    fn test_validate_rejects_slow_poll() {
        let config = SessionConfig {
            response_timeout_ms: 1,
            poll_interval_us: 1000,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_length_field_decode() {
        assert_eq!(LengthField::Full.decode(0x01, 0x42), 322);
        assert_eq!(LengthField::Full.decode(0xF1, 0x42), 0xF142);
        assert_eq!(LengthField::Masked.decode(0xF1, 0x42), 322);
    }

    #[test]
    fn test_load_missing_file() {
        let path = std::env::temp_dir().join("serialdv-no-such-config.toml");
        assert!(matches!(load(&path), Err(DvError::ConfigRead { .. })));
    }

    #[test]
    fn test_load_file() {
        let path = std::env::temp_dir().join(format!(
            "serialdv-config-{}.toml",
            std::process::id()
        ));
        fs::write(&path, "[device]\naddress = \"/dev/ttyUSB0\"\n").unwrap();

        let config = load(&path).unwrap();
        let _ = fs::remove_file(&path);

        assert_eq!(config.device.address, "/dev/ttyUSB0");
    }
}
