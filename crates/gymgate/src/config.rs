//! Application Configuration
//!
//! Settings persisted as key/value pairs in the member store, loaded once at
//! startup into [`GymConfig`] and passed by reference from there.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::store::MemberStore;
use crate::types::{Error, Result};

pub const KEY_GYM_NAME: &str = "gym_name";
pub const KEY_SERIAL_PORT: &str = "serial_port";
pub const KEY_SERIAL_BAUD: &str = "serial_baud";

pub const DEFAULT_GYM_NAME: &str = "GymBase";
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Baud rates offered for the keypad
pub const COMMON_BAUD_RATES: [u32; 5] = [9600, 19200, 38400, 57600, 115200];

/// Keys understood by [`GymConfig`]
pub const KNOWN_KEYS: [&str; 3] = [KEY_GYM_NAME, KEY_SERIAL_PORT, KEY_SERIAL_BAUD];

/// Serial keypad connection settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerialSettings {
    /// Device path (e.g., "/dev/ttyUSB0" or "COM3"); `None` disables the reader
    pub port: Option<String>,
    pub baud_rate: u32,
    /// Per-read timeout; also bounds how long `stop` waits
    pub read_timeout: Duration,
    /// Wait before polling again while the device reports closed
    pub idle_backoff: Duration,
    /// Wait after a read error before retrying
    pub error_backoff: Duration,
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            port: None,
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout: Duration::from_secs(1),
            idle_backoff: Duration::from_millis(500),
            error_backoff: Duration::from_secs(1),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GymConfig {
    pub gym_name: String,
    pub serial: SerialSettings,
}

impl Default for GymConfig {
    fn default() -> Self {
        Self {
            gym_name: DEFAULT_GYM_NAME.to_string(),
            serial: SerialSettings::default(),
        }
    }
}

impl GymConfig {
    /// Load configuration from the store, applying defaults
    pub fn load(store: &dyn MemberStore) -> Result<Self> {
        let gym_name = store.get_config(KEY_GYM_NAME, DEFAULT_GYM_NAME)?;
        let port = store.get_config(KEY_SERIAL_PORT, "")?;
        let baud = store.get_config(KEY_SERIAL_BAUD, &DEFAULT_BAUD_RATE.to_string())?;

        Ok(Self {
            gym_name,
            serial: SerialSettings {
                port: normalize_port(&port),
                baud_rate: parse_baud_rate(&baud)?,
                ..SerialSettings::default()
            },
        })
    }

    /// Apply environment overrides
    ///
    /// Reads:
    /// - `GYMGATE_SERIAL_PORT`: keypad device path
    /// - `GYMGATE_SERIAL_BAUD`: keypad baud rate (ignored with a warning if invalid)
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(port) = std::env::var("GYMGATE_SERIAL_PORT") {
            self.serial.port = normalize_port(&port);
        }
        if let Some(baud) = std::env::var("GYMGATE_SERIAL_BAUD")
            .ok()
            .and_then(|s| baud_override(&s))
        {
            self.serial.baud_rate = baud;
        }
        self
    }

    /// Persist the serial connection settings
    pub fn save_serial(&self, store: &dyn MemberStore) -> Result<()> {
        store.set_config(KEY_SERIAL_PORT, self.serial.port.as_deref().unwrap_or(""))?;
        store.set_config(KEY_SERIAL_BAUD, &self.serial.baud_rate.to_string())
    }
}

/// Validate and store a configuration entry
///
/// Known keys are checked before writing; unknown keys are stored as-is.
pub fn set_entry(store: &dyn MemberStore, key: &str, value: &str) -> Result<()> {
    let value = value.trim();
    match key {
        KEY_GYM_NAME if value.is_empty() => {
            return Err(Error::Config("gym_name must not be empty".to_string()));
        }
        KEY_SERIAL_BAUD => {
            parse_baud_rate(value)?;
        }
        _ => {}
    }
    store.set_config(key, value)
}

fn normalize_port(port: &str) -> Option<String> {
    let port = port.trim();
    (!port.is_empty()).then(|| port.to_string())
}

/// Parse a baud rate, rejecting zero and non-numbers
pub fn parse_baud_rate(value: &str) -> Result<u32> {
    match value.trim().parse::<u32>() {
        Ok(baud) if baud > 0 => {
            if !COMMON_BAUD_RATES.contains(&baud) {
                tracing::warn!("Unusual baud rate configured: {}", baud);
            }
            Ok(baud)
        }
        _ => Err(Error::Config(format!("Invalid baud rate: {}", value))),
    }
}

fn baud_override(value: &str) -> Option<u32> {
    parse_baud_rate(value)
        .inspect_err(|e| tracing::warn!("Ignoring GYMGATE_SERIAL_BAUD: {}", e))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::RedbStore;
    use tempfile::{TempDir, tempdir};

    fn open_store() -> (TempDir, RedbStore) {
        let dir = tempdir().unwrap();
        let store = RedbStore::open(dir.path().join("gym.redb")).unwrap();
        (dir, store)
    }

    #[test]
    fn test_defaults_on_empty_store() {
        let (_dir, store) = open_store();
        let config = GymConfig::load(&store).unwrap();
        assert_eq!(config, GymConfig::default());
        assert_eq!(config.gym_name, "GymBase");
        assert_eq!(config.serial.port, None);
        assert_eq!(config.serial.baud_rate, 9600);
    }

    #[test]
    fn test_load_stored_values() {
        let (_dir, store) = open_store();
        store.set_config(KEY_GYM_NAME, "Iron Temple").unwrap();
        store.set_config(KEY_SERIAL_PORT, "COM3").unwrap();
        store.set_config(KEY_SERIAL_BAUD, "115200").unwrap();

        let config = GymConfig::load(&store).unwrap();
        assert_eq!(config.gym_name, "Iron Temple");
        assert_eq!(config.serial.port.as_deref(), Some("COM3"));
        assert_eq!(config.serial.baud_rate, 115200);
    }

    #[test]
    fn test_corrupt_baud_rate_is_reported() {
        let (_dir, store) = open_store();
        store.set_config(KEY_SERIAL_BAUD, "fast").unwrap();
        assert!(matches!(GymConfig::load(&store), Err(Error::Config(_))));
    }

    #[test]
    fn test_set_entry_validates_known_keys() {
        let (_dir, store) = open_store();
        assert!(set_entry(&store, KEY_SERIAL_BAUD, "0").is_err());
        assert!(set_entry(&store, KEY_SERIAL_BAUD, "abc").is_err());
        assert!(set_entry(&store, KEY_GYM_NAME, "   ").is_err());

        set_entry(&store, KEY_SERIAL_BAUD, " 19200 ").unwrap();
        set_entry(&store, "theme", "dark").unwrap();
        assert_eq!(store.get_config(KEY_SERIAL_BAUD, "").unwrap(), "19200");
        assert_eq!(store.get_config("theme", "").unwrap(), "dark");
    }

    #[test]
    fn test_parse_baud_rate() {
        assert_eq!(parse_baud_rate(" 57600 ").unwrap(), 57600);
        assert_eq!(parse_baud_rate("250000").unwrap(), 250000);
        assert!(matches!(parse_baud_rate("0"), Err(Error::Config(_))));
        assert!(matches!(parse_baud_rate("-9600"), Err(Error::Config(_))));
    }

    #[test]
    fn test_invalid_baud_override_is_ignored() {
        assert_eq!(baud_override("19200"), Some(19200));
        assert_eq!(baud_override("0"), None);
        assert_eq!(baud_override("fast"), None);
    }

    #[test]
    fn test_save_serial_round_trip() {
        let (_dir, store) = open_store();
        let mut config = GymConfig::load(&store).unwrap();
        config.serial.port = Some("/dev/ttyACM0".to_string());
        config.serial.baud_rate = 38400;
        config.save_serial(&store).unwrap();

        let reloaded = GymConfig::load(&store).unwrap();
        assert_eq!(reloaded.serial, config.serial);
    }
}
