//! # Settings Persistence
//!
//! Operator settings that survive a restart: receiver table, current
//! receiver, throttle and control mode, trim, and calibration.
//!
//! Storage sits behind [`SettingsStore`], a small key/value seam. Each key is
//! loaded on its own, so one corrupt entry only costs that entry its saved
//! value. [`JsonFileStore`] keeps everything in one JSON object on disk.

use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::controller::calibration::CalibrationSet;
use crate::controller::mixer::ThrottleMode;
use crate::controller::trim::TrimState;
use crate::error::{Result, TransmitterError};
use crate::link::address_table::{LinkAddressTable, LinkEndpoint};
use crate::packet::layout::ControlMode;

/// Store keys.
pub mod keys {
    pub const CURRENT_RECEIVER: &str = "current_receiver";
    pub const THROTTLE_MODE: &str = "throttle_mode";
    pub const CONTROL_MODE: &str = "control_mode";
    pub const TRIM: &str = "trim";
    pub const CALIBRATION: &str = "calibration";

    /// Key of one receiver slot, `receiver.{slot}`.
    pub fn receiver(slot: usize) -> String {
        format!("receiver.{}", slot)
    }
}

/// Key/value persistence collaborator
///
/// Both directions are fallible. Callers treat a failed load as "use the
/// default" and a failed save as a warning.
#[cfg_attr(test, mockall::automock)]
pub trait SettingsStore: Send {
    /// Value stored under `key`, or `None` if nothing was saved.
    fn load(&self, key: &str) -> Result<Option<Value>>;

    /// Stores one value.
    fn save(&mut self, key: &str, value: Value) -> Result<()>;

    /// Stores several values. Stores that can write them in one go should.
    fn save_all(&mut self, entries: Vec<(String, Value)>) -> Result<()> {
        for (key, value) in entries {
            self.save(&key, value)?;
        }
        Ok(())
    }
}

/// Settings kept as one JSON object in a file
///
/// The whole object is rewritten on every save through a temporary file and
/// a rename, so a crash mid-write leaves the previous file intact.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: Map<String, Value>,
}

impl JsonFileStore {
    /// Opens the store, reading the file if it exists.
    ///
    /// A missing file is an empty store. An unreadable JSON document is
    /// logged and treated as empty; it gets replaced on the next save.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the file exists but cannot be read.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(text) => match serde_json::from_str::<Value>(&text) {
                Ok(Value::Object(map)) => {
                    info!("Loaded {} settings from {}", map.len(), path.display());
                    map
                }
                Ok(_) => {
                    warn!("Settings file {} is not a JSON object, ignoring it", path.display());
                    Map::new()
                }
                Err(e) => {
                    warn!("Settings file {} is corrupt ({}), ignoring it", path.display(), e);
                    Map::new()
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!("No settings file at {}, using defaults", path.display());
                Map::new()
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self { path, entries })
    }

    /// File backing this store
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, entries: &Map<String, Value>) -> Result<()> {
        let persistence = |action: &str, path: &Path, e: io::Error| {
            TransmitterError::Persistence(format!("{} {}: {}", action, path.display(), e))
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| persistence("create", parent, e))?;
            }
        }

        let text = serde_json::to_string_pretty(entries)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, text).map_err(|e| persistence("write", tmp.as_path(), e))?;
        fs::rename(&tmp, &self.path).map_err(|e| persistence("replace", self.path.as_path(), e))?;

        debug!("Wrote {} settings to {}", entries.len(), self.path.display());
        Ok(())
    }
}

impl SettingsStore for JsonFileStore {
    fn load(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.entries.get(key).cloned())
    }

    fn save(&mut self, key: &str, value: Value) -> Result<()> {
        self.save_all(vec![(key.to_string(), value)])
    }

    fn save_all(&mut self, entries: Vec<(String, Value)>) -> Result<()> {
        let mut updated = self.entries.clone();
        updated.extend(entries);
        self.persist(&updated)?;
        self.entries = updated;
        Ok(())
    }
}

/// Everything that persists
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub throttle_mode: ThrottleMode,
    pub control_mode: ControlMode,
    pub trim: TrimState,
    pub calibration: CalibrationSet,
    pub receivers: LinkAddressTable,
}

impl Settings {
    /// Factory settings from configuration.
    ///
    /// Configured receivers replace the generated default for their slot.
    pub fn from_config(config: &Config) -> Self {
        let mut receivers = LinkAddressTable::default();
        for receiver in &config.receivers {
            let endpoint = LinkEndpoint {
                address: receiver.address,
                name: receiver.name.clone(),
                active: receiver.active,
            };
            if let Err(e) = receivers.set_endpoint(receiver.slot, endpoint) {
                warn!("Ignoring configured receiver: {}", e);
            }
        }

        Self {
            throttle_mode: config.mixer.throttle_mode,
            control_mode: config.mixer.control_mode,
            trim: TrimState::default(),
            calibration: config.calibration,
            receivers,
        }
    }

    /// Loads saved settings on top of `defaults`.
    ///
    /// Never fails: each key that is missing, unreadable, or out of range
    /// keeps its default.
    pub fn restore<S: SettingsStore + ?Sized>(store: &S, defaults: &Settings) -> Settings {
        let mut settings = defaults.clone();

        if let Some(mode) = load_key(store, keys::THROTTLE_MODE) {
            settings.throttle_mode = mode;
        }
        if let Some(mode) = load_key(store, keys::CONTROL_MODE) {
            settings.control_mode = mode;
        }
        if let Some(trim) = load_key(store, keys::TRIM) {
            settings.trim = trim;
        }
        if let Some(calibration) = load_key::<CalibrationSet, _>(store, keys::CALIBRATION) {
            match calibration.axes().iter().find(|(_, axis)| axis.min >= axis.max) {
                Some((name, _)) => warn!(
                    "Saved calibration has an empty {} range, keeping defaults",
                    name
                ),
                None => settings.calibration = calibration,
            }
        }

        let mut endpoints: Vec<LinkEndpoint> = settings.receivers.iter().cloned().collect();
        for (slot, entry) in endpoints.iter_mut().enumerate() {
            if let Some(endpoint) = load_key(store, &keys::receiver(slot)) {
                *entry = endpoint;
            }
        }
        let current = load_key(store, keys::CURRENT_RECEIVER)
            .unwrap_or_else(|| settings.receivers.current_slot());
        let fallback = endpoints.iter().position(|endpoint| endpoint.active);

        let restored = LinkAddressTable::from_endpoints(endpoints.clone(), current).or_else(|e| {
            let fallback = fallback.ok_or(e)?;
            warn!("Saved receiver {} not usable, staying on slot {}", current, fallback);
            LinkAddressTable::from_endpoints(endpoints, fallback)
        });
        match restored {
            Ok(receivers) => settings.receivers = receivers,
            Err(e) => warn!("Saved receiver table not usable ({}), keeping defaults", e),
        }

        settings
    }

    /// Writes every key.
    ///
    /// # Errors
    ///
    /// Whatever the store returns; nothing is retried.
    pub fn save_to<S: SettingsStore + ?Sized>(&self, store: &mut S) -> Result<()> {
        let mut entries = vec![
            (
                keys::CURRENT_RECEIVER.to_string(),
                json!(self.receivers.current_slot()),
            ),
            (
                keys::THROTTLE_MODE.to_string(),
                serde_json::to_value(self.throttle_mode)?,
            ),
            (
                keys::CONTROL_MODE.to_string(),
                serde_json::to_value(self.control_mode)?,
            ),
            (keys::TRIM.to_string(), serde_json::to_value(self.trim)?),
            (
                keys::CALIBRATION.to_string(),
                serde_json::to_value(self.calibration)?,
            ),
        ];
        for (slot, endpoint) in self.receivers.iter().enumerate() {
            entries.push((keys::receiver(slot), serde_json::to_value(endpoint)?));
        }

        store.save_all(entries)
    }
}

fn load_key<T, S>(store: &S, key: &str) -> Option<T>
where
    T: DeserializeOwned,
    S: SettingsStore + ?Sized,
{
    match store.load(key) {
        Ok(Some(value)) => match serde_json::from_value(value) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                warn!("Saved {} is unreadable ({}), using default", key, e);
                None
            }
        },
        Ok(None) => {
            debug!("No saved {}", key);
            None
        }
        Err(e) => {
            warn!("Failed to load {}: {}, using default", key, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::calibration::AxisCalibration;
    use crate::link::address_table::LinkAddress;
    use tempfile::tempdir;

    fn customized() -> Settings {
        let mut settings = Settings::from_config(&Config::default());
        settings.throttle_mode = ThrottleMode::Bidirectional;
        settings.control_mode = ControlMode::GyroAssist;
        settings.trim = TrimState {
            pitch: 12,
            roll: -8,
            yaw: 100,
        };
        settings.calibration.pitch = AxisCalibration::new(150, 3900, 2000);
        settings
            .receivers
            .set_endpoint(
                3,
                LinkEndpoint {
                    address: LinkAddress::new([0xC2, 0xC2, 0xC2, 0xC2, 0x01]),
                    name: "Rover".to_string(),
                    active: true,
                },
            )
            .unwrap();
        settings.receivers.restore_current(3).unwrap();
        settings
    }

    // ==================== JsonFileStore Tests ====================

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::open(dir.path().join("settings.json")).unwrap();
        assert_eq!(store.load(keys::TRIM).unwrap(), None);
    }

    #[test]
    fn test_save_then_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");

        let mut store = JsonFileStore::open(&path).unwrap();
        store.save(keys::CURRENT_RECEIVER, json!(2)).unwrap();
        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());

        let reopened = JsonFileStore::open(&path).unwrap();
        assert_eq!(reopened.load(keys::CURRENT_RECEIVER).unwrap(), Some(json!(2)));
    }

    #[test]
    fn test_corrupt_file_is_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();

        let mut store = JsonFileStore::open(&path).unwrap();
        assert_eq!(store.load(keys::TRIM).unwrap(), None);

        // Next save replaces the corrupt file
        store.save(keys::TRIM, json!({"pitch": 4, "roll": 0, "yaw": 0})).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert!(serde_json::from_str::<Value>(&text).is_ok());
    }

    #[test]
    fn test_non_object_file_is_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "[1, 2, 3]").unwrap();

        let store = JsonFileStore::open(&path).unwrap();
        assert_eq!(store.load("0").unwrap(), None);
    }

    #[test]
    fn test_save_to_unwritable_location() {
        let dir = tempdir().unwrap();
        // A regular file where the parent directory should be
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "").unwrap();

        let mut store = JsonFileStore::open(blocker.join("settings.json")).unwrap();
        let result = store.save(keys::TRIM, json!(null));
        assert!(matches!(result, Err(TransmitterError::Persistence(_))));
    }

    #[test]
    fn test_failed_save_keeps_previous_entries() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "").unwrap();

        let mut store = JsonFileStore::open(blocker.join("settings.json")).unwrap();
        assert!(store.save(keys::TRIM, json!({"pitch": 4})).is_err());
        assert!(store
            .save_all(vec![(keys::CURRENT_RECEIVER.to_string(), json!(1))])
            .is_err());

        assert_eq!(store.load(keys::TRIM).unwrap(), None);
        assert_eq!(store.load(keys::CURRENT_RECEIVER).unwrap(), None);
    }

    // ==================== Settings Tests ====================

    #[test]
    fn test_from_config_applies_receivers() {
        let config = Config::from_toml(
            r#"
[mixer]
throttle_mode = "bidirectional"

[[receivers]]
slot = 2
address = "A1A2A3A4A5"
name = "Heli"
"#,
        )
        .unwrap();

        let settings = Settings::from_config(&config);
        assert_eq!(settings.throttle_mode, ThrottleMode::Bidirectional);
        let endpoint = settings.receivers.endpoint(2).unwrap();
        assert_eq!(endpoint.name, "Heli");
        assert!(endpoint.active);
        // Other slots keep their generated defaults
        assert_eq!(
            settings.receivers.endpoint(1),
            Some(&LinkAddressTable::default_for(1))
        );
        assert_eq!(settings.receivers.current_slot(), 0);
    }

    #[test]
    fn test_restore_from_empty_store_gives_defaults() {
        let mut store = MockSettingsStore::new();
        store.expect_load().returning(|_| Ok(None));

        let defaults = Settings::from_config(&Config::default());
        assert_eq!(Settings::restore(&store, &defaults), defaults);
    }

    #[test]
    fn test_restore_survives_load_errors() {
        let mut store = MockSettingsStore::new();
        store
            .expect_load()
            .returning(|_| Err(TransmitterError::Persistence("disk gone".to_string())));

        let defaults = Settings::from_config(&Config::default());
        assert_eq!(Settings::restore(&store, &defaults), defaults);
    }

    #[test]
    fn test_restore_keys_are_independent() {
        let mut store = MockSettingsStore::new();
        store.expect_load().returning(|key| match key {
            keys::THROTTLE_MODE => Ok(Some(json!("sideways"))),
            keys::TRIM => Ok(Some(json!({"pitch": 8, "roll": 0, "yaw": -4}))),
            _ => Ok(None),
        });

        let defaults = Settings::from_config(&Config::default());
        let restored = Settings::restore(&store, &defaults);
        assert_eq!(restored.throttle_mode, defaults.throttle_mode);
        assert_eq!(restored.trim, TrimState { pitch: 8, roll: 0, yaw: -4 });
    }

    #[test]
    fn test_restore_rejects_degenerate_calibration() {
        let mut store = MockSettingsStore::new();
        store.expect_load().returning(|key| match key {
            keys::CALIBRATION => Ok(Some(json!({
                "yaw": {"min": 2000, "max": 2000, "center": 2000}
            }))),
            _ => Ok(None),
        });

        let defaults = Settings::from_config(&Config::default());
        let restored = Settings::restore(&store, &defaults);
        assert_eq!(restored.calibration, defaults.calibration);
    }

    #[test]
    fn test_restore_inactive_current_receiver_falls_back() {
        let mut store = MockSettingsStore::new();
        store.expect_load().returning(|key| match key {
            keys::CURRENT_RECEIVER => Ok(Some(json!(4))),
            _ => Ok(None),
        });

        let defaults = Settings::from_config(&Config::default());
        let restored = Settings::restore(&store, &defaults);
        assert_eq!(restored.receivers.current_slot(), 0);
    }

    #[test]
    fn test_restore_keeps_inactive_slot_zero_when_current_moved() {
        let mut store = MockSettingsStore::new();
        store.expect_load().returning(|key| match key {
            keys::CURRENT_RECEIVER => Ok(Some(json!(2))),
            "receiver.0" => Ok(Some(json!({
                "address": "E7E7E7E7E0", "name": "Spare", "active": false
            }))),
            "receiver.2" => Ok(Some(json!({"address": "A1A2A3A4A5", "name": "Boat"}))),
            _ => Ok(None),
        });

        let defaults = Settings::from_config(&Config::default());
        let restored = Settings::restore(&store, &defaults);

        assert_eq!(restored.receivers.current_slot(), 2);
        assert_eq!(restored.receivers.current().name, "Boat");
        let slot0 = restored.receivers.endpoint(0).unwrap();
        assert_eq!(slot0.name, "Spare");
        assert!(!slot0.active);
    }

    #[test]
    fn test_restore_falls_back_to_first_active_slot() {
        let mut store = MockSettingsStore::new();
        store.expect_load().returning(|key| match key {
            keys::CURRENT_RECEIVER => Ok(Some(json!(4))),
            "receiver.0" => Ok(Some(json!({
                "address": "E7E7E7E7E0", "name": "RX1", "active": false
            }))),
            "receiver.3" => Ok(Some(json!({"address": "C2C2C2C2C2", "name": "Car"}))),
            _ => Ok(None),
        });

        let defaults = Settings::from_config(&Config::default());
        let restored = Settings::restore(&store, &defaults);
        assert_eq!(restored.receivers.current_slot(), 3);
        assert!(!restored.receivers.endpoint(0).unwrap().active);
    }

    #[test]
    fn test_save_to_writes_every_key() {
        let mut store = MockSettingsStore::new();
        store
            .expect_save_all()
            .withf(|entries| {
                let keys: Vec<&str> = entries.iter().map(|(k, _)| k.as_str()).collect();
                keys.contains(&"current_receiver")
                    && keys.contains(&"throttle_mode")
                    && keys.contains(&"control_mode")
                    && keys.contains(&"trim")
                    && keys.contains(&"calibration")
                    && keys.contains(&"receiver.0")
                    && keys.contains(&"receiver.4")
                    && entries.len() == 10
            })
            .times(1)
            .returning(|_| Ok(()));

        let settings = Settings::from_config(&Config::default());
        assert!(settings.save_to(&mut store).is_ok());
    }

    #[test]
    fn test_save_to_reports_store_failure() {
        let mut store = MockSettingsStore::new();
        store
            .expect_save_all()
            .returning(|_| Err(TransmitterError::Persistence("read-only".to_string())));

        let settings = Settings::from_config(&Config::default());
        assert!(matches!(
            settings.save_to(&mut store),
            Err(TransmitterError::Persistence(_))
        ));
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let saved = customized();

        let mut store = JsonFileStore::open(&path).unwrap();
        saved.save_to(&mut store).unwrap();

        let reopened = JsonFileStore::open(&path).unwrap();
        let defaults = Settings::from_config(&Config::default());
        let restored = Settings::restore(&reopened, &defaults);

        assert_eq!(restored, saved);
        assert_eq!(restored.receivers.current().name, "Rover");
    }
}
