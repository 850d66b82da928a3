use crate::domain::gatt::AdvertiseSettings;
use crate::domain::models::{AdvertiseError, BondStatus};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::PathBuf;
use tracing::warn;

/// Logging configuration; `RUST_LOG` still overrides `level`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogSettings {
    #[serde(default = "default_level")]
    pub level: String, // "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_false")]
    pub file_logging_enabled: bool,
    #[serde(default = "default_true")]
    pub console_logging_enabled: bool,
    #[serde(default = "default_log_dir")]
    pub log_dir: String, // relative to the working directory
    #[serde(default = "default_prefix")]
    pub file_name_prefix: String,
    #[serde(default = "default_false")]
    pub show_file_line: bool,
    #[serde(default = "default_false")]
    pub show_thread_ids: bool,
    #[serde(default = "default_true")]
    pub show_target: bool,
    #[serde(default = "default_true")]
    pub ansi_colors: bool,
    #[serde(default = "default_rotation")]
    pub rotation: String, // "daily", "hourly", "minutely", "never"
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: default_level(),
            file_logging_enabled: default_false(),
            console_logging_enabled: default_true(),
            log_dir: default_log_dir(),
            file_name_prefix: default_prefix(),
            show_file_line: default_false(),
            show_thread_ids: default_false(),
            show_target: default_true(),
            ansi_colors: default_true(),
            rotation: default_rotation(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}
fn default_true() -> bool {
    true
}
fn default_false() -> bool {
    false
}
fn default_log_dir() -> String {
    "logs".to_string()
}
fn default_prefix() -> String {
    "ble_bind_sample".to_string()
}
fn default_rotation() -> String {
    "daily".to_string()
}

/// One step played by the simulated central
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum PeerStep {
    Connect,
    Read { bond: BondStatus },
    Disconnect,
}

/// Scripted central that talks to the peripheral once it advertises
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerScript {
    #[serde(default = "default_peer_address")]
    pub address: String,
    #[serde(default = "default_step_delay_ms")]
    pub step_delay_ms: u64,
    #[serde(default = "default_steps")]
    pub steps: Vec<PeerStep>,
}

impl Default for PeerScript {
    fn default() -> Self {
        Self {
            address: default_peer_address(),
            step_delay_ms: default_step_delay_ms(),
            steps: default_steps(),
        }
    }
}

fn default_peer_address() -> String {
    "5A:3C:91:0E:7B:D4".to_string()
}
fn default_step_delay_ms() -> u64 {
    500
}
fn default_steps() -> Vec<PeerStep> {
    vec![
        PeerStep::Connect,
        PeerStep::Read {
            bond: BondStatus::NotBonded,
        },
        PeerStep::Read {
            bond: BondStatus::Bonded,
        },
        PeerStep::Disconnect,
    ]
}

/// Behaviour of the in-process Bluetooth stack
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationSettings {
    /// Send the start request as soon as the app is up
    #[serde(default = "default_true")]
    pub auto_start: bool,
    #[serde(default = "default_false")]
    pub fail_add_service: bool,
    #[serde(default)]
    pub advertise_failure: Option<AdvertiseError>,
    #[serde(default = "default_peer_script")]
    pub peer_script: Option<PeerScript>,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            auto_start: default_true(),
            fail_add_service: default_false(),
            advertise_failure: None,
            peer_script: default_peer_script(),
        }
    }
}

impl SimulationSettings {
    /// A stack that only answers requests: no auto start, no scripted peer
    pub fn silent() -> Self {
        Self {
            auto_start: false,
            peer_script: None,
            ..Self::default()
        }
    }
}

fn default_peer_script() -> Option<PeerScript> {
    Some(PeerScript::default())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_device_name")]
    pub device_name: String,

    #[serde(default)]
    pub advertise: AdvertiseSettings,

    #[serde(default)]
    pub simulation: SimulationSettings,

    // Logging Settings
    #[serde(default)]
    pub log_settings: LogSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            device_name: default_device_name(),
            advertise: AdvertiseSettings::default(),
            simulation: SimulationSettings::default(),
            log_settings: LogSettings::default(),
        }
    }
}

fn default_device_name() -> String {
    "BleBindSample".to_string()
}

pub struct SettingsService {
    settings: Settings,
    settings_path: PathBuf,
    file_missing: bool,
}

impl SettingsService {
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self::load(Self::get_settings_path()?))
    }

    /// Load from `settings_path`, falling back to defaults. A file that exists
    /// but cannot be read or parsed is left untouched.
    pub fn load(settings_path: PathBuf) -> Self {
        let (settings, file_missing) = match fs::read_to_string(&settings_path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(settings) => (settings, false),
                Err(e) => {
                    warn!(
                        "Invalid settings in {}, using defaults: {}",
                        settings_path.display(),
                        e
                    );
                    (Settings::default(), false)
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => (Settings::default(), true),
            Err(e) => {
                warn!(
                    "Could not read {}, using defaults: {}",
                    settings_path.display(),
                    e
                );
                (Settings::default(), false)
            }
        };

        Self {
            settings,
            settings_path,
            file_missing,
        }
    }

    fn get_settings_path() -> anyhow::Result<PathBuf> {
        let mut path = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        path.push("BleBindSample");
        fs::create_dir_all(&path)?;
        path.push("settings.json");
        Ok(path)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(&self.settings)?;
        fs::write(&self.settings_path, json)?;
        Ok(())
    }

    /// Only true when no settings file exists yet
    pub fn should_write_defaults(&self) -> bool {
        self.file_missing
    }

    pub fn path(&self) -> &PathBuf {
        &self.settings_path
    }

    pub fn get(&self) -> &Settings {
        &self.settings
    }
}
