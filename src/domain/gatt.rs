//! GATT service and advertising definitions
//!
//! The peripheral publishes exactly one primary service with one
//! characteristic. The characteristic is read-only and its read permission is
//! "encrypted": the stack only delivers a successful read over a bonded link.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Primary service UUID advertised by the peripheral
pub const SERVICE_UUID: Uuid = Uuid::from_u128(0xc958edeb_9ad5_456c_929f_f6ac38a6e353);

/// Bonded-read characteristic UUID
pub const CHARACTERISTIC_UUID: Uuid = Uuid::from_u128(0xed82c27e_63ea_48bb_ac3b_6fc39f1b5582);

/// Value served to bonded peers
pub const CHARACTERISTIC_VALUE: &[u8] = &[1];

/// Characteristic properties (what a client may attempt)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Property {
    Read,
}

/// Characteristic permissions (what the stack enforces)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    ReadEncrypted,
}

/// Static description of the single service exposed by the peripheral
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceDescriptor {
    pub service_uuid: Uuid,
    pub characteristic_uuid: Uuid,
    pub properties: &'static [Property],
    pub permissions: &'static [Permission],
    value: &'static [u8],
}

impl ServiceDescriptor {
    /// The bonded-read sample service
    pub const fn sample() -> Self {
        Self {
            service_uuid: SERVICE_UUID,
            characteristic_uuid: CHARACTERISTIC_UUID,
            properties: &[Property::Read],
            permissions: &[Permission::ReadEncrypted],
            value: CHARACTERISTIC_VALUE,
        }
    }

    pub fn characteristic_value(&self) -> &'static [u8] {
        self.value
    }

    /// True when reads must arrive over an encrypted (bonded) link
    pub fn requires_encryption(&self) -> bool {
        self.permissions.contains(&Permission::ReadEncrypted)
    }
}

impl Default for ServiceDescriptor {
    fn default() -> Self {
        Self::sample()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvertiseMode {
    LowPower,
    Balanced,
    LowLatency,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxPowerLevel {
    UltraLow,
    Low,
    Medium,
    High,
}

/// Radio parameters for advertising
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvertiseSettings {
    #[serde(default = "default_mode")]
    pub mode: AdvertiseMode,
    #[serde(default = "default_true")]
    pub connectable: bool,
    /// Advertising duration limit in milliseconds; 0 advertises until stopped
    #[serde(default)]
    pub timeout_ms: u32,
    #[serde(default = "default_tx_power")]
    pub tx_power: TxPowerLevel,
    #[serde(default = "default_true")]
    pub include_device_name: bool,
}

impl Default for AdvertiseSettings {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            connectable: default_true(),
            timeout_ms: 0,
            tx_power: default_tx_power(),
            include_device_name: default_true(),
        }
    }
}

fn default_mode() -> AdvertiseMode {
    AdvertiseMode::LowLatency
}
fn default_tx_power() -> TxPowerLevel {
    TxPowerLevel::High
}
fn default_true() -> bool {
    true
}

/// Payload carried in advertising packets
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvertiseData {
    pub include_device_name: bool,
    pub service_uuids: Vec<Uuid>,
}

/// Everything the stack needs to start advertising a service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvertiseRequest {
    pub settings: AdvertiseSettings,
    pub data: AdvertiseData,
}

impl AdvertiseRequest {
    pub fn for_service(service: &ServiceDescriptor, settings: AdvertiseSettings) -> Self {
        let data = AdvertiseData {
            include_device_name: settings.include_device_name,
            service_uuids: vec![service.service_uuid],
        };
        Self { settings, data }
    }
}
