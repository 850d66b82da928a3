//! Bluetooth LE peripheral that advertises one GATT service and serves its
//! characteristic only to bonded peers.

pub mod domain;
pub mod infrastructure;
pub mod presentation;
