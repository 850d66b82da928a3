//! Bluetooth Module
//!
//! Runs the bonded-read peripheral against a Bluetooth stack.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                   PeripheralService                      │
//! │  (single owner of the session, drains the event queue)   │
//! └─────────────────────┬───────────────────────────────────┘
//!          requests     │      ▲ SessionEvent (mpsc)
//!                       ▼      │
//! ┌─────────────────────────────────────────────────────────┐
//! │              BluetoothStack (trait)                      │
//! │   SimulatedStack: in-process stack + scripted peer       │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`stack`] - Capability trait for the host Bluetooth stack
//! - [`simulated`] - In-process stack used by the binary and tests
//! - [`service`] - Event loop applying session transitions

pub mod service;
pub mod simulated;
pub mod stack;

// Re-export main service for convenience
pub use service::PeripheralService;
