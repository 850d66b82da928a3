//! Bluetooth Stack Capability
//!
//! What the peripheral needs from the host Bluetooth stack. Every request is
//! fire-and-forget: an `Ok` only means the request was accepted, the outcome
//! arrives later as a [`SessionEvent`](crate::domain::models::SessionEvent)
//! on the controller's channel.

use crate::domain::gatt::{AdvertiseRequest, ServiceDescriptor};
use crate::domain::models::{Peer, ReadResponse};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StackError {
    #[error("Bluetooth adapter is unavailable")]
    AdapterUnavailable,
    #[error("GATT server is not open")]
    ServerNotOpen,
    #[error("stack rejected request: {0}")]
    Rejected(String),
}

pub trait BluetoothStack {
    /// Open a GATT server instance
    fn register_server(&mut self) -> Result<(), StackError>;

    /// Publish the service; answered by `ServiceAdded`
    fn add_service(&mut self, service: &ServiceDescriptor) -> Result<(), StackError>;

    /// Answered by `AdvertiseStarted`
    fn start_advertising(&mut self, request: &AdvertiseRequest) -> Result<(), StackError>;

    /// Must be a no-op when not advertising
    fn stop_advertising(&mut self) -> Result<(), StackError>;

    /// Must be a no-op when no server is open
    fn close_server(&mut self) -> Result<(), StackError>;

    fn send_response(
        &mut self,
        peer: &Peer,
        request_id: u32,
        response: &ReadResponse,
    ) -> Result<(), StackError>;
}
