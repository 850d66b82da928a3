//! In-process Bluetooth stack
//!
//! Stands in for the host stack: accepts requests, records them, and answers
//! asynchronous ones by pushing callbacks onto the controller's channel the
//! way a real stack marshals them from its own threads.

use crate::domain::gatt::{AdvertiseRequest, ServiceDescriptor, CHARACTERISTIC_UUID};
use crate::domain::models::{
    BondStatus, ConnectionState, GattStatus, Peer, ReadResponse, SessionEvent,
};
use crate::domain::settings::{PeerScript, PeerStep, SimulationSettings};
use crate::infrastructure::bluetooth::stack::{BluetoothStack, StackError};
use tokio::sync::mpsc;
use tokio::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// A request as seen by the simulated stack
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StackCall {
    RegisterServer,
    AddService(Uuid),
    StartAdvertising { service_uuids: Vec<Uuid> },
    StopAdvertising,
    CloseServer,
    SendResponse {
        address: String,
        request_id: u32,
        status: GattStatus,
        value: Option<Vec<u8>>,
    },
}

pub struct SimulatedStack {
    events: mpsc::UnboundedSender<SessionEvent>,
    settings: SimulationSettings,
    server_open: bool,
    advertising: bool,
    calls: Vec<StackCall>,
}

impl SimulatedStack {
    pub fn new(events: mpsc::UnboundedSender<SessionEvent>, settings: SimulationSettings) -> Self {
        Self {
            events,
            settings,
            server_open: false,
            advertising: false,
            calls: Vec::new(),
        }
    }

    pub fn calls(&self) -> &[StackCall] {
        &self.calls
    }

    pub fn is_server_open(&self) -> bool {
        self.server_open
    }

    pub fn is_advertising(&self) -> bool {
        self.advertising
    }

    fn emit(&self, event: SessionEvent) -> Result<(), StackError> {
        self.events
            .send(event)
            .map_err(|_| StackError::Rejected("event channel closed".to_string()))
    }

    fn spawn_peer_script(&self) {
        let Some(script) = self.settings.peer_script.clone() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(play_peer_script(script, self.events.clone()));
            }
            Err(_) => warn!("No async runtime, scripted peer not started"),
        }
    }
}

impl BluetoothStack for SimulatedStack {
    fn register_server(&mut self) -> Result<(), StackError> {
        self.calls.push(StackCall::RegisterServer);
        self.server_open = true;
        Ok(())
    }

    fn add_service(&mut self, service: &ServiceDescriptor) -> Result<(), StackError> {
        self.calls.push(StackCall::AddService(service.service_uuid));
        if !self.server_open {
            return Err(StackError::ServerNotOpen);
        }

        let status = if self.settings.fail_add_service {
            GattStatus::Failure
        } else {
            GattStatus::Success
        };
        self.emit(SessionEvent::ServiceAdded {
            status,
            service: Some(service.service_uuid),
        })
    }

    fn start_advertising(&mut self, request: &AdvertiseRequest) -> Result<(), StackError> {
        self.calls.push(StackCall::StartAdvertising {
            service_uuids: request.data.service_uuids.clone(),
        });

        if let Some(error) = self.settings.advertise_failure {
            return self.emit(SessionEvent::AdvertiseStarted(Err(error)));
        }

        self.advertising = true;
        self.emit(SessionEvent::AdvertiseStarted(Ok(())))?;
        self.spawn_peer_script();
        Ok(())
    }

    fn stop_advertising(&mut self) -> Result<(), StackError> {
        self.calls.push(StackCall::StopAdvertising);
        self.advertising = false;
        Ok(())
    }

    fn close_server(&mut self) -> Result<(), StackError> {
        self.calls.push(StackCall::CloseServer);
        self.server_open = false;
        Ok(())
    }

    fn send_response(
        &mut self,
        peer: &Peer,
        request_id: u32,
        response: &ReadResponse,
    ) -> Result<(), StackError> {
        self.calls.push(StackCall::SendResponse {
            address: peer.address.clone(),
            request_id,
            status: response.status,
            value: response.value.clone(),
        });
        if !self.server_open {
            return Err(StackError::ServerNotOpen);
        }
        info!(
            "Response #{} to {}: status {:#06x}, value {:?}",
            request_id,
            peer.address,
            response.status.code(),
            response.value
        );
        Ok(())
    }
}

fn step_event(step: &PeerStep, address: &str, request_id: u32) -> SessionEvent {
    match step {
        PeerStep::Connect => SessionEvent::ConnectionStateChanged {
            peer: Some(Peer::new(address, BondStatus::NotBonded)),
            state: ConnectionState::Connected,
        },
        PeerStep::Read { bond } => SessionEvent::ReadRequest {
            peer: Some(Peer::new(address, *bond)),
            request_id,
            offset: 0,
            characteristic: Some(CHARACTERISTIC_UUID),
        },
        PeerStep::Disconnect => SessionEvent::ConnectionStateChanged {
            peer: Some(Peer::new(address, BondStatus::NotBonded)),
            state: ConnectionState::Disconnected,
        },
    }
}

/// Replay a scripted central against the controller
pub async fn play_peer_script(script: PeerScript, events: mpsc::UnboundedSender<SessionEvent>) {
    let delay = Duration::from_millis(script.step_delay_ms);
    info!(
        "Scripted peer {} starting ({} steps)",
        script.address,
        script.steps.len()
    );

    for (request_id, step) in (1u32..).zip(script.steps.iter()) {
        tokio::time::sleep(delay).await;
        if events
            .send(step_event(step, &script.address, request_id))
            .is_err()
        {
            debug!("Controller gone, stopping scripted peer");
            return;
        }
    }
}
