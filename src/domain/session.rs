//! Peripheral session state machine
//!
//! Pure transition logic: every event yields the next [`SessionState`] plus the
//! side-effect requests the caller must hand to the Bluetooth stack. Nothing
//! here talks to the stack or the display.
//!
//! ```text
//! Idle ──start──▶ Initializing ──service added──▶ Advertising ──connected──▶ Connected
//!  ▲                  │ failed                        │ start failed            │ disconnected
//!  └──────────────────┴───────────────────────────────┴─────────────────────────┘
//! ```
//!
//! Events that do not apply to the current state (late callbacks for a torn
//! down session, duplicates, missing peer or service references) are ignored.

use crate::domain::gatt::{AdvertiseRequest, ServiceDescriptor};
use crate::domain::models::{
    Adapter, BondStatus, ConnectionState, GattStatus, Notice, Peer, ReadResponse, SessionEvent,
    SessionState,
};
use tracing::{debug, info, warn};

/// Requests for the Bluetooth stack produced by a transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    RegisterServer,
    AddService(ServiceDescriptor),
    StartAdvertising(AdvertiseRequest),
    StopAdvertising,
    CloseServer,
    SendResponse {
        peer: Peer,
        request_id: u32,
        response: ReadResponse,
    },
}

/// Result of feeding one event into the session
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub from: SessionState,
    pub to: SessionState,
    pub effects: Vec<Effect>,
    pub notice: Option<Notice>,
    /// The event did not apply to the state it arrived in
    pub ignored: bool,
}

impl Transition {
    fn ignored(state: SessionState) -> Self {
        Self {
            from: state,
            to: state,
            effects: Vec::new(),
            notice: None,
            ignored: true,
        }
    }
}

/// Read policy: bonded peers get the value, everyone else an auth error
pub fn read_response(bond: BondStatus, service: &ServiceDescriptor) -> ReadResponse {
    match bond {
        BondStatus::Bonded => ReadResponse {
            status: GattStatus::Success,
            offset: 0,
            value: Some(service.characteristic_value().to_vec()),
        },
        BondStatus::NotBonded => ReadResponse {
            status: GattStatus::InsufficientAuthentication,
            offset: 0,
            value: None,
        },
    }
}

/// Owned session state plus the static data it advertises
#[derive(Debug, Clone)]
pub struct PeripheralSession {
    state: SessionState,
    adapter: Adapter,
    service: ServiceDescriptor,
    advertise: AdvertiseRequest,
}

impl PeripheralSession {
    pub fn new(service: ServiceDescriptor, advertise: AdvertiseRequest, adapter: Adapter) -> Self {
        Self {
            state: SessionState::Idle,
            adapter,
            service,
            advertise,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn adapter(&self) -> &Adapter {
        &self.adapter
    }

    pub fn service(&self) -> &ServiceDescriptor {
        &self.service
    }

    /// Apply one event and return what changed
    pub fn handle(&mut self, event: SessionEvent) -> Transition {
        let from = self.state;

        match (from, event) {
            (
                _,
                SessionEvent::ReadRequest {
                    peer, request_id, ..
                },
            ) => match peer {
                Some(peer) => self.answer_read(peer, request_id),
                None => {
                    warn!("Read request without a peer, ignoring");
                    Transition::ignored(from)
                }
            },

            (_, SessionEvent::AdapterStateChanged(adapter)) => self.adapter_changed(adapter),

            (SessionState::Idle, SessionEvent::StartRequested) => {
                if !self.adapter.enabled {
                    info!("Start requested while Bluetooth is disabled");
                    return Transition::ignored(from);
                }
                info!("Creating GATT server");
                self.move_to(
                    SessionState::Initializing,
                    vec![Effect::RegisterServer, Effect::AddService(self.service)],
                )
            }

            (SessionState::Initializing, SessionEvent::ServiceAdded { status, service }) => {
                match service {
                    Some(uuid) if uuid == self.service.service_uuid => {}
                    Some(uuid) => {
                        warn!("Service added callback for unknown service {}", uuid);
                        return Transition::ignored(from);
                    }
                    None => {
                        warn!("Service added callback without a service, ignoring");
                        return Transition::ignored(from);
                    }
                }

                if status.is_success() {
                    info!("Service added: {}", self.service.service_uuid);
                    self.move_to(
                        SessionState::Advertising,
                        vec![Effect::StartAdvertising(self.advertise.clone())],
                    )
                } else {
                    warn!(
                        "Failed to add service {} (status {:#06x})",
                        self.service.service_uuid,
                        status.code()
                    );
                    self.move_to(SessionState::Idle, vec![Effect::CloseServer])
                }
            }

            (SessionState::Advertising, SessionEvent::AdvertiseStarted(result)) => match result {
                Ok(()) => {
                    info!("Advertising as {}", self.adapter.name);
                    self.move_to(SessionState::Advertising, Vec::new())
                }
                Err(e) => {
                    warn!("Advertise failed: {} (code {})", e, e.code());
                    self.release()
                }
            },

            (
                SessionState::Advertising,
                SessionEvent::ConnectionStateChanged {
                    peer: Some(peer),
                    state: ConnectionState::Connected,
                },
            ) => {
                info!("Connected to {}", peer.address);
                self.move_to(SessionState::Connected, vec![Effect::StopAdvertising])
            }

            (
                SessionState::Connected,
                SessionEvent::ConnectionStateChanged {
                    peer: Some(peer),
                    state: ConnectionState::Disconnected,
                },
            ) => {
                info!("Disconnected from {}", peer.address);
                self.release()
            }

            (state, SessionEvent::SessionStopped) if state.has_server() => {
                info!("Session stopped, resetting state");
                self.release()
            }

            (state, event) => {
                debug!("Ignoring {:?} in state {:?}", event, state);
                Transition::ignored(state)
            }
        }
    }

    /// Tear down whatever the session holds. Safe to call from any state.
    pub fn reset(&mut self) -> Transition {
        if self.state.has_server() {
            self.release()
        } else {
            Transition::ignored(self.state)
        }
    }

    fn answer_read(&self, peer: Peer, request_id: u32) -> Transition {
        let response = read_response(peer.bond, &self.service);
        let notice = match peer.bond {
            BondStatus::Bonded => {
                info!("Bonded read request from {}: SUCCESS", peer.address);
                Notice::ReadServed
            }
            BondStatus::NotBonded => {
                info!("Unbonded read request from {}: FAIL", peer.address);
                Notice::ReadRejected
            }
        };

        Transition {
            from: self.state,
            to: self.state,
            effects: vec![Effect::SendResponse {
                peer,
                request_id,
                response,
            }],
            notice: Some(notice),
            ignored: false,
        }
    }

    fn adapter_changed(&mut self, adapter: Adapter) -> Transition {
        let enabled = adapter.enabled;
        info!(
            "Bluetooth adapter {} is {}",
            adapter.name,
            if enabled { "enabled" } else { "disabled" }
        );
        self.adapter = adapter;

        if !enabled && self.state.has_server() {
            return self.release();
        }
        self.move_to(self.state, Vec::new())
    }

    fn release(&mut self) -> Transition {
        self.move_to(
            SessionState::Idle,
            vec![Effect::StopAdvertising, Effect::CloseServer],
        )
    }

    fn move_to(&mut self, to: SessionState, effects: Vec<Effect>) -> Transition {
        let from = self.state;
        self.state = to;
        if from != to {
            debug!("Session {:?} -> {:?}", from, to);
        }
        Transition {
            from,
            to,
            effects,
            notice: None,
            ignored: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::gatt::{CHARACTERISTIC_UUID, SERVICE_UUID};
    use crate::domain::models::AdvertiseError;

    fn session() -> PeripheralSession {
        let service = ServiceDescriptor::sample();
        PeripheralSession::new(
            service,
            AdvertiseRequest::for_service(&service, Default::default()),
            Adapter::enabled("sample"),
        )
    }

    fn service_added(status: GattStatus) -> SessionEvent {
        SessionEvent::ServiceAdded {
            status,
            service: Some(SERVICE_UUID),
        }
    }

    fn connection(state: ConnectionState) -> SessionEvent {
        SessionEvent::ConnectionStateChanged {
            peer: Some(Peer::new("00:11:22:33:44:55", BondStatus::NotBonded)),
            state,
        }
    }

    fn read(bond: BondStatus) -> SessionEvent {
        SessionEvent::ReadRequest {
            peer: Some(Peer::new("00:11:22:33:44:55", bond)),
            request_id: 7,
            offset: 0,
            characteristic: Some(CHARACTERISTIC_UUID),
        }
    }

    fn connected() -> PeripheralSession {
        let mut s = session();
        s.handle(SessionEvent::StartRequested);
        s.handle(service_added(GattStatus::Success));
        s.handle(SessionEvent::AdvertiseStarted(Ok(())));
        s.handle(connection(ConnectionState::Connected));
        assert_eq!(s.state(), SessionState::Connected);
        s
    }

    #[test]
    fn test_start_registers_server_and_adds_service() {
        let mut s = session();
        let t = s.handle(SessionEvent::StartRequested);
        assert_eq!(t.to, SessionState::Initializing);
        assert_eq!(
            t.effects,
            vec![
                Effect::RegisterServer,
                Effect::AddService(ServiceDescriptor::sample())
            ]
        );
    }

    #[test]
    fn test_scenario_advertising() {
        let mut s = session();
        s.handle(SessionEvent::StartRequested);

        let t = s.handle(service_added(GattStatus::Success));
        assert_eq!(t.to, SessionState::Advertising);
        assert!(matches!(t.effects.as_slice(), [Effect::StartAdvertising(r)] if r.data.service_uuids == vec![SERVICE_UUID]));

        let t = s.handle(SessionEvent::AdvertiseStarted(Ok(())));
        assert!(!t.ignored);
        assert!(t.effects.is_empty());
        assert_eq!(s.state(), SessionState::Advertising);
    }

    #[test]
    fn test_scenario_connect_stops_advertising() {
        let mut s = session();
        s.handle(SessionEvent::StartRequested);
        s.handle(service_added(GattStatus::Success));
        let t = s.handle(connection(ConnectionState::Connected));
        assert_eq!(t.to, SessionState::Connected);
        assert_eq!(t.effects, vec![Effect::StopAdvertising]);
    }

    #[test]
    fn test_scenario_unbonded_read_rejected() {
        let mut s = connected();
        let t = s.handle(read(BondStatus::NotBonded));
        assert_eq!(s.state(), SessionState::Connected);
        assert_eq!(t.notice, Some(Notice::ReadRejected));
        match t.effects.as_slice() {
            [Effect::SendResponse {
                request_id,
                response,
                ..
            }] => {
                assert_eq!(*request_id, 7);
                assert_eq!(response.status, GattStatus::InsufficientAuthentication);
                assert_eq!(response.value, None);
            }
            other => panic!("unexpected effects: {:?}", other),
        }
    }

    #[test]
    fn test_bonded_read_served() {
        let mut s = connected();
        let t = s.handle(read(BondStatus::Bonded));
        assert_eq!(s.state(), SessionState::Connected);
        assert_eq!(t.notice, Some(Notice::ReadServed));
        assert!(matches!(
            t.effects.as_slice(),
            [Effect::SendResponse { response, .. }]
                if response.status == GattStatus::Success && response.value == Some(vec![1])
        ));
    }

    #[test]
    fn test_read_policy_depends_only_on_bond() {
        let other = ServiceDescriptor::sample();
        let bonded = read_response(BondStatus::Bonded, &other);
        assert_eq!(
            bonded,
            ReadResponse {
                status: GattStatus::Success,
                offset: 0,
                value: Some(vec![1]),
            }
        );
        let unbonded = read_response(BondStatus::NotBonded, &other);
        assert_eq!(
            unbonded,
            ReadResponse {
                status: GattStatus::InsufficientAuthentication,
                offset: 0,
                value: None,
            }
        );

        // Offset and state do not change the answer.
        for mut s in [session(), connected()] {
            let state = s.state();
            let t = s.handle(SessionEvent::ReadRequest {
                peer: Some(Peer::new("aa", BondStatus::Bonded)),
                request_id: 1,
                offset: 9,
                characteristic: None,
            });
            assert_eq!(s.state(), state);
            assert!(matches!(
                t.effects.as_slice(),
                [Effect::SendResponse { response, .. }] if *response == bonded
            ));
        }
    }

    #[test]
    fn test_scenario_service_add_failure() {
        let mut s = session();
        s.handle(SessionEvent::StartRequested);
        let t = s.handle(service_added(GattStatus::Failure));
        assert_eq!(t.to, SessionState::Idle);
        assert_eq!(t.effects, vec![Effect::CloseServer]);
    }

    #[test]
    fn test_advertise_failure_releases_everything() {
        let mut s = session();
        s.handle(SessionEvent::StartRequested);
        s.handle(service_added(GattStatus::Success));
        let t = s.handle(SessionEvent::AdvertiseStarted(Err(
            AdvertiseError::TooManyAdvertisers,
        )));
        assert_eq!(t.to, SessionState::Idle);
        assert_eq!(t.effects, vec![Effect::StopAdvertising, Effect::CloseServer]);
    }

    #[test]
    fn test_scenario_disconnect_resets() {
        let mut s = connected();
        let t = s.handle(connection(ConnectionState::Disconnected));
        assert_eq!(t.to, SessionState::Idle);
        assert_eq!(t.effects, vec![Effect::StopAdvertising, Effect::CloseServer]);
    }

    #[test]
    fn test_session_stopped_from_every_active_state() {
        let setups: Vec<Vec<SessionEvent>> = vec![
            vec![SessionEvent::StartRequested],
            vec![
                SessionEvent::StartRequested,
                service_added(GattStatus::Success),
            ],
            vec![
                SessionEvent::StartRequested,
                service_added(GattStatus::Success),
                connection(ConnectionState::Connected),
            ],
        ];

        for events in setups {
            let mut s = session();
            for event in events {
                s.handle(event);
            }
            assert!(s.state().has_server());
            let t = s.handle(SessionEvent::SessionStopped);
            assert_eq!(t.to, SessionState::Idle);
            assert!(t.effects.contains(&Effect::CloseServer));
        }
    }

    #[test]
    fn test_reset_is_idempotent() {
        let mut s = connected();
        let first = s.reset();
        assert_eq!(first.to, SessionState::Idle);
        assert!(!first.effects.is_empty());

        let second = s.reset();
        assert!(second.ignored);
        assert!(second.effects.is_empty());
        assert_eq!(s.state(), SessionState::Idle);

        let mut idle = session();
        assert!(idle.reset().ignored);
        assert_eq!(idle.state(), SessionState::Idle);
    }

    #[test]
    fn test_late_callbacks_after_reset_are_ignored() {
        let mut s = session();
        s.handle(SessionEvent::StartRequested);
        s.handle(SessionEvent::SessionStopped);

        for event in [
            service_added(GattStatus::Success),
            SessionEvent::AdvertiseStarted(Ok(())),
            SessionEvent::AdvertiseStarted(Err(AdvertiseError::InternalError)),
            connection(ConnectionState::Connected),
            connection(ConnectionState::Disconnected),
            SessionEvent::SessionStopped,
        ] {
            let t = s.handle(event);
            assert!(t.ignored);
            assert!(t.effects.is_empty());
            assert_eq!(s.state(), SessionState::Idle);
        }
    }

    #[test]
    fn test_missing_references_are_ignored() {
        let mut s = session();
        s.handle(SessionEvent::StartRequested);
        let t = s.handle(SessionEvent::ServiceAdded {
            status: GattStatus::Success,
            service: None,
        });
        assert!(t.ignored);
        assert_eq!(s.state(), SessionState::Initializing);

        s.handle(service_added(GattStatus::Success));
        let t = s.handle(SessionEvent::ConnectionStateChanged {
            peer: None,
            state: ConnectionState::Connected,
        });
        assert!(t.ignored);
        assert_eq!(s.state(), SessionState::Advertising);

        let t = s.handle(SessionEvent::ReadRequest {
            peer: None,
            request_id: 1,
            offset: 0,
            characteristic: Some(CHARACTERISTIC_UUID),
        });
        assert!(t.ignored);
        assert!(t.effects.is_empty());
    }

    #[test]
    fn test_start_ignored_when_active_or_disabled() {
        let mut s = session();
        s.handle(SessionEvent::StartRequested);
        assert!(s.handle(SessionEvent::StartRequested).ignored);

        let mut disabled = session();
        disabled.handle(SessionEvent::AdapterStateChanged(Adapter::disabled("sample")));
        let t = disabled.handle(SessionEvent::StartRequested);
        assert!(t.ignored);
        assert_eq!(disabled.state(), SessionState::Idle);
    }

    #[test]
    fn test_adapter_disabled_tears_down_session() {
        let mut s = connected();
        let t = s.handle(SessionEvent::AdapterStateChanged(Adapter::disabled("sample")));
        assert_eq!(t.to, SessionState::Idle);
        assert!(t.effects.contains(&Effect::CloseServer));
        assert!(!s.adapter().enabled);
    }

    #[test]
    fn test_same_events_same_states() {
        let events = vec![
            SessionEvent::StartRequested,
            service_added(GattStatus::Success),
            SessionEvent::AdvertiseStarted(Ok(())),
            connection(ConnectionState::Connected),
            read(BondStatus::NotBonded),
            read(BondStatus::Bonded),
            connection(ConnectionState::Disconnected),
            SessionEvent::StartRequested,
            service_added(GattStatus::Failure),
        ];

        let run = |events: &[SessionEvent]| {
            let mut s = session();
            events
                .iter()
                .cloned()
                .map(|e| s.handle(e).to)
                .collect::<Vec<_>>()
        };

        let states = run(events.as_slice());
        assert_eq!(states, run(events.as_slice()));
        assert_eq!(
            states,
            vec![
                SessionState::Initializing,
                SessionState::Advertising,
                SessionState::Advertising,
                SessionState::Connected,
                SessionState::Connected,
                SessionState::Connected,
                SessionState::Idle,
                SessionState::Initializing,
                SessionState::Idle,
            ]
        );
    }
}
