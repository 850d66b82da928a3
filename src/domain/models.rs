use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Lifecycle of the peripheral session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Initializing,
    Advertising,
    Connected,
}

impl SessionState {
    /// A GATT server instance exists in every non-idle state
    pub fn has_server(&self) -> bool {
        !matches!(self, Self::Idle)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BondStatus {
    Bonded,
    NotBonded,
}

/// A remote central as reported by the stack
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Peer {
    pub address: String,
    pub bond: BondStatus,
}

impl Peer {
    pub fn new(address: impl Into<String>, bond: BondStatus) -> Self {
        Self {
            address: address.into(),
            bond,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connected,
    Disconnected,
}

/// Status codes carried in GATT responses and callbacks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GattStatus {
    Success,
    InsufficientAuthentication,
    Failure,
}

impl GattStatus {
    pub fn code(&self) -> u16 {
        match self {
            Self::Success => 0x0000,
            Self::InsufficientAuthentication => 0x0005,
            Self::Failure => 0x0101,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

/// Reasons the stack gives for refusing to advertise
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvertiseError {
    #[error("advertise data too large")]
    DataTooLarge,
    #[error("too many advertisers")]
    TooManyAdvertisers,
    #[error("advertising already started")]
    AlreadyStarted,
    #[error("internal stack error")]
    InternalError,
    #[error("advertising not supported by this adapter")]
    FeatureUnsupported,
}

impl AdvertiseError {
    pub fn code(&self) -> u8 {
        match self {
            Self::DataTooLarge => 1,
            Self::TooManyAdvertisers => 2,
            Self::AlreadyStarted => 3,
            Self::InternalError => 4,
            Self::FeatureUnsupported => 5,
        }
    }
}

/// Response sent back to a peer for a characteristic read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadResponse {
    pub status: GattStatus,
    pub offset: u16,
    pub value: Option<Vec<u8>>,
}

/// Local adapter power state and advertised name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Adapter {
    pub enabled: bool,
    pub name: String,
}

impl Adapter {
    pub fn enabled(name: impl Into<String>) -> Self {
        Self {
            enabled: true,
            name: name.into(),
        }
    }

    pub fn disabled(name: impl Into<String>) -> Self {
        Self {
            enabled: false,
            name: name.into(),
        }
    }
}

/// Everything that can happen to the session, in delivery order
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// The user asked to start advertising
    StartRequested,
    ServiceAdded {
        status: GattStatus,
        service: Option<Uuid>,
    },
    AdvertiseStarted(Result<(), AdvertiseError>),
    ConnectionStateChanged {
        peer: Option<Peer>,
        state: ConnectionState,
    },
    ReadRequest {
        peer: Option<Peer>,
        request_id: u32,
        offset: u16,
        characteristic: Option<Uuid>,
    },
    /// Host lifecycle ended the session (e.g. app sent to background)
    SessionStopped,
    AdapterStateChanged(Adapter),
}

/// Transient outcomes shown in place of the state label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    ReadServed,
    ReadRejected,
}
