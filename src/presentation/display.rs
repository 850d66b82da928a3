//! Display surface
//!
//! The UI is a passive observer: after every applied transition the controller
//! projects the session into one [`Label`] and hands it to a [`DisplaySurface`].

use crate::domain::models::{Adapter, Notice, SessionState};
use std::fmt;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Label {
    Disabled,
    Idle,
    Initializing,
    Advertising { name: String },
    Connected,
    ReadBonded,
    ReadUnbonded,
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => write!(f, "Bluetooth is disabled"),
            Self::Idle => write!(f, "Idle. Press start to advertise"),
            Self::Initializing => write!(f, "Initializing GATT server..."),
            Self::Advertising { name } => write!(f, "Advertising as {}", name),
            Self::Connected => write!(f, "Connected"),
            Self::ReadBonded => write!(f, "Bonded read request: SUCCESS"),
            Self::ReadUnbonded => write!(f, "Unbonded read request: FAIL"),
        }
    }
}

/// One label per state; a disabled adapter overrides the idle label
pub fn label_for(state: SessionState, adapter: &Adapter) -> Label {
    match state {
        SessionState::Idle if !adapter.enabled => Label::Disabled,
        SessionState::Idle => Label::Idle,
        SessionState::Initializing => Label::Initializing,
        SessionState::Advertising => Label::Advertising {
            name: adapter.name.clone(),
        },
        SessionState::Connected => Label::Connected,
    }
}

pub fn notice_label(notice: Notice) -> Label {
    match notice {
        Notice::ReadServed => Label::ReadBonded,
        Notice::ReadRejected => Label::ReadUnbonded,
    }
}

pub trait DisplaySurface {
    fn set_label(&mut self, label: &Label);
}

/// Prints each label change to stdout
#[derive(Debug, Default)]
pub struct ConsoleDisplay {
    current: Option<Label>,
}

impl DisplaySurface for ConsoleDisplay {
    fn set_label(&mut self, label: &Label) {
        if self.current.as_ref() == Some(label) {
            return;
        }
        info!(label = %label, "Display updated");
        println!("[state] {}", label);
        self.current = Some(label.clone());
    }
}

/// Keeps every label it was given
#[derive(Debug, Default)]
pub struct LabelHistory {
    pub labels: Vec<Label>,
}

impl LabelHistory {
    pub fn last(&self) -> Option<&Label> {
        self.labels.last()
    }
}

impl DisplaySurface for LabelHistory {
    fn set_label(&mut self, label: &Label) {
        self.labels.push(label.clone());
    }
}
