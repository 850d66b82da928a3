//! Peripheral Service Module
//!
//! Owns the session and drives it from a single event channel: every stack
//! callback, user action and lifecycle event is processed one at a time, in
//! delivery order, on the task running [`PeripheralService::run`].

use crate::domain::models::{AdvertiseError, GattStatus, SessionEvent, SessionState};
use crate::domain::session::{Effect, PeripheralSession, Transition};
use crate::infrastructure::bluetooth::stack::{BluetoothStack, StackError};
use crate::presentation::display::{label_for, notice_label, DisplaySurface};
use std::collections::VecDeque;
use std::future::Future;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

pub struct PeripheralService<S, D> {
    session: PeripheralSession,
    stack: S,
    display: D,
}

impl<S: BluetoothStack, D: DisplaySurface> PeripheralService<S, D> {
    pub fn new(session: PeripheralSession, stack: S, mut display: D) -> Self {
        display.set_label(&label_for(session.state(), session.adapter()));
        Self {
            session,
            stack,
            display,
        }
    }

    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    pub fn stack(&self) -> &S {
        &self.stack
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    /// Drain events until the channel closes or `shutdown` resolves, then
    /// release everything the session still holds.
    pub async fn run<F>(&mut self, mut events: mpsc::UnboundedReceiver<SessionEvent>, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        info!("Peripheral service running");

        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => {
                        self.dispatch(event);
                    }
                    None => {
                        debug!("Event channel closed");
                        break;
                    }
                },
                _ = &mut shutdown => {
                    info!("Shutdown requested");
                    break;
                }
            }
        }

        self.reset();
        info!("Peripheral service stopped");
    }

    /// Process one event, plus any failure it triggers synchronously
    pub fn dispatch(&mut self, event: SessionEvent) -> SessionState {
        let mut pending = VecDeque::from([event]);
        while let Some(event) = pending.pop_front() {
            let transition = self.session.handle(event);
            if let Some(follow_up) = self.apply(transition) {
                pending.push_back(follow_up);
            }
        }
        self.session.state()
    }

    /// Tear down the session from whatever state it is in
    pub fn reset(&mut self) -> SessionState {
        let transition = self.session.reset();
        if let Some(follow_up) = self.apply(transition) {
            debug!("Dropping {:?} raised during reset", follow_up);
        }
        self.session.state()
    }

    fn apply(&mut self, transition: Transition) -> Option<SessionEvent> {
        if transition.ignored {
            return None;
        }

        let mut follow_up = None;
        for effect in &transition.effects {
            if let Err(e) = self.execute(effect) {
                follow_up = self.failure_event(effect, &e);
                if follow_up.is_some() {
                    error!("Stack refused {:?}: {}", effect, e);
                    break;
                }
                warn!("Stack request failed: {}", e);
            }
        }

        let label = match transition.notice {
            Some(notice) => notice_label(notice),
            None => label_for(transition.to, self.session.adapter()),
        };
        self.display.set_label(&label);

        follow_up
    }

    fn execute(&mut self, effect: &Effect) -> Result<(), StackError> {
        match effect {
            Effect::RegisterServer => self.stack.register_server(),
            Effect::AddService(service) => self.stack.add_service(service),
            Effect::StartAdvertising(request) => self.stack.start_advertising(request),
            Effect::StopAdvertising => self.stack.stop_advertising(),
            Effect::CloseServer => self.stack.close_server(),
            Effect::SendResponse {
                peer,
                request_id,
                response,
            } => self.stack.send_response(peer, *request_id, response),
        }
    }

    /// Requests that fail up front are reported like their async failure
    fn failure_event(&self, effect: &Effect, error: &StackError) -> Option<SessionEvent> {
        match effect {
            Effect::RegisterServer | Effect::AddService(_) => Some(SessionEvent::ServiceAdded {
                status: GattStatus::Failure,
                service: Some(self.session.service().service_uuid),
            }),
            Effect::StartAdvertising(_) => {
                let reason = match error {
                    StackError::AdapterUnavailable => AdvertiseError::FeatureUnsupported,
                    _ => AdvertiseError::InternalError,
                };
                Some(SessionEvent::AdvertiseStarted(Err(reason)))
            }
            _ => None,
        }
    }
}
