//! In-memory push transport for unit tests.

use std::sync::{Arc, Mutex};

use repack_shared::{ClientCommand, PushError, Registration, ServerEvent};

use super::connection::{
    ConnectionState, EventHandlers, PushConnector, PushLink, SharedRegistration,
};
use crate::lock;

#[derive(Default)]
struct FakeState {
    opened: usize,
    sent: Vec<ClientCommand>,
    closed: bool,
    initial: Option<ConnectionState>,
    state: Option<Arc<Mutex<ConnectionState>>>,
    registration: Option<SharedRegistration>,
    handlers: Option<EventHandlers>,
}

/// Records opens and sends; the latest link can be driven from the test.
#[derive(Clone, Default)]
pub struct FakeConnector {
    inner: Arc<Mutex<FakeState>>,
}

impl FakeConnector {
    pub fn with_initial_state(state: ConnectionState) -> Self {
        let connector = Self::default();
        lock(&connector.inner).initial = Some(state);
        connector
    }

    pub fn opened(&self) -> usize {
        lock(&self.inner).opened
    }

    pub fn sent(&self) -> Vec<ClientCommand> {
        lock(&self.inner).sent.clone()
    }

    pub fn closed(&self) -> bool {
        lock(&self.inner).closed
    }

    pub fn registration(&self) -> Option<Registration> {
        let inner = lock(&self.inner);
        inner.registration.as_ref().map(|r| lock(r).clone())
    }

    pub fn handler_count(&self) -> usize {
        lock(&self.inner).handlers.as_ref().map_or(0, EventHandlers::len)
    }

    pub fn set_state(&self, state: ConnectionState) {
        if let Some(current) = lock(&self.inner).state.as_ref() {
            *lock(current) = state;
        }
    }

    /// Deliver an event to the latest link's handlers.
    pub fn emit(&self, event: ServerEvent) {
        let handlers = lock(&self.inner).handlers.clone();
        if let Some(handlers) = handlers {
            handlers.dispatch(&event);
        }
    }
}

struct FakeLink {
    state: Arc<Mutex<ConnectionState>>,
    inner: Arc<Mutex<FakeState>>,
}

impl PushLink for FakeLink {
    fn state(&self) -> ConnectionState {
        lock(&self.state).clone()
    }

    fn send(&self, command: ClientCommand) -> Result<(), PushError> {
        if self.state().is_terminal() {
            return Err(PushError::Closed);
        }
        lock(&self.inner).sent.push(command);
        Ok(())
    }

    fn close(&self) {
        *lock(&self.state) = ConnectionState::Disconnected;
        lock(&self.inner).closed = true;
    }
}

impl PushConnector for FakeConnector {
    fn open(
        &self,
        _endpoint: &str,
        registration: SharedRegistration,
        handlers: EventHandlers,
    ) -> Box<dyn PushLink> {
        let mut inner = lock(&self.inner);
        let state = Arc::new(Mutex::new(
            inner.initial.clone().unwrap_or(ConnectionState::Connected),
        ));
        inner.opened += 1;
        inner.closed = false;
        inner.state = Some(state.clone());
        inner.registration = Some(registration);
        inner.handlers = Some(handlers);
        Box::new(FakeLink {
            state,
            inner: self.inner.clone(),
        })
    }
}
