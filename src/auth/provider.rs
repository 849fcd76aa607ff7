use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::error::PortalError;
use crate::models::{AuthChange, Identity, Session};

/// Capacity of each listener's event queue. Emitters wait when it is full.
pub const EVENT_BUFFER: usize = 16;

pub type ListenerId = u64;

/// A registered auth listener: its id and the ordered event stream.
pub struct Listener {
    pub id: ListenerId,
    pub events: mpsc::Receiver<AuthChange>,
}

/// Issues sessions and notifies listeners of every auth change.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// The persisted session, if any is still valid.
    async fn get_session(&self) -> Result<Option<Session>, PortalError>;

    async fn sign_up(&self, email: &str, password: &str) -> Result<Identity, PortalError>;

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session, PortalError>;

    async fn sign_out(&self) -> Result<(), PortalError>;

    fn on_auth_state_change(&self) -> Listener;

    /// Drop a listener. Unknown ids are ignored.
    fn unsubscribe(&self, id: ListenerId);
}

/// Fan-out of auth changes to registered listeners, in emission order.
#[derive(Default)]
pub struct ListenerRegistry {
    next_id: AtomicU64,
    senders: Mutex<Vec<(ListenerId, mpsc::Sender<AuthChange>)>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self) -> Listener {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        self.senders.lock().push((id, tx));
        Listener { id, events: rx }
    }

    pub fn remove(&self, id: ListenerId) {
        self.senders.lock().retain(|(listener, _)| *listener != id);
    }

    pub fn len(&self) -> usize {
        self.senders.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deliver `change` to every listener. Listeners whose receiver is gone
    /// are pruned.
    pub async fn emit(&self, change: AuthChange) {
        let senders: Vec<_> = self.senders.lock().clone();

        for (id, tx) in senders {
            if tx.send(change.clone()).await.is_err() {
                tracing::debug!(listener = id, "Auth listener closed, removing");
                self.remove(id);
            }
        }
    }
}
