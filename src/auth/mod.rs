//! Authentication: the provider seam, the session store that wraps it, and
//! the bootstrap state machine that turns sessions into role-bearing
//! profiles for the access guard.

pub mod coordinator;
pub mod guard;
pub mod local;
pub mod password;
pub mod provider;
pub mod resolver;
pub mod session;
pub mod token;

pub use coordinator::{AuthCoordinator, AuthPhase, AuthState, SignUpData};
pub use guard::{GuardDecision, Route, guard, guard_route};
pub use local::PgAuthProvider;
pub use provider::{AuthProvider, Listener, ListenerId, ListenerRegistry};
pub use resolver::{ProfileResolver, Resolution};
pub use session::{SessionStore, Subscription, SubscriptionHandle};
