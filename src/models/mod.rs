mod identity;
mod notification;
mod profile;
mod project;
mod project_update;
mod session;

pub use identity::{IdentityRecord, RefreshToken};
pub use notification::{NotificationErrorBody, NotificationRequest, NotificationResponse, UpdateType};
pub use profile::{NewProfile, Profile, Role};
pub use project::{NewProject, Project, ProjectChanges, ProjectStatus};
pub(crate) use project::non_blank;
pub use project_update::ProjectUpdate;
pub use session::{AuthChange, AuthEvent, Identity, Session};
