//! Project workflows behind the admin and client views.

pub mod admin;
pub mod cache;
pub mod client;

pub use admin::{
    AdminWorkspace, ClientWithProjects, DashboardStats, NewProjectForm, PendingDelete, UpdateReceipt,
};
pub use cache::ProjectCache;
pub use client::ClientWorkspace;
