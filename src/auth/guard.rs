use crate::auth::coordinator::{AuthPhase, AuthState};
use crate::models::Role;

/// Portal pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Login,
    Signup,
    Dashboard,
    Admin,
    /// `/`, which forwards to the dashboard.
    Root,
}

impl Route {
    pub fn path(self) -> &'static str {
        match self {
            Route::Login => "/login",
            Route::Signup => "/signup",
            Route::Dashboard => "/dashboard",
            Route::Admin => "/admin",
            Route::Root => "/",
        }
    }

    pub fn from_path(path: &str) -> Option<Route> {
        let route = match path.trim_end_matches('/') {
            "" => Route::Root,
            "/login" => Route::Login,
            "/signup" => Route::Signup,
            "/dashboard" => Route::Dashboard,
            "/admin" => Route::Admin,
            _ => return None,
        };
        Some(route)
    }

    /// Role a page is restricted to. `None` for pages open to any signed-in
    /// user or to nobody in particular.
    pub fn required_role(self) -> Option<Role> {
        match self {
            Route::Admin => Some(Role::Admin),
            Route::Dashboard => Some(Role::Client),
            Route::Login | Route::Signup | Route::Root => None,
        }
    }

    pub fn is_public(self) -> bool {
        matches!(self, Route::Login | Route::Signup)
    }

    /// Follow static redirects (`/` to `/dashboard`).
    pub fn resolve(self) -> Route {
        match self {
            Route::Root => Route::Dashboard,
            other => other,
        }
    }
}

impl Role {
    /// Landing page for this role.
    pub fn home(self) -> Route {
        match self {
            Role::Admin => Route::Admin,
            Role::Client => Route::Dashboard,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    /// Auth is still initializing.
    Loading,
    /// Signed in, profile not loaded yet.
    LoadingProfile,
    Redirect(Route),
    Render,
}

/// Decide what a protected page shows for the current auth state.
///
/// Rules, first match wins: loading, no user goes to login, missing profile
/// waits, wrong role goes to the role's home, otherwise render.
pub fn guard(state: &AuthState, required: Option<Role>) -> GuardDecision {
    if state.loading {
        return GuardDecision::Loading;
    }

    if state.user.is_none() {
        return GuardDecision::Redirect(Route::Login);
    }

    let Some(profile) = &state.profile else {
        return GuardDecision::LoadingProfile;
    };

    match required {
        Some(role) if profile.role != role => {
            tracing::debug!(
                have = %profile.role,
                need = %role,
                "Role mismatch, redirecting to {}",
                profile.role.home().path()
            );
            GuardDecision::Redirect(profile.role.home())
        }
        _ => GuardDecision::Render,
    }
}

/// Guard applied to a route, resolving static redirects first. Public pages
/// always render.
pub fn guard_route(state: &AuthState, route: Route) -> GuardDecision {
    let route = route.resolve();
    if route.is_public() {
        return GuardDecision::Render;
    }
    guard(state, route.required_role())
}
