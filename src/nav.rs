//! Navigation collaborator and route guard.
//!
//! SYSTEM CONTEXT
//! ==============
//! The session core never routes by itself. Logout and interceptor-driven
//! invalidation ask a `Navigator` to show the login view; the embedding UI
//! decides what that means. `guard` applies the same redirect rules every
//! view uses so they stay identical.

#[cfg(test)]
#[path = "nav_test.rs"]
mod tests;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Login,
    Register,
    Products,
    AddProduct,
    Dashboard,
}

impl Route {
    #[must_use]
    pub fn path(self) -> &'static str {
        match self {
            Self::Login => "/login",
            Self::Register => "/register",
            Self::Products => "/products",
            Self::AddProduct => "/add-product",
            Self::Dashboard => "/dashboard",
        }
    }

    /// Resolve a path. The empty path and unknown paths land on the login view.
    #[must_use]
    pub fn from_path(path: &str) -> Self {
        match path.trim_end_matches('/') {
            "/register" => Self::Register,
            "/products" => Self::Products,
            "/add-product" => Self::AddProduct,
            "/dashboard" => Self::Dashboard,
            _ => Self::Login,
        }
    }

    #[must_use]
    pub fn requires_auth(self) -> bool {
        matches!(self, Self::Products | Self::AddProduct | Self::Dashboard)
    }
}

/// Where a request for `route` should actually land.
///
/// Protected views redirect to login without a session; the login view
/// redirects to the product list when a session already exists.
#[must_use]
pub fn guard(route: Route, logged_in: bool) -> Route {
    if route.requires_auth() && !logged_in {
        return Route::Login;
    }
    if route == Route::Login && logged_in {
        return Route::Products;
    }
    route
}

/// Side-effecting navigation requested by the session core.
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: Route);
}

/// Navigator for headless callers: records the request in the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNavigator;

impl Navigator for LogNavigator {
    fn navigate(&self, route: Route) {
        if route == Route::Login {
            tracing::warn!(route = route.path(), "signed out; log in again to continue");
        } else {
            tracing::info!(route = route.path(), "navigation requested");
        }
    }
}
