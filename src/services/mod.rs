//! Services consumed by the UI layer.
//!
//! ARCHITECTURE
//! ============
//! Services translate user actions into API calls over the shared
//! intercepted pipeline and surface `ClassifiedError`s to their callers.
//! `CatalogClient` wires storage, store, pipeline, and services together.

pub mod auth;
pub mod client;
pub mod products;

pub use auth::{AuthError, AuthService, LoginOutcome};
pub use client::CatalogClient;
pub use products::{DashboardData, NewProduct, Product, ProductService};
