//! # catalog-client
//!
//! Client-side session manager and REST client for the product catalog API.
//!
//! The crate owns the authenticated session (token + user identity), injects
//! bearer credentials into API-bound requests, invalidates the session when
//! the API answers 401/403, and normalizes HTTP failures into ready-to-display
//! messages. The `catalog` binary drives it from the command line.
//!
//! LAYOUT
//! ======
//! - `session`: durable storage capability and the session store.
//! - `net`: transport pipeline, request interceptor, error classifier.
//! - `services`: auth and product services consumed by the UI layer.
//! - `nav`: navigation collaborator and route guard.
//! - `config`: environment-driven client configuration.

pub mod config;
pub mod nav;
pub mod net;
pub mod services;
pub mod session;

#[cfg(test)]
pub(crate) mod test_helpers;
