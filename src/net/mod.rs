//! Networking: the outgoing request pipeline and failure classification.
//!
//! SYSTEM CONTEXT
//! ==============
//! `transport` defines the pipeline seam and the `reqwest` implementation,
//! `interceptor` layers credential injection and session invalidation on top
//! of any transport, and `error` maps raw failures to displayable errors.

pub mod error;
pub mod interceptor;
pub mod transport;

pub use error::{ClassifiedError, ErrorKind, HttpFailure, ResponseBody, classify};
pub use interceptor::AuthInterceptor;
pub use transport::{ApiRequest, ApiResponse, HttpTransport, ReqwestTransport};
