//! Session state and its durable backing.
//!
//! DESIGN
//! ======
//! `SessionStore` is the single owner of the current session. Everything else
//! reads it through `current()`/`subscribe()` or asks it to mutate through
//! `set_session()`/`clear_session()`. Persistence goes through the injected
//! `DurableStorage` capability so tests can swap in `MemoryStorage`.

pub mod storage;
pub mod store;
pub mod types;

pub use storage::{DurableStorage, FileStorage, MemoryStorage, StorageError};
pub use store::{SessionStore, SessionSubscription};
pub use types::{Credentials, Session, SessionUser, UserId};
