//! Wiring for the whole client: storage, session store, pipeline, services.
//!
//! The store is restored during assembly, before any service can read it.

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;

use std::sync::Arc;

use super::auth::AuthService;
use super::products::ProductService;
use crate::config::ClientConfig;
use crate::nav::Navigator;
use crate::net::interceptor::AuthInterceptor;
use crate::net::transport::{HttpTransport, ReqwestTransport};
use crate::session::{DurableStorage, FileStorage, SessionStore};

pub struct CatalogClient {
    store: Arc<SessionStore>,
    http: Arc<dyn HttpTransport>,
    pub auth: AuthService,
    pub products: ProductService,
}

impl CatalogClient {
    /// Build a client backed by `reqwest` and a session file, per `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn connect(config: &ClientConfig, navigator: Arc<dyn Navigator>) -> Result<Self, reqwest::Error> {
        let storage = Arc::new(FileStorage::new(config.session_file.clone()));
        let transport = ReqwestTransport::new(config.timeouts)?;
        Ok(Self::assemble(transport, storage, navigator, &config.api_base_url))
    }

    /// Build a client over an arbitrary terminal transport and storage.
    #[must_use]
    pub fn assemble<T>(
        transport: T,
        storage: Arc<dyn DurableStorage>,
        navigator: Arc<dyn Navigator>,
        api_base: &str,
    ) -> Self
    where
        T: HttpTransport + 'static,
    {
        let store = Arc::new(SessionStore::new(storage));
        store.restore();

        let http: Arc<dyn HttpTransport> =
            Arc::new(AuthInterceptor::new(transport, store.clone(), navigator.clone(), api_base));
        let auth = AuthService::new(http.clone(), store.clone(), navigator, api_base);
        let products = ProductService::new(http.clone(), api_base);

        Self { store, http, auth, products }
    }

    /// The intercepted pipeline, for API calls outside the built-in services.
    #[must_use]
    pub fn http(&self) -> Arc<dyn HttpTransport> {
        self.http.clone()
    }

    #[must_use]
    pub fn session_store(&self) -> Arc<SessionStore> {
        self.store.clone()
    }
}
