//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Duration;

use crate::checkout::{CheckoutSettings, GatewayError, PersistenceError};
use crate::config::StorefrontConfig;
use crate::payments::{RazorpayClient, SessionRegistry};
use crate::supabase::SupabaseClient;

/// Error building application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("supabase client: {0}")]
    Supabase(#[from] PersistenceError),
    #[error("razorpay client: {0}")]
    Razorpay(#[from] GatewayError),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// the API clients, checkout settings and open payment sessions.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    supabase: SupabaseClient,
    razorpay: RazorpayClient,
    checkout: CheckoutSettings,
    sessions: SessionRegistry,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if an API client cannot be built.
    pub fn new(config: StorefrontConfig) -> Result<Self, StateError> {
        let supabase = SupabaseClient::new(&config.supabase)?;
        let razorpay = RazorpayClient::new(&config.razorpay)?;
        Ok(Self::from_parts(config, supabase, razorpay))
    }

    /// Assemble state from pre-built clients.
    #[must_use]
    pub fn from_parts(
        config: StorefrontConfig,
        supabase: SupabaseClient,
        razorpay: RazorpayClient,
    ) -> Self {
        let checkout = config.checkout_settings();
        Self {
            inner: Arc::new(AppStateInner {
                config,
                supabase,
                razorpay,
                checkout,
                sessions: SessionRegistry::new(),
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the Supabase client (anonymous).
    #[must_use]
    pub fn supabase(&self) -> &SupabaseClient {
        &self.inner.supabase
    }

    /// Get a reference to the Razorpay client.
    #[must_use]
    pub fn razorpay(&self) -> &RazorpayClient {
        &self.inner.razorpay
    }

    /// Get a reference to the checkout settings.
    #[must_use]
    pub fn checkout_settings(&self) -> &CheckoutSettings {
        &self.inner.checkout
    }

    /// Get a reference to the open payment sessions.
    #[must_use]
    pub fn sessions(&self) -> &SessionRegistry {
        &self.inner.sessions
    }

    /// How long an open payment waits for the browser.
    #[must_use]
    pub fn session_ttl(&self) -> Duration {
        self.inner.config.checkout.session_ttl
    }
}
