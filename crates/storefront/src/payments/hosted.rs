//! Bridge between the orchestrator and the browser-hosted payment modal.
//!
//! The server cannot open Razorpay's modal. Instead, [`HostedGateway`]
//! announces the session to the HTTP handler that started the attempt, parks
//! the attempt in a [`SessionRegistry`] keyed by gateway order id, and waits
//! for the browser to report back through the callback endpoint.
//!
//! ```text
//! POST /api/checkout          orchestrator ── open_session ──> registry (pending)
//!        <── session ──────── HostedGateway announces
//! POST /api/checkout/callback registry.resolve(outcome) ──> orchestrator resumes
//!        <── final report ───
//! ```
//!
//! A session the browser never reports on is treated as dismissed once the
//! configured TTL elapses.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use nutriio_core::GatewayOrderId;
use thiserror::Error;
use tokio::sync::oneshot;
use tracing::{debug, info, instrument};

use crate::checkout::{
    CheckoutError, CheckoutOutcome, CheckoutState, GatewayError, PaymentGateway,
};
use crate::models::{GatewayOrder, GatewayOrderRequest, GatewayOutcome, GatewaySession};

/// Final result of a checkout attempt, handed to whichever request is waiting.
#[derive(Debug)]
pub struct AttemptReport {
    pub result: Result<CheckoutOutcome, CheckoutError>,
    pub state: CheckoutState,
    /// Whether the shopper's cart was emptied.
    pub cart_cleared: bool,
}

/// Errors resolving a parked session.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    /// No open session for this gateway order (expired or already resolved).
    #[error("No open payment session for {0}")]
    Unknown(GatewayOrderId),

    /// The session exists but its attempt has not been handed over yet.
    #[error("Payment session {0} is still opening")]
    NotReady(GatewayOrderId),

    /// The attempt stopped waiting before the outcome arrived.
    #[error("Payment session {0} is no longer waiting")]
    Abandoned(GatewayOrderId),

    /// A previous holder of the lock panicked.
    #[error("Session registry lock poisoned")]
    Poisoned,
}

#[derive(Debug)]
struct PendingPayment {
    outcome: oneshot::Sender<GatewayOutcome>,
    finished: Option<oneshot::Receiver<AttemptReport>>,
}

/// Open payment sessions waiting for the browser. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    pending: Arc<Mutex<HashMap<GatewayOrderId, PendingPayment>>>,
}

impl SessionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of open sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.lock().map_or(0, |p| p.len())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Hand over the receiver on which the attempt's final report arrives.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Unknown`] if the session already expired.
    pub fn attach(
        &self,
        order_ref: &GatewayOrderId,
        finished: oneshot::Receiver<AttemptReport>,
    ) -> Result<(), SessionError> {
        let mut pending = self.pending.lock().map_err(|_| SessionError::Poisoned)?;
        let entry = pending
            .get_mut(order_ref)
            .ok_or_else(|| SessionError::Unknown(order_ref.clone()))?;
        entry.finished = Some(finished);
        Ok(())
    }

    /// Deliver the browser's outcome and return the receiver for the final
    /// report. The session is closed either way.
    ///
    /// # Errors
    ///
    /// Returns an error if the session is unknown, not yet attached, or the
    /// attempt stopped waiting.
    pub fn resolve(
        &self,
        order_ref: &GatewayOrderId,
        outcome: GatewayOutcome,
    ) -> Result<oneshot::Receiver<AttemptReport>, SessionError> {
        let entry = {
            let mut pending = self.pending.lock().map_err(|_| SessionError::Poisoned)?;
            let attached = pending
                .get(order_ref)
                .map(|entry| entry.finished.is_some())
                .ok_or_else(|| SessionError::Unknown(order_ref.clone()))?;
            if !attached {
                return Err(SessionError::NotReady(order_ref.clone()));
            }
            pending.remove(order_ref)
        };
        let Some(PendingPayment {
            outcome: sender,
            finished: Some(finished),
        }) = entry
        else {
            return Err(SessionError::Unknown(order_ref.clone()));
        };

        sender
            .send(outcome)
            .map_err(|_| SessionError::Abandoned(order_ref.clone()))?;
        Ok(finished)
    }

    fn register(
        &self,
        order_ref: GatewayOrderId,
        outcome: oneshot::Sender<GatewayOutcome>,
    ) -> Result<(), SessionError> {
        let mut pending = self.pending.lock().map_err(|_| SessionError::Poisoned)?;
        pending.insert(
            order_ref,
            PendingPayment {
                outcome,
                finished: None,
            },
        );
        Ok(())
    }

    fn forget(&self, order_ref: &GatewayOrderId) {
        if let Ok(mut pending) = self.pending.lock() {
            pending.remove(order_ref);
        }
    }
}

/// Gateway whose session step waits on the browser.
///
/// Order creation is delegated to the wrapped gateway. Each instance serves
/// exactly one attempt.
#[derive(Debug)]
pub struct HostedGateway<G> {
    inner: G,
    registry: SessionRegistry,
    ttl: Duration,
    announcer: Mutex<Option<oneshot::Sender<GatewaySession>>>,
}

impl<G: PaymentGateway> HostedGateway<G> {
    /// Wrap `inner`. The returned receiver yields the session once opened,
    /// or closes if the attempt ends without opening one.
    #[must_use]
    pub fn new(
        inner: G,
        registry: SessionRegistry,
        ttl: Duration,
    ) -> (Self, oneshot::Receiver<GatewaySession>) {
        let (announcer, opened) = oneshot::channel();
        let gateway = Self {
            inner,
            registry,
            ttl,
            announcer: Mutex::new(Some(announcer)),
        };
        (gateway, opened)
    }
}

#[async_trait]
impl<G: PaymentGateway> PaymentGateway for HostedGateway<G> {
    async fn create_order(
        &self,
        request: &GatewayOrderRequest,
    ) -> Result<GatewayOrder, GatewayError> {
        self.inner.create_order(request).await
    }

    #[instrument(skip_all, fields(order_ref = %session.order_ref))]
    async fn open_session(
        &self,
        session: &GatewaySession,
    ) -> Result<GatewayOutcome, GatewayError> {
        let announcer = self
            .announcer
            .lock()
            .map_err(|_| GatewayError::Unavailable("session announcer poisoned".to_string()))?
            .take()
            .ok_or(GatewayError::Unsupported("one session per hosted gateway"))?;

        let (outcome_tx, outcome_rx) = oneshot::channel();
        self.registry
            .register(session.order_ref.clone(), outcome_tx)
            .map_err(|e| GatewayError::Unavailable(e.to_string()))?;

        if announcer.send(session.clone()).is_err() {
            // Nobody is waiting for the session; the browser will never see it.
            self.registry.forget(&session.order_ref);
            return Ok(GatewayOutcome::Dismissed);
        }
        debug!("Payment session handed to browser");

        match tokio::time::timeout(self.ttl, outcome_rx).await {
            Ok(Ok(outcome)) => Ok(outcome),
            Ok(Err(_)) => Ok(GatewayOutcome::Dismissed),
            Err(_) => {
                self.registry.forget(&session.order_ref);
                info!(ttl_secs = self.ttl.as_secs(), "Payment session expired");
                Ok(GatewayOutcome::Dismissed)
            }
        }
    }
}
