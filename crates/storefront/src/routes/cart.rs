//! Cart quote route handler.
//!
//! The cart lives in the browser; this endpoint recomputes quantities,
//! weight, shipping and totals from the lines the browser sends. Unit prices
//! are taken from those lines as captured at add time.

use axum::{
    Json,
    extract::rejection::JsonRejection,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::cart::{CartLineItem, CartSnapshot, CartStore, MemoryStorage, tier_for_weight};
use crate::error::{AppError, Result};

/// Cart lines as the browser stores them.
#[derive(Debug, Deserialize)]
pub struct QuoteRequest {
    pub items: Vec<CartLineItem>,
}

#[derive(Debug, Serialize)]
pub struct QuoteResponse {
    /// Lines after merging duplicates and dropping zero quantities.
    pub items: Vec<CartLineItem>,
    #[serde(flatten)]
    pub totals: CartSnapshot,
    /// Upper weight bound of the shipping tier, `null` for the top tier.
    pub shipping_tier_below_grams: Option<u64>,
    pub payable_paise: i64,
}

/// Price a cart.
#[instrument(skip(body))]
pub async fn quote(
    body: std::result::Result<Json<QuoteRequest>, JsonRejection>,
) -> Result<Json<QuoteResponse>> {
    let Json(body) = body.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let cart = CartStore::restore(MemoryStorage::new(), body.items)
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    let totals = cart.snapshot();
    let payable_paise = totals
        .payable_paise()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    Ok(Json(QuoteResponse {
        items: cart.items().to_vec(),
        shipping_tier_below_grams: tier_for_weight(totals.total_weight_grams).below_grams,
        totals,
        payable_paise,
    }))
}
