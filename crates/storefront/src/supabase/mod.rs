//! Supabase persistence over PostgREST.
//!
//! # Architecture
//!
//! - Supabase is the source of truth for addresses, profiles and orders
//! - Every request carries the anon key as `apikey`
//! - `Authorization` carries the shopper's access token when one is known
//!   (row-level security applies), otherwise the anon key
//!
//! # Example
//!
//! ```rust,ignore
//! use nutriio_storefront::supabase::SupabaseClient;
//!
//! let client = SupabaseClient::new(&config.supabase)?.for_user(access_token);
//! let addresses = client.list_addresses(&user_id).await?;
//! ```

mod client;

pub use client::SupabaseClient;
