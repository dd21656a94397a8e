//! PostgREST client implementing [`StorePersistence`].

use async_trait::async_trait;
use nutriio_core::{OrderId, OrderNumber, UserId};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Method, RequestBuilder};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use crate::checkout::{PersistenceError, StorePersistence};
use crate::config::SupabaseConfig;
use crate::models::{
    NewOrder, NewOrderItem, OrderRecord, OrderStatusUpdate, Profile, SavedAddress,
};

/// Ask PostgREST to echo written rows back.
const RETURN_REPRESENTATION: &str = "return=representation";
const RETURN_MINIMAL: &str = "return=minimal";

/// Supabase REST client.
#[derive(Clone)]
pub struct SupabaseClient {
    client: reqwest::Client,
    rest_base: String,
    anon_key: SecretString,
    access_token: Option<SecretString>,
}

impl std::fmt::Debug for SupabaseClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseClient")
            .field("rest_base", &self.rest_base)
            .field("authenticated", &self.access_token.is_some())
            .finish_non_exhaustive()
    }
}

impl SupabaseClient {
    /// Create a new Supabase client.
    ///
    /// # Errors
    ///
    /// Returns error if the anon key is not a valid header value or the HTTP
    /// client fails to build.
    pub fn new(config: &SupabaseConfig) -> Result<Self, PersistenceError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "apikey",
            HeaderValue::from_str(config.anon_key.expose_secret())
                .map_err(|e| PersistenceError::Parse(format!("Invalid API key format: {e}")))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            rest_base: format!("{}/rest/v1", config.url.as_str().trim_end_matches('/')),
            anon_key: config.anon_key.clone(),
            access_token: None,
        })
    }

    /// A client acting as the shopper who owns `access_token`.
    #[must_use]
    pub fn for_user(&self, access_token: impl Into<String>) -> Self {
        Self {
            access_token: Some(SecretString::from(access_token.into())),
            ..self.clone()
        }
    }

    fn rest_url(&self, path: &str) -> String {
        format!("{}/{path}", self.rest_base)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let bearer = self
            .access_token
            .as_ref()
            .unwrap_or(&self.anon_key)
            .expose_secret();
        self.client
            .request(method, self.rest_url(path))
            .bearer_auth(bearer)
    }

    async fn send<T: DeserializeOwned>(builder: RequestBuilder) -> Result<T, PersistenceError> {
        let response = builder.send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(PersistenceError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|e| PersistenceError::Parse(e.to_string()))
    }

    async fn first_row<T: DeserializeOwned>(
        builder: RequestBuilder,
        what: &str,
    ) -> Result<T, PersistenceError> {
        Self::send::<Vec<T>>(builder)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| PersistenceError::NotFound(what.to_string()))
    }
}

fn eq(value: &str) -> String {
    format!("eq.{}", urlencoding::encode(value))
}

#[async_trait]
impl StorePersistence for SupabaseClient {
    #[instrument(skip(self), fields(user_id = %user_id))]
    async fn list_addresses(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<SavedAddress>, PersistenceError> {
        let path = format!(
            "addresses?select=*&user_id={}&order=is_default.desc,created_at.desc",
            eq(user_id.as_str())
        );
        Self::send(self.request(Method::GET, &path)).await
    }

    #[instrument(skip(self), fields(user_id = %user_id))]
    async fn profile(&self, user_id: &UserId) -> Result<Option<Profile>, PersistenceError> {
        let path = format!("profiles?select=*&id={}&limit=1", eq(user_id.as_str()));
        let rows: Vec<Profile> = Self::send(self.request(Method::GET, &path)).await?;
        Ok(rows.into_iter().next())
    }

    #[instrument(skip(self))]
    async fn generate_order_number(&self) -> Result<OrderNumber, PersistenceError> {
        let builder = self
            .request(Method::POST, "rpc/generate_order_number")
            .json(&serde_json::json!({}));
        let number: String = Self::send(builder).await?;
        debug!(order_number = %number, "Order number generated");
        Ok(OrderNumber::new(number))
    }

    #[instrument(skip(self, order), fields(order_number = %order.order_number))]
    async fn insert_order(&self, order: &NewOrder) -> Result<OrderRecord, PersistenceError> {
        let builder = self
            .request(Method::POST, "orders")
            .header("Prefer", RETURN_REPRESENTATION)
            .json(&[order]);
        Self::first_row(builder, "inserted order").await
    }

    #[instrument(skip(self, items), fields(lines = items.len()))]
    async fn insert_order_items(&self, items: &[NewOrderItem]) -> Result<(), PersistenceError> {
        let response = self
            .request(Method::POST, "order_items")
            .header("Prefer", RETURN_MINIMAL)
            .json(items)
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(PersistenceError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(())
    }

    #[instrument(skip(self, update), fields(order_id = %order_id, status = %update.status))]
    async fn update_order_status(
        &self,
        order_id: &OrderId,
        update: &OrderStatusUpdate,
    ) -> Result<OrderRecord, PersistenceError> {
        let path = format!("orders?id={}", eq(order_id.as_str()));
        let builder = self
            .request(Method::PATCH, &path)
            .header("Prefer", RETURN_REPRESENTATION)
            .json(update);
        Self::first_row(builder, "updated order").await
    }
}
