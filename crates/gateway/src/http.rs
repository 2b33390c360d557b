//! JSON/HTTP client for the distributor API.

use std::time::Duration;

use async_trait::async_trait;
use common::PoNumber;
use reqwest::{RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;

use crate::distributor::{
    CartCreated, DistributorApi, DistributorCart, DistributorLineItem, ExternalOrderRecord,
    OrderCreated,
};
use crate::error::{GatewayError, Result, Service};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Distributor client speaking JSON over HTTP with bearer authentication.
///
/// | Operation      | Request                       |
/// |----------------|-------------------------------|
/// | `create_cart`  | `POST   /carts`               |
/// | `add_item`     | `POST   /carts/{po}/items`    |
/// | `create_order` | `POST   /carts/{po}/order`    |
/// | `delete_cart`  | `DELETE /carts/{po}`          |
/// | `get_order`    | `GET    /orders/{po}`         |
#[derive(Clone)]
pub struct HttpDistributorClient {
    client: reqwest::Client,
    base_url: String,
    api_key: SecretString,
}

impl std::fmt::Debug for HttpDistributorClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpDistributorClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl HttpDistributorClient {
    pub fn new(base_url: impl Into<String>, api_key: SecretString) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("order-engine/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| transport(&e))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request
            .bearer_auth(self.api_key.expose_secret())
            .send()
            .await
            .map_err(|e| transport(&e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response.text().await.unwrap_or_default();
        tracing::debug!(status = status.as_u16(), %message, "Distributor request rejected");
        Err(GatewayError::http(
            Service::Distributor,
            status.as_u16(),
            message,
        ))
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
        response.json::<T>().await.map_err(|e| GatewayError::Decode {
            service: Service::Distributor,
            message: e.to_string(),
        })
    }
}

fn transport(error: &reqwest::Error) -> GatewayError {
    GatewayError::Transport {
        service: Service::Distributor,
        message: error.to_string(),
    }
}

#[async_trait]
impl DistributorApi for HttpDistributorClient {
    #[tracing::instrument(skip(self, cart), fields(po_number = %cart.po_number))]
    async fn create_cart(&self, cart: &DistributorCart) -> Result<CartCreated> {
        let response = self
            .send(self.client.post(self.url("/carts")).json(cart))
            .await?;
        Self::decode(response).await
    }

    #[tracing::instrument(skip(self, item), fields(sku = %item.sku))]
    async fn add_item(&self, po_number: &PoNumber, item: &DistributorLineItem) -> Result<()> {
        let url = self.url(&format!("/carts/{po_number}/items"));
        self.send(self.client.post(url).json(item)).await?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn create_order(&self, po_number: &PoNumber) -> Result<OrderCreated> {
        let url = self.url(&format!("/carts/{po_number}/order"));
        let response = self.send(self.client.post(url)).await?;
        Self::decode(response).await
    }

    #[tracing::instrument(skip(self))]
    async fn delete_cart(&self, po_number: &PoNumber) -> Result<()> {
        let url = self.url(&format!("/carts/{po_number}"));
        self.send(self.client.delete(url)).await?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn get_order(&self, po_number: &PoNumber) -> Result<ExternalOrderRecord> {
        let url = self.url(&format!("/orders/{po_number}"));
        match self.send(self.client.get(url)).await {
            Ok(response) => Self::decode(response).await,
            Err(GatewayError::Http { status, .. }) if status == StatusCode::NOT_FOUND.as_u16() => {
                Err(GatewayError::NotFound {
                    service: Service::Distributor,
                    resource: format!("orders/{po_number}"),
                })
            }
            Err(e) => Err(e),
        }
    }
}
