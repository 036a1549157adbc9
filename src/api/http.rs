//! HTTP implementation of [`OrderApi`] over the backend's REST endpoints

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use serde_json::Value;

use crate::config::DeskConfig;
use crate::domain::order::{Order, OrderId, OrderStatus};
use crate::metrics::Metrics;
use crate::utils::{retry_on_transient, RetryConfig};
use super::dto::{parse_order, CodNotesRequest, NewNote, OrderListPayload, StatusUpdateRequest};
use super::error::ApiError;
use super::query::{OrderPage, OrderQuery};
use super::OrderApi;

/// REST client for the order endpoints
#[derive(Clone)]
pub struct HttpOrderApi {
    client: Client,
    base_url: String,
    token: Option<String>,
    retry: RetryConfig,
    metrics: Option<Arc<Metrics>>,
}

impl HttpOrderApi {
    pub fn new(config: &DeskConfig) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            retry: config.retry(),
            metrics: None,
        })
    }

    /// Set the bearer token
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let request = self.client.request(method, self.url(path));
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Send a request and decode the JSON body of a 2xx response
    async fn send(&self, endpoint: &'static str, request: RequestBuilder) -> Result<Value, ApiError> {
        let started = Instant::now();
        let result = Self::execute(request).await;

        if let Some(metrics) = &self.metrics {
            metrics.observe_request(endpoint, started.elapsed().as_secs_f64());
        }

        if let Err(e) = &result {
            tracing::debug!(endpoint = endpoint, error = %e, "Backend request failed");
        }
        result
    }

    async fn execute(request: RequestBuilder) -> Result<Value, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(ApiError::from_status(status.as_u16(), &body));
        }
        Ok(serde_json::from_str(&body)?)
    }

    /// Mutations are sent exactly once
    async fn mutate(&self, endpoint: &'static str, request: RequestBuilder) -> Result<Order, ApiError> {
        parse_order(self.send(endpoint, request).await?)
    }

    fn order_path(id: OrderId, action: Option<&str>) -> String {
        match action {
            Some(action) => format!("orders/{id}/{action}/"),
            None => format!("orders/{id}/"),
        }
    }
}

#[async_trait]
impl OrderApi for HttpOrderApi {
    async fn list_orders(&self, query: &OrderQuery) -> Result<OrderPage, ApiError> {
        let pairs = query.to_query_pairs();
        let pairs = &pairs;

        let value = retry_on_transient(&self.retry, "list_orders", move |_attempt| {
            self.send("list_orders", self.request(Method::GET, "orders/").query(pairs))
        })
        .await?;

        let payload: OrderListPayload = serde_json::from_value(value)?;
        let mut orders = Vec::with_capacity(payload.results.len());
        let mut quarantined = 0;

        for record in payload.results {
            match parse_order(record) {
                Ok(order) => orders.push(order),
                Err(e) => {
                    quarantined += 1;
                    tracing::warn!(error = %e, "Quarantined malformed order record");
                }
            }
        }

        if quarantined > 0 {
            if let Some(metrics) = &self.metrics {
                metrics.record_quarantined(quarantined);
            }
        }

        Ok(OrderPage {
            orders,
            count: payload.count,
            page: query.page(),
            page_size: query.page_size(),
            quarantined,
        })
    }

    async fn get_order(&self, id: OrderId) -> Result<Order, ApiError> {
        let path = Self::order_path(id, None);
        let path = path.as_str();

        let value = retry_on_transient(&self.retry, "get_order", move |_attempt| {
            self.send("get_order", self.request(Method::GET, path))
        })
        .await?;

        parse_order(value)
    }

    async fn update_status(
        &self,
        id: OrderId,
        status: OrderStatus,
        admin_notes: Option<&str>,
    ) -> Result<Order, ApiError> {
        let body = StatusUpdateRequest { status, admin_notes };
        let request = self
            .request(Method::PATCH, &Self::order_path(id, None))
            .json(&body);
        self.mutate("update_status", request).await
    }

    async fn confirm(&self, id: OrderId) -> Result<Order, ApiError> {
        let request = self.request(Method::POST, &Self::order_path(id, Some("confirm")));
        self.mutate("confirm", request).await
    }

    async fn mark_delivered(&self, id: OrderId) -> Result<Order, ApiError> {
        let request = self.request(Method::POST, &Self::order_path(id, Some("delivered")));
        self.mutate("mark_delivered", request).await
    }

    async fn verify_cod(&self, id: OrderId, notes: Option<&str>) -> Result<Order, ApiError> {
        let body = CodNotesRequest {
            notes: notes.unwrap_or_default(),
        };
        let request = self
            .request(Method::POST, &Self::order_path(id, Some("verify-cod")))
            .json(&body);
        self.mutate("verify_cod", request).await
    }

    async fn reject_cod(&self, id: OrderId, notes: &str) -> Result<Order, ApiError> {
        let request = self
            .request(Method::POST, &Self::order_path(id, Some("reject-cod")))
            .json(&CodNotesRequest { notes });
        self.mutate("reject_cod", request).await
    }

    async fn mark_cod_paid(&self, id: OrderId) -> Result<Order, ApiError> {
        let request = self.request(Method::POST, &Self::order_path(id, Some("cod-paid")));
        self.mutate("mark_cod_paid", request).await
    }

    async fn add_note(&self, id: OrderId, note: &NewNote) -> Result<Order, ApiError> {
        let request = self
            .request(Method::POST, &Self::order_path(id, Some("notes")))
            .json(note);
        self.mutate("add_note", request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_building() {
        let config = DeskConfig::new("http://localhost:8000/api/");
        let api = HttpOrderApi::new(&config).unwrap();

        assert_eq!(api.base_url(), "http://localhost:8000/api");
        assert_eq!(
            api.url(&HttpOrderApi::order_path(OrderId(12), Some("verify-cod"))),
            "http://localhost:8000/api/orders/12/verify-cod/"
        );
        assert_eq!(
            api.url(&HttpOrderApi::order_path(OrderId(12), None)),
            "http://localhost:8000/api/orders/12/"
        );
    }
}
