//! Order service client.

use super::response_error;
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Order creation payload. The backend spells the restaurant field
/// `restaurantID` here but `restaurantId` in listings.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub user_id: u64,
    #[serde(rename = "restaurantID")]
    pub restaurant_id: u64,
    pub total_amount: f64,
    pub status: String,
    pub email: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderResponse {
    pub order_id: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// A backend order summary: the authoritative record, which carries no
/// item/delivery/payment detail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    pub order_id: String,
    pub restaurant_id: u64,
    pub total_amount: f64,
    pub status: String,
}

/// Optional server-side listing filters
#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub status: Option<String>,
    pub email: Option<String>,
}

pub trait OrderApi {
    fn create(&self, req: &CreateOrderRequest, token: &str) -> Result<CreateOrderResponse>;
    fn list(&self, filter: &OrderFilter, token: &str) -> Result<Vec<OrderSummary>>;
}

pub struct OrderClient {
    base_url: String,
    agent: ureq::Agent,
}

impl OrderClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            agent: ureq::Agent::new(),
        }
    }
}

impl OrderApi for OrderClient {
    fn create(&self, req: &CreateOrderRequest, token: &str) -> Result<CreateOrderResponse> {
        let url = format!("{}/order/create", self.base_url);
        let resp = self
            .agent
            .post(&url)
            .set("Authorization", &format!("Bearer {}", token))
            .send_json(serde_json::to_value(req)?)
            .map_err(|e| response_error("order creation", e))?;
        let created: CreateOrderResponse = resp.into_json()?;
        Ok(created)
    }

    fn list(&self, filter: &OrderFilter, token: &str) -> Result<Vec<OrderSummary>> {
        let url = format!("{}/order/list", self.base_url);
        let mut request = self
            .agent
            .get(&url)
            .set("Authorization", &format!("Bearer {}", token));
        if let Some(status) = &filter.status {
            request = request.query("status", status);
        }
        if let Some(email) = &filter.email {
            request = request.query("email", email);
        }
        let resp = request.call().map_err(|e| response_error("order listing", e))?;
        let orders: Vec<OrderSummary> = resp.into_json()?;
        Ok(orders)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_create_request_wire_shape() {
        let req = CreateOrderRequest {
            user_id: 12,
            restaurant_id: 7,
            total_amount: 20.0,
            status: "PENDING".to_string(),
            email: "alice".to_string(),
        };
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(
            value,
            json!({
                "userId": 12,
                "restaurantID": 7,
                "totalAmount": 20.0,
                "status": "PENDING",
                "email": "alice"
            })
        );
    }

    #[test]
    fn test_summary_deserializes_backend_shape() {
        let json = r#"[{"orderId": "O1", "restaurantId": 7, "totalAmount": 20.5, "status": "PENDING"}]"#;
        let orders: Vec<OrderSummary> = serde_json::from_str(json).unwrap();
        assert_eq!(orders[0].order_id, "O1");
        assert_eq!(orders[0].restaurant_id, 7);
    }

    #[test]
    fn test_create_response_keeps_extra_fields() {
        let json = r#"{"orderId": "O2", "status": "PENDING", "userId": 12}"#;
        let resp: CreateOrderResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.order_id, "O2");
        assert_eq!(resp.extra.get("status").and_then(|v| v.as_str()), Some("PENDING"));
    }
}
