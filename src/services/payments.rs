//! Payment service client.

use super::{body_text, response_error};
use anyhow::Result;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    pub order_id: String,
    pub payment_method: String,
    pub amount: f64,
}

pub trait PaymentApi {
    /// Process a payment; returns the server's processing result message.
    fn process(&self, req: &PaymentRequest, token: &str) -> Result<String>;
}

pub struct PaymentClient {
    base_url: String,
    agent: ureq::Agent,
}

impl PaymentClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            agent: ureq::Agent::new(),
        }
    }
}

impl PaymentApi for PaymentClient {
    fn process(&self, req: &PaymentRequest, token: &str) -> Result<String> {
        let url = format!("{}/payment/process", self.base_url);
        let resp = self
            .agent
            .post(&url)
            .set("Authorization", &format!("Bearer {}", token))
            .send_json(serde_json::to_value(req)?)
            .map_err(|e| response_error("payment processing", e))?;
        body_text("payment processing", resp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_payment_request_wire_shape() {
        let req = PaymentRequest {
            order_id: "O1".to_string(),
            payment_method: "GPay".to_string(),
            amount: 42.5,
        };
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({"orderId": "O1", "paymentMethod": "GPay", "amount": 42.5})
        );
    }
}
