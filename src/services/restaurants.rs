//! Restaurant service client: lookups for display enrichment and the
//! admin-facing registration endpoint.

use super::response_error;
use crate::checkout::{EMAIL_RE, FieldError, PHONE_RE};
use anyhow::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Restaurant {
    #[serde(default, alias = "restaurantId")]
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub cuisine: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

/// A restaurant registration submission.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRestaurant {
    pub name: String,
    pub address: String,
    pub phone_number: String,
    pub email: String,
}

impl NewRestaurant {
    /// Registration form rules: every field present, phone 10 digits
    /// starting with 7, 8, or 9, email well-formed.
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        let required = [
            ("name", &self.name),
            ("address", &self.address),
            ("phone_number", &self.phone_number),
            ("email", &self.email),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                errors.push(FieldError::new(field, "All fields are required."));
            }
        }

        if !self.phone_number.trim().is_empty() && !PHONE_RE.is_match(self.phone_number.trim()) {
            errors.push(FieldError::new(
                "phone_number",
                "Phone number must be 10 digits and start with 7, 8, or 9.",
            ));
        }
        if !self.email.trim().is_empty() && !EMAIL_RE.is_match(self.email.trim()) {
            errors.push(FieldError::new("email", "Invalid email address."));
        }
        errors
    }
}

pub trait RestaurantApi {
    fn fetch_by_id(&self, id: u64, token: &str) -> Result<Restaurant>;
    /// Register a new restaurant; returns the created record with its id.
    fn add(&self, req: &NewRestaurant, token: &str) -> Result<Restaurant>;
}

pub struct RestaurantClient {
    base_url: String,
    agent: ureq::Agent,
}

impl RestaurantClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            agent: ureq::Agent::new(),
        }
    }
}

impl RestaurantApi for RestaurantClient {
    fn fetch_by_id(&self, id: u64, token: &str) -> Result<Restaurant> {
        let url = format!("{}/restaurant/{}", self.base_url, id);
        let resp = self
            .agent
            .get(&url)
            .set("Authorization", &format!("Bearer {}", token))
            .call()
            .map_err(|e| response_error("restaurant lookup", e))?;
        let restaurant: Restaurant = resp.into_json()?;
        Ok(restaurant)
    }

    fn add(&self, req: &NewRestaurant, token: &str) -> Result<Restaurant> {
        let url = format!("{}/restaurant/addRestaurant", self.base_url);
        let resp = self
            .agent
            .post(&url)
            .set("Authorization", &format!("Bearer {}", token))
            .send_json(serde_json::to_value(req)?)
            .map_err(|e| response_error("restaurant registration", e))?;
        let restaurant: Restaurant = resp.into_json()?;
        Ok(restaurant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid_submission() -> NewRestaurant {
        NewRestaurant {
            name: "Pizza Place".to_string(),
            address: "1 Main St".to_string(),
            phone_number: "9876543210".to_string(),
            email: "owner@pizza.example".to_string(),
        }
    }

    #[test]
    fn test_restaurant_deserializes_minimal_shape() {
        let json = r#"{"name": "Pizza Place"}"#;
        let r: Restaurant = serde_json::from_str(json).unwrap();
        assert_eq!(r.name, "Pizza Place");
        assert!(r.cuisine.is_none());
    }

    #[test]
    fn test_restaurant_accepts_registration_response_shape() {
        let json = r#"{"restaurantId": 42, "name": "Pizza Place"}"#;
        let r: Restaurant = serde_json::from_str(json).unwrap();
        assert_eq!(r.id, 42);
    }

    #[test]
    fn test_new_restaurant_wire_shape() {
        let value = serde_json::to_value(&valid_submission()).unwrap();
        assert_eq!(
            value,
            json!({
                "name": "Pizza Place",
                "address": "1 Main St",
                "phoneNumber": "9876543210",
                "email": "owner@pizza.example",
            })
        );
    }

    #[test]
    fn test_new_restaurant_valid_submission_passes() {
        assert!(valid_submission().validate().is_empty());
    }

    #[test]
    fn test_new_restaurant_requires_all_fields() {
        let submission = NewRestaurant {
            name: String::new(),
            address: String::new(),
            phone_number: String::new(),
            email: String::new(),
        };
        let errors = submission.validate();
        assert_eq!(errors.len(), 4);
        assert!(errors.iter().all(|e| e.message == "All fields are required."));
    }

    #[test]
    fn test_new_restaurant_phone_rule() {
        let mut submission = valid_submission();
        submission.phone_number = "1234567890".to_string();
        assert_eq!(submission.validate()[0].field, "phone_number");

        submission.phone_number = "98765".to_string();
        assert_eq!(submission.validate()[0].field, "phone_number");
    }

    #[test]
    fn test_new_restaurant_email_rule() {
        let mut submission = valid_submission();
        submission.email = "not-an-email".to_string();
        assert_eq!(submission.validate()[0].field, "email");
        assert_eq!(submission.validate()[0].message, "Invalid email address.");
    }
}
