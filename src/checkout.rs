//! Checkout flow: form validation and order placement.
//!
//! Placement order: validate locally, create the order on the order service
//! (status PENDING), cache the full local detail under the authoritative
//! order id, then process payment. Payment failure leaves the cached order
//! in place; the order exists on the backend either way.

use crate::cache::{CachedOrder, DeliveryDetails, OrderCache, OrderItem, STATUS_PENDING};
use crate::services::orders::{CreateOrderRequest, OrderApi};
use crate::services::payments::{PaymentApi, PaymentRequest};
use crate::session::Session;
use anyhow::{anyhow, Result};
use chrono::{Datelike, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

// Form-field patterns, compiled once. Shared with the restaurant
// registration form where the rules are the same.
pub(crate) static EMAIL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\S+@\S+\.\S+$").unwrap());
pub(crate) static PHONE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[7-9][0-9]{9}$").unwrap());
static CARD_NUMBER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{16}$").unwrap());
static EXPIRY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{2}/\d{2}$").unwrap());
static CVV_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{3}$").unwrap());

/// A field-level validation failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub(crate) fn new(field: &str, message: &str) -> Self {
        FieldError {
            field: field.to_string(),
            message: message.to_string(),
        }
    }
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]: {}", self.field, self.message)
    }
}

/// Accepted payment methods
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentMethod {
    CashOnDelivery,
    Card,
    GPay,
    PhonePe,
}

impl PaymentMethod {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "cash on delivery" | "cod" | "cash" => Some(Self::CashOnDelivery),
            "credit/debit card" | "card" => Some(Self::Card),
            "gpay" => Some(Self::GPay),
            "phonepe" => Some(Self::PhonePe),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CashOnDelivery => "Cash on Delivery",
            Self::Card => "Credit/Debit Card",
            Self::GPay => "GPay",
            Self::PhonePe => "PhonePe",
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CardDetails {
    pub card_number: String,
    pub expiry_date: String,
    pub cvv: String,
}

/// A checkout submission, typically loaded from an order TOML file.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutRequest {
    pub restaurant_id: u64,
    #[serde(default)]
    pub restaurant_name: Option<String>,
    pub items: Vec<OrderItem>,
    pub delivery: DeliveryDetails,
    pub payment_method: String,
    #[serde(default)]
    pub card: Option<CardDetails>,
}

#[derive(Debug)]
pub struct PlacedOrder {
    pub order_id: String,
    pub total_amount: f64,
    pub payment_result: String,
}

pub fn order_total(items: &[OrderItem]) -> f64 {
    items.iter().map(|i| i.line_total()).sum()
}

/// Validate delivery details. Email is optional but checked when present;
/// phone must be 10 digits starting with 7, 8, or 9.
pub fn validate_delivery(d: &DeliveryDetails) -> Vec<FieldError> {
    let mut errors = Vec::new();
    let required = [
        ("first_name", &d.first_name, "First name is required."),
        ("last_name", &d.last_name, "Last name is required."),
        ("street", &d.street, "Street is required."),
        ("city", &d.city, "City is required."),
        ("state", &d.state, "State is required."),
        ("zip_code", &d.zip_code, "Zip code is required."),
        ("country", &d.country, "Country is required."),
    ];
    for (field, value, message) in required {
        if value.trim().is_empty() {
            errors.push(FieldError::new(field, message));
        }
    }

    if !d.email.trim().is_empty() && !EMAIL_RE.is_match(d.email.trim()) {
        errors.push(FieldError::new("email", "Email address is invalid."));
    }

    if d.phone.trim().is_empty() {
        errors.push(FieldError::new("phone", "Phone number is required."));
    } else if !PHONE_RE.is_match(d.phone.trim()) {
        errors.push(FieldError::new(
            "phone",
            "Phone number must be 10 digits and start with 7, 8, or 9.",
        ));
    }
    errors
}

/// Validate card details against the current date.
pub fn validate_card(c: &CardDetails) -> Vec<FieldError> {
    let now = Utc::now();
    validate_card_at(c, (now.year() % 100) as u32, now.month())
}

/// Validate card details against an explicit two-digit year and month.
pub fn validate_card_at(c: &CardDetails, current_year: u32, current_month: u32) -> Vec<FieldError> {
    let mut errors = Vec::new();

    let digits: String = c.card_number.chars().filter(|ch| !ch.is_whitespace()).collect();
    if digits.is_empty() {
        errors.push(FieldError::new("card_number", "Card Number is required."));
    } else if !CARD_NUMBER_RE.is_match(&digits) {
        errors.push(FieldError::new("card_number", "Must be 16 digits."));
    }

    if c.expiry_date.trim().is_empty() {
        errors.push(FieldError::new("expiry_date", "Expiry Date is required."));
    } else if !EXPIRY_RE.is_match(c.expiry_date.trim()) {
        errors.push(FieldError::new("expiry_date", "Format MM/YY."));
    } else {
        let parts: Vec<u32> = c
            .expiry_date
            .trim()
            .split('/')
            .filter_map(|p| p.parse().ok())
            .collect();
        let (month, year) = (parts[0], parts[1]);
        if !(1..=12).contains(&month) {
            errors.push(FieldError::new("expiry_date", "Month must be 01-12."));
        } else if year < current_year || (year == current_year && month < current_month) {
            errors.push(FieldError::new("expiry_date", "Card has expired."));
        }
    }

    if c.cvv.trim().is_empty() {
        errors.push(FieldError::new("cvv", "CVV is required."));
    } else if !CVV_RE.is_match(c.cvv.trim()) {
        errors.push(FieldError::new("cvv", "Must be 3 digits."));
    }
    errors
}

impl CheckoutRequest {
    /// Full submission validation: cart, delivery, payment method, and card
    /// details when paying by card.
    pub fn validate(&self) -> Result<PaymentMethod, Vec<FieldError>> {
        let mut errors = Vec::new();

        if self.items.is_empty() {
            errors.push(FieldError::new("items", "Cart is empty."));
        }
        errors.extend(validate_delivery(&self.delivery));

        let method = match PaymentMethod::from_str(&self.payment_method) {
            Some(m) => {
                if m == PaymentMethod::Card {
                    match &self.card {
                        Some(card) => errors.extend(validate_card(card)),
                        None => errors.push(FieldError::new(
                            "card",
                            "Card details are required for card payments.",
                        )),
                    }
                }
                Some(m)
            }
            None => {
                errors.push(FieldError::new(
                    "payment_method",
                    "Select Cash on Delivery, Credit/Debit Card, GPay, or PhonePe.",
                ));
                None
            }
        };

        match (method, errors.is_empty()) {
            (Some(m), true) => Ok(m),
            (_, _) => Err(errors),
        }
    }
}

/// Create the order, cache its local detail, and process payment.
/// `user_id` comes from the profile lookup for the session's subject.
pub fn place_order(
    orders: &dyn OrderApi,
    payments: &dyn PaymentApi,
    cache: &mut OrderCache,
    session: &Session,
    user_id: u64,
    req: &CheckoutRequest,
) -> Result<PlacedOrder> {
    let method = req.validate().map_err(|errors| {
        let lines: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        anyhow!("checkout validation failed:\n  {}", lines.join("\n  "))
    })?;

    let identity = session
        .subject()
        .ok_or_else(|| anyhow!("you must be logged in to place an order"))?
        .to_string();
    let token = session
        .raw_token()
        .ok_or_else(|| anyhow!("you must be logged in to place an order"))?;

    let total_amount = order_total(&req.items);
    let created = orders.create(
        &CreateOrderRequest {
            user_id,
            restaurant_id: req.restaurant_id,
            total_amount,
            status: STATUS_PENDING.to_string(),
            email: identity.clone(),
        },
        token,
    )?;

    cache.put(CachedOrder {
        order_id: created.order_id.clone(),
        user_identity: identity,
        restaurant_id: req.restaurant_id,
        restaurant_name: req.restaurant_name.clone(),
        total_amount,
        delivery: req.delivery.clone(),
        payment_method: method.as_str().to_string(),
        items: req.items.clone(),
        placed_at: Utc::now(),
        status: STATUS_PENDING.to_string(),
    });

    let payment_result = payments.process(
        &PaymentRequest {
            order_id: created.order_id.clone(),
            payment_method: method.as_str().to_string(),
            amount: total_amount,
        },
        token,
    )?;

    Ok(PlacedOrder {
        order_id: created.order_id,
        total_amount,
        payment_result,
    })
}
