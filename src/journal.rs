//! Append-only JSONL activity journal.
//!
//! Every run appends events (logins, logouts, restores, orders, payments,
//! simulated deliveries) tagged with a per-run id. Purely local diagnostics;
//! nothing reads it back at runtime.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

pub struct Journal {
    pub path: PathBuf,
    run_id: String,
    file: File,
}

#[derive(Serialize)]
struct Event<'a> {
    ts: DateTime<Utc>,
    run_id: &'a str,
    #[serde(rename = "type")]
    event_type: &'a str,
    #[serde(flatten)]
    data: serde_json::Value,
}

impl Journal {
    pub fn new(path: &Path, run_id: &str) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            path: path.to_path_buf(),
            run_id: run_id.to_string(),
            file,
        })
    }

    pub fn log(&mut self, event_type: &str, data: serde_json::Value) -> Result<()> {
        let event = Event {
            ts: Utc::now(),
            run_id: &self.run_id,
            event_type,
            data,
        };
        let line = serde_json::to_string(&event)?;
        writeln!(self.file, "{}", line)?;
        self.file.flush()?;
        Ok(())
    }

    pub fn session_restored(&mut self, subject: Option<&str>) -> Result<()> {
        self.log(
            "session_restored",
            serde_json::json!({ "subject": subject, "logged_in": subject.is_some() }),
        )
    }

    pub fn login(&mut self, subject: &str) -> Result<()> {
        self.log("login", serde_json::json!({ "subject": subject }))
    }

    pub fn login_failed(&mut self, reason: &str) -> Result<()> {
        self.log("login_failed", serde_json::json!({ "reason": reason }))
    }

    pub fn logout(&mut self) -> Result<()> {
        self.log("logout", serde_json::json!({}))
    }

    pub fn registered(&mut self, name: &str, email: &str) -> Result<()> {
        self.log(
            "registered",
            serde_json::json!({ "name": name, "email": email }),
        )
    }

    pub fn order_placed(&mut self, order_id: &str, restaurant_id: u64, total: f64) -> Result<()> {
        self.log(
            "order_placed",
            serde_json::json!({
                "order_id": order_id,
                "restaurant_id": restaurant_id,
                "total": total,
            }),
        )
    }

    pub fn payment_processed(&mut self, order_id: &str, method: &str) -> Result<()> {
        self.log(
            "payment_processed",
            serde_json::json!({ "order_id": order_id, "method": method }),
        )
    }

    pub fn orders_listed(&mut self, count: usize, status_filter: Option<&str>) -> Result<()> {
        self.log(
            "orders_listed",
            serde_json::json!({ "count": count, "status": status_filter }),
        )
    }

    pub fn restaurant_added(&mut self, name: &str, id: u64) -> Result<()> {
        self.log(
            "restaurant_added",
            serde_json::json!({ "name": name, "restaurant_id": id }),
        )
    }

    pub fn delivery_simulated(&mut self, order_id: &str, delay_ms: u64) -> Result<()> {
        self.log(
            "delivery_simulated",
            serde_json::json!({ "order_id": order_id, "delay_ms": delay_ms }),
        )
    }
}
