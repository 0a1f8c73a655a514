use crate::cache::{self, DisplayOrder, OrderCache, UNKNOWN_RESTAURANT};
use crate::checkout::{self, CheckoutRequest};
use crate::config::Config;
use crate::guard;
use crate::journal::Journal;
use crate::services::auth::{AuthApi, RegisterRequest};
use crate::services::orders::{OrderApi, OrderFilter};
use crate::services::payments::PaymentApi;
use crate::services::restaurants::{NewRestaurant, RestaurantApi};
use crate::session::SessionContext;
use anyhow::{anyhow, Result};
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default role for self-service signups
const SIGNUP_ROLE: &str = "ROLE_USER";

pub struct Context {
    pub config: Config,
    pub state_dir: PathBuf,
    pub session: RefCell<SessionContext>,
    pub cache: RefCell<OrderCache>,
    pub journal: RefCell<Journal>,
    pub auth: Box<dyn AuthApi>,
    pub orders: Box<dyn OrderApi>,
    pub payments: Box<dyn PaymentApi>,
    pub restaurants: Box<dyn RestaurantApi>,
    pub verbose: bool,
}

impl Context {
    fn require_login(&self) -> Result<(String, String)> {
        let session = self.session.borrow().current();
        match (session.subject(), session.raw_token()) {
            (Some(subject), Some(token)) => Ok((subject.to_string(), token.to_string())),
            _ => Err(anyhow!("You must be logged in. Run 'expressbite login' first.")),
        }
    }
}

pub fn run_login(ctx: &Context, username: &str, password: &str) -> Result<()> {
    let token = ctx.auth.authenticate(username, password)?;

    let mut session = ctx.session.borrow_mut();
    match session.login(&token) {
        Ok(current) => {
            let subject = current.subject().unwrap_or_default().to_string();
            let roles = current.roles_raw().unwrap_or("none").to_string();
            let _ = ctx.journal.borrow_mut().login(&subject);
            println!("Logged in as {} (roles: {})", subject, roles);
            Ok(())
        }
        Err(err) => {
            let _ = ctx.journal.borrow_mut().login_failed(&err.to_string());
            Err(anyhow!("Server returned an unusable token: {}", err))
        }
    }
}

pub fn run_logout(ctx: &Context) -> Result<()> {
    ctx.session.borrow_mut().logout();
    let _ = ctx.journal.borrow_mut().logout();
    println!("Logged out.");
    Ok(())
}

pub fn run_register(ctx: &Context, name: &str, email: &str, password: &str) -> Result<()> {
    let message = ctx.auth.register(&RegisterRequest {
        name: name.to_string(),
        email: email.to_string(),
        password: password.to_string(),
        roles: SIGNUP_ROLE.to_string(),
    })?;
    let _ = ctx.journal.borrow_mut().registered(name, email);
    println!("{}", message.trim());
    println!("Registration successful! Please log in.");
    Ok(())
}

pub fn run_whoami(ctx: &Context) -> Result<()> {
    let session = ctx.session.borrow().current();
    if session.is_logged_in() {
        println!("Logged in as: {}", session.subject().unwrap_or_default());
        println!("Roles: {}", session.roles_raw().unwrap_or("none"));
    } else {
        println!("Not logged in.");
    }
    Ok(())
}

pub fn run_profile(ctx: &Context) -> Result<()> {
    let (subject, token) = ctx.require_login()?;
    let profile = ctx.auth.fetch_profile(&subject, &token)?;
    println!("User ID: {}", profile.user_id);
    println!("Name:    {}", profile.name);
    println!("Email:   {}", profile.email);
    println!("Roles:   {}", profile.roles.as_deref().unwrap_or("none"));
    Ok(())
}

/// Resolve the effective status filter from the tab and an explicit filter.
/// `current` defaults to PENDING and `past` to DELIVERED; an explicit
/// status overrides the tab default, and "All" means no filter.
pub fn resolve_status_filter(tab: &str, status: Option<&str>) -> Result<Option<String>> {
    if let Some(status) = status {
        if status.eq_ignore_ascii_case("all") {
            return Ok(None);
        }
        let upper = status.to_uppercase();
        match upper.as_str() {
            cache::STATUS_PENDING | cache::STATUS_DELIVERED | cache::STATUS_CANCELLED => {
                return Ok(Some(upper))
            }
            _ => {
                return Err(anyhow!(
                    "Unknown status '{}'. Use PENDING, DELIVERED, CANCELLED, or All.",
                    status
                ))
            }
        }
    }
    match tab {
        "current" => Ok(Some(cache::STATUS_PENDING.to_string())),
        "past" => Ok(Some(cache::STATUS_DELIVERED.to_string())),
        "all" => Ok(None),
        _ => Err(anyhow!("Unknown tab '{}'. Use current, past, or all.", tab)),
    }
}

pub fn run_orders(ctx: &Context, tab: &str, status: Option<&str>) -> Result<()> {
    let (subject, token) = ctx.require_login()?;
    let status_filter = resolve_status_filter(tab, status)?;

    let filter = OrderFilter {
        status: status_filter.clone(),
        email: Some(subject),
    };
    let summaries = ctx.orders.list(&filter, &token)?;
    let _ = ctx
        .journal
        .borrow_mut()
        .orders_listed(summaries.len(), status_filter.as_deref());

    let mut display = ctx.cache.borrow().merge_for_display(&summaries);
    enrich_restaurant_names(ctx, &token, &mut display);

    if display.is_empty() {
        println!("No orders found for the selected criteria.");
        return Ok(());
    }
    for order in &display {
        print_order(order);
    }
    Ok(())
}

/// Fill in restaurant names the cache could not provide. Lookup failures
/// leave the placeholder; the listing must still render.
fn enrich_restaurant_names(ctx: &Context, token: &str, display: &mut [DisplayOrder]) {
    for order in display.iter_mut() {
        if order.restaurant_name != UNKNOWN_RESTAURANT {
            continue;
        }
        match ctx.restaurants.fetch_by_id(order.restaurant_id, token) {
            Ok(restaurant) => order.restaurant_name = restaurant.name,
            Err(err) => {
                if ctx.verbose {
                    eprintln!(
                        "Warning: restaurant {} lookup failed: {}",
                        order.restaurant_id, err
                    );
                }
            }
        }
    }
}

fn print_order(order: &DisplayOrder) {
    println!(
        "Order {} [{}] - {} - ${:.2}",
        order.order_id, order.status, order.restaurant_name, order.total_amount
    );
    for item in &order.items {
        println!(
            "    {} x {} @ ${:.2} = ${:.2}",
            item.name,
            item.quantity,
            item.unit_price,
            item.line_total()
        );
    }
    if let Some(method) = &order.payment_method {
        println!("    Paid via: {}", method);
    }
    if let Some(placed_at) = &order.placed_at {
        println!("    Placed:   {}", placed_at.format("%Y-%m-%d %H:%M UTC"));
    }
}

pub fn run_checkout(ctx: &Context, order_file: &Path) -> Result<()> {
    let content = std::fs::read_to_string(order_file)
        .map_err(|e| anyhow!("Cannot read order file {}: {}", order_file.display(), e))?;
    let request: CheckoutRequest = toml::from_str(&content)
        .map_err(|e| anyhow!("Order file {} is not valid: {}", order_file.display(), e))?;

    if let Err(errors) = request.validate() {
        eprintln!("Please correct the order details:");
        for error in &errors {
            eprintln!("  {}", error);
        }
        return Err(anyhow!("checkout blocked by {} validation error(s)", errors.len()));
    }

    let (subject, token) = ctx.require_login()?;
    let profile = ctx
        .auth
        .fetch_profile(&subject, &token)
        .map_err(|e| anyhow!("Cannot resolve your account id: {}", e))?;

    let session = ctx.session.borrow().current();
    let placed = checkout::place_order(
        ctx.orders.as_ref(),
        ctx.payments.as_ref(),
        &mut ctx.cache.borrow_mut(),
        &session,
        profile.user_id,
        &request,
    )?;

    {
        let mut journal = ctx.journal.borrow_mut();
        let _ = journal.order_placed(&placed.order_id, request.restaurant_id, placed.total_amount);
        let _ = journal.payment_processed(&placed.order_id, &request.payment_method);
    }

    println!("Order Placed Successfully!");
    println!("Order ID: {}", placed.order_id);
    println!("Total:    ${:.2}", placed.total_amount);
    if ctx.verbose {
        println!("Payment:  {}", placed.payment_result.trim());
    }

    run_simulate_delivery(ctx, &placed.order_id, Some(ctx.config.delivery_delay_ms()))
}

pub fn run_add_restaurant(
    ctx: &Context,
    name: &str,
    address: &str,
    phone: &str,
    email: &str,
) -> Result<()> {
    let submission = NewRestaurant {
        name: name.to_string(),
        address: address.to_string(),
        phone_number: phone.to_string(),
        email: email.to_string(),
    };
    let errors = submission.validate();
    if !errors.is_empty() {
        eprintln!("Please correct the restaurant details:");
        for error in &errors {
            eprintln!("  {}", error);
        }
        return Err(anyhow!(
            "restaurant registration blocked by {} validation error(s)",
            errors.len()
        ));
    }

    let (_, token) = ctx.require_login()?;
    if !ctx.session.borrow().current().has_role("ADMIN") {
        return Err(anyhow!("Only administrators can add restaurants."));
    }

    let added = ctx.restaurants.add(&submission, &token)?;
    let _ = ctx.journal.borrow_mut().restaurant_added(&added.name, added.id);
    println!(
        "Restaurant '{}' added successfully with ID: {}",
        added.name, added.id
    );
    Ok(())
}

pub fn run_route(ctx: &Context, path: &str) -> Result<()> {
    let session = ctx.session.borrow();
    let access = guard::decide_path(session.state(), path);
    let required = guard::required_roles(path);
    if required.is_empty() {
        println!("{}: public -> {}", path, access.as_str());
    } else {
        let roles: Vec<&str> = required.iter().map(|s| s.as_str()).collect();
        println!("{}: requires {} -> {}", path, roles.join("|"), access.as_str());
    }
    Ok(())
}

pub fn run_simulate_delivery(ctx: &Context, order_id: &str, delay_ms: Option<u64>) -> Result<()> {
    let delay_ms = delay_ms.unwrap_or_else(|| ctx.config.delivery_delay_ms());
    if ctx.cache.borrow().get(order_id).is_none() {
        return Err(anyhow!("No cached order with id '{}'", order_id));
    }
    let _ = ctx.journal.borrow_mut().delivery_simulated(order_id, delay_ms);

    let handle = cache::simulate_delayed_delivery(
        ctx.state_dir.clone(),
        ctx.config.cache.policy(),
        order_id.to_string(),
        Duration::from_millis(delay_ms),
    );
    // Local simulation only; if this process were killed first, the
    // transition would simply be lost.
    match handle.join() {
        Ok(true) => println!("Order {} marked DELIVERED (local simulation).", order_id),
        Ok(false) => println!("Order {} was evicted before the simulation fired.", order_id),
        Err(_) => eprintln!("Warning: delivery simulation did not complete"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_status_filter_tabs() {
        assert_eq!(
            resolve_status_filter("current", None).unwrap(),
            Some("PENDING".to_string())
        );
        assert_eq!(
            resolve_status_filter("past", None).unwrap(),
            Some("DELIVERED".to_string())
        );
        assert_eq!(resolve_status_filter("all", None).unwrap(), None);
    }

    #[test]
    fn test_resolve_status_filter_explicit_overrides_tab() {
        assert_eq!(
            resolve_status_filter("current", Some("CANCELLED")).unwrap(),
            Some("CANCELLED".to_string())
        );
        assert_eq!(
            resolve_status_filter("current", Some("delivered")).unwrap(),
            Some("DELIVERED".to_string())
        );
        assert_eq!(resolve_status_filter("past", Some("All")).unwrap(), None);
    }

    #[test]
    fn test_resolve_status_filter_rejects_unknown() {
        assert!(resolve_status_filter("current", Some("SHIPPED")).is_err());
        assert!(resolve_status_filter("yesterday", None).is_err());
    }
}
