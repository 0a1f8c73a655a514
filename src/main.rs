mod cache;
mod checkout;
mod cli;
mod config;
mod guard;
mod journal;
mod services;
mod session;
mod token;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::cell::RefCell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "expressbite", about = "ExpressBite food-delivery client")]
pub struct Args {
    #[arg(long, help = "Config file path")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Debug output (print effective settings)")]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Authenticate and start a session
    Login {
        username: String,
        #[arg(long, env = "EXPRESSBITE_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Clear the current session
    Logout,
    /// Register a new account
    Register {
        name: String,
        email: String,
        #[arg(long, env = "EXPRESSBITE_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Show the current session
    Whoami,
    /// Fetch the logged-in user's profile
    Profile,
    /// List orders, merged with locally cached detail
    Orders {
        #[arg(long, default_value = "current", help = "Tab: current, past, or all")]
        tab: String,
        #[arg(long, help = "Status filter: PENDING, DELIVERED, CANCELLED, or All")]
        status: Option<String>,
    },
    /// Place an order described by a TOML order file
    Checkout {
        order_file: PathBuf,
    },
    /// Register a new restaurant (administrators only)
    AddRestaurant {
        name: String,
        address: String,
        #[arg(long)]
        phone: String,
        #[arg(long)]
        email: String,
    },
    /// Show the access decision for a route path
    Route {
        path: String,
    },
    /// Locally mark a cached order DELIVERED after a delay
    SimulateDelivery {
        order_id: String,
        #[arg(long, value_name = "MS")]
        delay_ms: Option<u64>,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let cfg = if let Some(config_path) = &args.config {
        config::Config::load_from(config_path)?
    } else {
        config::Config::load().unwrap_or_default()
    };

    if let Err(errors) = cfg.validate() {
        for error in &errors {
            eprintln!("Config error: {}", error);
        }
        return Err(anyhow::anyhow!("invalid configuration"));
    }

    let state_dir = cfg.state_dir();
    std::fs::create_dir_all(&state_dir)?;

    if args.debug {
        eprintln!("[DEBUG] Auth service:       {}", cfg.services.auth_url());
        eprintln!("[DEBUG] Order service:      {}", cfg.services.orders_url());
        eprintln!("[DEBUG] Payment service:    {}", cfg.services.payments_url());
        eprintln!("[DEBUG] Restaurant service: {}", cfg.services.restaurants_url());
        eprintln!("[DEBUG] State dir:          {}", state_dir.display());
    }

    let run_id = uuid::Uuid::new_v4().to_string();
    let journal = journal::Journal::new(&state_dir.join("activity.jsonl"), &run_id)?;

    let session_store = session::SessionStore::new(&state_dir);
    let order_cache = cache::OrderCache::open(&state_dir, cfg.cache.policy());

    let ctx = cli::Context {
        state_dir,
        session: RefCell::new(session::SessionContext::new(session_store)),
        cache: RefCell::new(order_cache),
        journal: RefCell::new(journal),
        auth: Box::new(services::auth::AuthClient::new(&cfg.services.auth_url())),
        orders: Box::new(services::orders::OrderClient::new(&cfg.services.orders_url())),
        payments: Box::new(services::payments::PaymentClient::new(
            &cfg.services.payments_url(),
        )),
        restaurants: Box::new(services::restaurants::RestaurantClient::new(
            &cfg.services.restaurants_url(),
        )),
        verbose: args.verbose,
        config: cfg,
    };

    // Start-up rehydration: until this runs, route decisions are Pending.
    {
        let mut session = ctx.session.borrow_mut();
        let restored = session.restore();
        let subject = restored.subject().map(|s| s.to_string());
        drop(session);
        let _ = ctx.journal.borrow_mut().session_restored(subject.as_deref());
        if args.verbose {
            match subject {
                Some(s) => eprintln!("Session restored for {}", s),
                None => eprintln!("No stored session"),
            }
        }
    }

    match &args.command {
        Command::Login { username, password } => cli::run_login(&ctx, username, password),
        Command::Logout => cli::run_logout(&ctx),
        Command::Register {
            name,
            email,
            password,
        } => cli::run_register(&ctx, name, email, password),
        Command::Whoami => cli::run_whoami(&ctx),
        Command::Profile => cli::run_profile(&ctx),
        Command::Orders { tab, status } => cli::run_orders(&ctx, tab, status.as_deref()),
        Command::Checkout { order_file } => cli::run_checkout(&ctx, order_file),
        Command::AddRestaurant {
            name,
            address,
            phone,
            email,
        } => cli::run_add_restaurant(&ctx, name, address, phone, email),
        Command::Route { path } => cli::run_route(&ctx, path),
        Command::SimulateDelivery { order_id, delay_ms } => {
            cli::run_simulate_delivery(&ctx, order_id, *delay_ms)
        }
    }
}
