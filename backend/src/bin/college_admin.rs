//! Operator commands: apply migrations and re-run payment reconciliation.
#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), deny(clippy::expect_used))]

use std::env;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, bail, eyre};
use mockable::DefaultClock;
use tokio::runtime::Builder;
use zeroize::Zeroizing;

use college_backend::domain::ports::NoOpWorkflowMetrics;
use college_backend::domain::{LedgerService, LedgerServicePorts, PaymentReference};
use college_backend::outbound::paystack::PaystackGateway;
use college_backend::outbound::persistence::{
    DbPool, DieselLedgerRepository, DieselPrincipalRepository, PoolConfig, run_pending_migrations,
};

const DATABASE_URL_ENV: &str = "COLLEGE_DATABASE_URL";
const PAYSTACK_SECRET_ENV: &str = "COLLEGE_PAYSTACK_SECRET";
const DEFAULT_PAYSTACK_BASE_URL: &str = "https://api.paystack.co";

/// `college-admin` command arguments.
#[derive(Debug, Parser)]
#[command(name = "college-admin", about = "College backend operator tasks", version)]
struct CliArgs {
    /// Database connection URL. Falls back to `COLLEGE_DATABASE_URL`.
    #[arg(long = "database-url", value_name = "url", global = true)]
    database_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Apply pending schema migrations.
    Migrate,
    /// Verify a payment reference with Paystack and record the outcome.
    Reconcile {
        /// Payment reference issued at initiation.
        reference: String,
        /// Paystack API base URL.
        #[arg(long = "paystack-base-url", default_value = DEFAULT_PAYSTACK_BASE_URL)]
        paystack_base_url: String,
        /// Gateway request timeout in seconds.
        #[arg(long = "timeout-secs", default_value_t = 10)]
        timeout_secs: u64,
    },
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .wrap_err("create Tokio runtime")?;
    runtime.block_on(async_main())
}

async fn async_main() -> Result<()> {
    let args = CliArgs::parse();
    let database_url = resolve_env(args.database_url, DATABASE_URL_ENV)?;

    match args.command {
        Command::Migrate => {
            let applied = run_pending_migrations(&database_url)
                .await
                .wrap_err("apply migrations")?;
            println!("applied={}", applied.len());
            for version in applied {
                println!("migration={version}");
            }
        }
        Command::Reconcile {
            reference,
            paystack_base_url,
            timeout_secs,
        } => {
            let reference: PaymentReference = reference
                .parse()
                .map_err(|err| eyre!("invalid payment reference: {err}"))?;
            let secret = Zeroizing::new(resolve_env(None, PAYSTACK_SECRET_ENV)?);
            let base = url::Url::parse(&paystack_base_url).wrap_err("parse Paystack base URL")?;
            let gateway = PaystackGateway::new(base, secret, Duration::from_secs(timeout_secs))
                .wrap_err("build Paystack client")?;

            let pool = DbPool::new(PoolConfig::new(&database_url).with_max_size(2))
                .await
                .wrap_err("create database pool")?;
            let ledger = LedgerService::new(
                LedgerServicePorts {
                    ledger: Arc::new(DieselLedgerRepository::new(pool.clone())),
                    principals: Arc::new(DieselPrincipalRepository::new(pool)),
                    gateway: Arc::new(gateway),
                    metrics: Arc::new(NoOpWorkflowMetrics),
                },
                Arc::new(DefaultClock),
            );

            let payment = ledger
                .reconcile(&reference)
                .await
                .map_err(|err| eyre!("reconcile {reference}: {err}"))?;
            println!("reference={}", payment.reference);
            println!("status={}", payment.status.as_str());
            println!("amount={}", payment.amount);
            if let Some(receipt) = payment.receipt_number.as_deref() {
                println!("receipt={receipt}");
            }
        }
    }
    Ok(())
}

fn resolve_env(explicit: Option<String>, name: &str) -> Result<String> {
    if let Some(value) = explicit {
        if value.trim().is_empty() {
            bail!("--database-url must not be empty");
        }
        return Ok(value);
    }
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => bail!("{name} is not set"),
    }
}
