// SPDX-FileCopyrightText: 2025 Nomadic Labs <contact@nomadic-labs.com>
//
// SPDX-License-Identifier: MIT

//! BlockTicket storefront CLI.
//!
//! All authoritative state lives in the ticketing contract; this binary
//! orchestrates reads and writes against it from the configured wallet:
//! browsing events, buying tickets, rendering scannable ticket codes, and
//! the admin and verification consoles. `serve` runs the minimal backend
//! that hands out currency-conversion rates and a health check.

use anyhow::Result;
use chrono::DateTime;
use clap::{Parser, Subcommand};
use ethers::signers::Signer;
use ethers::types::H160;
use ethers::utils::format_units;
use qrcode::render::unicode;
use tokio::task::spawn_blocking;
use tokio::try_join;
use url::Url;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use blockticket::box_office::BoxOffice;
use blockticket::client::Client;
use blockticket::config::{Config, ConfigUpdate};
use blockticket::display;
use blockticket::error::StorefrontError;
use blockticket::ledger::EvmLedger;
use blockticket::qr;
use blockticket::rates::RateService;
use blockticket::server::RateServer;
use blockticket::shutdown::Shutdown;
use blockticket::types::{EventDraft, EventSnapshot, Ticket, TicketTier};
use blockticket::wallet::{ConfiguredWallet, WalletSession};

#[derive(Debug, Parser)]
#[command(author, version, about = "Storefront CLI for the BlockTicket ticketing contract")]
struct Cli {
    #[arg(short, long)]
    config_file: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Set the RPC endpoint, contract address and related settings
    Configure {
        #[arg(long)]
        endpoint: Option<String>,
        #[arg(long)]
        contract: Option<H160>,
        /// Public storefront origin used in QR verification links
        #[arg(long)]
        origin: Option<String>,
        /// Base URL of the exchange-rate service
        #[arg(long)]
        rate_endpoint: Option<String>,
        #[arg(long, value_name = "WALLET_SK")]
        wallet_sk: Option<String>,
    },
    /// Chain, wallet and contract status
    Status,
    /// Run the rate/health backend
    Serve {
        #[arg(long, default_value_t = ([127, 0, 0, 1], 3000).into())]
        listen: SocketAddr,
    },
    /// List all events
    Events,
    /// Show one event with per-tier availability
    Event { event_id: u64 },
    /// Buy tickets for one event tier
    Buy {
        #[arg(long)]
        event: u64,
        #[arg(long)]
        tier: TicketTier,
        #[arg(long, default_value_t = 1)]
        quantity: u32,
    },
    /// List tickets owned by the configured wallet
    Tickets,
    /// Render the scannable code for a ticket
    Qr { ticket_id: u64 },
    /// Check a ticket against the ledger
    Verify { ticket_id: u64 },
    /// Mark a ticket as used
    Checkin { ticket_id: u64 },
    /// Create a new event (admin only)
    CreateEvent {
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: String,
        #[arg(long)]
        venue: String,
        /// RFC 3339 or epoch seconds
        #[arg(long)]
        date: String,
        /// KES per tier: regular,vip,vvip
        #[arg(long, value_delimiter = ',')]
        prices: Vec<f64>,
        #[arg(long, value_delimiter = ',')]
        supply: Vec<u64>,
    },
    /// Update an existing event (admin only)
    UpdateEvent {
        #[arg(long)]
        event: u64,
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: String,
        #[arg(long)]
        venue: String,
        /// RFC 3339 or epoch seconds
        #[arg(long)]
        date: String,
        /// KES per tier: regular,vip,vvip
        #[arg(long, value_delimiter = ',')]
        prices: Vec<f64>,
        #[arg(long, value_delimiter = ',')]
        supply: Vec<u64>,
    },
    /// Mark an event inactive (admin only)
    DeleteEvent { event_id: u64 },
    /// Grant the admin role (owner only)
    AddAdmin { address: H160 },
    /// Revoke the admin role (owner only)
    RemoveAdmin { address: H160 },
}

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = tracing_subscriber::FmtSubscriber::new();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set subscriber");

    let cli = spawn_blocking(Cli::parse).await?;
    let config_path: PathBuf = if let Some(path) = cli.config_file {
        path.into()
    } else {
        Config::config_path().await?
    };

    match cli.command {
        Commands::Configure {
            endpoint,
            contract,
            origin,
            rate_endpoint,
            wallet_sk,
        } => {
            Config::configure(
                &config_path,
                ConfigUpdate {
                    endpoint,
                    contract,
                    origin,
                    rate_endpoint,
                    wallet_sk,
                },
            )
            .await?
        }
        Commands::Serve { listen } => serve(listen).await?,
        command => {
            let config = Config::load(&config_path).await?;
            run_command(command, &config).await?;
        }
    };

    Ok(())
}

async fn serve(listen: SocketAddr) -> Result<()> {
    let shutdown = Shutdown::default();
    let server = RateServer::new(listen, shutdown.subscribe());

    let server_handle = tokio::spawn(server.serve());
    let shutdown_handle = tokio::spawn(shutdown.run());

    let (server_result, shutdown_result) = try_join!(server_handle, shutdown_handle)?;
    server_result?;
    shutdown_result?;
    Ok(())
}

async fn run_command(command: Commands, config: &Config) -> Result<()> {
    let client = Client::new(config).await?;
    let session = WalletSession::new(Arc::new(ConfiguredWallet::new(
        config.wallet().map(|wallet| wallet.address()),
    )));
    session.restore().await;

    let rates = RateService::new(Url::parse(config.rate_endpoint())?);
    let office = BoxOffice::new(EvmLedger::new(&client), rates, session.clone());

    match command {
        Commands::Status => {
            let (gas_price, balance) =
                try_join!(client.gas_price(), client.balance(client.address()))?;
            println!("chain_id\t\t{}", client.chain_id());
            println!("gas_price\t\t{}\tGwei", format_units(gas_price, "gwei")?);
            println!("\nwallet_address\t\t{:?}", client.address());
            println!("wallet_balance\t\t{}\tETH", format_units(balance, "ether")?);
            println!("wallet_connected\t{}", session.is_connected());
            println!("\nevents_issued\t\t{}", office.event_counter().await);
            if let Some(owner) = office.contract_owner().await {
                println!("contract_owner\t\t{owner:?}");
            }
            println!("is_admin\t\t{}", office.check_admin(client.address()).await);
        }
        Commands::Events => {
            let events = office.list_events().await;
            if events.is_empty() {
                println!("No events found");
            }
            for snapshot in &events {
                print_event(snapshot);
            }
        }
        Commands::Event { event_id } => {
            let snapshot = office.event_details(event_id).await?;
            print_event(&snapshot);
        }
        Commands::Buy {
            event,
            tier,
            quantity,
        } => {
            let outcomes = office.purchase_tickets(event, tier, quantity).await?;
            for outcome in &outcomes {
                println!("purchased\t{:?}", outcome.tx_hash);
            }
            println!("{} ticket(s) purchased", outcomes.len());
        }
        Commands::Tickets => {
            let owner = session.address().ok_or(StorefrontError::WalletNotConnected)?;
            let tickets = office.user_tickets(owner).await?;
            if tickets.is_empty() {
                println!("No tickets owned by {owner:?}");
            }
            for ticket in &tickets {
                print_ticket(ticket);
            }
        }
        Commands::Qr { ticket_id } => {
            let ticket = office.ticket(ticket_id).await?;
            let snapshot = office.event_details(ticket.event_id).await?;
            let (payload, code) = qr::ticket_code(
                &ticket,
                &snapshot.event.name,
                snapshot.event.event_date,
                config.origin(),
            )?;
            println!("{}", code.render::<unicode::Dense1x2>().build());
            println!("payload: {payload}");
        }
        Commands::Verify { ticket_id } => {
            let verified = office.verify_ticket(ticket_id).await?;
            println!("ticket_id\t{}", verified.ticket.ticket_id);
            println!(
                "event\t\t{} ({})",
                verified.event_name,
                format_date(verified.event_date)
            );
            println!("tier\t\t{}", verified.ticket.ticket_type);
            println!("owner\t\t{}", verified.ticket.owner);
            println!("valid\t\t{}", verified.is_valid);
            println!("used\t\t{}", verified.is_used);
            if let Some(seat) = &verified.ticket.seat {
                println!("seat\t\t{seat}");
            }
        }
        Commands::Checkin { ticket_id } => {
            let outcome = office.check_in(ticket_id).await?;
            println!("marked used\t{:?}", outcome.tx_hash);
        }
        Commands::CreateEvent {
            name,
            description,
            venue,
            date,
            prices,
            supply,
        } => {
            let draft = EventDraft {
                name,
                description,
                venue,
                event_date: parse_event_date(&date)?,
                prices_kes: triple(prices, "--prices")?,
                supply: triple(supply, "--supply")?,
            };
            let outcome = office.create_event(&draft).await?;
            println!("event created\t{:?}", outcome.tx_hash);
        }
        Commands::UpdateEvent {
            event,
            name,
            description,
            venue,
            date,
            prices,
            supply,
        } => {
            let draft = EventDraft {
                name,
                description,
                venue,
                event_date: parse_event_date(&date)?,
                prices_kes: triple(prices, "--prices")?,
                supply: triple(supply, "--supply")?,
            };
            let outcome = office.update_event(event, &draft).await?;
            println!("event updated\t{:?}", outcome.tx_hash);
        }
        Commands::DeleteEvent { event_id } => {
            let outcome = office.delete_event(event_id).await?;
            println!("event deleted\t{:?}", outcome.tx_hash);
        }
        Commands::AddAdmin { address } => {
            let outcome = office.add_admin(address).await?;
            println!("admin added\t{:?}", outcome.tx_hash);
        }
        Commands::RemoveAdmin { address } => {
            let outcome = office.remove_admin(address).await?;
            println!("admin removed\t{:?}", outcome.tx_hash);
        }
        Commands::Configure { .. } | Commands::Serve { .. } => unreachable!("handled in main"),
    };

    Ok(())
}

fn print_event(snapshot: &EventSnapshot) {
    let event = &snapshot.event;
    let status = if event.is_active { "active" } else { "inactive" };
    println!(
        "#{}\t{}\t{}\t{}\t{status}",
        event.event_id,
        event.name,
        event.venue,
        format_date(event.event_date)
    );
    for tier in TicketTier::ALL {
        let index = tier.index();
        println!(
            "\t{tier}\t{}\t{} of {} left",
            display::format_kes(event.prices[index]),
            snapshot.available[index],
            event.supply[index]
        );
    }
}

fn print_ticket(ticket: &Ticket) {
    let status = if ticket.is_used { "used" } else { "unused" };
    println!(
        "#{}\tevent {}\t{}\t{}\t{status}",
        ticket.ticket_id,
        ticket.event_id,
        ticket.ticket_type,
        display::format_kes(ticket.purchase_price)
    );
    if let Some(seat) = &ticket.seat {
        println!("\tseat: {seat}");
    }
}

fn format_date(secs: u64) -> String {
    DateTime::from_timestamp(secs as i64, 0)
        .map(|date| date.to_rfc3339())
        .unwrap_or_else(|| secs.to_string())
}

fn parse_event_date(text: &str) -> Result<u64> {
    if let Ok(date) = DateTime::parse_from_rfc3339(text) {
        return Ok(date.timestamp().max(0) as u64);
    }
    text.parse()
        .map_err(|_| anyhow::anyhow!("--date must be RFC 3339 or epoch seconds"))
}

fn triple<T: Copy + std::fmt::Debug>(values: Vec<T>, flag: &str) -> Result<[T; 3]> {
    values.try_into().map_err(|values: Vec<T>| {
        anyhow::anyhow!("{flag} needs exactly three values (regular,vip,vvip), got {values:?}")
    })
}
