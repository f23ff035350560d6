//! Gymgate
//!
//! Front-desk membership management and access control.

use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Result, bail};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use gymgate::config::{self, GymConfig, KNOWN_KEYS};
use gymgate::console::{AccessConsole, AccessRequest};
use gymgate::membership::{AccessStatus, ExtendBy, Member, MemberProfile, NewMember, format_date, parse_date};
use gymgate::serial::{DeviceError, SerialPipeline, SystemSerialOpener, available_ports};
use gymgate::store::{MemberStore, RedbStore};
use gymgate::{AccessController, Error};

/// Gym membership and access control
#[derive(Parser, Debug)]
#[command(name = "gymgate")]
#[command(about = "Gym membership and access control", long_about = None)]
struct Args {
    /// Path to the member database
    #[arg(long, global = true, default_value = "./data/gym.redb")]
    db: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Register a new member
    Register {
        /// Document or card number
        #[arg(long)]
        id: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        age: Option<u32>,
        #[arg(long, default_value = "")]
        address: String,
        #[arg(long, default_value = "")]
        phone: String,
        /// Registration date (YYYY-MM-DD, default: today)
        #[arg(long, value_parser = date_arg)]
        registered: Option<NaiveDate>,
        /// Membership end date (YYYY-MM-DD, default: registration + 30 days)
        #[arg(long, value_parser = date_arg)]
        expires: Option<NaiveDate>,
    },

    /// Show one member
    Show { id: String },

    /// List members, optionally filtered by name or ID
    List {
        #[arg(short, long)]
        search: Option<String>,
    },

    /// Edit a member's details
    Update {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        age: Option<u32>,
        #[arg(long)]
        address: Option<String>,
        #[arg(long)]
        phone: Option<String>,
    },

    /// Check access for a member ID
    Check { id: String },

    /// Extend a membership (e.g. 1w, 15d, 1m, 3m, 1y)
    Extend { id: String, period: ExtendBy },

    /// Set the membership end date (also lifts a freeze)
    SetExpiry {
        id: String,
        #[arg(value_parser = date_arg)]
        date: NaiveDate,
    },

    /// Freeze an active membership or unfreeze a frozen one
    ToggleFreeze { id: String },

    /// Delete a member permanently
    Delete {
        id: String,
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },

    /// Read or change settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// List serial ports on this machine
    Ports,

    /// Run the access console (serial keypad and stdin)
    Listen {
        /// Serial port override
        #[arg(long)]
        port: Option<String>,

        /// Baud rate override
        #[arg(long, value_parser = baud_arg)]
        baud: Option<u32>,

        /// Don't read member IDs from stdin
        #[arg(long)]
        no_keypad: bool,

        /// Remember the port and baud rate for next time
        #[arg(long)]
        save: bool,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Show the effective configuration
    Show,
    /// Print a stored value
    Get { key: String },
    /// Store a value
    Set { key: String, value: String },
}

fn date_arg(s: &str) -> std::result::Result<NaiveDate, String> {
    parse_date(s).map_err(|e| e.to_string())
}

fn baud_arg(s: &str) -> std::result::Result<u32, String> {
    config::parse_baud_rate(s).map_err(|e| e.to_string())
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("gymgate=info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Parse command line arguments
    let args = Args::parse();

    let store = Arc::new(RedbStore::open(&args.db)?);
    let today = Local::now().date_naive();

    match args.command {
        Command::Register {
            id,
            name,
            age,
            address,
            phone,
            registered,
            expires,
        } => {
            let mut profile = MemberProfile::new(name).with_address(address).with_phone(phone);
            profile.age = age;
            let new_member = NewMember {
                id,
                profile,
                registration_date: registered,
                expiry_date: expires,
            };
            match store.add_member(new_member, today) {
                Ok(member) => println!("Member {} registered successfully", member.name()),
                Err(Error::DuplicateId(id)) => bail!("The ID {} already exists in the database", id),
                Err(e) => return Err(e.into()),
            }
        }

        Command::Show { id } => {
            let member = require_member(store.as_ref(), &id)?;
            print_member(&member, today);
        }

        Command::List { search } => {
            let members = match search.as_deref() {
                Some(query) if !query.trim().is_empty() => store.search_members(query)?,
                _ => store.list_members()?,
            };
            print_members(&members, today);
        }

        Command::Update {
            id,
            name,
            age,
            address,
            phone,
        } => {
            let mut profile = require_member(store.as_ref(), &id)?.profile;
            if let Some(name) = name {
                profile.name = name;
            }
            if let Some(age) = age {
                profile.age = Some(age);
            }
            if let Some(address) = address {
                profile.address = address;
            }
            if let Some(phone) = phone {
                profile.phone = phone;
            }
            store.update_member(&id, profile)?;
            println!("Details updated");
        }

        Command::Check { id } => {
            let outcome = AccessController::new(store).check_access(&id)?;
            println!("{}", outcome);
        }

        Command::Extend { id, period } => {
            let member = store.extend_membership(&id, today, period)?;
            println!(
                "Membership extended until {}",
                format_date(member.membership_end_date)
            );
        }

        Command::SetExpiry { id, date } => {
            store.set_expiry(&id, date)?;
            println!("End date updated to {}", format_date(date));
        }

        Command::ToggleFreeze { id } => {
            let member = store.toggle_freeze(&id, Local::now().naive_local())?;
            match member.frozen_date() {
                Some(since) => println!("{} frozen since {}", member.name(), format_date(since)),
                None => println!(
                    "{} unfrozen, membership now ends {}",
                    member.name(),
                    format_date(member.membership_end_date)
                ),
            }
        }

        Command::Delete { id, yes } => {
            let member = require_member(store.as_ref(), &id)?;
            if !yes {
                bail!(
                    "Refusing to delete {} without --yes; this cannot be undone",
                    member.name()
                );
            }
            store.delete_member(&id)?;
            println!("Member {} deleted", member.name());
        }

        Command::Config { action } => match action {
            ConfigAction::Show => {
                let config = GymConfig::load(store.as_ref())?;
                println!("{}", serde_json::to_string_pretty(&config)?);
            }
            ConfigAction::Get { key } => {
                println!("{}", store.get_config(&key, "")?);
            }
            ConfigAction::Set { key, value } => {
                if !KNOWN_KEYS.contains(&key.as_str()) {
                    warn!("Storing unrecognized config key: {}", key);
                }
                config::set_entry(store.as_ref(), &key, &value)?;
                println!("Saved {}", key);
            }
        },

        Command::Ports => {
            let ports = available_ports()?;
            if ports.is_empty() {
                println!("No serial ports detected");
            }
            for port in ports {
                println!("{}", port);
            }
        }

        Command::Listen {
            port,
            baud,
            no_keypad,
            save,
        } => {
            let mut config = GymConfig::load(store.as_ref())?.with_env_overrides();
            if let Some(port) = port {
                config.serial.port = Some(port).filter(|p| !p.trim().is_empty());
            }
            if let Some(baud) = baud {
                config.serial.baud_rate = baud;
            }
            if save {
                config.save_serial(store.as_ref())?;
                info!("Serial settings saved");
            }

            // The console is a single-threaded consumer
            tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?
                .block_on(listen(store, config, !no_keypad))?;
        }
    }

    Ok(())
}

fn require_member(store: &dyn MemberStore, id: &str) -> gymgate::Result<Member> {
    store
        .get_member(id)?
        .ok_or_else(|| Error::NotFound(id.to_string()))
}

fn status_label(member: &Member, today: NaiveDate) -> &'static str {
    match member.access_status(today) {
        AccessStatus::Frozen => "Frozen",
        AccessStatus::Active { .. } => "Active",
        AccessStatus::Expired => "Expired",
    }
}

fn print_member(member: &Member, today: NaiveDate) {
    println!("ID:          {}", member.id);
    println!("Name:        {}", member.name());
    println!(
        "Age:         {}",
        member.profile.age.map(|a| a.to_string()).unwrap_or_default()
    );
    println!("Address:     {}", member.profile.address);
    println!("Phone:       {}", member.profile.phone);
    println!("Registered:  {}", format_date(member.registration_date));
    println!("Expires:     {}", format_date(member.membership_end_date));
    println!("Status:      {}", status_label(member, today));
    if let Some(since) = member.frozen_date() {
        println!("Frozen on:   {}", format_date(since));
    }
}

fn print_members(members: &[Member], today: NaiveDate) {
    if members.is_empty() {
        println!("No members found.");
        return;
    }

    println!("{:<14} {:<30} {:<12} {}", "ID", "Name", "Expires", "Status");
    for member in members {
        println!(
            "{:<14} {:<30} {:<12} {}",
            member.id,
            member.name(),
            format_date(member.membership_end_date),
            status_label(member, today)
        );
    }
}

/// Run the access console until a shutdown signal arrives
///
/// Without an open serial port the console also ends once stdin closes.
async fn listen(store: Arc<RedbStore>, config: GymConfig, keypad: bool) -> Result<()> {
    info!("Starting {} access console", config.gym_name);

    let (tx, rx) = mpsc::unbounded_channel::<AccessRequest>();

    // Serial codes are forwarded from the reader thread into the console channel
    let serial_tx = tx.clone();
    let pipeline = SerialPipeline::new(
        config.serial.clone(),
        Arc::new(SystemSerialOpener),
        move |code: String| {
            let _ = serial_tx.send(AccessRequest::serial(code));
        },
    );
    let pipeline = match pipeline.start() {
        Ok(()) => Some(pipeline),
        Err(DeviceError::NotConfigured) => {
            info!("No serial port configured, keypad entry only");
            None
        }
        Err(e) => {
            error!("Could not connect to serial port: {}", e);
            None
        }
    };

    if keypad {
        spawn_keypad_reader(tx)?;
    } else {
        drop(tx);
    }

    let console = AccessConsole::new(AccessController::new(store), std::io::stdout(), &config.gym_name);
    let handled = console.run(rx, shutdown_signal()).await;
    info!("Access console stopped after {} checks", handled);

    if let Some(pipeline) = pipeline {
        tokio::task::spawn_blocking(move || pipeline.stop()).await?;
    }

    Ok(())
}

/// Read member IDs typed at the desk on a dedicated thread
fn spawn_keypad_reader(tx: mpsc::UnboundedSender<AccessRequest>) -> Result<()> {
    std::thread::Builder::new()
        .name("keypad-reader".to_string())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                match line {
                    Ok(line) => {
                        if tx.send(AccessRequest::keypad(line)).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!("Failed to read keypad input: {}", e);
                        break;
                    }
                }
            }
        })?;
    Ok(())
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down...");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down...");
        },
    }
}
