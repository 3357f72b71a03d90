//! Hygiene Complaint Tracker CLI
//!
//! Drives the escalation engine over a JSON-file store.
//!
//! # Usage
//!
//! ```bash
//! hygiene-tracker poll                      # engine pass every 5s until Ctrl-C
//! hygiene-tracker sweep                     # one pass, print summary
//! hygiene-tracker ranking                   # supervisor leaderboard
//! hygiene-tracker show HYG-7KQ2M9XD         # one ticket as JSON
//! hygiene-tracker board supervisor SUP-36   # one portal's buckets
//! hygiene-tracker submit --location 36-2nd --category washroom ...
//! hygiene-tracker accept HYG-7KQ2M9XD --by SUP-36
//! hygiene-tracker resolve HYG-7KQ2M9XD --by SUP-36 --photo after.jpg
//! hygiene-tracker rate HYG-7KQ2M9XD --by 123 4
//! hygiene-tracker vendor-decide HYG-7KQ2M9XD --by VENDOR warn
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;

use hygiene_tracker::events::EventFilter;
use hygiene_tracker::notify::SharedNotifier;
use hygiene_tracker::views::{
    status_label, AuthorityBoard, Overview, ReporterSummary, SupervisorBoard, TicketCard,
    VendorQueue,
};
use hygiene_tracker::{
    Actor, DirPhotoStore, JsonFileStore, Location, LogNotifier, NewTicket, NullNotifier, PartyId,
    PhotoPayload, Poller, Reporter, SystemClock, Ticket, TicketId, TrackerConfig, TrackerResult,
    VendorDecision, Workflow,
};

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TOML config file (defaults, then file, then TRACKER_* env, then flags)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// JSON store path (overrides TRACKER_STORE_PATH)
    #[arg(long, global = true)]
    store_path: Option<PathBuf>,

    /// Photo directory (overrides TRACKER_PHOTO_DIR)
    #[arg(long, global = true)]
    photo_dir: Option<PathBuf>,

    /// Disable auto-accept and summon alerts
    #[arg(long, global = true, default_value_t = false)]
    no_alerts: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the escalation engine every interval until Ctrl-C
    Poll {
        /// Seconds between passes (overrides TRACKER_POLL_INTERVAL_SECS)
        #[arg(long)]
        interval_secs: Option<u64>,
    },
    /// Run one escalation pass
    Sweep,
    /// Print the supervisor leaderboard
    Ranking,
    /// Print one ticket
    Show { ticket: String },
    /// Print one portal's view
    Board {
        #[arg(value_enum)]
        role: Role,
        /// Supervisor party id or reporter uid
        id: Option<String>,
    },
    /// File a new complaint
    Submit {
        /// `36`, `36-2nd` or a `block-36-2floor` deep link
        #[arg(long)]
        location: String,
        #[arg(long)]
        category: String,
        #[arg(long)]
        description: String,
        #[arg(long)]
        reporter_uid: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        reg_no: String,
        #[arg(long)]
        phone: String,
        /// Image file to attach
        #[arg(long)]
        photo: Option<PathBuf>,
    },
    /// Supervisor accepts a new ticket
    Accept {
        ticket: String,
        #[arg(long)]
        by: String,
    },
    /// Supervisor submits resolution evidence
    Resolve {
        ticket: String,
        #[arg(long)]
        by: String,
        #[arg(long)]
        photo: PathBuf,
    },
    /// Reporter rates a resolution (1-5)
    Rate {
        ticket: String,
        #[arg(long)]
        by: String,
        #[arg(value_parser = clap::value_parser!(u8).range(1..=5))]
        rating: u8,
    },
    /// Reporter rejects a resolution and reopens the ticket
    Reject {
        ticket: String,
        #[arg(long)]
        by: String,
    },
    /// Authority office resolves an escalated ticket
    AoResolve {
        ticket: String,
        #[arg(long)]
        by: String,
        #[arg(long)]
        photo: PathBuf,
    },
    /// Authority summons the supervisor over a low rating
    Summon {
        ticket: String,
        #[arg(long)]
        by: String,
    },
    /// Authority closes a quality review without further action
    ClearReview {
        ticket: String,
        #[arg(long)]
        by: String,
    },
    /// Authority hands a quality dispute to the vendor
    EscalateVendor {
        ticket: String,
        #[arg(long)]
        by: String,
    },
    /// Vendor's final call on a quality dispute
    VendorDecide {
        ticket: String,
        #[arg(long)]
        by: String,
        #[arg(value_enum)]
        decision: Decision,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Decision {
    Clear,
    Warn,
}

impl From<Decision> for VendorDecision {
    fn from(decision: Decision) -> Self {
        match decision {
            Decision::Clear => VendorDecision::Clear,
            Decision::Warn => VendorDecision::Warn,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Role {
    Supervisor,
    Authority,
    Vendor,
    Reporter,
    Admin,
}

fn load_config(args: &Args) -> Result<TrackerConfig> {
    let mut config = match &args.config {
        Some(path) => TrackerConfig::from_toml_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?
            .with_env(),
        None => TrackerConfig::from_env(),
    };

    if let Some(path) = &args.store_path {
        config.store_path = path.clone();
    }
    if let Some(dir) = &args.photo_dir {
        config.photo_dir = dir.clone();
    }
    if args.no_alerts {
        config.alerts_enabled = false;
    }
    if let Command::Poll {
        interval_secs: Some(secs),
    } = &args.command
    {
        config.poll_interval_secs = *secs;
    }
    config.validate()?;
    Ok(config)
}

async fn build_workflow(config: &TrackerConfig) -> Result<Workflow> {
    let store = JsonFileStore::open(&config.store_path)
        .await
        .with_context(|| format!("Failed to open store {}", config.store_path.display()))?
        .shared();
    let notifier: SharedNotifier = if config.alerts_enabled {
        Arc::new(LogNotifier)
    } else {
        Arc::new(NullNotifier)
    };

    Ok(Workflow::new(
        Arc::new(SystemClock),
        store.clone(),
        store,
        Arc::new(DirPhotoStore::new(&config.photo_dir)),
        notifier,
    ))
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn read_photo(path: &Path) -> Result<PhotoPayload> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read photo {}", path.display()))?;
    Ok(PhotoPayload::jpeg(bytes))
}

/// Print the new state of a manually transitioned ticket
fn report_transition(result: TrackerResult<Ticket>) -> Result<()> {
    let ticket = result.map_err(|e| anyhow::anyhow!(e.with_suggestion()))?;
    println!("{} is now {}", ticket.id, status_label(ticket.state));
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;

    let filter = config.effective_log_filter(std::env::var("RUST_LOG").ok());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_new(&filter)?)
        .with_writer(std::io::stderr)
        .init();

    info!(
        "Tracker config: store={}, photos={}, interval={}s, alerts={}",
        config.store_path.display(),
        config.photo_dir.display(),
        config.poll_interval_secs,
        config.alerts_enabled
    );

    let workflow = build_workflow(&config).await?;

    match args.command {
        Command::Poll { .. } => {
            let workflow = workflow.shared();
            let mut events = workflow.events().subscribe_filtered(EventFilter::new().types(vec![
                "transition_applied",
                "penalty_charged",
                "alert_raised",
            ]));
            let logger = tokio::spawn(async move {
                while let Ok(event) = events.recv().await {
                    info!(event_type = event.event_type(), ticket_id = ?event.ticket_id(), "Event");
                }
            });

            let handle = Poller::new(workflow, config.poll_interval()).spawn();
            tokio::signal::ctrl_c()
                .await
                .context("Failed to listen for Ctrl-C")?;
            info!("Shutting down");
            let passes = handle.stop().await;
            logger.abort();
            println!("{} escalation passes", passes);
        }

        Command::Sweep => {
            let report = workflow.run_escalation().await;
            println!("{}", report.summary());
        }

        Command::Ranking => {
            let ranking = workflow.ranking().await?;
            if ranking.is_empty() {
                println!("No supervisors recorded yet");
            }
            for row in ranking {
                let entry = &row.entry;
                println!(
                    "{:>3}. {:<10} rating={:.2} ({} rated) penalties={} missed={} resolved={} on_time={} assigned={} [{}]",
                    row.rank,
                    entry.party.as_str(),
                    entry.avg_rating,
                    entry.rated_count,
                    entry.penalty_count,
                    entry.missed_count,
                    entry.resolved_count,
                    entry
                        .on_time_rate()
                        .map_or_else(|| "-".to_string(), |rate| format!("{:.0}%", rate)),
                    entry.assigned_count,
                    row.standing
                );
            }
        }

        Command::Show { ticket } => {
            let ticket = workflow.ticket(&TicketId::new(ticket)).await?;
            let card = TicketCard::new(&ticket, workflow.now());
            println!("{} ({})", status_label(ticket.state), ticket.location);
            if let Some(countdown) = &card.countdown {
                println!("Time left: {}", countdown);
            }
            print_json(&ticket)?;
        }

        Command::Board { role, id } => {
            let snapshot = workflow.snapshot().await;
            for warning in &snapshot.warnings {
                eprintln!("warning: {}", warning);
            }
            let tickets = &snapshot.payload;
            match role {
                Role::Supervisor => {
                    let party = PartyId::new(id.context("supervisor board needs a party id")?);
                    print_json(&SupervisorBoard::build(&party, tickets))?;
                }
                Role::Authority => print_json(&AuthorityBoard::build(tickets))?,
                Role::Vendor => print_json(&VendorQueue::build(tickets))?,
                Role::Reporter => {
                    let uid = id.context("reporter summary needs a reporter uid")?;
                    print_json(&ReporterSummary::build(&uid, tickets, workflow.now()))?;
                }
                Role::Admin => print_json(&Overview::build(tickets))?,
            }
        }

        Command::Submit {
            location,
            category,
            description,
            reporter_uid,
            name,
            reg_no,
            phone,
            photo,
        } => {
            let photo = match photo {
                Some(path) => Some(read_photo(&path).await?),
                None => None,
            };
            let new = NewTicket {
                issue_category: category,
                description,
                location: Location::parse(&location)?,
                reporter: Reporter {
                    uid: reporter_uid,
                    name,
                    registration_no: reg_no,
                    phone,
                },
            };
            let ticket = workflow
                .submit_ticket(new, photo)
                .await
                .map_err(|e| anyhow::anyhow!(e.with_suggestion()))?;
            println!("{} assigned to {}", ticket.id, ticket.responsible_party);
        }

        Command::Accept { ticket, by } => {
            report_transition(workflow.accept(&TicketId::new(ticket), Actor::user(by)).await)?;
        }

        Command::Resolve { ticket, by, photo } => {
            let photo = read_photo(&photo).await?;
            report_transition(
                workflow
                    .submit_resolution(&TicketId::new(ticket), Actor::user(by), photo)
                    .await,
            )?;
        }

        Command::Rate { ticket, by, rating } => {
            report_transition(
                workflow
                    .rate(&TicketId::new(ticket), Actor::user(by), rating)
                    .await,
            )?;
        }

        Command::Reject { ticket, by } => {
            report_transition(workflow.reject(&TicketId::new(ticket), Actor::user(by)).await)?;
        }

        Command::AoResolve { ticket, by, photo } => {
            let photo = read_photo(&photo).await?;
            report_transition(
                workflow
                    .authority_resolve(&TicketId::new(ticket), Actor::user(by), photo)
                    .await,
            )?;
        }

        Command::Summon { ticket, by } => {
            report_transition(workflow.summon(&TicketId::new(ticket), Actor::user(by)).await)?;
        }

        Command::ClearReview { ticket, by } => {
            report_transition(
                workflow
                    .clear_review(&TicketId::new(ticket), Actor::user(by))
                    .await,
            )?;
        }

        Command::EscalateVendor { ticket, by } => {
            report_transition(
                workflow
                    .escalate_to_vendor(&TicketId::new(ticket), Actor::user(by))
                    .await,
            )?;
        }

        Command::VendorDecide {
            ticket,
            by,
            decision,
        } => {
            report_transition(
                workflow
                    .vendor_decide(&TicketId::new(ticket), Actor::user(by), decision.into())
                    .await,
            )?;
        }
    }

    Ok(())
}
