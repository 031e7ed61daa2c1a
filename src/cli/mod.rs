use std::io::stdout;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};

use crate::application::{AppError, LedgerService, NewExpense, TripBalances};
use crate::domain::{
    Cents, NewSettlement, Participant, ParticipantId, SettlementError, Trip, format_cents,
    parse_cents, split_evenly,
};
use crate::io::Exporter;

/// Tripsplit - shared travel expenses and who owes whom
#[derive(Parser)]
#[command(name = "tripsplit")]
#[command(about = "Track shared trip expenses and plan the payments that settle them")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, env = "TRIPSPLIT_DB", default_value = "tripsplit.db")]
    pub database: String,

    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Trip management commands
    #[command(subcommand)]
    Trip(TripCommands),

    /// Participant management commands
    #[command(subcommand)]
    Participant(ParticipantCommands),

    /// Expense commands
    #[command(subcommand)]
    Expense(ExpenseCommands),

    /// Show net balances and the payments that would settle them
    Balances {
        /// Trip name
        trip: String,

        /// Output format: table, json, csv
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// Record a payment made between two participants
    Settle {
        /// Trip name
        trip: String,

        /// Amount paid (e.g., "50.00" or "50")
        amount: String,

        /// Participant who paid
        #[arg(long)]
        from: String,

        /// Participant who received the money
        #[arg(long)]
        to: String,

        /// Optional note
        #[arg(short, long)]
        note: Option<String>,
    },

    /// List recorded settlements of a trip
    Settlements {
        /// Trip name
        trip: String,
    },

    /// Verify that a trip ledger balances
    Check {
        /// Trip name
        trip: String,
    },

    /// Export a trip to CSV or JSON
    Export {
        /// What to export: balances, plan, full
        export_type: String,

        /// Trip name
        trip: String,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum TripCommands {
    /// Create a new trip
    Create {
        /// Trip name (must be unique)
        name: String,
    },

    /// List all trips
    List,
}

#[derive(Subcommand)]
pub enum ParticipantCommands {
    /// Add a participant to a trip
    Add {
        /// Trip name
        trip: String,

        /// Participant name (unique within the trip)
        name: String,
    },

    /// List the participants of a trip
    List {
        /// Trip name
        trip: String,
    },
}

#[derive(Subcommand)]
pub enum ExpenseCommands {
    /// Record an expense
    Add {
        /// Trip name
        trip: String,

        /// Total amount (e.g., "90.00" or "90")
        amount: String,

        /// Participant who paid (omit if nobody fronted the money)
        #[arg(long)]
        paid_by: Option<String>,

        /// Explicit share, repeatable: --split Alice=30.00
        #[arg(long = "split", value_name = "NAME=AMOUNT")]
        splits: Vec<String>,

        /// Split equally among these participants: --even Alice,Bob
        /// (default: everyone, when no --split is given)
        #[arg(long, value_delimiter = ',', conflicts_with = "splits")]
        even: Vec<String>,

        /// Description of the expense
        #[arg(short, long)]
        description: Option<String>,

        /// Date of the expense (YYYY-MM-DD, defaults to now)
        #[arg(long)]
        date: Option<String>,
    },

    /// List the expenses of a trip
    List {
        /// Trip name
        trip: String,
    },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            Commands::Init => {
                LedgerService::init(&self.database).await?;
                println!("Database initialized: {}", self.database);
            }

            Commands::Trip(trip_cmd) => {
                let service = LedgerService::connect(&self.database).await?;
                run_trip_command(&service, trip_cmd).await?;
            }

            Commands::Participant(participant_cmd) => {
                let service = LedgerService::connect(&self.database).await?;
                run_participant_command(&service, participant_cmd).await?;
            }

            Commands::Expense(expense_cmd) => {
                let service = LedgerService::connect(&self.database).await?;
                run_expense_command(&service, expense_cmd).await?;
            }

            Commands::Balances { trip, format } => {
                let service = LedgerService::connect(&self.database).await?;
                run_balances_command(&service, &trip, &format).await?;
            }

            Commands::Settle {
                trip,
                amount,
                from,
                to,
                note,
            } => {
                let service = LedgerService::connect(&self.database).await?;
                let trip = service.get_trip(&trip).await?;
                let amount_cents =
                    parse_cents(&amount).context("Invalid amount format. Use '50.00' or '50'")?;
                let from = settlement_party(&service, &trip, &from).await?;
                let to = settlement_party(&service, &trip, &to).await?;

                let mut request = NewSettlement::new(from.id, to.id, amount_cents);
                if let Some(note) = note {
                    request = request.with_note(note);
                }

                let settlement = service.record_settlement(trip.id, request).await?;
                println!(
                    "Recorded settlement: {} {} -> {} ({})",
                    format_cents(settlement.amount_cents),
                    from.name,
                    to.name,
                    settlement.id
                );
            }

            Commands::Settlements { trip } => {
                let service = LedgerService::connect(&self.database).await?;
                run_settlements_command(&service, &trip).await?;
            }

            Commands::Check { trip } => {
                let service = LedgerService::connect(&self.database).await?;
                run_check_command(&service, &trip).await?;
            }

            Commands::Export {
                export_type,
                trip,
                output,
            } => {
                let service = LedgerService::connect(&self.database).await?;
                run_export_command(&service, &export_type, &trip, output.as_deref()).await?;
            }
        }

        Ok(())
    }
}

async fn run_trip_command(service: &LedgerService, cmd: TripCommands) -> Result<()> {
    match cmd {
        TripCommands::Create { name } => {
            let trip = service.create_trip(name).await?;
            println!("Created trip: {} ({})", trip.name, trip.id);
        }

        TripCommands::List => {
            let trips = service.list_trips().await?;
            if trips.is_empty() {
                println!("No trips found.");
            } else {
                println!("{:<24} {:<12}", "NAME", "CREATED");
                println!("{}", "-".repeat(37));
                for trip in trips {
                    println!(
                        "{:<24} {:<12}",
                        truncate(&trip.name, 24),
                        trip.created_at.format("%Y-%m-%d")
                    );
                }
            }
        }
    }
    Ok(())
}

async fn run_participant_command(service: &LedgerService, cmd: ParticipantCommands) -> Result<()> {
    match cmd {
        ParticipantCommands::Add { trip, name } => {
            let trip = service.get_trip(&trip).await?;
            let participant = service.add_participant(trip.id, name).await?;
            println!("Added {} to {}", participant.name, trip.name);
        }

        ParticipantCommands::List { trip } => {
            let trip = service.get_trip(&trip).await?;
            let participants = service.list_participants(trip.id).await?;
            if participants.is_empty() {
                println!("No participants in {}.", trip.name);
            } else {
                for participant in participants {
                    println!("{}", participant.name);
                }
            }
        }
    }
    Ok(())
}

async fn run_expense_command(service: &LedgerService, cmd: ExpenseCommands) -> Result<()> {
    match cmd {
        ExpenseCommands::Add {
            trip,
            amount,
            paid_by,
            splits,
            even,
            description,
            date,
        } => {
            let trip = service.get_trip(&trip).await?;
            let amount_cents =
                parse_cents(&amount).context("Invalid amount format. Use '90.00' or '90'")?;

            let paid_by = match paid_by {
                Some(name) => Some(service.get_participant(trip.id, &name).await?.id),
                None => None,
            };

            let shares = resolve_shares(service, &trip, amount_cents, &splits, &even).await?;

            let spent_at = match date {
                Some(date_str) => parse_date(&date_str).with_context(|| {
                    format!("Invalid date format '{}'. Use YYYY-MM-DD", date_str)
                })?,
                None => Utc::now(),
            };

            let expense = service
                .record_expense(
                    trip.id,
                    NewExpense {
                        description,
                        amount_cents,
                        paid_by,
                        splits: shares,
                        spent_at,
                    },
                )
                .await?;

            println!(
                "Recorded expense: {} split {} way(s) ({})",
                format_cents(expense.amount_cents),
                expense.splits.len(),
                expense.id
            );
        }

        ExpenseCommands::List { trip } => {
            let trip = service.get_trip(&trip).await?;
            let participants = service.list_participants(trip.id).await?;
            let name_of = |id: Option<ParticipantId>| -> String {
                id.and_then(|id| participants.iter().find(|p| p.id == id))
                    .map(|p| p.name.clone())
                    .unwrap_or_else(|| "-".to_string())
            };

            let expenses = service.list_expenses(trip.id).await?;
            if expenses.is_empty() {
                println!("No expenses in {}.", trip.name);
                return Ok(());
            }

            println!(
                "{:<12} {:>12} {:<16} {:<30}",
                "DATE", "AMOUNT", "PAID BY", "DESCRIPTION"
            );
            println!("{}", "-".repeat(73));
            for expense in expenses {
                println!(
                    "{:<12} {:>12} {:<16} {:<30}",
                    expense.spent_at.format("%Y-%m-%d"),
                    format_cents(expense.amount_cents),
                    truncate(&name_of(expense.paid_by), 16),
                    truncate(expense.description.as_deref().unwrap_or(""), 30)
                );
            }
        }
    }
    Ok(())
}

/// Turn `--split NAME=AMOUNT` / `--even A,B` arguments into shares.
/// With neither, the amount is divided among every participant.
async fn resolve_shares(
    service: &LedgerService,
    trip: &Trip,
    amount_cents: Cents,
    splits: &[String],
    even: &[String],
) -> Result<Vec<(ParticipantId, Cents)>> {
    if !splits.is_empty() {
        let mut shares = Vec::with_capacity(splits.len());
        for raw in splits {
            let (name, share) = parse_share(raw)?;
            let participant = service.get_participant(trip.id, name).await?;
            shares.push((participant.id, share));
        }
        return Ok(shares);
    }

    let ids = if even.is_empty() {
        service
            .list_participants(trip.id)
            .await?
            .into_iter()
            .map(|p| p.id)
            .collect::<Vec<_>>()
    } else {
        let mut ids = Vec::with_capacity(even.len());
        for name in even {
            ids.push(service.get_participant(trip.id, name.trim()).await?.id);
        }
        ids
    };

    Ok(split_evenly(amount_cents, &ids))
}

/// Parse "Alice=30.00" into a name and an amount in cents.
fn parse_share(raw: &str) -> Result<(&str, Cents)> {
    let (name, amount) = raw
        .split_once('=')
        .ok_or_else(|| anyhow::anyhow!("Invalid split '{}'. Use NAME=AMOUNT", raw))?;
    let cents = parse_cents(amount)
        .with_context(|| format!("Invalid amount in split '{}'", raw))?;
    Ok((name.trim(), cents))
}

async fn run_balances_command(service: &LedgerService, trip: &str, format: &str) -> Result<()> {
    let trip = service.get_trip(trip).await?;

    if format == "csv" {
        Exporter::new(service)
            .export_balances_csv(trip.id, stdout())
            .await?;
        return Ok(());
    }

    let result = service.get_trip_balances(trip.id).await?;
    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&result)?),
        _ => print_balances_table(&trip, &result),
    }
    Ok(())
}

fn print_balances_table(trip: &Trip, result: &TripBalances) {
    if result.balances.is_empty() {
        println!("No participants in {}.", trip.name);
        return;
    }

    println!("Balances for {}", trip.name);
    println!();
    println!("{:<20} {:>12}", "PARTICIPANT", "NET");
    println!("{}", "-".repeat(33));
    for balance in &result.balances {
        println!(
            "{:<20} {:>12}",
            truncate(&balance.name, 20),
            format_cents(balance.net)
        );
    }
    println!();

    if result.transactions.is_empty() {
        println!("Everyone is settled up.");
    } else {
        println!("Suggested payments:");
        for transaction in &result.transactions {
            println!(
                "  {} -> {}: {}",
                transaction.from.name,
                transaction.to.name,
                format_cents(transaction.amount)
            );
        }
    }
}

/// Resolve a settlement party by name. A name outside the trip is a
/// rejected settlement, not a missing record.
async fn settlement_party(
    service: &LedgerService,
    trip: &Trip,
    name: &str,
) -> Result<Participant, AppError> {
    match service.get_participant(trip.id, name).await {
        Err(AppError::ParticipantNotFound(name)) => {
            tracing::warn!(trip = %trip.name, participant = %name, "settlement rejected");
            Err(SettlementError::UnknownParticipant(name).into())
        }
        other => other,
    }
}

async fn run_settlements_command(service: &LedgerService, trip: &str) -> Result<()> {
    let trip = service.get_trip(trip).await?;
    let participants = service.list_participants(trip.id).await?;
    let settlements = service.list_settlements(trip.id).await?;

    if settlements.is_empty() {
        println!("No settlements in {}.", trip.name);
        return Ok(());
    }

    let name_of = |id: ParticipantId| -> String {
        participants
            .iter()
            .find(|p| p.id == id)
            .map(|p| p.name.clone())
            .unwrap_or_else(|| "?".to_string())
    };

    println!(
        "{:<12} {:<16} {:<16} {:>12}  {}",
        "DATE", "FROM", "TO", "AMOUNT", "NOTE"
    );
    println!("{}", "-".repeat(72));
    for settlement in settlements {
        println!(
            "{:<12} {:<16} {:<16} {:>12}  {}",
            settlement.created_at.format("%Y-%m-%d"),
            truncate(&name_of(settlement.from_id), 16),
            truncate(&name_of(settlement.to_id), 16),
            format_cents(settlement.amount_cents),
            settlement.note.as_deref().unwrap_or("")
        );
    }
    Ok(())
}

async fn run_check_command(service: &LedgerService, trip: &str) -> Result<()> {
    let trip = service.get_trip(trip).await?;
    println!("Checking ledger for {}...\n", trip.name);

    let report = service.check_trip(trip.id).await?;

    println!("Participants: {}", report.participant_count);
    println!("Expenses:     {}", report.expense_count);
    println!("Settlements:  {}", report.settlement_count);
    println!(
        "Net total:    {}  {}",
        format_cents(report.imbalance),
        if report.is_balanced() {
            "OK"
        } else {
            "UNBALANCED!"
        }
    );
    println!();

    if report.is_healthy() {
        println!("Ledger is consistent.");
    } else {
        println!("Issues found:");
        for issue in &report.issues {
            println!("  - {}", issue);
        }
        anyhow::bail!("Ledger integrity check failed");
    }
    Ok(())
}

async fn run_export_command(
    service: &LedgerService,
    export_type: &str,
    trip: &str,
    output: Option<&str>,
) -> Result<()> {
    use std::fs::File;
    use std::io::Write;

    let trip = service.get_trip(trip).await?;
    let exporter = Exporter::new(service);

    let writer: Box<dyn Write> = match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path))?;
            Box::new(file)
        }
        None => Box::new(stdout()),
    };

    match export_type {
        "balances" => {
            let count = exporter.export_balances_csv(trip.id, writer).await?;
            if output.is_some() {
                eprintln!("Exported {} balances", count);
            }
        }
        "plan" => {
            let count = exporter.export_plan_csv(trip.id, writer).await?;
            if output.is_some() {
                eprintln!("Exported {} payments", count);
            }
        }
        "full" => {
            let snapshot = exporter.export_trip_json(trip.id, writer).await?;
            if output.is_some() {
                eprintln!(
                    "Exported {}: {} participants, {} expenses, {} settlements",
                    snapshot.trip.name,
                    snapshot.participants.len(),
                    snapshot.expenses.len(),
                    snapshot.settlements.len()
                );
            }
        }
        _ => {
            anyhow::bail!(
                "Invalid export type '{}'. Valid types: balances, plan, full",
                export_type
            );
        }
    }

    Ok(())
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

fn parse_date(date_str: &str) -> Result<DateTime<Utc>> {
    use chrono::NaiveDate;

    let naive_date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .context("Date must be in YYYY-MM-DD format")?;
    let naive_datetime = naive_date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| anyhow::anyhow!("Invalid date"))?;

    Ok(DateTime::from_naive_utc_and_offset(naive_datetime, Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_share() {
        let (name, cents) = parse_share("Alice=30.50").unwrap();
        assert_eq!(name, "Alice");
        assert_eq!(cents, 3050);

        let (name, _) = parse_share(" Bob = 3").unwrap();
        assert_eq!(name, "Bob");
    }

    #[tokio::test]
    async fn test_settlement_party_outside_trip_is_a_validation_error() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let db_path = temp_dir.path().join("cli.db");
        let service = LedgerService::init(db_path.to_str().unwrap()).await.unwrap();
        let trip = service.create_trip("Lisbon".to_string()).await.unwrap();
        let other = service.create_trip("Porto".to_string()).await.unwrap();
        service
            .add_participant(trip.id, "Ana".to_string())
            .await
            .unwrap();
        service
            .add_participant(other.id, "Ben".to_string())
            .await
            .unwrap();

        let ana = settlement_party(&service, &trip, "Ana").await.unwrap();
        assert_eq!(ana.name, "Ana");

        let err = settlement_party(&service, &trip, "Ben").await.unwrap_err();
        match err {
            AppError::Validation(SettlementError::UnknownParticipant(name)) => {
                assert_eq!(name, "Ben")
            }
            other => panic!("expected a validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_share_invalid() {
        assert!(parse_share("Alice").is_err());
        assert!(parse_share("Alice=abc").is_err());
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a very long trip name", 10), "a very ...");
    }

    #[test]
    fn test_parse_date() {
        let date = parse_date("2024-07-14").unwrap();
        assert_eq!(date.format("%Y-%m-%d").to_string(), "2024-07-14");
        assert!(parse_date("14/07/2024").is_err());
    }

    #[test]
    fn test_cli_parses_expense_with_splits() {
        let cli = Cli::try_parse_from([
            "tripsplit",
            "expense",
            "add",
            "Lisbon",
            "90",
            "--paid-by",
            "Alice",
            "--split",
            "Alice=30",
            "--split",
            "Bob=60",
        ])
        .unwrap();

        match cli.command {
            Commands::Expense(ExpenseCommands::Add { splits, even, .. }) => {
                assert_eq!(splits, vec!["Alice=30", "Bob=60"]);
                assert!(even.is_empty());
            }
            _ => panic!("expected expense add"),
        }
    }

    #[test]
    fn test_cli_rejects_split_and_even_together() {
        let result = Cli::try_parse_from([
            "tripsplit", "expense", "add", "Lisbon", "90", "--split", "A=90", "--even", "A,B",
        ]);
        assert!(result.is_err());
    }
}
