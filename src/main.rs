use clap::{Args, Parser, Subcommand};
use fee_allocator::application::allocator::AllocationEngine;
use fee_allocator::application::recorder::PaymentRecorder;
use fee_allocator::domain::allocation::ObligationState;
use fee_allocator::domain::fee::FeeAssignment;
use fee_allocator::domain::money::Money;
use fee_allocator::domain::payment::{PaymentMethod, PaymentRecord, PaymentStatus};
use fee_allocator::infrastructure::in_memory::InMemoryPaymentStore;
use fee_allocator::interfaces::csv::allocation_writer::AllocationWriter;
use fee_allocator::interfaces::json::document_reader::DocumentReader;
use miette::{IntoDiagnostic, Result, miette};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Split a payment across outstanding fees and print the allocation as CSV
    Allocate {
        #[command(flatten)]
        allocation: AllocationArgs,

        /// Fail when the allocated total does not equal the payment amount
        #[arg(long)]
        strict: bool,
    },
    /// Allocate a payment and print the validated payment record as JSON
    Record {
        #[command(flatten)]
        allocation: AllocationArgs,

        /// Payment reference, PAY-YYYY-XXXXXXXX
        #[arg(long)]
        reference: String,

        #[arg(long, value_enum)]
        method: PaymentMethod,

        /// Payment date, YYYY-MM-DD
        #[arg(long)]
        date: String,

        #[arg(long)]
        recorded_by: String,

        #[arg(long, value_enum, default_value = "pending")]
        status: PaymentStatus,

        #[arg(long)]
        paid_by: Option<String>,

        #[arg(long)]
        notes: Option<String>,

        /// Previously recorded payments (JSON), checked for reference clashes
        #[arg(long)]
        existing: Option<PathBuf>,
    },
}

#[derive(Args)]
struct AllocationArgs {
    /// Fee assignments JSON file (one document or an array)
    assignments: PathBuf,

    /// Payment amount
    #[arg(long)]
    amount: Money,

    /// Zero every allocation before applying manual edits
    #[arg(long)]
    clear: bool,

    /// Manual allocation CATEGORY=AMOUNT, applied in the order given
    #[arg(long = "set", value_name = "CATEGORY=AMOUNT", value_parser = parse_override)]
    overrides: Vec<(String, Money)>,

    /// Allocate a category's full balance, applied after --set
    #[arg(long = "max", value_name = "CATEGORY")]
    max: Vec<String>,
}

fn parse_override(s: &str) -> std::result::Result<(String, Money), String> {
    let (category, amount) = s
        .split_once('=')
        .ok_or_else(|| format!("expected CATEGORY=AMOUNT, got '{}'", s))?;
    let amount = amount
        .parse::<Money>()
        .map_err(|e| format!("invalid amount '{}': {}", amount, e))?;
    Ok((category.trim().to_string(), amount))
}

fn read_assignments(path: &Path) -> Result<Vec<FeeAssignment>> {
    let file = File::open(path).into_diagnostic()?;
    let assignments = DocumentReader::new(file).fee_assignments().into_diagnostic()?;

    for (i, assignment) in assignments.iter().enumerate() {
        if let Err(e) = assignment.validate() {
            warn!(assignment = i + 1, "invalid fee assignment: {}", e);
        }
    }
    Ok(assignments)
}

fn allocate(args: &AllocationArgs, assignments: &[FeeAssignment]) -> AllocationEngine {
    let mut engine = AllocationEngine::new();
    engine.update_payment_amount(args.amount);
    engine.rebuild(assignments);

    match engine.obligation_state() {
        ObligationState::NoAssignment => eprintln!("No fee assignment found for this student."),
        ObligationState::FullySettled => eprintln!("All fees are fully paid."),
        ObligationState::Outstanding => {}
    }

    if args.clear {
        engine.clear_all();
    }
    for (category, amount) in &args.overrides {
        if engine.item(category).is_none() {
            eprintln!("Warning: no outstanding fee for category '{}'", category);
        }
        engine.set_allocation(category, *amount);
    }
    for category in &args.max {
        if engine.item(category).is_none() {
            eprintln!("Warning: no outstanding fee for category '{}'", category);
        }
        engine.set_max(category);
    }

    eprintln!(
        "total allocated: {}, remaining: {}, valid: {}",
        engine.total_allocated(),
        engine.remaining_unallocated(args.amount),
        engine.is_valid(args.amount)
    );
    engine
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();
    miette::set_hook(Box::new(|_| {
        Box::new(miette::MietteHandlerOpts::new().wrap_lines(false).build())
    }))
    .into_diagnostic()?;

    let cli = Cli::parse();

    match cli.command {
        Command::Allocate { allocation, strict } => {
            let assignments = read_assignments(&allocation.assignments)?;
            let engine = allocate(&allocation, &assignments);

            let stdout = io::stdout();
            let mut writer = AllocationWriter::new(stdout.lock());
            writer
                .write_allocations(&engine.to_payment_allocations())
                .into_diagnostic()?;

            if strict && !engine.is_valid(allocation.amount) {
                return Err(miette!(
                    "Allocated total {} does not match payment amount {}",
                    engine.total_allocated(),
                    allocation.amount
                ));
            }
        }
        Command::Record {
            allocation,
            reference,
            method,
            date,
            recorded_by,
            status,
            paid_by,
            notes,
            existing,
        } => {
            let assignments = read_assignments(&allocation.assignments)?;
            let engine = allocate(&allocation, &assignments);

            let store = match existing {
                Some(path) => {
                    let file = File::open(path).into_diagnostic()?;
                    let records = DocumentReader::new(file).payment_records().into_diagnostic()?;
                    InMemoryPaymentStore::with_records(records)
                }
                None => InMemoryPaymentStore::new(),
            };
            let recorder = PaymentRecorder::new(Box::new(store));

            let owner = assignments.first().cloned().unwrap_or_default();
            let draft = PaymentRecord {
                student_id: owner.student_id,
                student_name: owner.student_name,
                class_id: owner.class_id,
                class_name: String::new(),
                fee_assignment_id: owner.id.unwrap_or_default(),
                amount: allocation.amount,
                payment_method: method,
                payment_date: date,
                fee_allocations: engine.to_payment_allocations(),
                reference,
                transaction_id: None,
                paid_by,
                status,
                notes,
                recorded_by,
                created_at: 0,
                updated_at: 0,
            };

            let record = recorder.record(draft).await.into_diagnostic()?;
            println!("{}", serde_json::to_string_pretty(&record).into_diagnostic()?);
        }
    }

    Ok(())
}
