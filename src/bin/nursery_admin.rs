use std::{fs, path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use nursery_reserve::{
    auth,
    config::{self, AppConfig},
    db::{self, DbPool},
    handlers::AppServices,
    services::csv_import::{CsvFormat, ImportResult},
};
use serde::Serialize;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "nursery-admin", about = "Administrative tasks for nursery-reserve")]
struct Cli {
    #[arg(
        long,
        global = true,
        action = ArgAction::SetTrue,
        help = "Render command output as pretty JSON when available"
    )]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending database migrations
    Migrate,
    /// Print the argon2 hash to put in `admin_password_hash`
    HashPassword {
        password: String,
    },
    /// Import products from a CSV file
    ImportProducts {
        file: PathBuf,
        #[arg(long, value_enum, default_value_t = FormatArg::Standard)]
        format: FormatArg,
        /// Link the imported products to this preset
        #[arg(long)]
        preset: Option<Uuid>,
    },
    /// Move finished reservations past their retention into history
    ArchiveHistory,
    /// Send reminders for tomorrow's pickups that have not had one
    SendReminders,
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Standard,
    Pos,
}

impl From<FormatArg> for CsvFormat {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Standard => CsvFormat::Standard,
            FormatArg::Pos => CsvFormat::Pos,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Needs neither configuration nor a database
    if let Commands::HashPassword { password } = &cli.command {
        let hash = auth::hash_password(password).context("failed to hash password")?;
        println!("{}", hash);
        return Ok(());
    }

    let context = CliContext::initialize().await?;
    match cli.command {
        Commands::Migrate => {
            db::run_migrations(&context.db)
                .await
                .context("failed to run migrations")?;
            println!("Migrations applied");
        }
        Commands::HashPassword { .. } => {}
        Commands::ImportProducts {
            file,
            format,
            preset,
        } => {
            let text = fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let result = context
                .services
                .csv_import
                .import(&text, format.into(), preset)
                .await
                .context("product import failed")?;
            if cli.json {
                print_json(&result)?;
            } else {
                render_import(&result);
            }
        }
        Commands::ArchiveHistory => {
            let outcome = context
                .services
                .history
                .archive()
                .await
                .context("archiving failed")?;
            if cli.json {
                print_json(&outcome)?;
            } else {
                println!(
                    "Archived {} reservation(s), {} error(s)",
                    outcome.moved, outcome.errors
                );
            }
        }
        Commands::SendReminders => {
            let sent = context
                .services
                .reservations
                .send_due_reminders()
                .await
                .context("reminder pass failed")?;
            println!("Sent {} reminder(s)", sent);
        }
    }

    Ok(())
}

struct CliContext {
    db: Arc<DbPool>,
    services: AppServices,
}

impl CliContext {
    async fn initialize() -> Result<Self> {
        let config: AppConfig =
            config::load_config().context("failed to load application config")?;
        config::init_tracing(config.log_level(), config.log_json);

        let db_pool = db::establish_connection_from_app_config(&config)
            .await
            .context("failed to connect to database")?;
        let db = Arc::new(db_pool);
        let services = AppServices::new(db.clone(), &config);

        Ok(Self { db, services })
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn render_import(result: &ImportResult) {
    println!(
        "{} format: {} row(s), {} inserted",
        result.format, result.total, result.inserted
    );
    for error in &result.errors {
        println!("- row {} [{}]: {}", error.row, error.field, error.message);
    }
    for warning in &result.warnings {
        println!("! {}", warning);
    }
}
