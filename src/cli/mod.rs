//! # Command Line Interface
//!
//! Database management and isolation segment listing against a local store.

pub mod output;

use crate::config::{AppConfig, DatabaseConfig};
use crate::fetchers::{IsolationSegmentListFetcher, OrganizationGuidQuery};
use crate::messages::IsolationSegmentsListMessage;
use crate::observability::{init_observability, log_config_info};
use crate::storage::{
    create_pool, get_pool_stats, list_applied_migrations, run_migrations, validate_migrations,
    DbPool,
};
use clap::{Args, Parser, Subcommand};
use tracing::Instrument;
use output::{print_json, print_migrations_table, print_segments_table, ListOutput, OutputFormat};

#[derive(Parser)]
#[command(name = "isoseg")]
#[command(about = "Isolation segment listing and store management")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Database URL override
    #[arg(long, global = true)]
    pub database_url: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run pending migrations
    Migrate,

    /// Show migration status
    Status,

    /// List all applied migrations
    Migrations,

    /// List isolation segments
    List(ListArgs),
}

#[derive(Debug, Clone, Copy)]
enum DatabaseCommand {
    Migrate,
    Status,
    Migrations,
}

impl DatabaseCommand {
    fn operation(self) -> &'static str {
        match self {
            DatabaseCommand::Migrate => "migrate",
            DatabaseCommand::Status => "migration_status",
            DatabaseCommand::Migrations => "list_migrations",
        }
    }
}

#[derive(Args, Debug, Default)]
pub struct ListArgs {
    /// Comma-separated segment guids
    #[arg(long)]
    pub guids: Option<String>,

    /// Comma-separated segment names, matched ignoring case
    #[arg(long)]
    pub names: Option<String>,

    /// Comma-separated organization guids the segments are entitled to
    #[arg(long)]
    pub organization_guids: Option<String>,

    /// Label selector, e.g. `env=prod,tier in (gold,silver)`
    #[arg(long)]
    pub label_selector: Option<String>,

    #[arg(long)]
    pub page: Option<u32>,

    #[arg(long)]
    pub per_page: Option<u32>,

    /// `name`, `created_at`, `updated_at`; prefix with `-` for descending
    #[arg(long, allow_hyphen_values = true)]
    pub order_by: Option<String>,

    /// Only segments entitled to these organizations (comma-separated names)
    #[arg(long)]
    pub org_scope: Option<String>,

    /// Output format: json or table
    #[arg(short, long, default_value = "json")]
    pub output: String,
}

impl ListArgs {
    /// Params object in the shape accepted by the list message
    pub fn to_params(&self) -> serde_json::Value {
        let mut params = serde_json::Map::new();
        let strings = [
            ("guids", &self.guids),
            ("names", &self.names),
            ("organization_guids", &self.organization_guids),
            ("label_selector", &self.label_selector),
            ("order_by", &self.order_by),
        ];
        for (key, value) in strings {
            if let Some(value) = value {
                params.insert(key.to_string(), serde_json::Value::String(value.clone()));
            }
        }
        if let Some(page) = self.page {
            params.insert("page".to_string(), page.into());
        }
        if let Some(per_page) = self.per_page {
            params.insert("per_page".to_string(), per_page.into());
        }
        serde_json::Value::Object(params)
    }

    fn org_scope(&self) -> Option<OrganizationGuidQuery> {
        self.org_scope.as_ref().map(|names| {
            OrganizationGuidQuery::all()
                .where_names(names.split(',').filter(|n| !n.is_empty()).map(str::to_string))
        })
    }
}

/// Run CLI commands
pub async fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::from_env();
    if cli.verbose {
        config.observability.log_level = "debug".to_string();
    }
    if let Some(url) = cli.database_url {
        config.database.url = url;
    }

    init_observability(&config.observability)?;
    config.validate()?;
    log_config_info(&config);

    match cli.command {
        Commands::List(args) => {
            let pool = create_pool(&config.database).await?;
            let listing = list_isolation_segments(&pool, &args).await?;
            match OutputFormat::parse(&args.output)? {
                OutputFormat::Json => print_json(&listing)?,
                OutputFormat::Table => print_segments_table(&listing),
            }
        }
        Commands::Migrate => {
            handle_database_command(DatabaseCommand::Migrate, &config.database).await?
        }
        Commands::Status => {
            handle_database_command(DatabaseCommand::Status, &config.database).await?
        }
        Commands::Migrations => {
            handle_database_command(DatabaseCommand::Migrations, &config.database).await?
        }
    }

    Ok(())
}

/// Build the message, pick the scoped or unscoped listing, and read one page
pub async fn list_isolation_segments(pool: &DbPool, args: &ListArgs) -> anyhow::Result<ListOutput> {
    let message = IsolationSegmentsListMessage::from_params(&args.to_params())?;
    let pagination = message.pagination();

    let dataset = match args.org_scope() {
        Some(scope) => IsolationSegmentListFetcher::fetch_for_organizations(&message, scope),
        None => IsolationSegmentListFetcher::fetch_all(&message),
    };
    tracing::debug!(sql = %dataset.to_sql(), "Listing isolation segments");

    async {
        let total = dataset.count(pool).await?;
        let resources = dataset.paginate(&pagination).all(pool).await?;
        Ok::<ListOutput, anyhow::Error>(ListOutput::new(&pagination, total, resources))
    }
    .instrument(crate::db_span!("list_isolation_segments"))
    .await
}

/// Pool for schema commands; migrations are never applied implicitly here
async fn schema_pool(config: &DatabaseConfig) -> anyhow::Result<DbPool> {
    let mut config = config.clone();
    config.auto_migrate = false;
    Ok(create_pool(&config).await?)
}

/// Handle database management commands
async fn handle_database_command(
    command: DatabaseCommand,
    config: &DatabaseConfig,
) -> anyhow::Result<()> {
    let pool = schema_pool(config).await?;

    match command {
        DatabaseCommand::Migrate => {
            println!("Running database migrations...");
            run_database_command(command, &pool).await?;
            println!("Migrations completed successfully!");
        }

        DatabaseCommand::Status => {
            let up_to_date = run_database_command(command, &pool).await?;
            let stats = get_pool_stats(&pool);
            println!(
                "Connection pool: {} open, {} active, {} idle{}",
                stats.size,
                stats.active(),
                stats.idle,
                if stats.is_healthy() { "" } else { " (no open connections)" }
            );
            if up_to_date {
                println!("Database schema is up to date");
            } else {
                println!("Database schema has pending migrations");
                std::process::exit(1);
            }
        }

        DatabaseCommand::Migrations => {
            let migrations = list_applied_migrations(&pool)
                .instrument(crate::db_span!(command.operation()))
                .await?;
            if migrations.is_empty() {
                println!("No migrations have been applied");
            } else {
                println!("Applied migrations:");
                print_migrations_table(&migrations);
            }
        }
    }

    Ok(())
}

/// Apply or check migrations inside a `db_operation` span.
///
/// Returns whether the schema is up to date afterwards.
async fn run_database_command(command: DatabaseCommand, pool: &DbPool) -> anyhow::Result<bool> {
    let span = crate::db_span!(command.operation());
    async {
        if matches!(command, DatabaseCommand::Migrate) {
            run_migrations(pool).await?;
        }
        Ok::<bool, anyhow::Error>(validate_migrations(pool).await?)
    }
    .instrument(span)
    .await
}
