use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use api_ingress::{ApiIngress, ApiIngressConfig};
use clap::{Parser, Subcommand};
use runtime::{AppConfig, CliArgs, DatabaseConfig};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection};
use tokio_util::sync::CancellationToken;
use url::Url;
use virtual_education::{VirtualEducation, VirtualEducationConfig};

const MEMORY_DSN: &str = "sqlite::memory:";

/// Expand a sqlite DSN into an absolute-path DSN using a base directory.
/// - Keeps "sqlite::memory:" as-is.
/// - Adds `mode=rwc` so a missing database file is created.
/// - Normalizes backslashes into forward slashes (important on Windows).
fn absolutize_sqlite_dsn(dsn: &str, base_dir: &Path, create_dirs: bool) -> Result<String> {
    if dsn.eq_ignore_ascii_case(MEMORY_DSN) || dsn.eq_ignore_ascii_case("sqlite://:memory:") {
        return Ok(MEMORY_DSN.to_string());
    }
    let db_path = dsn
        .strip_prefix("sqlite://")
        .ok_or_else(|| anyhow!("DSN must start with sqlite:// (got: {})", dsn))?;

    let (path_str, query) = match db_path.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (db_path, None),
    };

    let mut p = PathBuf::from(path_str);
    if p.as_os_str().is_empty() {
        bail!("Empty SQLite path in DSN");
    }
    if p.is_relative() {
        p = base_dir.join(p);
    }

    if create_dirs {
        if let Some(dir) = p.parent() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("cannot create {}", dir.display()))?;
        }
    }

    let mut out = String::from("sqlite://");
    out.push_str(&p.to_string_lossy().replace('\\', "/"));
    match query {
        Some(q) if q.split('&').any(|kv| kv.starts_with("mode=")) => {
            out.push('?');
            out.push_str(q);
        }
        Some(q) => {
            out.push('?');
            out.push_str(q);
            out.push_str("&mode=rwc");
        }
        None => out.push_str("?mode=rwc"),
    }
    Ok(out)
}

/// Detect DB backend from URL scheme.
fn detect_from_dsn(cfg: &DatabaseConfig) -> Result<&'static str> {
    let raw = cfg.url.trim();
    if raw.is_empty() {
        bail!("Database URL not configured");
    }
    if raw.eq_ignore_ascii_case(MEMORY_DSN) {
        return Ok("sqlite");
    }

    let url = Url::parse(raw).map_err(|e| anyhow!("Invalid database DSN '{}': {}", raw, e))?;
    match url.scheme() {
        "sqlite" => Ok("sqlite"),
        "postgres" | "postgresql" => Ok("postgres"),
        other => Err(anyhow!("Unsupported database type: {}", other)),
    }
}

/// Student enrollment server
#[derive(Parser)]
#[command(name = "enrollment-server")]
#[command(about = "Enrollment server - courses, students and enrollments over HTTP")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port for HTTP server (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Print current configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Use an in-memory database
    #[arg(long)]
    mock: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Run,
    /// Check configuration
    Check,
    /// Run the expiry notification pass once and exit
    NotifyExpiring,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let args = CliArgs {
        config: cli.config.as_ref().map(|p| p.to_string_lossy().to_string()),
        port: cli.port,
        print_config: cli.print_config,
        verbose: cli.verbose,
        mock: cli.mock,
    };

    // Load configuration (normalized home_dir is applied inside)
    let mut config = AppConfig::load_or_default(cli.config.as_deref())?;
    config.apply_cli_overrides(&args);

    if cli.print_config {
        println!("{}", config.to_yaml()?);
        return Ok(());
    }

    let logging_config = config.logging.clone().unwrap_or_default();
    runtime::logging::init_logging_from_config(&logging_config, Path::new(&config.server.home_dir));
    tracing::info!("Enrollment server starting");

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_server(config, args).await,
        Commands::Check => check_config(&config, &args),
        Commands::NotifyExpiring => notify_expiring(config, args).await,
    }
}

async fn connect(config: &AppConfig, args: &CliArgs) -> Result<DatabaseConnection> {
    let db_config = match (&config.database, args.mock) {
        (_, true) => None,
        (Some(db), false) => Some(db),
        (None, false) => bail!("No database configured; set `database.url` or pass --mock"),
    };

    let mut opts = match db_config {
        None => {
            // Every pooled connection would otherwise get its own empty database.
            let mut opts = ConnectOptions::new(MEMORY_DSN);
            opts.max_connections(1)
                .min_connections(1)
                .idle_timeout(Duration::from_secs(365 * 24 * 60 * 60))
                .max_lifetime(Duration::from_secs(365 * 24 * 60 * 60));
            opts
        }
        Some(db) => {
            let mut dsn = db.url.trim().to_owned();
            if detect_from_dsn(db)? == "sqlite" {
                dsn = absolutize_sqlite_dsn(&dsn, Path::new(&config.server.home_dir), true)?;
            }
            let mut opts = ConnectOptions::new(dsn);
            opts.max_connections(db.max_conns.unwrap_or(10))
                .acquire_timeout(Duration::from_secs(db.acquire_timeout_sec.unwrap_or(5)));
            opts
        }
    };
    // Statements reach tracing through the `log` bridge.
    opts.sqlx_logging(true);

    let db = Database::connect(opts)
        .await
        .context("failed to connect to the database")?;
    tracing::info!("Connected DB backend: {:?}", db.get_database_backend());
    Ok(db)
}

async fn init_module(config: &AppConfig, args: &CliArgs) -> Result<VirtualEducation> {
    let module_cfg: VirtualEducationConfig =
        config.module_config(virtual_education::MODULE_NAME)?;
    let db = connect(config, args).await?;
    VirtualEducation::migrate(&db).await?;
    VirtualEducation::init(db, module_cfg)
}

async fn run_server(config: AppConfig, args: CliArgs) -> Result<()> {
    tracing::info!("Initializing modules...");
    let ingress_cfg: ApiIngressConfig = config.module_config(api_ingress::MODULE_NAME)?;
    let module = init_module(&config, &args).await?;

    let mut ingress = ApiIngress::new(ingress_cfg);
    ingress.add_openapi(VirtualEducation::openapi());
    let router = ingress.build_router(module.register_rest(axum::Router::new()))?;
    let listener = ApiIngress::bind(&config.bind_addr()).await?;

    let cancel = CancellationToken::new();
    let signals = runtime::shutdown::cancel_on_signal(cancel.clone());

    let job = module.expiry_job().map(|job| {
        tracing::info!("Starting expiry notification job");
        tokio::spawn(job.run(cancel.child_token()))
    });

    let served = ApiIngress::serve(listener, router, cancel.clone()).await;
    cancel.cancel();

    if let Some(handle) = job {
        match handle.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!(error = %e, "expiry job stopped with an error"),
            Err(e) => tracing::warn!(error = %e, "expiry job task failed"),
        }
    }
    signals.abort();

    tracing::info!("Enrollment server stopped");
    served
}

fn check_config(config: &AppConfig, args: &CliArgs) -> Result<()> {
    tracing::info!("Checking configuration...");

    config
        .module_config::<ApiIngressConfig>(api_ingress::MODULE_NAME)
        .context("api_ingress section")?;
    let module_cfg: VirtualEducationConfig = config
        .module_config(virtual_education::MODULE_NAME)
        .context("virtual_education section")?;
    module_cfg.validate().context("virtual_education section")?;
    virtual_education::jobs::DailySchedule::parse(&module_cfg.notify_at)
        .context("virtual_education.notify_at")?;

    match (&config.database, args.mock) {
        (_, true) => tracing::info!("--mock: using an in-memory database"),
        (Some(db), false) => {
            let backend = detect_from_dsn(db)?;
            tracing::info!("Database backend: {backend}");
        }
        (None, false) => tracing::warn!("No database configured"),
    }

    tracing::info!("Configuration is valid");
    println!("Configuration check passed");
    println!("{}", config.to_yaml()?);
    Ok(())
}

async fn notify_expiring(config: AppConfig, args: CliArgs) -> Result<()> {
    let module = init_module(&config, &args).await?;
    let sent = module
        .expiry_pass()
        .run_once()
        .await
        .map_err(|e| anyhow!("expiry pass failed: {e}"))?;
    println!("Sent {sent} expiry notification(s)");
    Ok(())
}
