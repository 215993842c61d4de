//! Uplinkr CLI: operate a local file-sharing store.
//!
//! Configuration comes from the environment (and `.env`): UPLOAD_DIR,
//! DATA_PATH, BASE_URL, CLAMAV_* and friends.

use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use uplinkr_cli::{build_services, init_tracing, print_json, upload_file, UploadOptions};
use uplinkr_core::models::DownloadContext;
use uplinkr_core::{AppError, Config, ErrorMetadata};

#[derive(Parser)]
#[command(name = "uplinkr", about = "Share files with expiring, password-protected links")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a file and print its share links
    Upload {
        /// Path to the file to upload
        file: PathBuf,
        /// Expiry: 1day, 7days, 1month or never
        #[arg(long)]
        expiry: Option<String>,
        /// Display name (defaults to the file name)
        #[arg(long)]
        name: Option<String>,
        /// Require this password for downloads
        #[arg(long)]
        password: Option<String>,
        /// Content type (guessed from the extension when omitted)
        #[arg(long)]
        mime_type: Option<String>,
    },
    /// Show public information about a file
    Info {
        /// File id
        id: String,
    },
    /// Download a file, counting it like any other download
    Download {
        /// File id
        id: String,
        #[arg(long)]
        password: Option<String>,
        /// Destination path (defaults to the file's name in the current directory)
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// List download events for a file
    Analytics {
        /// File id
        id: String,
    },
    /// Totals and a newest-first listing of every file
    Stats,
    /// Resolve a short link id
    Resolve {
        short_id: String,
    },
    /// Delete expired files once
    Sweep,
    /// Run the periodic expiry sweep until interrupted
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env first so RUST_LOG from it reaches the subscriber.
    dotenvy::dotenv().ok();
    init_tracing();

    let config = Config::from_env().context("Invalid configuration")?;
    let cli = Cli::parse();
    let services = build_services(config).await?;

    match cli.command {
        Commands::Upload {
            file,
            expiry,
            name,
            password,
            mime_type,
        } => {
            let options = UploadOptions {
                expiry,
                name,
                password,
                mime_type,
            };
            let created = upload_file(&services, &file, options)
                .await
                .map_err(describe)?;
            print_json(&created)?;
        }
        Commands::Info { id } => {
            let info = services.files.get_file_info(&id).await.map_err(app_error)?;
            print_json(&info)?;
        }
        Commands::Download { id, password, out } => {
            let mut context = DownloadContext::new().with_user_agent("uplinkr-cli");
            if let Some(password) = password {
                context = context.with_password(password);
            }
            let target = services
                .files
                .get_file_for_download(&id, &context)
                .await
                .map_err(app_error)?;

            let out = out.unwrap_or_else(|| PathBuf::from(&target.download_name));
            tokio::fs::copy(&target.path, &out)
                .await
                .with_context(|| format!("Failed to write {}", out.display()))?;

            print_json(&serde_json::json!({
                "id": id,
                "name": target.download_name,
                "mimetype": target.mime_type,
                "size": target.size_bytes,
                "savedTo": out.display().to_string(),
            }))?;
        }
        Commands::Analytics { id } => {
            let analytics = services.files.file_analytics(&id).await.map_err(app_error)?;
            print_json(&serde_json::json!({ "analytics": analytics }))?;
        }
        Commands::Stats => {
            let stats = services.files.stats().await.map_err(app_error)?;
            print_json(&stats)?;
        }
        Commands::Resolve { short_id } => {
            let info = services
                .files
                .resolve_short_id(&short_id)
                .await
                .map_err(app_error)?;
            print_json(&info)?;
        }
        Commands::Sweep => {
            let report = services
                .scheduler
                .sweep(Utc::now())
                .await
                .map_err(app_error)?;
            print_json(&report)?;
        }
        Commands::Serve => {
            tracing::info!(
                interval_secs = services.config.cleanup_interval_secs,
                "Cleanup scheduler started"
            );
            let handle = services.scheduler.clone().start();
            shutdown_signal().await;
            handle.abort();
            tracing::info!("Cleanup scheduler stopped");
        }
    }

    Ok(())
}

/// Client-facing rendering of a service error.
fn app_error(err: AppError) -> anyhow::Error {
    if err.is_sensitive() {
        tracing::error!(error = %err.detailed_message(), "Command failed");
    }
    anyhow::anyhow!(
        "{} ({}): {}",
        err.error_code(),
        err.http_status_code(),
        err.client_message()
    )
}

fn describe(err: anyhow::Error) -> anyhow::Error {
    match err.downcast::<AppError>() {
        Ok(app) => app_error(app),
        Err(other) => other,
    }
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
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
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            tracing::info!("Received terminate signal");
        },
    }
}
