//! tabflow - Main entry point

use clap::Parser;
use tabflow::cli::{cmd_seed, cmd_serve, cmd_train, Cli, Commands};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize logging. Training additionally writes a plain-text log file to
/// the log directory (`LOG_DIR`, default `Log/`).
fn init_tracing(log_to_file: bool) -> Option<WorkerGuard> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| "tabflow=info,tower_http=info".into());

    if log_to_file {
        let log_dir = std::env::var("LOG_DIR").unwrap_or_else(|_| "Log".to_string());
        if std::fs::create_dir_all(&log_dir).is_ok() {
            let appender = tracing_appender::rolling::never(log_dir, "train.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer())
                .with(fmt::layer().with_writer(writer).with_ansi(false))
                .init();
            return Some(guard);
        }
    }

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();
    None
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _guard = init_tracing(matches!(cli.command, Commands::Train { .. }));

    match cli.command {
        Commands::Train {
            data_dir,
            model_dir,
            model_name,
            params,
            timestamp,
        } => {
            cmd_train(
                &data_dir,
                &model_dir,
                &model_name,
                params.as_deref(),
                &timestamp,
            )?;
        }
        Commands::Serve {
            port,
            host,
            model_dir,
        } => {
            cmd_serve(&host, port, model_dir).await?;
        }
        Commands::Seed { model_dir } => {
            cmd_seed(&model_dir)?;
        }
    }

    Ok(())
}
