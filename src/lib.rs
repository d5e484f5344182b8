pub mod config;
pub mod display;
pub mod error;
pub mod orchestrator;
pub mod refresh;
pub mod registration;
pub mod serial;
pub mod store;
pub mod token;

pub use error::{Error, Result};
pub use orchestrator::Orchestrator;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use config::{Command, Config};
use display::TerminalSink;
use store::CredentialStore;
use token::HmacTokenSource;

pub async fn run(cfg: Config) -> anyhow::Result<()> {
    use tracing_subscriber::EnvFilter;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(cfg.log_level()))
        .with_writer(std::io::stderr)
        .init();

    let store_path = cfg.store_path()?;
    tracing::info!(path = %store_path.display(), "Opening credential store");
    let store = Arc::new(CredentialStore::open(&store_path).map_err(Error::from)?);
    let app = Orchestrator::new(store, HmacTokenSource::new());

    match cfg.command {
        Command::Import {
            serial,
            secret,
            region,
            set_default,
        } => {
            let pretty = app.import(&serial, &secret, region.as_deref(), set_default)?;
            println!("{pretty}");
        }
        Command::Show {
            serial,
            update,
            set_default,
        } => {
            let serial = app.resolve_serial(serial.as_deref())?;
            if set_default {
                app.set_default(serial.as_str())?;
            }
            if update {
                show_live(&app, serial.as_str()).await?;
            } else {
                println!("{}", app.show_once(serial.as_str())?);
            }
        }
        Command::Default { serial } => {
            app.set_default(&serial)?;
        }
        Command::List => {
            for entry in app.list() {
                let marker = if entry.is_default { " (default)" } else { "" };
                println!("{}{marker}", entry.pretty);
            }
        }
        Command::Remove { serial } => {
            if !app.remove(&serial)? {
                anyhow::bail!("{serial}: no such serial");
            }
        }
    }
    Ok(())
}

async fn show_live(app: &Orchestrator<HmacTokenSource>, serial: &str) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    let watcher = tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for interrupt");
            return;
        }
        tracing::debug!("Interrupt received");
        on_interrupt.cancel();
    });

    eprintln!("Ctrl-C to exit");
    let mut sink = TerminalSink::new(std::io::stdout());
    let result = app.show_live(serial, &mut sink, &cancel).await;
    println!();
    watcher.abort();
    result?;
    Ok(())
}
