use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use hazardsignal_common::{AlertRecord, Config};
use hazardsignal_pipeline::{
    AdapterSet, Aggregator, AggregatorSettings, AlertDispatcher, LogDispatcher, WebhookDispatcher,
};
use hazardsignal_sources::HttpTransport;

#[derive(Parser)]
#[command(name = "hazardsignal", about = "Normalized hazard alerts from public feeds")]
struct Cli {
    /// Adapter set to poll (overrides HAZARD_ADAPTERS)
    #[arg(long, global = true)]
    adapters: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one aggregation and print the alerts as JSON
    Once {
        #[arg(long)]
        pretty: bool,
    },
    /// Aggregate on a fixed cadence until interrupted
    Watch {
        /// Seconds between runs (defaults to POLL_INTERVAL_SECS)
        #[arg(long)]
        interval_secs: Option<u64>,
    },
    /// Print the JSON schema of an alert record
    Schema,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries the alert JSON.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("hazardsignal=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Command::Schema = cli.command {
        let schema = schemars::schema_for!(AlertRecord);
        println!("{}", serde_json::to_string_pretty(&schema)?);
        return Ok(());
    }

    let config = Config::from_env()?;
    config.log_redacted();

    let adapters: AdapterSet = cli
        .adapters
        .as_deref()
        .unwrap_or(config.adapters.as_str())
        .parse()?;
    let sources = adapters.build(&config, Arc::new(HttpTransport::new()));
    let settings = AggregatorSettings::from_config(&config);

    let dispatcher: Arc<dyn AlertDispatcher> = match &config.dispatch_webhook_url {
        Some(url) => Arc::new(WebhookDispatcher::new(url.as_str())),
        None => Arc::new(LogDispatcher),
    };

    info!(adapters = %adapters, sources = sources.len(), "Hazard Signal starting...");

    match cli.command {
        Command::Once { pretty } => {
            let aggregator = Aggregator::new(sources, settings);
            let run = aggregator.run().await;
            // Await here; a spawned dispatch would die with the runtime.
            if let Err(e) = dispatcher.dispatch(run.alerts.clone()).await {
                warn!(error = %e, "Alert dispatch failed");
            }
            print_alerts(&run.alerts, pretty)?;
        }
        Command::Watch { interval_secs } => {
            let secs = interval_secs.unwrap_or(config.poll_interval_secs).max(1);
            let period = Duration::from_secs(secs);
            let aggregator = Aggregator::new(sources, settings).with_dispatcher(dispatcher);
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            info!(interval_secs = period.as_secs(), "Watching feeds");
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let run = aggregator.run().await;
                        print_alerts(&run.alerts, false)?;
                    }
                    _ = tokio::signal::ctrl_c() => {
                        info!("Interrupted, shutting down");
                        break;
                    }
                }
            }
        }
        Command::Schema => unreachable!("handled above"),
    }

    Ok(())
}

fn print_alerts(alerts: &[AlertRecord], pretty: bool) -> Result<()> {
    let out = if pretty {
        serde_json::to_string_pretty(alerts)?
    } else {
        serde_json::to_string(alerts)?
    };
    println!("{out}");
    Ok(())
}
