//! WOS bus probe
//!
//! Small exerciser for the bus client: connects, subscribes to a set of
//! topic filters, prints everything that arrives, and can publish a test
//! message to itself on an interval.

use clap::Parser;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use wosbus::{BusClient, ProbeConfig};

/// Probe for the WOS message bus
#[derive(Parser)]
#[command(name = "wos-probe")]
#[command(about = "Connect to the WOS message bus and watch traffic")]
#[command(version)]
struct Args {
    /// Optional TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Application label used as the log-line prefix
    #[arg(long, default_value = "wos-probe")]
    label: String,

    /// Broker host (falls back to WOS_MQTT_HOST, then localhost)
    #[arg(long)]
    host: Option<String>,

    /// Broker port
    #[arg(long, default_value_t = 1883)]
    port: u16,

    /// Topic filter(s) to subscribe to
    #[arg(long = "topic", default_value = "vos/app/#")]
    topics: Vec<String>,

    /// Publish a message to this topic on an interval
    #[arg(long)]
    publish_topic: Option<String>,

    /// Payload for the interval publish
    #[arg(long, default_value = "test-message")]
    message: String,

    /// Seconds between interval publishes
    #[arg(long, default_value_t = 5)]
    interval_secs: u64,

    /// Durable log sink path
    #[arg(long, default_value = "wos.log")]
    log_file: PathBuf,
}

#[tokio::main]
async fn main() {
    init_logging();

    let args = Args::parse();
    let (host, port, topics, log_file) = match resolve_settings(&args) {
        Ok(settings) => settings,
        Err(e) => {
            error!("failed to load configuration: {e}");
            process::exit(1);
        }
    };

    let mut client = BusClient::with_log_path(&log_file);
    let label = args.label.clone();

    let connect_label = label.clone();
    if let Err(e) = client
        .connect(
            &label,
            port,
            move || info!("[{connect_label}] bus link is up"),
            host.as_deref(),
        )
        .await
    {
        error!("connect setup failed: {e}");
        process::exit(1);
    }

    let client = Arc::new(client);

    for topic in &topics {
        let result = client
            .subscribe(&label, topic, |topic: &str, payload: &[u8]| {
                println!("--- {topic}\n{}", render_payload(payload));
            })
            .await;
        if let Err(e) = result {
            error!("subscribe to {topic} failed: {e}");
        }
    }

    if let Some(publish_topic) = args.publish_topic.clone() {
        let publisher = client.clone();
        let publish_label = label.clone();
        let message = args.message.clone();
        let interval = Duration::from_secs(args.interval_secs.max(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                publisher.log(&format!("[{publish_label}] Sending message to self..."));
                let _ = publisher
                    .publish(&publish_label, &publish_topic, message.as_bytes().to_vec())
                    .await;
            }
        });
    }

    tokio::select! {
        _ = client.run() => {
            info!("bus connection ended");
        }
        _ = signal::ctrl_c() => {
            info!("interrupted, shutting down");
        }
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,rumqttc=warn"));
    tracing_subscriber::fmt()
        .compact()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Merge CLI arguments with the optional config file. The config file
/// supplies port, log file, and subscriptions when it lists any; an
/// explicit `--host` flag wins over the config host.
#[allow(clippy::type_complexity)]
fn resolve_settings(
    args: &Args,
) -> Result<(Option<String>, u16, Vec<String>, PathBuf), wosbus::ConfigError> {
    let Some(config_path) = &args.config else {
        return Ok((
            args.host.clone(),
            args.port,
            args.topics.clone(),
            args.log_file.clone(),
        ));
    };

    let config = ProbeConfig::load_from_file(config_path)?;
    let host = args.host.clone().or(config.bus.host);
    let topics = if config.subscriptions.is_empty() {
        args.topics.clone()
    } else {
        config.subscriptions
    };
    Ok((host, config.bus.port, topics, config.bus.log_file))
}

/// Pretty-print JSON payloads; fall back to lossy UTF-8 for anything else.
fn render_payload(payload: &[u8]) -> String {
    match serde_json::from_slice::<serde_json::Value>(payload) {
        Ok(value) => serde_json::to_string_pretty(&value)
            .unwrap_or_else(|_| String::from_utf8_lossy(payload).into_owned()),
        Err(_) => String::from_utf8_lossy(payload).into_owned(),
    }
}
