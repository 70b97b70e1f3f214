//! wosbus - lightweight publish/subscribe client for the WOS message bus
//!
//! A thin client over MQTT that manages one connection to the bus,
//! performs connect-time fallback, and dispatches inbound messages to
//! caller-supplied handlers. Host-side tooling (scene processing, format
//! conversion) sits outside this crate and only calls the operations
//! exposed here.
//!
//! # Overview
//!
//! - Broker address resolution: explicit host, then the `WOS_MQTT_HOST`
//!   environment override, then `"localhost"`
//! - One connect-time fallback attempt against `"localhost"`; failures
//!   are logged, never raised into the host
//! - One message handler per client, shared across all subscriptions
//! - Dual-sink lifecycle logging: console plus an append-only `wos.log`
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use wosbus::BusClient;
//!
//! # tokio_test::block_on(async {
//! let mut client = BusClient::new();
//! client
//!     .connect("example-app", 1883, || println!("connected"), None)
//!     .await?;
//! client
//!     .subscribe("example-app", "vos/app/#", |topic: &str, payload: &[u8]| {
//!         println!("got message on {topic}: {}", String::from_utf8_lossy(payload));
//!     })
//!     .await?;
//! client.run().await;
//! # Ok::<(), wosbus::BusError>(())
//! # });
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod logger;

pub use client::{
    BusClient, ConnectionTarget, EventRoute, HandlerRegistry, LinkState, MessageHandler,
    FALLBACK_HOST, HOST_ENV_VAR, KEEP_ALIVE,
};
pub use config::{BusSection, ConfigError, ProbeConfig};
pub use error::BusError;
pub use logger::BusLogger;
