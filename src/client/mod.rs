//! WOS bus client
//!
//! The module is split the same way on both sides of the I/O boundary:
//!
//! - [`target`] - pure broker address resolution and options construction
//! - [`policy`] - pure link state machine and fallback decisions
//! - [`dispatch`] - pure event routing and handler registration
//! - [`bus`] - impure I/O and event-loop coordination
//!
//! # Usage
//!
//! ```rust,no_run
//! use wosbus::BusClient;
//!
//! # tokio_test::block_on(async {
//! let mut client = BusClient::new();
//! client
//!     .connect("scene-tool", 1883, || println!("up"), None)
//!     .await?;
//! client
//!     .subscribe("scene-tool", "vos/app/#", |topic: &str, payload: &[u8]| {
//!         println!("{topic}: {} bytes", payload.len());
//!     })
//!     .await?;
//! client.publish("scene-tool", "vos/app/test", "test-message").await?;
//! client.run().await;
//! # Ok::<(), wosbus::BusError>(())
//! # });
//! ```

pub mod bus;
pub mod dispatch;
pub mod policy;
pub mod target;

pub use bus::BusClient;
pub use dispatch::{EventRoute, HandlerRegistry, MessageHandler};
pub use policy::{ConnectDecision, ConnectPolicy, LinkState};
pub use target::{resolve_host, ConnectionTarget, FALLBACK_HOST, HOST_ENV_VAR, KEEP_ALIVE};
