//! Impure I/O: the bus client and its event-loop supervisor
//!
//! `connect` spawns a supervisor task that drives the rumqttc event loop;
//! every connected/subscribed/message callback runs sequentially on that
//! task, in transport-delivery order. The `AsyncClient` handle is shared
//! behind a mutex so the connect-time fallback can swap in a fresh
//! connection without invalidating handles already held by subscribe and
//! publish.

use super::dispatch::{route_event, EventRoute, HandlerRegistry, MessageHandler};
use super::policy::{ConnectDecision, ConnectPolicy, LinkState};
use super::target::ConnectionTarget;
use crate::error::BusError;
use crate::logger::BusLogger;
use rumqttc::{AsyncClient, EventLoop, QoS};
use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, trace};

/// Publish/subscribe client for the WOS message bus.
///
/// Owns at most one broker connection; a new [`connect`](Self::connect)
/// supersedes the previous one wholesale. All lifecycle events are
/// written through the dual-sink logger.
pub struct BusClient {
    logger: Arc<BusLogger>,
    handle: Option<BusHandle>,
}

/// Everything tied to one connect call.
struct BusHandle {
    client: Arc<Mutex<AsyncClient>>,
    state_rx: watch::Receiver<LinkState>,
    registry: Arc<Mutex<HandlerRegistry>>,
    pending_subs: Arc<Mutex<VecDeque<PendingSubscription>>>,
    loop_task: Mutex<Option<JoinHandle<()>>>,
}

/// Subscribe request awaiting its broker acknowledgement. Acks arrive in
/// request order on a single connection, so FIFO matching is sound.
struct PendingSubscription {
    label: String,
    filter: String,
}

impl BusClient {
    /// Client with the durable log sink at the default `wos.log` path.
    ///
    /// Construction never fails; see [`BusLogger::open`].
    pub fn new() -> Self {
        Self::with_log_path(crate::logger::DEFAULT_LOG_PATH)
    }

    /// Client with the durable log sink at `path`.
    pub fn with_log_path(path: impl AsRef<Path>) -> Self {
        Self {
            logger: Arc::new(BusLogger::open(path)),
            handle: None,
        }
    }

    /// Append `text` to the console and durable sinks. Never fails
    /// visibly; see [`BusLogger::log`].
    pub fn log(&self, text: &str) {
        self.logger.log(text);
    }

    /// Connect to the bus at `host:port`, falling back once to
    /// `"localhost"` if the first attempt fails.
    ///
    /// When `host` is `None` the target resolves through the
    /// `WOS_MQTT_HOST` environment override before defaulting to
    /// `"localhost"`. The call itself only sets the connection up;
    /// `on_connected` fires later, on the event-loop task, the first time
    /// the broker acknowledges the connection - exactly once. Connect
    /// failures never surface here: they are logged, and after the single
    /// fallback attempt the client is left unconnected.
    pub async fn connect<F>(
        &mut self,
        app_label: &str,
        port: u16,
        on_connected: F,
        host: Option<&str>,
    ) -> Result<(), BusError>
    where
        F: FnOnce() + Send + 'static,
    {
        let target = ConnectionTarget::resolve(host, port);
        self.log(&format!(
            "[{app_label}] Connecting to message bus at {}:{}...",
            target.host, target.port
        ));

        // A superseded connection is torn down, not shared.
        if let Some(old) = self.handle.take() {
            if let Ok(mut guard) = old.loop_task.try_lock() {
                if let Some(task) = guard.take() {
                    task.abort();
                }
            }
            debug!("previous bus connection superseded");
        }

        let (client, event_loop) =
            AsyncClient::new(target.mqtt_options(app_label), target.channel_capacity());
        let client = Arc::new(Mutex::new(client));
        let (state_tx, state_rx) = watch::channel(LinkState::Connecting);

        let mut registry = HandlerRegistry::new();
        registry.set_on_connected(Box::new(on_connected));
        let registry = Arc::new(Mutex::new(registry));
        let pending_subs = Arc::new(Mutex::new(VecDeque::new()));

        let ctx = LoopContext {
            app_label: app_label.to_string(),
            target,
            logger: self.logger.clone(),
            client: client.clone(),
            state_tx,
            registry: registry.clone(),
            pending_subs: pending_subs.clone(),
        };
        let loop_task = tokio::spawn(run_event_loop(ctx, event_loop));

        self.handle = Some(BusHandle {
            client,
            state_rx,
            registry,
            pending_subs,
            loop_task: Mutex::new(Some(loop_task)),
        });
        Ok(())
    }

    /// Subscribe to `topic_filter` and install `handler` as the client's
    /// message handler.
    ///
    /// There is one message handler per client, shared across every
    /// filter subscribed so far; the last registration wins. Requires an
    /// active connection: without one this logs and returns
    /// [`BusError::NotConnected`] without touching the transport.
    pub async fn subscribe<H>(
        &self,
        app_label: &str,
        topic_filter: &str,
        handler: H,
    ) -> Result<(), BusError>
    where
        H: MessageHandler + 'static,
    {
        let handle = self.operable_handle(app_label)?;

        if topic_filter.trim().is_empty() {
            self.log(&format!(
                "[{app_label}] Cannot subscribe to an empty topic filter."
            ));
            return Err(BusError::InvalidTopicFilter);
        }

        handle
            .registry
            .lock()
            .await
            .set_message_handler(Box::new(handler));
        handle.pending_subs.lock().await.push_back(PendingSubscription {
            label: app_label.to_string(),
            filter: topic_filter.to_string(),
        });

        let client = handle.client.lock().await;
        if let Err(e) = client.subscribe(topic_filter, QoS::AtMostOnce).await {
            drop(client);
            // Keep ack bookkeeping aligned with what actually went out.
            handle.pending_subs.lock().await.pop_back();
            self.log(&format!("[{app_label}] Error subscribing to {topic_filter}."));
            return Err(BusError::SubscribeFailed(Box::new(e)));
        }
        Ok(())
    }

    /// Publish an opaque payload to `topic`, fire-and-forget.
    ///
    /// The request is handed to the transport at its default delivery
    /// guarantee; no acknowledgement is tracked. Same connection
    /// precondition as [`subscribe`](Self::subscribe).
    pub async fn publish(
        &self,
        app_label: &str,
        topic: &str,
        payload: impl Into<Vec<u8>>,
    ) -> Result<(), BusError> {
        let handle = self.operable_handle(app_label)?;

        let client = handle.client.lock().await;
        if let Err(e) = client
            .publish(topic, QoS::AtMostOnce, false, payload.into())
            .await
        {
            self.log(&format!("[{app_label}] Error publishing to {topic}."));
            return Err(BusError::PublishFailed(Box::new(e)));
        }
        Ok(())
    }

    /// Block until the connection terminates.
    ///
    /// On an unconnected client this returns immediately. Otherwise it
    /// joins the event-loop task, which exits when the link reaches a
    /// terminal state or the process is killed. Calling it again after
    /// the loop has finished returns immediately.
    pub async fn run(&self) {
        let Some(handle) = self.handle.as_ref() else {
            return;
        };
        let task = handle.loop_task.lock().await.take();
        if let Some(task) = task {
            let _ = task.await;
        }
    }

    /// Current link state; `None` before the first connect.
    pub fn state(&self) -> Option<LinkState> {
        self.handle.as_ref().map(|h| h.state_rx.borrow().clone())
    }

    /// Whether the broker has acknowledged the current connection.
    pub fn is_connected(&self) -> bool {
        matches!(self.state(), Some(LinkState::Connected))
    }

    /// Watch the link state; used by callers that want to react to
    /// connect-time failure without polling.
    pub fn state_watch(&self) -> Option<watch::Receiver<LinkState>> {
        self.handle.as_ref().map(|h| h.state_rx.clone())
    }

    /// Guard shared by subscribe and publish: an operable handle, or the
    /// logged not-connected no-op.
    fn operable_handle(&self, app_label: &str) -> Result<&BusHandle, BusError> {
        match self.handle.as_ref() {
            Some(handle) if ConnectPolicy::can_operate(&handle.state_rx.borrow()) => Ok(handle),
            _ => {
                self.log(&format!("[{app_label}] not connected."));
                Err(BusError::NotConnected)
            }
        }
    }
}

impl Default for BusClient {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for BusClient {
    fn drop(&mut self) {
        // Async teardown is not possible here; just stop the supervisor.
        if let Some(handle) = self.handle.take() {
            if let Ok(mut guard) = handle.loop_task.try_lock() {
                if let Some(task) = guard.take() {
                    task.abort();
                }
            }
        }
    }
}

/// State threaded through the event-loop supervisor.
struct LoopContext {
    app_label: String,
    target: ConnectionTarget,
    logger: Arc<BusLogger>,
    client: Arc<Mutex<AsyncClient>>,
    state_tx: watch::Sender<LinkState>,
    registry: Arc<Mutex<HandlerRegistry>>,
    pending_subs: Arc<Mutex<VecDeque<PendingSubscription>>>,
}

/// Drive the transport until the link reaches a terminal state.
///
/// All callbacks fire from here, sequentially, in the order the
/// transport delivers events. A pre-ConnAck error triggers the single
/// fallback swap to `"localhost"`; the second failure, or any error
/// after the link was up, ends the loop.
async fn run_event_loop(ctx: LoopContext, mut event_loop: EventLoop) {
    let mut connected_once = false;
    let mut fallen_back = false;

    loop {
        match event_loop.poll().await {
            Ok(event) => match route_event(&event) {
                EventRoute::ConnAckReceived => {
                    connected_once = true;
                    let _ = ctx.state_tx.send(LinkState::Connected);
                    ctx.logger
                        .log(&format!("[{}] Connected to message bus.", ctx.app_label));
                    if let Some(on_connected) = ctx.registry.lock().await.take_on_connected() {
                        on_connected();
                    }
                }
                EventRoute::Message { topic, payload } => {
                    ctx.registry
                        .lock()
                        .await
                        .dispatch_message(&topic, &payload);
                }
                EventRoute::SubscriptionConfirmed => {
                    if let Some(sub) = ctx.pending_subs.lock().await.pop_front() {
                        ctx.logger
                            .log(&format!("[{}] Subscribed to {}.", sub.label, sub.filter));
                    }
                }
                EventRoute::Disconnected => {
                    let reason = "broker closed the connection".to_string();
                    ctx.logger.log(&format!(
                        "[{}] Disconnected from message bus: {reason}",
                        ctx.app_label
                    ));
                    let _ = ctx.state_tx.send(LinkState::Closed(reason));
                    break;
                }
                EventRoute::Ignored => {
                    trace!(target: "wosbus", "transport event: {event:?}");
                }
            },
            Err(e) => match ConnectPolicy::on_error(connected_once, fallen_back) {
                ConnectDecision::FallBack => {
                    ctx.logger.log(&format!(
                        "[{}] Error connecting to bus at {}: {e}. Falling back to localhost.",
                        ctx.app_label, ctx.target.host
                    ));
                    fallen_back = true;

                    let fallback = ctx.target.fallback();
                    let (new_client, new_event_loop) = AsyncClient::new(
                        fallback.mqtt_options(&ctx.app_label),
                        fallback.channel_capacity(),
                    );
                    // Swap the shared handle so subscribe/publish reach
                    // the fallback connection.
                    *ctx.client.lock().await = new_client;
                    event_loop = new_event_loop;
                    // Requests queued on the old connection never reached
                    // the broker; their acks will not arrive.
                    ctx.pending_subs.lock().await.clear();
                }
                ConnectDecision::GiveUp => {
                    ctx.logger.log(&format!(
                        "[{}] Fallback to localhost also failed: {e}",
                        ctx.app_label
                    ));
                    let _ = ctx.state_tx.send(LinkState::Failed(e.to_string()));
                    break;
                }
                ConnectDecision::CloseLink => {
                    ctx.logger.log(&format!(
                        "[{}] Connection to message bus lost: {e}",
                        ctx.app_label
                    ));
                    let _ = ctx.state_tx.send(LinkState::Closed(e.to_string()));
                    break;
                }
            },
        }
    }

    debug!(label = %ctx.app_label, "bus event loop stopped");
}
