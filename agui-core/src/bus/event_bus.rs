use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};

use agui_sdk::objects::{AguiEvent, EventKind, EventRecord, Priority};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::history::EventHistory;
use super::middleware::{Middleware, MiddlewareChain};
use super::subscription::{
    DispatchCounters, DispatchStats, Registry, Subscription, SubscriptionId, SubscriptionOptions,
    SubscriptionStats, Topic,
};
use crate::config::BusConfig;
use crate::transport::{
    ConnectionState, Connector, TransportHandle, TransportOutput, TransportOutputReceiver,
    TungsteniteConnector, spawn_transport,
};
use crate::utils::sync::lock;

/// Envelope overrides for [`EventBus::emit`].
#[derive(Debug, Clone, Default)]
pub struct EmitOptions {
    pub priority: Option<Priority>,
    pub target: Option<String>,
    pub correlation_id: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

impl EmitOptions {
    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    pub fn metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    fn apply(self, mut record: EventRecord) -> EventRecord {
        if let Some(priority) = self.priority {
            record = record.with_priority(priority);
        }
        if let Some(target) = self.target {
            record = record.with_target(target);
        }
        if let Some(correlation_id) = self.correlation_id {
            record = record.with_correlation_id(correlation_id);
        }
        if let Some(metadata) = self.metadata {
            record = record.with_metadata(metadata);
        }
        record
    }
}

/// Routes events between the application and one transport.
///
/// Every processed event (emitted locally, received from the transport, or
/// built from a transport notice) runs through the same pipeline:
/// middleware, then history, then subscribers in priority order. Handlers
/// run synchronously on the thread that processes the event.
///
/// `EventBus` is a cheap handle. Clone it and pass it to whatever needs to
/// emit or subscribe; all clones share one registry, history and transport.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

struct BusInner {
    source: String,
    transport: TransportHandle,
    middleware: MiddlewareChain,
    history: Mutex<EventHistory>,
    registry: Arc<Registry>,
    counters: Arc<DispatchCounters>,
    destroyed: AtomicBool,
    pump: Mutex<Option<JoinHandle<()>>>,
}

impl EventBus {
    /// Build a bus over a new transport using `connector`.
    ///
    /// Must be called within a tokio runtime. Nothing connects until
    /// [`initialize`](Self::initialize) or [`publish`](Self::publish).
    pub fn new(config: BusConfig, connector: impl Connector) -> Self {
        let (transport, output) = spawn_transport(config.transport, connector);
        let inner = Arc::new(BusInner {
            source: config.source,
            transport,
            middleware: MiddlewareChain::default(),
            history: Mutex::new(EventHistory::new(config.history_size)),
            registry: Arc::new(Registry::default()),
            counters: Arc::new(DispatchCounters::default()),
            destroyed: AtomicBool::new(false),
            pump: Mutex::new(None),
        });
        let pump = tokio::spawn(pump_transport_output(Arc::downgrade(&inner), output));
        *lock(&inner.pump) = Some(pump);
        Self { inner }
    }

    /// Build a bus that talks WebSocket to `config.transport.url`.
    pub fn with_websocket(config: BusConfig) -> Self {
        Self::new(config, TungsteniteConnector)
    }

    /// Connect the transport and wait for the outcome.
    pub async fn initialize(&self) -> ConnectionState {
        self.inner.transport.connect().await
    }

    /// Append a middleware step. Steps run in registration order.
    pub fn add_middleware(&self, middleware: impl Middleware) {
        self.inner.middleware.push(middleware);
    }

    /// Build a record for `event`, dispatch it locally, then forward it to
    /// the transport if the transport is connected right now.
    ///
    /// Returns the record as built, before middleware.
    pub fn emit(&self, event: impl Into<AguiEvent>, options: EmitOptions) -> EventRecord {
        let record = options.apply(EventRecord::new(event, self.inner.source.as_str()));
        if self.inner.destroyed.load(Ordering::Acquire) {
            debug!(kind = %record.kind(), "Bus destroyed, ignoring emit");
            return record;
        }

        let Some(processed) = self.inner.process(record.clone()) else {
            return record;
        };
        if self.inner.transport.is_connected() {
            self.inner.transport.send(processed);
        }
        record
    }

    /// Hand a record to the transport without local dispatch. The transport
    /// queues it while disconnected.
    pub fn publish(&self, record: EventRecord) {
        if self.inner.destroyed.load(Ordering::Acquire) {
            debug!(kind = %record.kind(), "Bus destroyed, ignoring publish");
            return;
        }
        self.inner.transport.send(record);
    }

    /// Register `handler` for `topic`.
    ///
    /// A handler returning `Err` is logged and counted as failed; it never
    /// stops delivery to other subscribers.
    pub fn subscribe<F>(
        &self,
        topic: impl Into<Topic>,
        handler: F,
        options: SubscriptionOptions,
    ) -> Subscription
    where
        F: Fn(&EventRecord) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.inner.registry.insert(topic.into(), handler, options)
    }

    /// Idempotent. Unknown ids return `false`.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.registry.remove(id)
    }

    /// Processed records, oldest first, optionally of one kind and limited
    /// to the newest `limit`.
    pub fn event_history(&self, kind: Option<EventKind>, limit: Option<usize>) -> Vec<EventRecord> {
        lock(&self.inner.history).query(kind, limit)
    }

    pub fn subscription_stats(&self) -> SubscriptionStats {
        self.inner.registry.stats()
    }

    pub fn dispatch_stats(&self) -> DispatchStats {
        self.inner.counters.snapshot()
    }

    pub fn transport(&self) -> &TransportHandle {
        &self.inner.transport
    }

    /// Drop every subscription and middleware, stop consuming transport
    /// output and disconnect. The bus ignores emits afterwards.
    pub async fn destroy(&self) {
        if self.inner.destroyed.swap(true, Ordering::AcqRel) {
            return;
        }
        let pump = lock(&self.inner.pump).take();
        if let Some(pump) = pump {
            pump.abort();
        }
        self.inner.registry.clear();
        self.inner.middleware.clear();
        self.inner.transport.disconnect().await;
        info!("Event bus destroyed");
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("source", &self.inner.source)
            .field("transport", &self.inner.transport)
            .field("registry", &self.inner.registry)
            .finish_non_exhaustive()
    }
}

impl BusInner {
    /// Middleware, history, dispatch. Returns the record subscribers saw,
    /// or `None` when middleware dropped it.
    fn process(&self, record: EventRecord) -> Option<EventRecord> {
        if self.destroyed.load(Ordering::Acquire) {
            return None;
        }
        let record = self.middleware.apply(record)?;
        lock(&self.history).push(record.clone());
        self.registry.dispatch(&record, &self.counters);
        Some(record)
    }
}

/// Feed transport output into the bus in arrival order. Notices become
/// `system.*` records.
///
/// Holds only a weak reference so dropping every `EventBus` tears down the
/// transport, which in turn ends this task.
async fn pump_transport_output(bus: Weak<BusInner>, mut output: TransportOutputReceiver) {
    while let Some(item) = output.recv().await {
        let Some(bus) = bus.upgrade() else {
            break;
        };
        let record = match item {
            TransportOutput::Event(record) => record,
            TransportOutput::Notice(notice) => notice.into_record(),
        };
        bus.process(record);
    }
    debug!("Transport output closed");
}
