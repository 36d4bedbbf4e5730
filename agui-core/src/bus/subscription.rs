//! Subscriptions and the per-handler delivery path.
//!
//! Each registered handler sits behind a small pipeline:
//!
//! 1. the filter predicate, if any (mismatch drops silently),
//! 2. the throttle window, if any (leading edge),
//! 3. the debounce window, if any (trailing edge, runs on a tokio task),
//! 4. the handler itself inside a fault boundary,
//! 5. `once`, which removes the subscription after its first successful
//!    delivery.
//!
//! A handler returning `Err` or panicking is logged and counted in
//! [`DispatchStats`]. It never affects other subscribers.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock, Weak};
use std::time::Duration;

use agui_sdk::objects::{EventDomain, EventKind, EventRecord, UnknownEventKind};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, warn};

use crate::utils::sync::{lock, read, write};

/// Wire spelling of [`Topic::All`].
pub const WILDCARD: &str = "*";

/// What a subscription listens to.
///
/// Parses from `"*"`, a domain wildcard such as `"wallet.*"`, or a dotted
/// event name such as `"wallet.balance_changed"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Topic {
    /// Every processed event, regardless of kind.
    All,
    Domain(EventDomain),
    Kind(EventKind),
}

impl Topic {
    pub fn matches(self, kind: EventKind) -> bool {
        match self {
            Topic::All => true,
            Topic::Domain(domain) => kind.domain() == domain,
            Topic::Kind(topic) => topic == kind,
        }
    }
}

impl From<EventKind> for Topic {
    fn from(kind: EventKind) -> Self {
        Topic::Kind(kind)
    }
}

impl From<EventDomain> for Topic {
    fn from(domain: EventDomain) -> Self {
        Topic::Domain(domain)
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Topic::All => f.write_str(WILDCARD),
            Topic::Domain(domain) => write!(f, "{domain}.*"),
            Topic::Kind(kind) => f.write_str(kind.as_str()),
        }
    }
}

impl FromStr for Topic {
    type Err = UnknownEventKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == WILDCARD {
            return Ok(Topic::All);
        }
        match s.strip_suffix(".*") {
            Some(prefix) => prefix.parse().map(Topic::Domain),
            None => s.parse().map(Topic::Kind),
        }
    }
}

/// Identifies one subscription within its bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

type Handler = dyn Fn(&EventRecord) -> anyhow::Result<()> + Send + Sync;
type Filter = dyn Fn(&EventRecord) -> bool + Send + Sync;

/// Delivery policy for one subscription.
///
/// ```ignore
/// let options = SubscriptionOptions::default()
///     .priority(10)
///     .throttle(Duration::from_millis(250))
///     .filter(|record| record.source() != "dashboard");
/// ```
#[derive(Clone, Default)]
pub struct SubscriptionOptions {
    once: bool,
    priority: i32,
    filter: Option<Arc<Filter>>,
    throttle: Option<Duration>,
    debounce: Option<Duration>,
}

impl SubscriptionOptions {
    /// Unsubscribe after the first delivery whose handler returns `Ok`.
    pub fn once(mut self) -> Self {
        self.once = true;
        self
    }

    /// Higher runs first. Equal priorities run in registration order.
    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&EventRecord) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Arc::new(filter));
        self
    }

    /// Drop deliveries arriving within `window` of the last delivery.
    pub fn throttle(mut self, window: Duration) -> Self {
        self.throttle = Some(window);
        self
    }

    /// Deliver only the latest event once `window` passes without a newer
    /// one. Needs a tokio runtime; without one, events are delivered
    /// immediately.
    pub fn debounce(mut self, window: Duration) -> Self {
        self.debounce = Some(window);
        self
    }
}

impl fmt::Debug for SubscriptionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionOptions")
            .field("once", &self.once)
            .field("priority", &self.priority)
            .field("filter", &self.filter.is_some())
            .field("throttle", &self.throttle)
            .field("debounce", &self.debounce)
            .finish()
    }
}

/// Handle returned by `subscribe`.
///
/// Dropping it does not unsubscribe.
#[derive(Debug, Clone)]
pub struct Subscription {
    id: SubscriptionId,
    registry: Weak<Registry>,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Remove the subscription. Returns `false` when it was already gone.
    pub fn unsubscribe(&self) -> bool {
        self.registry
            .upgrade()
            .is_some_and(|registry| registry.remove(self.id))
    }
}

/// Counts of live subscriptions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriptionStats {
    pub total: usize,
    pub by_topic: BTreeMap<Topic, usize>,
}

/// Outcomes of handler invocations since the bus was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Handlers that returned `Ok`.
    pub delivered: u64,
    /// Handlers that returned `Err` or panicked.
    pub failed: u64,
}

#[derive(Debug, Default)]
pub(crate) struct DispatchCounters {
    delivered: AtomicU64,
    failed: AtomicU64,
}

impl DispatchCounters {
    pub fn snapshot(&self) -> DispatchStats {
        DispatchStats {
            delivered: self.delivered.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

struct Throttle {
    window: Duration,
    last: Mutex<Option<Instant>>,
}

struct Debounce {
    window: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl Debounce {
    fn cancel(&self) {
        if let Some(task) = lock(&self.pending).take() {
            task.abort();
        }
    }
}

struct Entry {
    id: SubscriptionId,
    topic: Topic,
    priority: i32,
    once: bool,
    consumed: AtomicBool,
    filter: Option<Arc<Filter>>,
    handler: Arc<Handler>,
    throttle: Option<Throttle>,
    debounce: Option<Debounce>,
}

impl Entry {
    /// `true` when the throttle window rejects this delivery.
    fn throttled(&self) -> bool {
        let Some(throttle) = &self.throttle else {
            return false;
        };
        let now = Instant::now();
        let mut last = lock(&throttle.last);
        if last.is_some_and(|at| now.saturating_duration_since(at) < throttle.window) {
            return true;
        }
        *last = Some(now);
        false
    }
}

/// Subscriptions of one bus, kept sorted by priority (descending) then id.
#[derive(Default)]
pub(crate) struct Registry {
    entries: RwLock<Vec<Arc<Entry>>>,
    next_id: AtomicU64,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("subscriptions", &read(&self.entries).len())
            .finish()
    }
}

impl Registry {
    pub fn insert<F>(
        self: &Arc<Self>,
        topic: Topic,
        handler: F,
        options: SubscriptionOptions,
    ) -> Subscription
    where
        F: Fn(&EventRecord) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let entry = Arc::new(Entry {
            id,
            topic,
            priority: options.priority,
            once: options.once,
            consumed: AtomicBool::new(false),
            filter: options.filter,
            handler: Arc::new(handler),
            throttle: options.throttle.map(|window| Throttle {
                window,
                last: Mutex::new(None),
            }),
            debounce: options.debounce.map(|window| Debounce {
                window,
                pending: Mutex::new(None),
            }),
        });

        {
            let mut entries = write(&self.entries);
            let position = entries
                .iter()
                .position(|existing| existing.priority < entry.priority)
                .unwrap_or(entries.len());
            entries.insert(position, entry);
        }
        debug!(subscription = %id, %topic, "Subscribed");

        Subscription {
            id,
            registry: Arc::downgrade(self),
        }
    }

    pub fn remove(&self, id: SubscriptionId) -> bool {
        let removed = {
            let mut entries = write(&self.entries);
            entries
                .iter()
                .position(|entry| entry.id == id)
                .map(|index| entries.remove(index))
        };
        match removed {
            Some(entry) => {
                if let Some(debounce) = &entry.debounce {
                    debounce.cancel();
                }
                debug!(subscription = %id, topic = %entry.topic, "Unsubscribed");
                true
            }
            None => false,
        }
    }

    pub fn clear(&self) {
        let entries = std::mem::take(&mut *write(&self.entries));
        for entry in &entries {
            if let Some(debounce) = &entry.debounce {
                debounce.cancel();
            }
        }
    }

    pub fn stats(&self) -> SubscriptionStats {
        let entries = read(&self.entries);
        let mut by_topic = BTreeMap::new();
        for entry in entries.iter() {
            *by_topic.entry(entry.topic).or_insert(0) += 1;
        }
        SubscriptionStats {
            total: entries.len(),
            by_topic,
        }
    }

    /// Deliver `record` to every matching subscription.
    ///
    /// The matching set is snapshotted first and no lock is held while
    /// handlers run, so handlers may subscribe, unsubscribe or emit.
    pub fn dispatch(self: &Arc<Self>, record: &EventRecord, counters: &Arc<DispatchCounters>) {
        let kind = record.kind();
        let matching: Vec<Arc<Entry>> = read(&self.entries)
            .iter()
            .filter(|entry| entry.topic.matches(kind))
            .cloned()
            .collect();

        for entry in matching {
            if let Some(filter) = &entry.filter {
                match catch_unwind(AssertUnwindSafe(|| filter(record))) {
                    Ok(true) => {}
                    Ok(false) => continue,
                    Err(panic) => {
                        counters.failed.fetch_add(1, Ordering::Relaxed);
                        error!(
                            subscription = %entry.id,
                            %kind,
                            panic = panic_message(panic.as_ref()),
                            "Subscription filter panicked"
                        );
                        continue;
                    }
                }
            }
            if entry.throttled() {
                continue;
            }

            match &entry.debounce {
                Some(debounce) => self.schedule_debounced(&entry, debounce, record, counters),
                None => self.deliver(&entry, record, counters),
            }
        }
    }

    /// Run the handler, honouring `once`.
    ///
    /// A `once` subscription is claimed for the duration of the call so a
    /// racing dispatch cannot run it twice. It is removed only when the
    /// handler succeeds; a failure releases the claim.
    fn deliver(&self, entry: &Entry, record: &EventRecord, counters: &DispatchCounters) {
        if entry.once && entry.consumed.swap(true, Ordering::AcqRel) {
            return;
        }
        let delivered = invoke(&*entry.handler, entry.id, record, counters);
        if entry.once {
            if delivered {
                self.remove(entry.id);
            } else {
                entry.consumed.store(false, Ordering::Release);
            }
        }
    }

    fn schedule_debounced(
        self: &Arc<Self>,
        entry: &Arc<Entry>,
        debounce: &Debounce,
        record: &EventRecord,
        counters: &Arc<DispatchCounters>,
    ) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            self.deliver(entry, record, counters);
            return;
        };

        let window = debounce.window;
        let registry = Arc::downgrade(self);
        let entry_for_task = entry.clone();
        let record = record.clone();
        let counters = counters.clone();
        let task = runtime.spawn(async move {
            tokio::time::sleep(window).await;
            if let Some(registry) = registry.upgrade() {
                registry.deliver(&entry_for_task, &record, &counters);
            }
        });

        // Stored before anything can remove the entry, so unsubscribe and
        // clear always reach it.
        if let Some(previous) = lock(&debounce.pending).replace(task) {
            previous.abort();
        }
    }
}

/// Returns whether the handler succeeded.
fn invoke(
    handler: &Handler,
    id: SubscriptionId,
    record: &EventRecord,
    counters: &DispatchCounters,
) -> bool {
    match catch_unwind(AssertUnwindSafe(|| handler(record))) {
        Ok(Ok(())) => {
            counters.delivered.fetch_add(1, Ordering::Relaxed);
            true
        }
        Ok(Err(e)) => {
            counters.failed.fetch_add(1, Ordering::Relaxed);
            let error = format!("{e:#}");
            warn!(
                subscription = %id,
                kind = %record.kind(),
                event_id = record.id(),
                %error,
                "Subscriber handler failed"
            );
            false
        }
        Err(panic) => {
            counters.failed.fetch_add(1, Ordering::Relaxed);
            error!(
                subscription = %id,
                kind = %record.kind(),
                event_id = record.id(),
                panic = panic_message(panic.as_ref()),
                "Subscriber handler panicked"
            );
            false
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}
