//! In-process event bus layered over one transport.
//!
//! ```ignore
//! let bus = EventBus::with_websocket(BusConfig::default());
//! bus.subscribe(
//!     EventKind::WalletBalanceChanged,
//!     |record| {
//!         tracing::info!(id = record.id(), "balance changed");
//!         Ok(())
//!     },
//!     SubscriptionOptions::default(),
//! );
//! bus.initialize().await;
//! bus.emit(balance_changed, EmitOptions::default());
//! ```

mod event_bus;
mod history;
mod middleware;
mod subscription;

pub use event_bus::{EmitOptions, EventBus};
pub use middleware::Middleware;
pub use subscription::{
    DispatchStats, Subscription, SubscriptionId, SubscriptionOptions, SubscriptionStats, Topic,
    WILDCARD,
};
