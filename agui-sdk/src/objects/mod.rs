pub mod event;
pub mod events;
pub mod ws;

pub use event::{DecodeError, EventRecord, Priority, now_millis};
pub use events::{AguiEvent, EventDomain, EventKind, UnknownEventKind};
pub use ws::{CloseCode, ControlFrame, InboundFrame};
