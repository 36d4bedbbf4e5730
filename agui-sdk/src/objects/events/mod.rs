//! The closed AG-UI event taxonomy.
//!
//! Every event belongs to one domain and carries one typed payload. The
//! table at the bottom of this file is the single source of truth: it
//! generates the per-domain enums, [`AguiEvent`], [`EventKind`] with its
//! dotted wire names, and [`EventDomain`]. Adding an event means adding one
//! line there plus its payload struct.
//!
//! Matching on [`AguiEvent`] is exhaustive, so subscribers find out at
//! compile time when a domain grows.

pub mod agent;
pub mod button;
pub mod calendar;
pub mod chart;
pub mod form;
pub mod goal;
pub mod llm;
pub mod system;
pub mod trading;
pub mod wallet;

pub use agent::*;
pub use button::*;
pub use calendar::*;
pub use chart::*;
pub use form::*;
pub use goal::*;
pub use llm::*;
pub use system::*;
pub use trading::*;
pub use wallet::*;

use std::fmt;
use std::str::FromStr;

macro_rules! event_taxonomy {
    (
        $(
            $(#[$domain_meta:meta])*
            $domain:ident($domain_enum:ident) = $prefix:literal {
                $(
                    $variant:ident($payload:ty) = $name:literal => $kind:ident,
                )+
            }
        )+
    ) => {
        $(
            $(#[$domain_meta])*
            #[derive(Debug, Clone, PartialEq)]
            pub enum $domain_enum {
                $( $variant($payload), )+
            }

            impl $domain_enum {
                pub fn kind(&self) -> EventKind {
                    match self {
                        $( Self::$variant(_) => EventKind::$kind, )+
                    }
                }
            }

            impl From<$domain_enum> for AguiEvent {
                fn from(event: $domain_enum) -> Self {
                    AguiEvent::$domain(event)
                }
            }

            $(
                impl From<$payload> for AguiEvent {
                    fn from(payload: $payload) -> Self {
                        AguiEvent::$domain($domain_enum::$variant(payload))
                    }
                }
            )+
        )+

        /// Any AG-UI event, grouped by domain.
        #[derive(Debug, Clone, PartialEq)]
        pub enum AguiEvent {
            $( $domain($domain_enum), )+
        }

        impl AguiEvent {
            pub fn kind(&self) -> EventKind {
                match self {
                    $( AguiEvent::$domain(event) => event.kind(), )+
                }
            }

            pub fn domain(&self) -> EventDomain {
                self.kind().domain()
            }

            /// Rebuild a typed event from its kind and the JSON `data` object.
            pub fn from_parts(
                kind: EventKind,
                data: serde_json::Value,
            ) -> Result<Self, serde_json::Error> {
                match kind {
                    $($(
                        EventKind::$kind => serde_json::from_value::<$payload>(data)
                            .map(|payload| AguiEvent::$domain($domain_enum::$variant(payload))),
                    )+)+
                }
            }

            /// Serialize only the payload (the wire `data` field).
            pub fn serialize_payload<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                match self {
                    $($(
                        AguiEvent::$domain($domain_enum::$variant(payload)) => {
                            serde::Serialize::serialize(payload, serializer)
                        }
                    )+)+
                }
            }
        }

        /// Top-level grouping of event kinds.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum EventDomain {
            $( $domain, )+
        }

        impl EventDomain {
            pub const ALL: &'static [EventDomain] = &[ $( EventDomain::$domain, )+ ];

            /// The dotted prefix shared by every event name in this domain.
            pub const fn prefix(self) -> &'static str {
                match self {
                    $( EventDomain::$domain => $prefix, )+
                }
            }
        }

        /// Names every event in the taxonomy.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum EventKind {
            $($( $kind, )+)+
        }

        impl EventKind {
            pub const ALL: &'static [EventKind] = &[ $($( EventKind::$kind, )+)+ ];

            /// The dotted wire name, e.g. `wallet.balance_changed`.
            pub const fn as_str(self) -> &'static str {
                match self {
                    $($( EventKind::$kind => $name, )+)+
                }
            }

            pub const fn domain(self) -> EventDomain {
                match self {
                    $($( EventKind::$kind => EventDomain::$domain, )+)+
                }
            }
        }
    };
}

event_taxonomy! {
    System(SystemEvent) = "system" {
        Connected(ConnectionOpened) = "system.connected" => SystemConnected,
        Disconnected(ConnectionClosed) = "system.disconnected" => SystemDisconnected,
        Reconnecting(ReconnectScheduled) = "system.reconnecting" => SystemReconnecting,
        ConnectionFailed(ConnectionFailed) = "system.connection_failed" => SystemConnectionFailed,
        Error(SystemError) = "system.error" => SystemError,
        Notification(SystemNotification) = "system.notification" => SystemNotification,
    }
    Wallet(WalletEvent) = "wallet" {
        Created(WalletCreated) = "wallet.created" => WalletCreated,
        BalanceChanged(WalletBalanceChanged) = "wallet.balance_changed" => WalletBalanceChanged,
        TransferCompleted(WalletTransferCompleted) = "wallet.transfer_completed" => WalletTransferCompleted,
        Deleted(WalletDeleted) = "wallet.deleted" => WalletDeleted,
    }
    Goal(GoalEvent) = "goal" {
        Created(GoalCreated) = "goal.created" => GoalCreated,
        ProgressUpdated(GoalProgressUpdated) = "goal.progress_updated" => GoalProgressUpdated,
        Completed(GoalCompleted) = "goal.completed" => GoalCompleted,
    }
    Trading(TradingEvent) = "trade" {
        OrderPlaced(OrderPlaced) = "trade.order_placed" => TradeOrderPlaced,
        OrderFilled(OrderFilled) = "trade.order_filled" => TradeOrderFilled,
        OrderCancelled(OrderCancelled) = "trade.order_cancelled" => TradeOrderCancelled,
        PositionUpdated(PositionUpdated) = "trade.position_updated" => TradePositionUpdated,
        MarketData(MarketTick) = "trade.market_data" => TradeMarketData,
    }
    Agent(AgentEvent) = "agent" {
        Started(AgentStarted) = "agent.started" => AgentStarted,
        Stopped(AgentStopped) = "agent.stopped" => AgentStopped,
        StatusChanged(AgentStatusChanged) = "agent.status_changed" => AgentStatusChanged,
        Decision(AgentDecision) = "agent.decision" => AgentDecision,
    }
    Llm(LlmEvent) = "llm" {
        RequestStarted(LlmRequestStarted) = "llm.request_started" => LlmRequestStarted,
        StreamChunk(LlmStreamChunk) = "llm.stream_chunk" => LlmStreamChunk,
        RequestCompleted(LlmRequestCompleted) = "llm.request_completed" => LlmRequestCompleted,
        RequestFailed(LlmRequestFailed) = "llm.request_failed" => LlmRequestFailed,
    }
    Chart(ChartEvent) = "chart" {
        SymbolChanged(ChartSymbolChanged) = "chart.symbol_changed" => ChartSymbolChanged,
        TimeframeChanged(ChartTimeframeChanged) = "chart.timeframe_changed" => ChartTimeframeChanged,
        CrosshairMove(ChartCrosshairMove) = "chart.crosshair_move" => ChartCrosshairMove,
        IndicatorAdded(ChartIndicatorAdded) = "chart.indicator_added" => ChartIndicatorAdded,
    }
    Calendar(CalendarEvent) = "calendar" {
        EventScheduled(CalendarEventScheduled) = "calendar.event_scheduled" => CalendarEventScheduled,
        EventUpdated(CalendarEventUpdated) = "calendar.event_updated" => CalendarEventUpdated,
        EventCancelled(CalendarEventCancelled) = "calendar.event_cancelled" => CalendarEventCancelled,
    }
    Form(FormEvent) = "form" {
        Submitted(FormSubmitted) = "form.submitted" => FormSubmitted,
        ValidationFailed(FormValidationFailed) = "form.validation_failed" => FormValidationFailed,
        FieldChanged(FormFieldChanged) = "form.field_changed" => FormFieldChanged,
        Reset(FormReset) = "form.reset" => FormReset,
    }
    Button(ButtonEvent) = "button" {
        Clicked(ButtonClicked) = "button.clicked" => ButtonClicked,
        StateChanged(ButtonStateChanged) = "button.state_changed" => ButtonStateChanged,
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for EventDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// Returned when a string names no event in the taxonomy.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown event kind `{0}`")]
pub struct UnknownEventKind(pub String);

impl FromStr for EventKind {
    type Err = UnknownEventKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownEventKind(s.to_string()))
    }
}

impl FromStr for EventDomain {
    type Err = UnknownEventKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventDomain::ALL
            .iter()
            .copied()
            .find(|domain| domain.prefix() == s)
            .ok_or_else(|| UnknownEventKind(s.to_string()))
    }
}

impl serde::Serialize for EventKind {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> serde::Deserialize<'de> for EventKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let name = <String as serde::Deserialize>::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}
