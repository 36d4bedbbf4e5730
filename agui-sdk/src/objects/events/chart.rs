//! Chart widget interactions.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSymbolChanged {
    pub chart_id: String,
    pub symbol: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartTimeframeChanged {
    pub chart_id: String,
    /// e.g. `1m`, `1h`, `1D`
    pub timeframe: String,
}

/// High-frequency: fired on every pointer move over a chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartCrosshairMove {
    pub chart_id: String,
    pub time: i64,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartIndicatorAdded {
    pub chart_id: String,
    pub indicator: String,
    #[serde(default)]
    pub params: serde_json::Value,
}
