use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ButtonClicked {
    pub button_id: String,
    pub action: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ButtonStateChanged {
    pub button_id: String,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub loading: bool,
}
