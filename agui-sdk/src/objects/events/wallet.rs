use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletCreated {
    pub wallet_id: String,
    pub name: String,
    pub currency: String,
    #[serde(default)]
    pub initial_balance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletBalanceChanged {
    pub wallet_id: String,
    pub old_balance: f64,
    pub new_balance: f64,
}

impl WalletBalanceChanged {
    /// Signed change from the old balance to the new one.
    pub fn delta(&self) -> f64 {
        self.new_balance - self.old_balance
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletTransferCompleted {
    pub transfer_id: String,
    pub from_wallet: String,
    pub to_wallet: String,
    pub amount: f64,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletDeleted {
    pub wallet_id: String,
}
