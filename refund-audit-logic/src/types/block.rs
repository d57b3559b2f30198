use super::transaction::Transaction;
use ethers_core::types::H256;
use serde::{Deserialize, Serialize};

/// A confirmed block as returned by the node's `getBlock`. Immutable once fetched and
/// cached verbatim as a serialized snapshot keyed by block number (section 3).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub block_number: u64,
    pub timestamp: u64,
    pub state_root: H256,
    pub transactions: Vec<Transaction>,
    #[serde(default, flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Block {
    pub fn transaction_count(&self) -> usize {
        self.transactions.len()
    }
}
