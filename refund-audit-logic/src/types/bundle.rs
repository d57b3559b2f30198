use super::transaction::Transaction;
use ethers_core::types::U256;
use serde::{Deserialize, Serialize};

/// An ordered sequence of transactions submitted together as a candidate for a target
/// block. Bundles are independent candidates within a block; the ordering *within* a
/// bundle is preserved and meaningful (section 3).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bundle {
    pub bundle_id: String,
    pub target_block: u64,
    pub declared_refund: U256,
    pub transactions: Vec<Transaction>,
}

impl Bundle {
    /// Synthesises `bundle_<index>` when the analytics source does not supply an
    /// explicit id (section 3).
    pub fn with_synthesised_id(mut self, index: usize, explicit_id: Option<String>) -> Self {
        self.bundle_id = explicit_id.unwrap_or_else(|| format!("bundle_{index}"));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthesises_id_when_absent() {
        let bundle = Bundle {
            bundle_id: String::new(),
            target_block: 1,
            declared_refund: U256::zero(),
            transactions: vec![],
        }
        .with_synthesised_id(3, None);
        assert_eq!(bundle.bundle_id, "bundle_3");
    }

    #[test]
    fn keeps_explicit_id() {
        let bundle = Bundle {
            bundle_id: String::new(),
            target_block: 1,
            declared_refund: U256::zero(),
            transactions: vec![],
        }
        .with_synthesised_id(3, Some("explicit".to_string()));
        assert_eq!(bundle.bundle_id, "explicit");
    }
}
