use ethers_core::types::{Address, Bytes, H256, U256};
use serde::{Deserialize, Serialize};

/// One of the two fee-market shapes a transaction can carry. Absent fields are omitted
/// from the `trace_callMany` call object, never defaulted (section 4.1).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GasPricing {
    Legacy { gas_price: U256 },
    Eip1559 {
        max_fee_per_gas: U256,
        max_priority_fee_per_gas: U256,
    },
}

impl GasPricing {
    /// The `max_fee_per_gas` equivalent used in the per-transaction balance precheck
    /// (`required = gas_limit * max_fee_per_gas + value`): for a legacy transaction this
    /// is simply its flat `gas_price`.
    pub fn max_fee_per_gas(&self) -> U256 {
        match self {
            GasPricing::Legacy { gas_price } => *gas_price,
            GasPricing::Eip1559 {
                max_fee_per_gas, ..
            } => *max_fee_per_gas,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub hash: H256,
    pub from: Address,
    pub to: Option<Address>,
    pub value: U256,
    pub gas_limit: U256,
    pub gas_pricing: GasPricing,
    pub nonce: U256,
    pub chain_id: u64,
    #[serde(default)]
    pub data: Option<Bytes>,
    #[serde(default)]
    pub access_list: Option<serde_json::Value>,
    /// Fields the node returned that this model does not interpret, preserved verbatim
    /// so that re-serialising a cached transaction is a fixed point (section 9).
    #[serde(default, flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Transaction {
    /// `required = gas_limit * max_fee_per_gas + value`, the stricter per-transaction
    /// balance check performed after the bundle-level precheck (section 4.5, step 2).
    pub fn required_balance(&self) -> U256 {
        self.gas_limit
            .saturating_mul(self.gas_pricing.max_fee_per_gas())
            .saturating_add(self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Transaction {
        Transaction {
            hash: H256::zero(),
            from: Address::zero(),
            to: None,
            value: U256::from(100),
            gas_limit: U256::from(21_000),
            gas_pricing: GasPricing::Legacy {
                gas_price: U256::from(10),
            },
            nonce: U256::zero(),
            chain_id: 1,
            data: None,
            access_list: None,
            extra: Default::default(),
        }
    }

    #[test]
    fn required_balance_adds_gas_cost_and_value() {
        let tx = sample();
        assert_eq!(tx.required_balance(), U256::from(21_000 * 10 + 100));
    }

    #[test]
    fn eip1559_uses_max_fee_per_gas() {
        let mut tx = sample();
        tx.gas_pricing = GasPricing::Eip1559 {
            max_fee_per_gas: U256::from(20),
            max_priority_fee_per_gas: U256::from(2),
        };
        assert_eq!(tx.required_balance(), U256::from(21_000 * 20 + 100));
    }
}
