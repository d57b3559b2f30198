use super::numeric::{HexOrDecimal, ParseNumericError};
use ethers_core::types::{Address, H256, U256};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single account's delta from a `trace_callMany` state diff.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountDiff {
    #[serde(default)]
    pub balance_delta: Option<HexOrDecimal>,
    #[serde(default)]
    pub nonce_delta: Option<u64>,
    #[serde(default)]
    pub storage: HashMap<H256, H256>,
}

/// Raw per-transaction outcome of a simulated call, as returned by the node (section 3).
/// Every numeric field is a [`HexOrDecimal`] rather than a bare `U256`: nodes and trace
/// plugins are inconsistent about returning quantities as `0x`-prefixed hex or as plain
/// JSON numbers, and this is the boundary the design note (section 9) requires the
/// canonical normaliser to sit at, before any of these values are summed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceResult {
    #[serde(default)]
    pub gas_used: Option<HexOrDecimal>,
    #[serde(default)]
    pub effective_gas_price: Option<HexOrDecimal>,
    #[serde(default)]
    pub builder_reward: Option<HexOrDecimal>,
    #[serde(default)]
    pub priority_fee: Option<HexOrDecimal>,
    #[serde(default)]
    pub slippage_protection: Option<HexOrDecimal>,
    #[serde(default)]
    pub state_diff: HashMap<Address, AccountDiff>,
}

impl TraceResult {
    /// Sums the backrun-value components this trace contributes, normalising each field
    /// to a `U256` first. Fields absent in a trace contribute zero (section 4.5, step 5).
    /// Whether `priority_fee` double-counts against the `gas_used * effective_gas_price`
    /// product is left unresolved; both are summed additively here.
    pub fn component_sum(&self) -> Result<U256, ParseNumericError> {
        let gas_used = normalise_opt(&self.gas_used)?;
        let effective_gas_price = normalise_opt(&self.effective_gas_price)?;
        let builder_reward = normalise_opt(&self.builder_reward)?;
        let priority_fee = normalise_opt(&self.priority_fee)?;
        let slippage_protection = normalise_opt(&self.slippage_protection)?;

        let mut total = U256::zero();
        if let (Some(gas_used), Some(price)) = (gas_used, effective_gas_price) {
            total = total.saturating_add(gas_used.saturating_mul(price));
        }
        if let Some(reward) = builder_reward {
            total = total.saturating_add(reward);
        }
        if let Some(fee) = priority_fee {
            total = total.saturating_add(fee);
        }
        if let Some(slippage) = slippage_protection {
            total = total.saturating_add(slippage);
        }
        Ok(total)
    }
}

fn normalise_opt(field: &Option<HexOrDecimal>) -> Result<Option<U256>, ParseNumericError> {
    field.as_ref().map(HexOrDecimal::normalise).transpose()
}

/// A trace result zipped with the metadata of the transaction that produced it, and
/// enriched with the block it was actually mined in when known (section 4.5, step 4).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedTrace {
    pub tx_hash: H256,
    pub bundle_id: String,
    pub mined_block_number: u64,
    pub is_backrun: bool,
    pub trace: TraceResult,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hex(value: u64) -> HexOrDecimal {
        HexOrDecimal::Decimal(value)
    }

    #[test]
    fn component_sum_is_zero_for_empty_trace() {
        assert_eq!(TraceResult::default().component_sum().unwrap(), U256::zero());
    }

    #[test]
    fn component_sum_adds_all_present_fields() {
        let trace = TraceResult {
            gas_used: Some(hex(21_000)),
            effective_gas_price: Some(hex(10)),
            builder_reward: Some(hex(5)),
            priority_fee: Some(hex(3)),
            slippage_protection: Some(hex(2)),
            state_diff: HashMap::new(),
        };
        // 21000*10 + 5 + 3 + 2 = 210_010
        assert_eq!(trace.component_sum().unwrap(), U256::from(210_010u64));
    }

    #[test]
    fn component_sum_skips_missing_gas_price_pair() {
        let trace = TraceResult {
            gas_used: Some(hex(21_000)),
            effective_gas_price: None,
            builder_reward: Some(hex(5)),
            ..Default::default()
        };
        assert_eq!(trace.component_sum().unwrap(), U256::from(5));
    }

    #[test]
    fn component_sum_accepts_decimal_json_numbers_alongside_hex_strings() {
        let trace = TraceResult {
            gas_used: Some(HexOrDecimal::Decimal(21_000)),
            effective_gas_price: Some(HexOrDecimal::Hex("0xa".to_string())),
            ..Default::default()
        };
        assert_eq!(trace.component_sum().unwrap(), U256::from(210_000u64));
    }

    #[test]
    fn component_sum_rejects_unparseable_field() {
        let trace = TraceResult {
            builder_reward: Some(HexOrDecimal::Hex("not-a-number".to_string())),
            ..Default::default()
        };
        assert!(trace.component_sum().is_err());
    }
}
