use ethers_core::types::{Address, Bytes, U256};
use serde::Serialize;

/// The `trace_callMany` call object. Every field the node accepts is carried; absent
/// fields are omitted from the serialized request, not defaulted (section 4.1).
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallObject {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas: Option<U256>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<U256>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_fee_per_gas: Option<U256>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_priority_fee_per_gas: Option<U256>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<U256>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Bytes>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<U256>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_list: Option<serde_json::Value>,
}

impl From<&crate::types::Transaction> for CallObject {
    fn from(tx: &crate::types::Transaction) -> Self {
        use crate::types::GasPricing;
        let mut call = CallObject {
            from: Some(tx.from),
            to: tx.to,
            gas: Some(tx.gas_limit),
            value: Some(tx.value),
            data: tx.data.clone(),
            nonce: Some(tx.nonce),
            chain_id: Some(tx.chain_id),
            access_list: tx.access_list.clone(),
            ..Default::default()
        };
        match &tx.gas_pricing {
            GasPricing::Legacy { gas_price } => call.gas_price = Some(*gas_price),
            GasPricing::Eip1559 {
                max_fee_per_gas,
                max_priority_fee_per_gas,
            } => {
                call.max_fee_per_gas = Some(*max_fee_per_gas);
                call.max_priority_fee_per_gas = Some(*max_priority_fee_per_gas);
            }
        }
        call
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TraceType {
    Trace,
    StateDiff,
    VmTrace,
}
