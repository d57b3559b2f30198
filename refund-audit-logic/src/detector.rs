//! Violation detection (section 4.7): compares the optimal combination search result
//! against what was actually captured and emits the alert payload when they diverge.

use ethers_core::types::U256;
use serde::Serialize;

/// Built from the combination search's winner and the bundle(s) actually simulated
/// (section 4.7). A violation is detected iff `highest_refund > actual_refund`.
#[derive(Debug, Clone, Serialize)]
pub struct ViolationReport {
    pub block_number: u64,
    pub highest_refund: U256,
    pub actual_refund: U256,
    pub delta: U256,
    /// `optimal \ actual` by bundle identifier — the bundles the service could have
    /// included but did not (section 4.7, "missed opportunities").
    pub missed_opportunities: Vec<String>,
}

/// Returns `None` when no violation occurred (`highest_refund <= actual_refund`).
pub fn detect(
    block_number: u64,
    optimal_combination: &[String],
    actual_combination: &[String],
    highest_refund: U256,
    actual_refund: U256,
) -> Option<ViolationReport> {
    if highest_refund <= actual_refund {
        return None;
    }

    let missed_opportunities = optimal_combination
        .iter()
        .filter(|id| !actual_combination.contains(id))
        .cloned()
        .collect();

    Some(ViolationReport {
        block_number,
        highest_refund,
        actual_refund,
        delta: highest_refund - actual_refund,
        missed_opportunities,
    })
}
