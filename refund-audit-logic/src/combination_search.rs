//! Optimal-combination search over candidate bundles (section 4.6): enumerates every
//! non-empty subset, simulates the concatenation, and tracks the argmax over refund.
//! Subsets are generated lazily by a bitmask iterator (popcount ascending, then numeric
//! bitmask ascending within a popcount) — 2^N subsets are never materialised in memory.

use crate::error::AuditorError;
use crate::rpc_client::RpcClient;
use crate::simulator::trace_and_enrich;
use crate::types::{Bundle, Transaction};
use ethers_core::types::U256;
use std::collections::HashMap;

/// The winning subset of a combination search: the member bundle ids (in the order they
/// were concatenated) and the refund that concatenation produced.
#[derive(Debug, Clone)]
pub struct BestCombination {
    pub bundle_ids: Vec<String>,
    pub refund: U256,
}

/// Streams every non-empty subset of `0..n` as a bitmask, ordered by popcount ascending
/// and then numeric value ascending within a popcount (section 4.6). Generated lazily via
/// Gosper's "next combination" trick; the full `2^n` subset list is never materialised.
struct SubsetMasks {
    n: u32,
    size: u32,
    current: u32,
}

impl SubsetMasks {
    fn new(n: u32) -> Self {
        Self {
            n,
            size: 1,
            current: if n >= 1 { 1 } else { 0 },
        }
    }
}

impl Iterator for SubsetMasks {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        loop {
            if self.size > self.n {
                return None;
            }
            if self.current >= (1u32 << self.n) {
                self.size += 1;
                if self.size > self.n {
                    return None;
                }
                self.current = (1u32 << self.size) - 1;
                continue;
            }
            let result = self.current;
            let c = self.current & self.current.wrapping_neg();
            let r = self.current + c;
            self.current = (((r ^ self.current) >> 2) / c) | r;
            return Some(result);
        }
    }
}

/// Runs the search for one block's candidate bundle set. `max_cardinality` is the
/// configured `combination_search.max_combination_cardinality` cap (section 4.6); `N`
/// exceeding it is a refusal, not a truncation.
///
/// `known_refunds` carries the refund already computed this round for a bundle that
/// was both individually simulated and confirmed `simulated` in the store — the search
/// reuses that value for the matching singleton subset instead of re-tracing it, but
/// every subset, singleton or not, is still weighed in the argmax: the optimum can live
/// in a multi-bundle subset even when every one of its members was individually
/// simulated, since a trace of the concatenation is not the sum of the individual
/// traces.
pub async fn search(
    rpc: &RpcClient,
    block_number: u64,
    bundles: &[Bundle],
    known_refunds: &HashMap<String, U256>,
    max_cardinality: u32,
) -> Result<Option<BestCombination>, AuditorError> {
    let n = bundles.len();
    if n == 0 {
        return Ok(None);
    }
    if n as u32 > max_cardinality {
        return Err(AuditorError::Malformed(format!(
            "combination search refused: {n} candidate bundles exceeds max_combination_cardinality {max_cardinality}"
        )));
    }

    let mut best: Option<BestCombination> = None;

    for mask in SubsetMasks::new(n as u32) {
        let members: Vec<&Bundle> = (0..n)
            .filter(|i| mask & (1 << i) != 0)
            .map(|i| &bundles[i])
            .collect();

        let refund = if let [member] = members[..] {
            match known_refunds.get(&member.bundle_id) {
                Some(refund) => *refund,
                None => {
                    trace_and_enrich(rpc, &member.bundle_id, &member.transactions, block_number, false)
                        .await?
                        .refund
                }
            }
        } else {
            let concatenated: Vec<Transaction> = members
                .iter()
                .flat_map(|b| b.transactions.iter().cloned())
                .collect();
            let synthetic_bundle_id = members
                .iter()
                .map(|b| b.bundle_id.as_str())
                .collect::<Vec<_>>()
                .join("+");
            trace_and_enrich(rpc, &synthetic_bundle_id, &concatenated, block_number, false)
                .await?
                .refund
        };

        let is_better = match &best {
            Some(current) => refund > current.refund,
            None => true,
        };
        if is_better {
            best = Some(BestCombination {
                bundle_ids: members.iter().map(|b| b.bundle_id.clone()).collect(),
                refund,
            });
        }
    }

    Ok(best)
}
