//! Advisory pre-filter over candidate bundles (section 4.4): correctness of downstream
//! stages never depends on its choice, only their cost does.

use crate::types::Bundle;

/// Returns the first `min(k, bundles.len())` bundles after a stable descending sort by
/// declared refund. Ties keep the input order.
pub fn select(bundles: Vec<Bundle>, k: usize) -> Vec<Bundle> {
    let mut ranked = bundles;
    ranked.sort_by(|a, b| b.declared_refund.cmp(&a.declared_refund));
    ranked.truncate(k);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers_core::types::U256;

    fn bundle(id: &str, refund: u64) -> Bundle {
        Bundle {
            bundle_id: id.to_string(),
            target_block: 1,
            declared_refund: U256::from(refund),
            transactions: vec![],
        }
    }

    #[test]
    fn sorts_descending_by_declared_refund() {
        let bundles = vec![bundle("a", 1), bundle("b", 3), bundle("c", 2)];
        let selected = select(bundles, 3);
        let ids: Vec<_> = selected.iter().map(|b| b.bundle_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);
    }

    #[test]
    fn truncates_to_k() {
        let bundles = vec![bundle("a", 1), bundle("b", 3), bundle("c", 2)];
        let selected = select(bundles, 1);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].bundle_id, "b");
    }

    #[test]
    fn k_larger_than_input_returns_everything() {
        let bundles = vec![bundle("a", 1)];
        assert_eq!(select(bundles, 5).len(), 1);
    }

    #[test]
    fn ties_preserve_input_order() {
        let bundles = vec![bundle("first", 5), bundle("second", 5)];
        let selected = select(bundles, 2);
        let ids: Vec<_> = selected.iter().map(|b| b.bundle_id.as_str()).collect();
        assert_eq!(ids, vec!["first", "second"]);
    }
}
