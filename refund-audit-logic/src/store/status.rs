use serde::{Deserialize, Serialize};

/// `processed_bundles.status` (section 3). Terminal states are sticky: a later
/// observation with a non-terminal status must not overwrite one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BundleStatus {
    Pending,
    Simulated,
    InsufficientBalance,
    Failed,
}

/// `processed_transactions.status` (section 3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Simulated,
    BackrunSimulated,
    InsufficientBalance,
    Failed,
}

impl BundleStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            BundleStatus::Simulated | BundleStatus::InsufficientBalance | BundleStatus::Failed
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BundleStatus::Pending => "pending",
            BundleStatus::Simulated => "simulated",
            BundleStatus::InsufficientBalance => "insufficient_balance",
            BundleStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "simulated" => Some(Self::Simulated),
            "insufficient_balance" => Some(Self::InsufficientBalance),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl TransactionStatus {
    /// `simulated` and `backrun_simulated` are the sticky terminal states (section 3 /
    /// 8): a restart skips any transaction hash already in one of these.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TransactionStatus::Simulated
                | TransactionStatus::BackrunSimulated
                | TransactionStatus::InsufficientBalance
                | TransactionStatus::Failed
        )
    }

    /// Whether a row currently at `self` may be overwritten by `new`. Terminal statuses
    /// are sticky (section 3) with one exception: the backrun sub-pass (section 4.5,
    /// step 7) re-simulates an already-`simulated` transaction and must be allowed to
    /// record the `backrun_simulated` outcome on the same row.
    pub fn accepts_transition(self, new: Self) -> bool {
        if !self.is_terminal() {
            return true;
        }
        self == TransactionStatus::Simulated && new == TransactionStatus::BackrunSimulated
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Simulated => "simulated",
            TransactionStatus::BackrunSimulated => "backrun_simulated",
            TransactionStatus::InsufficientBalance => "insufficient_balance",
            TransactionStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "simulated" => Some(Self::Simulated),
            "backrun_simulated" => Some(Self::BackrunSimulated),
            "insufficient_balance" => Some(Self::InsufficientBalance),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundle_status_round_trips_through_str() {
        for status in [
            BundleStatus::Pending,
            BundleStatus::Simulated,
            BundleStatus::InsufficientBalance,
            BundleStatus::Failed,
        ] {
            assert_eq!(BundleStatus::parse(status.as_str()), Some(status));
        }
    }

    #[test]
    fn only_simulated_and_backrun_simulated_are_terminal_for_transactions() {
        assert!(TransactionStatus::Simulated.is_terminal());
        assert!(TransactionStatus::BackrunSimulated.is_terminal());
        assert!(!TransactionStatus::Pending.is_terminal());
    }

    #[test]
    fn simulated_accepts_backrun_simulated_but_nothing_else() {
        assert!(TransactionStatus::Simulated.accepts_transition(TransactionStatus::BackrunSimulated));
        assert!(!TransactionStatus::Simulated.accepts_transition(TransactionStatus::Pending));
        assert!(!TransactionStatus::Failed.accepts_transition(TransactionStatus::BackrunSimulated));
    }
}
