pub mod block;
pub mod bundle;
pub mod numeric;
pub mod trace;
pub mod transaction;

pub use block::Block;
pub use bundle::Bundle;
pub use numeric::{ninety_percent, to_hex_prefixed, HexOrDecimal};
pub use trace::{AccountDiff, EnrichedTrace, TraceResult};
pub use transaction::{GasPricing, Transaction};
