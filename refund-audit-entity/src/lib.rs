//! `SeaORM` entities for the auditor's persistence store.

pub mod block_data;
pub mod processed_bundles;
pub mod processed_transactions;

pub use block_data::Entity as BlockData;
pub use processed_bundles::Entity as ProcessedBundles;
pub use processed_transactions::Entity as ProcessedTransactions;
