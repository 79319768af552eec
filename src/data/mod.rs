//! Transaction data model and ingestion boundary

mod transaction;
pub mod loader;

pub use transaction::{CustomerId, Transaction, TransactionTable, GUEST_CUSTOMER_ID};
pub use loader::{LoadSummary, LoaderConfig, TransactionLoader};
