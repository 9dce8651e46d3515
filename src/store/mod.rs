pub mod catalog_store;
pub mod credential_store;
pub mod order_ledger;

pub use catalog_store::CatalogStore;
pub use credential_store::CredentialStore;
pub use order_ledger::OrderLedger;
