//! Account store boundary.
//!
//! Point lookups plus one locked read-modify-write primitive. Every balance
//! change in the system goes through `AccountStore::update_balance_locked`.

pub mod in_memory;
pub mod postgres;
pub mod r#trait;

pub use in_memory::InMemoryAccountStore;
pub use postgres::PostgresAccountStore;
pub use r#trait::AccountStore;
