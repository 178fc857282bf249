//! Accounts domain module.
//!
//! Business rules for monetary accounts, implemented as deterministic domain
//! logic (no IO, no HTTP, no storage). Persistence and locking live in
//! `gateway-infra`.

pub mod account;

pub use account::{Account, AccountOutput, NewAccount, generate_api_key};
