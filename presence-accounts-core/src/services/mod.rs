//! Account cache and lifecycle services

mod account_record;
mod account_storage;
mod identify;

pub use account_record::AccountRecord;
pub use account_storage::AccountStorage;
