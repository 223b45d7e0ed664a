//! # Repositories
//!
//! One repository per table, encapsulating the SeaORM operations the
//! dispatch core performs against the transaction store and the provider
//! registry.

pub mod message_transaction;
pub mod message_transaction_history;
pub mod provider;
pub mod user;
pub mod user_provider;

pub use message_transaction::{MessageTransactionRepository, NewTransaction, TransactionUpdate};
pub use message_transaction_history::MessageTransactionHistoryRepository;
pub use provider::ProviderRepository;
pub use user::UserRepository;
pub use user_provider::UserProviderRepository;
