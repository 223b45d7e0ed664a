//! # Data Models
//!
//! SeaORM entity models for the dispatch core tables.

pub mod message_transaction;
pub mod message_transaction_history;
pub mod provider;
pub mod user;
pub mod user_provider;

pub use message_transaction::Entity as MessageTransaction;
pub use message_transaction_history::Entity as MessageTransactionHistory;
pub use provider::Entity as Provider;
pub use user::Entity as User;
pub use user_provider::Entity as UserProvider;

use std::fmt;
use std::str::FromStr;

/// Lifecycle status of a message transaction.
///
/// The string forms below are both the storage representation and the
/// webhook wire representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionStatus {
    Pending,
    Success,
    Failed,
    FallbackTriggered,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Success => "success",
            TransactionStatus::Failed => "failed",
            TransactionStatus::FallbackTriggered => "fallbackTriggered",
        }
    }

    /// A terminal transaction has been archived to history and will not be
    /// picked up by the worker pool again.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TransactionStatus::Pending)
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TransactionStatus::Pending),
            "success" => Ok(TransactionStatus::Success),
            "failed" => Ok(TransactionStatus::Failed),
            "fallbackTriggered" => Ok(TransactionStatus::FallbackTriggered),
            other => Err(format!("unknown transaction status '{other}'")),
        }
    }
}

/// Provider kind tags recognized by the dispatch core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    Signal,
    Email,
    Sms,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Signal => "signal",
            ProviderKind::Email => "email",
            ProviderKind::Sms => "sms",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "signal" => Some(ProviderKind::Signal),
            "email" => Some(ProviderKind::Email),
            "sms" => Some(ProviderKind::Sms),
            _ => None,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
