//! # Chat Gateway Dispatch Core Library
//!
//! This library provides the multi-provider message dispatch core of the
//! chat gateway service: durable message transactions, a bounded worker
//! pool, priority-ordered provider selection with fallback, recovery
//! scanning, retry planning, and webhook notifications.

pub mod adapters;
pub mod config;
pub mod db;
pub mod dispatch;
pub mod error;
pub mod logging;
pub mod models;
pub mod repositories;
pub use migration;
