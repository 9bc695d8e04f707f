//! Bank of Bankers: a single-user banking demo over a JSON accounts file.
//!
//! [`bank::Bank`] holds every account and persists the whole set after each
//! change; [`session::Session`] is the interactive menu driving it.

pub mod accounts;
pub mod bank;
pub mod payees;
pub mod session;
pub mod statement;
pub mod storage;
pub mod transactions;
