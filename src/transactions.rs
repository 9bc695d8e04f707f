use std::convert::TryFrom;
use std::fmt;

use chrono::{Local, NaiveDateTime, SubsecRound};
use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::accounts::MAX_BALANCE;

#[derive(Error, Debug, PartialEq)]
pub enum TransactionError {
    #[error("transaction amount must be positive and within the account limit, got {0}")]
    AmountOutOfRange(Decimal),
    #[error("transfer records need exactly one of `to` or `from`")]
    InvalidCounterparty,
    #[error("{0} records cannot name a counterparty")]
    UnexpectedCounterparty(RecordType),
}

/// The `type` field of a persisted transaction record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RecordType {
    Deposit,
    Withdrawal,
    Transfer,
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RecordType::Deposit => "deposit",
            RecordType::Withdrawal => "withdrawal",
            RecordType::Transfer => "transfer",
        })
    }
}

/// Flat shape of a transaction as it appears in the accounts file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransactionRecord {
    #[serde(rename = "type")]
    pub kind: RecordType,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    #[serde(with = "date_format")]
    pub date: NaiveDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionKind {
    Deposit,
    Withdrawal,
    TransferOut { to: String },
    TransferIn { from: String },
}

impl TransactionKind {
    pub fn record_type(&self) -> RecordType {
        match self {
            TransactionKind::Deposit => RecordType::Deposit,
            TransactionKind::Withdrawal => RecordType::Withdrawal,
            TransactionKind::TransferOut { .. } | TransactionKind::TransferIn { .. } => {
                RecordType::Transfer
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TransactionRecord", into = "TransactionRecord")]
pub struct Transaction {
    pub kind: TransactionKind,
    pub amount: Decimal,
    pub date: NaiveDateTime,
}

impl Transaction {
    pub fn new(kind: TransactionKind, amount: Decimal, date: NaiveDateTime) -> Transaction {
        Transaction { kind, amount, date }
    }

    /// The other party of a transfer, if any.
    pub fn counterparty(&self) -> Option<&str> {
        match &self.kind {
            TransactionKind::TransferOut { to } => Some(to),
            TransactionKind::TransferIn { from } => Some(from),
            _ => None,
        }
    }
}

impl TryFrom<TransactionRecord> for Transaction {
    type Error = TransactionError;
    fn try_from(
        TransactionRecord {
            kind,
            amount,
            date,
            to,
            from,
        }: TransactionRecord,
    ) -> Result<Transaction, TransactionError> {
        if amount <= Decimal::ZERO || amount > MAX_BALANCE {
            return Err(TransactionError::AmountOutOfRange(amount));
        }
        let kind = match (kind, to, from) {
            (RecordType::Deposit, None, None) => TransactionKind::Deposit,
            (RecordType::Withdrawal, None, None) => TransactionKind::Withdrawal,
            (RecordType::Transfer, Some(to), None) => TransactionKind::TransferOut { to },
            (RecordType::Transfer, None, Some(from)) => TransactionKind::TransferIn { from },
            (RecordType::Transfer, _, _) => return Err(TransactionError::InvalidCounterparty),
            (other, _, _) => return Err(TransactionError::UnexpectedCounterparty(other)),
        };
        Ok(Transaction { kind, amount, date })
    }
}

impl From<Transaction> for TransactionRecord {
    fn from(Transaction { kind, amount, date }: Transaction) -> TransactionRecord {
        let record_type = kind.record_type();
        let (to, from) = match kind {
            TransactionKind::TransferOut { to } => (Some(to), None),
            TransactionKind::TransferIn { from } => (None, Some(from)),
            TransactionKind::Deposit | TransactionKind::Withdrawal => (None, None),
        };
        TransactionRecord {
            kind: record_type,
            amount,
            date,
            to,
            from,
        }
    }
}

/// Current local time truncated to whole seconds, the resolution kept on disk.
pub fn timestamp() -> NaiveDateTime {
    Local::now().naive_local().trunc_subsecs(0)
}

pub mod date_format {
    use chrono::NaiveDateTime;
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    pub fn serialize<S>(date: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&date.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&s, FORMAT).map_err(serde::de::Error::custom)
    }
}
