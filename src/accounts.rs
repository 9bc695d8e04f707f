use chrono::NaiveDateTime;
use rust_decimal::prelude::*;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::transactions::{Transaction, TransactionKind};

#[derive(Error, Debug, PartialEq)]
pub enum AccountError {
    #[error("Amount must be greater than zero.")]
    InvalidAmount,
    #[error("Insufficient balance.")]
    InsufficientBalance,
    #[error("Cannot transfer money to yourself.")]
    SelfTransfer,
    #[error("Amounts can have at most 2 decimal places.")]
    TooManyDecimals,
    #[error("Balances cannot exceed $1000000000000.00.")]
    AmountTooLarge,
}

/// Largest balance an account may hold. Balances and amounts are stored as
/// JSON floats, and every 2-decimal value up to this bound reads back
/// exactly.
pub const MAX_BALANCE: Decimal = Decimal::from_parts(0xD4A5_1000, 0xE8, 0, false, 0);

/// A single user's ledger: credentials, balance and transaction history.
///
/// The username is the key of the accounts file, so it is not serialized
/// with the rest of the record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    #[serde(skip)]
    username: String,
    password: String,
    #[serde(deserialize_with = "deserialize_pin")]
    pin: String,
    #[serde(
        serialize_with = "rust_decimal::serde::float::serialize",
        deserialize_with = "deserialize_balance"
    )]
    balance: Decimal,
    transaction_history: Vec<Transaction>,
}

pub fn is_valid_pin(pin: &str) -> bool {
    pin.len() == 4 && pin.bytes().all(|b| b.is_ascii_digit())
}

fn deserialize_pin<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let pin = String::deserialize(deserializer)?;
    if !is_valid_pin(&pin) {
        return Err(serde::de::Error::custom("pin must be a string of 4 digits"));
    }
    Ok(pin)
}

fn deserialize_balance<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    let balance = rust_decimal::serde::float::deserialize(deserializer)?;
    if balance < Decimal::ZERO {
        return Err(serde::de::Error::custom("balance cannot be negative"));
    }
    if balance > MAX_BALANCE {
        return Err(serde::de::Error::custom("balance exceeds the account limit"));
    }
    Ok(balance)
}

/// Amounts must be positive, at most the account limit, and whole cents.
fn check_amount(amount: Decimal) -> Result<(), AccountError> {
    if amount <= Decimal::ZERO {
        return Err(AccountError::InvalidAmount);
    }
    if amount > MAX_BALANCE {
        return Err(AccountError::AmountTooLarge);
    }
    if amount.normalize().scale() > 2 {
        return Err(AccountError::TooManyDecimals);
    }
    Ok(())
}

impl Account {
    /// new opens an empty account, as done at signup
    pub fn new(username: &str, password: &str, pin: &str) -> Account {
        Account {
            username: username.to_string(),
            password: password.to_string(),
            pin: pin.to_string(),
            balance: Decimal::ZERO,
            transaction_history: Vec::new(),
        }
    }
    pub(crate) fn with_username(mut self, username: &str) -> Account {
        self.username = username.to_string();
        self
    }
    pub fn username(&self) -> &str {
        &self.username
    }
    pub fn balance(&self) -> Decimal {
        self.balance
    }
    pub fn history(&self) -> &[Transaction] {
        &self.transaction_history
    }
    // Plaintext comparisons; this is a demo, not a credential store.
    pub fn check_password(&self, password: &str) -> bool {
        self.password == password
    }
    pub fn check_pin(&self, pin: &str) -> bool {
        self.pin == pin
    }

    pub fn deposit(&mut self, amount: Decimal, at: NaiveDateTime) -> Result<(), AccountError> {
        check_amount(amount)?;
        self.balance = self.credited(amount)?;
        self.record(TransactionKind::Deposit, amount, at);
        Ok(())
    }

    pub fn withdraw(&mut self, amount: Decimal, at: NaiveDateTime) -> Result<(), AccountError> {
        self.debit(amount)?;
        self.record(TransactionKind::Withdrawal, amount, at);
        Ok(())
    }

    /// transfer moves `amount` into `recipient`, leaving a matching record
    /// on both sides with the same timestamp.
    pub fn transfer(
        &mut self,
        amount: Decimal,
        recipient: &mut Account,
        at: NaiveDateTime,
    ) -> Result<(), AccountError> {
        if recipient.username == self.username {
            return Err(AccountError::SelfTransfer);
        }
        check_amount(amount)?;
        let credited = recipient.credited(amount)?;
        self.debit(amount)?;
        recipient.balance = credited;
        self.record(
            TransactionKind::TransferOut {
                to: recipient.username.clone(),
            },
            amount,
            at,
        );
        recipient.record(
            TransactionKind::TransferIn {
                from: self.username.clone(),
            },
            amount,
            at,
        );
        Ok(())
    }

    /// The balance after receiving `amount`, if it stays within the limit.
    fn credited(&self, amount: Decimal) -> Result<Decimal, AccountError> {
        self.balance
            .checked_add(amount)
            .filter(|balance| *balance <= MAX_BALANCE)
            .ok_or(AccountError::AmountTooLarge)
    }

    fn debit(&mut self, amount: Decimal) -> Result<(), AccountError> {
        check_amount(amount)?;
        if amount > self.balance {
            return Err(AccountError::InsufficientBalance);
        }
        self.balance -= amount;
        Ok(())
    }

    fn record(&mut self, kind: TransactionKind, amount: Decimal, at: NaiveDateTime) {
        self.transaction_history
            .push(Transaction::new(kind, amount, at));
    }
}
