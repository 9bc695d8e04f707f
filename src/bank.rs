use anyhow::Result;
use rust_decimal::prelude::*;
use thiserror::Error;
use tracing::{debug, info};

use crate::accounts::{is_valid_pin, Account, AccountError};
use crate::payees;
use crate::storage::{Accounts, AccountsRepo};
use crate::transactions::timestamp;

#[derive(Error, Debug)]
pub enum BankError {
    #[error("Invalid username or password.")]
    InvalidCredentials,
    #[error("Username already exists.")]
    DuplicateUsername,
    #[error("Username cannot be empty or a reserved word.")]
    InvalidUsername,
    #[error("Invalid recipient: {0}.")]
    InvalidRecipient(String),
    #[error("Invalid PIN.")]
    InvalidPin,
    #[error("No account named '{0}'.")]
    UnknownAccount(String),
    #[error(transparent)]
    Account(#[from] AccountError),
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// Bank owns every loaded account and writes the whole set back through its
/// repository after each change. A change whose save fails is undone, so the
/// accounts in memory always match the last successful save.
pub struct Bank<'a> {
    repo: &'a dyn AccountsRepo,
    accounts: Accounts,
}

impl<'a> Bank<'a> {
    pub fn open(repo: &'a dyn AccountsRepo) -> Result<Bank<'a>> {
        let bank = Bank {
            repo,
            accounts: repo.load()?,
        };
        info!(
            accounts = bank.accounts.len(),
            total = %bank.total_balance(),
            "Opened bank"
        );
        Ok(bank)
    }

    pub fn account(&self, username: &str) -> Option<&Account> {
        self.accounts.get(username)
    }

    pub fn exists(&self, username: &str) -> bool {
        self.accounts.contains_key(username)
    }

    pub fn total_balance(&self) -> Decimal {
        self.accounts.values().map(Account::balance).sum()
    }

    pub fn signup(&mut self, username: &str, password: &str, pin: &str) -> Result<(), BankError> {
        if self.exists(username) {
            return Err(BankError::DuplicateUsername);
        }
        if username.trim().is_empty() || is_back_sentinel(username) {
            return Err(BankError::InvalidUsername);
        }
        if !is_valid_pin(pin) {
            return Err(BankError::InvalidPin);
        }
        self.accounts.insert(
            username.to_string(),
            Account::new(username, password, pin),
        );
        if let Err(e) = self.persist() {
            self.accounts.remove(username);
            return Err(e);
        }
        info!(username, "Created account");
        Ok(())
    }

    pub fn login(&self, username: &str, password: &str) -> Result<&Account, BankError> {
        match self.accounts.get(username) {
            Some(acc) if acc.check_password(password) => {
                info!(username, "Logged in");
                Ok(acc)
            }
            _ => {
                info!(username, "Failed login attempt");
                Err(BankError::InvalidCredentials)
            }
        }
    }

    pub fn verify_pin(&self, username: &str, pin: &str) -> Result<(), BankError> {
        let acc = self.get(username)?;
        if is_valid_pin(pin) && acc.check_pin(pin) {
            Ok(())
        } else {
            debug!(username, "PIN rejected");
            Err(BankError::InvalidPin)
        }
    }

    /// deposit returns the new balance
    pub fn deposit(&mut self, username: &str, amount: Decimal) -> Result<Decimal, BankError> {
        let acc = self.get_mut(username)?;
        let before = acc.clone();
        acc.deposit(amount, timestamp())?;
        let balance = acc.balance();
        self.commit(vec![before])?;
        debug!(username, %amount, %balance, "Deposited");
        Ok(balance)
    }

    /// withdraw returns the new balance
    pub fn withdraw(&mut self, username: &str, amount: Decimal) -> Result<Decimal, BankError> {
        let acc = self.get_mut(username)?;
        let before = acc.clone();
        acc.withdraw(amount, timestamp())?;
        let balance = acc.balance();
        self.commit(vec![before])?;
        debug!(username, %amount, %balance, "Withdrew");
        Ok(balance)
    }

    pub fn check_recipient(&self, sender: &str, recipient: &str) -> Result<(), BankError> {
        if recipient == sender {
            return Err(BankError::InvalidRecipient(
                "cannot transfer money to yourself".to_string(),
            ));
        }
        if !self.exists(recipient) {
            return Err(BankError::InvalidRecipient(format!(
                "no account named '{}'",
                recipient
            )));
        }
        Ok(())
    }

    /// transfer returns the sender's new balance
    pub fn transfer(
        &mut self,
        sender: &str,
        recipient: &str,
        amount: Decimal,
    ) -> Result<Decimal, BankError> {
        self.check_recipient(sender, recipient)?;
        let before = vec![self.get(sender)?.clone(), self.get(recipient)?.clone()];
        // Take the sender out of the map so both accounts can be borrowed mutably.
        let mut from = self
            .accounts
            .remove(sender)
            .ok_or_else(|| BankError::UnknownAccount(sender.to_string()))?;
        let result = match self.accounts.get_mut(recipient) {
            Some(to) => from
                .transfer(amount, to, timestamp())
                .map_err(BankError::from),
            None => Err(BankError::InvalidRecipient(format!(
                "no account named '{}'",
                recipient
            ))),
        };
        let balance = from.balance();
        self.accounts.insert(sender.to_string(), from);
        result?;
        self.commit(before)?;
        debug!(sender, recipient, %amount, %balance, "Transferred");
        Ok(balance)
    }

    pub fn top_payees(&self, username: &str, limit: usize) -> Vec<String> {
        self.accounts
            .get(username)
            .map(|acc| payees::top_payees(acc, limit))
            .unwrap_or_default()
    }

    fn get(&self, username: &str) -> Result<&Account, BankError> {
        self.accounts
            .get(username)
            .ok_or_else(|| BankError::UnknownAccount(username.to_string()))
    }

    fn get_mut(&mut self, username: &str) -> Result<&mut Account, BankError> {
        self.accounts
            .get_mut(username)
            .ok_or_else(|| BankError::UnknownAccount(username.to_string()))
    }

    /// commit saves the current accounts, putting `before` back in place if
    /// the save fails.
    fn commit(&mut self, before: Vec<Account>) -> Result<(), BankError> {
        let result = self.persist();
        if result.is_err() {
            for acc in before {
                self.accounts.insert(acc.username().to_string(), acc);
            }
        }
        result
    }

    fn persist(&self) -> Result<(), BankError> {
        self.repo.save(&self.accounts).map_err(|e| {
            info!(error = %e, "Unable to save accounts");
            BankError::Storage(e)
        })
    }
}

/// `b` or `back`, in any case, cancels a multi-step action.
pub fn is_back_sentinel(input: &str) -> bool {
    let input = input.trim();
    input.eq_ignore_ascii_case("b") || input.eq_ignore_ascii_case("back")
}
