use std::io::{self, BufRead, Write};

use anyhow::Result;
use rust_decimal::prelude::*;
use thiserror::Error;
use tracing::debug;

use crate::bank::{is_back_sentinel, Bank, BankError};
use crate::payees::DEFAULT_LIMIT;
use crate::statement::{Money, Statement};

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("'{0}' is not a valid number.")]
    ParseFailure(String),
    #[error("input closed")]
    InputClosed,
    #[error(transparent)]
    Bank(#[from] BankError),
    #[error(transparent)]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub enum State {
    MainMenu,
    LoggingIn,
    SigningUp,
    LoggedIn(String),
    LoggedOut,
}

/// Session is the interactive menu loop. Each pass renders the screen with
/// the status left by the previous action, then runs one menu choice.
pub struct Session<'a, 'r, R, W> {
    bank: &'a mut Bank<'r>,
    input: R,
    output: W,
    state: State,
    status: Option<String>,
}

impl<'a, 'r, R: BufRead, W: Write> Session<'a, 'r, R, W> {
    pub fn new(bank: &'a mut Bank<'r>, input: R, output: W) -> Session<'a, 'r, R, W> {
        Session {
            bank,
            input,
            output,
            state: State::MainMenu,
            status: None,
        }
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    /// run loops until the input is exhausted. Action failures end up in the
    /// status line; only I/O errors on the terminal itself are returned.
    pub fn run(&mut self) -> Result<()> {
        loop {
            match self.step() {
                Ok(()) => {}
                Err(SessionError::InputClosed) => {
                    writeln!(self.output, "\nGoodbye!")?;
                    self.output.flush()?;
                    return Ok(());
                }
                Err(SessionError::Io(e)) => return Err(e.into()),
                Err(e) => {
                    debug!(error = %e, state = ?self.state, "Action failed");
                    self.status = Some(e.to_string());
                }
            }
        }
    }

    fn step(&mut self) -> Result<(), SessionError> {
        match self.state.clone() {
            State::MainMenu => self.main_menu(),
            State::LoggingIn => self.login(),
            State::SigningUp => self.signup(),
            State::LoggedIn(username) => self.account_menu(&username),
            State::LoggedOut => {
                self.status = Some("You have been logged out.".to_string());
                self.state = State::MainMenu;
                Ok(())
            }
        }
    }

    fn render(&mut self) -> Result<(), SessionError> {
        writeln!(self.output)?;
        writeln!(self.output, "=== Welcome to the Bank of Bankers! ===")?;
        if let Some(status) = self.status.take() {
            writeln!(self.output, "{}", status)?;
        }
        writeln!(self.output)?;
        Ok(())
    }

    fn main_menu(&mut self) -> Result<(), SessionError> {
        self.render()?;
        writeln!(self.output, "1 - Login")?;
        writeln!(self.output, "2 - Sign Up")?;
        match self.read_line("Choose an option")?.trim() {
            "1" => self.state = State::LoggingIn,
            "2" => self.state = State::SigningUp,
            _ => self.status = Some("Invalid choice.".to_string()),
        }
        Ok(())
    }

    fn login(&mut self) -> Result<(), SessionError> {
        // Any failure below lands back on the main menu.
        self.state = State::MainMenu;
        writeln!(self.output, "\nLogin (enter 'b' to go back)")?;
        let Some(username) = self.ask("Username")? else {
            return self.cancel();
        };
        let Some(password) = self.ask_secret("Password")? else {
            return self.cancel();
        };
        let username = self.bank.login(&username, &password)?.username().to_string();
        self.status = Some(format!("Welcome back, {}!", username));
        self.state = State::LoggedIn(username);
        Ok(())
    }

    fn signup(&mut self) -> Result<(), SessionError> {
        self.state = State::MainMenu;
        writeln!(self.output, "\nSign up (enter 'b' to go back)")?;
        let Some(username) = self.ask("Choose a username")? else {
            return self.cancel();
        };
        if self.bank.exists(&username) {
            return Err(BankError::DuplicateUsername.into());
        }
        let Some(password) = self.ask_secret("Choose a password")? else {
            return self.cancel();
        };
        let Some(pin) = self.ask("Choose a 4-digit PIN")? else {
            return self.cancel();
        };
        self.bank.signup(&username, &password, &pin)?;
        self.status = Some(format!("Account created for {}!", username));
        Ok(())
    }

    fn account_menu(&mut self, username: &str) -> Result<(), SessionError> {
        self.render()?;
        writeln!(self.output, "Logged in as {}", username)?;
        writeln!(self.output, "1 - Check balance")?;
        writeln!(self.output, "2 - Deposit")?;
        writeln!(self.output, "3 - Withdraw")?;
        writeln!(self.output, "4 - Transfer")?;
        writeln!(self.output, "5 - Transaction history")?;
        writeln!(self.output, "6 - Logout")?;
        match self.read_line("Choose an option")?.trim() {
            "1" => {
                let balance = self
                    .bank
                    .account(username)
                    .map(|acc| acc.balance())
                    .unwrap_or_default();
                self.status = Some(format!("Your balance is {}", Money(balance)));
                Ok(())
            }
            "2" => self.deposit(username),
            "3" => self.withdraw(username),
            "4" => self.transfer(username),
            "5" => self.history(username),
            "6" => {
                self.state = State::LoggedOut;
                Ok(())
            }
            _ => {
                self.status = Some("Invalid choice.".to_string());
                Ok(())
            }
        }
    }

    fn deposit(&mut self, username: &str) -> Result<(), SessionError> {
        if !self.confirm_pin(username)? {
            return self.cancel();
        }
        let Some(amount) = self.ask_amount("Amount to deposit")? else {
            return self.cancel();
        };
        let balance = self.bank.deposit(username, amount)?;
        self.status = Some(format!(
            "Deposited {}. New balance: {}",
            Money(amount),
            Money(balance)
        ));
        Ok(())
    }

    fn withdraw(&mut self, username: &str) -> Result<(), SessionError> {
        if !self.confirm_pin(username)? {
            return self.cancel();
        }
        let Some(amount) = self.ask_amount("Amount to withdraw")? else {
            return self.cancel();
        };
        let balance = self.bank.withdraw(username, amount)?;
        self.status = Some(format!(
            "Withdrew {}. New balance: {}",
            Money(amount),
            Money(balance)
        ));
        Ok(())
    }

    fn transfer(&mut self, username: &str) -> Result<(), SessionError> {
        if !self.confirm_pin(username)? {
            return self.cancel();
        }
        let payees = self.bank.top_payees(username, DEFAULT_LIMIT);
        if !payees.is_empty() {
            writeln!(self.output, "Frequent payees:")?;
            for (i, payee) in payees.iter().enumerate() {
                writeln!(self.output, "  {} - {}", i + 1, payee)?;
            }
        }
        let Some(input) = self.ask("Recipient (number or username)")? else {
            return self.cancel();
        };
        let recipient = match input.parse::<usize>() {
            Ok(n) if (1..=payees.len()).contains(&n) => payees[n - 1].clone(),
            _ => input,
        };
        self.bank.check_recipient(username, &recipient)?;
        let Some(amount) = self.ask_amount(&format!("Amount to send to {}", recipient))? else {
            return self.cancel();
        };
        let balance = self.bank.transfer(username, &recipient, amount)?;
        self.status = Some(format!(
            "Sent {} to {}. New balance: {}",
            Money(amount),
            recipient,
            Money(balance)
        ));
        Ok(())
    }

    fn history(&mut self, username: &str) -> Result<(), SessionError> {
        if let Some(acc) = self.bank.account(username) {
            writeln!(self.output)?;
            writeln!(self.output, "{}", Statement(acc))?;
        }
        self.read_line("Press Enter to continue")?;
        Ok(())
    }

    /// confirm_pin is false when the user backs out and an error when the
    /// PIN is wrong or malformed.
    fn confirm_pin(&mut self, username: &str) -> Result<bool, SessionError> {
        match self.ask("Enter your 4-digit PIN")? {
            Some(pin) => {
                self.bank.verify_pin(username, &pin)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn cancel(&mut self) -> Result<(), SessionError> {
        self.status = Some("Cancelled.".to_string());
        Ok(())
    }

    fn ask_amount(&mut self, label: &str) -> Result<Option<Decimal>, SessionError> {
        match self.ask(label)? {
            Some(raw) => raw
                .parse::<Decimal>()
                .map(Some)
                .map_err(|_| SessionError::ParseFailure(raw)),
            None => Ok(None),
        }
    }

    /// ask reads one trimmed answer, or `None` for the back-out sentinel.
    fn ask(&mut self, label: &str) -> Result<Option<String>, SessionError> {
        let line = self.read_line(label)?;
        if is_back_sentinel(&line) {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    /// Like `ask`, but keeps surrounding whitespace, which is significant in
    /// passwords.
    fn ask_secret(&mut self, label: &str) -> Result<Option<String>, SessionError> {
        let line = self.read_line(label)?;
        if is_back_sentinel(&line) {
            return Ok(None);
        }
        Ok(Some(line))
    }

    fn read_line(&mut self, label: &str) -> Result<String, SessionError> {
        write!(self.output, "{}: ", label)?;
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(SessionError::InputClosed);
        }
        Ok(line.trim_end_matches(&['\r', '\n'][..]).to_string())
    }
}
