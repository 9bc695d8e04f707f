use std::fmt;

use rust_decimal::prelude::*;

use crate::accounts::Account;
use crate::transactions::{date_format, Transaction, TransactionKind};

/// Money with two decimal places: `1.5` renders as `$1.50`.
pub struct Money(pub Decimal);

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${:.2}", self.0)
    }
}

/// One history line: date, type, amount and counterparty.
pub struct Line<'a>(pub &'a Transaction);

impl fmt::Display for Line<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Line(transaction) = self;
        write!(
            f,
            "{}  {:<10}  {:>12}",
            transaction.date.format(date_format::FORMAT),
            transaction.kind.record_type().to_string(),
            Money(transaction.amount).to_string(),
        )?;
        match &transaction.kind {
            TransactionKind::TransferOut { to } => write!(f, "  to {}", to),
            TransactionKind::TransferIn { from } => write!(f, "  from {}", from),
            TransactionKind::Deposit | TransactionKind::Withdrawal => Ok(()),
        }
    }
}

/// Statement renders an account's full transaction history, oldest first.
pub struct Statement<'a>(pub &'a Account);

impl fmt::Display for Statement<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Statement(account) = self;
        writeln!(f, "Transaction history for {}", account.username())?;
        if account.history().is_empty() {
            writeln!(f, "No transactions yet.")?;
        }
        for transaction in account.history() {
            writeln!(f, "{}", Line(transaction))?;
        }
        write!(f, "Current balance: {}", Money(account.balance()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use chrono::{NaiveDate, NaiveDateTime};

    fn date() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 19)
            .unwrap()
            .and_hms_opt(14, 5, 0)
            .unwrap()
    }

    #[test]
    fn test_money() {
        assert_eq!(Money(Decimal::from(80)).to_string(), "$80.00");
        assert_eq!(Money(Decimal::new(125, 1)).to_string(), "$12.50");
    }

    #[test]
    fn test_lines() {
        let deposit = Transaction::new(TransactionKind::Deposit, Decimal::from(50), date());
        assert_eq!(
            Line(&deposit).to_string(),
            "2026-10-19 14:05:00  deposit           $50.00"
        );
        let out = Transaction::new(
            TransactionKind::TransferOut {
                to: "bob".to_string(),
            },
            Decimal::from(70),
            date(),
        );
        assert!(Line(&out).to_string().ends_with("$70.00  to bob"));
        let incoming = Transaction::new(
            TransactionKind::TransferIn {
                from: "alice".to_string(),
            },
            Decimal::from(70),
            date(),
        );
        assert!(Line(&incoming).to_string().ends_with("  from alice"));
    }

    #[test]
    fn test_statement_in_insertion_order() -> Result<()> {
        let mut acc = Account::new("alice", "pw", "1234");
        let mut bob = Account::new("bob", "pw", "0000");
        acc.deposit(Decimal::from(100), date())?;
        acc.withdraw(Decimal::from(10), date())?;
        acc.transfer(Decimal::from(20), &mut bob, date())?;

        let rendered = Statement(&acc).to_string();
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0], "Transaction history for alice");
        assert!(lines[1].contains("deposit"));
        assert!(lines[2].contains("withdrawal"));
        assert!(lines[3].contains("transfer") && lines[3].ends_with("to bob"));
        assert_eq!(lines[4], "Current balance: $70.00");
        Ok(())
    }

    #[test]
    fn test_empty_statement() {
        let acc = Account::new("alice", "pw", "1234");
        let rendered = Statement(&acc).to_string();
        assert!(rendered.contains("No transactions yet."));
        assert!(rendered.ends_with("Current balance: $0.00"));
    }
}
