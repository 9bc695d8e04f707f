use crate::accounts::Account;
use crate::transactions::TransactionKind;

pub const DEFAULT_LIMIT: usize = 3;

/// top_payees ranks the recipients of `account`'s outgoing transfers by how
/// often they were paid. Ties keep the order in which payees first appear.
pub fn top_payees(account: &Account, limit: usize) -> Vec<String> {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for transaction in account.history() {
        if let TransactionKind::TransferOut { to } = &transaction.kind {
            match counts.iter().position(|(payee, _)| *payee == to.as_str()) {
                Some(i) => counts[i].1 += 1,
                None => counts.push((to.as_str(), 1)),
            }
        }
    }
    // sort_by is stable, so first-seen order survives for equal counts
    counts.sort_by(|(_, a), (_, b)| b.cmp(a));
    counts
        .into_iter()
        .take(limit)
        .map(|(payee, _)| payee.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transactions::timestamp;
    use anyhow::Result;
    use proptest::prelude::*;
    use rust_decimal::prelude::*;

    fn send(from: &mut Account, to: &str) -> Result<()> {
        let mut recipient = Account::new(to, "pw", "0000");
        from.transfer(Decimal::from(1), &mut recipient, timestamp())?;
        Ok(())
    }

    fn sender() -> Result<Account> {
        let mut acc = Account::new("alice", "pw", "1234");
        acc.deposit(Decimal::from(1_000), timestamp())?;
        Ok(acc)
    }

    #[test]
    fn test_no_transfers() -> Result<()> {
        let acc = sender()?;
        assert!(top_payees(&acc, DEFAULT_LIMIT).is_empty());
        Ok(())
    }

    #[test]
    fn test_ranked_by_frequency() -> Result<()> {
        let mut acc = sender()?;
        for to in ["carol", "bob", "bob", "dave", "carol", "bob", "erin"] {
            send(&mut acc, to)?;
        }
        assert_eq!(top_payees(&acc, DEFAULT_LIMIT), vec!["bob", "carol", "dave"]);
        Ok(())
    }

    #[test]
    fn test_ties_keep_first_seen_order() -> Result<()> {
        let mut acc = sender()?;
        for to in ["dave", "bob", "carol", "bob", "dave", "carol"] {
            send(&mut acc, to)?;
        }
        assert_eq!(top_payees(&acc, 2), vec!["dave", "bob"]);
        Ok(())
    }

    #[test]
    fn test_incoming_transfers_are_ignored() -> Result<()> {
        let mut bob = Account::new("bob", "pw", "0000");
        bob.deposit(Decimal::from(10), timestamp())?;
        let mut acc = sender()?;
        bob.transfer(Decimal::from(5), &mut acc, timestamp())?;
        acc.withdraw(Decimal::from(1), timestamp())?;
        assert!(top_payees(&acc, DEFAULT_LIMIT).is_empty());
        Ok(())
    }

    proptest! {
        #[test]
        fn ranking_is_bounded_and_descending(
            picks in proptest::collection::vec(0usize..6, 0..40),
            limit in 0usize..5,
        ) {
            let names = ["a", "b", "c", "d", "e", "f"];
            let mut acc = sender().unwrap();
            for i in &picks {
                send(&mut acc, names[*i]).unwrap();
            }
            let ranked = top_payees(&acc, limit);
            prop_assert!(ranked.len() <= limit);
            let count = |name: &str| picks.iter().filter(|i| names[**i] == name).count();
            for pair in ranked.windows(2) {
                prop_assert!(count(pair[0].as_str()) >= count(pair[1].as_str()));
            }
        }
    }
}
