use std::fs;
use std::io::Cursor;

use anyhow::Result;
use bankers::bank::Bank;
use bankers::session::Session;
use bankers::storage::{AccountsRepo, JsonFileRepo};
use bankers::transactions::TransactionKind;
use rust_decimal::Decimal;
use tempfile::TempDir;

fn create_test_repo() -> Result<(JsonFileRepo, TempDir)> {
    let temp_dir = TempDir::new()?;
    let repo = JsonFileRepo::new(temp_dir.path().join("accounts.json"));
    Ok((repo, temp_dir))
}

fn run_session(repo: &JsonFileRepo, script: &str) -> Result<String> {
    let mut bank = Bank::open(repo)?;
    let mut output = Vec::new();
    Session::new(&mut bank, Cursor::new(script), &mut output).run()?;
    Ok(String::from_utf8(output)?)
}

/// Sign up two users, fund one, transfer, and check what lands on disk.
#[test]
fn test_happy_path_end_to_end() -> Result<()> {
    let (repo, _temp_dir) = create_test_repo()?;

    // 1. Two signups, each persisted immediately
    run_session(&repo, "2\nalice\nsecret\n1234\n2\nbob\nhunter2\n0000\n")?;
    let accounts = repo.load()?;
    assert_eq!(accounts.len(), 2);
    assert_eq!(accounts["alice"].balance(), Decimal::ZERO);

    // 2. A new process: alice deposits 100, fails to withdraw 150, deposits 50
    let out = run_session(
        &repo,
        "1\nalice\nsecret\n2\n1234\n100\n3\n1234\n150\n2\n1234\n50\n",
    )?;
    assert!(out.contains("Insufficient balance."));
    assert_eq!(repo.load()?["alice"].balance(), Decimal::from(150));

    // 3. alice sends 70 to bob
    run_session(&repo, "1\nalice\nsecret\n4\n1234\nbob\n70\n")?;
    let accounts = repo.load()?;
    assert_eq!(accounts["alice"].balance(), Decimal::from(80));
    assert_eq!(accounts["bob"].balance(), Decimal::from(70));
    assert_eq!(
        accounts["alice"].history().last().map(|t| &t.kind),
        Some(&TransactionKind::TransferOut {
            to: "bob".to_string()
        })
    );
    assert_eq!(
        accounts["bob"].history().last().map(|t| &t.kind),
        Some(&TransactionKind::TransferIn {
            from: "alice".to_string()
        })
    );

    // 4. The raw file uses the flat record layout
    let raw: serde_json::Value = serde_json::from_str(&fs::read_to_string(repo.path())?)?;
    assert_eq!(raw["alice"]["pin"], "1234");
    assert_eq!(raw["alice"]["balance"], 80.0);
    let history = raw["alice"]["transaction_history"].as_array().unwrap();
    assert_eq!(history.len(), 3);
    assert_eq!(history[2]["type"], "transfer");
    assert_eq!(history[2]["amount"], 70.0);
    assert_eq!(history[2]["to"], "bob");
    assert_eq!(raw["bob"]["transaction_history"][0]["from"], "alice");
    Ok(())
}

#[test]
fn test_bob_sees_incoming_transfer_in_history() -> Result<()> {
    let (repo, _temp_dir) = create_test_repo()?;
    run_session(&repo, "2\nalice\nsecret\n1234\n2\nbob\nhunter2\n0000\n")?;
    run_session(&repo, "1\nalice\nsecret\n2\n1234\n25\n4\n1234\nbob\n25\n")?;

    let out = run_session(&repo, "1\nbob\nhunter2\n5\n\n")?;
    assert!(out.contains("Transaction history for bob"));
    assert!(out.contains("$25.00  from alice"));
    assert!(out.contains("Current balance: $25.00"));
    Ok(())
}

#[test]
fn test_duplicate_signup_leaves_file_untouched() -> Result<()> {
    let (repo, _temp_dir) = create_test_repo()?;
    run_session(&repo, "2\nalice\nsecret\n1234\n")?;
    let before = fs::read_to_string(repo.path())?;

    let out = run_session(&repo, "2\nalice\n")?;
    assert!(out.contains("Username already exists."));
    assert_eq!(fs::read_to_string(repo.path())?, before);
    Ok(())
}

#[test]
fn test_unreadable_store_fails_to_open() -> Result<()> {
    let (repo, _temp_dir) = create_test_repo()?;
    fs::write(repo.path(), "not json")?;
    assert!(Bank::open(&repo).is_err());
    Ok(())
}
