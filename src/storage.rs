use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use tracing::{debug, info};

use crate::accounts::Account;

/// Every account keyed by username; the unit of persistence.
pub type Accounts = BTreeMap<String, Account>;

/// AccountsRepo loads and saves the whole account map at once. There are no
/// partial updates: `save` always replaces everything previously stored.
pub trait AccountsRepo {
    fn load(&self) -> Result<Accounts>;
    fn save(&self, accounts: &Accounts) -> Result<()>;
}

/// JSON file holding `{username: {password, pin, balance, transaction_history}}`.
pub struct JsonFileRepo {
    path: PathBuf,
}

impl JsonFileRepo {
    pub fn new(path: impl Into<PathBuf>) -> JsonFileRepo {
        JsonFileRepo { path: path.into() }
    }
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AccountsRepo for JsonFileRepo {
    fn load(&self) -> Result<Accounts> {
        let data = match fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!(path = %self.path.display(), "No accounts file yet, starting empty");
                return Ok(Accounts::new());
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("failed to read {}", self.path.display()))
            }
        };
        if data.trim().is_empty() {
            return Ok(Accounts::new());
        }
        let accounts: Accounts = serde_json::from_str(&data)
            .with_context(|| format!("malformed accounts file {}", self.path.display()))?;
        debug!(
            path = %self.path.display(),
            accounts = accounts.len(),
            "Loaded accounts"
        );
        Ok(accounts
            .into_iter()
            .map(|(username, acc)| {
                let acc = acc.with_username(&username);
                (username, acc)
            })
            .collect())
    }

    fn save(&self, accounts: &Accounts) -> Result<()> {
        let mut buf = Vec::new();
        let mut serializer =
            serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
        accounts
            .serialize(&mut serializer)
            .context("failed to serialize accounts")?;
        fs::write(&self.path, buf)
            .with_context(|| format!("failed to write {}", self.path.display()))?;
        debug!(
            path = %self.path.display(),
            accounts = accounts.len(),
            "Saved accounts"
        );
        Ok(())
    }
}

pub struct MemoryRepo {
    data: RefCell<Accounts>,
    saves: Cell<usize>,
}

impl MemoryRepo {
    pub fn new() -> MemoryRepo {
        MemoryRepo::with_accounts(Accounts::new())
    }
    pub fn with_accounts(accounts: Accounts) -> MemoryRepo {
        MemoryRepo {
            data: RefCell::new(accounts),
            saves: Cell::new(0),
        }
    }
    /// The accounts as of the last save.
    pub fn snapshot(&self) -> Accounts {
        self.data.borrow().clone()
    }
    pub fn save_count(&self) -> usize {
        self.saves.get()
    }
}

impl Default for MemoryRepo {
    fn default() -> Self {
        MemoryRepo::new()
    }
}

impl AccountsRepo for MemoryRepo {
    fn load(&self) -> Result<Accounts> {
        Ok(self.data.borrow().clone())
    }
    fn save(&self, accounts: &Accounts) -> Result<()> {
        *self.data.borrow_mut() = accounts.clone();
        self.saves.set(self.saves.get() + 1);
        Ok(())
    }
}
