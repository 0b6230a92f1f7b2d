use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::address;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    /// Derived from the wallet's own seed.
    #[default]
    Generated,
    /// Key imported from elsewhere.
    Imported,
}

impl std::fmt::Display for AccountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccountType::Generated => write!(f, "generated"),
            AccountType::Imported => write!(f, "imported"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Public-key hash (tz1/tz2/tz3 address).
    pub pkh: String,
    pub name: String,
    #[serde(default, rename = "type")]
    pub kind: AccountType,
}

impl Account {
    pub fn new(pkh: impl Into<String>, name: impl Into<String>, kind: AccountType) -> Self {
        Self {
            pkh: pkh.into(),
            name: name.into(),
            kind,
        }
    }
}

/// The user's own accounts. Read-only once built.
#[derive(Debug, Clone, Default)]
pub struct AccountDirectory {
    accounts: Vec<Account>,
}

impl AccountDirectory {
    /// Names must be non-empty and unique (case-insensitive); addresses valid and unique.
    pub fn new(accounts: Vec<Account>) -> Result<Self> {
        for (i, acc) in accounts.iter().enumerate() {
            if acc.name.trim().is_empty() {
                bail!("Account name cannot be empty.");
            }
            if let Err(e) = address::parse_address(&acc.pkh) {
                bail!("Account '{}' has an invalid address: {e}", acc.name);
            }
            let earlier = &accounts[..i];
            if earlier.iter().any(|a| a.name.eq_ignore_ascii_case(&acc.name)) {
                bail!("An account named '{}' already exists.", acc.name);
            }
            if earlier.iter().any(|a| a.pkh == acc.pkh) {
                bail!("Address {} is listed twice.", acc.pkh);
            }
        }
        Ok(Self { accounts })
    }

    pub fn all(&self) -> &[Account] {
        &self.accounts
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    pub fn first(&self) -> Option<&Account> {
        self.accounts.first()
    }

    pub fn find(&self, pkh: &str) -> Option<&Account> {
        self.accounts.iter().find(|a| a.pkh == pkh)
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Account> {
        let name = name.trim();
        self.accounts
            .iter()
            .find(|a| a.name.eq_ignore_ascii_case(name))
    }

    /// Look up by name first, then by address.
    pub fn lookup(&self, input: &str) -> Option<&Account> {
        self.find_by_name(input).or_else(|| self.find(input.trim()))
    }

    /// Every account except `pkh`, in directory order.
    pub fn others(&self, pkh: &str) -> Vec<&Account> {
        self.accounts.iter().filter(|a| a.pkh != pkh).collect()
    }

    /// Turn recipient input into an address: an account name maps to its
    /// address, anything else is returned as typed.
    pub fn resolve(&self, input: &str) -> String {
        match self.find_by_name(input) {
            Some(acc) => acc.pkh.clone(),
            None => input.to_string(),
        }
    }
}
