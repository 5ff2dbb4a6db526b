//! Token custody seam
//!
//! The pool never holds balances itself: every transfer goes through a
//! [`TokenLedger`]. A [`Settlement`] batches the transfers of one operation
//! and reverses the completed ones if a later step fails, so pool state is
//! only committed after the whole batch went through.

use orbital_types::{AccountId, Wad};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    #[error("{owner} holds {available} of token {token}, needs {requested}")]
    InsufficientBalance {
        token: usize,
        owner: AccountId,
        requested: Wad,
        available: Wad,
    },

    #[error("Transfer amount must not be negative, got {0}")]
    NegativeTransfer(Wad),

    #[error("Ledger rejected transfer: {0}")]
    Rejected(String),
}

/// External token custody: pulls from and pays out to accounts
pub trait TokenLedger {
    /// Move `amount` of `token` from `owner` into pool custody
    fn debit(&mut self, token: usize, owner: &AccountId, amount: Wad) -> Result<(), LedgerError>;

    /// Move `amount` of `token` from pool custody to `recipient`
    fn credit(
        &mut self,
        token: usize,
        recipient: &AccountId,
        amount: Wad,
    ) -> Result<(), LedgerError>;
}

/// Balances kept in a map; the custody used by tests, benches and quoting
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InMemoryLedger {
    balances: BTreeMap<(usize, AccountId), Wad>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Give `owner` tokens out of thin air
    pub fn mint(&mut self, token: usize, owner: &AccountId, amount: Wad) {
        *self
            .balances
            .entry((token, owner.clone()))
            .or_insert(Wad::ZERO) += amount;
    }

    pub fn balance_of(&self, token: usize, owner: &AccountId) -> Wad {
        self.balances
            .get(&(token, owner.clone()))
            .copied()
            .unwrap_or(Wad::ZERO)
    }
}

impl TokenLedger for InMemoryLedger {
    fn debit(&mut self, token: usize, owner: &AccountId, amount: Wad) -> Result<(), LedgerError> {
        if amount.is_negative() {
            return Err(LedgerError::NegativeTransfer(amount));
        }
        let available = self.balance_of(token, owner);
        if available < amount {
            return Err(LedgerError::InsufficientBalance {
                token,
                owner: owner.clone(),
                requested: amount,
                available,
            });
        }
        self.balances
            .insert((token, owner.clone()), available - amount);
        Ok(())
    }

    fn credit(
        &mut self,
        token: usize,
        recipient: &AccountId,
        amount: Wad,
    ) -> Result<(), LedgerError> {
        if amount.is_negative() {
            return Err(LedgerError::NegativeTransfer(amount));
        }
        self.mint(token, recipient, amount);
        Ok(())
    }
}

/// All transfers of one pool operation against a single account
#[derive(Debug, Clone, PartialEq)]
pub struct Settlement {
    account: AccountId,
    debits: Vec<(usize, Wad)>,
    credits: Vec<(usize, Wad)>,
}

impl Settlement {
    pub fn new(account: &AccountId) -> Self {
        Self {
            account: account.clone(),
            debits: Vec::new(),
            credits: Vec::new(),
        }
    }

    /// Pull `amount` of `token` from the account; zero amounts are skipped
    pub fn debit(mut self, token: usize, amount: Wad) -> Self {
        if !amount.is_zero() {
            self.debits.push((token, amount));
        }
        self
    }

    /// Pay `amount` of `token` to the account; zero amounts are skipped
    pub fn credit(mut self, token: usize, amount: Wad) -> Self {
        if !amount.is_zero() {
            self.credits.push((token, amount));
        }
        self
    }

    /// Run every debit, then every credit. On the first failure the
    /// completed transfers are reversed and the failure is returned.
    pub fn execute<L: TokenLedger + ?Sized>(&self, ledger: &mut L) -> Result<(), LedgerError> {
        for (done, (token, amount)) in self.debits.iter().enumerate() {
            if let Err(e) = ledger.debit(*token, &self.account, *amount) {
                self.unwind(ledger, &self.debits[..done], &[]);
                return Err(e);
            }
        }

        for (done, (token, amount)) in self.credits.iter().enumerate() {
            if let Err(e) = ledger.credit(*token, &self.account, *amount) {
                self.unwind(ledger, &self.debits, &self.credits[..done]);
                return Err(e);
            }
        }

        debug!(
            account = %self.account,
            debits = self.debits.len(),
            credits = self.credits.len(),
            "Settlement executed"
        );
        Ok(())
    }

    fn unwind<L: TokenLedger + ?Sized>(
        &self,
        ledger: &mut L,
        debits: &[(usize, Wad)],
        credits: &[(usize, Wad)],
    ) {
        for (token, amount) in credits.iter().rev() {
            if let Err(e) = ledger.debit(*token, &self.account, *amount) {
                warn!(account = %self.account, token, error = %e, "Failed to reverse credit");
            }
        }
        for (token, amount) in debits.iter().rev() {
            if let Err(e) = ledger.credit(*token, &self.account, *amount) {
                warn!(account = %self.account, token, error = %e, "Failed to reverse debit");
            }
        }
    }
}
