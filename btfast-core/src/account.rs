//! Consolidated balance and closed-trade history.

use serde::{Deserialize, Serialize};

use crate::transaction::Transaction;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    initial_balance: f64,
    balance: f64,
    transactions: Vec<Transaction>,
}

impl Account {
    pub fn new(initial_balance: f64) -> Self {
        Account {
            initial_balance,
            balance: initial_balance,
            transactions: Vec::new(),
        }
    }

    pub fn initial_balance(&self) -> f64 {
        self.initial_balance
    }

    pub fn balance(&self) -> f64 {
        self.balance
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn update_balance(&mut self, pl: f64) {
        self.balance += pl;
    }

    pub fn add_transaction_to_history(&mut self, trade: Transaction) {
        self.transactions.push(trade);
    }

    /// Largest single losing trade (0.0 if there are no losses), used by the
    /// stability/noise validation gates to size perturbation bounds.
    pub fn largest_loss(&self) -> f64 {
        self.transactions
            .iter()
            .map(|t| t.net_pl)
            .fold(0.0, f64::min)
    }

    pub fn reset(&mut self, initial_balance: f64) {
        self.initial_balance = initial_balance;
        self.balance = initial_balance;
        self.transactions.clear();
    }
}
