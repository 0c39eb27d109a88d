//! Charges against a ledger.

use std::num::ParseIntError;

use crate::trace::record;

/// Ledger of charged amounts.
#[derive(Debug, Default)]
pub struct Billing {
    charged: Vec<u64>,
}

impl Billing {
    /// Charges `amount` plus a fee of one. Zero is not charged.
    pub fn charge(&mut self, amount: u64) -> u64 {
        record("body");
        if amount == 0 {
            return 0;
        }
        self.charged.push(amount);
        amount + 1
    }

    /// Parses `text` and charges it.
    ///
    /// # Errors
    ///
    /// Returns an error if `text` is not a number.
    pub fn charge_text(&mut self, text: &str) -> Result<u64, ParseIntError> {
        let amount: u64 = text.trim().parse()?;
        Ok(self.charge(amount))
    }

    /// Amounts charged so far.
    #[must_use]
    pub fn history(&self) -> &[u64] {
        &self.charged
    }

    /// File this type is declared in.
    #[must_use]
    pub fn origin() -> &'static str {
        file!()
    }
}
