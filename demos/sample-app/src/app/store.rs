//! Row storage with audited saves.

use crate::trace::record;

/// In-memory rows.
#[derive(Debug, Default)]
pub struct Store {
    rows: Vec<String>,
}

impl Store {
    /// Saves a row.
    pub fn save(&mut self, row: &str) {
        record("save");
        self.rows.push(row.to_string());
    }

    /// Writes rows out.
    ///
    /// # Panics
    ///
    /// Panics when there is nothing to write.
    pub fn flush(&self) {
        assert!(!self.rows.is_empty(), "disk full");
    }

    /// Stored rows, oldest first.
    pub fn rows(&self) -> impl Iterator<Item = &str> + '_ {
        self.rows.iter().map(String::as_str)
    }
}

/// Things that can be written to a [`Store`].
pub trait Persist {
    /// Saves `self` into `store`.
    fn persist(&self, store: &mut Store);
}

impl Persist for String {
    fn persist(&self, store: &mut Store) {
        store.save(self);
    }
}
