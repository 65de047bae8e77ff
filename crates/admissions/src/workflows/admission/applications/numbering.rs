use std::collections::HashMap;
use std::sync::Mutex;

use super::domain::ApplicationNumber;

/// Issues `APP<year><5-digit sequence>` numbers from an atomic per-year
/// counter.
///
/// Counting existing rows and adding one, as the workflow historically did,
/// races under concurrent creation; a mutex-guarded monotonic counter per
/// creation year hands every caller a distinct sequence value. The
/// repository's uniqueness check on insert stays as the final guard so a
/// collision from a restarted counter fails loudly instead of overwriting.
#[derive(Debug, Default)]
pub struct ApplicationNumberSequence {
    counters: Mutex<HashMap<i32, u32>>,
}

impl ApplicationNumberSequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resume issuance above numbers already present in storage, e.g. after
    /// a restart.
    pub fn starting_from(year: i32, last_issued: u32) -> Self {
        let sequence = Self::default();
        sequence
            .counters
            .lock()
            .expect("sequence mutex poisoned")
            .insert(year, last_issued);
        sequence
    }

    pub fn next(&self, year: i32) -> ApplicationNumber {
        let mut counters = self.counters.lock().expect("sequence mutex poisoned");
        let counter = counters.entry(year).or_insert(0);
        *counter += 1;
        ApplicationNumber(format!("APP{year}{:05}", *counter))
    }
}
