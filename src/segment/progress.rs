// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! Progress reporting hook for the copy loop.

/// Receives progress updates measured in source records consumed.
pub trait Progress {
    /// Called once before streaming with the source record count.
    fn start(&mut self, _total: u64) {}

    /// Called after `records` more source records were consumed.
    fn advance(&mut self, records: u64);

    /// Called once streaming has ended, successfully or not.
    fn finish(&mut self) {}
}

/// Progress sink that ignores every update.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl Progress for NoProgress {
    fn advance(&mut self, _records: u64) {}
}

/// Sink counting updates, for tests.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct CountingProgress {
    pub total: Option<u64>,
    pub consumed: u64,
    pub finished: bool,
}

#[cfg(test)]
impl Progress for CountingProgress {
    fn start(&mut self, total: u64) {
        self.total = Some(total);
    }

    fn advance(&mut self, records: u64) {
        self.consumed += records;
    }

    fn finish(&mut self) {
        self.finished = true;
    }
}
