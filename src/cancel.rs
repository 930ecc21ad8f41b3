//! Cancellation tokens for long-running index reads.
//!
//! Distinct-value counting over a facet with a huge value space is the one
//! read that can run away. Every counting loop takes a token and checks it
//! sparsely: once every `CANCEL_CHECK_INTERVAL` iterations.
//!
//! A token is cancelled when its shared flag is set or its deadline passes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::QueryError;

/// How often counting loops look at the token. Power of two for a cheap mask.
pub const CANCEL_CHECK_INTERVAL: usize = 0x1000; // 4,096

#[derive(Clone, Debug)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
    started: Instant,
    deadline: Option<Instant>,
}

impl CancellationToken {
    /// A token that is only cancelled explicitly.
    pub fn new() -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
            started: Instant::now(),
            deadline: None,
        }
    }

    /// A token that also expires `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        let started = Instant::now();
        Self {
            flag: Arc::new(AtomicBool::new(false)),
            started,
            deadline: started.checked_add(timeout),
        }
    }

    /// Never cancelled. Useful for tests and internal full scans.
    pub fn none() -> Self {
        Self::new()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        if self.flag.load(Ordering::Relaxed) {
            return true;
        }
        matches!(self.deadline, Some(deadline) if Instant::now() >= deadline)
    }

    /// `Err(Cancelled)` if cancelled, for use with `?`.
    #[inline]
    pub fn check(&self) -> Result<(), QueryError> {
        if self.is_cancelled() {
            Err(QueryError::Cancelled {
                elapsed_ms: self.started.elapsed().as_millis() as u64,
            })
        } else {
            Ok(())
        }
    }

    /// Sparse variant of `check` for tight loops.
    #[inline]
    pub fn check_sparse(&self, counter: usize) -> Result<(), QueryError> {
        if counter & (CANCEL_CHECK_INTERVAL - 1) == 0 {
            self.check()
        } else {
            Ok(())
        }
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}
