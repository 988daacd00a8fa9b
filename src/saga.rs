//! Runs the steps of a multi-document operation in order. Completed steps may
//! register a compensation; if a later step fails, compensations run newest
//! first and the step's original error is returned.

use crate::error::AppError;
use tracing::{info, warn};

type Compensation<'a> = Box<dyn FnOnce() -> Result<(), AppError> + 'a>;

pub struct Saga<'a> {
    name: &'static str,
    compensations: Vec<(&'static str, Compensation<'a>)>,
}

impl<'a> Saga<'a> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            compensations: Vec::new(),
        }
    }

    pub fn step<T>(
        &mut self,
        label: &'static str,
        action: impl FnOnce() -> Result<T, AppError>,
    ) -> Result<T, AppError> {
        match action() {
            Ok(v) => Ok(v),
            Err(e) => {
                warn!(saga = self.name, step = label, error = %e, "saga step failed");
                self.unwind();
                Err(e)
            }
        }
    }

    pub fn on_rollback(
        &mut self,
        label: &'static str,
        compensation: impl FnOnce() -> Result<(), AppError> + 'a,
    ) {
        self.compensations.push((label, Box::new(compensation)));
    }

    fn unwind(&mut self) {
        while let Some((label, compensation)) = self.compensations.pop() {
            match compensation() {
                Ok(()) => info!(saga = self.name, step = label, "compensated"),
                Err(e) => warn!(
                    saga = self.name,
                    step = label,
                    error = %e,
                    "compensation failed; partial state left in place"
                ),
            }
        }
    }

    /// Marks the saga done; registered compensations are dropped unrun.
    pub fn finish(mut self) {
        self.compensations.clear();
    }
}
