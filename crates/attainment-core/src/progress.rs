//! Progress reporting
//!
//! The pipeline calls a [`Progress`] sink at fixed checkpoints. Percentages
//! never decrease within one file's processing. Sinks are invoked
//! synchronously and should return quickly.

use std::fmt;

/// A fixed point in the per-file pipeline
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Checkpoint {
    /// Input workbook opened
    FileRead,
    /// One sheet scanned (`done` of `total`)
    SheetProcessed {
        sheet: String,
        done: usize,
        total: usize,
    },
    /// Records ordered by class and student id
    Sorted,
    /// Header rows of the calculation sheet written
    HeadersWritten,
    /// Identity, score and per-row formula cells written
    DataWritten,
    /// Broadcast average and overall attainment columns written
    Computed,
    /// Trailing averages row written
    Averaged,
    /// Bucket table written
    StatisticsBuilt,
    /// Line and bar charts attached
    ChartsBuilt,
    /// Output file written
    Saved,
}

impl Checkpoint {
    /// Percent complete at this checkpoint
    pub fn percent(&self) -> u8 {
        match self {
            Self::FileRead => 5,
            Self::SheetProcessed { done, total, .. } => {
                let total = (*total).max(1);
                5 + (25 * (*done).min(total) / total) as u8
            }
            Self::Sorted => 30,
            Self::HeadersWritten => 40,
            Self::DataWritten => 55,
            Self::Computed => 65,
            Self::Averaged => 70,
            Self::StatisticsBuilt => 80,
            Self::ChartsBuilt => 90,
            Self::Saved => 100,
        }
    }
}

impl fmt::Display for Checkpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FileRead => write!(f, "read input workbook"),
            Self::SheetProcessed { sheet, done, total } => {
                write!(f, "processed sheet '{}' ({}/{})", sheet, done, total)
            }
            Self::Sorted => write!(f, "sorted student records"),
            Self::HeadersWritten => write!(f, "wrote header rows"),
            Self::DataWritten => write!(f, "wrote student rows"),
            Self::Computed => write!(f, "wrote attainment columns"),
            Self::Averaged => write!(f, "wrote averages row"),
            Self::StatisticsBuilt => write!(f, "built statistics sheet"),
            Self::ChartsBuilt => write!(f, "built charts"),
            Self::Saved => write!(f, "saved report"),
        }
    }
}

/// Sink for pipeline progress events
pub trait Progress {
    fn report(&mut self, checkpoint: &Checkpoint);
}

impl<F> Progress for F
where
    F: FnMut(&Checkpoint),
{
    fn report(&mut self, checkpoint: &Checkpoint) {
        self(checkpoint);
    }
}

/// Sink that discards every event
#[derive(Clone, Copy, Debug, Default)]
pub struct NoProgress;

impl Progress for NoProgress {
    fn report(&mut self, _checkpoint: &Checkpoint) {}
}
