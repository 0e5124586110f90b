//! Local puzzle datasets for bulk import.
//!
//! Loads a challenges file and its optional solutions file, then merges each
//! solution into the matching test case so the result can be submitted to the
//! catalog's bulk import endpoint as is.

mod loader;
mod source;

pub use loader::{
    load, merge_solutions, take_first, ChallengeRecord, ChallengeSet, GridPair, MergeStats,
    SolutionSet, TestCase,
};
pub use source::{DatasetSource, Split};
