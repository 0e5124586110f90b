//! Challenge and solution loading.

use std::collections::BTreeMap;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::error::DatasetError;

use super::DatasetSource;

/// One demonstration pair. Grids are passed through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridPair {
    pub input: Value,
    pub output: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One test case. `output` is filled in from the solutions file when known.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    pub input: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A puzzle definition as stored in a challenges file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChallengeRecord {
    #[serde(default)]
    pub train: Vec<GridPair>,
    #[serde(default)]
    pub test: Vec<TestCase>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Puzzle id to challenge, ordered by id.
pub type ChallengeSet = BTreeMap<String, ChallengeRecord>;

/// Puzzle id to the expected output grid of each test case, in order.
pub type SolutionSet = BTreeMap<String, Vec<Value>>;

/// Counters from a merge pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MergeStats {
    /// Puzzles that had an entry in the solutions map.
    pub puzzles_merged: usize,
    /// Test cases that received an output.
    pub outputs_assigned: usize,
}

/// Loads a source's challenges and merges in its solutions.
///
/// Fails with [`DatasetError::NotFound`] before reading anything if the
/// challenges file is missing. A missing solutions file is not an error.
pub fn load(root: &Path, source: &DatasetSource) -> Result<ChallengeSet, DatasetError> {
    let challenges_path = source.challenges_path(root);
    if !challenges_path.exists() {
        return Err(DatasetError::NotFound {
            path: challenges_path,
        });
    }

    info!(path = %challenges_path.display(), "Loading challenges");
    let mut challenges: ChallengeSet = read_json(&challenges_path)?;

    let solutions: SolutionSet = match source.solutions_path(root) {
        Some(path) if path.exists() => {
            info!(path = %path.display(), "Loading solutions");
            read_json(&path)?
        }
        Some(path) => {
            debug!(path = %path.display(), "Solutions file absent, skipping merge");
            SolutionSet::new()
        }
        None => SolutionSet::new(),
    };

    let stats = merge_solutions(&mut challenges, &solutions);
    info!(
        puzzles = challenges.len(),
        merged = stats.puzzles_merged,
        outputs = stats.outputs_assigned,
        "Dataset loaded"
    );

    Ok(challenges)
}

/// Assigns `solutions[id][i]` to `challenges[id].test[i].output`.
///
/// Only indices within both lists are touched. Extra solutions or extra test
/// cases are left as they are without error.
pub fn merge_solutions(challenges: &mut ChallengeSet, solutions: &SolutionSet) -> MergeStats {
    let mut stats = MergeStats::default();

    for (puzzle_id, record) in challenges.iter_mut() {
        let Some(outputs) = solutions.get(puzzle_id) else {
            continue;
        };

        stats.puzzles_merged += 1;
        for (case, output) in record.test.iter_mut().zip(outputs) {
            case.output = Some(output.clone());
            stats.outputs_assigned += 1;
        }

        if outputs.len() != record.test.len() {
            debug!(
                puzzle_id = %puzzle_id,
                test_cases = record.test.len(),
                solutions = outputs.len(),
                "Solution count differs from test case count"
            );
        }
    }

    stats
}

/// Keeps the first `limit` puzzles in id order.
pub fn take_first(challenges: ChallengeSet, limit: usize) -> ChallengeSet {
    challenges.into_iter().take(limit).collect()
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, DatasetError> {
    let content = std::fs::read_to_string(path).map_err(|source| DatasetError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| DatasetError::Json {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn challenge_with_tests(count: usize) -> ChallengeRecord {
        serde_json::from_value(json!({
            "train": [{"input": [[1]], "output": [[2]]}],
            "test": (0..count).map(|i| json!({"input": [[i]]})).collect::<Vec<_>>(),
        }))
        .expect("valid challenge")
    }

    #[test]
    fn test_merge_fills_every_test_case_in_order() {
        let mut challenges = ChallengeSet::from([("p1".to_string(), challenge_with_tests(2))]);
        let solutions = SolutionSet::from([("p1".to_string(), vec![json!([[7]]), json!([[8]])])]);

        let stats = merge_solutions(&mut challenges, &solutions);

        let test = &challenges["p1"].test;
        assert_eq!(test[0].output, Some(json!([[7]])));
        assert_eq!(test[1].output, Some(json!([[8]])));
        assert_eq!(stats.outputs_assigned, 2);
    }

    #[test]
    fn test_merge_short_solution_list_truncates_silently() {
        let mut challenges = ChallengeSet::from([("p1".to_string(), challenge_with_tests(2))]);
        let solutions = SolutionSet::from([("p1".to_string(), vec![json!([[7]])])]);

        merge_solutions(&mut challenges, &solutions);

        let test = &challenges["p1"].test;
        assert_eq!(test[0].output, Some(json!([[7]])));
        assert_eq!(test[1].output, None);
    }

    #[test]
    fn test_merge_long_solution_list_ignores_extras() {
        let mut challenges = ChallengeSet::from([("p1".to_string(), challenge_with_tests(1))]);
        let solutions =
            SolutionSet::from([("p1".to_string(), vec![json!([[7]]), json!([[9]])])]);

        let stats = merge_solutions(&mut challenges, &solutions);

        assert_eq!(challenges["p1"].test.len(), 1);
        assert_eq!(stats.outputs_assigned, 1);
    }

    #[test]
    fn test_merge_skips_puzzles_without_solutions() {
        let mut challenges = ChallengeSet::from([("p1".to_string(), challenge_with_tests(1))]);
        let stats = merge_solutions(&mut challenges, &SolutionSet::new());

        assert_eq!(stats, MergeStats::default());
        assert_eq!(challenges["p1"].test[0].output, None);
    }

    #[test]
    fn test_unknown_fields_survive_round_trip() {
        let record: ChallengeRecord = serde_json::from_value(json!({
            "train": [],
            "test": [{"input": [[0]], "note": "keep"}],
            "difficulty": 3
        }))
        .expect("valid");

        let value = serde_json::to_value(&record).expect("serialize");
        assert_eq!(value["difficulty"], json!(3));
        assert_eq!(value["test"][0]["note"], json!("keep"));
        assert!(value["test"][0].get("output").is_none());
    }

    #[test]
    fn test_take_first_keeps_lowest_ids() {
        let challenges = ChallengeSet::from([
            ("c".to_string(), ChallengeRecord::default()),
            ("a".to_string(), ChallengeRecord::default()),
            ("b".to_string(), ChallengeRecord::default()),
        ]);

        let limited = take_first(challenges, 2);
        assert_eq!(limited.keys().collect::<Vec<_>>(), vec!["a", "b"]);
    }
}
