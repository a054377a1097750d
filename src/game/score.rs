//! Score Records
//!
//! One record is appended when a level ends. Ranking is score descending,
//! then elapsed time ascending; equal records keep insertion order.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

/// A finished run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    /// Points
    pub score: u32,
    /// Level time at the end of the run (seconds)
    pub elapsed_time: f32,
    /// Player name from config
    pub player_name: String,
    /// Level name
    pub level_name: String,
}

impl ScoreRecord {
    /// Ranking order: higher score first, faster run breaks ties.
    pub fn rank_cmp(&self, other: &Self) -> Ordering {
        other
            .score
            .cmp(&self.score)
            .then_with(|| self.elapsed_time.total_cmp(&other.elapsed_time))
    }
}

/// In-memory record collection.
#[derive(Clone, Debug, Default)]
pub struct Scoreboard {
    records: Vec<ScoreRecord>,
}

impl Scoreboard {
    /// Create an empty scoreboard.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record.
    pub fn push(&mut self, record: ScoreRecord) {
        self.records.push(record);
    }

    /// Records in insertion order.
    pub fn records(&self) -> &[ScoreRecord] {
        &self.records
    }

    /// Best `n` records.
    pub fn top(&self, n: usize) -> Vec<&ScoreRecord> {
        let mut ranked: Vec<&ScoreRecord> = self.records.iter().collect();
        // sort_by is stable
        ranked.sort_by(|a, b| a.rank_cmp(b));
        ranked.truncate(n);
        ranked
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// No records yet.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(score: u32, elapsed_time: f32, name: &str) -> ScoreRecord {
        ScoreRecord {
            score,
            elapsed_time,
            player_name: name.to_string(),
            level_name: "Training".to_string(),
        }
    }

    #[test]
    fn test_top_orders_by_score_then_time() {
        let mut board = Scoreboard::new();
        board.push(record(100, 30.0, "a"));
        board.push(record(300, 50.0, "b"));
        board.push(record(300, 40.0, "c"));
        board.push(record(50, 10.0, "d"));

        let names: Vec<&str> = board.top(3).iter().map(|r| r.player_name.as_str()).collect();
        assert_eq!(names, vec!["c", "b", "a"]);
    }

    #[test]
    fn test_top_is_stable_for_equal_records() {
        let mut board = Scoreboard::new();
        board.push(record(10, 5.0, "first"));
        board.push(record(10, 5.0, "second"));
        let top = board.top(10);
        assert_eq!(top[0].player_name, "first");
        assert_eq!(top[1].player_name, "second");
    }

    #[test]
    fn test_record_json_field_names() {
        let json = serde_json::to_value(record(1, 2.5, "p")).unwrap();
        assert_eq!(json["elapsed_time"], 2.5);
        assert_eq!(json["level_name"], "Training");
    }
}
