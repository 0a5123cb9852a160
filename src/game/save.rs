//! Save record.
//!
//! Five scalars in a fixed order, one per line, after a timestamp comment:
//!
//! ```text
//! # Save Timestamp: 2025-03-14 09:26:53
//! 2
//! 4
//! 85
//! -10.0
//! -13.0
//! ```
//!
//! Reading and writing the file is left to the caller.

use chrono::{Local, NaiveDateTime};
use serde::{Serialize, Deserialize};
use thiserror::Error;

/// Timestamp comment format.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const TIMESTAMP_PREFIX: &str = "# Save Timestamp: ";

/// Field order in the text form.
const FIELDS: [&str; 5] = ["level", "food", "health", "x", "y"];

/// Errors reading a save record.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SaveError {
    /// Fewer than five value lines
    #[error("save data is missing field `{0}`")]
    MissingField(&'static str),
    /// A value line did not parse
    #[error("save field `{field}` has invalid value `{value}`")]
    BadNumber {
        /// Field name
        field: &'static str,
        /// Offending text
        value: String,
    },
}

/// Persisted progress.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SaveData {
    /// Level number
    pub level: u32,
    /// Food count
    pub food: u32,
    /// Player health
    pub health: i32,
    /// Player x
    pub x: f32,
    /// Player y
    pub y: f32,
}

impl SaveData {
    /// Text form stamped with the current local time.
    pub fn to_text(&self) -> String {
        self.to_text_at(Local::now().naive_local())
    }

    /// Text form stamped with `at`.
    pub fn to_text_at(&self, at: NaiveDateTime) -> String {
        format!(
            "{}{}\n{}\n{}\n{}\n{:?}\n{:?}\n",
            TIMESTAMP_PREFIX,
            at.format(TIMESTAMP_FORMAT),
            self.level,
            self.food,
            self.health,
            self.x,
            self.y,
        )
    }

    /// Parse the text form. Comment and blank lines are skipped.
    pub fn parse(text: &str) -> Result<Self, SaveError> {
        let mut values = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'));
        let mut next = |field: &'static str| values.next().ok_or(SaveError::MissingField(field));

        let level = number(FIELDS[0], next(FIELDS[0])?)?;
        let food = number(FIELDS[1], next(FIELDS[1])?)?;
        let health = number(FIELDS[2], next(FIELDS[2])?)?;
        let x = number(FIELDS[3], next(FIELDS[3])?)?;
        let y = number(FIELDS[4], next(FIELDS[4])?)?;
        Ok(Self { level, food, health, x, y })
    }

    /// Timestamp from the comment line, if present and well formed.
    pub fn timestamp(text: &str) -> Option<NaiveDateTime> {
        text.lines()
            .find_map(|line| line.trim().strip_prefix(TIMESTAMP_PREFIX))
            .and_then(|stamp| NaiveDateTime::parse_from_str(stamp.trim(), TIMESTAMP_FORMAT).ok())
    }
}

fn number<T: std::str::FromStr>(field: &'static str, value: &str) -> Result<T, SaveError> {
    value.parse().map_err(|_| SaveError::BadNumber { field, value: value.to_string() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample() -> SaveData {
        SaveData { level: 2, food: 4, health: 85, x: -10.0, y: -13.5 }
    }

    fn stamp() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 14)
            .and_then(|d| d.and_hms_opt(9, 26, 53))
            .unwrap()
    }

    #[test]
    fn test_text_layout() {
        let text = sample().to_text_at(stamp());
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec!["# Save Timestamp: 2025-03-14 09:26:53", "2", "4", "85", "-10.0", "-13.5"]
        );
        assert_eq!(SaveData::parse(&text), Ok(sample()));
        assert_eq!(SaveData::timestamp(&text), Some(stamp()));
    }

    #[test]
    fn test_parse_without_comment() {
        let data = SaveData::parse("3\n0\n100\n1.5\n2\n").unwrap();
        assert_eq!(data, SaveData { level: 3, food: 0, health: 100, x: 1.5, y: 2.0 });
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(SaveData::parse("1\n2\n3\n"), Err(SaveError::MissingField("x")));
        assert_eq!(
            SaveData::parse("1\nlots\n3\n0\n0\n"),
            Err(SaveError::BadNumber { field: "food", value: "lots".to_string() })
        );
    }
}
