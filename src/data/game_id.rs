use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use rusqlite::types::{FromSql, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Identifier of a recorded game, encoding its date and a per-date sequence
/// number as the decimal digits `YYMMDDSS`. The sequence starts at 1, so the
/// first game of 2024-03-09 gets id 24030901.
#[derive(Debug, PartialEq, PartialOrd, Eq, Ord, Copy, Clone, Hash)]
pub struct GameId(i64);

impl GameId {
    pub fn first_of_day(date: NaiveDate) -> Self {
        Self::with_seq(date, 1)
    }

    pub fn with_seq(date: NaiveDate, seq: u8) -> Self {
        let stem =
            (date.year().rem_euclid(100) as i64 * 100 + date.month() as i64) * 100
                + date.day() as i64;
        GameId(stem * 100 + seq as i64)
    }

    pub fn seq(self) -> u8 {
        (self.0 % 100) as u8
    }

    pub fn next_seq(self) -> Self {
        GameId(self.0 + 1)
    }

    pub fn as_i64(self) -> i64 {
        self.0
    }
}

impl From<i64> for GameId {
    fn from(raw: i64) -> Self {
        GameId(raw)
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08}", self.0)
    }
}

impl FromStr for GameId {
    type Err = ParseIntError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(GameId)
    }
}

impl Serialize for GameId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_i64(self.0)
    }
}

impl<'de> Deserialize<'de> for GameId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        i64::deserialize(deserializer).map(GameId)
    }
}

impl FromSql for GameId {
    fn column_result(value: ValueRef) -> FromSqlResult<Self> {
        value.as_i64().map(GameId)
    }
}

impl ToSql for GameId {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn encodes_date_and_sequence() {
        assert_eq!(GameId::first_of_day(date(2024, 3, 9)).as_i64(), 24030901);
        assert_eq!(GameId::with_seq(date(2019, 12, 31), 7).as_i64(), 19123107);
    }

    #[test]
    fn sequence_accessors() {
        let id = GameId::with_seq(date(2024, 3, 9), 3);
        assert_eq!(id.seq(), 3);
        assert_eq!(id.next_seq().as_i64(), 24030904);
    }

    #[test]
    fn early_century_dates_keep_eight_digits_in_display() {
        let id = GameId::first_of_day(date(2003, 1, 2));
        assert_eq!(id.as_i64(), 3010201);
        assert_eq!(id.to_string(), "03010201");
        assert_eq!("03010201".parse::<GameId>().unwrap(), id);
    }

    #[test]
    fn orders_chronologically_within_a_century() {
        let early = GameId::first_of_day(date(2023, 6, 1));
        let later = GameId::first_of_day(date(2024, 1, 1));
        assert!(early < later);
    }
}
