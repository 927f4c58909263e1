use chrono::NaiveDate;

use super::{DataError, Result};

pub const MINIMUM_GAMES_MONTH: u32 = 2;
pub const MINIMUM_GAMES_TRIMESTER: u32 = 5;
pub const MINIMUM_GAMES_YEAR: u32 = 20;

/// Date window a statistic is computed over. Anything but `All` resolves to
/// a half-open range `[from, to)` on the game date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    All,
    Year(i32),
    /// Quarter of a year, 1 through 4.
    Trimester(i32, u32),
    /// Calendar month, 1 through 12.
    Month(i32, u32),
}

impl Period {
    pub fn year(year: i32) -> Result<Self> {
        check_year(year)?;
        Ok(Period::Year(year))
    }

    pub fn trimester(year: i32, trimester: u32) -> Result<Self> {
        check_year(year)?;
        if !(1..=4).contains(&trimester) {
            return Err(DataError::InvalidPeriod(format!(
                "trimester must be 1-4, got {}",
                trimester
            )));
        }
        Ok(Period::Trimester(year, trimester))
    }

    pub fn month(year: i32, month: u32) -> Result<Self> {
        check_year(year)?;
        if !(1..=12).contains(&month) {
            return Err(DataError::InvalidPeriod(format!(
                "month must be 1-12, got {}",
                month
            )));
        }
        Ok(Period::Month(year, month))
    }

    /// `None` for `All`, otherwise the `[from, to)` date range. The fourth
    /// trimester and December roll over into January of the next year.
    pub fn bounds(self) -> Option<(NaiveDate, NaiveDate)> {
        match self {
            Period::All => None,
            Period::Year(y) => Some((first_of(y, 1), first_of(y + 1, 1))),
            Period::Trimester(y, t) => {
                let from = first_of(y, 3 * t - 2);
                let to = if t == 4 { first_of(y + 1, 1) } else { first_of(y, 3 * t + 1) };
                Some((from, to))
            }
            Period::Month(y, m) => {
                let from = first_of(y, m);
                let to = if m == 12 { first_of(y + 1, 1) } else { first_of(y, m + 1) };
                Some((from, to))
            }
        }
    }

    /// Minimum games a player must have to appear in a ranking over this
    /// period. `None` for `All`, whose threshold depends on the span of
    /// recorded games and is computed by the caller.
    pub fn minimum_games(self) -> Option<u32> {
        match self {
            Period::All => None,
            Period::Year(_) => Some(MINIMUM_GAMES_YEAR),
            Period::Trimester(..) => Some(MINIMUM_GAMES_TRIMESTER),
            Period::Month(..) => Some(MINIMUM_GAMES_MONTH),
        }
    }
}

fn check_year(year: i32) -> Result<()> {
    // The game id encoding carries a two-digit year, so the recorder only
    // deals in contemporary dates.
    if (1900..=9999).contains(&year) {
        Ok(())
    } else {
        Err(DataError::InvalidPeriod(format!("year out of range: {}", year)))
    }
}

fn first_of(year: i32, month: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, 1).expect("checked period date")
}
