//! Statistics over recorded games: per-player analysis, club rankings and
//! cumulative trend series. Aggregates that SQLite can do are done in SQL;
//! means, deviations and rates are folded in Rust.

use std::collections::HashMap;

use chrono::NaiveDate;
use itertools::Itertools;
use rusqlite::{Connection, ToSql};

use super::game_id::GameId;
use super::period::{Period, MINIMUM_GAMES_MONTH, MINIMUM_GAMES_TRIMESTER, MINIMUM_GAMES_YEAR};
use super::player::PlayerId;
use super::tournament::TournamentId;
use super::{DataError, Result, Ruleset};

/// Best-single and bucketed rankings only keep the top entries.
pub const RANKING_TOP: u32 = 30;

const DAYS_PER_JULIAN_YEAR: f64 = 365.25;

/// Which value of a score row feeds a statistic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreMode {
    Final,
    Game,
    /// Table points relative to the 30000-point starting stack. RCR only.
    Net,
}

impl ScoreMode {
    fn column_expr(self, ruleset: Ruleset) -> Result<&'static str> {
        match (self, ruleset) {
            (ScoreMode::Final, _) => Ok("s.final_score"),
            (ScoreMode::Game, _) => Ok("s.game_score"),
            (ScoreMode::Net, Ruleset::Rcr) => Ok("s.game_score - 30000"),
            (ScoreMode::Net, Ruleset::Mcr) => Err(DataError::UnsupportedScoreMode {
                ruleset,
                mode: self,
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankingMode {
    TotalScore,
    BestFinalScore,
    MeanFinalScore,
    BestGameScore,
    MeanGameScore,
    WinRate,
    PositiveRate,
    AnnualScore,
    TrimestrialScore,
    MonthlyScore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// One line of a ranking. `value` is whatever the mode ranks by: a score
/// sum, a rounded mean, or a per-mille rate.
#[derive(Debug, Clone, Serialize)]
pub struct RankingRow {
    pub name: String,
    pub display_name: String,
    pub value: i64,
    pub games: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub standard_deviation: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uma_score: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wins: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trimester: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub month: Option<u32>,
}

impl RankingRow {
    fn new(name: String, display_name: String, value: i64, games: u32) -> Self {
        RankingRow {
            name,
            display_name,
            value,
            games,
            standard_deviation: None,
            uma_score: None,
            wins: None,
            date: None,
            year: None,
            trimester: None,
            month: None,
        }
    }
}

/// Tournament plus optional date window; every statistic filters on it.
/// Queries compose their SQL out of these shared from/where fragments.
struct Selection {
    ruleset: Ruleset,
    tournament_id: TournamentId,
    bounds: Option<(NaiveDate, NaiveDate)>,
}

impl Selection {
    fn new(ruleset: Ruleset, tournament_id: TournamentId, period: Period) -> Self {
        Selection {
            ruleset,
            tournament_id,
            bounds: period.bounds(),
        }
    }

    /// `FROM player p JOIN {score} s JOIN {game} g` with the aliases every
    /// stats query uses.
    fn from_clause(&self) -> String {
        format!(
            "FROM player AS p
             JOIN {score} AS s ON s.player_id = p.id
             JOIN {game} AS g ON g.id = s.{game}",
            score = self.ruleset.score_table(),
            game = self.ruleset.game_table(),
        )
    }

    fn where_clause(&self) -> String {
        let mut sql = format!(
            "WHERE g.{}_id = ?",
            self.ruleset.tournament_table()
        );
        if self.bounds.is_some() {
            sql.push_str(" AND g.date >= ? AND g.date < ?");
        }
        sql
    }

    fn params(&self) -> Vec<&dyn ToSql> {
        let mut params: Vec<&dyn ToSql> = vec![&self.tournament_id];
        if let Some((from, to)) = &self.bounds {
            params.push(from);
            params.push(to);
        }
        params
    }
}

// ---------------------------------------------------------------------------
// Player analysis

/// Everything the score-history view of a single player shows: the score
/// and running-total series plus the aggregates folded from them.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct PlayerAnalysis {
    pub games: u32,
    pub game_ids: Vec<GameId>,
    pub scores: Vec<i64>,
    pub running_totals: Vec<i64>,

    pub total: i64,
    pub mean: i64,
    pub standard_deviation: i64,
    pub score_max: i64,
    pub score_min: i64,
    pub total_max: i64,
    pub total_min: i64,

    pub positive_games: u32,
    pub positive_percent: i64,
    pub negative_games: u32,
    pub negative_percent: i64,

    pub four_player_games: u32,
    pub four_player_places: [u32; 4],
    pub four_player_place_percent: [i64; 4],
    pub five_player_games: u32,
    pub five_player_places: [u32; 5],
    pub five_player_place_percent: [i64; 5],
}

struct AnalyzeRow {
    game_id: GameId,
    nb_players: u32,
    place: u32,
    score: i64,
}

pub fn analyze(
    db: &Connection,
    ruleset: Ruleset,
    tournament_id: TournamentId,
    player_id: PlayerId,
    score_mode: ScoreMode,
    period: Period,
) -> Result<PlayerAnalysis> {
    let expr = score_mode.column_expr(ruleset)?;
    let selection = Selection::new(ruleset, tournament_id, period);

    let sql = format!(
        "SELECT g.id, g.nb_players, s.ranking, {expr}
         {from} {filter} AND s.player_id = ?
         ORDER BY g.id ASC",
        from = selection.from_clause(),
        filter = selection.where_clause(),
    );
    let mut params = selection.params();
    params.push(&player_id);

    let rows = db
        .prepare(&sql)?
        .query_map(params.as_slice(), |row| {
            Ok(AnalyzeRow {
                game_id: row.get(0)?,
                nb_players: row.get(1)?,
                place: row.get(2)?,
                score: row.get(3)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(fold_analysis(rows))
}

fn fold_analysis(rows: Vec<AnalyzeRow>) -> PlayerAnalysis {
    if rows.is_empty() {
        return PlayerAnalysis::default();
    }

    let mut a = PlayerAnalysis {
        score_max: i64::MIN,
        score_min: i64::MAX,
        total_max: i64::MIN,
        total_min: i64::MAX,
        ..PlayerAnalysis::default()
    };

    let mut total = 0;
    for row in &rows {
        a.game_ids.push(row.game_id);
        a.scores.push(row.score);

        if row.score >= 0 {
            a.positive_games += 1;
        } else {
            a.negative_games += 1;
        }
        a.score_max = a.score_max.max(row.score);
        a.score_min = a.score_min.min(row.score);

        total += row.score;
        a.running_totals.push(total);
        a.total_max = a.total_max.max(total);
        a.total_min = a.total_min.min(total);

        match row.nb_players {
            4 => {
                a.four_player_places[(row.place - 1) as usize] += 1;
                a.four_player_games += 1;
            }
            5 => {
                a.five_player_places[(row.place - 1) as usize] += 1;
                a.five_player_games += 1;
            }
            _ => {}
        }
        a.games += 1;
    }

    a.total = total;
    let mean = total as f64 / a.games as f64;
    a.mean = mean.round() as i64;
    a.standard_deviation = round_stddev(&a.scores, mean);

    a.positive_percent = percent(a.positive_games, a.games);
    a.negative_percent = percent(a.negative_games, a.games);
    for place in 0..4 {
        a.four_player_place_percent[place] = percent(a.four_player_places[place], a.four_player_games);
    }
    for place in 0..5 {
        a.five_player_place_percent[place] = percent(a.five_player_places[place], a.five_player_games);
    }
    a
}

/// Population standard deviation, rounded; 0 with fewer than two samples.
fn round_stddev(scores: &[i64], mean: f64) -> i64 {
    if scores.len() <= 1 {
        return 0;
    }
    let variance = scores
        .iter()
        .map(|&s| (s as f64 - mean).powi(2))
        .sum::<f64>()
        / scores.len() as f64;
    variance.sqrt().round() as i64
}

/// Rounded integer percentage; 0 when there is nothing to divide by.
fn percent(part: u32, whole: u32) -> i64 {
    if whole == 0 {
        0
    } else {
        (part as f64 * 100.0 / whole as f64).round() as i64
    }
}

/// Rounded per-mille rate, the resolution the rate rankings report.
fn permille(part: u32, whole: u32) -> i64 {
    if whole == 0 {
        0
    } else {
        (part as f64 * 1000.0 / whole as f64).round() as i64
    }
}

// ---------------------------------------------------------------------------
// Rankings

pub fn ranking(
    db: &Connection,
    ruleset: Ruleset,
    tournament_id: TournamentId,
    mode: RankingMode,
    order: SortOrder,
    period: Period,
    use_minimum_games: bool,
) -> Result<Vec<RankingRow>> {
    let selection = Selection::new(ruleset, tournament_id, period);
    let min_games = if use_minimum_games {
        minimum_games(db, &selection, period)?
    } else {
        0
    };

    match mode {
        RankingMode::TotalScore => total_ranking(db, &selection, order, min_games),
        RankingMode::BestFinalScore => {
            best_single_ranking(db, &selection, "s.final_score", ruleset.has_uma(), order)
        }
        RankingMode::BestGameScore => {
            best_single_ranking(db, &selection, "s.game_score", false, order)
        }
        RankingMode::MeanFinalScore => {
            mean_ranking(db, &selection, "s.final_score", order, min_games)
        }
        RankingMode::MeanGameScore => {
            mean_ranking(db, &selection, "s.game_score", order, min_games)
        }
        RankingMode::WinRate => rate_ranking(db, &selection, "s.ranking = 1", order, min_games),
        RankingMode::PositiveRate => {
            rate_ranking(db, &selection, "s.final_score > 0", order, min_games)
        }
        RankingMode::AnnualScore => bucket_ranking(db, &selection, Bucket::Year, order),
        RankingMode::TrimestrialScore => bucket_ranking(db, &selection, Bucket::Trimester, order),
        RankingMode::MonthlyScore => bucket_ranking(db, &selection, Bucket::Month, order),
    }
}

/// Threshold for the minimum-games filter. Fixed per period; for `All` it
/// scales with the number of years the tournament has been running.
fn minimum_games(db: &Connection, selection: &Selection, period: Period) -> Result<u32> {
    if let Some(min) = period.minimum_games() {
        return Ok(min);
    }
    // the aggregates always yield one row; both dates are NULL while the
    // tournament has no games
    let span: (Option<NaiveDate>, Option<NaiveDate>) = db.query_row(
        &format!(
            "SELECT MIN(date), MAX(date) FROM {game} WHERE {tournament}_id = ?",
            game = selection.ruleset.game_table(),
            tournament = selection.ruleset.tournament_table(),
        ),
        [selection.tournament_id],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    Ok(match span {
        (Some(first), Some(last)) => {
            let years = (last - first).num_days() as f64 / DAYS_PER_JULIAN_YEAR;
            (MINIMUM_GAMES_YEAR as f64 * years).round() as u32
        }
        _ => 0,
    })
}

fn having_clause(min_games: u32) -> String {
    if min_games > 0 {
        format!("HAVING COUNT(*) >= {}", min_games)
    } else {
        String::new()
    }
}

fn order_keyword(order: SortOrder) -> &'static str {
    match order {
        SortOrder::Ascending => "ASC",
        SortOrder::Descending => "DESC",
    }
}

fn total_ranking(
    db: &Connection,
    selection: &Selection,
    order: SortOrder,
    min_games: u32,
) -> Result<Vec<RankingRow>> {
    let sql = format!(
        "SELECT p.name, p.display_name, SUM(s.final_score) AS total, COUNT(*) AS n
         {from} {filter}
         GROUP BY p.id {having}
         ORDER BY total {order}",
        from = selection.from_clause(),
        filter = selection.where_clause(),
        having = having_clause(min_games),
        order = order_keyword(order),
    );
    let rows = db
        .prepare(&sql)?
        .query_map(selection.params().as_slice(), |row| {
            Ok(RankingRow::new(row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

fn best_single_ranking(
    db: &Connection,
    selection: &Selection,
    expr: &str,
    with_uma: bool,
    order: SortOrder,
) -> Result<Vec<RankingRow>> {
    let uma_expr = if with_uma { "s.uma_score" } else { "NULL" };
    let sql = format!(
        "SELECT p.name, p.display_name, g.date, {expr} AS best, {uma_expr} AS uma
         {from} {filter}
         ORDER BY best {order}
         LIMIT {top}",
        from = selection.from_clause(),
        filter = selection.where_clause(),
        order = order_keyword(order),
        top = RANKING_TOP,
    );
    let rows = db
        .prepare(&sql)?
        .query_map(selection.params().as_slice(), |row| {
            let mut entry = RankingRow::new(row.get(0)?, row.get(1)?, row.get(3)?, 1);
            entry.date = Some(row.get(2)?);
            entry.uma_score = row.get(4)?;
            Ok(entry)
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

/// Mean and population standard deviation per player, folded in Rust since
/// SQLite has no STDDEV_POP.
fn mean_ranking(
    db: &Connection,
    selection: &Selection,
    expr: &str,
    order: SortOrder,
    min_games: u32,
) -> Result<Vec<RankingRow>> {
    struct Acc {
        name: String,
        display_name: String,
        scores: Vec<i64>,
    }

    let sql = format!(
        "SELECT p.id, p.name, p.display_name, {expr}
         {from} {filter}",
        from = selection.from_clause(),
        filter = selection.where_clause(),
    );
    let mut accs: HashMap<PlayerId, Acc> = HashMap::new();
    db.prepare(&sql)?
        .query_map(selection.params().as_slice(), |row| {
            Ok((
                row.get::<_, PlayerId>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, i64>(3)?,
            ))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?
        .into_iter()
        .for_each(|(id, name, display_name, score)| {
            accs.entry(id)
                .or_insert_with(|| Acc {
                    name,
                    display_name,
                    scores: Vec::new(),
                })
                .scores
                .push(score);
        });

    let mut rows: Vec<RankingRow> = accs
        .into_values()
        .filter(|acc| acc.scores.len() as u32 >= min_games.max(1))
        .map(|acc| {
            let n = acc.scores.len() as u32;
            let mean = acc.scores.iter().sum::<i64>() as f64 / n as f64;
            let mut entry =
                RankingRow::new(acc.name, acc.display_name, mean.round() as i64, n);
            entry.standard_deviation = Some(round_stddev(&acc.scores, mean));
            entry
        })
        .collect();
    sort_rows(&mut rows, order);
    Ok(rows)
}

/// Per-mille rate of games matching `condition` (first places for the win
/// rate, positive results for the positive rate). Two grouped counts merged
/// by player id.
fn rate_ranking(
    db: &Connection,
    selection: &Selection,
    condition: &str,
    order: SortOrder,
    min_games: u32,
) -> Result<Vec<RankingRow>> {
    let games_sql = format!(
        "SELECT p.id, p.name, p.display_name, COUNT(*) AS n
         {from} {filter}
         GROUP BY p.id {having}",
        from = selection.from_clause(),
        filter = selection.where_clause(),
        having = having_clause(min_games),
    );
    let mut by_player: HashMap<PlayerId, RankingRow> = db
        .prepare(&games_sql)?
        .query_map(selection.params().as_slice(), |row| {
            Ok((
                row.get::<_, PlayerId>(0)?,
                RankingRow::new(row.get(1)?, row.get(2)?, 0, row.get(3)?),
            ))
        })?
        .collect::<rusqlite::Result<HashMap<_, _>>>()?;

    let wins_sql = format!(
        "SELECT p.id, COUNT(*) AS n
         {from} {filter} AND {condition}
         GROUP BY p.id",
        from = selection.from_clause(),
        filter = selection.where_clause(),
    );
    let wins = db
        .prepare(&wins_sql)?
        .query_map(selection.params().as_slice(), |row| {
            Ok((row.get::<_, PlayerId>(0)?, row.get::<_, u32>(1)?))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    for (player_id, count) in wins {
        // Filtered-out players are absent from the first query on purpose.
        if let Some(entry) = by_player.get_mut(&player_id) {
            entry.wins = Some(count);
            entry.value = permille(count, entry.games);
        }
    }

    let mut rows: Vec<RankingRow> = by_player
        .into_values()
        .map(|mut entry| {
            entry.wins.get_or_insert(0);
            entry
        })
        .collect();
    sort_rows(&mut rows, order);
    Ok(rows)
}

enum Bucket {
    Year,
    Trimester,
    Month,
}

impl Bucket {
    fn exprs(&self) -> &'static str {
        match self {
            Bucket::Year => "CAST(strftime('%Y', g.date) AS INTEGER) AS y",
            Bucket::Trimester => {
                "CAST(strftime('%Y', g.date) AS INTEGER) AS y,
                 (CAST(strftime('%m', g.date) AS INTEGER) + 2) / 3 AS b"
            }
            Bucket::Month => {
                "CAST(strftime('%Y', g.date) AS INTEGER) AS y,
                 CAST(strftime('%m', g.date) AS INTEGER) AS b"
            }
        }
    }

    fn group_by(&self) -> &'static str {
        match self {
            Bucket::Year => "p.id, y",
            _ => "p.id, y, b",
        }
    }

    fn minimum_games(&self) -> u32 {
        match self {
            Bucket::Year => MINIMUM_GAMES_YEAR,
            Bucket::Trimester => MINIMUM_GAMES_TRIMESTER,
            Bucket::Month => MINIMUM_GAMES_MONTH,
        }
    }
}

/// Best (player, calendar bucket) score sums over the whole tournament.
/// The period filter does not apply: the buckets are the periods.
fn bucket_ranking(
    db: &Connection,
    selection: &Selection,
    bucket: Bucket,
    order: SortOrder,
) -> Result<Vec<RankingRow>> {
    let unbounded = Selection {
        ruleset: selection.ruleset,
        tournament_id: selection.tournament_id,
        bounds: None,
    };
    let sql = format!(
        "SELECT p.name, p.display_name, {exprs}, SUM(s.final_score) AS total, COUNT(*) AS n
         {from} {filter}
         GROUP BY {group}
         HAVING COUNT(*) >= {min}
         ORDER BY total {order}
         LIMIT {top}",
        exprs = bucket.exprs(),
        from = unbounded.from_clause(),
        filter = unbounded.where_clause(),
        group = bucket.group_by(),
        min = bucket.minimum_games(),
        order = order_keyword(order),
        top = RANKING_TOP,
    );
    let has_sub_bucket = !matches!(bucket, Bucket::Year);
    let rows = db
        .prepare(&sql)?
        .query_map(unbounded.params().as_slice(), |row| {
            let (total_idx, n_idx) = if has_sub_bucket { (4, 5) } else { (3, 4) };
            let mut entry = RankingRow::new(
                row.get(0)?,
                row.get(1)?,
                row.get(total_idx)?,
                row.get(n_idx)?,
            );
            entry.year = Some(row.get(2)?);
            if has_sub_bucket {
                match bucket {
                    Bucket::Trimester => entry.trimester = Some(row.get(3)?),
                    Bucket::Month => entry.month = Some(row.get(3)?),
                    Bucket::Year => unreachable!(),
                }
            }
            Ok(entry)
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

fn sort_rows(rows: &mut [RankingRow], order: SortOrder) {
    match order {
        SortOrder::Ascending => rows.sort_by_key(|r| r.value),
        SortOrder::Descending => rows.sort_by_key(|r| std::cmp::Reverse(r.value)),
    }
}

// ---------------------------------------------------------------------------
// Trend

/// Shared date axis plus one cumulative final-score series per player.
/// `running_totals[i]` is the player's total after every game up to and
/// including `dates[i]`; a player idle on a date carries the previous total.
#[derive(Debug, Clone, Serialize)]
pub struct Trend {
    pub dates: Vec<NaiveDate>,
    pub players: Vec<TrendLine>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrendLine {
    pub player_id: PlayerId,
    pub name: String,
    pub display_name: String,
    pub running_totals: Vec<i64>,
}

pub fn trend(
    db: &Connection,
    ruleset: Ruleset,
    tournament_id: TournamentId,
    period: Period,
) -> Result<Trend> {
    let selection = Selection::new(ruleset, tournament_id, period);

    let players_sql = format!(
        "SELECT DISTINCT p.id, p.name, p.display_name
         {from} {filter}
         ORDER BY p.id",
        from = selection.from_clause(),
        filter = selection.where_clause(),
    );
    let players = db
        .prepare(&players_sql)?
        .query_map(selection.params().as_slice(), |row| {
            Ok(TrendLine {
                player_id: row.get(0)?,
                name: row.get(1)?,
                display_name: row.get(2)?,
                running_totals: Vec::new(),
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let sums_sql = format!(
        "SELECT g.date, s.player_id, SUM(s.final_score)
         {from} {filter}
         GROUP BY g.date, s.player_id
         ORDER BY g.date",
        from = selection.from_clause(),
        filter = selection.where_clause(),
    );
    let rows = db
        .prepare(&sums_sql)?
        .query_map(selection.params().as_slice(), |row| {
            Ok((
                row.get::<_, NaiveDate>(0)?,
                row.get::<_, PlayerId>(1)?,
                row.get::<_, i64>(2)?,
            ))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(fold_trend(players, rows))
}

fn fold_trend(mut players: Vec<TrendLine>, rows: Vec<(NaiveDate, PlayerId, i64)>) -> Trend {
    let index: HashMap<PlayerId, usize> = players
        .iter()
        .enumerate()
        .map(|(i, line)| (line.player_id, i))
        .collect();

    let mut dates = Vec::new();
    for (date, day_rows) in &rows.into_iter().group_by(|(date, ..)| *date) {
        dates.push(date);
        for line in &mut players {
            let carried = line.running_totals.last().copied().unwrap_or(0);
            line.running_totals.push(carried);
        }
        for (_, player_id, sum) in day_rows {
            if let Some(&i) = index.get(&player_id) {
                *players[i].running_totals.last_mut().expect("pushed above") += sum;
            }
        }
    }
    Trend { dates, players }
}
