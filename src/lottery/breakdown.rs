//! Direct (unexpanded) breakdown of bets per category, and the
//! booked/unbooked coverage derived from it

use crate::errors::{BookResult, ExportError};
use crate::lottery::number_space;
use crate::lottery::types::{Bet, Condition, ConditionFilter, Draw, GameType};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Stake booked on one number as written
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NumberStats {
    pub total_stake: Decimal,
    pub count: usize,
}

impl NumberStats {
    fn add(&mut self, stake: Decimal, count: usize) {
        self.total_stake += stake;
        self.count += count;
    }
}

/// number as written -> stats
pub type DirectBreakdown = BTreeMap<String, NumberStats>;

/// game type -> condition -> number -> stats
pub type GameBreakdown = BTreeMap<GameType, BTreeMap<Condition, DirectBreakdown>>;

/// Group every bet of the draw by category, condition and number
pub fn game_breakdown(draw: &Draw, bets: &[Bet]) -> GameBreakdown {
    let mut breakdown = GameBreakdown::new();
    for bet in bets.iter().filter(|b| b.draw_id == draw.id) {
        breakdown
            .entry(bet.game_type)
            .or_default()
            .entry(bet.condition)
            .or_default()
            .entry(bet.number.clone())
            .or_default()
            .add(bet.stake, 1);
    }
    breakdown
}

/// One category's breakdown; `All` merges both conditions
pub fn direct_breakdown(
    draw: &Draw,
    bets: &[Bet],
    game_type: GameType,
    filter: ConditionFilter,
) -> DirectBreakdown {
    let mut merged = DirectBreakdown::new();
    let full = game_breakdown(draw, bets);
    let Some(per_condition) = full.get(&game_type) else {
        return merged;
    };
    for (condition, numbers) in per_condition {
        if !filter.matches(*condition) {
            continue;
        }
        for (number, stats) in numbers {
            merged
                .entry(number.clone())
                .or_default()
                .add(stats.total_stake, stats.count);
        }
    }
    merged
}

/// Entries sorted by stake, largest first; ties keep number order
pub fn by_stake_desc(breakdown: &DirectBreakdown) -> Vec<(&str, &NumberStats)> {
    let mut entries: Vec<(&str, &NumberStats)> =
        breakdown.iter().map(|(k, v)| (k.as_str(), v)).collect();
    entries.sort_by(|a, b| b.1.total_stake.cmp(&a.1.total_stake));
    entries
}

/// Every number of the category's space that nobody booked, ascending.
/// Empty for categories without a finite space.
pub fn unbooked_numbers(game_type: GameType, breakdown: &DirectBreakdown) -> Vec<String> {
    let booked: BTreeSet<&str> = breakdown.keys().map(String::as_str).collect();
    number_space::space(game_type)
        .into_iter()
        .filter(|n| !booked.contains(n.as_str()))
        .collect()
}

/// Booked vs unbooked counts for one category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coverage {
    pub game_type: GameType,
    pub total_possible: usize,
    pub booked: usize,
    pub unbooked: usize,
    /// Percentages with two decimals
    pub booked_percent: Decimal,
    pub unbooked_percent: Decimal,
}

pub fn coverage(game_type: GameType, breakdown: &DirectBreakdown) -> Coverage {
    let total_possible = number_space::total_outcomes(game_type);
    let booked = breakdown.len();
    if total_possible == 0 {
        return Coverage {
            game_type,
            total_possible,
            booked,
            unbooked: 0,
            booked_percent: Decimal::ZERO,
            unbooked_percent: Decimal::ZERO,
        };
    }

    let unbooked = total_possible.saturating_sub(booked);
    let percent = |n: usize| {
        (Decimal::from(n) * Decimal::ONE_HUNDRED / Decimal::from(total_possible)).round_dp(2)
    };
    Coverage {
        game_type,
        total_possible,
        booked,
        unbooked,
        booked_percent: percent(booked),
        unbooked_percent: percent(unbooked),
    }
}

/// `unbooked_numbers_{GAME_TYPE}_draw_{drawName}.txt`
pub fn unbooked_export_filename(game_type: GameType, draw: &Draw) -> String {
    format!("unbooked_numbers_{}_draw_{}.txt", game_type, draw.name)
}

/// Newline-joined export body
pub fn unbooked_export_body(numbers: &[String]) -> String {
    numbers.join("\n")
}

/// Write the unbooked list into `dir`, returning the file path. A fully
/// booked category writes nothing and yields `None`.
pub fn export_unbooked(
    game_type: GameType,
    draw: &Draw,
    numbers: &[String],
    dir: &Path,
) -> BookResult<Option<PathBuf>> {
    if numbers.is_empty() {
        debug!(draw_id = %draw.id, game_type = %game_type, "no unbooked numbers; nothing exported");
        return Ok(None);
    }
    let path = dir.join(unbooked_export_filename(game_type, draw));
    std::fs::write(&path, unbooked_export_body(numbers)).map_err(|e| ExportError::WriteFailed {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    info!(
        draw_id = %draw.id,
        game_type = %game_type,
        count = numbers.len(),
        path = %path.display(),
        "unbooked numbers exported"
    );
    Ok(Some(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::BookError;
    use crate::lottery::test_support::{bet, draw};
    use crate::lottery::types::DrawStatus;
    use rust_decimal_macros::dec;

    fn sample_bets() -> Vec<Bet> {
        vec![
            bet("b1", "c1", GameType::TwoDigits, "12", Condition::First, dec!(10)),
            bet("b2", "c2", GameType::TwoDigits, "12", Condition::Second, dec!(5)),
            bet("b3", "c1", GameType::TwoDigits, "99", Condition::First, dec!(40)),
            bet("b4", "c1", GameType::ThreeDigits, "123", Condition::First, dec!(1)),
        ]
    }

    #[test]
    fn test_direct_breakdown_merges_conditions() {
        let d = draw(DrawStatus::Closed, &[]);
        let all = direct_breakdown(&d, &sample_bets(), GameType::TwoDigits, ConditionFilter::All);

        assert_eq!(all.len(), 2);
        assert_eq!(all["12"], NumberStats { total_stake: dec!(15), count: 2 });
        assert_eq!(all["99"].count, 1);

        let second = direct_breakdown(&d, &sample_bets(), GameType::TwoDigits, ConditionFilter::Second);
        assert_eq!(second.len(), 1);
        assert_eq!(second["12"].total_stake, dec!(5));
    }

    #[test]
    fn test_game_breakdown_groups_by_condition() {
        let d = draw(DrawStatus::Closed, &[]);
        let full = game_breakdown(&d, &sample_bets());

        assert_eq!(full[&GameType::TwoDigits][&Condition::First].len(), 2);
        assert_eq!(full[&GameType::TwoDigits][&Condition::Second].len(), 1);
        assert!(full.get(&GameType::Combo).is_none());
    }

    #[test]
    fn test_sorted_by_stake() {
        let d = draw(DrawStatus::Closed, &[]);
        let all = direct_breakdown(&d, &sample_bets(), GameType::TwoDigits, ConditionFilter::All);
        let sorted = by_stake_desc(&all);
        assert_eq!(sorted[0].0, "99");
        assert_eq!(sorted[1].0, "12");
    }

    #[test]
    fn test_unbooked_and_coverage() {
        let d = draw(DrawStatus::Closed, &[]);
        let all = direct_breakdown(&d, &sample_bets(), GameType::TwoDigits, ConditionFilter::All);
        let unbooked = unbooked_numbers(GameType::TwoDigits, &all);

        assert_eq!(unbooked.len(), 98);
        assert_eq!(unbooked[0], "00");
        assert!(!unbooked.contains(&"12".to_string()));

        let cov = coverage(GameType::TwoDigits, &all);
        assert_eq!(cov.booked, 2);
        assert_eq!(cov.unbooked, 98);
        assert_eq!(cov.booked_percent, dec!(2.00));
        assert_eq!(cov.unbooked_percent, dec!(98.00));

        let json = serde_json::to_value(&cov).unwrap();
        assert_eq!(json["gameType"], "TWO_DIGITS");
        assert!(json.get("bookedPercent").is_some());
        assert!(serde_json::to_value(all["12"]).unwrap().get("totalStake").is_some());
    }

    #[test]
    fn test_unbounded_categories_have_no_space() {
        let d = draw(DrawStatus::Closed, &[]);
        let bets = vec![bet("b1", "c1", GameType::Positional, "1X2X", Condition::First, dec!(1))];
        let pos = direct_breakdown(&d, &bets, GameType::Positional, ConditionFilter::All);

        assert!(unbooked_numbers(GameType::Positional, &pos).is_empty());
        let cov = coverage(GameType::Positional, &pos);
        assert_eq!(cov.booked, 1);
        assert_eq!(cov.booked_percent, Decimal::ZERO);
    }

    #[test]
    fn test_export_unbooked_file() {
        let dir = tempfile::tempdir().unwrap();
        let d = draw(DrawStatus::Closed, &[]);
        let numbers = vec!["0".to_string(), "3".to_string()];

        let path = export_unbooked(GameType::OneDigit, &d, &numbers, dir.path())
            .unwrap()
            .unwrap();
        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "unbooked_numbers_ONE_DIGIT_draw_101.txt"
        );
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "0\n3");
    }

    #[test]
    fn test_fully_booked_export_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let d = draw(DrawStatus::Closed, &[]);
        let exported = export_unbooked(GameType::OneDigit, &d, &[], dir.path()).unwrap();
        assert!(exported.is_none());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_export_into_missing_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        let d = draw(DrawStatus::Closed, &[]);
        let missing = dir.path().join("absent");
        let result = export_unbooked(GameType::OneDigit, &d, &["4".to_string()], &missing);
        assert!(matches!(result, Err(BookError::Export(ExportError::WriteFailed { .. }))));
    }
}
