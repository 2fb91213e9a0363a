//! Outcome book: per-outcome exposure across every bet of a draw
//!
//! Every bet adds its full stake, commission and potential prize to each
//! outcome it covers. The resulting `net_total` of a row is the house
//! position if exactly that outcome is declared.

use crate::lottery::expander;
use crate::lottery::rates;
use crate::lottery::types::{Bet, Bucket, Client, Condition, ConditionFilter, Draw, GameType};
use rayon::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, trace, warn};

/// Exposure for one canonical outcome
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutcomeRow {
    pub outcome: String,
    pub total_stake: Decimal,
    pub total_commission: Decimal,
    pub potential_prize: Decimal,
    /// Stake per bucket, the comprehensive-book split of `total_stake`
    pub stake_by_bucket: BTreeMap<Bucket, Decimal>,
    /// Numbers as written that contributed, deduplicated per bucket
    pub sources_by_bucket: BTreeMap<Bucket, BTreeSet<String>>,
}

impl OutcomeRow {
    fn new(outcome: String) -> Self {
        Self {
            outcome,
            ..Default::default()
        }
    }

    /// House position if this outcome is declared (positive = profit)
    pub fn net_total(&self) -> Decimal {
        self.total_stake - self.total_commission - self.potential_prize
    }

    pub fn sources(&self, bucket: Bucket) -> impl Iterator<Item = &str> {
        self.sources_by_bucket
            .get(&bucket)
            .into_iter()
            .flat_map(|s| s.iter().map(String::as_str))
    }

    pub fn bucket_stake(&self, bucket: Bucket) -> Decimal {
        self.stake_by_bucket
            .get(&bucket)
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    fn absorb(&mut self, other: OutcomeRow) {
        self.total_stake += other.total_stake;
        self.total_commission += other.total_commission;
        self.potential_prize += other.potential_prize;
        for (bucket, stake) in other.stake_by_bucket {
            *self.stake_by_bucket.entry(bucket).or_default() += stake;
        }
        for (bucket, sources) in other.sources_by_bucket {
            self.sources_by_bucket.entry(bucket).or_default().extend(sources);
        }
    }
}

/// Per-outcome rollup for one draw and condition filter
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutcomeBook {
    pub draw_id: String,
    pub filter: ConditionFilter,
    pub bets_folded: usize,
    pub bets_dropped: usize,
    rows: BTreeMap<String, OutcomeRow>,
}

impl OutcomeBook {
    pub fn new(draw_id: &str, filter: ConditionFilter) -> Self {
        Self {
            draw_id: draw_id.to_string(),
            filter,
            ..Default::default()
        }
    }

    pub fn get(&self, outcome: &str) -> Option<&OutcomeRow> {
        self.rows.get(outcome)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows in ascending outcome order
    pub fn rows(&self) -> Vec<&OutcomeRow> {
        self.rows.values().collect()
    }

    pub fn into_rows(self) -> Vec<OutcomeRow> {
        self.rows.into_values().collect()
    }

    /// Sum of stake over every outcome (the exposure total)
    pub fn total_exposure(&self) -> Decimal {
        self.rows.values().map(|r| r.total_stake).sum()
    }

    /// Fold one bet whose owner is already resolved
    pub fn add_bet(&mut self, bet: &Bet, client: &Client) {
        let commission = rates::commission_amount(bet, client);
        let prize = rates::potential_prize_amount(bet, client);
        let expansion = expander::expand(bet);
        let bucket = expansion.bucket;
        let label = expansion.source_label.clone();

        for outcome in expansion {
            let row = self
                .rows
                .entry(outcome)
                .or_insert_with_key(|k| OutcomeRow::new(k.clone()));
            row.total_stake += bet.stake;
            row.total_commission += commission;
            row.potential_prize += prize;
            *row.stake_by_bucket.entry(bucket).or_default() += bet.stake;
            row.sources_by_bucket
                .entry(bucket)
                .or_default()
                .insert(label.clone());
        }
        self.bets_folded += 1;
    }

    /// Combine a partial book built over a disjoint slice of the same bets
    pub fn merge(&mut self, other: OutcomeBook) {
        self.bets_folded += other.bets_folded;
        self.bets_dropped += other.bets_dropped;
        for (outcome, row) in other.rows {
            match self.rows.get_mut(&outcome) {
                Some(existing) => existing.absorb(row),
                None => {
                    self.rows.insert(outcome, row);
                }
            }
        }
    }
}

/// Bets of the draw that pass the filter
pub fn select_bets<'a>(
    draw_id: &'a str,
    bets: &'a [Bet],
    filter: ConditionFilter,
) -> impl Iterator<Item = &'a Bet> + 'a {
    bets.iter()
        .filter(move |b| b.draw_id == draw_id && filter.matches(b.condition))
}

pub fn client_index(clients: &[Client]) -> HashMap<&str, &Client> {
    clients.iter().map(|c| (c.id.as_str(), c)).collect()
}

fn fold<'a>(
    draw_id: &str,
    filter: ConditionFilter,
    bets: impl Iterator<Item = &'a Bet>,
    clients: &HashMap<&str, &Client>,
) -> OutcomeBook {
    let mut book = OutcomeBook::new(draw_id, filter);
    for bet in bets {
        match clients.get(bet.client_id.as_str()) {
            Some(client) => book.add_bet(bet, client),
            None => {
                warn!(
                    bet_id = %bet.id,
                    client_id = %bet.client_id,
                    draw_id = %draw_id,
                    "bet references unknown client; excluded from book"
                );
                book.bets_dropped += 1;
            }
        }
    }
    book
}

/// Build the outcome book for a draw in one sequential pass
pub fn aggregate(
    draw_id: &str,
    bets: &[Bet],
    clients: &[Client],
    filter: ConditionFilter,
) -> OutcomeBook {
    let index = client_index(clients);
    let book = fold(draw_id, filter, select_bets(draw_id, bets, filter), &index);
    debug!(
        draw_id = %draw_id,
        filter = %filter,
        bets = book.bets_folded,
        dropped = book.bets_dropped,
        outcomes = book.len(),
        "outcome book built"
    );
    book
}

/// Same result as [`aggregate`], folded over `partitions` chunks in
/// parallel and merged
pub fn aggregate_partitioned(
    draw_id: &str,
    bets: &[Bet],
    clients: &[Client],
    filter: ConditionFilter,
    partitions: usize,
) -> OutcomeBook {
    let selected: Vec<&Bet> = select_bets(draw_id, bets, filter).collect();
    let index = client_index(clients);
    let chunk = selected.len().div_ceil(partitions.max(1)).max(1);

    let book = selected
        .par_chunks(chunk)
        .map(|part| {
            trace!(draw_id = %draw_id, bets = part.len(), "folding partition");
            fold(draw_id, filter, part.iter().copied(), &index)
        })
        .reduce(
            || OutcomeBook::new(draw_id, filter),
            |mut acc, part| {
                acc.merge(part);
                acc
            },
        );
    debug!(
        draw_id = %draw_id,
        filter = %filter,
        partitions,
        bets = book.bets_folded,
        dropped = book.bets_dropped,
        outcomes = book.len(),
        "outcome book built"
    );
    book
}

/// Convenience over [`aggregate`] taking the draw record
pub fn build_outcome_book(
    draw: &Draw,
    bets: &[Bet],
    clients: &[Client],
    filter: ConditionFilter,
) -> OutcomeBook {
    aggregate(&draw.id, bets, clients, filter)
}

/// One bet's contribution to an outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutcomeContribution {
    pub bet_id: String,
    pub client_id: String,
    pub username: String,
    pub game_type: GameType,
    pub number: String,
    pub condition: Condition,
    pub stake: Decimal,
    pub commission: Decimal,
    pub potential_prize: Decimal,
}

/// Bets behind one row of the book, in input order
pub fn outcome_detail(
    draw: &Draw,
    bets: &[Bet],
    clients: &[Client],
    filter: ConditionFilter,
    outcome: &str,
) -> Vec<OutcomeContribution> {
    let index = client_index(clients);
    select_bets(&draw.id, bets, filter)
        .filter(|bet| expander::covers(bet, outcome))
        .filter_map(|bet| {
            let client = index.get(bet.client_id.as_str())?;
            Some(OutcomeContribution {
                bet_id: bet.id.clone(),
                client_id: client.client_id.clone(),
                username: client.username.clone(),
                game_type: bet.game_type,
                number: bet.number.clone(),
                condition: bet.condition,
                stake: bet.stake,
                commission: rates::commission_amount(bet, client),
                potential_prize: rates::potential_prize_amount(bet, client),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lottery::test_support::{bet, client, draw, DRAW_ID};
    use crate::lottery::types::{DrawStatus, PrizeRate};
    use rust_decimal_macros::dec;

    #[test]
    fn test_three_digit_bet_without_rates() {
        let bets = vec![bet("b1", "c1", GameType::ThreeDigits, "123", Condition::First, dec!(100))];
        let book = aggregate(DRAW_ID, &bets, &[client("c1")], ConditionFilter::All);

        assert_eq!(book.len(), 10);
        for i in 0..10 {
            let row = book.get(&format!("123{}", i)).unwrap();
            assert_eq!(row.total_stake, dec!(100));
            assert_eq!(row.total_commission, Decimal::ZERO);
            assert_eq!(row.potential_prize, Decimal::ZERO);
            assert_eq!(row.net_total(), dec!(100));
        }
    }

    #[test]
    fn test_commission_applies_to_every_outcome() {
        let mut c = client("c1");
        c.commission_rates.insert(GameType::ThreeDigits, dec!(5));
        let bets = vec![bet("b1", "c1", GameType::ThreeDigits, "123", Condition::First, dec!(100))];
        let book = aggregate(DRAW_ID, &bets, &[c], ConditionFilter::All);

        assert!(book.rows().iter().all(|r| r.total_commission == dec!(5)));
    }

    #[test]
    fn test_overlapping_bets_accumulate_and_dedupe_sources() {
        let mut c = client("c1");
        c.prize_rates
            .set_flat(GameType::FourDigits, PrizeRate::new(dec!(800), dec!(200)));
        let bets = vec![
            bet("b1", "c1", GameType::FourDigits, "1234", Condition::First, dec!(10)),
            bet("b2", "c1", GameType::ThreeDigits, "123", Condition::First, dec!(20)),
            bet("b3", "c1", GameType::ThreeDigits, "123", Condition::First, dec!(5)),
        ];
        let book = aggregate(DRAW_ID, &bets, &[c], ConditionFilter::All);

        let row = book.get("1234").unwrap();
        assert_eq!(row.total_stake, dec!(35));
        assert_eq!(row.potential_prize, dec!(80));
        assert_eq!(row.net_total(), dec!(-45));
        assert_eq!(row.bucket_stake(Bucket::ThreeDigits), dec!(25));
        assert_eq!(row.bucket_stake(Bucket::FourDigits), dec!(10));
        assert_eq!(row.sources(Bucket::ThreeDigits).collect::<Vec<_>>(), vec!["123"]);

        let other = book.get("1230").unwrap();
        assert_eq!(other.total_stake, dec!(25));
        assert!(other.sources(Bucket::FourDigits).next().is_none());
    }

    #[test]
    fn test_condition_filter_and_draw_selection() {
        let mut foreign = bet("b3", "c1", GameType::FourDigits, "1111", Condition::First, dec!(1));
        foreign.draw_id = "draw-2".to_string();
        let bets = vec![
            bet("b1", "c1", GameType::FourDigits, "1111", Condition::First, dec!(10)),
            bet("b2", "c1", GameType::FourDigits, "1111", Condition::Second, dec!(7)),
            foreign,
        ];
        let clients = [client("c1")];

        let all = aggregate(DRAW_ID, &bets, &clients, ConditionFilter::All);
        let first = aggregate(DRAW_ID, &bets, &clients, ConditionFilter::First);
        let second = aggregate(DRAW_ID, &bets, &clients, ConditionFilter::Second);

        assert_eq!(all.get("1111").unwrap().total_stake, dec!(17));
        assert_eq!(first.get("1111").unwrap().total_stake, dec!(10));
        assert_eq!(second.get("1111").unwrap().total_stake, dec!(7));
    }

    #[test]
    fn test_book_serializes_camel_case() {
        let bets = vec![bet("b1", "c1", GameType::ThreeDigits, "123", Condition::First, dec!(100))];
        let book = aggregate(DRAW_ID, &bets, &[client("c1")], ConditionFilter::All);
        let json = serde_json::to_value(&book).unwrap();

        assert_eq!(json["drawId"], DRAW_ID);
        assert_eq!(json["betsFolded"], 1);
        let row = &json["rows"]["1230"];
        assert!(row.get("totalStake").is_some());
        assert!(row.get("potentialPrize").is_some());
        assert_eq!(row["sourcesByBucket"]["3D"][0], "123");
        assert!(row.get("total_stake").is_none());
    }

    #[test]
    fn test_unknown_client_is_dropped() {
        let bets = vec![
            bet("b1", "ghost", GameType::FourDigits, "1111", Condition::First, dec!(10)),
            bet("b2", "c1", GameType::FourDigits, "2222", Condition::First, dec!(10)),
        ];
        let book = aggregate(DRAW_ID, &bets, &[client("c1")], ConditionFilter::All);

        assert!(book.get("1111").is_none());
        assert_eq!(book.bets_folded, 1);
        assert_eq!(book.bets_dropped, 1);
    }

    #[test]
    fn test_positional_has_own_bucket() {
        let bets = vec![bet("b1", "c1", GameType::Positional, "1X2X", Condition::First, dec!(50))];
        let book = aggregate(DRAW_ID, &bets, &[client("c1")], ConditionFilter::All);

        assert_eq!(book.len(), 100);
        let row = book.get("1027").unwrap();
        assert_eq!(row.sources(Bucket::Positional).collect::<Vec<_>>(), vec!["1X2X"]);
        assert!(row.sources(Bucket::TwoDigits).next().is_none());
    }

    #[test]
    fn test_partitioned_matches_sequential() {
        let mut c = client("c1");
        c.commission_rates.insert(GameType::TwoDigits, dec!(3.5));
        c.prize_rates
            .set_flat(GameType::TwoDigits, PrizeRate::new(dec!(70), dec!(20)));
        let bets: Vec<Bet> = (0..40)
            .map(|i| {
                let condition = if i % 2 == 0 { Condition::First } else { Condition::Second };
                bet(&format!("b{}", i), "c1", GameType::TwoDigits, &format!("{:02}", i % 7), condition, dec!(3))
            })
            .collect();

        let sequential = aggregate(DRAW_ID, &bets, &[c.clone()], ConditionFilter::All);
        let partitioned = aggregate_partitioned(DRAW_ID, &bets, &[c], ConditionFilter::All, 6);

        assert_eq!(sequential.rows(), partitioned.rows());
        assert_eq!(sequential.bets_folded, partitioned.bets_folded);
    }

    #[test]
    fn test_outcome_detail_lists_covering_bets() {
        let mut c = client("c1");
        c.commission_rates.insert(GameType::OneDigit, dec!(10));
        let bets = vec![
            bet("b1", "c1", GameType::OneDigit, "4", Condition::First, dec!(10)),
            bet("b2", "c1", GameType::Positional, "X5XX", Condition::First, dec!(2)),
            bet("b3", "c1", GameType::FourDigits, "9999", Condition::First, dec!(1)),
        ];
        let d = draw(DrawStatus::Closed, &[]);
        let detail = outcome_detail(&d, &bets, &[c], ConditionFilter::All, "4500");

        let ids: Vec<&str> = detail.iter().map(|d| d.bet_id.as_str()).collect();
        assert_eq!(ids, vec!["b1", "b2"]);
        assert_eq!(detail[0].commission, dec!(1));
        assert_eq!(detail[0].client_id, "AG-c1");
    }
}
