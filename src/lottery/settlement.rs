//! Settlement of declared draws
//!
//! A FIRST bet is tested against the first declared number only; a SECOND
//! bet wins if it covers any of the remaining declared numbers. Commission
//! is owed on every bet, winning or not.

use crate::lottery::book::client_index;
use crate::lottery::expander;
use crate::lottery::rates;
use crate::lottery::types::{Bet, BetOutcome, Client, Condition, Draw, GameType};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// Declared numbers the bet's condition is tested against
fn tested_numbers(condition: Condition, winning_numbers: &[String]) -> &[String] {
    match condition {
        Condition::First => winning_numbers.get(..1).unwrap_or(&[]),
        Condition::Second => winning_numbers.get(1..).unwrap_or(&[]),
    }
}

/// Whether the bet covers one of the declared numbers for its condition
pub fn is_winner(bet: &Bet, winning_numbers: &[String]) -> bool {
    tested_numbers(bet.condition, winning_numbers)
        .iter()
        .any(|n| expander::covers(bet, n))
}

/// Prize paid to the bet; zero when it lost
pub fn settlement_amount(bet: &Bet, client: &Client, winning_numbers: &[String]) -> Decimal {
    if is_winner(bet, winning_numbers) {
        rates::potential_prize_amount(bet, client)
    } else {
        Decimal::ZERO
    }
}

/// Amounts the wallet ledger books for one bet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BetSettlement {
    pub bet_id: String,
    pub client_id: String,
    pub outcome: BetOutcome,
    pub stake: Decimal,
    pub commission: Decimal,
    pub prize: Decimal,
}

/// Settle one bet against a settled draw; `None` before results exist
pub fn settle_bet(bet: &Bet, client: &Client, draw: &Draw) -> Option<BetSettlement> {
    if !draw.status.is_settled() || draw.winning_numbers.is_empty() {
        return None;
    }
    let won = is_winner(bet, &draw.winning_numbers);
    Some(BetSettlement {
        bet_id: bet.id.clone(),
        client_id: client.id.clone(),
        outcome: if won { BetOutcome::Win } else { BetOutcome::Loss },
        stake: bet.stake,
        commission: rates::commission_amount(bet, client),
        prize: if won {
            rates::potential_prize_amount(bet, client)
        } else {
            Decimal::ZERO
        },
    })
}

/// Settlements for every bet of the draw with a known client
pub fn settle_draw(draw: &Draw, bets: &[Bet], clients: &[Client]) -> Vec<BetSettlement> {
    let index = client_index(clients);
    bets.iter()
        .filter(|b| b.draw_id == draw.id)
        .filter_map(|bet| settle_bet(bet, index.get(bet.client_id.as_str())?, draw))
        .collect()
}

/// One client's result for a settled draw
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientRollupRow {
    pub id: String,
    pub client_id: String,
    pub username: String,
    pub total_stake: Decimal,
    pub total_winnings: Decimal,
    pub total_commission: Decimal,
    /// (winnings + commission) - stake, from the client's side
    pub net_result: Decimal,
    pub bet_count: usize,
}

impl ClientRollupRow {
    fn new(client: &Client) -> Self {
        Self {
            id: client.id.clone(),
            client_id: client.client_id.clone(),
            username: client.username.clone(),
            total_stake: Decimal::ZERO,
            total_winnings: Decimal::ZERO,
            total_commission: Decimal::ZERO,
            net_result: Decimal::ZERO,
            bet_count: 0,
        }
    }
}

/// Per-client totals; empty unless the draw is Finished or Declared.
/// Rows come out in client-list order.
pub fn client_settlement_rollup(
    draw: &Draw,
    bets: &[Bet],
    clients: &[Client],
) -> Vec<ClientRollupRow> {
    if !draw.status.is_settled() {
        debug!(draw_id = %draw.id, status = ?draw.status, "draw not settled; no client rollup");
        return Vec::new();
    }

    let draw_bets: Vec<&Bet> = bets.iter().filter(|b| b.draw_id == draw.id).collect();
    let mut rows: Vec<ClientRollupRow> = Vec::new();
    let participating: HashSet<&str> = draw_bets.iter().map(|b| b.client_id.as_str()).collect();
    let mut slot: HashMap<&str, usize> = HashMap::new();
    for client in clients {
        if slot.contains_key(client.id.as_str()) {
            continue;
        }
        if participating.contains(client.id.as_str()) {
            slot.insert(client.id.as_str(), rows.len());
            rows.push(ClientRollupRow::new(client));
        }
    }
    let index = client_index(clients);

    for bet in draw_bets {
        let (Some(&i), Some(client)) = (
            slot.get(bet.client_id.as_str()),
            index.get(bet.client_id.as_str()),
        ) else {
            warn!(bet_id = %bet.id, client_id = %bet.client_id, "bet references unknown client; excluded from rollup");
            continue;
        };
        let row = &mut rows[i];
        row.total_stake += bet.stake;
        row.bet_count += 1;
        row.total_commission += rates::commission_amount(bet, client);
        row.total_winnings += settlement_amount(bet, client, &draw.winning_numbers);
    }

    for row in &mut rows {
        row.net_result = (row.total_winnings + row.total_commission) - row.total_stake;
    }
    rows
}

/// Footer totals over a rollup
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollupTotals {
    pub total_stake: Decimal,
    pub total_winnings: Decimal,
    pub total_commission: Decimal,
    pub net_result: Decimal,
    pub bet_count: usize,
}

pub fn client_rollup_totals(rows: &[ClientRollupRow]) -> RollupTotals {
    rows.iter().fold(RollupTotals::default(), |mut acc, row| {
        acc.total_stake += row.total_stake;
        acc.total_winnings += row.total_winnings;
        acc.total_commission += row.total_commission;
        acc.net_result += row.net_result;
        acc.bet_count += row.bet_count;
        acc
    })
}

/// A bet that won against a particular declared number
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WinningBet {
    pub bet_id: String,
    pub client_id: String,
    pub username: String,
    pub game_type: GameType,
    pub number: String,
    pub condition: Condition,
    pub stake: Decimal,
    pub prize: Decimal,
}

/// Bets that won on `winning_number`, which must be one of the draw's
/// declared numbers in the slot matching each bet's condition
pub fn winning_breakdown(
    draw: &Draw,
    bets: &[Bet],
    clients: &[Client],
    winning_number: &str,
) -> Vec<WinningBet> {
    if !draw.status.is_settled() {
        return Vec::new();
    }
    let index = client_index(clients);
    bets.iter()
        .filter(|b| b.draw_id == draw.id)
        .filter(|b| {
            tested_numbers(b.condition, &draw.winning_numbers)
                .iter()
                .any(|n| n == winning_number)
                && expander::covers(b, winning_number)
        })
        .filter_map(|bet| {
            let client = index.get(bet.client_id.as_str())?;
            Some(WinningBet {
                bet_id: bet.id.clone(),
                client_id: client.client_id.clone(),
                username: client.username.clone(),
                game_type: bet.game_type,
                number: bet.number.clone(),
                condition: bet.condition,
                stake: bet.stake,
                prize: rates::potential_prize_amount(bet, client),
            })
        })
        .collect()
}
