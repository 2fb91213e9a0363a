//! Fixture builders shared by the lottery unit tests

use crate::lottery::types::{Bet, Client, Condition, Draw, DrawStatus, GameType, PrizeRates};
use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;
use std::collections::BTreeMap;

pub const DRAW_ID: &str = "draw-1";

pub fn bet(
    id: &str,
    client_id: &str,
    game_type: GameType,
    number: &str,
    condition: Condition,
    stake: Decimal,
) -> Bet {
    Bet {
        id: id.to_string(),
        client_id: client_id.to_string(),
        draw_id: DRAW_ID.to_string(),
        game_type,
        number: number.to_string(),
        condition,
        stake,
        positions: None,
        created_at: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
    }
}

pub fn client(id: &str) -> Client {
    Client {
        id: id.to_string(),
        client_id: format!("AG-{}", id),
        username: format!("user-{}", id),
        commission_rates: BTreeMap::new(),
        prize_rates: PrizeRates::default(),
    }
}

pub fn draw(status: DrawStatus, winning_numbers: &[&str]) -> Draw {
    Draw {
        id: DRAW_ID.to_string(),
        name: "101".to_string(),
        status,
        draw_time: Utc.with_ymd_and_hms(2024, 3, 1, 18, 0, 0).unwrap(),
        winning_numbers: winning_numbers.iter().map(|s| s.to_string()).collect(),
    }
}
