//! Lottery domain: bet expansion, outcome books, direct breakdowns and
//! settlement of declared draws

pub mod book;
pub mod breakdown;
pub mod expander;
pub mod number_space;
pub mod rates;
pub mod settlement;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

pub use book::{
    aggregate, aggregate_partitioned, build_outcome_book, outcome_detail, OutcomeBook,
    OutcomeContribution, OutcomeRow,
};
pub use breakdown::{
    coverage, direct_breakdown, export_unbooked, game_breakdown, unbooked_export_filename,
    unbooked_numbers, Coverage, DirectBreakdown, GameBreakdown, NumberStats,
};
pub use expander::{canonical_number, covers, expand, Expansion, PositionalPattern};
pub use settlement::{
    client_rollup_totals, client_settlement_rollup, is_winner, settle_bet, settle_draw,
    settlement_amount, winning_breakdown, BetSettlement, ClientRollupRow, RollupTotals,
    WinningBet,
};
pub use types::{
    Bet, BetOutcome, Bucket, Client, Condition, ConditionFilter, Draw, DrawSnapshot, DrawStatus,
    GameType, PositionalPrizeRates, PrizeRate, PrizeRates,
};
