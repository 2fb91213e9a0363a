//! Report engine: the lottery computations behind a memoizing cache
//!
//! Every operation is a pure function of the snapshot it is handed. The
//! engine only adds the book cache, aggregation metrics and the configured
//! paging defaults on top.

use crate::cache::{BookCache, BookKey, CacheStats};
use crate::config::EngineConfig;
use crate::errors::BookResult;
use crate::lottery::{
    self, book, breakdown, settlement, BetSettlement, ClientRollupRow, ConditionFilter, Coverage,
    DirectBreakdown, DrawSnapshot, GameBreakdown, GameType, OutcomeBook, OutcomeContribution,
    OutcomeRow, RollupTotals, WinningBet,
};
use crate::metrics::{EngineMetrics, MetricsSnapshot};
use crate::report::{self, ClientColumn, OutcomeColumn, Page, ReportQuery};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

pub struct ReportEngine {
    config: EngineConfig,
    cache: BookCache,
    metrics: EngineMetrics,
}

/// Client rollup with its footer row
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ClientReport {
    pub rows: Page<ClientRollupRow>,
    pub totals: RollupTotals,
}

impl ReportEngine {
    pub fn new(config: EngineConfig) -> BookResult<Self> {
        config.validate()?;
        let cache = match config.cache_ttl() {
            Some(ttl) => BookCache::with_ttl(config.cache.capacity, ttl),
            None => BookCache::new(config.cache.capacity),
        };
        info!(
            cache_capacity = config.cache.capacity,
            parallel_threshold = config.aggregation.parallel_threshold,
            partitions = config.aggregation.partitions,
            "report engine ready"
        );
        Ok(Self {
            config,
            cache,
            metrics: EngineMetrics::new(),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Outcome book for the snapshot, memoized per draw, filter and revision
    pub fn outcome_book(&self, snapshot: &DrawSnapshot, filter: ConditionFilter) -> Arc<OutcomeBook> {
        let key = BookKey::new(&snapshot.draw.id, filter, snapshot.revision);
        if let Some(book) = self.cache.get(&key) {
            self.metrics.record_cache_hit();
            return book;
        }
        self.metrics.record_cache_miss();

        let book = Arc::new(self.aggregate(snapshot, filter));
        self.cache.put(key, Arc::clone(&book));
        book
    }

    fn aggregate(&self, snapshot: &DrawSnapshot, filter: ConditionFilter) -> OutcomeBook {
        let started = Instant::now();
        let draw = &snapshot.draw;
        if !draw.status.is_reportable() {
            debug!(draw_id = %draw.id, status = ?draw.status, "betting still open; book is provisional");
        }

        let book = if snapshot.bets.len() > self.config.aggregation.parallel_threshold {
            book::aggregate_partitioned(
                &draw.id,
                &snapshot.bets,
                &snapshot.clients,
                filter,
                self.config.aggregation.partitions,
            )
        } else {
            book::aggregate(&draw.id, &snapshot.bets, &snapshot.clients, filter)
        };

        let elapsed = started.elapsed();
        self.metrics
            .record_pass(book.bets_folded, book.bets_dropped, book.len(), elapsed);
        info!(
            draw_id = %draw.id,
            filter = %filter,
            revision = snapshot.revision,
            outcomes = book.len(),
            elapsed_us = elapsed.as_micros() as u64,
            "aggregation pass complete"
        );
        book
    }

    /// Books for many draws, built in parallel
    pub fn outcome_books_for_draws(
        &self,
        snapshots: &[DrawSnapshot],
        filter: ConditionFilter,
    ) -> Vec<Arc<OutcomeBook>> {
        snapshots
            .par_iter()
            .map(|snapshot| self.outcome_book(snapshot, filter))
            .collect()
    }

    /// Query with the profit/loss view's page size
    pub fn outcome_query(&self) -> ReportQuery<OutcomeColumn> {
        ReportQuery::new(self.config.report.outcome_page_size)
    }

    /// Query with the comprehensive stake book's page size
    pub fn book_query(&self) -> ReportQuery<OutcomeColumn> {
        ReportQuery::new(self.config.report.book_page_size)
    }

    pub fn client_query(&self) -> ReportQuery<ClientColumn> {
        ReportQuery::new(self.config.report.client_page_size)
    }

    /// Search, sort and page the cached book; only the projection re-runs
    pub fn outcome_page(
        &self,
        snapshot: &DrawSnapshot,
        filter: ConditionFilter,
        query: &ReportQuery<OutcomeColumn>,
    ) -> Page<OutcomeRow> {
        let book = self.outcome_book(snapshot, filter);
        let rows = book.rows();
        report::project(&rows, query).map(|row| (*row).clone())
    }

    pub fn outcome_detail(
        &self,
        snapshot: &DrawSnapshot,
        filter: ConditionFilter,
        outcome: &str,
    ) -> Vec<OutcomeContribution> {
        book::outcome_detail(&snapshot.draw, &snapshot.bets, &snapshot.clients, filter, outcome)
    }

    pub fn game_breakdown(&self, snapshot: &DrawSnapshot) -> GameBreakdown {
        breakdown::game_breakdown(&snapshot.draw, &snapshot.bets)
    }

    pub fn direct_breakdown(
        &self,
        snapshot: &DrawSnapshot,
        game_type: GameType,
        filter: ConditionFilter,
    ) -> DirectBreakdown {
        breakdown::direct_breakdown(&snapshot.draw, &snapshot.bets, game_type, filter)
    }

    pub fn unbooked_numbers(
        &self,
        snapshot: &DrawSnapshot,
        game_type: GameType,
        filter: ConditionFilter,
    ) -> Vec<String> {
        let direct = self.direct_breakdown(snapshot, game_type, filter);
        breakdown::unbooked_numbers(game_type, &direct)
    }

    pub fn coverage(
        &self,
        snapshot: &DrawSnapshot,
        game_type: GameType,
        filter: ConditionFilter,
    ) -> Coverage {
        let direct = self.direct_breakdown(snapshot, game_type, filter);
        breakdown::coverage(game_type, &direct)
    }

    pub fn export_unbooked(
        &self,
        snapshot: &DrawSnapshot,
        game_type: GameType,
        filter: ConditionFilter,
        dir: &Path,
    ) -> BookResult<Option<PathBuf>> {
        let numbers = self.unbooked_numbers(snapshot, game_type, filter);
        breakdown::export_unbooked(game_type, &snapshot.draw, &numbers, dir)
    }

    pub fn client_rollup(&self, snapshot: &DrawSnapshot) -> Vec<ClientRollupRow> {
        settlement::client_settlement_rollup(&snapshot.draw, &snapshot.bets, &snapshot.clients)
    }

    /// Paged client rollup plus totals over every row, not just the page
    pub fn client_report(
        &self,
        snapshot: &DrawSnapshot,
        query: &ReportQuery<ClientColumn>,
    ) -> ClientReport {
        let rows = self.client_rollup(snapshot);
        let totals = settlement::client_rollup_totals(&rows);
        ClientReport {
            rows: report::project(&rows, query).map(|row| row.clone()),
            totals,
        }
    }

    pub fn settle(&self, snapshot: &DrawSnapshot) -> Vec<BetSettlement> {
        settlement::settle_draw(&snapshot.draw, &snapshot.bets, &snapshot.clients)
    }

    pub fn winning_breakdown(&self, snapshot: &DrawSnapshot, winning_number: &str) -> Vec<WinningBet> {
        settlement::winning_breakdown(
            &snapshot.draw,
            &snapshot.bets,
            &snapshot.clients,
            winning_number,
        )
    }

    /// Whether a bet of the snapshot won; `None` for unknown bet ids
    pub fn is_winner(&self, snapshot: &DrawSnapshot, bet_id: &str) -> Option<bool> {
        let bet = snapshot.bets.iter().find(|b| b.id == bet_id)?;
        Some(lottery::is_winner(bet, &snapshot.draw.winning_numbers))
    }

    /// Drop cached books after the draw's bets or clients changed
    pub fn invalidate_draw(&self, draw_id: &str) -> usize {
        self.cache.invalidate_draw(draw_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lottery::test_support::{bet, client, draw};
    use crate::lottery::{Condition, DrawStatus};
    use crate::report::SortDirection;
    use rust_decimal_macros::dec;

    fn snapshot(revision: u64) -> DrawSnapshot {
        DrawSnapshot {
            draw: draw(DrawStatus::Closed, &[]),
            bets: vec![
                bet("b1", "c1", GameType::TwoDigits, "12", Condition::First, dec!(10)),
                bet("b2", "c1", GameType::FourDigits, "1234", Condition::Second, dec!(3)),
            ],
            clients: vec![client("c1")],
            revision,
        }
    }

    #[test]
    fn test_book_is_memoized() {
        let engine = ReportEngine::new(EngineConfig::testing()).unwrap();
        let snap = snapshot(1);

        let first = engine.outcome_book(&snap, ConditionFilter::All);
        let second = engine.outcome_book(&snap, ConditionFilter::All);
        assert!(Arc::ptr_eq(&first, &second));

        let metrics = engine.metrics();
        assert_eq!(metrics.passes, 1);
        assert_eq!(metrics.cache_hits, 1);
        assert_eq!(metrics.cache_misses, 1);
    }

    #[test]
    fn test_revision_bump_recomputes() {
        let engine = ReportEngine::new(EngineConfig::testing()).unwrap();
        let mut snap = snapshot(1);
        let before = engine.outcome_book(&snap, ConditionFilter::All);

        snap.bets.push(bet("b3", "c1", GameType::FourDigits, "1299", Condition::First, dec!(1)));
        snap.revision = 2;
        let after = engine.outcome_book(&snap, ConditionFilter::All);

        assert_eq!(before.len(), 100);
        assert_eq!(after.get("1299").unwrap().total_stake, dec!(11));
        assert_eq!(engine.metrics().passes, 2);
    }

    #[test]
    fn test_large_snapshot_uses_partitions() {
        let engine = ReportEngine::new(EngineConfig::testing()).unwrap();
        let mut snap = snapshot(1);
        for i in 0..40 {
            let number = format!("{:04}", i);
            snap.bets.push(bet(&format!("x{}", i), "c1", GameType::FourDigits, &number, Condition::First, dec!(1)));
        }
        let parallel = engine.outcome_book(&snap, ConditionFilter::All);
        let sequential = book::aggregate(&snap.draw.id, &snap.bets, &snap.clients, ConditionFilter::All);
        assert_eq!(*parallel, sequential);
    }

    #[test]
    fn test_outcome_page_uses_cached_book() {
        let engine = ReportEngine::new(EngineConfig::testing()).unwrap();
        let snap = snapshot(1);
        let query = engine
            .outcome_query()
            .sort(OutcomeColumn::TotalStake, SortDirection::Desc);

        let page = engine.outcome_page(&snap, ConditionFilter::All, &query);
        assert_eq!(page.page_size, 10);
        assert_eq!(page.total_items, 100);
        assert_eq!(page.total_pages, 10);
        assert_eq!(page.items[0].outcome, "1234");

        engine.outcome_page(&snap, ConditionFilter::All, &query.clone().page(2));
        assert_eq!(engine.metrics().passes, 1);
    }

    #[test]
    fn test_invalidate_draw_forces_rebuild() {
        let engine = ReportEngine::new(EngineConfig::testing()).unwrap();
        let snap = snapshot(1);
        engine.outcome_book(&snap, ConditionFilter::First);
        assert_eq!(engine.invalidate_draw(&snap.draw.id), 1);
        engine.outcome_book(&snap, ConditionFilter::First);
        assert_eq!(engine.metrics().passes, 2);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = EngineConfig::default();
        config.cache.capacity = 0;
        assert!(ReportEngine::new(config).is_err());
    }
}
