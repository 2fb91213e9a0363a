//! Drawbook - exposure books and settlement for numbers-lottery draws
//!
//! Expands partial-digit, positional and combo bets into the 4-digit
//! outcomes they cover, folds stakes, commissions and potential prizes per
//! outcome, and settles bets once a draw's results are declared.
//!
//! All computations are pure functions of a [`DrawSnapshot`]. The
//! [`ReportEngine`] memoizes outcome books per draw, condition filter and
//! snapshot revision so that sorting and paging never repeat a pass.

pub mod cache;
pub mod config;
pub mod engine;
pub mod errors;
pub mod lottery;
pub mod metrics;
pub mod report;

pub use cache::{BookCache, BookKey, CacheStats};
pub use config::{ConfigLoader, EngineConfig};
pub use engine::{ClientReport, ReportEngine};
pub use errors::{BookError, BookResult};
pub use lottery::{
    Bet, BetOutcome, Bucket, Client, Condition, ConditionFilter, Draw, DrawSnapshot, DrawStatus,
    GameType, OutcomeBook, OutcomeRow, PrizeRate, PrizeRates,
};
pub use metrics::{EngineMetrics, MetricsSnapshot};
pub use report::{ClientColumn, OutcomeColumn, Page, ReportQuery, SortDirection};
