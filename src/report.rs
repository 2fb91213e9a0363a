//! Presentation projections over cached rollups: search, sort, paginate
//!
//! Projections never touch the aggregation pass. They run over rows that
//! are already built, so re-sorting or paging an outcome book is cheap.

use crate::lottery::{Bucket, ClientRollupRow, OutcomeRow};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl FromStr for SortDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            _ => Err(format!("unknown sort direction '{}'", s)),
        }
    }
}

/// A row type the projector can search and sort
pub trait ReportRow {
    type Column: Copy;

    /// Case-insensitive substring match against the row's label
    fn matches(&self, needle: &str) -> bool;

    fn compare(&self, other: &Self, column: Self::Column) -> Ordering;
}

impl<T: ReportRow + ?Sized> ReportRow for &T {
    type Column = T::Column;

    fn matches(&self, needle: &str) -> bool {
        (**self).matches(needle)
    }

    fn compare(&self, other: &Self, column: Self::Column) -> Ordering {
        (**self).compare(*other, column)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OutcomeColumn {
    Outcome,
    TotalStake,
    TotalCommission,
    PotentialPrize,
    NetTotal,
    BucketStake(Bucket),
}

impl FromStr for OutcomeColumn {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let column = match s {
            "outcome" | "number" => OutcomeColumn::Outcome,
            "totalStake" | "stake" => OutcomeColumn::TotalStake,
            "totalCommission" | "commission" => OutcomeColumn::TotalCommission,
            "potentialPrize" | "prize" => OutcomeColumn::PotentialPrize,
            "netTotal" | "net" => OutcomeColumn::NetTotal,
            "4D" => OutcomeColumn::BucketStake(Bucket::FourDigits),
            "3D" => OutcomeColumn::BucketStake(Bucket::ThreeDigits),
            "2D" => OutcomeColumn::BucketStake(Bucket::TwoDigits),
            "1D" => OutcomeColumn::BucketStake(Bucket::OneDigit),
            "POS" => OutcomeColumn::BucketStake(Bucket::Positional),
            "COMBO" => OutcomeColumn::BucketStake(Bucket::Combo),
            _ => return Err(format!("unknown outcome column '{}'", s)),
        };
        Ok(column)
    }
}

impl ReportRow for OutcomeRow {
    type Column = OutcomeColumn;

    fn matches(&self, needle: &str) -> bool {
        self.outcome.contains(needle)
    }

    fn compare(&self, other: &Self, column: OutcomeColumn) -> Ordering {
        match column {
            OutcomeColumn::Outcome => self.outcome.cmp(&other.outcome),
            OutcomeColumn::TotalStake => self.total_stake.cmp(&other.total_stake),
            OutcomeColumn::TotalCommission => self.total_commission.cmp(&other.total_commission),
            OutcomeColumn::PotentialPrize => self.potential_prize.cmp(&other.potential_prize),
            OutcomeColumn::NetTotal => self.net_total().cmp(&other.net_total()),
            OutcomeColumn::BucketStake(bucket) => {
                self.bucket_stake(bucket).cmp(&other.bucket_stake(bucket))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ClientColumn {
    Client,
    BetCount,
    TotalStake,
    TotalCommission,
    TotalWinnings,
    NetResult,
}

impl FromStr for ClientColumn {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let column = match s {
            "client" | "username" => ClientColumn::Client,
            "betCount" | "bets" => ClientColumn::BetCount,
            "totalStake" | "stake" => ClientColumn::TotalStake,
            "totalCommission" | "commission" => ClientColumn::TotalCommission,
            "totalWinnings" | "winnings" => ClientColumn::TotalWinnings,
            "netResult" | "net" => ClientColumn::NetResult,
            _ => return Err(format!("unknown client column '{}'", s)),
        };
        Ok(column)
    }
}

impl ReportRow for ClientRollupRow {
    type Column = ClientColumn;

    fn matches(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.username.to_lowercase().contains(&needle)
            || self.client_id.to_lowercase().contains(&needle)
    }

    fn compare(&self, other: &Self, column: ClientColumn) -> Ordering {
        match column {
            ClientColumn::Client => self.username.cmp(&other.username),
            ClientColumn::BetCount => self.bet_count.cmp(&other.bet_count),
            ClientColumn::TotalStake => self.total_stake.cmp(&other.total_stake),
            ClientColumn::TotalCommission => self.total_commission.cmp(&other.total_commission),
            ClientColumn::TotalWinnings => self.total_winnings.cmp(&other.total_winnings),
            ClientColumn::NetResult => self.net_result.cmp(&other.net_result),
        }
    }
}

/// Search, sort and page request for one view
#[derive(Debug, Clone)]
pub struct ReportQuery<C> {
    pub search: Option<String>,
    pub sort: Option<(C, SortDirection)>,
    /// 1-based
    pub page: usize,
    pub page_size: usize,
}

impl<C> ReportQuery<C> {
    pub fn new(page_size: usize) -> Self {
        Self {
            search: None,
            sort: None,
            page: 1,
            page_size,
        }
    }

    pub fn search(mut self, needle: impl Into<String>) -> Self {
        let needle = needle.into();
        self.search = (!needle.is_empty()).then_some(needle);
        self
    }

    pub fn sort(mut self, column: C, direction: SortDirection) -> Self {
        self.sort = Some((column, direction));
        self
    }

    pub fn page(mut self, page: usize) -> Self {
        self.page = page;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub page_size: usize,
    pub total_pages: usize,
    pub total_items: usize,
}

/// Filter, stable-sort and slice `rows`. Ties keep input order in both
/// directions. Out-of-range pages clamp to the nearest valid page.
pub fn project<'a, T>(rows: &'a [T], query: &ReportQuery<T::Column>) -> Page<&'a T>
where
    T: ReportRow,
{
    let mut selected: Vec<&T> = match &query.search {
        Some(needle) => rows.iter().filter(|r| r.matches(needle)).collect(),
        None => rows.iter().collect(),
    };

    if let Some((column, direction)) = query.sort {
        selected.sort_by(|a, b| match direction {
            SortDirection::Asc => a.compare(b, column),
            SortDirection::Desc => b.compare(a, column),
        });
    }

    paginate(selected, query.page, query.page_size)
}

impl<T> Page<T> {
    pub fn map<U, F>(self, f: F) -> Page<U>
    where
        F: FnMut(T) -> U,
    {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            page_size: self.page_size,
            total_pages: self.total_pages,
            total_items: self.total_items,
        }
    }
}

pub fn paginate<T>(items: Vec<T>, page: usize, page_size: usize) -> Page<T> {
    let page_size = page_size.max(1);
    let total_items = items.len();
    let total_pages = total_items.div_ceil(page_size).max(1);
    let page = page.clamp(1, total_pages);
    let items = items
        .into_iter()
        .skip((page - 1) * page_size)
        .take(page_size)
        .collect();
    Page {
        items,
        page,
        page_size,
        total_pages,
        total_items,
    }
}

/// Currency display: two decimals, half away from zero
pub fn format_amount(amount: Decimal) -> String {
    format!(
        "{:.2}",
        amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    )
}
