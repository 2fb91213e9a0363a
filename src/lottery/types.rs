use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use tracing::warn;

/// Supported bet categories
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameType {
    FourDigits,
    ThreeDigits,
    TwoDigits,
    OneDigit,
    Positional,
    Combo,
}

impl GameType {
    pub const ALL: [GameType; 6] = [
        GameType::FourDigits,
        GameType::ThreeDigits,
        GameType::TwoDigits,
        GameType::OneDigit,
        GameType::Positional,
        GameType::Combo,
    ];

    /// Wire name, as used in rate tables and export file names
    pub fn as_str(&self) -> &'static str {
        match self {
            GameType::FourDigits => "FOUR_DIGITS",
            GameType::ThreeDigits => "THREE_DIGITS",
            GameType::TwoDigits => "TWO_DIGITS",
            GameType::OneDigit => "ONE_DIGIT",
            GameType::Positional => "POSITIONAL",
            GameType::Combo => "COMBO",
        }
    }
}

impl fmt::Display for GameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for GameType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase().replace('-', "_");
        GameType::ALL
            .into_iter()
            .find(|g| g.as_str() == wanted)
            .ok_or_else(|| format!("unknown game type '{}'", s))
    }
}

/// Which declared result a bet is wagered against
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Condition {
    First,
    Second,
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::First => write!(f, "FIRST"),
            Condition::Second => write!(f, "SECOND"),
        }
    }
}

/// Condition selector for report requests
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConditionFilter {
    #[default]
    All,
    First,
    Second,
}

impl ConditionFilter {
    pub fn matches(&self, condition: Condition) -> bool {
        match self {
            ConditionFilter::All => true,
            ConditionFilter::First => condition == Condition::First,
            ConditionFilter::Second => condition == Condition::Second,
        }
    }
}

impl fmt::Display for ConditionFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConditionFilter::All => write!(f, "ALL"),
            ConditionFilter::First => write!(f, "FIRST"),
            ConditionFilter::Second => write!(f, "SECOND"),
        }
    }
}

impl std::str::FromStr for ConditionFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ALL" => Ok(ConditionFilter::All),
            "FIRST" => Ok(ConditionFilter::First),
            "SECOND" => Ok(ConditionFilter::Second),
            _ => Err(format!("unknown condition filter '{}'", s)),
        }
    }
}

/// Draw lifecycle status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DrawStatus {
    Upcoming,
    Open,
    Closed,
    Finished,
    Declared,
    Suspended,
}

impl DrawStatus {
    /// Results are known and bets can be settled
    pub fn is_settled(&self) -> bool {
        matches!(self, DrawStatus::Finished | DrawStatus::Declared)
    }

    /// Betting is over, so the book no longer moves
    pub fn is_reportable(&self) -> bool {
        matches!(
            self,
            DrawStatus::Closed | DrawStatus::Finished | DrawStatus::Declared
        )
    }
}

/// A staked wager on a digit pattern for one draw
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Bet {
    pub id: String,
    pub client_id: String,
    pub draw_id: String,
    pub game_type: GameType,
    pub number: String,
    pub condition: Condition,
    pub stake: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub positions: Option<Vec<u8>>,
    pub created_at: DateTime<Utc>,
}

/// A scheduled draw and, once declared, its results
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Draw {
    pub id: String,
    pub name: String,
    pub status: DrawStatus,
    pub draw_time: DateTime<Utc>,
    /// Element 0 is the FIRST result, the rest are SECOND results
    #[serde(default)]
    pub winning_numbers: Vec<String>,
}

impl Draw {
    pub fn first_result(&self) -> Option<&str> {
        self.winning_numbers.first().map(String::as_str)
    }

    pub fn second_results(&self) -> &[String] {
        self.winning_numbers.get(1..).unwrap_or(&[])
    }
}

/// Prize percentages for the two conditions of one game type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct PrizeRate {
    #[serde(deserialize_with = "lenient_rate")]
    pub first: Decimal,
    #[serde(deserialize_with = "lenient_rate")]
    pub second: Decimal,
}

impl PrizeRate {
    pub fn new(first: Decimal, second: Decimal) -> Self {
        Self { first, second }
    }

    pub fn for_condition(&self, condition: Condition) -> Decimal {
        match condition {
            Condition::First => self.first,
            Condition::Second => self.second,
        }
    }
}

/// Positional prize rates keyed by specificity (count of fixed digits, 1..=4)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(transparent)]
pub struct PositionalPrizeRates(pub BTreeMap<u8, PrizeRate>);

impl PositionalPrizeRates {
    pub fn get(&self, specificity: u8) -> Option<&PrizeRate> {
        self.0.get(&specificity)
    }

    pub fn set(&mut self, specificity: u8, rate: PrizeRate) {
        self.0.insert(specificity, rate);
    }
}

/// A client's prize table; every entry is optional and absent means 0%
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default, rename_all = "SCREAMING_SNAKE_CASE")]
pub struct PrizeRates {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub four_digits: Option<PrizeRate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub three_digits: Option<PrizeRate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub two_digits: Option<PrizeRate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub one_digit: Option<PrizeRate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub combo: Option<PrizeRate>,
    pub positional: PositionalPrizeRates,
}

impl PrizeRates {
    /// Flat rate for a non-positional game type
    pub fn flat(&self, game_type: GameType) -> Option<&PrizeRate> {
        match game_type {
            GameType::FourDigits => self.four_digits.as_ref(),
            GameType::ThreeDigits => self.three_digits.as_ref(),
            GameType::TwoDigits => self.two_digits.as_ref(),
            GameType::OneDigit => self.one_digit.as_ref(),
            GameType::Combo => self.combo.as_ref(),
            GameType::Positional => None,
        }
    }

    pub fn set_flat(&mut self, game_type: GameType, rate: PrizeRate) {
        let slot = match game_type {
            GameType::FourDigits => &mut self.four_digits,
            GameType::ThreeDigits => &mut self.three_digits,
            GameType::TwoDigits => &mut self.two_digits,
            GameType::OneDigit => &mut self.one_digit,
            GameType::Combo => &mut self.combo,
            GameType::Positional => return,
        };
        *slot = Some(rate);
    }
}

/// A bettor (or agent) with its rate configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    /// Internal key that bets reference
    pub id: String,
    /// Human-facing account code
    pub client_id: String,
    pub username: String,
    #[serde(default, deserialize_with = "lenient_commission_rates")]
    pub commission_rates: BTreeMap<GameType, Decimal>,
    #[serde(default)]
    pub prize_rates: PrizeRates,
}

/// Numbers and numeric strings parse; null or anything else reads as 0%
fn rate_from_value(value: &Value) -> Decimal {
    let text = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return Decimal::ZERO,
    };
    text.parse::<Decimal>()
        .or_else(|_| Decimal::from_scientific(&text))
        .unwrap_or(Decimal::ZERO)
}

fn lenient_rate<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(rate_from_value(&value))
}

/// Unknown game-type keys are skipped with a warning
fn lenient_commission_rates<'de, D>(
    deserializer: D,
) -> Result<BTreeMap<GameType, Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<BTreeMap<String, Value>>::deserialize(deserializer)?.unwrap_or_default();
    let mut rates = BTreeMap::new();
    for (key, value) in raw {
        match key.parse::<GameType>() {
            Ok(game_type) => {
                rates.insert(game_type, rate_from_value(&value));
            }
            Err(_) => warn!(key = %key, "unknown game type in commission rates, skipped"),
        }
    }
    Ok(rates)
}

/// Immutable inputs for one report request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrawSnapshot {
    pub draw: Draw,
    #[serde(default)]
    pub bets: Vec<Bet>,
    #[serde(default)]
    pub clients: Vec<Client>,
    /// Bumped by the data-access layer whenever bets or clients change
    #[serde(default)]
    pub revision: u64,
}

/// Display/provenance category an expanded outcome is recorded under
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Bucket {
    #[serde(rename = "1D")]
    OneDigit,
    #[serde(rename = "2D")]
    TwoDigits,
    #[serde(rename = "3D")]
    ThreeDigits,
    #[serde(rename = "4D")]
    FourDigits,
    #[serde(rename = "POS")]
    Positional,
    #[serde(rename = "COMBO")]
    Combo,
}

impl From<GameType> for Bucket {
    fn from(game_type: GameType) -> Self {
        match game_type {
            GameType::FourDigits => Bucket::FourDigits,
            GameType::ThreeDigits => Bucket::ThreeDigits,
            GameType::TwoDigits => Bucket::TwoDigits,
            GameType::OneDigit => Bucket::OneDigit,
            GameType::Positional => Bucket::Positional,
            GameType::Combo => Bucket::Combo,
        }
    }
}

/// Win/loss verdict for a settled bet
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BetOutcome {
    Win,
    Loss,
}
