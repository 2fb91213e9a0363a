//! Bet expansion into the concrete 4-digit outcomes a bet covers
//!
//! Each outcome of an expansion carries the bet's full stake; nothing is
//! divided across outcomes. Malformed numbers expand to nothing rather
//! than failing, and positional patterns are normalized to four slots.

use crate::lottery::number_space::{self, OUTCOME_DIGITS, WILDCARD};
use crate::lottery::types::{Bet, Bucket, GameType};
use std::collections::BTreeSet;
use std::fmt;
use tracing::debug;

/// Concrete outcomes covered by one bet, with provenance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expansion {
    pub bucket: Bucket,
    /// The number as the bettor wrote it
    pub source_label: String,
    /// The canonical form outcomes were built from, when it differs from
    /// the number as written
    pub normalized: Option<String>,
    outcomes: Vec<String>,
}

impl Expansion {
    fn empty(bet: &Bet) -> Self {
        Self {
            bucket: bet.game_type.into(),
            source_label: bet.number.clone(),
            normalized: None,
            outcomes: Vec::new(),
        }
    }

    pub fn outcomes(&self) -> &[String] {
        &self.outcomes
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn is_normalized(&self) -> bool {
        self.normalized.is_some()
    }
}

impl IntoIterator for Expansion {
    type Item = String;
    type IntoIter = std::vec::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.outcomes.into_iter()
    }
}

/// The form of a bet number its outcomes derive from, or `None` when the
/// number covers nothing. Prefix and combo bets drop trailing characters;
/// positional patterns become four slots of digits and `X`.
pub fn canonical_number(bet: &Bet) -> Option<String> {
    match bet.game_type {
        GameType::FourDigits => {
            let exact = bet.number.len() == OUTCOME_DIGITS && number_space::is_digits(&bet.number);
            exact.then(|| bet.number.clone())
        }
        GameType::ThreeDigits | GameType::TwoDigits | GameType::OneDigit => {
            number_space::digits(bet.game_type)
                .and_then(|len| prefix(&bet.number, len))
                .map(str::to_string)
        }
        GameType::Positional => Some(PositionalPattern::parse(&bet.number).to_string()),
        GameType::Combo => combo_head(&bet.number).map(str::to_string),
    }
}

/// Expand a bet into every 4-digit outcome it covers
pub fn expand(bet: &Bet) -> Expansion {
    let Some(canonical) = canonical_number(bet) else {
        debug!(
            bet_id = %bet.id,
            game_type = %bet.game_type,
            number = %bet.number,
            "bet number covers no outcome"
        );
        return Expansion::empty(bet);
    };

    let outcomes = match bet.game_type {
        GameType::FourDigits => vec![canonical.clone()],
        GameType::ThreeDigits | GameType::TwoDigits | GameType::OneDigit => {
            expand_prefix(&canonical)
        }
        GameType::Positional => PositionalPattern::parse(&canonical).expand(),
        GameType::Combo => expand_combo(&canonical),
    };

    let normalized = (canonical != bet.number).then_some(canonical);
    if let Some(normalized) = &normalized {
        debug!(
            bet_id = %bet.id,
            game_type = %bet.game_type,
            number = %bet.number,
            normalized = %normalized,
            "bet number normalized"
        );
    }

    Expansion {
        bucket: bet.game_type.into(),
        source_label: bet.number.clone(),
        normalized,
        outcomes,
    }
}

/// Whether `outcome` is one of the outcomes [`expand`] yields for the bet,
/// decided without enumerating
pub fn covers(bet: &Bet, outcome: &str) -> bool {
    if outcome.len() != OUTCOME_DIGITS || !number_space::is_digits(outcome) {
        return false;
    }
    match bet.game_type {
        GameType::FourDigits => bet.number == outcome,
        GameType::ThreeDigits | GameType::TwoDigits | GameType::OneDigit => {
            number_space::digits(bet.game_type)
                .and_then(|len| prefix(&bet.number, len))
                .is_some_and(|p| outcome.starts_with(p))
        }
        GameType::Positional => PositionalPattern::parse(&bet.number).matches(outcome),
        GameType::Combo => match (combo_digits(&bet.number), combo_digits(outcome)) {
            (Some(mut ours), Some(mut theirs)) => {
                ours.sort_unstable();
                theirs.sort_unstable();
                ours == theirs
            }
            _ => false,
        },
    }
}

/// Leading `len` characters of a prefix bet, if they are all digits
pub fn prefix(number: &str, len: usize) -> Option<&str> {
    let head = number.get(..len)?;
    number_space::is_digits(head).then_some(head)
}

fn expand_prefix(prefix: &str) -> Vec<String> {
    number_space::enumerate(OUTCOME_DIGITS - prefix.len())
        .map(|suffix| format!("{}{}", prefix, suffix))
        .collect()
}

/// Leading four characters of a combo number, if they are all digits
fn combo_head(number: &str) -> Option<&str> {
    prefix(number, OUTCOME_DIGITS)
}

/// The four digits a combo bet permutes; characters past the fourth are
/// ignored
pub fn combo_digits(number: &str) -> Option<[u8; OUTCOME_DIGITS]> {
    let head = combo_head(number)?;
    let mut digits = [0u8; OUTCOME_DIGITS];
    for (slot, b) in digits.iter_mut().zip(head.bytes()) {
        *slot = b;
    }
    Some(digits)
}

/// Distinct permutations of a combo number, ascending
fn expand_combo(number: &str) -> Vec<String> {
    let Some(digits) = combo_digits(number) else {
        return Vec::new();
    };

    let mut seen = BTreeSet::new();
    for a in 0..4 {
        for b in 0..4 {
            for c in 0..4 {
                for d in 0..4 {
                    if a == b || a == c || a == d || b == c || b == d || c == d {
                        continue;
                    }
                    let bytes = [digits[a], digits[b], digits[c], digits[d]];
                    seen.insert(String::from_utf8_lossy(&bytes).into_owned());
                }
            }
        }
    }
    seen.into_iter().collect()
}

/// A positional pattern normalized to exactly four slots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PositionalPattern([Option<u8>; OUTCOME_DIGITS]);

impl PositionalPattern {
    /// Truncates past four characters, pads short patterns with
    /// wildcards, and treats every non-digit as a wildcard
    pub fn parse(number: &str) -> Self {
        let mut slots = [None; OUTCOME_DIGITS];
        for (slot, ch) in slots.iter_mut().zip(number.chars()) {
            *slot = ch.to_digit(10).map(|d| d as u8);
        }
        Self(slots)
    }

    pub fn slots(&self) -> &[Option<u8>; OUTCOME_DIGITS] {
        &self.0
    }

    /// Count of fixed digits, which selects the positional prize tier
    pub fn specificity(&self) -> u8 {
        self.0.iter().filter(|s| s.is_some()).count() as u8
    }

    pub fn wildcards(&self) -> usize {
        OUTCOME_DIGITS - self.specificity() as usize
    }

    /// Every fixed slot agrees with the outcome at the same index
    pub fn matches(&self, outcome: &str) -> bool {
        if outcome.len() != OUTCOME_DIGITS {
            return false;
        }
        self.0
            .iter()
            .zip(outcome.chars())
            .all(|(slot, ch)| match slot {
                Some(d) => ch.to_digit(10) == Some(*d as u32),
                None => ch.is_ascii_digit(),
            })
    }

    /// Enumerate the free slots independently over 0-9, ascending
    pub fn expand(&self) -> Vec<String> {
        let free = self.wildcards();
        number_space::enumerate(free)
            .map(|fill| {
                let mut fill = fill.chars();
                self.0
                    .iter()
                    .map(|slot| match slot {
                        Some(d) => char::from(b'0' + d),
                        None => fill.next().unwrap_or('0'),
                    })
                    .collect::<String>()
            })
            .collect()
    }
}

impl fmt::Display for PositionalPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for slot in &self.0 {
            match slot {
                Some(d) => write!(f, "{}", d)?,
                None => write!(f, "{}", WILDCARD)?,
            }
        }
        Ok(())
    }
}
