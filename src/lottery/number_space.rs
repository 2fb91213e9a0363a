//! Finite outcome domains per bet category

use crate::lottery::types::GameType;

/// Length of every canonical outcome
pub const OUTCOME_DIGITS: usize = 4;

/// Marker used when a positional pattern is printed back in canonical form
pub const WILDCARD: char = 'X';

/// Digit length of a game type's own number, `None` for categories without
/// a fixed finite enumeration (positional and combo bets)
pub fn digits(game_type: GameType) -> Option<usize> {
    match game_type {
        GameType::FourDigits => Some(4),
        GameType::ThreeDigits => Some(3),
        GameType::TwoDigits => Some(2),
        GameType::OneDigit => Some(1),
        GameType::Positional | GameType::Combo => None,
    }
}

/// Size of the category's number space (10^digits, or 0)
pub fn total_outcomes(game_type: GameType) -> usize {
    digits(game_type).map(|d| 10usize.pow(d as u32)).unwrap_or(0)
}

/// Zero-padded `i` of the given width
pub fn pad(i: usize, width: usize) -> String {
    if width == 0 {
        return String::new();
    }
    format!("{:0width$}", i, width = width)
}

/// Every string of `width` digits, ascending
pub fn enumerate(width: usize) -> impl Iterator<Item = String> {
    (0..10usize.pow(width as u32)).map(move |i| pad(i, width))
}

/// Full ordered number space of a game type; empty when unbounded
pub fn space(game_type: GameType) -> Vec<String> {
    match digits(game_type) {
        Some(width) => enumerate(width).collect(),
        None => Vec::new(),
    }
}

pub fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}
