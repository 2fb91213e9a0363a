//! Commission and prize rate lookup

use crate::lottery::expander::PositionalPattern;
use crate::lottery::types::{Bet, Client, Condition, GameType};
use rust_decimal::Decimal;

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Commission percent for a game type; missing entries are 0%
pub fn commission_percent(client: &Client, game_type: GameType) -> Decimal {
    client
        .commission_rates
        .get(&game_type)
        .copied()
        .unwrap_or(Decimal::ZERO)
}

/// Prize percent for a game type, condition and (for positional bets) the
/// bet's number, which decides the specificity tier
pub fn prize_percent(
    client: &Client,
    game_type: GameType,
    condition: Condition,
    number: &str,
) -> Decimal {
    let rate = match game_type {
        GameType::Positional => {
            let specificity = PositionalPattern::parse(number).specificity();
            client.prize_rates.positional.get(specificity)
        }
        other => client.prize_rates.flat(other),
    };
    rate.map(|r| r.for_condition(condition))
        .unwrap_or(Decimal::ZERO)
}

/// Commission owed on a bet; charged whatever the result
pub fn commission_amount(bet: &Bet, client: &Client) -> Decimal {
    bet.stake * commission_percent(client, bet.game_type) / HUNDRED
}

/// What the bet pays if it wins; non-positive rates pay nothing
pub fn potential_prize_amount(bet: &Bet, client: &Client) -> Decimal {
    let rate = prize_percent(client, bet.game_type, bet.condition, &bet.number);
    if rate > Decimal::ZERO {
        bet.stake * rate / HUNDRED
    } else {
        Decimal::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lottery::test_support::{bet, client};
    use crate::lottery::types::PrizeRate;
    use rust_decimal_macros::dec;

    #[test]
    fn test_missing_rates_are_zero() {
        let c = client("c1");
        let b = bet("b1", "c1", GameType::ThreeDigits, "123", Condition::First, dec!(100));

        assert_eq!(commission_percent(&c, GameType::ThreeDigits), Decimal::ZERO);
        assert_eq!(commission_amount(&b, &c), Decimal::ZERO);
        assert_eq!(potential_prize_amount(&b, &c), Decimal::ZERO);
    }

    #[test]
    fn test_commission_ignores_condition() {
        let mut c = client("c1");
        c.commission_rates.insert(GameType::ThreeDigits, dec!(5));
        let first = bet("b1", "c1", GameType::ThreeDigits, "123", Condition::First, dec!(100));
        let second = bet("b2", "c1", GameType::ThreeDigits, "123", Condition::Second, dec!(100));

        assert_eq!(commission_amount(&first, &c), dec!(5));
        assert_eq!(commission_amount(&second, &c), dec!(5));
    }

    #[test]
    fn test_flat_prize_by_condition() {
        let mut c = client("c1");
        c.prize_rates
            .set_flat(GameType::FourDigits, PrizeRate::new(dec!(800), dec!(200)));

        assert_eq!(
            prize_percent(&c, GameType::FourDigits, Condition::First, "1234"),
            dec!(800)
        );
        assert_eq!(
            prize_percent(&c, GameType::FourDigits, Condition::Second, "1234"),
            dec!(200)
        );
        assert_eq!(
            prize_percent(&c, GameType::TwoDigits, Condition::First, "12"),
            Decimal::ZERO
        );
    }

    #[test]
    fn test_positional_prize_uses_specificity() {
        let mut c = client("c1");
        c.prize_rates
            .positional
            .set(2, PrizeRate::new(dec!(90), dec!(30)));
        c.prize_rates
            .positional
            .set(3, PrizeRate::new(dec!(700), dec!(250)));

        assert_eq!(
            prize_percent(&c, GameType::Positional, Condition::First, "1X2X"),
            dec!(90)
        );
        assert_eq!(
            prize_percent(&c, GameType::Positional, Condition::Second, "12X4"),
            dec!(250)
        );
        assert_eq!(
            prize_percent(&c, GameType::Positional, Condition::First, "XXX9"),
            Decimal::ZERO
        );
    }

    #[test]
    fn test_negative_prize_rate_pays_nothing() {
        let mut c = client("c1");
        c.prize_rates
            .set_flat(GameType::OneDigit, PrizeRate::new(dec!(-5), Decimal::ZERO));
        let b = bet("b1", "c1", GameType::OneDigit, "7", Condition::First, dec!(10));

        assert_eq!(potential_prize_amount(&b, &c), Decimal::ZERO);
    }
}
