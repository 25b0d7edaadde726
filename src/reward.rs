// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Gross-to-net reward calculation.
//!
//! Networks report the gross amount they paid out for an action; the user is
//! credited the net share after the platform's payout ratio, with an optional
//! bonus multiplier for promotional actions. There is no other business logic
//! here - one multiplication, one rounding step.

/// Compute the net amount (in cents) credited for a gross provider amount.
///
/// `net = round_half_up(gross * payout_ratio * (bonus ? bonus_multiplier : 1))`
///
/// Pure and deterministic; the same inputs always produce the same output.
pub fn net_amount_cents(
    gross_cents: i64,
    payout_ratio: f64,
    bonus_multiplier: f64,
    bonus: bool,
) -> i64 {
    let multiplier = if bonus { bonus_multiplier } else { 1.0 };
    (gross_cents as f64 * payout_ratio * multiplier).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn applies_payout_ratio() {
        // $10.00 gross at 70% payout = $7.00 net
        assert_eq!(net_amount_cents(1000, 0.7, 1.2, false), 700);
    }

    #[test]
    fn applies_bonus_multiplier_only_when_flagged() {
        assert_eq!(net_amount_cents(1000, 0.7, 1.2, true), 840);
        assert_eq!(net_amount_cents(1000, 0.7, 1.2, false), 700);
    }

    #[test]
    fn rounds_half_up() {
        // 33 * 0.7 = 23.1 -> 23; 35 * 0.7 = 24.5 -> 25 (half away from zero)
        assert_eq!(net_amount_cents(33, 0.7, 1.0, false), 23);
        assert_eq!(net_amount_cents(35, 0.7, 1.0, false), 25);
    }

    #[test]
    fn is_deterministic() {
        for _ in 0..3 {
            assert_eq!(net_amount_cents(12345, 0.7, 1.15, true), {
                net_amount_cents(12345, 0.7, 1.15, true)
            });
        }
    }

    #[test]
    fn full_payout_ratio_passes_gross_through() {
        assert_eq!(net_amount_cents(555, 1.0, 1.0, false), 555);
    }
}
