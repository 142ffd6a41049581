//! Compound-growth primitives shared by every calculator.
//!
//! `(1 + r)^n` is always built by repeated multiplication rather than
//! `Decimal::powd`, which keeps results identical across platforms.

use rust_decimal::Decimal;

use crate::error::PensionError;
use crate::types::{checked_div, Money, Rate};
use crate::PensionResult;

/// Hard cap on the forward simulation in [`solve_periods_for_target`].
pub const MAX_SOLVE_PERIODS: u32 = 100;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn check_rate(rate: Rate) -> PensionResult<()> {
    if rate <= -Decimal::ONE {
        return Err(PensionError::InvalidAmount {
            field: "rate".into(),
            reason: "Growth rate must be greater than -100%".into(),
        });
    }
    Ok(())
}

fn check_non_negative(field: &str, value: Money) -> PensionResult<()> {
    if value < Decimal::ZERO {
        return Err(PensionError::InvalidAmount {
            field: field.into(),
            reason: format!("{} must be >= 0", field),
        });
    }
    Ok(())
}

/// (1 + r)^n via iterative multiplication.
pub fn compound(rate: Rate, n: u32) -> PensionResult<Decimal> {
    check_rate(rate)?;
    let factor = Decimal::ONE + rate;
    let mut result = Decimal::ONE;
    for _ in 0..n {
        result = result
            .checked_mul(factor)
            .ok_or_else(|| PensionError::overflow("growth_factor"))?;
    }
    Ok(result)
}

// ---------------------------------------------------------------------------
// Future values
// ---------------------------------------------------------------------------

/// Value of a single sum after `periods` of compounding.
pub fn future_value_lump_sum(principal: Money, rate: Rate, periods: u32) -> PensionResult<Money> {
    check_non_negative("principal", principal)?;
    let growth = compound(rate, periods)?;
    principal
        .checked_mul(growth)
        .ok_or_else(|| PensionError::overflow("future_value_lump_sum"))
}

/// Value of an ordinary annuity (end-of-period payments) after `periods`.
pub fn future_value_annuity(payment: Money, rate: Rate, periods: u32) -> PensionResult<Money> {
    check_non_negative("payment", payment)?;
    check_rate(rate)?;
    if rate.is_zero() {
        return payment
            .checked_mul(Decimal::from(periods))
            .ok_or_else(|| PensionError::overflow("future_value_annuity"));
    }
    let growth = compound(rate, periods)?;
    let factor = checked_div(growth - Decimal::ONE, rate, "future_value_annuity")?;
    payment
        .checked_mul(factor)
        .ok_or_else(|| PensionError::overflow("future_value_annuity"))
}

// ---------------------------------------------------------------------------
// Inverse solvers
// ---------------------------------------------------------------------------

/// Level payment per period that accumulates to `target_fv`.
/// Non-positive targets need no payment.
pub fn solve_annuity_payment(target_fv: Money, rate: Rate, periods: u32) -> PensionResult<Money> {
    check_rate(rate)?;
    if target_fv <= Decimal::ZERO {
        return Ok(Decimal::ZERO);
    }
    if periods == 0 {
        return Err(PensionError::DivisionGuard {
            context: "solve_annuity_payment: zero periods".into(),
        });
    }
    if rate.is_zero() {
        return Ok(target_fv / Decimal::from(periods));
    }
    let denominator = compound(rate, periods)? - Decimal::ONE;
    if denominator.is_zero() {
        return Err(PensionError::DivisionGuard {
            context: "solve_annuity_payment: annuity factor is zero".into(),
        });
    }
    let scaled = target_fv
        .checked_mul(rate)
        .ok_or_else(|| PensionError::overflow("solve_annuity_payment"))?;
    checked_div(scaled, denominator, "solve_annuity_payment")
}

/// Number of whole periods until `principal` grown at `rate` plus `payment`
/// per period reaches `target`. Bounded by `max_periods`.
pub fn solve_periods_for_target(
    target: Money,
    principal: Money,
    payment: Money,
    rate: Rate,
    max_periods: u32,
) -> PensionResult<u32> {
    check_rate(rate)?;
    check_non_negative("principal", principal)?;
    check_non_negative("payment", payment)?;

    let factor = Decimal::ONE + rate;
    let mut corpus = principal;
    let mut periods: u32 = 0;
    while corpus < target {
        if periods >= max_periods {
            return Err(PensionError::TargetUnreachable {
                target,
                max_periods,
            });
        }
        periods += 1;
        match corpus
            .checked_mul(factor)
            .and_then(|c| c.checked_add(payment))
        {
            Some(next) => corpus = next,
            // Past the decimal range means past any representable target.
            None => return Ok(periods),
        }
    }
    Ok(periods)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
