use pension_engine_core::growth::{
    compound, future_value_annuity, future_value_lump_sum, solve_annuity_payment,
    solve_periods_for_target, MAX_SOLVE_PERIODS,
};
use pension_engine_core::PensionError;
use pretty_assertions::assert_eq;
use proptest::prelude::{prop_assert, prop_assert_eq, proptest};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

// ===========================================================================
// Known values
// ===========================================================================

#[test]
fn test_textbook_annuity() {
    // 1,000 a year for 10 years at 5%: factor 12.577892535...
    let fv = future_value_annuity(dec!(1000), dec!(0.05), 10).unwrap();
    assert_eq!(fv.round_dp(2), dec!(12577.89));
}

#[test]
fn test_lump_sum_doubles_around_rule_of_72() {
    // 8% doubles in just over 9 years
    let nine = future_value_lump_sum(dec!(1000), dec!(0.08), 9).unwrap();
    let ten = future_value_lump_sum(dec!(1000), dec!(0.08), 10).unwrap();
    assert!(nine < dec!(2000));
    assert!(ten > dec!(2000));
}

#[test]
fn test_negative_growth_allowed_above_minus_one() {
    let factor = compound(dec!(-0.20), 2).unwrap();
    assert_eq!(factor, dec!(0.64));

    let err = compound(dec!(-1), 1).unwrap_err();
    assert!(err.is_client_error());
}

// ===========================================================================
// Period solver
// ===========================================================================

#[test]
fn test_period_solver_stalled_plan() {
    let err = solve_periods_for_target(
        dec!(500000),
        dec!(10000),
        Decimal::ZERO,
        Decimal::ZERO,
        MAX_SOLVE_PERIODS,
    )
    .unwrap_err();
    assert!(matches!(
        err,
        PensionError::TargetUnreachable {
            max_periods: 100,
            ..
        }
    ));
    assert!(!err.is_client_error());
}

#[test]
fn test_period_solver_agrees_with_projection() {
    let n = solve_periods_for_target(dec!(800000), dec!(25000), dec!(4800), dec!(0.07), 100)
        .unwrap();
    let reached = future_value_lump_sum(dec!(25000), dec!(0.07), n).unwrap()
        + future_value_annuity(dec!(4800), dec!(0.07), n).unwrap();
    let short = future_value_lump_sum(dec!(25000), dec!(0.07), n - 1).unwrap()
        + future_value_annuity(dec!(4800), dec!(0.07), n - 1).unwrap();
    assert!(reached >= dec!(800000));
    assert!(short < dec!(800000));
}

// ===========================================================================
// Properties
// ===========================================================================

proptest! {
    #![proptest_config(proptest::test_runner::Config::with_cases(64))]

    #[test]
    fn prop_zero_rate_annuity_is_linear(payment in 0u32..5_000_000, periods in 0u32..80) {
        let p = Decimal::from(payment);
        let fv = future_value_annuity(p, Decimal::ZERO, periods).unwrap();
        prop_assert_eq!(fv, p * Decimal::from(periods));
    }

    #[test]
    fn prop_payment_round_trip(
        payment in 1u32..1_000_000,
        rate_bp in 1u32..1_500,
        periods in 1u32..60,
    ) {
        let p = Decimal::from(payment);
        let rate = Decimal::from(rate_bp) / dec!(10000);
        let fv = future_value_annuity(p, rate, periods).unwrap();
        let solved = solve_annuity_payment(fv, rate, periods).unwrap();
        prop_assert!(
            (solved - p).abs() <= dec!(0.000001),
            "payment {} solved back to {}", p, solved
        );
    }

    #[test]
    fn prop_compound_grows_with_periods(rate_bp in 1u32..2_000, periods in 0u32..50) {
        let rate = Decimal::from(rate_bp) / dec!(10000);
        prop_assert!(compound(rate, periods + 1).unwrap() > compound(rate, periods).unwrap());
    }
}
