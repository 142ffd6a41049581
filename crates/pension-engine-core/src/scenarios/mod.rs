#[cfg(feature = "monte_carlo")]
pub mod monte_carlo;
pub mod stress;
pub mod what_if;
