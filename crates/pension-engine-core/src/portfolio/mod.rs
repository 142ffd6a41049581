pub mod allocation;
pub mod rebalancing;
