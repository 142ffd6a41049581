pub mod contribution;
pub mod projection;
pub mod readiness;
