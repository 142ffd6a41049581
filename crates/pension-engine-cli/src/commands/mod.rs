pub mod advisory;
pub mod book;
pub mod planning;
pub mod scenarios;
