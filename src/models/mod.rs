pub mod log;
pub mod transaction;
