pub mod add;
pub mod browse;
pub mod dashboard;
pub mod edit;
pub mod import;
pub mod remove;
pub mod summary;
pub mod terminal;
pub mod text;
