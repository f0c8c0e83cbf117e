pub mod commands;
pub mod table;
pub mod types;
