pub mod builder;
pub mod filter;
pub mod paginator;
pub mod state;
pub mod types;
