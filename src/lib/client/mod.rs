pub mod client;
#[cfg(test)]
pub mod testing;
pub mod types;
