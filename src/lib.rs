pub mod app;
pub mod cancel;
pub mod cli;
pub mod execution;
pub mod features;
pub mod library;
pub mod models;
pub mod pattern;
pub mod quality;
pub mod state_store;
pub mod utils;

#[cfg(test)]
pub mod test_utils;
