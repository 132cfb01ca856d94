pub mod app;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod export;
pub mod model;
pub mod output;
pub mod pipeline;
pub mod server;
pub mod sheets;

#[cfg(test)]
mod tests;
