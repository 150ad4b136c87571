pub mod utils;

mod aggregator;
mod config;
mod service;
