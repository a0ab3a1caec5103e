pub mod browser;
pub mod config;
pub mod extract;
pub mod geo;
pub mod model;
pub mod output;
pub mod runner;
pub mod scrape;
pub mod store;
