pub mod dataset;
pub mod models;
pub mod scrapers;
