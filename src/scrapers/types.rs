use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::models::{Company, Product};

/// Options chosen by the user for a fetch
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CrawlOptions {
    /// Keep crawling past the first closed store instead of stopping there
    #[serde(default)]
    pub include_closed_stores: bool,
}

/// Engine settings: where to crawl and how long to wait for the page
#[derive(Debug, Clone)]
pub struct CrawlerSettings {
    pub site_url: String,
    pub headless: bool,
    /// Number of cities crawled in parallel
    pub workers: usize,
    /// Total city search attempts before giving up with "city not found"
    pub search_attempts: u32,
    /// Generic presence wait (search input, store heading)
    pub page_timeout: Duration,
    pub suggestion_timeout: Duration,
    pub store_list_timeout: Duration,
    pub product_timeout: Duration,
    pub keystroke_delay: Duration,
    pub load_more_pause: Duration,
    pub click_settle: Duration,
    /// When set, the page of a store that failed unexpectedly is dumped here
    pub debug_dir: Option<PathBuf>,
}

impl Default for CrawlerSettings {
    fn default() -> Self {
        Self {
            site_url: "https://www.deliverymuch.com.br/".to_string(),
            headless: true,
            workers: 4,
            search_attempts: 3,
            page_timeout: Duration::from_secs(20),
            suggestion_timeout: Duration::from_secs(5),
            store_list_timeout: Duration::from_secs(20),
            product_timeout: Duration::from_secs(5),
            keystroke_delay: Duration::from_millis(200),
            load_more_pause: Duration::from_secs(1),
            click_settle: Duration::from_millis(100),
            debug_dir: None,
        }
    }
}

/// Partial result streamed out of a city crawl
#[derive(Debug, Clone, PartialEq)]
pub enum CrawlEvent {
    /// A store was entered; always precedes that store's product batch
    Company(Company),
    /// Every product read from one store, in page order
    Products(Vec<Product>),
}
