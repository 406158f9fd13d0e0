pub mod browser;
pub mod coordinator;
pub mod crawler;
pub mod error;
pub mod extract;
pub mod price;
pub mod probe;
pub mod selectors;
pub mod traits;
pub mod types;

#[cfg(test)]
pub(crate) mod snapshot;

pub use browser::{ChromeSession, ChromeSessionFactory};
pub use coordinator::{CityOutcome, CityReport, CrawlCoordinator};
pub use crawler::CityCrawler;
pub use error::{BrowserError, CrawlError};
pub use traits::{BrowserSession, Locator, PageElement, SessionFactory};
pub use types::{CrawlEvent, CrawlOptions, CrawlerSettings};
