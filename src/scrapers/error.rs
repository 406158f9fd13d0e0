use std::time::Duration;

use thiserror::Error;

/// Failure reported by a browser session or one of its elements
#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("failed to launch browser: {0}")]
    Launch(String),

    #[error("click intercepted by another element")]
    ClickIntercepted,

    #[error("browser driver error: {0}")]
    Driver(String),
}

impl BrowserError {
    /// Wrap an `anyhow` error from the driver, keeping its context chain.
    pub fn driver(err: anyhow::Error) -> Self {
        Self::Driver(format!("{err:#}"))
    }
}

/// A bounded wait elapsed before the element appeared
#[derive(Debug, Clone, Error)]
#[error("timed out after {timeout:?} waiting for {locator}")]
pub struct ElementTimeout {
    pub locator: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone, Error, PartialEq)]
#[error("invalid price {input:?}")]
pub struct PriceParseError {
    pub input: String,
}

/// Failure while reading a store or product card
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("missing {0}")]
    MissingField(&'static str),

    #[error(transparent)]
    Price(#[from] PriceParseError),

    #[error(transparent)]
    Browser(#[from] BrowserError),
}

/// Why a single store visit was abandoned
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("click intercepted")]
    ClickIntercepted,

    #[error(transparent)]
    Timeout(#[from] ElementTimeout),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Browser(BrowserError),
}

impl From<BrowserError> for StoreError {
    fn from(err: BrowserError) -> Self {
        match err {
            BrowserError::ClickIntercepted => Self::ClickIntercepted,
            other => Self::Browser(other),
        }
    }
}

/// Failure that ends a whole city crawl
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("city '{city}' not found after {attempts} attempts")]
    CityNotFound { city: String, attempts: u32 },

    #[error("browser session failed: {0}")]
    Session(#[from] BrowserError),

    #[error(transparent)]
    Timeout(#[from] ElementTimeout),
}
