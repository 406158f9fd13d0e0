use std::fmt;

use crate::scrapers::error::BrowserError;

/// How an element is located on the page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Locator {
    /// CSS selector (also covers class and tag lookups)
    Css(&'static str),
    /// A `<button>` whose normalized text equals the label
    ButtonText(&'static str),
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Css(css) => write!(f, "css `{css}`"),
            Locator::ButtonText(label) => write!(f, "button \"{label}\""),
        }
    }
}

/// A handle to one DOM element inside a browser session
pub trait PageElement: Sized {
    /// All descendants matching `locator`. No match is an empty vec, not an error.
    fn find_all(&self, locator: &Locator) -> Result<Vec<Self>, BrowserError>;

    fn text(&self) -> Result<String, BrowserError>;

    fn attribute(&self, name: &str) -> Result<Option<String>, BrowserError>;

    fn click(&self) -> Result<(), BrowserError>;

    /// Focus the element and type `text` into it
    fn send_keys(&self, text: &str) -> Result<(), BrowserError>;
}

/// A single browser session, owned by exactly one city crawl
pub trait BrowserSession {
    type Element<'a>: PageElement
    where
        Self: 'a;

    fn navigate(&self, url: &str) -> Result<(), BrowserError>;

    /// All elements in the current document matching `locator`
    fn find_all(&self, locator: &Locator) -> Result<Vec<Self::Element<'_>>, BrowserError>;

    fn current_url(&self) -> Result<String, BrowserError>;

    fn go_back(&self) -> Result<(), BrowserError>;

    /// HTML of the current document, used for debug dumps
    fn page_source(&self) -> Result<String, BrowserError>;

    fn close(self) -> Result<(), BrowserError>;
}

/// Provides ready-to-drive browser sessions.
/// Shared by all workers, so it must be safe to call from any thread.
pub trait SessionFactory: Send + Sync {
    type Session: BrowserSession;

    fn open(&self, headless: bool) -> Result<Self::Session, BrowserError>;
}
