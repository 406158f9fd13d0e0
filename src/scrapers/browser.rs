use anyhow::Context;
use headless_chrome::browser::tab::NoElementFound;
use headless_chrome::{Browser, Element, LaunchOptions, Tab};
use std::sync::Arc;
use tracing::{debug, info};

use crate::scrapers::error::BrowserError;
use crate::scrapers::traits::{BrowserSession, Locator, PageElement, SessionFactory};

/// Launches one headless Chrome process per session
#[derive(Debug, Clone, Default)]
pub struct ChromeSessionFactory;

impl SessionFactory for ChromeSessionFactory {
    type Session = ChromeSession;

    fn open(&self, headless: bool) -> Result<ChromeSession, BrowserError> {
        ChromeSession::launch(headless).map_err(|e| BrowserError::Launch(format!("{e:#}")))
    }
}

/// A Chrome process with a single tab
pub struct ChromeSession {
    // Dropping the browser kills the process
    _browser: Browser,
    tab: Arc<Tab>,
}

impl ChromeSession {
    fn launch(headless: bool) -> anyhow::Result<Self> {
        info!("Launching Chrome (headless: {})...", headless);

        let options = LaunchOptions::default_builder()
            .headless(headless)
            .build()
            .context("Failed to build launch options")?;

        let browser = Browser::new(options).context("Failed to launch Chrome browser")?;
        let tab = browser.new_tab().context("Failed to open tab")?;

        Ok(Self {
            _browser: browser,
            tab,
        })
    }
}

/// headless_chrome reports an empty match as an error; treat it as no elements
fn found_or_empty<'a>(
    result: anyhow::Result<Vec<Element<'a>>>,
) -> Result<Vec<Element<'a>>, BrowserError> {
    match result {
        Ok(elements) => Ok(elements),
        Err(e) if e.downcast_ref::<NoElementFound>().is_some() => Ok(Vec::new()),
        Err(e) => Err(BrowserError::driver(e)),
    }
}

fn button_xpath(label: &str) -> String {
    format!("//button[normalize-space()=\"{label}\"]")
}

/// Collapse runs of whitespace the way XPath `normalize-space()` does
fn normalize_space(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

impl BrowserSession for ChromeSession {
    type Element<'a> = Element<'a>;

    fn navigate(&self, url: &str) -> Result<(), BrowserError> {
        debug!("Navigating to {}", url);
        self.tab
            .navigate_to(url)
            .and_then(|tab| tab.wait_until_navigated())
            .map(|_| ())
            .map_err(BrowserError::driver)
    }

    fn find_all(&self, locator: &Locator) -> Result<Vec<Element<'_>>, BrowserError> {
        match locator {
            Locator::Css(css) => found_or_empty(self.tab.find_elements(css)),
            Locator::ButtonText(label) => {
                found_or_empty(self.tab.find_elements_by_xpath(&button_xpath(label)))
            }
        }
    }

    fn current_url(&self) -> Result<String, BrowserError> {
        Ok(self.tab.get_url())
    }

    fn go_back(&self) -> Result<(), BrowserError> {
        self.tab
            .evaluate("window.history.back()", false)
            .and_then(|_| self.tab.wait_until_navigated())
            .map(|_| ())
            .map_err(BrowserError::driver)
    }

    fn page_source(&self) -> Result<String, BrowserError> {
        self.tab.get_content().map_err(BrowserError::driver)
    }

    fn close(self) -> Result<(), BrowserError> {
        self.tab.close(true).map(|_| ()).map_err(BrowserError::driver)
    }
}

impl PageElement for Element<'_> {
    fn find_all(&self, locator: &Locator) -> Result<Vec<Self>, BrowserError> {
        match locator {
            Locator::Css(css) => found_or_empty(self.find_elements(css)),
            Locator::ButtonText(label) => {
                let mut matching = Vec::new();
                for button in found_or_empty(self.find_elements("button"))? {
                    let text = button.get_inner_text().map_err(BrowserError::driver)?;
                    if normalize_space(&text) == *label {
                        matching.push(button);
                    }
                }
                Ok(matching)
            }
        }
    }

    fn text(&self) -> Result<String, BrowserError> {
        self.get_inner_text().map_err(BrowserError::driver)
    }

    fn attribute(&self, name: &str) -> Result<Option<String>, BrowserError> {
        self.get_attribute_value(name).map_err(BrowserError::driver)
    }

    fn click(&self) -> Result<(), BrowserError> {
        Element::click(self).map(|_| ()).map_err(BrowserError::driver)
    }

    fn send_keys(&self, text: &str) -> Result<(), BrowserError> {
        self.type_into(text).map(|_| ()).map_err(BrowserError::driver)
    }
}
