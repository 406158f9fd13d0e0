use std::collections::HashSet;
use std::fs;
use std::thread;

use tracing::{debug, info, warn};

use crate::models::{Company, Product};
use crate::scrapers::error::{CrawlError, ElementTimeout, StoreError};
use crate::scrapers::extract;
use crate::scrapers::probe::{self, find_first, text_in};
use crate::scrapers::selectors;
use crate::scrapers::traits::{BrowserSession, PageElement, SessionFactory};
use crate::scrapers::types::{CrawlEvent, CrawlOptions, CrawlerSettings};

/// Drives one browser session through the stores of one city.
///
/// Searching is retried in a fresh session up to `search_attempts` times.
/// Failures below the city level are logged and the store is skipped.
pub struct CityCrawler<'a, F: SessionFactory> {
    factory: &'a F,
    settings: &'a CrawlerSettings,
}

/// Crawl-local position in the store list
#[derive(Debug, Default)]
struct StoreCursor {
    index: usize,
    visited: HashSet<String>,
}

/// Outcome of one step over the store list
enum Listing<E> {
    Store(E, Company),
    LoadedMore,
    Skip,
    Exhausted,
}

impl<'a, F: SessionFactory> CityCrawler<'a, F> {
    pub fn new(factory: &'a F, settings: &'a CrawlerSettings) -> Self {
        Self { factory, settings }
    }

    /// Crawl every store of `city`, streaming partial results to `emit`.
    ///
    /// Returns all products of the city. Fails with `CityNotFound` when no
    /// suggestion shows up within the attempt budget.
    pub fn crawl(
        &self,
        city: &str,
        options: &CrawlOptions,
        emit: &mut dyn FnMut(CrawlEvent),
    ) -> Result<Vec<Product>, CrawlError> {
        let attempts = self.settings.search_attempts.max(1);

        for attempt in 1..=attempts {
            let session = self.factory.open(self.settings.headless)?;

            if self.search(&session, city)? {
                info!("[{}] City found on attempt {}/{}", city, attempt, attempts);
                let result = self.list_stores(&session, city, options, emit);
                if let Err(e) = session.close() {
                    debug!("[{}] Closing session failed: {}", city, e);
                }
                return result;
            }

            warn!("[{}] No city suggestion (attempt {}/{})", city, attempt, attempts);
            if let Err(e) = session.close() {
                debug!("[{}] Closing session failed: {}", city, e);
            }
        }

        Err(CrawlError::CityNotFound {
            city: city.to_string(),
            attempts,
        })
    }

    /// Type the query and report whether a suggestion appeared
    fn search(&self, session: &F::Session, city: &str) -> Result<bool, CrawlError> {
        session.navigate(&self.settings.site_url)?;
        probe::wait_for_presence(session, &selectors::CITY_INPUT, self.settings.page_timeout)?;

        let input = find_first(session, &selectors::CITY_INPUT)?.ok_or_else(|| {
            CrawlError::Timeout(ElementTimeout {
                locator: selectors::CITY_INPUT.to_string(),
                timeout: self.settings.page_timeout,
            })
        })?;

        // The suggestion list renders incrementally, so type like a person
        for c in city.chars() {
            input.send_keys(c.encode_utf8(&mut [0; 4]))?;
            thread::sleep(self.settings.keystroke_delay);
        }

        Ok(probe::wait_for_presence(
            session,
            &selectors::CITY_SUGGESTION,
            self.settings.suggestion_timeout,
        )
        .is_ok())
    }

    fn list_stores(
        &self,
        session: &F::Session,
        query: &str,
        options: &CrawlOptions,
        emit: &mut dyn FnMut(CrawlEvent),
    ) -> Result<Vec<Product>, CrawlError> {
        if let Some(suggestion) = find_first(session, &selectors::CITY_SUGGESTION)? {
            suggestion.click()?;
        }

        if probe::wait_for_presence(session, &selectors::STORE_ITEM, self.settings.store_list_timeout)
            .is_err()
        {
            info!("[{}] No stores listed", query);
            return Ok(Vec::new());
        }

        let city = self.resolved_city(session, query);
        if city != query {
            debug!("[{}] Resolved city: {}", query, city);
        }

        let mut cursor = StoreCursor::default();
        let mut products = Vec::new();

        loop {
            if probe::wait_for_presence(session, &selectors::STORE_ITEM, self.settings.store_list_timeout)
                .is_err()
            {
                warn!("[{}] Store list did not render again, stopping", city);
                break;
            }

            let stores = match session.find_all(&selectors::STORE_ITEM) {
                Ok(stores) => stores,
                Err(e) => {
                    warn!("[{}] Could not read store list: {}", city, e);
                    break;
                }
            };

            let (element, company) = match self.next_store(session, &stores, &mut cursor, &city, options) {
                Listing::Store(element, company) => (element, company),
                Listing::LoadedMore | Listing::Skip => continue,
                Listing::Exhausted => break,
            };

            let list_url = session.current_url()?;
            let store_name = company.name.clone();

            match self.visit_store(session, element, company, emit) {
                Ok(batch) => {
                    debug!("[{}] {}: {} products", city, store_name, batch.len());
                    products.extend(batch);
                }
                Err(StoreError::ClickIntercepted) => {
                    debug!("[{}] Click on {} intercepted, skipping", city, store_name);
                }
                Err(StoreError::Timeout(e)) => {
                    warn!("[{}] Timeout on {}: {}", city, store_name, e);
                }
                Err(e) => {
                    warn!("[{}] Failed to read {}: {}", city, store_name, e);
                    self.dump_page(session, &city, &store_name);
                }
            }

            self.return_to_list(session, &list_url, &city);
        }

        info!("[{}] Done: {} stores, {} products", city, cursor.visited.len(), products.len());
        Ok(products)
    }

    /// Pick the next store to visit, loading more stores when the rendered
    /// list is used up
    fn next_store<'l, E: PageElement>(
        &self,
        session: &F::Session,
        stores: &'l [E],
        cursor: &mut StoreCursor,
        city: &str,
        options: &CrawlOptions,
    ) -> Listing<&'l E> {
        let Some(element) = stores.get(cursor.index) else {
            return match find_first(session, &selectors::LOAD_MORE_STORES) {
                Ok(Some(button)) => match button.click() {
                    Ok(()) => {
                        debug!("[{}] Loading more stores", city);
                        cursor.index = 0;
                        thread::sleep(self.settings.load_more_pause);
                        Listing::LoadedMore
                    }
                    Err(e) => {
                        warn!("[{}] Could not load more stores: {}", city, e);
                        Listing::Exhausted
                    }
                },
                Ok(None) => Listing::Exhausted,
                Err(e) => {
                    warn!("[{}] Could not look for more stores: {}", city, e);
                    Listing::Exhausted
                }
            };
        };
        cursor.index += 1;

        let company = match extract::company(element, city) {
            Ok(company) => company,
            Err(e) => {
                warn!("[{}] Unreadable store card #{}: {}", city, cursor.index, e);
                return Listing::Skip;
            }
        };

        // Closed stores are listed last, so the first one ends the crawl
        if company.is_closed && !options.include_closed_stores {
            info!("[{}] Reached closed stores at {}", city, company.name);
            return Listing::Exhausted;
        }

        if !cursor.visited.insert(company.name.clone()) {
            return Listing::Skip;
        }

        Listing::Store(element, company)
    }

    /// Enter a store, emit its company record, then its products as one batch
    fn visit_store<E: PageElement>(
        &self,
        session: &F::Session,
        element: &E,
        mut company: Company,
        emit: &mut dyn FnMut(CrawlEvent),
    ) -> Result<Vec<Product>, StoreError> {
        element.click()?;
        thread::sleep(self.settings.click_settle);
        probe::wait_for_presence(session, &selectors::STORE_HEADING, self.settings.page_timeout)?;

        company.company_url = Some(session.current_url()?);
        emit(CrawlEvent::Company(company.clone()));

        if probe::wait_for_presence(session, &selectors::PRODUCT_CARD, self.settings.product_timeout)
            .is_err()
        {
            debug!("[{}] {} has no products", company.city, company.name);
            emit(CrawlEvent::Products(Vec::new()));
            return Ok(Vec::new());
        }

        let mut batch = Vec::new();
        for group in session.find_all(&selectors::CATEGORY_GROUP)? {
            let category = text_in(&group, &selectors::CATEGORY_TITLE)?.unwrap_or_default();

            for card in group.find_all(&selectors::PRODUCT_CARD)? {
                match extract::product(&card, &company, &category)? {
                    Some(product) => batch.push(product),
                    None => debug!("[{}] Skipping placeholder card in {}", company.city, category),
                }
            }
        }

        emit(CrawlEvent::Products(batch.clone()));
        Ok(batch)
    }

    fn resolved_city(&self, session: &F::Session, query: &str) -> String {
        match find_first(session, &selectors::RESOLVED_CITY) {
            Ok(Some(header)) => match header.text() {
                Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
                _ => query.to_string(),
            },
            _ => query.to_string(),
        }
    }

    /// Go back to the store list unless the page never left it
    fn return_to_list(&self, session: &F::Session, list_url: &str, city: &str) {
        match session.current_url() {
            Ok(url) if url == list_url => {}
            _ => {
                if let Err(e) = session.go_back() {
                    warn!("[{}] Could not navigate back to the store list: {}", city, e);
                }
            }
        }
    }

    fn dump_page(&self, session: &F::Session, city: &str, store: &str) {
        let Some(dir) = &self.settings.debug_dir else {
            return;
        };

        let file_name: String = format!("{city}-{store}")
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { '_' })
            .collect();
        let path = dir.join(format!("{file_name}.html"));

        let written = session
            .page_source()
            .map_err(anyhow::Error::from)
            .and_then(|html| {
                fs::create_dir_all(dir)?;
                fs::write(&path, html)?;
                Ok(())
            });

        match written {
            Ok(()) => info!("Saved page HTML to {}", path.display()),
            Err(e) => debug!("Could not save page HTML: {:#}", e),
        }
    }
}
