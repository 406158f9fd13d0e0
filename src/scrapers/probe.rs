use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::scrapers::error::{BrowserError, ElementTimeout};
use crate::scrapers::traits::{BrowserSession, Locator, PageElement};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// First element in the current document matching `locator`
pub fn find_first<'s, S: BrowserSession>(
    session: &'s S,
    locator: &Locator,
) -> Result<Option<S::Element<'s>>, BrowserError> {
    Ok(session.find_all(locator)?.into_iter().next())
}

/// First descendant of `scope` matching `locator`
pub fn find_first_in<E: PageElement>(scope: &E, locator: &Locator) -> Result<Option<E>, BrowserError> {
    Ok(scope.find_all(locator)?.into_iter().next())
}

pub fn exists_in<E: PageElement>(scope: &E, locator: &Locator) -> Result<bool, BrowserError> {
    Ok(find_first_in(scope, locator)?.is_some())
}

/// Trimmed text of the first descendant matching `locator`, if any
pub fn text_in<E: PageElement>(scope: &E, locator: &Locator) -> Result<Option<String>, BrowserError> {
    find_first_in(scope, locator)?
        .map(|el| el.text().map(|t| t.trim().to_string()))
        .transpose()
}

/// Block until an element matching `locator` is present or `timeout` elapses.
///
/// Driver errors while polling count as "not present yet".
pub fn wait_for_presence<S: BrowserSession>(
    session: &S,
    locator: &Locator,
    timeout: Duration,
) -> Result<(), ElementTimeout> {
    let deadline = Instant::now() + timeout;

    loop {
        match session.find_all(locator) {
            Ok(found) if !found.is_empty() => return Ok(()),
            Ok(_) => {}
            Err(e) => debug!("Polling {} failed: {}", locator, e),
        }

        let now = Instant::now();
        if now >= deadline {
            return Err(ElementTimeout {
                locator: locator.to_string(),
                timeout,
            });
        }
        thread::sleep(POLL_INTERVAL.min(deadline - now));
    }
}
