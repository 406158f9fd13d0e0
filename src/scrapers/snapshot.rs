use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use scraper::{ElementRef, Html, Selector};

use crate::scrapers::error::BrowserError;
use crate::scrapers::traits::{BrowserSession, Locator, PageElement, SessionFactory};
use crate::scrapers::types::CrawlerSettings;

pub const ORIGIN: &str = "https://snapshot.test";

/// Settings pointed at the snapshot site with millisecond waits
pub fn fast_settings() -> CrawlerSettings {
    CrawlerSettings {
        site_url: format!("{ORIGIN}/"),
        page_timeout: Duration::from_millis(50),
        suggestion_timeout: Duration::from_millis(30),
        store_list_timeout: Duration::from_millis(30),
        product_timeout: Duration::from_millis(30),
        keystroke_delay: Duration::ZERO,
        load_more_pause: Duration::ZERO,
        click_settle: Duration::ZERO,
        ..CrawlerSettings::default()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProductFixture {
    title: Option<String>,
    original: Option<String>,
    price: Option<String>,
    sale: Option<String>,
    image: Option<String>,
}

impl ProductFixture {
    pub fn priced(title: &str, price: &str) -> Self {
        Self {
            title: Some(title.to_string()),
            price: Some(price.to_string()),
            ..Default::default()
        }
    }

    pub fn on_sale(title: &str, original: &str, sale: &str) -> Self {
        Self {
            title: Some(title.to_string()),
            original: Some(original.to_string()),
            sale: Some(sale.to_string()),
            ..Default::default()
        }
    }

    /// Placeholder card without a title
    pub fn untitled(price: &str) -> Self {
        Self {
            price: Some(price.to_string()),
            ..Default::default()
        }
    }

    pub fn unpriced(title: &str) -> Self {
        Self {
            title: Some(title.to_string()),
            ..Default::default()
        }
    }

    pub fn image(mut self, src: &str) -> Self {
        self.image = Some(src.to_string());
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct StoreFixture {
    name: String,
    rating: Option<String>,
    banners: Vec<String>,
    closed: bool,
    logo: Option<String>,
    intercept_click: bool,
    categories: Vec<(String, Vec<ProductFixture>)>,
}

impl StoreFixture {
    pub fn open(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn closed(name: &str) -> Self {
        Self {
            closed: true,
            ..Self::open(name)
        }
    }

    pub fn rating(mut self, label: &str) -> Self {
        self.rating = Some(label.to_string());
        self
    }

    pub fn banner(mut self, label: &str) -> Self {
        self.banners.push(label.to_string());
        self
    }

    pub fn logo(mut self, src: &str) -> Self {
        self.logo = Some(src.to_string());
        self
    }

    /// Clicking this store's card is blocked by an overlay
    pub fn intercepting(mut self) -> Self {
        self.intercept_click = true;
        self
    }

    pub fn category(mut self, title: &str, products: Vec<ProductFixture>) -> Self {
        self.categories.push((title.to_string(), products));
        self
    }
}

#[derive(Debug)]
struct CityFixture {
    query: String,
    resolved: String,
    slug: String,
    /// Store list pages revealed one at a time by "load more"
    pages: Vec<Vec<StoreFixture>>,
    failing_searches: AtomicU32,
}

#[derive(Debug, Default)]
pub struct SiteFixture {
    cities: Vec<CityFixture>,
    without_search_box: bool,
}

impl SiteFixture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn city(self, query: &str, resolved: &str, pages: Vec<Vec<StoreFixture>>) -> Self {
        self.flaky_city(query, resolved, 0, pages)
    }

    /// Home page that never renders the city input
    pub fn without_search_box(mut self) -> Self {
        self.without_search_box = true;
        self
    }

    /// A city whose first `failures` searches show no suggestion
    pub fn flaky_city(
        mut self,
        query: &str,
        resolved: &str,
        failures: u32,
        pages: Vec<Vec<StoreFixture>>,
    ) -> Self {
        self.cities.push(CityFixture {
            query: query.to_string(),
            resolved: resolved.to_string(),
            slug: slugify(query),
            pages,
            failing_searches: AtomicU32::new(failures),
        });
        self
    }

    fn render(&self) -> HashMap<String, Html> {
        let mut pages = HashMap::new();
        pages.insert("/".to_string(), Html::parse_document(&home_html(None, self.without_search_box)));

        for city in &self.cities {
            pages.insert(
                format!("/?q={}", city.slug),
                Html::parse_document(&home_html(Some(city), self.without_search_box)),
            );

            let shown_pages = city.pages.len().max(1);
            for shown in 1..=shown_pages {
                pages.insert(
                    listing_path(&city.slug, shown),
                    Html::parse_document(&listing_html(city, shown)),
                );
            }

            for (index, store) in city.pages.iter().flatten().enumerate() {
                pages.insert(
                    format!("/store/{}/{}", city.slug, index),
                    Html::parse_document(&store_html(store)),
                );
            }
        }

        pages
    }
}

/// Hands out sessions over the fixture site. Clicking an element with a
/// `data-nav` attribute navigates to that path; `data-intercept` makes the
/// click fail.
///
/// Also records and records how many were in use at once
pub struct SnapshotSessionFactory {
    site: Arc<SiteFixture>,
    latency: Duration,
    failing_opens: AtomicU32,
    opened: AtomicUsize,
    active: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl SnapshotSessionFactory {
    pub fn new(site: SiteFixture) -> Self {
        Self {
            site: Arc::new(site),
            latency: Duration::ZERO,
            failing_opens: AtomicU32::new(0),
            opened: AtomicUsize::new(0),
            active: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Delay applied to every navigation and click
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Fail the next `count` launches as if no browser were installed
    pub fn failing_opens(mut self, count: u32) -> Self {
        self.failing_opens = AtomicU32::new(count);
        self
    }

    pub fn sessions_opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn peak_sessions(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

impl SessionFactory for SnapshotSessionFactory {
    type Session = SnapshotSession;

    fn open(&self, _headless: bool) -> Result<SnapshotSession, BrowserError> {
        let refused = self
            .failing_opens
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if refused {
            return Err(BrowserError::Launch("no chrome".to_string()));
        }

        self.opened.fetch_add(1, Ordering::SeqCst);
        let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now_active, Ordering::SeqCst);

        Ok(SnapshotSession {
            site: Arc::clone(&self.site),
            pages: self.site.render(),
            latency: self.latency,
            active: Arc::clone(&self.active),
            current: RefCell::new("about:blank".to_string()),
            history: RefCell::new(Vec::new()),
            typed: RefCell::new(String::new()),
        })
    }
}

pub struct SnapshotSession {
    site: Arc<SiteFixture>,
    pages: HashMap<String, Html>,
    latency: Duration,
    active: Arc<AtomicUsize>,
    current: RefCell<String>,
    history: RefCell<Vec<String>>,
    typed: RefCell<String>,
}

impl SnapshotSession {
    fn document(&self) -> Result<&Html, BrowserError> {
        let current = self.current.borrow();
        match self.pages.get(current.as_str()) {
            Some(document) => Ok(document),
            None => Err(BrowserError::Driver(format!("no document loaded at {current}"))),
        }
    }

    fn visit(&self, path: &str) -> Result<(), BrowserError> {
        if !self.pages.contains_key(path) {
            return Err(BrowserError::Driver(format!("404 for {path}")));
        }
        thread::sleep(self.latency);
        let previous = self.current.replace(path.to_string());
        self.history.borrow_mut().push(previous);
        self.typed.borrow_mut().clear();
        Ok(())
    }

    fn type_into_search(&self, text: &str) {
        let mut typed = self.typed.borrow_mut();
        typed.push_str(text);

        let Some(city) = self
            .site
            .cities
            .iter()
            .find(|c| c.query.eq_ignore_ascii_case(typed.as_str()))
        else {
            return;
        };

        let suppressed = city
            .failing_searches
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if !suppressed {
            *self.current.borrow_mut() = format!("/?q={}", city.slug);
        }
    }
}

impl Drop for SnapshotSession {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

impl BrowserSession for SnapshotSession {
    type Element<'a> = SnapshotElement<'a>;

    fn navigate(&self, url: &str) -> Result<(), BrowserError> {
        let path = url.strip_prefix(ORIGIN).unwrap_or(url);
        self.visit(if path.is_empty() { "/" } else { path })
    }

    fn find_all(&self, locator: &Locator) -> Result<Vec<SnapshotElement<'_>>, BrowserError> {
        query(self, self.document()?.root_element(), locator)
    }

    fn current_url(&self) -> Result<String, BrowserError> {
        Ok(format!("{ORIGIN}{}", self.current.borrow()))
    }

    fn go_back(&self) -> Result<(), BrowserError> {
        let previous = self
            .history
            .borrow_mut()
            .pop()
            .ok_or_else(|| BrowserError::Driver("history is empty".to_string()))?;
        *self.current.borrow_mut() = previous;
        Ok(())
    }

    fn page_source(&self) -> Result<String, BrowserError> {
        Ok(self.document()?.html())
    }

    fn close(self) -> Result<(), BrowserError> {
        Ok(())
    }
}

pub struct SnapshotElement<'a> {
    session: &'a SnapshotSession,
    node: ElementRef<'a>,
}

impl PageElement for SnapshotElement<'_> {
    fn find_all(&self, locator: &Locator) -> Result<Vec<Self>, BrowserError> {
        query(self.session, self.node, locator)
    }

    fn text(&self) -> Result<String, BrowserError> {
        Ok(self.node.text().collect())
    }

    fn attribute(&self, name: &str) -> Result<Option<String>, BrowserError> {
        Ok(self.node.value().attr(name).map(str::to_string))
    }

    fn click(&self) -> Result<(), BrowserError> {
        if self.node.value().attr("data-intercept").is_some() {
            return Err(BrowserError::ClickIntercepted);
        }
        match self.node.value().attr("data-nav") {
            Some(path) => self.session.visit(path),
            None => Ok(()),
        }
    }

    fn send_keys(&self, text: &str) -> Result<(), BrowserError> {
        if self.node.value().id() != Some("city") {
            return Err(BrowserError::Driver("element is not typeable".to_string()));
        }
        self.session.type_into_search(text);
        Ok(())
    }
}

fn query<'a>(
    session: &'a SnapshotSession,
    root: ElementRef<'a>,
    locator: &Locator,
) -> Result<Vec<SnapshotElement<'a>>, BrowserError> {
    let wrap = |node: ElementRef<'a>| SnapshotElement { session, node };

    match locator {
        Locator::Css(css) => {
            let selector = Selector::parse(css)
                .map_err(|e| BrowserError::Driver(format!("bad selector {css}: {e:?}")))?;
            Ok(root.select(&selector).map(wrap).collect())
        }
        Locator::ButtonText(label) => {
            let selector = Selector::parse("button").expect("static selector");
            Ok(root
                .select(&selector)
                .filter(|b| normalize_space(&b.text().collect::<String>()) == *label)
                .map(wrap)
                .collect())
        }
    }
}

fn normalize_space(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn slugify(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect()
}

fn listing_path(slug: &str, shown: usize) -> String {
    if shown <= 1 {
        format!("/city/{slug}")
    } else {
        format!("/city/{slug}?page={shown}")
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn home_html(suggesting: Option<&CityFixture>, without_search_box: bool) -> String {
    let suggestion = suggesting
        .map(|city| {
            format!(
                r#"<li class="cursor-pointer"><button data-nav="/city/{}">{}</button></li>"#,
                city.slug,
                escape(&city.resolved)
            )
        })
        .unwrap_or_default();

    let input = if without_search_box {
        ""
    } else {
        r#"<input id="city" type="text">"#
    };

    format!(
        r#"<html><body><header></header><main>{input}<ul class="suggestions">{suggestion}</ul></main></body></html>"#
    )
}

fn listing_html(city: &CityFixture, shown: usize) -> String {
    let mut items = String::new();
    for (index, store) in city.pages.iter().take(shown).flatten().enumerate() {
        items.push_str(&store_card_html(&city.slug, index, store));
    }

    let load_more = if shown < city.pages.len() {
        format!(
            r#"<button data-nav="{}"> Carregar mais lojas </button>"#,
            listing_path(&city.slug, shown + 1)
        )
    } else {
        String::new()
    };

    format!(
        r#"<html><body><header><span class="address__city">{}</span></header><ul class="company-list">{items}</ul>{load_more}</body></html>"#,
        escape(&city.resolved)
    )
}

fn store_card_html(slug: &str, index: usize, store: &StoreFixture) -> String {
    let mut html = format!(r#"<li class="company-list__item" data-nav="/store/{slug}/{index}""#);
    if store.intercept_click {
        html.push_str(" data-intercept");
    }
    html.push('>');

    if let Some(logo) = &store.logo {
        html.push_str(&format!(r#"<img src="{}">"#, escape(logo)));
    }
    html.push_str(&format!(r#"<h3 class="company__name">{}</h3>"#, escape(&store.name)));
    if let Some(rating) = &store.rating {
        html.push_str(&format!(r#"<span class="company__rating">{}</span>"#, escape(rating)));
    }
    for banner in &store.banners {
        html.push_str(&format!(r#"<span class="company__banner">{}</span>"#, escape(banner)));
    }
    if store.closed {
        html.push_str("<figure><figcaption>Fechado</figcaption></figure>");
    }

    html.push_str("</li>");
    html
}

fn store_html(store: &StoreFixture) -> String {
    let mut groups = String::new();
    for (title, products) in &store.categories {
        groups.push_str(&format!(
            r#"<section class="product-categories__group"><h2 class="category__title">{}</h2>"#,
            escape(title)
        ));
        for product in products {
            groups.push_str(&product_card_html(product));
        }
        groups.push_str("</section>");
    }

    format!(
        r#"<html><body><h1 class="company__name">{}</h1><div class="product-categories">{groups}</div></body></html>"#,
        escape(&store.name)
    )
}

fn product_card_html(product: &ProductFixture) -> String {
    let mut html = String::from(r#"<div class="product-card">"#);
    if let Some(src) = &product.image {
        html.push_str(&format!(r#"<img src="{}">"#, escape(src)));
    }
    if let Some(title) = &product.title {
        html.push_str(&format!(r#"<h4 class="product-card__title">{}</h4>"#, escape(title)));
    }
    for (class, label) in [
        ("product-card__price--original", &product.original),
        ("product-card__price", &product.price),
        ("product-card__price--promotional", &product.sale),
    ] {
        if let Some(label) = label {
            html.push_str(&format!(r#"<span class="{class}">{}</span>"#, escape(label)));
        }
    }
    html.push_str("</div>");
    html
}
