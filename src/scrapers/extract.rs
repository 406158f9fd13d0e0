use crate::models::{Company, Product};
use crate::scrapers::error::ExtractError;
use crate::scrapers::price::parse_price;
use crate::scrapers::probe::{exists_in, find_first_in, text_in};
use crate::scrapers::selectors;
use crate::scrapers::traits::PageElement;

/// Read the listing-level fields of a store card.
///
/// `company_url` stays `None`; the crawler fills it in after navigating into
/// the store. `city` is the resolved city of the crawl.
pub fn company<E: PageElement>(card: &E, city: &str) -> Result<Company, ExtractError> {
    let name = text_in(card, &selectors::STORE_NAME)?
        .filter(|n| !n.is_empty())
        .ok_or(ExtractError::MissingField("store name"))?;

    let rating = text_in(card, &selectors::STORE_RATING)?.and_then(|label| parse_rating(&label));

    let banners = card
        .find_all(&selectors::STORE_BANNER)?
        .iter()
        .map(|b| b.text().map(|t| t.trim().to_string()))
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .filter(|b| !b.is_empty())
        .collect();

    let is_closed = exists_in(card, &selectors::STORE_CLOSED)?;

    let image_url = match find_first_in(card, &selectors::STORE_LOGO)? {
        Some(img) => img.attribute("src")?,
        None => None,
    };

    Ok(Company {
        name,
        rating,
        banners,
        city: city.to_string(),
        is_closed,
        company_url: None,
        image_url,
    })
}

/// Numeric score such as "4,7"; the "new store" label yields `None`
fn parse_rating(label: &str) -> Option<f64> {
    label.trim().replace(',', ".").parse::<f64>().ok().filter(|r| r.is_finite())
}

/// Read one product card.
///
/// `Ok(None)` means the card is not a real product (no title or no price)
/// and should be skipped.
pub fn product<E: PageElement>(
    card: &E,
    company: &Company,
    category: &str,
) -> Result<Option<Product>, ExtractError> {
    let Some(name) = text_in(card, &selectors::PRODUCT_TITLE)? else {
        return Ok(None);
    };

    let price_label = match text_in(card, &selectors::PRODUCT_ORIGINAL_PRICE)? {
        Some(label) => label,
        None => match text_in(card, &selectors::PRODUCT_PRICE)? {
            Some(label) => label,
            None => return Ok(None),
        },
    };
    let original_price = parse_price(&price_label)?;

    let sale_price = text_in(card, &selectors::PRODUCT_SALE_PRICE)?
        .map(|label| parse_price(&label))
        .transpose()?;

    let image_url = match find_first_in(card, &selectors::PRODUCT_IMAGE)? {
        Some(img) => img.attribute("src")?,
        None => None,
    };

    Ok(Some(Product::new(
        name,
        original_price,
        sale_price,
        category,
        company,
        image_url,
    )))
}
