use crate::scrapers::traits::Locator;

// Home page
pub const CITY_INPUT: Locator = Locator::Css("#city");
pub const CITY_SUGGESTION: Locator = Locator::Css("li.cursor-pointer > button");

// Store list
pub const RESOLVED_CITY: Locator = Locator::Css("header .address__city");
pub const STORE_ITEM: Locator = Locator::Css(".company-list__item");
pub const LOAD_MORE_STORES: Locator = Locator::ButtonText("Carregar mais lojas");

// Store card, scoped to a store item
pub const STORE_NAME: Locator = Locator::Css(".company__name");
pub const STORE_RATING: Locator = Locator::Css(".company__rating");
pub const STORE_BANNER: Locator = Locator::Css(".company__banner");
pub const STORE_CLOSED: Locator = Locator::Css("figcaption");
pub const STORE_LOGO: Locator = Locator::Css("img");

// Store page
pub const STORE_HEADING: Locator = Locator::Css("h1.company__name");
pub const CATEGORY_GROUP: Locator = Locator::Css(".product-categories__group");
pub const CATEGORY_TITLE: Locator = Locator::Css(".category__title");
pub const PRODUCT_CARD: Locator = Locator::Css(".product-card");

// Product card, scoped to a card
pub const PRODUCT_TITLE: Locator = Locator::Css(".product-card__title");
pub const PRODUCT_ORIGINAL_PRICE: Locator = Locator::Css(".product-card__price--original");
pub const PRODUCT_PRICE: Locator = Locator::Css(".product-card__price");
pub const PRODUCT_SALE_PRICE: Locator = Locator::Css(".product-card__price--promotional");
pub const PRODUCT_IMAGE: Locator = Locator::Css("img");
