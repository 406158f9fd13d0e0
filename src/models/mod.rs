use serde::{Deserialize, Serialize};

/// A merchant listed on the delivery platform
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Company {
    pub name: String,
    /// Absent when the store card shows the "new store" marker instead of a score
    pub rating: Option<f64>,
    pub banners: Vec<String>,
    /// Resolved city label read back from the page, not the typed query
    pub city: String,
    pub is_closed: bool,
    /// Filled in once the crawler has navigated into the store page
    pub company_url: Option<String>,
    pub image_url: Option<String>,
}

/// A product card read from a store page
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    pub name: String,
    pub original_price: f64,
    pub final_price: f64,
    pub category: String,
    pub company_name: String,
    pub company_url: String,
    pub city: String,
    pub is_closed: bool,
    pub image_url: Option<String>,
}

impl Product {
    /// Build a product for `company`. A missing sale price collapses to the
    /// original price and the category is stored lower-cased.
    pub fn new(
        name: impl Into<String>,
        original_price: f64,
        sale_price: Option<f64>,
        category: &str,
        company: &Company,
        image_url: Option<String>,
    ) -> Self {
        Self {
            name: name.into(),
            original_price,
            final_price: sale_price.unwrap_or(original_price),
            category: category.to_lowercase(),
            company_name: company.name.clone(),
            company_url: company.company_url.clone().unwrap_or_default(),
            city: company.city.clone(),
            is_closed: company.is_closed,
            image_url,
        }
    }

    /// Discount relative to the original price, in percent.
    ///
    /// `None` when there is no discount or the original price is zero.
    pub fn discount_percentage(&self) -> Option<f64> {
        if self.original_price > 0.0 && self.original_price != self.final_price {
            Some((self.original_price - self.final_price) / self.original_price * 100.0)
        } else {
            None
        }
    }
}
