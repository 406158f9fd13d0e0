use serde::Serialize;
use std::collections::HashSet;

use crate::models::{Company, Product};

/// Filter value that disables a column filter
pub const ALL_KEYWORD: &str = "Todos";

/// Everything fetched so far, owned by the single consumer of crawl events
#[derive(Debug, Default)]
pub struct Dataset {
    products: Vec<Product>,
    companies: Vec<Company>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetStats {
    pub rows: usize,
    pub cities_visited: usize,
    pub companies_visited: usize,
}

/// Product row in export column order. Derived columns are computed here.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductRow {
    pub name: String,
    pub original_price: f64,
    pub final_price: f64,
    pub discount_percentage: Option<f64>,
    pub company_name: String,
    pub city: String,
    pub category: String,
    pub company_url: String,
    pub image_url: Option<String>,
    pub is_open: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompanyRow {
    pub name: String,
    pub rating: String,
    pub city: String,
    pub banners: Vec<String>,
    pub company_url: Option<String>,
    pub image_url: Option<String>,
    pub is_open: &'static str,
}

fn open_label(is_closed: bool) -> &'static str {
    if is_closed {
        "Não"
    } else {
        "Sim"
    }
}

const MAX_STARS: f64 = 5.0;

/// "★★★★ 4.2" style label; empty for stores without a rating
fn rating_label(rating: Option<f64>) -> String {
    match rating {
        Some(value) if value >= 0.0 => {
            let stars = value.round().min(MAX_STARS) as usize;
            format!("{} {}", "★".repeat(stars), value)
        }
        _ => String::new(),
    }
}

impl From<&Product> for ProductRow {
    fn from(product: &Product) -> Self {
        Self {
            name: product.name.clone(),
            original_price: product.original_price,
            final_price: product.final_price,
            discount_percentage: product.discount_percentage(),
            company_name: product.company_name.clone(),
            city: product.city.clone(),
            category: product.category.clone(),
            company_url: product.company_url.clone(),
            image_url: product.image_url.clone(),
            is_open: open_label(product.is_closed),
        }
    }
}

impl From<&Company> for CompanyRow {
    fn from(company: &Company) -> Self {
        Self {
            name: company.name.clone(),
            rating: rating_label(company.rating),
            city: company.city.clone(),
            banners: company.banners.clone(),
            company_url: company.company_url.clone(),
            image_url: company.image_url.clone(),
            is_open: open_label(company.is_closed),
        }
    }
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append_products(&mut self, batch: Vec<Product>) {
        self.products.extend(batch);
    }

    pub fn append_company(&mut self, company: Company) {
        self.companies.push(company);
    }

    pub fn has_data(&self) -> bool {
        !self.products.is_empty() || !self.companies.is_empty()
    }

    pub fn stats(&self) -> DatasetStats {
        let cities: HashSet<&str> = self.products.iter().map(|p| p.city.as_str()).collect();
        let companies: HashSet<&str> = self
            .products
            .iter()
            .map(|p| p.company_name.as_str())
            .collect();

        DatasetStats {
            rows: self.products.len(),
            cities_visited: cities.len(),
            companies_visited: companies.len(),
        }
    }

    pub fn product_rows<'a>(&'a self, filter: &'a ProductFilter) -> impl Iterator<Item = ProductRow> + 'a {
        self.products
            .iter()
            .filter(move |p| filter.matches(p))
            .map(ProductRow::from)
    }

    pub fn company_rows(&self) -> impl Iterator<Item = CompanyRow> + '_ {
        self.companies.iter().map(CompanyRow::from)
    }
}

/// Column filters over products. `None` or `ALL_KEYWORD` leaves a column unfiltered.
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub city: Option<String>,
    pub category: Option<String>,
    pub company_name: Option<String>,
    /// Inclusive bounds on the final price
    pub price_range: Option<(f64, f64)>,
}

fn column_matches(wanted: &Option<String>, value: &str) -> bool {
    match wanted.as_deref() {
        None | Some("") | Some(ALL_KEYWORD) => true,
        Some(wanted) => wanted == value,
    }
}

impl ProductFilter {
    pub fn matches(&self, product: &Product) -> bool {
        column_matches(&self.city, &product.city)
            && column_matches(&self.category, &product.category)
            && column_matches(&self.company_name, &product.company_name)
            && self
                .price_range
                .map_or(true, |(low, high)| (low..=high).contains(&product.final_price))
    }
}
