use anyhow::Context;
use chrono::Local;
use clap::Parser;
use delivery_scout::dataset::{CompanyRow, Dataset, ProductFilter, ProductRow};
use delivery_scout::scrapers::{
    ChromeSessionFactory, CityOutcome, CrawlCoordinator, CrawlOptions, CrawlerSettings,
};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Scrape stores and products of one or more cities from the delivery site
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// City names as typed into the site's search box
    #[arg(required = true)]
    cities: Vec<String>,

    /// Keep crawling closed stores instead of stopping at the first one
    #[arg(long, env = "SCOUT_INCLUDE_CLOSED")]
    include_closed: bool,

    /// Show the browser window
    #[arg(long)]
    show_browser: bool,

    /// Cities crawled in parallel
    #[arg(long, env = "SCOUT_WORKERS", default_value_t = 4)]
    workers: usize,

    /// Where the JSON results are written
    #[arg(long, env = "SCOUT_OUTPUT_DIR", default_value = "scraped")]
    output_dir: PathBuf,

    /// Save the HTML of stores that failed to parse here
    #[arg(long, env = "SCOUT_DEBUG_DIR")]
    debug_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    info!("🛵 Delivery Scout");
    info!("Cities: {}", cli.cities.join(", "));

    let settings = CrawlerSettings {
        headless: !cli.show_browser,
        workers: cli.workers,
        debug_dir: cli.debug_dir.clone(),
        ..CrawlerSettings::default()
    };
    let options = CrawlOptions {
        include_closed_stores: cli.include_closed,
    };

    let coordinator = CrawlCoordinator::new(ChromeSessionFactory, settings);

    let mut dataset = Dataset::new();
    let mut companies = Vec::new();
    let reports = coordinator
        .retrieve_data(
            cli.cities.clone(),
            options,
            |batch| dataset.append_products(batch),
            |company| {
                info!("🏪 [{}] {}", company.city, company.name);
                companies.push(company);
            },
        )
        .await;
    for company in companies {
        dataset.append_company(company);
    }

    for report in &reports {
        match &report.outcome {
            CityOutcome::Completed { products } => {
                info!("✅ {}: {} products", report.city, products)
            }
            CityOutcome::NotFound => warn!("❓ {}: city not found", report.city),
            CityOutcome::Failed { reason } => warn!("❌ {}: {}", report.city, reason),
        }
    }

    let stats = dataset.stats();
    info!(
        "Scraped {} products from {} companies in {} cities",
        stats.rows, stats.companies_visited, stats.cities_visited
    );

    if !dataset.has_data() {
        warn!("Nothing to save");
        return Ok(());
    }

    tokio::fs::create_dir_all(&cli.output_dir)
        .await
        .with_context(|| format!("Failed to create {}", cli.output_dir.display()))?;
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");

    let products: Vec<ProductRow> = dataset.product_rows(&ProductFilter::default()).collect();
    if products.is_empty() {
        warn!("No products to save");
    } else {
        let products_path = cli.output_dir.join(format!("products_{timestamp}.json"));
        tokio::fs::write(&products_path, serde_json::to_string_pretty(&products)?).await?;
        info!("💾 Saved {} products to {}", products.len(), products_path.display());
    }

    let company_rows: Vec<CompanyRow> = dataset.company_rows().collect();
    if company_rows.is_empty() {
        warn!("No companies to save");
    } else {
        let companies_path = cli.output_dir.join(format!("companies_{timestamp}.json"));
        tokio::fs::write(&companies_path, serde_json::to_string_pretty(&company_rows)?).await?;
        info!("💾 Saved {} companies to {}", company_rows.len(), companies_path.display());
    }

    Ok(())
}
