use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::{self, JoinSet};
use tracing::{info, warn};

use crate::models::{Company, Product};
use crate::scrapers::crawler::CityCrawler;
use crate::scrapers::error::CrawlError;
use crate::scrapers::traits::SessionFactory;
use crate::scrapers::types::{CrawlEvent, CrawlOptions, CrawlerSettings};

/// How one city's crawl ended
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CityOutcome {
    Completed { products: usize },
    NotFound,
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CityReport {
    pub city: String,
    pub outcome: CityOutcome,
}

/// Runs city crawls in parallel. Workers only send `CrawlEvent`s; the sinks
/// are called from a single consumer loop on the caller's task.
pub struct CrawlCoordinator<F> {
    factory: Arc<F>,
    settings: Arc<CrawlerSettings>,
}

impl<F: SessionFactory + 'static> CrawlCoordinator<F> {
    pub fn new(factory: F, settings: CrawlerSettings) -> Self {
        Self {
            factory: Arc::new(factory),
            settings: Arc::new(settings),
        }
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// Crawl every city, at most `settings.workers` at a time.
    ///
    /// `on_products` receives each non-empty store batch and `on_company` each
    /// visited store. Neither is ever called concurrently with itself or the
    /// other. A city that cannot be found or fails only affects its own
    /// report. Returns once every crawl has finished, reports in input order.
    pub async fn retrieve_data<P, C>(
        &self,
        cities: Vec<String>,
        options: CrawlOptions,
        mut on_products: P,
        mut on_company: C,
    ) -> Vec<CityReport>
    where
        P: FnMut(Vec<Product>),
        C: FnMut(Company),
    {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let permits = Arc::new(Semaphore::new(self.settings.workers.max(1)));
        let mut crawls = JoinSet::new();

        info!(
            "Crawling {} cities with {} workers",
            cities.len(),
            self.settings.workers.max(1)
        );

        for (position, city) in cities.into_iter().enumerate() {
            let tx = tx.clone();
            let factory = Arc::clone(&self.factory);
            let settings = Arc::clone(&self.settings);
            let permits = Arc::clone(&permits);

            crawls.spawn(async move {
                let outcome = match permits.acquire_owned().await {
                    Ok(permit) => {
                        let query = city.clone();
                        let joined = task::spawn_blocking(move || {
                            let _permit = permit;
                            let crawler = CityCrawler::new(factory.as_ref(), &settings);
                            crawler.crawl(&query, &options, &mut |event| {
                                // The receiver lives until every crawl is done
                                let _ = tx.send(event);
                            })
                        })
                        .await;
                        Self::outcome(&city, joined)
                    }
                    Err(e) => CityOutcome::Failed {
                        reason: e.to_string(),
                    },
                };
                (position, CityReport { city, outcome })
            });
        }
        drop(tx);

        while let Some(event) = rx.recv().await {
            match event {
                CrawlEvent::Company(company) => on_company(company),
                CrawlEvent::Products(batch) if !batch.is_empty() => on_products(batch),
                CrawlEvent::Products(_) => {}
            }
        }

        let mut reports = Vec::new();
        while let Some(joined) = crawls.join_next().await {
            match joined {
                Ok(report) => reports.push(report),
                Err(e) => warn!("City task ended abnormally: {}", e),
            }
        }
        reports.sort_by_key(|(position, _)| *position);
        reports.into_iter().map(|(_, report)| report).collect()
    }

    fn outcome(
        city: &str,
        joined: Result<Result<Vec<Product>, CrawlError>, task::JoinError>,
    ) -> CityOutcome {
        match joined {
            Ok(Ok(products)) => CityOutcome::Completed {
                products: products.len(),
            },
            Ok(Err(CrawlError::CityNotFound { attempts, .. })) => {
                info!("[{}] City not found after {} attempts", city, attempts);
                CityOutcome::NotFound
            }
            Ok(Err(e)) => {
                warn!("[{}] Crawl failed: {}", city, e);
                CityOutcome::Failed {
                    reason: e.to_string(),
                }
            }
            Err(e) => {
                warn!("[{}] Crawl panicked: {}", city, e);
                CityOutcome::Failed {
                    reason: format!("crawl panicked: {e}"),
                }
            }
        }
    }
}
