use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use futures::stream::{self, StreamExt};
use tracing::{info, warn};

use briefing_common::file_config::{FileConfig, SearchConfig};
use briefing_common::{resolve_runtime_vars, CategoryBlock, SearchRecord};

use crate::traits::{SearchQuery, WebSearcher};

const DEFAULT_HEADING: &str = "【{{label}}】";

/// One concrete search for one run, after template and per-industry expansion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryPlan {
    pub id: String,
    pub label: String,
    pub section: String,
    pub heading: String,
    pub query: SearchQuery,
}

/// Expand the configured category battery into concrete queries.
///
/// Per-industry categories become one plan per industry, in industry order,
/// at the position of the template category.
pub fn plan_categories(
    config: &FileConfig,
    companies: &[String],
    industries: &[String],
    today: &str,
) -> Vec<CategoryPlan> {
    let companies = companies.join(" ");
    let mut plans = Vec::new();

    for category in &config.categories {
        let heading_template = category.heading.as_deref().unwrap_or(DEFAULT_HEADING);
        let window_days = category.window_days.unwrap_or(config.search.window_days);
        let max_results = category.max_results.unwrap_or(config.search.max_results);

        let mut build = |id: String, label: &str, industry: &str| {
            let vars = HashMap::from([
                ("companies", companies.as_str()),
                ("industry", industry),
                ("today", today),
            ]);
            let mut text = resolve_runtime_vars(&category.query, &vars);
            if category.date_anchor {
                text = format!("{text} {today}");
            }
            plans.push(CategoryPlan {
                id,
                label: label.to_string(),
                section: category.section.clone(),
                heading: resolve_runtime_vars(heading_template, &HashMap::from([("label", label)])),
                query: SearchQuery {
                    text,
                    window_days,
                    max_results,
                    include_domains: category.include_domains.clone(),
                },
            });
        };

        if category.per_industry {
            for industry in industries {
                build(format!("{}:{}", category.id, industry), industry, industry);
            }
        } else {
            build(category.id.clone(), &category.label, "");
        }
    }

    plans
}

/// Runs the category battery against the search provider and normalizes hits.
///
/// A failing category degrades to a `Failed` block; it never aborts the run.
pub struct SearchAggregator {
    searcher: Arc<dyn WebSearcher>,
    missing_source: String,
    concurrency: usize,
    /// Report date for the local recency check; `None` disables it.
    recency_today: Option<NaiveDate>,
}

impl SearchAggregator {
    pub fn new(searcher: Arc<dyn WebSearcher>, config: &SearchConfig) -> Self {
        Self {
            searcher,
            missing_source: config.missing_source.clone(),
            concurrency: config.concurrency.max(1),
            recency_today: None,
        }
    }

    /// Drop records the provider dated before `today - window_days` of their
    /// category. Undated records are kept.
    pub fn with_local_recency_check(mut self, today: NaiveDate) -> Self {
        self.recency_today = Some(today);
        self
    }

    pub async fn fetch(&self, plan: &CategoryPlan) -> CategoryBlock {
        let cutoff = self
            .recency_today
            .map(|today| today - Duration::days(i64::from(plan.query.window_days)));

        match self.searcher.search(&plan.query).await {
            Ok(hits) => {
                let total = hits.len();
                let records: Vec<SearchRecord> = hits
                    .into_iter()
                    .map(|hit| {
                        SearchRecord::normalize(
                            hit.content.as_deref(),
                            hit.url.as_deref(),
                            hit.published_date.as_deref(),
                            &self.missing_source,
                        )
                    })
                    .filter(|record| match (cutoff, record.published) {
                        (Some(cutoff), Some(published)) => published >= cutoff,
                        _ => true,
                    })
                    .collect();

                if records.len() < total {
                    info!(
                        category = %plan.id,
                        dropped = total - records.len(),
                        "Dropped stale search records"
                    );
                }
                info!(category = %plan.id, records = records.len(), "Category fetched");

                CategoryBlock::from_records(
                    &plan.id,
                    &plan.label,
                    &plan.section,
                    &plan.heading,
                    records,
                )
            }
            Err(e) => {
                warn!(category = %plan.id, error = %e, "Search failed, degrading category");
                CategoryBlock::failed(
                    &plan.id,
                    &plan.label,
                    &plan.section,
                    &plan.heading,
                    e.to_string(),
                )
            }
        }
    }

    /// Fetch every plan. Output order always matches `plans`, whatever the concurrency.
    pub async fn fetch_all(&self, plans: &[CategoryPlan]) -> Vec<CategoryBlock> {
        info!(
            categories = plans.len(),
            concurrency = self.concurrency,
            "Collecting search material"
        );

        let blocks: Vec<CategoryBlock> = stream::iter(plans)
            .map(|plan| self.fetch(plan))
            .buffered(self.concurrency)
            .collect()
            .await;

        let degraded = blocks.iter().filter(|b| b.is_degraded()).count();
        if degraded > 0 {
            warn!(degraded, total = blocks.len(), "Some categories returned no material");
        }

        blocks
    }
}
