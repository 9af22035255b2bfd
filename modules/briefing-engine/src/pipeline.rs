//! One briefing run: search, compose, generate, deliver.
//!
//! Data flows strictly forward. Each stage owns its own recovery, so a run
//! only returns `Err` when the deployment config itself cannot be rendered.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use tracing::{error, info, info_span, warn, Instrument};
use typed_builder::TypedBuilder;
use uuid::Uuid;

use briefing_common::{
    resolve_runtime_vars, Briefing, BriefingError, CategoryBlock, DeliveryResult, FileConfig,
    ModelPath,
};

use crate::aggregator::{plan_categories, SearchAggregator};
use crate::composer::PromptComposer;
use crate::delivery::{parse_recipients, DeliveryAgent, DeliverySettings, DeliveryState};
use crate::generator::GenerationClient;
use crate::traits::{MailTransport, TextGenerator, WebSearcher};

/// Everything a run needs, built once at the process boundary.
#[derive(Clone, TypedBuilder)]
pub struct BriefingDeps {
    pub searcher: Arc<dyn WebSearcher>,
    pub generator: Arc<dyn TextGenerator>,
    /// `None` when mail credentials are missing.
    #[builder(default)]
    pub transport: Option<Arc<dyn MailTransport>>,
    pub file_config: Arc<FileConfig>,
    pub companies: Vec<String>,
    pub industries: Vec<String>,
    pub primary_model: String,
    #[builder(default)]
    pub fallback_model: Option<String>,
    #[builder(default)]
    pub throttle: Duration,
    #[builder(default)]
    pub sender: Option<String>,
    /// Raw recipient list as configured.
    #[builder(default)]
    pub receivers: Option<String>,
}

/// What happened in one run. Consumed for logging and by tests.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: Uuid,
    pub date: String,
    pub blocks: Vec<CategoryBlock>,
    /// Blocks that came back empty or failed.
    pub degraded: usize,
    pub briefing: Option<Briefing>,
    pub generation_path: Option<ModelPath>,
    pub generation_error: Option<String>,
    /// `None` when the run stopped before delivery.
    pub delivery: Option<DeliveryResult>,
}

pub struct BriefingRun {
    deps: BriefingDeps,
}

impl BriefingRun {
    pub fn new(deps: BriefingDeps) -> Self {
        Self { deps }
    }

    /// Execute a full run for `today`. Invokes delivery at most once.
    pub async fn run(&self, today: NaiveDate) -> Result<RunReport, BriefingError> {
        let run_id = Uuid::new_v4();
        let date = self.format_date(today);
        let span = info_span!("briefing_run", run_id = %run_id, date = %date);

        self.run_inner(run_id, today, date).instrument(span).await
    }

    /// Run the search battery and return the composed instruction without
    /// calling the generator or sending mail.
    pub async fn dry_run(&self, today: NaiveDate) -> Result<String, BriefingError> {
        let date = self.format_date(today);
        let span = info_span!("briefing_dry_run", date = %date);

        async {
            let blocks = self.collect(today, &date).await;
            self.compose(&date, &blocks)
        }
        .instrument(span)
        .await
    }

    async fn run_inner(
        &self,
        run_id: Uuid,
        today: NaiveDate,
        date: String,
    ) -> Result<RunReport, BriefingError> {
        let config = &self.deps.file_config;
        info!("Starting briefing run");

        let blocks = self.collect(today, &date).await;
        let degraded = blocks.iter().filter(|b| b.is_degraded()).count();
        let prompt = self.compose(&date, &blocks)?;
        info!(chars = prompt.chars().count(), "Prompt composed");

        let generation = GenerationClient::new(self.deps.generator.clone(), self.deps.throttle)
            .generate(
                &prompt,
                &self.deps.primary_model,
                self.deps.fallback_model.as_deref(),
            )
            .await;

        let mut report = RunReport {
            run_id,
            date: date.clone(),
            blocks,
            degraded,
            briefing: None,
            generation_path: None,
            generation_error: None,
            delivery: None,
        };

        let body = match generation {
            Ok(outcome) => {
                info!(model = %outcome.model, path = ?outcome.path, "Briefing generated");
                report.generation_path = Some(outcome.path);
                outcome.text
            }
            Err(failure) => {
                error!(error = %failure, "Briefing generation failed");
                let reason = failure.to_string();
                report.generation_error = Some(reason.clone());
                if !config.delivery.notify_on_failure {
                    warn!("Failure notices disabled, stopping before delivery");
                    return Ok(report);
                }
                resolve_runtime_vars(
                    &config.delivery.failure_notice,
                    &HashMap::from([("error", reason.as_str())]),
                )
            }
        };
        let briefing = Briefing { date, body };

        let sender = self.deps.sender.clone();
        let recipients = parse_recipients(self.deps.receivers.as_deref(), sender.as_deref());
        let subject = resolve_runtime_vars(
            &config.delivery.subject,
            &HashMap::from([("date", briefing.date.as_str())]),
        );

        let agent = DeliveryAgent::new(
            self.deps.transport.clone(),
            DeliverySettings::from_config(&config.delivery, sender),
        );
        let result = agent.deliver(&recipients, &subject, &briefing.body).await;

        match DeliveryState::from(&result) {
            DeliveryState::Sent(transport) => {
                info!(transport = ?transport, recipients = recipients.len(), "Run complete")
            }
            state => warn!(state = ?state, error = ?result.error, "Run complete without delivery"),
        }

        report.briefing = Some(briefing);
        report.delivery = Some(result);
        Ok(report)
    }

    fn format_date(&self, today: NaiveDate) -> String {
        today
            .format(&self.deps.file_config.identity.date_format)
            .to_string()
    }

    async fn collect(&self, today: NaiveDate, date: &str) -> Vec<CategoryBlock> {
        let config = &self.deps.file_config;
        let plans = plan_categories(config, &self.deps.companies, &self.deps.industries, date);

        let mut aggregator = SearchAggregator::new(self.deps.searcher.clone(), &config.search);
        if config.search.local_recency_check {
            aggregator = aggregator.with_local_recency_check(today);
        }
        aggregator.fetch_all(&plans).await
    }

    fn compose(&self, date: &str, blocks: &[CategoryBlock]) -> Result<String, BriefingError> {
        PromptComposer::new(&self.deps.file_config)
            .compose(date, blocks, &self.deps.companies, &self.deps.industries)
            .map_err(|e| BriefingError::Config(format!("{e:#}")))
    }
}
