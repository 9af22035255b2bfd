use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use briefing_common::{load_config, AppConfig};
use briefing_engine::adapters::{build_generator, build_mailer};
use briefing_engine::{
    is_first_workday_of_week, BriefingDeps, BriefingRun, MailTransport, WorkCalendar,
};
use tavily_client::TavilyClient;

/// Weekly business-intelligence briefing: search, generate, mail.
#[derive(Parser, Debug)]
#[command(name = "briefing", version)]
struct Args {
    /// Deployment config (categories, report sections, phrasing).
    #[arg(long, env = "BRIEFING_CONFIG", default_value = "config/briefing.toml")]
    config: PathBuf,

    /// Report date (YYYY-MM-DD). Defaults to today, local time.
    #[arg(long)]
    date: Option<NaiveDate>,

    /// Run even if today is not the first workday of the week.
    #[arg(long)]
    force: bool,

    /// Print the composed prompt; no generation, no email.
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing()?;

    let args = Args::parse();
    let file_config = load_config(&args.config)?;
    let app = AppConfig::from_env()?;

    let today = args.date.unwrap_or_else(|| Local::now().date_naive());
    let calendar = WorkCalendar::from_config(&file_config.schedule);
    if !args.force && !args.dry_run && !is_first_workday_of_week(today, &calendar) {
        info!(date = %today, "Not the first workday of the week, skipping");
        return Ok(());
    }

    let searcher = TavilyClient::new(app.search_api_key.clone())
        .context("Failed to build search client")?;
    let mail_timeout = Duration::from_secs(file_config.delivery.timeout_secs);
    let transport = build_mailer(&app, mail_timeout).map(|m| Arc::new(m) as Arc<dyn MailTransport>);

    let deps = BriefingDeps::builder()
        .searcher(Arc::new(searcher))
        .generator(build_generator(&app.generation))
        .transport(transport)
        .companies(app.companies(&file_config.identity))
        .industries(app.industries(&file_config.identity))
        .primary_model(app.generation.model.clone())
        .fallback_model(app.generation.fallback_model.clone())
        .throttle(app.generation.request_delay)
        .sender(app.email_sender.clone())
        .receivers(app.email_receivers.clone())
        .file_config(Arc::new(file_config))
        .build();
    let run = BriefingRun::new(deps);

    if args.dry_run {
        let prompt = run.dry_run(today).await?;
        println!("{prompt}");
        return Ok(());
    }

    let report = run.run(today).await?;
    info!(
        run_id = %report.run_id,
        degraded = report.degraded,
        generation = ?report.generation_path,
        delivered = report.delivery.as_ref().is_some_and(|d| d.succeeded),
        "Briefing run finished"
    );

    Ok(())
}

fn init_tracing() -> Result<()> {
    let filter = EnvFilter::from_default_env().add_directive("briefing=info".parse()?);
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
    Ok(())
}
