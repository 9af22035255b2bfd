use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

use crate::template::validate_template;

/// TOML-backed deployment configuration: the search battery, the report's
/// Constraint Spec and all prompt phrasing. Secrets stay as env vars.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub identity: IdentityConfig,
    pub search: SearchConfig,
    pub categories: Vec<CategoryConfig>,
    pub sections: Vec<SectionConfig>,
    pub policy: RuleBlock,
    pub layout: RuleBlock,
    pub skeleton: SkeletonConfig,
    pub phrases: PhrasesConfig,
    pub delivery: DeliveryConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IdentityConfig {
    pub report_title: String,
    pub byline: String,
    #[serde(default = "default_date_format")]
    pub date_format: String,
    /// Role preamble. Runtime vars: `today`.
    pub persona: String,
    /// Jurisdiction preamble. Runtime vars: `region_terms`, `sub_regions`, `sub_region_count`.
    pub jurisdiction: String,
    pub region_terms: Vec<String>,
    pub sub_regions: Vec<String>,
    #[serde(default)]
    pub default_companies: Vec<String>,
    #[serde(default)]
    pub default_industries: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SearchConfig {
    #[serde(default = "default_window_days")]
    pub window_days: u32,
    #[serde(default = "default_max_results")]
    pub max_results: u32,
    pub no_results_text: String,
    /// Runtime vars: `error`.
    pub failure_text: String,
    pub content_label: String,
    pub source_label: String,
    pub missing_source: String,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Drop records whose reported publish date falls outside the window.
    #[serde(default)]
    pub local_recency_check: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CategoryConfig {
    pub id: String,
    pub label: String,
    /// Id of the report section this category feeds.
    pub section: String,
    /// Runtime vars: `companies`, `industry`, `today`.
    pub query: String,
    pub max_results: Option<u32>,
    pub window_days: Option<u32>,
    #[serde(default)]
    pub include_domains: Vec<String>,
    /// Expand into one category per tracked industry.
    #[serde(default)]
    pub per_industry: bool,
    /// Append the report date to the query text.
    #[serde(default)]
    pub date_anchor: bool,
    /// Heading above the block in the material pool. Runtime vars: `label`.
    pub heading: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SectionConfig {
    pub id: String,
    pub title: String,
    pub material_label: String,
    pub items: Option<u32>,
    pub items_min: Option<u32>,
    pub items_max: Option<u32>,
    pub items_per_industry: Option<u32>,
    #[serde(default)]
    pub splits: Vec<SplitConfig>,
    /// Runtime vars: `companies`, `industries`.
    #[serde(default)]
    pub guidance: Vec<String>,
    #[serde(default)]
    pub banned: Vec<String>,
    /// Canned statement for empty, stale or single-source material.
    pub fallback: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SplitConfig {
    pub label: String,
    pub items: u32,
    #[serde(default)]
    pub guidance: String,
}

/// Required size of a report section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemCount {
    Exact(u32),
    Range { min: u32, max: u32 },
    PerIndustry(u32),
}

impl SectionConfig {
    pub fn item_count(&self) -> Result<ItemCount> {
        match (self.items, self.items_min, self.items_max, self.items_per_industry) {
            (Some(n), None, None, None) => Ok(ItemCount::Exact(n)),
            (None, Some(min), Some(max), None) if min <= max => Ok(ItemCount::Range { min, max }),
            (None, Some(min), Some(max), None) => {
                bail!("Section {}: items_min {min} exceeds items_max {max}", self.id)
            }
            (None, None, None, Some(n)) => Ok(ItemCount::PerIndustry(n)),
            _ => bail!(
                "Section {}: set exactly one of `items`, `items_min`+`items_max`, `items_per_industry`",
                self.id
            ),
        }
    }
}

/// A heading followed by numbered rules.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleBlock {
    pub heading: String,
    pub rules: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SkeletonConfig {
    pub heading: String,
    /// Runtime vars: `report_title`.
    pub title_line: String,
    /// Runtime vars: `today`, `byline`.
    pub date_line: String,
    pub divider: String,
    pub toc_title: String,
    pub toc_placeholder: String,
    /// Runtime vars: `title`.
    pub section_line: String,
    pub body_placeholder: String,
    #[serde(default)]
    pub footer: Vec<String>,
}

/// Phrasing templates the composer fills in. Keeping them here lets a
/// deployment retune wording without touching pipeline code.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PhrasesConfig {
    pub architecture_heading: String,
    pub material_heading: String,
    /// Runtime vars: `items`.
    pub count_exact: String,
    /// Runtime vars: `min`, `max`.
    pub count_range: String,
    /// Runtime vars: `items`.
    pub count_per_industry: String,
    /// Runtime vars: `title`, `count`.
    pub section_line: String,
    /// Runtime vars: `index`, `label`, `items`, `guidance`.
    pub split_line: String,
    /// Runtime vars: `industries`.
    pub industries_line: String,
    /// Runtime vars: `banned`.
    pub banned_line: String,
    /// Runtime vars: `fallback`.
    pub fallback_line: String,
    /// Runtime vars: `material_label`, `material`.
    pub material_line: String,
    pub list_separator: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeliveryConfig {
    pub display_name: String,
    /// Runtime vars: `date`.
    pub subject: String,
    #[serde(default = "default_implicit_tls_port")]
    pub implicit_tls_port: u16,
    #[serde(default = "default_starttls_port")]
    pub starttls_port: u16,
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,
    #[serde(default = "default_smtp_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_true")]
    pub notify_on_failure: bool,
    /// Runtime vars: `error`.
    pub failure_notice: String,
    pub stylesheet: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScheduleConfig {
    #[serde(default)]
    pub holidays: Vec<NaiveDate>,
    /// Weekend days that are working days (make-up days around public holidays).
    #[serde(default)]
    pub workdays: Vec<NaiveDate>,
}

fn default_date_format() -> String {
    "%Y年%m月%d日".to_string()
}
fn default_window_days() -> u32 {
    7
}
fn default_max_results() -> u32 {
    15
}
fn default_concurrency() -> usize {
    1
}
fn default_implicit_tls_port() -> u16 {
    465
}
fn default_starttls_port() -> u16 {
    587
}
fn default_retry_delay_secs() -> u64 {
    3
}
fn default_smtp_timeout_secs() -> u64 {
    30
}
fn default_true() -> bool {
    true
}

impl FileConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: FileConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn section(&self, id: &str) -> Option<&SectionConfig> {
        self.sections.iter().find(|s| s.id == id)
    }

    /// Structural checks that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.search.concurrency == 0 {
            bail!("search.concurrency must be at least 1");
        }

        let mut section_ids = HashSet::new();
        for section in &self.sections {
            if !section_ids.insert(section.id.as_str()) {
                bail!("Duplicate section id: {}", section.id);
            }
            if section.fallback.trim().is_empty() {
                bail!("Section {} has an empty fallback statement", section.id);
            }
            let count = section.item_count()?;
            if !section.splits.is_empty() {
                let total: u32 = section.splits.iter().map(|s| s.items).sum();
                let expected = match count {
                    ItemCount::Exact(n) | ItemCount::PerIndustry(n) => n,
                    ItemCount::Range { .. } => {
                        bail!("Section {}: splits need an exact item count", section.id)
                    }
                };
                if total != expected {
                    bail!(
                        "Section {}: splits add up to {total}, expected {expected}",
                        section.id
                    );
                }
            }
        }

        let mut category_ids = HashSet::new();
        for category in &self.categories {
            if !category_ids.insert(category.id.as_str()) {
                bail!("Duplicate category id: {}", category.id);
            }
            if !section_ids.contains(category.section.as_str()) {
                bail!(
                    "Category {} feeds unknown section {}",
                    category.id,
                    category.section
                );
            }
            validate_template(&category.query, &["companies", "industry", "today"])
                .with_context(|| format!("categories.{}.query", category.id))?;
            if let Some(ref heading) = category.heading {
                validate_template(heading, &["label"])
                    .with_context(|| format!("categories.{}.heading", category.id))?;
            }
        }

        self.validate_templates()
    }

    fn validate_templates(&self) -> Result<()> {
        let checks: [(&str, &str, &[&str]); 19] = [
            ("identity.persona", self.identity.persona.as_str(), &["today"]),
            (
                "identity.jurisdiction",
                self.identity.jurisdiction.as_str(),
                &["region_terms", "sub_regions", "sub_region_count"],
            ),
            ("search.failure_text", self.search.failure_text.as_str(), &["error"]),
            ("skeleton.title_line", self.skeleton.title_line.as_str(), &["report_title"]),
            ("skeleton.date_line", self.skeleton.date_line.as_str(), &["today", "byline"]),
            ("skeleton.section_line", self.skeleton.section_line.as_str(), &["title"]),
            ("phrases.count_exact", self.phrases.count_exact.as_str(), &["items"]),
            ("phrases.count_range", self.phrases.count_range.as_str(), &["min", "max"]),
            ("phrases.count_per_industry", self.phrases.count_per_industry.as_str(), &["items"]),
            ("phrases.section_line", self.phrases.section_line.as_str(), &["title", "count"]),
            (
                "phrases.split_line",
                self.phrases.split_line.as_str(),
                &["index", "label", "items", "guidance"],
            ),
            ("phrases.industries_line", self.phrases.industries_line.as_str(), &["industries"]),
            ("phrases.banned_line", self.phrases.banned_line.as_str(), &["banned"]),
            ("phrases.fallback_line", self.phrases.fallback_line.as_str(), &["fallback"]),
            (
                "phrases.material_line",
                self.phrases.material_line.as_str(),
                &["material_label", "material"],
            ),
            ("phrases.architecture_heading", self.phrases.architecture_heading.as_str(), &[]),
            ("phrases.material_heading", self.phrases.material_heading.as_str(), &[]),
            ("delivery.subject", self.delivery.subject.as_str(), &["date"]),
            ("delivery.failure_notice", self.delivery.failure_notice.as_str(), &["error"]),
        ];
        for (name, template, allowed) in checks {
            validate_template(template, allowed).with_context(|| name.to_string())?;
        }
        for rule in &self.policy.rules {
            validate_template(rule, &["window_days"]).context("policy.rules")?;
        }
        for section in &self.sections {
            let texts = section
                .guidance
                .iter()
                .chain(section.splits.iter().map(|s| &s.guidance))
                .chain(std::iter::once(&section.fallback));
            for text in texts {
                validate_template(text, &["companies", "industries"])
                    .with_context(|| format!("sections.{}", section.id))?;
            }
        }
        Ok(())
    }
}

/// Load, parse and validate the deployment config file.
pub fn load_config(path: &Path) -> Result<FileConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    FileConfig::from_toml_str(&content)
        .with_context(|| format!("Invalid config file: {}", path.display()))
}
