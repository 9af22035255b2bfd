use std::collections::HashMap;

use anyhow::Result;

use briefing_common::file_config::{FileConfig, RuleBlock, SectionConfig};
use briefing_common::{resolve_runtime_vars, BlockStatus, CategoryBlock, ItemCount};

/// Assembles the generation instruction from the deployment's Constraint Spec
/// and one run's category material.
///
/// No I/O. Identical inputs always produce byte-identical output.
pub struct PromptComposer<'a> {
    config: &'a FileConfig,
}

impl<'a> PromptComposer<'a> {
    pub fn new(config: &'a FileConfig) -> Self {
        Self { config }
    }

    /// Build the full instruction text.
    ///
    /// `date` is the already formatted report date. `blocks` must be the
    /// complete, ordered block set for the run; degraded blocks render as
    /// sentinel text.
    pub fn compose(
        &self,
        date: &str,
        blocks: &[CategoryBlock],
        companies: &[String],
        industries: &[String],
    ) -> Result<String> {
        let sep = self.config.phrases.list_separator.as_str();
        let companies = companies.join(sep);
        let industries = industries.join(sep);

        let mut out = String::new();
        self.write_preamble(&mut out, date);
        out.push('\n');

        let window_days = self.config.search.window_days.to_string();
        let policy_vars = HashMap::from([("window_days", window_days.as_str())]);
        write_rule_block(&mut out, &self.config.policy, &policy_vars);
        out.push('\n');
        write_rule_block(&mut out, &self.config.layout, &HashMap::new());
        out.push('\n');

        out.push_str(&self.config.phrases.architecture_heading);
        out.push('\n');
        for section in &self.config.sections {
            self.write_architecture(&mut out, section, &companies, &industries)?;
        }
        out.push('\n');

        out.push_str(&self.config.phrases.material_heading);
        out.push('\n');
        for section in &self.config.sections {
            let material = self.render_material(section, blocks);
            let line = resolve_runtime_vars(
                &self.config.phrases.material_line,
                &HashMap::from([
                    ("material_label", section.material_label.as_str()),
                    ("material", material.as_str()),
                ]),
            );
            out.push_str(&line);
            out.push('\n');
        }
        out.push('\n');

        self.write_skeleton(&mut out, date);
        Ok(out)
    }

    fn write_preamble(&self, out: &mut String, date: &str) {
        let identity = &self.config.identity;
        let sep = self.config.phrases.list_separator.as_str();

        out.push_str(&resolve_runtime_vars(
            &identity.persona,
            &HashMap::from([("today", date)]),
        ));
        out.push('\n');

        let region_terms = identity.region_terms.join(sep);
        let sub_regions = identity.sub_regions.join(sep);
        let count = identity.sub_regions.len().to_string();
        out.push_str(&resolve_runtime_vars(
            &identity.jurisdiction,
            &HashMap::from([
                ("region_terms", region_terms.as_str()),
                ("sub_regions", sub_regions.as_str()),
                ("sub_region_count", count.as_str()),
            ]),
        ));
        out.push('\n');
    }

    fn write_architecture(
        &self,
        out: &mut String,
        section: &SectionConfig,
        companies: &str,
        industries: &str,
    ) -> Result<()> {
        let phrases = &self.config.phrases;
        let sep = phrases.list_separator.as_str();
        let count = section.item_count()?;

        let count_text = match count {
            ItemCount::Exact(n) => {
                let n = n.to_string();
                resolve_runtime_vars(&phrases.count_exact, &HashMap::from([("items", n.as_str())]))
            }
            ItemCount::Range { min, max } => {
                let (min, max) = (min.to_string(), max.to_string());
                resolve_runtime_vars(
                    &phrases.count_range,
                    &HashMap::from([("min", min.as_str()), ("max", max.as_str())]),
                )
            }
            ItemCount::PerIndustry(n) => {
                let n = n.to_string();
                resolve_runtime_vars(
                    &phrases.count_per_industry,
                    &HashMap::from([("items", n.as_str())]),
                )
            }
        };

        out.push_str(&resolve_runtime_vars(
            &phrases.section_line,
            &HashMap::from([
                ("title", section.title.as_str()),
                ("count", count_text.as_str()),
            ]),
        ));
        out.push('\n');

        let text_vars = HashMap::from([("companies", companies), ("industries", industries)]);
        for guidance in &section.guidance {
            push_indented(out, &resolve_runtime_vars(guidance, &text_vars));
        }

        for (i, split) in section.splits.iter().enumerate() {
            let index = (i + 1).to_string();
            let items = split.items.to_string();
            let guidance = resolve_runtime_vars(&split.guidance, &text_vars);
            let line = resolve_runtime_vars(
                &phrases.split_line,
                &HashMap::from([
                    ("index", index.as_str()),
                    ("label", split.label.as_str()),
                    ("items", items.as_str()),
                    ("guidance", guidance.as_str()),
                ]),
            );
            push_indented(out, line.trim_end());
        }

        if matches!(count, ItemCount::PerIndustry(_)) {
            let line = resolve_runtime_vars(
                &phrases.industries_line,
                &HashMap::from([("industries", industries)]),
            );
            push_indented(out, &line);
        }

        if !section.banned.is_empty() {
            let banned = section.banned.join(sep);
            let line = resolve_runtime_vars(
                &phrases.banned_line,
                &HashMap::from([("banned", banned.as_str())]),
            );
            push_indented(out, &line);
        }

        let fallback = resolve_runtime_vars(&section.fallback, &text_vars);
        let line = resolve_runtime_vars(
            &phrases.fallback_line,
            &HashMap::from([("fallback", fallback.as_str())]),
        );
        push_indented(out, &line);

        Ok(())
    }

    /// All blocks feeding `section`, in run order, or the no-results sentinel.
    fn render_material(&self, section: &SectionConfig, blocks: &[CategoryBlock]) -> String {
        let rendered: Vec<String> = blocks
            .iter()
            .filter(|b| b.section == section.id)
            .map(|b| self.render_block(b))
            .collect();

        if rendered.is_empty() {
            return self.config.search.no_results_text.clone();
        }
        format!("\n{}", rendered.join("\n"))
    }

    fn render_block(&self, block: &CategoryBlock) -> String {
        let search = &self.config.search;
        let body = match &block.status {
            BlockStatus::Ok => block
                .records
                .iter()
                .map(|r| {
                    format!(
                        "{}: {} \n{}: {}\n",
                        search.content_label, r.content, search.source_label, r.source
                    )
                })
                .collect::<Vec<_>>()
                .join("\n"),
            BlockStatus::Empty => search.no_results_text.clone(),
            BlockStatus::Failed(reason) => resolve_runtime_vars(
                &search.failure_text,
                &HashMap::from([("error", reason.as_str())]),
            ),
        };
        format!("{}\n{}", block.heading, body)
    }

    fn write_skeleton(&self, out: &mut String, date: &str) {
        let skeleton = &self.config.skeleton;
        let identity = &self.config.identity;

        out.push_str(&skeleton.heading);
        out.push('\n');
        out.push_str(&resolve_runtime_vars(
            &skeleton.title_line,
            &HashMap::from([("report_title", identity.report_title.as_str())]),
        ));
        out.push('\n');
        out.push_str(&resolve_runtime_vars(
            &skeleton.date_line,
            &HashMap::from([("today", date), ("byline", identity.byline.as_str())]),
        ));
        out.push('\n');

        push_line(out, &skeleton.divider);
        push_line(out, &skeleton.toc_title);
        push_line(out, &skeleton.toc_placeholder);
        push_line(out, &skeleton.divider);

        for section in &self.config.sections {
            out.push_str(&resolve_runtime_vars(
                &skeleton.section_line,
                &HashMap::from([("title", section.title.as_str())]),
            ));
            out.push('\n');
            push_line(out, &skeleton.body_placeholder);
        }

        push_line(out, &skeleton.divider);
        for line in &skeleton.footer {
            push_line(out, line);
        }
    }
}

fn write_rule_block(out: &mut String, block: &RuleBlock, vars: &HashMap<&str, &str>) {
    out.push_str(&block.heading);
    out.push('\n');
    for (i, rule) in block.rules.iter().enumerate() {
        push_line(out, &format!("{}. {}", i + 1, resolve_runtime_vars(rule, vars)));
    }
}

fn push_line(out: &mut String, line: &str) {
    out.push_str(line);
    out.push('\n');
}

fn push_indented(out: &mut String, line: &str) {
    out.push_str("  ");
    push_line(out, line);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::default_config;
    use briefing_common::SearchRecord;

    fn block(id: &str, section: &str, status: BlockStatus) -> CategoryBlock {
        let records = match status {
            BlockStatus::Ok => vec![SearchRecord::normalize(
                Some("威海港集装箱吞吐量增长"),
                Some("https://news.example.com/1"),
                None,
                "无来源链接",
            )],
            _ => vec![],
        };
        CategoryBlock {
            id: id.into(),
            label: id.into(),
            section: section.into(),
            heading: format!("【{id}】"),
            records,
            status,
        }
    }

    #[test]
    fn renders_records_with_labels() {
        let config = default_config();
        let composer = PromptComposer::new(&config);
        let rendered = composer.render_block(&block("macro", "macro", BlockStatus::Ok));
        assert_eq!(
            rendered,
            "【macro】\n【内容】: 威海港集装箱吞吐量增长 \n【来源】: https://news.example.com/1\n"
        );
    }

    #[test]
    fn degraded_blocks_render_sentinels() {
        let config = default_config();
        let composer = PromptComposer::new(&config);

        let empty = composer.render_block(&block("macro", "macro", BlockStatus::Empty));
        assert_eq!(empty, "【macro】\n暂无直接搜索结果。");

        let failed = composer.render_block(&block(
            "macro",
            "macro",
            BlockStatus::Failed("connection reset".into()),
        ));
        assert_eq!(failed, "【macro】\n搜索失败: connection reset");
    }

    #[test]
    fn section_without_blocks_gets_no_results_text() {
        let config = default_config();
        let composer = PromptComposer::new(&config);
        let section = config.section("industry").unwrap();
        assert_eq!(composer.render_material(section, &[]), "暂无直接搜索结果。");
    }

    #[test]
    fn policy_rules_carry_window() {
        let config = default_config();
        let prompt = PromptComposer::new(&config)
            .compose("2026年10月19日", &[], &[], &[])
            .unwrap();
        assert!(prompt.contains("1. 严禁旧闻：仔细核查URL和内容年份，发布时间早于近7日的素材一律舍弃。"));
        assert!(prompt.contains("同一来源URL只能对应一条新闻"));
        assert!(prompt.starts_with("角色：顶尖投行研究所首席经济师。"));
        assert!(prompt.contains("今天是2026年10月19日"));
    }

    #[test]
    fn rule_blocks_are_numbered_one_per_line() {
        let block = RuleBlock {
            heading: "【规则】".into(),
            rules: vec!["近{{window_days}}日".into(), "不重复".into()],
        };
        let mut out = String::new();
        write_rule_block(&mut out, &block, &HashMap::from([("window_days", "7")]));
        assert_eq!(out, "【规则】\n1. 近7日\n2. 不重复\n");

        let mut out = String::new();
        push_indented(&mut out, "行");
        assert_eq!(out, "  行\n");
    }

    #[test]
    fn jurisdiction_lists_sub_regions() {
        let config = default_config();
        let prompt = PromptComposer::new(&config)
            .compose("d", &[], &[], &[])
            .unwrap();
        assert!(prompt.contains("威海、荣成、文登、乳山4个区域"));
    }
}
