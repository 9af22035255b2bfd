use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// --- SearchRecord ---

/// One normalized search hit: single-line content plus its source URL
/// (or the configured placeholder when the provider omitted it).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRecord {
    pub content: String,
    pub source: String,
    /// Provider-reported publication date, when it reported one.
    pub published: Option<NaiveDate>,
}

impl SearchRecord {
    pub fn normalize(
        content: Option<&str>,
        url: Option<&str>,
        published: Option<&str>,
        missing_source: &str,
    ) -> Self {
        let content = content
            .unwrap_or_default()
            .replace("\r\n", " ")
            .replace(['\n', '\r'], " ");
        let source = match url.map(str::trim) {
            Some(u) if !u.is_empty() => u.to_string(),
            _ => missing_source.to_string(),
        };
        Self {
            content,
            source,
            published: published.and_then(parse_published),
        }
    }
}

/// Providers report either a bare date or an RFC 3339 / RFC 2822 timestamp.
fn parse_published(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            chrono::DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|d| d.date_naive())
        })
        .or_else(|| {
            chrono::DateTime::parse_from_rfc2822(raw)
                .ok()
                .map(|d| d.date_naive())
        })
}

// --- CategoryBlock ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockStatus {
    Ok,
    /// Provider answered but returned nothing usable.
    Empty,
    /// Provider call failed; the reason is kept for the sentinel text and logs.
    Failed(String),
}

/// Results of one search category for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryBlock {
    pub id: String,
    pub label: String,
    /// Report section this material feeds.
    pub section: String,
    /// Heading printed above the block in the material pool.
    pub heading: String,
    pub records: Vec<SearchRecord>,
    pub status: BlockStatus,
}

impl CategoryBlock {
    pub fn from_records(
        id: impl Into<String>,
        label: impl Into<String>,
        section: impl Into<String>,
        heading: impl Into<String>,
        records: Vec<SearchRecord>,
    ) -> Self {
        let status = if records.is_empty() {
            BlockStatus::Empty
        } else {
            BlockStatus::Ok
        };
        Self {
            id: id.into(),
            label: label.into(),
            section: section.into(),
            heading: heading.into(),
            records,
            status,
        }
    }

    pub fn failed(
        id: impl Into<String>,
        label: impl Into<String>,
        section: impl Into<String>,
        heading: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            section: section.into(),
            heading: heading.into(),
            records: Vec::new(),
            status: BlockStatus::Failed(reason.into()),
        }
    }

    pub fn is_degraded(&self) -> bool {
        !matches!(self.status, BlockStatus::Ok)
    }
}

// --- Briefing ---

/// The generated report for one run. Lives only between generation and delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Briefing {
    pub date: String,
    pub body: String,
}

// --- Generation ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelPath {
    Primary,
    Fallback,
}

// --- Delivery ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransportUsed {
    Primary,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryResult {
    pub succeeded: bool,
    /// Last transport attempted; `None` when delivery never reached a transport.
    pub transport_used: Option<TransportUsed>,
    pub error: Option<String>,
}

impl DeliveryResult {
    pub fn sent(transport: TransportUsed) -> Self {
        Self {
            succeeded: true,
            transport_used: Some(transport),
            error: None,
        }
    }

    pub fn failed(transport: Option<TransportUsed>, error: impl Into<String>) -> Self {
        Self {
            succeeded: false,
            transport_used: transport,
            error: Some(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_flattens_newlines() {
        let r = SearchRecord::normalize(Some("line one\nline two\r\nthree"), Some("https://a"), None, "无来源链接");
        assert_eq!(r.content, "line one line two three");
        assert_eq!(r.source, "https://a");
    }

    #[test]
    fn normalize_defaults_missing_source() {
        let r = SearchRecord::normalize(Some("x"), None, None, "无来源链接");
        assert_eq!(r.source, "无来源链接");
        let r = SearchRecord::normalize(None, Some("  "), None, "无来源链接");
        assert_eq!(r.source, "无来源链接");
        assert_eq!(r.content, "");
    }

    #[test]
    fn normalize_parses_published_dates() {
        let expected = NaiveDate::from_ymd_opt(2026, 10, 15);
        let bare = SearchRecord::normalize(Some("x"), None, Some("2026-10-15"), "-");
        let rfc3339 = SearchRecord::normalize(Some("x"), None, Some("2026-10-15T08:00:00Z"), "-");
        let rfc2822 =
            SearchRecord::normalize(Some("x"), None, Some("Thu, 15 Oct 2026 08:00:00 GMT"), "-");
        let junk = SearchRecord::normalize(Some("x"), None, Some("last week"), "-");

        assert_eq!(bare.published, expected);
        assert_eq!(rfc3339.published, expected);
        assert_eq!(rfc2822.published, expected);
        assert_eq!(junk.published, None);
    }

    #[test]
    fn block_status_follows_records() {
        let empty = CategoryBlock::from_records("macro", "宏观", "macro", "【宏观】", vec![]);
        assert_eq!(empty.status, BlockStatus::Empty);
        assert!(empty.is_degraded());

        let failed = CategoryBlock::failed("macro", "宏观", "macro", "【宏观】", "timeout");
        assert_eq!(failed.status, BlockStatus::Failed("timeout".into()));
    }
}
