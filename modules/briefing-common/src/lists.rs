/// Split a configured company/industry list.
///
/// Entries may be separated by whitespace, `、`, `，` or `,`; empty entries
/// are dropped.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(|c: char| c.is_whitespace() || matches!(c, '、' | '，' | ','))
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
