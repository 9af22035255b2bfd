use std::sync::OnceLock;

use regex::Regex;

fn fence_regex() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| Regex::new(r"```[A-Za-z0-9_-]*").expect("static fence pattern"))
}

/// Remove every markdown code-fence marker (```` ``` ```` with or without a
/// language tag) from a model response, wherever it appears.
///
/// Models asked to emit inline HTML sometimes wrap the whole reply in
/// ```` ```html ````, which would make a markdown renderer escape it.
pub fn strip_code_fences(response: &str) -> String {
    fence_regex().replace_all(response, "").into_owned()
}
