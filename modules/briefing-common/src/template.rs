use anyhow::{bail, Result};
use std::collections::HashMap;

/// One `{{name}}` occurrence: byte span of the whole placeholder plus the trimmed name.
struct Placeholder<'a> {
    start: usize,
    end: usize,
    name: &'a str,
}

/// Scan a template for `{{name}}` placeholders. An unclosed `{{` ends the scan.
fn scan(template: &str) -> (Vec<Placeholder<'_>>, Option<usize>) {
    let mut found = Vec::new();
    let mut cursor = 0;

    while let Some(open) = template[cursor..].find("{{") {
        let start = cursor + open;
        let Some(close) = template[start + 2..].find("}}") else {
            return (found, Some(start));
        };
        let end = start + 2 + close + 2;
        found.push(Placeholder {
            start,
            end,
            name: template[start + 2..end - 2].trim(),
        });
        cursor = end;
    }

    (found, None)
}

/// Fill `{{var}}` placeholders from a runtime context map.
///
/// Unknown variables and an unclosed trailing `{{` are left as-is.
pub fn resolve_runtime_vars(template: &str, vars: &HashMap<&str, &str>) -> String {
    let (placeholders, _) = scan(template);
    let mut result = String::with_capacity(template.len());
    let mut cursor = 0;

    for ph in placeholders {
        result.push_str(&template[cursor..ph.start]);
        match vars.get(ph.name) {
            Some(value) => result.push_str(value),
            None => result.push_str(&template[ph.start..ph.end]),
        }
        cursor = ph.end;
    }
    result.push_str(&template[cursor..]);

    result
}

/// Reject templates that are malformed or reference variables outside `allowed`.
pub fn validate_template(template: &str, allowed: &[&str]) -> Result<()> {
    let (placeholders, unclosed) = scan(template);
    if let Some(at) = unclosed {
        bail!("Unclosed template variable at byte {at}: {template}");
    }
    for ph in placeholders {
        if !allowed.contains(&ph.name) {
            bail!(
                "Unknown template variable: {{{{{}}}}}. Allowed: {:?}",
                ph.name,
                allowed
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_known_vars() {
        let result = resolve_runtime_vars(
            "今天是{{today}}，企业：{{ companies }}",
            &HashMap::from([("today", "2026年10月19日"), ("companies", "迪尚集团")]),
        );
        assert_eq!(result, "今天是2026年10月19日，企业：迪尚集团");
    }

    #[test]
    fn leaves_unknown_vars_intact() {
        let result = resolve_runtime_vars(
            "{{date}} / {{unknown}}",
            &HashMap::from([("date", "d")]),
        );
        assert_eq!(result, "d / {{unknown}}");
    }

    #[test]
    fn unclosed_placeholder_is_kept_verbatim() {
        let result = resolve_runtime_vars("a {{x}} b {{y", &HashMap::from([("x", "1")]));
        assert_eq!(result, "a 1 b {{y");
    }

    #[test]
    fn validates_allowed_vars() {
        assert!(validate_template("{{items}}条", &["items"]).is_ok());
        assert!(validate_template("{{itemz}}条", &["items"]).is_err());
        assert!(validate_template("{{items", &["items"]).is_err());
        assert!(validate_template("plain text", &[]).is_ok());
    }
}
