//! Workflow Definition Parser
//!
//! Loads workflow definitions from YAML. Each workflow is a list of
//! single-key maps whose key is the step identifier; deadlines are
//! duration strings such as `500ms`, `10s` or `1h30m`.

use std::collections::{BTreeMap, HashMap};
use std::error::Error;
use std::fs;
use std::path::{Component, Path};
use std::time::Duration;

use log::{debug, info};
use serde::Deserialize;

use super::model::{Step, Workflow, WorkflowDefinitions};
use super::validator::validate_definitions;

/// Root of a definitions file.
#[derive(Deserialize, Debug)]
struct RawRoot {
    #[serde(default)]
    workflows: HashMap<String, Option<Vec<BTreeMap<String, RawStep>>>>,
}

/// A step as written in YAML.
#[derive(Deserialize, Debug)]
struct RawStep {
    #[serde(default)]
    name: String,
    retryafter: String,
    #[serde(default)]
    retryurl: String,
}

/// Loads and validates workflow definitions from a YAML file.
///
/// # Arguments
///
/// * `path` - Path to the definitions file; must be non-empty and free of `..`
///
/// # Example
///
/// ```rust,no_run
/// use flowwarden::workflow::load_definitions;
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let definitions = load_definitions("workflows.yaml")?;
///     println!("Loaded {} workflows", definitions.len());
///     Ok(())
/// }
/// ```
pub fn load_definitions(path: &str) -> Result<WorkflowDefinitions, Box<dyn Error>> {
    if path.trim().is_empty() {
        return Err("Workflow definitions path cannot be empty".into());
    }

    let path_ref = Path::new(path);
    if path_ref.components().any(|c| c == Component::ParentDir) {
        return Err(format!("Workflow definitions path cannot contain '..': {}", path).into());
    }

    info!("Loading workflow definitions from: {}", path);

    let yaml_content = fs::read_to_string(path_ref).map_err(|e| {
        format!(
            "Failed to read workflow definitions '{}': {}. Check that the file exists and is readable.",
            path, e
        )
    })?;

    debug!("YAML content loaded ({} bytes)", yaml_content.len());

    let definitions = parse_definitions(&yaml_content)?;
    validate_definitions(&definitions)?;

    info!("Loaded {} workflow definitions", definitions.len());
    Ok(definitions)
}

/// Parses definitions from YAML text without validating them.
pub fn parse_definitions(yaml: &str) -> Result<WorkflowDefinitions, String> {
    let root: RawRoot = serde_yaml::from_str(yaml)
        .map_err(|e| format!("Failed to parse workflow YAML: {}. Check the file format.", e))?;

    let mut definitions = WorkflowDefinitions::new();

    for (name, entries) in root.workflows {
        let entries = entries.unwrap_or_default();
        let mut steps = Vec::with_capacity(entries.len());

        for (index, entry) in entries.into_iter().enumerate() {
            if entry.len() != 1 {
                return Err(format!(
                    "Workflow '{}': entry {} must hold exactly one step, found {}",
                    name,
                    index,
                    entry.len()
                ));
            }

            for (id, raw) in entry {
                let deadline = parse_duration(&raw.retryafter).map_err(|e| {
                    format!("Workflow '{}', step '{}': invalid retryafter: {}", name, id, e)
                })?;
                steps.push(Step::new(id, raw.name, deadline, raw.retryurl));
            }
        }

        debug!("Workflow '{}' parsed with {} steps", name, steps.len());
        definitions.insert(name, Workflow::from_steps(steps));
    }

    Ok(definitions)
}

/// Parses a duration string made of `<number><unit>` groups.
///
/// Supported units are `ns`, `us` (or `µs`), `ms`, `s`, `m` and `h`;
/// numbers may carry a fractional part. A bare `0` is accepted.
///
/// ```
/// use std::time::Duration;
/// use flowwarden::workflow::parse_duration;
///
/// assert_eq!(parse_duration("1m30s"), Ok(Duration::from_secs(90)));
/// assert_eq!(parse_duration("250ms"), Ok(Duration::from_millis(250)));
/// ```
pub fn parse_duration(text: &str) -> Result<Duration, String> {
    let text = text.trim();
    let body = text.strip_prefix('+').unwrap_or(text);

    if body.is_empty() {
        return Err("empty duration".to_string());
    }
    if body == "0" {
        return Ok(Duration::ZERO);
    }

    let mut total: u128 = 0;
    let mut rest = body;

    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        let (number, tail) = rest.split_at(number_len);
        if number.is_empty() || number == "." {
            return Err(format!("expected a number in '{}'", text));
        }

        let unit_len = tail
            .find(|c: char| !c.is_alphabetic())
            .unwrap_or(tail.len());
        let (unit, tail) = tail.split_at(unit_len);
        let scale = unit_nanos(unit).ok_or_else(|| {
            if unit.is_empty() {
                format!("missing unit in '{}'", text)
            } else {
                format!("unknown unit '{}' in '{}'", unit, text)
            }
        })?;

        let group =
            scaled_nanos(number, scale).ok_or_else(|| format!("invalid number '{}'", number))?;
        total = total
            .checked_add(group)
            .ok_or_else(|| format!("duration '{}' is too large", text))?;
        rest = tail;
    }

    let nanos = u64::try_from(total).map_err(|_| format!("duration '{}' is too large", text))?;
    Ok(Duration::from_nanos(nanos))
}

fn unit_nanos(unit: &str) -> Option<u128> {
    match unit {
        "ns" => Some(1),
        "us" | "µs" | "μs" => Some(1_000),
        "ms" => Some(1_000_000),
        "s" => Some(1_000_000_000),
        "m" => Some(60 * 1_000_000_000),
        "h" => Some(3_600 * 1_000_000_000),
        _ => None,
    }
}

/// Multiplies a decimal literal by `scale` without going through floats.
fn scaled_nanos(number: &str, scale: u128) -> Option<u128> {
    let (whole, fraction) = match number.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (number, ""),
    };
    if fraction.contains('.') {
        return None;
    }

    let whole: u128 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
    let mut value = whole.checked_mul(scale)?;

    if !fraction.is_empty() {
        // Digits past nanosecond precision are dropped.
        let digits = &fraction[..fraction.len().min(18)];
        let numerator: u128 = digits.parse().ok()?;
        let denominator = 10u128.pow(digits.len() as u32);
        value = value.checked_add(numerator * scale / denominator)?;
    }

    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const SAMPLE: &str = r#"
workflows:
  onboarding:
    - step0:
        name: "Create account"
        retryafter: "5s"
        retryurl: "https://example.com/retry"
    - step1:
        name: "Send welcome mail"
        retryafter: "1m30s"
        retryurl: "https://example.com/retry2"
  empty:
"#;

    #[test]
    fn test_parse_definitions() {
        let defs = parse_definitions(SAMPLE).unwrap();
        assert_eq!(defs.len(), 2);

        let onboarding = defs.get_workflow("onboarding").unwrap();
        assert_eq!(onboarding.len(), 2);
        assert_eq!(onboarding.steps[0].id, "step0");
        assert_eq!(onboarding.steps[0].name, "Create account");
        assert_eq!(onboarding.steps[1].deadline, Duration::from_secs(90));
        assert_eq!(onboarding.steps[1].notify_url, "https://example.com/retry2");

        assert!(defs.get_workflow("empty").unwrap().is_empty());
    }

    #[test]
    fn test_parse_rejects_multi_key_entry() {
        let yaml = r#"
workflows:
  w:
    - step0: { name: a, retryafter: 1s, retryurl: "http://x" }
      step1: { name: b, retryafter: 1s, retryurl: "http://x" }
"#;
        let err = parse_definitions(yaml).unwrap_err();
        assert!(err.contains("exactly one step"), "{}", err);
    }

    #[test]
    fn test_parse_rejects_bad_duration() {
        let yaml = r#"
workflows:
  w:
    - step0: { name: a, retryafter: "soon", retryurl: "http://x" }
"#;
        let err = parse_definitions(yaml).unwrap_err();
        assert!(err.contains("invalid retryafter"), "{}", err);
    }

    #[test]
    fn test_parse_invalid_yaml() {
        assert!(parse_definitions("workflows: [[[").is_err());
    }

    #[test]
    fn test_parse_duration_units() {
        assert_eq!(parse_duration("0"), Ok(Duration::ZERO));
        assert_eq!(parse_duration("15ns"), Ok(Duration::from_nanos(15)));
        assert_eq!(parse_duration("20us"), Ok(Duration::from_micros(20)));
        assert_eq!(parse_duration("20µs"), Ok(Duration::from_micros(20)));
        assert_eq!(parse_duration("50ms"), Ok(Duration::from_millis(50)));
        assert_eq!(parse_duration("10s"), Ok(Duration::from_secs(10)));
        assert_eq!(parse_duration("2h"), Ok(Duration::from_secs(7200)));
        assert_eq!(parse_duration("1h30m"), Ok(Duration::from_secs(5400)));
        assert_eq!(parse_duration(" +1.5s "), Ok(Duration::from_millis(1500)));
        assert_eq!(parse_duration(".5m"), Ok(Duration::from_secs(30)));
    }

    #[test]
    fn test_parse_duration_errors() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("10").unwrap_err().contains("missing unit"));
        assert!(parse_duration("10d").unwrap_err().contains("unknown unit"));
        assert!(parse_duration("s").is_err());
        assert!(parse_duration("1.2.3s").is_err());
        assert!(parse_duration("-5s").is_err());
    }

    #[test]
    fn test_parse_duration_overflow_is_error() {
        let huge = "90000000000000000000000000h90000000000000000000000000h";
        assert!(parse_duration(huge).unwrap_err().contains("too large"));
        assert!(parse_duration("6000000h").unwrap_err().contains("too large"));

        let yaml = format!(
            "workflows:\n  w:\n    - step0: {{ name: a, retryafter: \"{}\", retryurl: \"http://x\" }}\n",
            huge
        );
        let err = parse_definitions(&yaml).unwrap_err();
        assert!(err.contains("invalid retryafter"), "{}", err);
    }

    #[test]
    fn test_load_definitions_from_file() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("workflows.yaml");
        std::fs::write(&path, SAMPLE).unwrap();

        let defs = load_definitions(path.to_str().unwrap()).unwrap();
        assert_eq!(defs.names(), vec!["empty", "onboarding"]);
    }

    #[test]
    fn test_load_definitions_rejects_bad_paths() {
        assert!(load_definitions("").is_err());
        assert!(load_definitions("../workflows.yaml").is_err());
        assert!(load_definitions("/nonexistent/path/workflows.yaml").is_err());
    }

    #[test]
    fn test_load_definitions_runs_validation() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("bad.yaml");
        std::fs::write(
            &path,
            "workflows:\n  w:\n    - step3: { name: a, retryafter: 1s, retryurl: \"http://x\" }\n",
        )
        .unwrap();

        let err = load_definitions(path.to_str().unwrap()).unwrap_err();
        assert!(err.to_string().contains("step0"), "{}", err);
    }
}
