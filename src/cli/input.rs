//! Console input: prompting and turning typed text into typed values.
//!
//! Every parser returns [`LabError::InvalidInput`] instead of panicking, so a
//! mistyped number only aborts the current action.
use crate::Experiments::execution::PolicyKind;
use crate::Experiments::experiment::ExperimentResult;
use crate::Experiments::experiment_registry::ExperimentKey;
use crate::lab_error::LabError;
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::io::{self, Write};

const DATE_PATTERN: &str = r"^(\d{4})-(\d{2})-(\d{2})$";

/// Prints `label` in prompt color and reads one trimmed line. End of input is
/// an error so that every menu loop terminates.
pub fn prompt(label: &str) -> Result<String, LabError> {
    print!("\x1b[36m{}: \x1b[0m", label);
    io::stdout().flush()?;
    let mut input = String::new();
    if io::stdin().read_line(&mut input)? == 0 {
        return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "end of input").into());
    }
    Ok(input.trim().to_string())
}

/// Like [`prompt`], `None` when the operator just presses enter.
pub fn prompt_optional(label: &str) -> Result<Option<String>, LabError> {
    let input = prompt(label)?;
    Ok(if input.is_empty() { None } else { Some(input) })
}

pub fn parse_f64(field: &str, input: &str) -> Result<f64, LabError> {
    match input.trim().replace(',', ".").parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(LabError::invalid_input(field, input)),
    }
}

/// A non-negative number, for quantities and costs.
pub fn parse_amount(field: &str, input: &str) -> Result<f64, LabError> {
    let value = parse_f64(field, input)?;
    if value < 0.0 {
        return Err(LabError::invalid_input(field, input));
    }
    Ok(value)
}

pub fn parse_u64(field: &str, input: &str) -> Result<u64, LabError> {
    input
        .trim()
        .parse::<u64>()
        .map_err(|_| LabError::invalid_input(field, input))
}

/// `YYYY-MM-DD` with a plausible month and day.
pub fn parse_date(input: &str) -> Result<String, LabError> {
    let re = Regex::new(DATE_PATTERN).map_err(|e| LabError::invalid_input("date pattern", e.to_string()))?;
    let caps = re
        .captures(input.trim())
        .ok_or_else(|| LabError::invalid_input("date (YYYY-MM-DD)", input))?;
    let month: u32 = caps[2].parse().unwrap_or(0);
    let day: u32 = caps[3].parse().unwrap_or(0);
    if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
        return Err(LabError::invalid_input("date (YYYY-MM-DD)", input));
    }
    Ok(input.trim().to_string())
}

/// Comma separated names, blanks dropped.
pub fn parse_people(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

/// A JSON object becomes a structured result, anything else is free text.
pub fn parse_result(input: &str) -> Result<ExperimentResult, LabError> {
    let trimmed = input.trim();
    if trimmed.starts_with('{') {
        let map: BTreeMap<String, Value> =
            serde_json::from_str(trimmed).map_err(|_| LabError::invalid_input("result (JSON object)", input))?;
        Ok(ExperimentResult::Structured(map))
    } else {
        Ok(ExperimentResult::Text(trimmed.to_string()))
    }
}

pub fn parse_policy(input: &str) -> Result<PolicyKind, LabError> {
    match input.trim() {
        "1" => Ok(PolicyKind::PercentageLoss),
        "2" => Ok(PolicyKind::FractionLoss),
        other => PolicyKind::by_name(other),
    }
}

/// `#12` selects by id, anything else by name.
pub fn parse_experiment_key(input: &str) -> Result<ExperimentKey, LabError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(LabError::invalid_input("experiment", input));
    }
    match trimmed.strip_prefix('#') {
        Some(id) => Ok(ExperimentKey::Id(parse_u64("experiment id", id)?)),
        None => Ok(ExperimentKey::Name(trimmed.to_string())),
    }
}

pub fn parse_yes_no(input: &str) -> Result<bool, LabError> {
    match input.trim().to_lowercase().as_str() {
        "y" | "yes" | "s" | "si" | "true" | "1" => Ok(true),
        "n" | "no" | "false" | "0" => Ok(false),
        _ => Err(LabError::invalid_input("yes/no", input)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_numbers() {
        assert_eq!(parse_f64("quantity", " 2.5 ").unwrap(), 2.5);
        assert_eq!(parse_f64("quantity", "2,5").unwrap(), 2.5);
        assert!(matches!(
            parse_f64("quantity", "two"),
            Err(LabError::InvalidInput { .. })
        ));
        assert!(parse_f64("quantity", "NaN").is_err());
        assert!(parse_amount("quantity", "-1").is_err());
        assert_eq!(parse_amount("quantity", "0").unwrap(), 0.0);
        assert_eq!(parse_u64("id", "7").unwrap(), 7);
        assert!(parse_u64("id", "-7").is_err());
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date("2024-05-01").unwrap(), "2024-05-01");
        assert!(parse_date("2024-13-01").is_err());
        assert!(parse_date("2024-00-10").is_err());
        assert!(parse_date("01/05/2024").is_err());
        let err = parse_date("tomorrow").unwrap_err();
        assert!(err.to_string().contains("tomorrow"));
    }

    #[test]
    fn test_parse_people() {
        assert_eq!(parse_people("Ana, Luis,,  Marta "), vec!["Ana", "Luis", "Marta"]);
        assert!(parse_people("  ").is_empty());
    }

    #[test]
    fn test_parse_result() {
        assert_eq!(parse_result(" clear ").unwrap(), ExperimentResult::text("clear"));
        match parse_result(r#"{"yield": 15, "colour": "blue"}"#).unwrap() {
            ExperimentResult::Structured(map) => {
                assert_eq!(map["yield"], json!(15));
                assert_eq!(map["colour"], json!("blue"));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(parse_result("{yield: 15").is_err());
    }

    #[test]
    fn test_parse_policy_and_key() {
        assert_eq!(parse_policy("A").unwrap(), PolicyKind::PercentageLoss);
        assert_eq!(parse_policy("2").unwrap(), PolicyKind::FractionLoss);
        assert_eq!(parse_policy("fraction-loss").unwrap(), PolicyKind::FractionLoss);
        assert!(parse_policy("3").is_err());
        assert_eq!(parse_experiment_key("#4").unwrap(), ExperimentKey::Id(4));
        assert_eq!(
            parse_experiment_key(" acid test ").unwrap(),
            ExperimentKey::Name("acid test".to_string())
        );
        assert!(parse_experiment_key("#x").is_err());
        assert!(parse_experiment_key("").is_err());
    }

    #[test]
    fn test_parse_yes_no() {
        assert!(parse_yes_no("Y").unwrap());
        assert!(!parse_yes_no("no").unwrap());
        assert!(parse_yes_no("maybe").is_err());
    }
}
