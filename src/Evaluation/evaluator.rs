//! # Result evaluation
//!
//! A recipe declares, for each parameter it cares about, the values it accepts
//! (`valores_esperados`). An experiment result is either free text, which is
//! copied into the evaluation untouched, or a parameter map, which is checked
//! parameter by parameter.
//!
//! A measured value is accepted when
//! - it is one of the listed values (numbers compare by value, so `7` and
//!   `7.0` are the same), or
//! - the list holds exactly two numbers and the measured value is a number
//!   lying between them, bounds included.
//!
//! A declared parameter missing from the result is evaluated with the
//! [`NOT_RECORDED`] marker, which is rejected unless a recipe lists it.
//! Parameters the recipe does not declare are ignored.
use crate::Experiments::experiment::ExperimentResult;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

pub const NOT_RECORDED: &str = "no registrado";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Evaluation {
    Text(String),
    Parameters(BTreeMap<String, bool>),
}

impl Evaluation {
    /// parameters that failed, empty for text evaluations
    pub fn failed_parameters(&self) -> Vec<&str> {
        match self {
            Evaluation::Text(_) => Vec::new(),
            Evaluation::Parameters(map) => map
                .iter()
                .filter(|(_, ok)| !**ok)
                .map(|(name, _)| name.as_str())
                .collect(),
        }
    }
}

fn same_value(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

/// Is `measured` acceptable against the recipe's `accepted` list?
pub fn is_acceptable(measured: &Value, accepted: &[Value]) -> bool {
    if accepted.iter().any(|a| same_value(a, measured)) {
        return true;
    }
    match (accepted, measured.as_f64()) {
        ([low, high], Some(v)) => match (low.as_f64(), high.as_f64()) {
            (Some(low), Some(high)) => v >= low.min(high) && v <= low.max(high),
            _ => false,
        },
        _ => false,
    }
}

pub fn evaluate(expected_values: &BTreeMap<String, Vec<Value>>, result: &ExperimentResult) -> Evaluation {
    match result {
        ExperimentResult::Text(text) => Evaluation::Text(text.clone()),
        ExperimentResult::Structured(measured) => {
            let not_recorded = Value::String(NOT_RECORDED.to_string());
            let verdicts = expected_values
                .iter()
                .map(|(parameter, accepted)| {
                    let value = measured.get(parameter).unwrap_or(&not_recorded);
                    (parameter.clone(), is_acceptable(value, accepted))
                })
                .collect();
            Evaluation::Parameters(verdicts)
        }
    }
}
