use crate::Evaluation::evaluator::Evaluation;
use crate::Utils::load_from_file::{LoadData, require_keys};
use crate::lab_error::LabError;
use log::info;
use serde::{Deserialize, Serialize};

pub const RESULT_KEYS: [&str; 2] = ["experimento", "resultado"];

/// one evaluation of one experiment, as stored in `resultados.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    #[serde(rename = "experimento")]
    pub experiment: String,
    #[serde(rename = "resultado")]
    pub evaluation: Evaluation,
}

/// Append-only log of evaluations. Evaluating the same experiment twice adds
/// a second record.
#[derive(Debug, Clone, Default)]
pub struct ResultsLog {
    records: Vec<EvaluationRecord>,
}

impl ResultsLog {
    /// A missing file is an empty log. A present file whose entries lack
    /// `experimento` or `resultado` is rejected as a whole.
    pub fn load(file_name: &str) -> Result<Self, LabError> {
        let entries = LoadData::new(file_name).load_array()?;
        let mut records = Vec::with_capacity(entries.len());
        for (i, entry) in entries.into_iter().enumerate() {
            require_keys(file_name, i, &entry, &RESULT_KEYS)?;
            let record: EvaluationRecord = serde_json::from_value(entry)
                .map_err(|e| LabError::malformed(file_name, format!("entry {}: {}", i, e)))?;
            records.push(record);
        }
        info!("{} evaluation records loaded", records.len());
        Ok(Self { records })
    }

    pub fn save(&self, file_name: &str, atomic: bool) -> Result<(), LabError> {
        LoadData::new(file_name).save(&self.records, atomic)
    }

    pub fn records(&self) -> &[EvaluationRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn append(&mut self, record: EvaluationRecord) {
        self.records.push(record);
    }

    pub fn for_experiment(&self, experiment: &str) -> Vec<&EvaluationRecord> {
        self.records
            .iter()
            .filter(|r| r.experiment == experiment)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_results(text: &str) -> NamedTempFile {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(text.as_bytes()).unwrap();
        temp_file
    }

    #[test]
    fn test_missing_file_is_empty_log() {
        let dir = tempfile::tempdir().unwrap();
        let log = ResultsLog::load(dir.path().join("resultados.json").to_str().unwrap()).unwrap();
        assert!(log.is_empty());
    }

    #[test]
    fn test_entry_without_result_key_is_malformed() {
        let file = write_results(&json!([{"experimento": "e1", "evaluacion": {"ph": true}}]).to_string());
        let err = ResultsLog::load(file.path().to_str().unwrap()).unwrap_err();
        assert!(matches!(err, LabError::MalformedData { .. }));
        assert!(err.to_string().contains("resultado"));
    }

    #[test]
    fn test_non_array_is_malformed() {
        let file = write_results(r#"{"experimento": "e1", "resultado": "ok"}"#);
        assert!(matches!(
            ResultsLog::load(file.path().to_str().unwrap()),
            Err(LabError::MalformedData { .. })
        ));
    }

    #[test]
    fn test_append_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("resultados.json");
        let path = path.to_str().unwrap();

        let mut log = ResultsLog::default();
        log.append(EvaluationRecord {
            experiment: "e1".to_string(),
            evaluation: Evaluation::Parameters(BTreeMap::from([("yield".to_string(), true)])),
        });
        log.append(EvaluationRecord {
            experiment: "e2".to_string(),
            evaluation: Evaluation::Text("clear".to_string()),
        });
        log.append(EvaluationRecord {
            experiment: "e1".to_string(),
            evaluation: Evaluation::Parameters(BTreeMap::from([("yield".to_string(), false)])),
        });
        log.save(path, true).unwrap();

        let loaded = ResultsLog::load(path).unwrap();
        assert_eq!(loaded.records(), log.records());
        assert_eq!(loaded.for_experiment("e1").len(), 2);

        let raw: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(raw[1], json!({"experimento": "e2", "resultado": "clear"}));
    }
}
