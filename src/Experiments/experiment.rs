//! # Experiment records
//!
//! `experimentos.json` holds experiments in two shapes:
//!
//! | keyed shape | named shape |
//! |-------------|-------------|
//! | `id` | `nombre` |
//! | `receta_id` | `receta` (recipe name) |
//! | `personas_responsables` | `responsables` |
//! | `fecha` | `fecha` |
//! | `costo_asociado` | `costo` |
//! | `resultado` | `resultado` |
//!
//! After an execution either shape also carries `factor_perdida`,
//! `perdidas` (one loss per required reagent), `costo_real` and `politica`.
//! Keys are written in the order listed here.
//!
//! Each shape has its own adapter struct; both convert into the single
//! [`Experiment`] used everywhere else, which remembers its shape so it is
//! written back the way it was read.
use crate::Recipes::recipe::RecipeRef;
use crate::lab_error::LabError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

pub const KEYED_KEYS: [&str; 6] = [
    "id",
    "receta_id",
    "personas_responsables",
    "fecha",
    "costo_asociado",
    "resultado",
];

pub const NAMED_KEYS: [&str; 6] = ["nombre", "receta", "responsables", "fecha", "costo", "resultado"];

/// result written after execution by the fraction-loss path
pub const PENDING_RESULT: &str = "pendiente";

/// Free text, or parameter -> measured value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExperimentResult {
    Text(String),
    Structured(BTreeMap<String, Value>),
}

impl ExperimentResult {
    pub fn text(text: &str) -> Self {
        ExperimentResult::Text(text.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExperimentSchema {
    Keyed,
    Named,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Experiment {
    pub id: Option<u64>,
    pub name: Option<String>,
    pub recipe: RecipeRef,
    pub responsible_people: Vec<String>,
    pub date: String,
    pub associated_cost: f64,
    pub result: ExperimentResult,
    /// loss drawn on the last execution
    pub loss_factor: Option<f64>,
    /// loss applied to each required reagent on the last execution, in recipe order
    pub losses: Option<Vec<f64>>,
    /// cost computed on the last execution
    pub realized_cost: Option<f64>,
    /// policy used on the last execution
    pub policy: Option<String>,
    pub schema: ExperimentSchema,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct KeyedExperimentRecord {
    id: u64,
    receta_id: u64,
    personas_responsables: Vec<String>,
    fecha: String,
    costo_asociado: f64,
    resultado: ExperimentResult,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    nombre: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    factor_perdida: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    perdidas: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    costo_real: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    politica: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct NamedExperimentRecord {
    nombre: String,
    receta: String,
    responsables: Vec<String>,
    fecha: String,
    costo: f64,
    resultado: ExperimentResult,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    factor_perdida: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    perdidas: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    costo_real: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    politica: Option<String>,
}

impl From<KeyedExperimentRecord> for Experiment {
    fn from(r: KeyedExperimentRecord) -> Self {
        Experiment {
            id: Some(r.id),
            name: r.nombre,
            recipe: RecipeRef::Id(r.receta_id),
            responsible_people: r.personas_responsables,
            date: r.fecha,
            associated_cost: r.costo_asociado,
            result: r.resultado,
            loss_factor: r.factor_perdida,
            losses: r.perdidas,
            realized_cost: r.costo_real,
            policy: r.politica,
            schema: ExperimentSchema::Keyed,
        }
    }
}

impl From<NamedExperimentRecord> for Experiment {
    fn from(r: NamedExperimentRecord) -> Self {
        Experiment {
            id: r.id,
            name: Some(r.nombre),
            recipe: RecipeRef::Name(r.receta),
            responsible_people: r.responsables,
            date: r.fecha,
            associated_cost: r.costo,
            result: r.resultado,
            loss_factor: r.factor_perdida,
            losses: r.perdidas,
            realized_cost: r.costo_real,
            policy: r.politica,
            schema: ExperimentSchema::Named,
        }
    }
}

fn has_all(object: &serde_json::Map<String, Value>, keys: &[&str]) -> bool {
    keys.iter().all(|key| object.contains_key(*key))
}

impl Experiment {
    /// Experiment in the keyed shape, pointing at its recipe by id.
    pub fn keyed(id: u64, recipe_id: u64, responsible_people: Vec<String>, date: &str, cost: f64) -> Self {
        Experiment {
            id: Some(id),
            name: None,
            recipe: RecipeRef::Id(recipe_id),
            responsible_people,
            date: date.to_string(),
            associated_cost: cost,
            result: ExperimentResult::text(""),
            loss_factor: None,
            losses: None,
            realized_cost: None,
            policy: None,
            schema: ExperimentSchema::Keyed,
        }
    }

    /// Experiment in the named shape, pointing at its recipe by name.
    pub fn named(name: &str, recipe_name: &str, responsible_people: Vec<String>, date: &str, cost: f64) -> Self {
        Experiment {
            id: None,
            name: Some(name.to_string()),
            recipe: RecipeRef::Name(recipe_name.to_string()),
            responsible_people,
            date: date.to_string(),
            associated_cost: cost,
            result: ExperimentResult::text(""),
            loss_factor: None,
            losses: None,
            realized_cost: None,
            policy: None,
            schema: ExperimentSchema::Named,
        }
    }

    /// Picks the adapter by which required keys are present. An entry
    /// carrying the full keyed set is read as keyed even if it also has a name.
    pub fn from_value(file_name: &str, index: usize, value: Value) -> Result<Self, LabError> {
        let malformed = |reason: String| LabError::malformed(file_name, format!("entry {}: {}", index, reason));
        let object = value
            .as_object()
            .ok_or_else(|| malformed("not an object".to_string()))?;
        if has_all(object, &KEYED_KEYS) {
            let record: KeyedExperimentRecord =
                serde_json::from_value(value).map_err(|e| malformed(e.to_string()))?;
            Ok(record.into())
        } else if has_all(object, &NAMED_KEYS) {
            let record: NamedExperimentRecord =
                serde_json::from_value(value).map_err(|e| malformed(e.to_string()))?;
            Ok(record.into())
        } else {
            Err(malformed(format!(
                "expected keys {:?} or {:?}",
                KEYED_KEYS, NAMED_KEYS
            )))
        }
    }

    /// JSON in the shape the experiment was read or created in.
    pub fn to_value(&self) -> Result<Value, LabError> {
        let value = match (self.schema, &self.recipe) {
            (ExperimentSchema::Keyed, RecipeRef::Id(recipe_id)) => {
                let id = self
                    .id
                    .ok_or_else(|| LabError::invalid_input("experiment id", "missing"))?;
                serde_json::to_value(KeyedExperimentRecord {
                    id,
                    receta_id: *recipe_id,
                    personas_responsables: self.responsible_people.clone(),
                    fecha: self.date.clone(),
                    costo_asociado: self.associated_cost,
                    resultado: self.result.clone(),
                    nombre: self.name.clone(),
                    factor_perdida: self.loss_factor,
                    perdidas: self.losses.clone(),
                    costo_real: self.realized_cost,
                    politica: self.policy.clone(),
                })?
            }
            (ExperimentSchema::Named, RecipeRef::Name(recipe_name)) => {
                let name = self
                    .name
                    .clone()
                    .ok_or_else(|| LabError::invalid_input("experiment name", "missing"))?;
                serde_json::to_value(NamedExperimentRecord {
                    nombre: name,
                    receta: recipe_name.clone(),
                    responsables: self.responsible_people.clone(),
                    fecha: self.date.clone(),
                    costo: self.associated_cost,
                    resultado: self.result.clone(),
                    id: self.id,
                    factor_perdida: self.loss_factor,
                    perdidas: self.losses.clone(),
                    costo_real: self.realized_cost,
                    politica: self.policy.clone(),
                })?
            }
            (schema, recipe) => {
                return Err(LabError::invalid_input(
                    format!("recipe reference for {:?} experiment", schema),
                    recipe.to_string(),
                ));
            }
        };
        Ok(value)
    }

    /// Name if the experiment has one, otherwise `#id`.
    pub fn label(&self) -> String {
        match (&self.name, self.id) {
            (Some(name), _) => name.clone(),
            (None, Some(id)) => format!("#{}", id),
            (None, None) => "<unnamed>".to_string(),
        }
    }

    pub fn describe(&self) -> String {
        format!(
            "experiment {}: recipe {}, date: {}, responsible: {}, associated cost: ${}, result: {:?}",
            self.label(),
            self.recipe,
            self.date,
            self.responsible_people.join(", "),
            self.associated_cost,
            self.result
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_keyed_entry_round_trips_in_its_shape() {
        let value = json!({
            "id": 3,
            "receta_id": 7,
            "personas_responsables": ["Ana", "Luis"],
            "fecha": "2024-05-01",
            "costo_asociado": 12.5,
            "resultado": {"ph": 7}
        });
        let experiment = Experiment::from_value("e.json", 0, value.clone()).unwrap();
        assert_eq!(experiment.schema, ExperimentSchema::Keyed);
        assert_eq!(experiment.recipe, RecipeRef::Id(7));
        assert_eq!(experiment.id, Some(3));
        assert!(matches!(experiment.result, ExperimentResult::Structured(_)));
        assert_eq!(experiment.to_value().unwrap(), value);
    }

    #[test]
    fn test_named_entry_round_trips_in_its_shape() {
        let value = json!({
            "nombre": "acid test",
            "receta": "titration",
            "responsables": ["Ana"],
            "fecha": "2024-05-02",
            "costo": 4.0,
            "resultado": "clear solution"
        });
        let experiment = Experiment::from_value("e.json", 0, value.clone()).unwrap();
        assert_eq!(experiment.schema, ExperimentSchema::Named);
        assert_eq!(experiment.recipe, RecipeRef::Name("titration".to_string()));
        assert_eq!(experiment.label(), "acid test");
        assert_eq!(experiment.result, ExperimentResult::text("clear solution"));
        assert_eq!(experiment.to_value().unwrap(), value);
    }

    #[test]
    fn test_execution_fields_are_persisted() {
        let mut experiment = Experiment::keyed(1, 2, vec!["Ana".to_string()], "2024-01-01", 10.0);
        experiment.loss_factor = Some(3.5);
        experiment.realized_cost = Some(13.5);
        experiment.policy = Some("percentage-loss".to_string());
        experiment.losses = Some(vec![3.5, 3.5]);
        let value = experiment.to_value().unwrap();
        assert_eq!(value["factor_perdida"], 3.5);
        assert_eq!(value["perdidas"], json!([3.5, 3.5]));
        assert_eq!(value["costo_real"], 13.5);
        let back = Experiment::from_value("e.json", 0, value).unwrap();
        assert_eq!(back, experiment);
    }

    #[test]
    fn test_keys_are_written_in_record_order() {
        let mut named = Experiment::named("acid test", "titration", vec!["Ana".to_string()], "2024-05-02", 4.0);
        named.loss_factor = Some(0.2);
        named.losses = Some(vec![0.1, 0.2]);
        named.realized_cost = Some(4.0);
        named.policy = Some("fraction-loss".to_string());
        let value = named.to_value().unwrap();
        let keys: Vec<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec![
                "nombre",
                "receta",
                "responsables",
                "fecha",
                "costo",
                "resultado",
                "factor_perdida",
                "perdidas",
                "costo_real",
                "politica"
            ]
        );
        let text = serde_json::to_string(&value).unwrap();
        assert!(text.starts_with(r#"{"nombre":"acid test","receta":"titration""#));

        let keyed = Experiment::keyed(3, 7, Vec::new(), "2024-05-01", 1.0).to_value().unwrap();
        let keys: Vec<&str> = keyed.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec!["id", "receta_id", "personas_responsables", "fecha", "costo_asociado", "resultado"]
        );
    }

    #[test]
    fn test_entry_with_neither_shape_is_malformed() {
        let value = json!({"id": 1, "receta": "x", "fecha": "2024-01-01"});
        let err = Experiment::from_value("e.json", 4, value).unwrap_err();
        assert!(matches!(err, LabError::MalformedData { .. }));
        assert!(err.to_string().contains("entry 4"));
    }

    #[test]
    fn test_mismatched_reference_cannot_be_written() {
        let mut experiment = Experiment::keyed(1, 2, Vec::new(), "2024-01-01", 0.0);
        experiment.recipe = RecipeRef::Name("titration".to_string());
        assert!(experiment.to_value().is_err());
    }

    #[test]
    fn test_label() {
        let experiment = Experiment::keyed(9, 2, Vec::new(), "2024-01-01", 0.0);
        assert_eq!(experiment.label(), "#9");
    }
}
