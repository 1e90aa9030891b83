use crate::Inventory::inventory_store::InventoryStore;
use crate::lab_error::LabError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Keys every entry of `recetas.json` must carry.
pub const RECIPE_KEYS: [&str; 5] = ["id", "nombre", "objetivo", "reactivos", "procedimiento"];

/// one line of a recipe: which reagent and how much of it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequiredReagent {
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "cantidad")]
    pub quantity: f64,
    #[serde(rename = "unidad", default)]
    pub unit: String,
}

impl RequiredReagent {
    pub fn new(name: &str, quantity: f64, unit: &str) -> Self {
        Self {
            name: name.to_string(),
            quantity,
            unit: unit.to_string(),
        }
    }
}

/// usage entry consulted by the statistics report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReagentUsage {
    #[serde(rename = "reactivo_id", default, skip_serializing_if = "Option::is_none")]
    pub reagent_id: Option<u64>,
}

/// How an experiment points at its recipe: by id in the keyed schema,
/// by name in the named schema.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RecipeRef {
    Id(u64),
    Name(String),
}

impl fmt::Display for RecipeRef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RecipeRef::Id(id) => write!(f, "id {}", id),
            RecipeRef::Name(name) => write!(f, "'{}'", name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub id: u64,
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "objetivo")]
    pub objective: String,
    #[serde(rename = "reactivos")]
    pub required_reagents: Vec<RequiredReagent>,
    #[serde(rename = "procedimiento")]
    pub procedure: String,
    /// parameter -> acceptable values
    #[serde(rename = "valores_esperados", default)]
    pub expected_values: BTreeMap<String, Vec<Value>>,
    #[serde(rename = "reactivos_utilizados", default, skip_serializing_if = "Option::is_none")]
    pub reagents_used: Option<Vec<ReagentUsage>>,
}

impl Recipe {
    pub fn new(id: u64, name: &str, required_reagents: Vec<RequiredReagent>) -> Self {
        Self {
            id,
            name: name.to_string(),
            objective: String::new(),
            required_reagents,
            procedure: String::new(),
            expected_values: BTreeMap::new(),
            reagents_used: None,
        }
    }

    pub fn matches(&self, recipe_ref: &RecipeRef) -> bool {
        match recipe_ref {
            RecipeRef::Id(id) => self.id == *id,
            RecipeRef::Name(name) => &self.name == name,
        }
    }

    /// Checks every required reagent against the store, nominal quantities
    /// only. Stops at the first missing or short reagent. Never mutates.
    pub fn verify_available(&self, store: &InventoryStore) -> Result<(), LabError> {
        for required in &self.required_reagents {
            let reagent = store
                .find_by_name(&required.name)
                .ok_or_else(|| LabError::not_found("reagent", &required.name))?;
            if reagent.available_quantity < required.quantity {
                return Err(LabError::InsufficientStock {
                    reagent: required.name.clone(),
                    available: reagent.available_quantity,
                    required: required.quantity,
                });
            }
        }
        Ok(())
    }

    /// Sum of cost per unit times required quantity, over reagents the store knows.
    pub fn estimated_cost(&self, store: &InventoryStore) -> f64 {
        self.required_reagents
            .iter()
            .filter_map(|required| {
                store
                    .find_by_name(&required.name)
                    .map(|reagent| reagent.cost_per_unit * required.quantity)
            })
            .sum()
    }

    pub fn describe(&self) -> String {
        let reagents: Vec<String> = self
            .required_reagents
            .iter()
            .map(|r| format!("{} - {} {}", r.name, r.quantity, r.unit))
            .collect();
        format!(
            "recipe: {}\nobjective: {}\nreagents:\n{}\nprocedure: {}\nexpected values: {:?}",
            self.name,
            self.objective,
            reagents.join("\n"),
            self.procedure,
            self.expected_values
        )
    }
}
