use crate::lab_error::LabError;
use serde::{Deserialize, Serialize};

/// Keys every entry of `reactivos.json` must carry.
pub const REAGENT_KEYS: [&str; 10] = [
    "id",
    "nombre",
    "descripcion",
    "costo",
    "categoria",
    "inventario_disponible",
    "unidad_medida",
    "fecha_caducidad",
    "minimo_sugerido",
    "conversiones_posibles",
];

/// quantity in `unit` = quantity in the reagent's current unit * `factor`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitConversion {
    #[serde(rename = "unidad")]
    pub unit: String,
    pub factor: f64,
}

impl UnitConversion {
    pub fn new(unit: &str, factor: f64) -> Self {
        Self {
            unit: unit.to_string(),
            factor,
        }
    }
}

/// Conversions offered to a newly registered reagent, by unit family.
pub fn default_conversions(unit: &str) -> Vec<UnitConversion> {
    match unit {
        "mL" | "L" | "uL" => vec![UnitConversion::new("L", 0.001), UnitConversion::new("uL", 1000.0)],
        "g" | "kg" | "mg" => vec![UnitConversion::new("kg", 0.001), UnitConversion::new("mg", 1000.0)],
        _ => Vec::new(),
    }
}

/// chemical inventory item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reagent {
    pub id: u64,
    #[serde(rename = "nombre")]
    pub name: String,
    #[serde(rename = "descripcion")]
    pub description: String,
    #[serde(rename = "costo")]
    pub cost_per_unit: f64,
    #[serde(rename = "categoria")]
    pub category: String,
    #[serde(rename = "inventario_disponible")]
    pub available_quantity: f64,
    #[serde(rename = "unidad_medida")]
    pub unit: String,
    #[serde(rename = "fecha_caducidad")]
    pub expiry_date: String,
    #[serde(rename = "minimo_sugerido")]
    pub minimum_threshold: f64,
    #[serde(rename = "conversiones_posibles")]
    pub unit_conversions: Vec<UnitConversion>,
}

impl Reagent {
    /// New record with the default conversion table for `unit`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: u64,
        name: &str,
        description: &str,
        cost_per_unit: f64,
        category: &str,
        available_quantity: f64,
        unit: &str,
        expiry_date: &str,
        minimum_threshold: f64,
    ) -> Self {
        Self {
            id,
            name: name.to_string(),
            description: description.to_string(),
            cost_per_unit,
            category: category.to_string(),
            available_quantity,
            unit: unit.to_string(),
            expiry_date: expiry_date.to_string(),
            minimum_threshold,
            unit_conversions: default_conversions(unit),
        }
    }

    /// stock at or below the suggested minimum
    pub fn is_below_minimum(&self) -> bool {
        self.available_quantity <= self.minimum_threshold
    }

    pub fn conversion_to(&self, unit: &str) -> Option<&UnitConversion> {
        self.unit_conversions.iter().find(|c| c.unit == unit)
    }

    /// Rescales the stock into `new_unit` and returns the applied factor.
    ///
    /// The conversion table is rebased onto the new unit: every remaining
    /// factor is divided by the applied one and the way back to the old unit
    /// is added, so converting back restores the original quantity.
    pub fn change_unit(&mut self, new_unit: &str) -> Result<f64, LabError> {
        if new_unit == self.unit {
            return Ok(1.0);
        }
        let factor = match self.conversion_to(new_unit) {
            Some(conversion) if conversion.factor != 0.0 => conversion.factor,
            _ => {
                return Err(LabError::UnsupportedConversion {
                    reagent: self.name.clone(),
                    from: self.unit.clone(),
                    to: new_unit.to_string(),
                });
            }
        };

        let old_unit = std::mem::replace(&mut self.unit, new_unit.to_string());
        self.available_quantity *= factor;

        let mut rebased: Vec<UnitConversion> = self
            .unit_conversions
            .iter()
            .filter(|c| c.unit != new_unit)
            .map(|c| UnitConversion::new(&c.unit, c.factor / factor))
            .collect();
        rebased.push(UnitConversion::new(&old_unit, 1.0 / factor));
        self.unit_conversions = rebased;
        Ok(factor)
    }

    pub fn describe(&self) -> String {
        format!(
            "name: {}, description: {}, available: {} {}, cost: ${}, expiry date: {}, suggested minimum: {}",
            self.name,
            self.description,
            self.available_quantity,
            self.unit,
            self.cost_per_unit,
            self.expiry_date,
            self.minimum_threshold
        )
    }
}
