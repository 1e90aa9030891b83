//! # Inventory store
//!
//! Owns every [`Reagent`] of the laboratory. Other components refer to a
//! reagent by its name only and go through the store for reads and debits.
//!
//! Debits follow one of two contracts chosen at construction:
//! - parity (default): a debit on an existing reagent always succeeds, even
//!   when it drives the stock below zero. The returned [`DebitRecord`] flags it
//!   and a warning is logged.
//! - strict: a debit larger than the available stock fails with
//!   [`LabError::InsufficientStock`] and nothing changes.
use crate::Inventory::reagent::{REAGENT_KEYS, Reagent};
use crate::Utils::load_from_file::{LoadData, require_keys};
use crate::lab_error::LabError;
use log::{info, warn};

/// what a single debit did to one reagent
#[derive(Debug, Clone, PartialEq)]
pub struct DebitRecord {
    pub reagent: String,
    pub amount: f64,
    pub remaining: f64,
    pub below_minimum: bool,
    pub went_negative: bool,
}

/// Partial edit of a reagent; `None` keeps the current value.
#[derive(Debug, Clone, Default)]
pub struct ReagentUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub cost_per_unit: Option<f64>,
    pub category: Option<String>,
    pub available_quantity: Option<f64>,
    pub unit: Option<String>,
    pub expiry_date: Option<String>,
    pub minimum_threshold: Option<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct InventoryStore {
    reagents: Vec<Reagent>,
    last_id: u64,
    strict_stock: bool,
}

impl InventoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_reagents(reagents: Vec<Reagent>) -> Self {
        let last_id = reagents.iter().map(|r| r.id).max().unwrap_or(0);
        Self {
            reagents,
            last_id,
            strict_stock: false,
        }
    }

    pub fn with_strict_stock(mut self, strict_stock: bool) -> Self {
        self.strict_stock = strict_stock;
        self
    }

    pub fn strict_stock(&self) -> bool {
        self.strict_stock
    }

    /// Reads `reactivos.json`. A missing file gives an empty store; an entry
    /// without every required key makes the whole file malformed.
    pub fn load(file_name: &str) -> Result<Self, LabError> {
        let entries = LoadData::new(file_name).load_array()?;
        let mut reagents = Vec::with_capacity(entries.len());
        for (i, entry) in entries.into_iter().enumerate() {
            require_keys(file_name, i, &entry, &REAGENT_KEYS)?;
            let reagent: Reagent = serde_json::from_value(entry)
                .map_err(|e| LabError::malformed(file_name, format!("entry {}: {}", i, e)))?;
            reagents.push(reagent);
        }
        info!("{} reagents loaded", reagents.len());
        Ok(Self::from_reagents(reagents))
    }

    /// Replaces the contents with a fresh read of `file_name`, keeping the
    /// stock contract.
    pub fn reload(&mut self, file_name: &str) -> Result<(), LabError> {
        let strict_stock = self.strict_stock;
        *self = Self::load(file_name)?.with_strict_stock(strict_stock);
        Ok(())
    }

    pub fn save(&self, file_name: &str, atomic: bool) -> Result<(), LabError> {
        LoadData::new(file_name).save(&self.reagents, atomic)
    }

    pub fn reagents(&self) -> &[Reagent] {
        &self.reagents
    }

    pub fn len(&self) -> usize {
        self.reagents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reagents.is_empty()
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Reagent> {
        self.reagents.iter().find(|r| r.name == name)
    }

    pub fn find_by_id(&self, id: u64) -> Option<&Reagent> {
        self.reagents.iter().find(|r| r.id == id)
    }

    fn find_by_name_mut(&mut self, name: &str) -> Result<&mut Reagent, LabError> {
        self.reagents
            .iter_mut()
            .find(|r| r.name == name)
            .ok_or_else(|| LabError::not_found("reagent", name))
    }

    pub fn is_below_minimum(reagent: &Reagent) -> bool {
        reagent.is_below_minimum()
    }

    /// Registers a new reagent under the next free id and returns that id.
    pub fn add(&mut self, mut reagent: Reagent) -> Result<u64, LabError> {
        if self.find_by_name(&reagent.name).is_some() {
            return Err(LabError::invalid_input("reagent name (already registered)", reagent.name));
        }
        self.last_id += 1;
        reagent.id = self.last_id;
        warn_if_low(&reagent);
        self.reagents.push(reagent);
        Ok(self.last_id)
    }

    pub fn modify(&mut self, name: &str, update: ReagentUpdate) -> Result<&Reagent, LabError> {
        if let Some(new_name) = &update.name {
            if new_name != name && self.find_by_name(new_name).is_some() {
                return Err(LabError::invalid_input(
                    "reagent name (already registered)",
                    new_name.clone(),
                ));
            }
        }
        let reagent = self.find_by_name_mut(name)?;
        if let Some(v) = update.name {
            reagent.name = v;
        }
        if let Some(v) = update.description {
            reagent.description = v;
        }
        if let Some(v) = update.cost_per_unit {
            reagent.cost_per_unit = v;
        }
        if let Some(v) = update.category {
            reagent.category = v;
        }
        if let Some(v) = update.available_quantity {
            reagent.available_quantity = v;
        }
        if let Some(v) = update.unit {
            reagent.unit = v;
        }
        if let Some(v) = update.expiry_date {
            reagent.expiry_date = v;
        }
        if let Some(v) = update.minimum_threshold {
            reagent.minimum_threshold = v;
        }
        warn_if_low(reagent);
        Ok(reagent)
    }

    pub fn remove(&mut self, name: &str) -> Result<Reagent, LabError> {
        let index = self
            .reagents
            .iter()
            .position(|r| r.name == name)
            .ok_or_else(|| LabError::not_found("reagent", name))?;
        Ok(self.reagents.remove(index))
    }

    pub fn change_unit(&mut self, name: &str, new_unit: &str) -> Result<f64, LabError> {
        let reagent = self.find_by_name_mut(name)?;
        let factor = reagent.change_unit(new_unit)?;
        info!("{} now measured in {}", name, new_unit);
        Ok(factor)
    }

    /// Non-mutating check that `quantity` of `name` is on hand.
    pub fn check_availability(&self, name: &str, quantity: f64) -> Result<(), LabError> {
        let reagent = self
            .find_by_name(name)
            .ok_or_else(|| LabError::not_found("reagent", name))?;
        if reagent.available_quantity < quantity {
            return Err(LabError::InsufficientStock {
                reagent: name.to_string(),
                available: reagent.available_quantity,
                required: quantity,
            });
        }
        Ok(())
    }

    pub fn debit(&mut self, name: &str, quantity: f64) -> Result<DebitRecord, LabError> {
        let strict_stock = self.strict_stock;
        let reagent = self.find_by_name_mut(name)?;
        let remaining = reagent.available_quantity - quantity;
        if strict_stock && remaining < 0.0 {
            return Err(LabError::InsufficientStock {
                reagent: name.to_string(),
                available: reagent.available_quantity,
                required: quantity,
            });
        }
        reagent.available_quantity = remaining;
        let went_negative = remaining < 0.0;
        if went_negative {
            warn!("debit left reagent '{}' with negative stock ({})", name, remaining);
        }
        warn_if_low(reagent);
        Ok(DebitRecord {
            reagent: name.to_string(),
            amount: quantity,
            remaining,
            below_minimum: reagent.is_below_minimum(),
            went_negative,
        })
    }

    /// Reagents at or below their suggested minimum.
    pub fn low_stock(&self) -> Vec<&Reagent> {
        self.reagents.iter().filter(|r| r.is_below_minimum()).collect()
    }
}

fn warn_if_low(reagent: &Reagent) {
    if reagent.is_below_minimum() {
        warn!(
            "reagent {} reached its suggested minimum ({} {} left, minimum {})",
            reagent.name, reagent.available_quantity, reagent.unit, reagent.minimum_threshold
        );
    }
}
