//! # Experiment execution
//!
//! ## Aim
//! Runs one experiment against the current inventory: validate availability,
//! draw a simulated loss, debit every required reagent and compute the cost.
//!
//! ## Policies
//! Two loss conventions exist and give different numbers for the same recipe,
//! so they are kept apart as two implementations of [`ExecutionPolicy`]:
//!
//! | policy | validation | loss L | debit per reagent | realized cost |
//! |--------|------------|--------|-------------------|---------------|
//! | [`PercentageLossPolicy`] | recipe check, nominal quantity | one draw in [0.1, 22.5] (%) | `q + q * L / 100` | `base + L` |
//! | [`FractionLossPolicy`] | store availability check per reagent | one draw per reagent in [0.001, 0.225] | `q + q * L` | `base` |
//!
//! `base + L` adds a percentage to a money amount. That is the historical
//! formula and existing records were computed with it, so it stays.
//!
//! ## Validation boundary
//! Validation runs before the first debit and is the only gate: the loss is
//! not part of it, so a successful run may leave stock negative. With
//! reconciled execution enabled (or a strict-stock inventory) the full
//! nominal-plus-loss amount is checked before the first debit instead.
use crate::Inventory::inventory_store::{DebitRecord, InventoryStore};
use crate::Recipes::recipe::Recipe;
use crate::lab_error::LabError;
use enum_dispatch::enum_dispatch;
use log::{debug, info};
use rand::{Rng, RngCore};
use std::collections::BTreeMap;
use std::ops::RangeInclusive;

pub const PERCENTAGE_LOSS_RANGE: RangeInclusive<f64> = 0.1..=22.5;
pub const FRACTION_LOSS_RANGE: RangeInclusive<f64> = 0.001..=0.225;

/// Losses drawn for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct LossDraw {
    /// one entry per required reagent, in recipe order
    pub per_reagent: Vec<f64>,
    /// the value recorded on the experiment
    pub headline: f64,
}

#[enum_dispatch]
pub trait ExecutionPolicy {
    fn name(&self) -> &'static str;
    fn loss_range(&self) -> RangeInclusive<f64>;
    /// Non-mutating gate run before anything is debited.
    fn validate(&self, recipe: &Recipe, store: &InventoryStore) -> Result<(), LabError>;
    fn draw_losses(&self, reagent_count: usize, rng: &mut dyn RngCore) -> LossDraw;
    fn debit_amount(&self, quantity: f64, loss: f64) -> f64;
    fn realized_cost(&self, base_cost: f64, losses: &LossDraw) -> f64;
    fn success_message(&self, realized_cost: f64) -> String;
    /// whether the experiment result is reset to pending after a run
    fn leaves_result_pending(&self) -> bool;
}

/// Loss as a percentage, validated by the recipe itself.
#[derive(Debug, Clone, Default)]
pub struct PercentageLossPolicy;

impl ExecutionPolicy for PercentageLossPolicy {
    fn name(&self) -> &'static str {
        "percentage-loss"
    }

    fn loss_range(&self) -> RangeInclusive<f64> {
        PERCENTAGE_LOSS_RANGE
    }

    fn validate(&self, recipe: &Recipe, store: &InventoryStore) -> Result<(), LabError> {
        recipe.verify_available(store)
    }

    fn draw_losses(&self, reagent_count: usize, rng: &mut dyn RngCore) -> LossDraw {
        let loss = rng.gen_range(self.loss_range());
        LossDraw {
            per_reagent: vec![loss; reagent_count],
            headline: loss,
        }
    }

    fn debit_amount(&self, quantity: f64, loss: f64) -> f64 {
        quantity + quantity * loss / 100.0
    }

    fn realized_cost(&self, base_cost: f64, losses: &LossDraw) -> f64 {
        // raw percentage added to money, kept for parity with stored costs
        base_cost + losses.headline
    }

    fn success_message(&self, realized_cost: f64) -> String {
        format!("experiment completed successfully. Cost: ${}", realized_cost)
    }

    fn leaves_result_pending(&self) -> bool {
        false
    }
}

/// Loss as a fraction drawn per reagent, validated through the store.
#[derive(Debug, Clone, Default)]
pub struct FractionLossPolicy;

impl ExecutionPolicy for FractionLossPolicy {
    fn name(&self) -> &'static str {
        "fraction-loss"
    }

    fn loss_range(&self) -> RangeInclusive<f64> {
        FRACTION_LOSS_RANGE
    }

    fn validate(&self, recipe: &Recipe, store: &InventoryStore) -> Result<(), LabError> {
        for required in &recipe.required_reagents {
            store.check_availability(&required.name, required.quantity)?;
        }
        Ok(())
    }

    fn draw_losses(&self, reagent_count: usize, rng: &mut dyn RngCore) -> LossDraw {
        let per_reagent: Vec<f64> = (0..reagent_count)
            .map(|_| rng.gen_range(self.loss_range()))
            .collect();
        let headline = per_reagent.iter().cloned().fold(0.0, f64::max);
        LossDraw {
            per_reagent,
            headline,
        }
    }

    fn debit_amount(&self, quantity: f64, loss: f64) -> f64 {
        quantity + quantity * loss
    }

    fn realized_cost(&self, base_cost: f64, _losses: &LossDraw) -> f64 {
        base_cost
    }

    fn success_message(&self, _realized_cost: f64) -> String {
        "experiment executed, result pending".to_string()
    }

    fn leaves_result_pending(&self) -> bool {
        true
    }
}

#[derive(Clone, Debug)]
#[enum_dispatch(ExecutionPolicy)]
pub enum ExecutionPolicyEnum {
    PercentageLoss(PercentageLossPolicy),
    FractionLoss(FractionLossPolicy),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyKind {
    PercentageLoss,
    FractionLoss,
}

pub fn create_policy(kind: PolicyKind) -> ExecutionPolicyEnum {
    match kind {
        PolicyKind::PercentageLoss => ExecutionPolicyEnum::PercentageLoss(PercentageLossPolicy),
        PolicyKind::FractionLoss => ExecutionPolicyEnum::FractionLoss(FractionLossPolicy),
    }
}

impl PolicyKind {
    /// Accepts the short letters used in the lab notes and the policy names.
    pub fn by_name(name: &str) -> Result<Self, LabError> {
        match name.trim().to_lowercase().as_str() {
            "a" | "percentage" | "percentage-loss" => Ok(PolicyKind::PercentageLoss),
            "b" | "fraction" | "fraction-loss" => Ok(PolicyKind::FractionLoss),
            _ => Err(LabError::invalid_input("execution policy", name)),
        }
    }
}

pub fn create_policy_by_name(name: &str) -> Result<ExecutionPolicyEnum, LabError> {
    PolicyKind::by_name(name).map(create_policy)
}

/// what one run did to one required reagent
#[derive(Debug, Clone, PartialEq)]
pub struct ReagentConsumption {
    pub nominal: f64,
    pub loss_factor: f64,
    pub debit: DebitRecord,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionOutcome {
    pub policy: &'static str,
    pub loss_factor: f64,
    pub consumptions: Vec<ReagentConsumption>,
    pub realized_cost: f64,
    pub message: String,
    pub result_pending: bool,
}

impl ExecutionOutcome {
    /// true if any debit left a reagent below zero
    pub fn drove_stock_negative(&self) -> bool {
        self.consumptions.iter().any(|c| c.debit.went_negative)
    }

    pub fn below_minimum(&self) -> Vec<&str> {
        self.consumptions
            .iter()
            .filter(|c| c.debit.below_minimum)
            .map(|c| c.debit.reagent.as_str())
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct ExecutionEngine {
    policy: ExecutionPolicyEnum,
    reconciled: bool,
}

impl ExecutionEngine {
    pub fn new(policy: ExecutionPolicyEnum) -> Self {
        Self {
            policy,
            reconciled: false,
        }
    }

    pub fn with_reconciled(mut self, reconciled: bool) -> Self {
        self.reconciled = reconciled;
        self
    }

    pub fn policy(&self) -> &ExecutionPolicyEnum {
        &self.policy
    }

    /// Total nominal-plus-loss demand per reagent, checked before any debit.
    fn check_total_demand(
        &self,
        recipe: &Recipe,
        losses: &LossDraw,
        store: &InventoryStore,
    ) -> Result<(), LabError> {
        let mut demand: BTreeMap<&str, f64> = BTreeMap::new();
        for (required, loss) in recipe.required_reagents.iter().zip(&losses.per_reagent) {
            *demand.entry(required.name.as_str()).or_insert(0.0) +=
                self.policy.debit_amount(required.quantity, *loss);
        }
        for required in &recipe.required_reagents {
            if let Some(total) = demand.remove(required.name.as_str()) {
                store.check_availability(&required.name, total)?;
            }
        }
        Ok(())
    }

    /// Executes `recipe` against `store`.
    ///
    /// On error nothing has been debited. On success every required reagent
    /// has been debited once, in recipe order.
    pub fn execute<R: RngCore>(
        &self,
        recipe: &Recipe,
        base_cost: f64,
        store: &mut InventoryStore,
        rng: &mut R,
    ) -> Result<ExecutionOutcome, LabError> {
        self.policy.validate(recipe, store)?;

        let losses = self
            .policy
            .draw_losses(recipe.required_reagents.len(), rng);
        debug!("{}: losses drawn {:?}", self.policy.name(), losses.per_reagent);

        if self.reconciled || store.strict_stock() {
            self.check_total_demand(recipe, &losses, store)?;
        }

        let mut consumptions = Vec::with_capacity(recipe.required_reagents.len());
        for (required, loss) in recipe.required_reagents.iter().zip(&losses.per_reagent) {
            let amount = self.policy.debit_amount(required.quantity, *loss);
            let debit = store.debit(&required.name, amount)?;
            info!(
                "debited {:.4} of {} (nominal {}, loss {:.4})",
                amount, required.name, required.quantity, loss
            );
            consumptions.push(ReagentConsumption {
                nominal: required.quantity,
                loss_factor: *loss,
                debit,
            });
        }

        let realized_cost = self.policy.realized_cost(base_cost, &losses);
        Ok(ExecutionOutcome {
            policy: self.policy.name(),
            loss_factor: losses.headline,
            consumptions,
            realized_cost,
            message: self.policy.success_message(realized_cost),
            result_pending: self.policy.leaves_result_pending(),
        })
    }
}
