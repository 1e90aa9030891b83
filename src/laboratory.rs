//! # Laboratory repository
//!
//! [`Laboratory`] owns every collection of the application (inventory,
//! recipes, experiments and the evaluation log) together with the
//! configuration they were loaded with. It is built once by `main` and passed
//! by reference to the menus; [`Laboratory::reload`] rereads every file.
//!
//! Every mutating operation persists the files it touched before returning.
use crate::Evaluation::evaluator::evaluate;
use crate::Evaluation::results_log::{EvaluationRecord, ResultsLog};
use crate::Experiments::execution::{ExecutionEngine, ExecutionOutcome, PolicyKind, create_policy};
use crate::Experiments::experiment::{Experiment, ExperimentResult, PENDING_RESULT};
use crate::Experiments::experiment_registry::{ExperimentKey, ExperimentRegistry};
use crate::Inventory::inventory_store::{InventoryStore, ReagentUpdate};
use crate::Inventory::reagent::Reagent;
use crate::Recipes::recipe_book::RecipeBook;
use crate::lab_error::LabError;
use crate::library_manager::LabConfig;
use crate::statistics::LabStatistics;
use log::info;
use rand::RngCore;

#[derive(Debug, Clone)]
pub struct Laboratory {
    config: LabConfig,
    inventory: InventoryStore,
    recipes: RecipeBook,
    experiments: ExperimentRegistry,
    results: ResultsLog,
}

impl Laboratory {
    /// Loads every data file named in `config`. Missing files start empty.
    pub fn open(config: LabConfig) -> Result<Self, LabError> {
        let inventory = InventoryStore::load(&config.reagents_file)?.with_strict_stock(config.strict_stock);
        let recipes = RecipeBook::load(&config.recipes_file)?;
        let experiments = ExperimentRegistry::load(&config.experiments_file)?;
        let results = ResultsLog::load(&config.results_file)?;
        info!(
            "laboratory opened: {} reagents, {} recipes, {} experiments, {} evaluations",
            inventory.len(),
            recipes.recipes().len(),
            experiments.len(),
            results.len()
        );
        Ok(Self {
            config,
            inventory,
            recipes,
            experiments,
            results,
        })
    }

    /// Rereads every file. On error the current state is kept.
    pub fn reload(&mut self) -> Result<(), LabError> {
        *self = Self::open(self.config.clone())?;
        Ok(())
    }

    /// Switches to a new configuration, loading the files it names.
    pub fn reconfigure(&mut self, config: LabConfig) -> Result<(), LabError> {
        *self = Self::open(config)?;
        Ok(())
    }

    pub fn config(&self) -> &LabConfig {
        &self.config
    }

    pub fn inventory(&self) -> &InventoryStore {
        &self.inventory
    }

    pub fn recipes(&self) -> &RecipeBook {
        &self.recipes
    }

    pub fn experiments(&self) -> &ExperimentRegistry {
        &self.experiments
    }

    pub fn results(&self) -> &ResultsLog {
        &self.results
    }

    fn save_inventory(&self) -> Result<(), LabError> {
        self.inventory
            .save(&self.config.reagents_file, self.config.atomic_writes)
    }

    fn save_experiments(&self) -> Result<(), LabError> {
        self.experiments
            .save(&self.config.experiments_file, self.config.atomic_writes)
    }

    fn save_results(&self) -> Result<(), LabError> {
        self.results
            .save(&self.config.results_file, self.config.atomic_writes)
    }

    ////////////////////////////////////REAGENTS////////////////////////////////////

    pub fn add_reagent(&mut self, reagent: Reagent) -> Result<u64, LabError> {
        let id = self.inventory.add(reagent)?;
        self.save_inventory()?;
        Ok(id)
    }

    pub fn modify_reagent(&mut self, name: &str, update: ReagentUpdate) -> Result<Reagent, LabError> {
        let modified = self.inventory.modify(name, update)?.clone();
        self.save_inventory()?;
        Ok(modified)
    }

    pub fn remove_reagent(&mut self, name: &str) -> Result<Reagent, LabError> {
        let removed = self.inventory.remove(name)?;
        self.save_inventory()?;
        Ok(removed)
    }

    pub fn change_unit(&mut self, name: &str, new_unit: &str) -> Result<f64, LabError> {
        let factor = self.inventory.change_unit(name, new_unit)?;
        self.save_inventory()?;
        Ok(factor)
    }

    pub fn low_stock(&self) -> Vec<&Reagent> {
        self.inventory.low_stock()
    }

    ////////////////////////////////////EXPERIMENTS////////////////////////////////////

    /// Registers an experiment against an existing recipe.
    ///
    /// The recipe must be feasible with the current stock (nominal amounts)
    /// and the associated cost is set to the recipe's estimate from reagent
    /// unit costs.
    ///
    /// Registration never debits the inventory and draws no loss. Stock is
    /// consumed only by [`Laboratory::execute_experiment`], so registering and
    /// then executing debits each reagent once.
    pub fn register_experiment(&mut self, mut experiment: Experiment) -> Result<Experiment, LabError> {
        let recipe = self.recipes.resolve(&experiment.recipe)?;
        recipe.verify_available(&self.inventory)?;
        experiment.associated_cost = recipe.estimated_cost(&self.inventory);
        let registered = self.experiments.add(experiment)?.clone();
        self.save_experiments()?;
        info!("experiment {} registered", registered.label());
        Ok(registered)
    }

    pub fn set_experiment_result(&mut self, key: &ExperimentKey, result: ExperimentResult) -> Result<(), LabError> {
        self.experiments.find_mut(key)?.result = result;
        self.save_experiments()
    }

    pub fn remove_experiment(&mut self, key: &ExperimentKey) -> Result<Experiment, LabError> {
        let removed = self.experiments.remove(key)?;
        self.save_experiments()?;
        Ok(removed)
    }

    /// Runs an experiment under `kind`, then persists inventory and experiments.
    ///
    /// The headline loss, the loss of every required reagent, the realized
    /// cost and the policy name are stored on the experiment, so each debit
    /// can be recomputed from the saved record. Nothing is written when
    /// execution fails.
    pub fn execute_experiment<R: RngCore>(
        &mut self,
        key: &ExperimentKey,
        kind: PolicyKind,
        rng: &mut R,
    ) -> Result<ExecutionOutcome, LabError> {
        let experiment = self.experiments.find(key)?;
        let recipe = self.recipes.resolve(&experiment.recipe)?;
        let engine = ExecutionEngine::new(create_policy(kind)).with_reconciled(self.config.reconciled_execution);
        let outcome = engine.execute(recipe, experiment.associated_cost, &mut self.inventory, rng)?;

        let experiment = self.experiments.find_mut(key)?;
        experiment.loss_factor = Some(outcome.loss_factor);
        experiment.losses = Some(outcome.consumptions.iter().map(|c| c.loss_factor).collect());
        experiment.realized_cost = Some(outcome.realized_cost);
        experiment.policy = Some(outcome.policy.to_string());
        if outcome.result_pending {
            experiment.result = ExperimentResult::text(PENDING_RESULT);
        }
        info!("experiment {} executed on {}", experiment.label(), experiment.date);

        self.save_inventory()?;
        self.save_experiments()?;
        Ok(outcome)
    }

    ////////////////////////////////////EVALUATION////////////////////////////////////

    /// Evaluates the named experiment against its recipe's expected values,
    /// appends the record to the log and persists the log.
    pub fn evaluate_experiment(&mut self, name: &str) -> Result<EvaluationRecord, LabError> {
        let experiment = self
            .experiments
            .find_by_name(name)
            .ok_or_else(|| LabError::not_found("experiment", name))?;
        let recipe = self.recipes.resolve(&experiment.recipe)?;
        let record = EvaluationRecord {
            experiment: name.to_string(),
            evaluation: evaluate(&recipe.expected_values, &experiment.result),
        };
        self.results.append(record.clone());
        self.save_results()?;
        info!("experiment {} evaluated", name);
        Ok(record)
    }

    ////////////////////////////////////STATISTICS////////////////////////////////////

    pub fn statistics(&self) -> LabStatistics {
        LabStatistics::collect(self.experiments.experiments(), &self.recipes, &self.inventory)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Evaluation::evaluator::Evaluation;
    use crate::Recipes::recipe::RecipeRef;
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use serde_json::{Value, json};
    use std::collections::BTreeMap;
    use std::fs;
    use tempfile::TempDir;

    fn write(path: &str, value: Value) {
        fs::write(path, serde_json::to_string_pretty(&value).unwrap()).unwrap();
    }

    fn reagent(id: u64, name: &str, cost: f64, quantity: f64, unit: &str, minimum: f64) -> Value {
        json!({
            "id": id, "nombre": name, "descripcion": "", "costo": cost, "categoria": "lab",
            "inventario_disponible": quantity, "unidad_medida": unit, "fecha_caducidad": "2030-01-01",
            "minimo_sugerido": minimum, "conversiones_posibles": [{"unidad": "L", "factor": 0.001}]
        })
    }

    /// a populated data directory and its configuration
    fn lab_dir() -> (TempDir, LabConfig) {
        let dir = tempfile::tempdir().unwrap();
        let config = LabConfig::in_directory(dir.path());
        write(
            &config.reagents_file,
            json!([reagent(1, "HCl", 0.5, 100.0, "mL", 20.0), reagent(2, "NaOH", 2.0, 50.0, "g", 5.0)]),
        );
        write(
            &config.recipes_file,
            json!([
                {"id": 1, "nombre": "neutralization", "objetivo": "salt", "procedimiento": "mix",
                 "reactivos": [{"nombre": "HCl", "cantidad": 90, "unidad": "mL"}],
                 "valores_esperados": {"yield": [10, 20]}},
                {"id": 2, "nombre": "titration", "objetivo": "ph", "procedimiento": "drip",
                 "reactivos": [{"nombre": "NaOH", "cantidad": 4, "unidad": "g"},
                               {"nombre": "HCl", "cantidad": 2, "unidad": "mL"}]}
            ]),
        );
        write(
            &config.experiments_file,
            json!([
                {"id": 1, "receta_id": 1, "personas_responsables": ["Ana"], "fecha": "2024-03-01",
                 "costo_asociado": 45.0, "resultado": ""},
                {"nombre": "e-yield", "receta": "neutralization", "responsables": ["Luis"],
                 "fecha": "2024-03-02", "costo": 45.0, "resultado": {"yield": 15}}
            ]),
        );
        (dir, config)
    }

    #[test]
    fn test_open_empty_directory() {
        let dir = tempfile::tempdir().unwrap();
        let lab = Laboratory::open(LabConfig::in_directory(dir.path())).unwrap();
        assert!(lab.inventory().is_empty());
        assert!(lab.recipes().is_empty());
        assert!(lab.experiments().is_empty());
        assert!(lab.results().is_empty());
    }

    #[test]
    fn test_open_rejects_malformed_results() {
        let (_dir, config) = lab_dir();
        write(&config.results_file, json!([{"experimento": "e1"}]));
        assert!(matches!(
            Laboratory::open(config),
            Err(LabError::MalformedData { .. })
        ));
    }

    #[test]
    fn test_execute_percentage_policy_persists_everything() {
        let (_dir, config) = lab_dir();
        let mut lab = Laboratory::open(config.clone()).unwrap();
        let mut rng = StdRng::seed_from_u64(21);
        let outcome = lab
            .execute_experiment(&ExperimentKey::Id(1), PolicyKind::PercentageLoss, &mut rng)
            .unwrap();
        assert_relative_eq!(outcome.realized_cost, 45.0 + outcome.loss_factor);
        assert_eq!(outcome.below_minimum(), vec!["HCl"]);

        let reopened = Laboratory::open(config).unwrap();
        let hcl = reopened.inventory().find_by_name("HCl").unwrap();
        assert_relative_eq!(
            hcl.available_quantity,
            100.0 - (90.0 + 90.0 * outcome.loss_factor / 100.0),
            epsilon = 1e-9
        );
        let experiment = reopened.experiments().find_by_id(1).unwrap();
        assert_relative_eq!(experiment.loss_factor.unwrap(), outcome.loss_factor, epsilon = 1e-12);
        assert_relative_eq!(experiment.realized_cost.unwrap(), outcome.realized_cost, epsilon = 1e-12);
        assert_eq!(experiment.policy.as_deref(), Some("percentage-loss"));
        assert_eq!(experiment.result, ExperimentResult::text(""));
    }

    #[test]
    fn test_execute_fraction_policy_marks_result_pending() {
        let (_dir, config) = lab_dir();
        let mut lab = Laboratory::open(config).unwrap();
        let key = ExperimentKey::Name("e-yield".to_string());
        let outcome = lab
            .execute_experiment(&key, PolicyKind::FractionLoss, &mut StdRng::seed_from_u64(4))
            .unwrap();
        assert_relative_eq!(outcome.realized_cost, 45.0);
        let experiment = lab.experiments().find(&key).unwrap();
        assert_eq!(experiment.result, ExperimentResult::text(PENDING_RESULT));
        assert_eq!(experiment.policy.as_deref(), Some("fraction-loss"));
    }

    #[test]
    fn test_fraction_policy_persists_every_reagent_loss() {
        let (_dir, config) = lab_dir();
        let mut lab = Laboratory::open(config.clone()).unwrap();
        let draft = Experiment::named("t1", "titration", vec!["Ana".to_string()], "2024-04-01", 0.0);
        lab.register_experiment(draft).unwrap();
        let key = ExperimentKey::Name("t1".to_string());
        let outcome = lab
            .execute_experiment(&key, PolicyKind::FractionLoss, &mut StdRng::seed_from_u64(4))
            .unwrap();

        let reopened = Laboratory::open(config).unwrap();
        let experiment = reopened.experiments().find(&key).unwrap();
        let losses = experiment.losses.clone().unwrap();
        assert_eq!(losses.len(), 2);
        for (saved, consumption) in losses.iter().zip(&outcome.consumptions) {
            assert_relative_eq!(*saved, consumption.loss_factor, epsilon = 1e-12);
        }
        assert_relative_eq!(
            experiment.loss_factor.unwrap(),
            losses.iter().cloned().fold(0.0, f64::max),
            epsilon = 1e-12
        );

        // titration takes 4 g NaOH then 2 mL HCl
        let naoh = reopened.inventory().find_by_name("NaOH").unwrap();
        assert_relative_eq!(naoh.available_quantity, 50.0 - (4.0 + 4.0 * losses[0]), epsilon = 1e-9);
        let hcl = reopened.inventory().find_by_name("HCl").unwrap();
        assert_relative_eq!(hcl.available_quantity, 100.0 - (2.0 + 2.0 * losses[1]), epsilon = 1e-9);
    }

    #[test]
    fn test_failed_execution_writes_nothing() {
        let (_dir, config) = lab_dir();
        let mut lab = Laboratory::open(config.clone()).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        lab.execute_experiment(&ExperimentKey::Id(1), PolicyKind::PercentageLoss, &mut rng)
            .unwrap();
        // 90 mL needed, less than that left
        let before = fs::read_to_string(&config.reagents_file).unwrap();
        let err = lab
            .execute_experiment(&ExperimentKey::Id(1), PolicyKind::PercentageLoss, &mut rng)
            .unwrap_err();
        assert!(matches!(err, LabError::InsufficientStock { .. }));
        assert_eq!(fs::read_to_string(&config.reagents_file).unwrap(), before);

        assert!(matches!(
            lab.execute_experiment(&ExperimentKey::Id(9), PolicyKind::FractionLoss, &mut rng),
            Err(LabError::NotFound { .. })
        ));
    }

    #[test]
    fn test_reconciled_configuration_blocks_negative_stock() {
        let (_dir, mut config) = lab_dir();
        config.reconciled_execution = true;
        write(
            &config.reagents_file,
            json!([reagent(1, "HCl", 0.5, 90.0, "mL", 20.0)]),
        );
        let mut lab = Laboratory::open(config).unwrap();
        let err = lab
            .execute_experiment(&ExperimentKey::Id(1), PolicyKind::PercentageLoss, &mut StdRng::seed_from_u64(3))
            .unwrap_err();
        assert!(matches!(err, LabError::InsufficientStock { .. }));
        assert_relative_eq!(lab.inventory().find_by_name("HCl").unwrap().available_quantity, 90.0);
    }

    #[test]
    fn test_register_experiment_estimates_cost() {
        let (_dir, config) = lab_dir();
        let mut lab = Laboratory::open(config.clone()).unwrap();
        let draft = Experiment::named("t1", "titration", vec!["Ana".to_string()], "2024-04-01", 0.0);
        let registered = lab.register_experiment(draft).unwrap();
        // 4 g NaOH at 2.0 plus 2 mL HCl at 0.5
        assert_relative_eq!(registered.associated_cost, 9.0);
        assert_relative_eq!(lab.inventory().find_by_name("NaOH").unwrap().available_quantity, 50.0);

        let keyed = Experiment {
            id: None,
            ..Experiment::keyed(0, 2, Vec::new(), "2024-04-02", 0.0)
        };
        assert_eq!(lab.register_experiment(keyed).unwrap().id, Some(2));

        let reopened = Laboratory::open(config).unwrap();
        assert_eq!(reopened.experiments().len(), 4);

        let unknown = Experiment::named("t2", "sublimation", Vec::new(), "2024-04-01", 0.0);
        assert!(matches!(
            lab.register_experiment(unknown),
            Err(LabError::NotFound { .. })
        ));
    }

    #[test]
    fn test_register_experiment_checks_stock() {
        let (_dir, config) = lab_dir();
        let mut lab = Laboratory::open(config).unwrap();
        lab.modify_reagent(
            "NaOH",
            ReagentUpdate {
                available_quantity: Some(1.0),
                ..ReagentUpdate::default()
            },
        )
        .unwrap();
        let draft = Experiment::named("t1", "titration", Vec::new(), "2024-04-01", 0.0);
        assert!(matches!(
            lab.register_experiment(draft),
            Err(LabError::InsufficientStock { .. })
        ));
        assert_eq!(lab.experiments().len(), 2);
    }

    #[test]
    fn test_evaluate_experiment_appends_record() {
        let (_dir, config) = lab_dir();
        let mut lab = Laboratory::open(config.clone()).unwrap();
        let record = lab.evaluate_experiment("e-yield").unwrap();
        assert_eq!(
            record.evaluation,
            Evaluation::Parameters(BTreeMap::from([("yield".to_string(), true)]))
        );

        lab.set_experiment_result(
            &ExperimentKey::Name("e-yield".to_string()),
            ExperimentResult::Structured(BTreeMap::from([("yield".to_string(), json!(5))])),
        )
        .unwrap();
        let record = lab.evaluate_experiment("e-yield").unwrap();
        assert_eq!(
            record.evaluation,
            Evaluation::Parameters(BTreeMap::from([("yield".to_string(), false)]))
        );

        let reopened = Laboratory::open(config).unwrap();
        assert_eq!(reopened.results().for_experiment("e-yield").len(), 2);
        assert!(matches!(
            lab.evaluate_experiment("missing"),
            Err(LabError::NotFound { .. })
        ));
    }

    #[test]
    fn test_reagent_operations_persist() {
        let (_dir, config) = lab_dir();
        let mut lab = Laboratory::open(config.clone()).unwrap();
        let id = lab
            .add_reagent(Reagent::new(0, "KCl", "", 1.0, "salt", 30.0, "g", "2029-01-01", 5.0))
            .unwrap();
        assert_eq!(id, 3);
        lab.change_unit("HCl", "L").unwrap();
        lab.remove_reagent("NaOH").unwrap();
        assert!(lab.change_unit("KCl", "mL").is_err());

        lab.reload().unwrap();
        assert_eq!(lab.inventory().len(), 2);
        let hcl = lab.inventory().find_by_name("HCl").unwrap();
        assert_eq!(hcl.unit, "L");
        assert_relative_eq!(hcl.available_quantity, 0.1, epsilon = 1e-12);
    }

    #[test]
    fn test_remove_experiment_and_statistics() {
        let (_dir, config) = lab_dir();
        let mut lab = Laboratory::open(config).unwrap();
        let stats = lab.statistics();
        assert_eq!(stats.most_active_researcher, Some("Ana".to_string()));
        assert_eq!(
            stats.most_frequent_recipe,
            Some(("neutralization".to_string(), RecipeRef::Id(1)))
        );

        lab.remove_experiment(&ExperimentKey::Id(1)).unwrap();
        assert_eq!(lab.statistics().most_active_researcher, Some("Luis".to_string()));
        assert!(lab.remove_experiment(&ExperimentKey::Id(1)).is_err());
    }

    #[test]
    fn test_strict_stock_configuration_reaches_inventory() {
        let (_dir, mut config) = lab_dir();
        config.strict_stock = true;
        let lab = Laboratory::open(config.clone()).unwrap();
        assert!(lab.inventory().strict_stock());

        let mut lab = lab;
        config.strict_stock = false;
        lab.reconfigure(config).unwrap();
        assert!(!lab.inventory().strict_stock());
    }
}
