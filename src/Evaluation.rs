/// comparison of experiment results against a recipe's expected values
pub mod evaluator;
/// evaluation records, persisted in resultados.json
pub mod results_log;
