/// canonical experiment record and the two on-disk schemas
pub mod experiment;
/// registered experiments, persisted in experimentos.json
pub mod experiment_registry;
/// execution engine and its two loss policies
pub mod execution;
