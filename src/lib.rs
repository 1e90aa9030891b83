#[allow(non_snake_case)]
pub mod Evaluation;
#[allow(non_snake_case)]
pub mod Experiments;
#[allow(non_snake_case)]
pub mod Inventory;
#[allow(non_snake_case)]
pub mod Recipes;
#[allow(non_snake_case)]
pub mod Utils;
pub mod cli;
pub mod lab_error;
pub mod laboratory;
pub mod library_manager;
pub mod settings;
pub mod statistics;
