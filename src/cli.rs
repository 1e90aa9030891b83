pub mod cli_experiments;
pub mod cli_main;
pub mod cli_reagents;
pub mod cli_results;
pub mod cli_settings;
pub mod input;
