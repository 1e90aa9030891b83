use super::input::{parse_date, parse_experiment_key, parse_people, parse_policy, parse_result, parse_u64, prompt};
use crate::Experiments::experiment::{Experiment, ExperimentResult};
use crate::lab_error::LabError;
use crate::laboratory::Laboratory;
use prettytable::{Table, row};

pub fn experiments_menu(lab: &mut Laboratory) {
    loop {
        println!("\n\x1b[34m=== Experiments ===\x1b[0m");
        println!("\x1b[33m1. Register experiment\x1b[0m");
        println!("\x1b[33m2. Modify experiment result\x1b[0m");
        println!("\x1b[33m3. Remove experiment\x1b[0m");
        println!("\x1b[33m4. List experiments\x1b[0m");
        println!("\x1b[33m5. Execute experiment\x1b[0m");
        println!("\x1b[33m6. List recipes\x1b[0m");
        println!("\x1b[33m0. Back\x1b[0m");

        let choice = match prompt("Choose option") {
            Ok(choice) => choice,
            Err(e) => {
                println!("\x1b[31mError: {}\x1b[0m", e);
                break;
            }
        };
        let result = match choice.as_str() {
            "1" => register_experiment(lab),
            "2" => modify_result(lab),
            "3" => remove_experiment(lab),
            "4" => {
                print_experiments(lab.experiments().experiments());
                Ok(())
            }
            "5" => execute_experiment(lab),
            "6" => {
                print_recipes(lab);
                Ok(())
            }
            "0" => break,
            _ => {
                println!("Invalid option");
                Ok(())
            }
        };
        if let Err(e) = result {
            println!("\x1b[31mError: {}\x1b[0m", e);
        }
    }
}

fn result_cell(result: &ExperimentResult) -> String {
    match result {
        ExperimentResult::Text(text) => text.clone(),
        ExperimentResult::Structured(map) => serde_json::to_string(map).unwrap_or_default(),
    }
}

pub fn print_experiments(experiments: &[Experiment]) {
    if experiments.is_empty() {
        println!("No experiments registered.");
        return;
    }
    let mut table = Table::new();
    table.add_row(row!["Experiment", "Recipe", "Date", "Responsible", "Cost", "Loss", "Realized cost", "Result"]);
    for e in experiments {
        let optional = |v: Option<f64>| v.map(|v| format!("{:.4}", v)).unwrap_or_else(|| "-".to_string());
        table.add_row(row![
            e.label(),
            e.recipe,
            e.date,
            e.responsible_people.join(", "),
            e.associated_cost,
            optional(e.loss_factor),
            optional(e.realized_cost),
            result_cell(&e.result)
        ]);
    }
    table.printstd();
}

fn print_recipes(lab: &Laboratory) {
    let recipes = lab.recipes().recipes();
    if recipes.is_empty() {
        println!("No recipes available.");
        return;
    }
    for recipe in recipes {
        println!("\n[{}] {}", recipe.id, recipe.describe());
        println!("estimated cost: ${}", recipe.estimated_cost(lab.inventory()));
    }
}

/// Asks which shape to use: named experiments point at a recipe by name,
/// numbered ones by recipe id.
fn register_experiment(lab: &mut Laboratory) -> Result<(), LabError> {
    let shape = prompt("Identify the experiment by 1) name or 2) number")?;
    let mut draft = match shape.as_str() {
        "1" => {
            let name = prompt("Experiment name")?;
            if name.is_empty() {
                return Err(LabError::invalid_input("experiment name", name));
            }
            let recipe = prompt("Recipe name")?;
            let people = parse_people(&prompt("Responsible people (comma separated)")?);
            let date = parse_date(&prompt("Date (YYYY-MM-DD)")?)?;
            Experiment::named(&name, &recipe, people, &date, 0.0)
        }
        "2" => {
            let recipe_id = parse_u64("recipe id", &prompt("Recipe id")?)?;
            let people = parse_people(&prompt("Responsible people (comma separated)")?);
            let date = parse_date(&prompt("Date (YYYY-MM-DD)")?)?;
            Experiment {
                id: None,
                ..Experiment::keyed(0, recipe_id, people, &date, 0.0)
            }
        }
        _ => return Err(LabError::invalid_input("experiment shape", shape)),
    };
    draft.result = parse_result(&prompt("Result (text or JSON object, empty if none yet)")?)?;

    let registered = lab.register_experiment(draft)?;
    println!(
        "\x1b[32mExperiment {} registered, estimated cost ${}\x1b[0m",
        registered.label(),
        registered.associated_cost
    );
    Ok(())
}

fn modify_result(lab: &mut Laboratory) -> Result<(), LabError> {
    let key = parse_experiment_key(&prompt("Experiment (name, or #id)")?)?;
    let current = lab.experiments().find(&key)?;
    println!("Current result: {}", result_cell(&current.result));
    let input = prompt("New result (text or JSON object, empty to keep)")?;
    if input.is_empty() {
        return Ok(());
    }
    lab.set_experiment_result(&key, parse_result(&input)?)?;
    println!("\x1b[32mExperiment {} updated\x1b[0m", key);
    Ok(())
}

fn remove_experiment(lab: &mut Laboratory) -> Result<(), LabError> {
    let key = parse_experiment_key(&prompt("Experiment (name, or #id)")?)?;
    let removed = lab.remove_experiment(&key)?;
    println!("\x1b[32mExperiment {} removed\x1b[0m", removed.label());
    Ok(())
}

fn execute_experiment(lab: &mut Laboratory) -> Result<(), LabError> {
    let key = parse_experiment_key(&prompt("Experiment (name, or #id)")?)?;
    println!("Loss policies:");
    println!("  1. percentage loss (one draw in [0.1, 22.5] %, cost includes the loss)");
    println!("  2. fraction loss (one draw per reagent in [0.001, 0.225], result pending)");
    let kind = parse_policy(&prompt("Policy")?)?;

    let outcome = lab.execute_experiment(&key, kind, &mut rand::thread_rng())?;
    let mut table = Table::new();
    table.add_row(row!["Reagent", "Nominal", "Loss", "Debited", "Remaining"]);
    for c in &outcome.consumptions {
        table.add_row(row![
            c.debit.reagent,
            c.nominal,
            format!("{:.4}", c.loss_factor),
            format!("{:.4}", c.debit.amount),
            format!("{:.4}", c.debit.remaining)
        ]);
    }
    table.printstd();
    println!("\x1b[32m{}\x1b[0m", outcome.message);
    for reagent in outcome.below_minimum() {
        println!("\x1b[33mWarning: {} is at or below its suggested minimum\x1b[0m", reagent);
    }
    if outcome.drove_stock_negative() {
        println!("\x1b[31mWarning: stock went negative, enable reconciled execution to prevent this\x1b[0m");
    }
    Ok(())
}
