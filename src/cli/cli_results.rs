use super::input::prompt;
use crate::Evaluation::evaluator::Evaluation;
use crate::Evaluation::results_log::EvaluationRecord;
use crate::lab_error::LabError;
use crate::laboratory::Laboratory;
use prettytable::{Table, row};

pub fn results_menu(lab: &mut Laboratory) {
    loop {
        println!("\n\x1b[34m=== Results ===\x1b[0m");
        println!("\x1b[33m1. Evaluate experiment\x1b[0m");
        println!("\x1b[33m2. List evaluations\x1b[0m");
        println!("\x1b[33m0. Back\x1b[0m");

        let choice = match prompt("Choose option") {
            Ok(choice) => choice,
            Err(e) => {
                println!("\x1b[31mError: {}\x1b[0m", e);
                break;
            }
        };
        let result = match choice.as_str() {
            "1" => evaluate_experiment(lab),
            "2" => {
                print_evaluations(lab.results().records());
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

fn evaluation_cell(evaluation: &Evaluation) -> String {
    match evaluation {
        Evaluation::Text(text) => text.clone(),
        Evaluation::Parameters(map) => map
            .iter()
            .map(|(parameter, ok)| format!("{}: {}", parameter, if *ok { "ok" } else { "FAIL" }))
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

pub fn print_evaluations(records: &[EvaluationRecord]) {
    if records.is_empty() {
        println!("No evaluations recorded.");
        return;
    }
    let mut table = Table::new();
    table.add_row(row!["Experiment", "Evaluation"]);
    for record in records {
        table.add_row(row![record.experiment, evaluation_cell(&record.evaluation)]);
    }
    table.printstd();
}

fn evaluate_experiment(lab: &mut Laboratory) -> Result<(), LabError> {
    let name = prompt("Name of the experiment to evaluate")?;
    let record = lab.evaluate_experiment(&name)?;
    print_evaluations(std::slice::from_ref(&record));
    let failed = record.evaluation.failed_parameters();
    if !failed.is_empty() {
        println!("\x1b[33mOutside expected values: {}\x1b[0m", failed.join(", "));
    }
    Ok(())
}
