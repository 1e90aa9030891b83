use super::input::{parse_yes_no, prompt};
use crate::lab_error::LabError;
use crate::laboratory::Laboratory;
use crate::library_manager::LibraryManager;
use crate::settings::{DISPLAY_NAMES, Settings};
use prettytable::{Table, row};

pub fn settings_menu(lab: &mut Laboratory, manager: &mut LibraryManager) {
    loop {
        println!("\n\x1b[34m=== Settings ({}) ===\x1b[0m", manager.config_file());
        println!("\x1b[33m1. Show configuration\x1b[0m");
        println!("\x1b[33m2. Change data file\x1b[0m");
        println!("\x1b[33m3. Strict stock\x1b[0m");
        println!("\x1b[33m4. Reconciled execution\x1b[0m");
        println!("\x1b[33m5. Atomic writes\x1b[0m");
        println!("\x1b[33m6. Log level\x1b[0m");
        println!("\x1b[33m7. Reset to defaults\x1b[0m");
        println!("\x1b[33m8. Reload data files\x1b[0m");
        println!("\x1b[33m0. Back\x1b[0m");

        let choice = match prompt("Choose option") {
            Ok(choice) => choice,
            Err(e) => {
                println!("\x1b[31mError: {}\x1b[0m", e);
                break;
            }
        };
        let result = match choice.as_str() {
            "1" => {
                print_configuration(manager);
                Ok(())
            }
            "2" => change_data_file(manager).and_then(|_| apply(lab, manager)),
            "3" => ask_flag("Reject debits that leave negative stock")
                .and_then(|on| manager.set_strict_stock(on))
                .and_then(|_| apply(lab, manager)),
            "4" => ask_flag("Check nominal plus loss before debiting")
                .and_then(|on| manager.set_reconciled_execution(on))
                .and_then(|_| apply(lab, manager)),
            "5" => ask_flag("Write data files through a temporary file")
                .and_then(|on| manager.set_atomic_writes(on))
                .and_then(|_| apply(lab, manager)),
            "6" => prompt("Log level (error, warn, info, debug, trace)")
                .and_then(|level| manager.set_log_level(&level))
                .map(|_| println!("Log level is applied on the next start.")),
            "7" => reset_to_defaults(manager).and_then(|_| apply(lab, manager)),
            "8" => lab.reload().map(|_| println!("\x1b[32mData files reloaded\x1b[0m")),
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

/// Reopens the laboratory with the manager's current configuration.
fn apply(lab: &mut Laboratory, manager: &LibraryManager) -> Result<(), LabError> {
    lab.reconfigure(manager.get_config().clone())?;
    println!("\x1b[32mConfiguration saved and applied\x1b[0m");
    Ok(())
}

fn ask_flag(question: &str) -> Result<bool, LabError> {
    parse_yes_no(&prompt(&format!("{} (y/n)", question))?)
}

fn print_configuration(manager: &mut LibraryManager) {
    let settings = Settings::new(manager);
    let mut table = Table::new();
    table.add_row(row!["Setting", "Value"]);
    for name in DISPLAY_NAMES {
        let path = settings.get_file(name).cloned().unwrap_or_default();
        table.add_row(row![name, path]);
    }
    let config = manager.get_config();
    table.add_row(row!["Strict stock", config.strict_stock]);
    table.add_row(row!["Reconciled execution", config.reconciled_execution]);
    table.add_row(row!["Atomic writes", config.atomic_writes]);
    table.add_row(row!["Log level", config.log_level]);
    table.printstd();
}

fn reset_to_defaults(manager: &mut LibraryManager) -> Result<(), LabError> {
    Settings::new(manager)
        .reset_to_defaults()
        .map_err(|e| LabError::invalid_input("settings", e))
}

fn change_data_file(manager: &mut LibraryManager) -> Result<(), LabError> {
    for (i, name) in DISPLAY_NAMES.iter().enumerate() {
        println!("  {}. {}", i + 1, name);
    }
    let choice = prompt("Data file")?;
    let name = choice
        .parse::<usize>()
        .ok()
        .and_then(|i| i.checked_sub(1))
        .and_then(|i| DISPLAY_NAMES.get(i))
        .ok_or_else(|| LabError::invalid_input("data file", choice.as_str()))?;
    let path = prompt("New path (.json)")?;
    Settings::new(manager)
        .set_file(name, &path)
        .map_err(|e| LabError::invalid_input(name.to_string(), e))
}
