use super::cli_experiments::experiments_menu;
use super::cli_reagents::reagents_menu;
use super::cli_results::results_menu;
use super::cli_settings::settings_menu;
use super::input::prompt;
use crate::laboratory::Laboratory;
use crate::library_manager::LibraryManager;

pub fn run_interactive_menu(lab: &mut Laboratory, manager: &mut LibraryManager) {
    loop {
        show_main_menu();
        let choice = match prompt("Enter your choice") {
            Ok(choice) => choice,
            Err(e) => {
                println!("\x1b[31mError: {}\x1b[0m", e);
                break;
            }
        };

        match choice.as_str() {
            "1" => reagents_menu(lab),
            "2" => experiments_menu(lab),
            "3" => results_menu(lab),
            "4" => {
                println!("\n\x1b[34m=== Laboratory statistics ===\x1b[0m");
                lab.statistics().print();
            }
            "5" => settings_menu(lab, manager),
            "0" => {
                println!("Goodbye!");
                break;
            }
            _ => println!("Invalid choice. Please try again."),
        }
    }
}
/* colors
Blue (\x1b[34m) - headers

Yellow (\x1b[33m) - menu options, low stock warnings

Cyan (\x1b[36m) - prompts

Green (\x1b[32m) / Red (\x1b[31m) - success / error messages

Reset (\x1b[0m) - returns to normal color after each colored section
*/
fn show_main_menu() {
    println!("\x1b[34m\n SapuLab: chemistry laboratory records \n\x1b[0m");
    println!("\x1b[33m1. Reagent inventory\x1b[0m");
    println!("\x1b[33m2. Experiments\x1b[0m");
    println!("\x1b[33m3. Results\x1b[0m");
    println!("\x1b[33m4. Statistics\x1b[0m");
    println!("\x1b[33m5. Settings\x1b[0m");
    println!("\x1b[33m0. Exit\x1b[0m");
}
