use SapuLab::cli::cli_main::run_interactive_menu;
use SapuLab::cli::input::{parse_yes_no, prompt};
use SapuLab::laboratory::Laboratory;
use SapuLab::library_manager::LibraryManager;
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};

pub fn main() {
    let mut manager = LibraryManager::new();
    if let Err(e) = TermLogger::init(
        manager.get_config().level_filter(),
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    ) {
        eprintln!("logger not initialized: {}", e);
    }

    // a malformed data file can be fixed by hand while the prompt waits
    let mut lab = loop {
        match Laboratory::open(manager.get_config().clone()) {
            Ok(lab) => break lab,
            Err(e) => {
                log::error!("could not open the laboratory data: {}", e);
                let retry = prompt("Try loading the data files again? (y/n)")
                    .and_then(|answer| parse_yes_no(&answer))
                    .unwrap_or(false);
                if !retry {
                    return;
                }
            }
        }
    };
    run_interactive_menu(&mut lab, &mut manager);
}
