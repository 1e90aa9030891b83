use super::input::{parse_amount, parse_date, prompt, prompt_optional};
use crate::Inventory::inventory_store::ReagentUpdate;
use crate::Inventory::reagent::Reagent;
use crate::lab_error::LabError;
use crate::laboratory::Laboratory;
use prettytable::{Table, row};

pub fn reagents_menu(lab: &mut Laboratory) {
    loop {
        println!("\n\x1b[34m=== Reagent Inventory ===\x1b[0m");
        println!("\x1b[33m1. Add reagent\x1b[0m");
        println!("\x1b[33m2. Modify reagent\x1b[0m");
        println!("\x1b[33m3. Remove reagent\x1b[0m");
        println!("\x1b[33m4. List reagents\x1b[0m");
        println!("\x1b[33m5. Change unit\x1b[0m");
        println!("\x1b[33m6. Low stock\x1b[0m");
        println!("\x1b[33m0. Back\x1b[0m");

        let choice = match prompt("Choose option") {
            Ok(choice) => choice,
            Err(e) => {
                println!("\x1b[31mError: {}\x1b[0m", e);
                break;
            }
        };
        let result = match choice.as_str() {
            "1" => add_reagent(lab),
            "2" => modify_reagent(lab),
            "3" => remove_reagent(lab),
            "4" => {
                print_reagents(lab.inventory().reagents());
                Ok(())
            }
            "5" => change_unit(lab),
            "6" => {
                let low: Vec<Reagent> = lab.low_stock().into_iter().cloned().collect();
                if low.is_empty() {
                    println!("No reagent is at or below its suggested minimum.");
                } else {
                    print_reagents(&low);
                }
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

pub fn print_reagents(reagents: &[Reagent]) {
    if reagents.is_empty() {
        println!("No reagents registered.");
        return;
    }
    let mut table = Table::new();
    table.add_row(row!["ID", "Name", "Category", "Available", "Unit", "Minimum", "Expiry", "Cost/unit"]);
    for r in reagents {
        let available = if r.is_below_minimum() {
            format!("{} (low)", r.available_quantity)
        } else {
            r.available_quantity.to_string()
        };
        table.add_row(row![
            r.id,
            r.name,
            r.category,
            available,
            r.unit,
            r.minimum_threshold,
            r.expiry_date,
            r.cost_per_unit
        ]);
    }
    table.printstd();
}

fn add_reagent(lab: &mut Laboratory) -> Result<(), LabError> {
    let name = prompt("Name")?;
    if name.is_empty() {
        return Err(LabError::invalid_input("name", name));
    }
    let description = prompt("Description")?;
    let cost = parse_amount("cost per unit", &prompt("Cost per unit")?)?;
    let category = prompt("Category")?;
    let quantity = parse_amount("available quantity", &prompt("Available quantity")?)?;
    let unit = prompt("Unit (mL, L, uL, g, kg, mg, ...)")?;
    let expiry = parse_date(&prompt("Expiry date (YYYY-MM-DD)")?)?;
    let minimum = parse_amount("suggested minimum", &prompt("Suggested minimum")?)?;

    let reagent = Reagent::new(0, &name, &description, cost, &category, quantity, &unit, &expiry, minimum);
    let id = lab.add_reagent(reagent)?;
    println!("\x1b[32mReagent {} registered with id {}\x1b[0m", name, id);
    Ok(())
}

fn modify_reagent(lab: &mut Laboratory) -> Result<(), LabError> {
    let name = prompt("Name of the reagent to modify")?;
    let current = lab
        .inventory()
        .find_by_name(&name)
        .ok_or_else(|| LabError::not_found("reagent", name.as_str()))?
        .clone();
    println!("{}", current.describe());
    println!("Press enter to keep a value.");

    let optional_amount = |label: &str, field: &str| -> Result<Option<f64>, LabError> {
        prompt_optional(label)?
            .map(|v| parse_amount(field, &v))
            .transpose()
    };
    let update = ReagentUpdate {
        name: prompt_optional(&format!("Name ({})", current.name))?,
        description: prompt_optional(&format!("Description ({})", current.description))?,
        cost_per_unit: optional_amount(&format!("Cost per unit ({})", current.cost_per_unit), "cost per unit")?,
        category: prompt_optional(&format!("Category ({})", current.category))?,
        available_quantity: optional_amount(
            &format!("Available quantity ({})", current.available_quantity),
            "available quantity",
        )?,
        unit: prompt_optional(&format!("Unit ({})", current.unit))?,
        expiry_date: prompt_optional(&format!("Expiry date ({})", current.expiry_date))?
            .map(|v| parse_date(&v))
            .transpose()?,
        minimum_threshold: optional_amount(
            &format!("Suggested minimum ({})", current.minimum_threshold),
            "suggested minimum",
        )?,
    };
    let modified = lab.modify_reagent(&name, update)?;
    println!("\x1b[32mReagent updated: {}\x1b[0m", modified.describe());
    Ok(())
}

fn remove_reagent(lab: &mut Laboratory) -> Result<(), LabError> {
    let name = prompt("Name of the reagent to remove")?;
    let removed = lab.remove_reagent(&name)?;
    println!("\x1b[32mReagent {} removed\x1b[0m", removed.name);
    Ok(())
}

fn change_unit(lab: &mut Laboratory) -> Result<(), LabError> {
    let name = prompt("Reagent name")?;
    if let Some(reagent) = lab.inventory().find_by_name(&name) {
        let options: Vec<&str> = reagent.unit_conversions.iter().map(|c| c.unit.as_str()).collect();
        println!("Current unit: {}. Available conversions: {}", reagent.unit, options.join(", "));
    }
    let unit = prompt("New unit")?;
    let factor = lab.change_unit(&name, &unit)?;
    println!("\x1b[32m{} converted to {} (factor {})\x1b[0m", name, unit, factor);
    Ok(())
}
