//! # Laboratory statistics
//!
//! Aggregates over the experiment registry: who runs the most experiments,
//! which recipes are run most and least often, and which reagents the
//! executed recipes use most (`reactivos_utilizados`).
//!
//! Ties are broken by first appearance in the registry.
use crate::Experiments::experiment::Experiment;
use crate::Inventory::inventory_store::InventoryStore;
use crate::Recipes::recipe::RecipeRef;
use crate::Recipes::recipe_book::RecipeBook;
use prettytable::{Table, row};

const TOP_REAGENTS: usize = 5;
const BAR_WIDTH: usize = 40;

/// counts in order of first appearance
fn count_in_order<K: PartialEq>(items: impl IntoIterator<Item = K>) -> Vec<(K, usize)> {
    let mut counts: Vec<(K, usize)> = Vec::new();
    for item in items {
        match counts.iter_mut().find(|(k, _)| *k == item) {
            Some((_, n)) => *n += 1,
            None => counts.push((item, 1)),
        }
    }
    counts
}

fn first_max<K>(counts: &[(K, usize)]) -> Option<&(K, usize)> {
    counts.iter().fold(None, |best, entry| match best {
        Some(b) if b.1 >= entry.1 => Some(b),
        _ => Some(entry),
    })
}

fn first_min<K>(counts: &[(K, usize)]) -> Option<&(K, usize)> {
    counts.iter().fold(None, |best, entry| match best {
        Some(b) if b.1 <= entry.1 => Some(b),
        _ => Some(entry),
    })
}

pub fn most_active_researcher(experiments: &[Experiment]) -> Option<String> {
    let counts = count_in_order(
        experiments
            .iter()
            .flat_map(|e| e.responsible_people.iter().cloned()),
    );
    first_max(&counts).map(|(name, _)| name.clone())
}

/// how many experiments reference each recipe
pub fn recipe_frequencies(experiments: &[Experiment]) -> Vec<(RecipeRef, usize)> {
    count_in_order(experiments.iter().map(|e| e.recipe.clone()))
}

/// (most frequent, least frequent); `None` for an empty registry
pub fn most_and_least_frequent_recipe(experiments: &[Experiment]) -> Option<(RecipeRef, RecipeRef)> {
    let counts = recipe_frequencies(experiments);
    match (first_max(&counts), first_min(&counts)) {
        (Some((most, _)), Some((least, _))) => Some((most.clone(), least.clone())),
        _ => None,
    }
}

/// Recipe name, or `receta <id>` when the catalogue does not know it.
pub fn recipe_label(recipe_ref: &RecipeRef, recipes: &RecipeBook) -> String {
    match recipes.resolve(recipe_ref) {
        Ok(recipe) => recipe.name.clone(),
        Err(_) => match recipe_ref {
            RecipeRef::Id(id) => format!("receta {}", id),
            RecipeRef::Name(name) => format!("receta {}", name),
        },
    }
}

pub fn reagent_label(reagent_id: u64, inventory: &InventoryStore) -> String {
    inventory
        .find_by_id(reagent_id)
        .map(|r| r.name.clone())
        .unwrap_or_else(|| format!("reactivo {}", reagent_id))
}

/// Top five reagents by number of `reactivos_utilizados` entries across the
/// recipes of all experiments, most used first.
pub fn most_used_reagents(
    experiments: &[Experiment],
    recipes: &RecipeBook,
    inventory: &InventoryStore,
) -> Vec<(String, usize)> {
    let used = experiments
        .iter()
        .filter_map(|e| recipes.resolve(&e.recipe).ok())
        .filter_map(|recipe| recipe.reagents_used.as_ref())
        .flatten()
        .filter_map(|usage| usage.reagent_id)
        .map(|id| reagent_label(id, inventory));
    let mut counts = count_in_order(used);
    // stable: equal counts keep first-appearance order
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts.truncate(TOP_REAGENTS);
    counts
}

/// Horizontal bars scaled to the largest value.
pub fn bar_chart(title: &str, data: &[(String, usize)]) -> String {
    let mut chart = format!("{}\n", title);
    let label_width = data.iter().map(|(label, _)| label.chars().count()).max().unwrap_or(0);
    let max = data.iter().map(|(_, n)| *n).max().unwrap_or(0);
    for (label, n) in data {
        let len = if max == 0 { 0 } else { n * BAR_WIDTH / max };
        chart.push_str(&format!(
            "{:<width$} | {} {}\n",
            label,
            "█".repeat(len),
            n,
            width = label_width
        ));
    }
    chart
}

/// Snapshot of every statistic, ready to print.
#[derive(Debug, Clone, PartialEq)]
pub struct LabStatistics {
    pub most_active_researcher: Option<String>,
    pub most_frequent_recipe: Option<(String, RecipeRef)>,
    pub least_frequent_recipe: Option<(String, RecipeRef)>,
    pub recipe_usage: Vec<(String, usize)>,
    pub most_used_reagents: Vec<(String, usize)>,
}

impl LabStatistics {
    pub fn collect(experiments: &[Experiment], recipes: &RecipeBook, inventory: &InventoryStore) -> Self {
        let labelled = |r: RecipeRef| (recipe_label(&r, recipes), r);
        let (most, least) = match most_and_least_frequent_recipe(experiments) {
            Some((most, least)) => (Some(labelled(most)), Some(labelled(least))),
            None => (None, None),
        };
        let recipe_usage = recipe_frequencies(experiments)
            .into_iter()
            .map(|(r, n)| (recipe_label(&r, recipes), n))
            .collect();
        Self {
            most_active_researcher: most_active_researcher(experiments),
            most_frequent_recipe: most,
            least_frequent_recipe: least,
            recipe_usage,
            most_used_reagents: most_used_reagents(experiments, recipes, inventory),
        }
    }

    pub fn table(&self) -> Table {
        let no_data = "not enough data".to_string();
        let recipe_cell = |entry: &Option<(String, RecipeRef)>| match entry {
            Some((label, r)) => format!("{} ({})", label, r),
            None => no_data.clone(),
        };
        let reagents = if self.most_used_reagents.is_empty() {
            no_data.clone()
        } else {
            self.most_used_reagents
                .iter()
                .map(|(name, n)| format!("{} ({} uses)", name, n))
                .collect::<Vec<_>>()
                .join("\n")
        };

        let mut table = Table::new();
        table.add_row(row!["Statistic", "Value"]);
        table.add_row(row![
            "Most active researcher",
            self.most_active_researcher.clone().unwrap_or_else(|| no_data.clone())
        ]);
        table.add_row(row!["Most frequent recipe", recipe_cell(&self.most_frequent_recipe)]);
        table.add_row(row!["Least frequent recipe", recipe_cell(&self.least_frequent_recipe)]);
        table.add_row(row!["Most used reagents", reagents]);
        table
    }

    pub fn print(&self) {
        self.table().printstd();
        if !self.recipe_usage.is_empty() {
            println!("{}", bar_chart("experiments per recipe", &self.recipe_usage));
        }
    }
}
