use crate::Recipes::recipe::{RECIPE_KEYS, Recipe, RecipeRef};
use crate::Utils::load_from_file::{LoadData, require_keys};
use crate::lab_error::LabError;
use log::info;

/// Read-only catalogue of recipes. Recipes are snapshots: the engine
/// borrows them, nothing edits them in place.
#[derive(Debug, Clone, Default)]
pub struct RecipeBook {
    recipes: Vec<Recipe>,
}

impl RecipeBook {
    pub fn new(recipes: Vec<Recipe>) -> Self {
        Self { recipes }
    }

    pub fn load(file_name: &str) -> Result<Self, LabError> {
        let entries = LoadData::new(file_name).load_array()?;
        let mut recipes = Vec::with_capacity(entries.len());
        for (i, entry) in entries.into_iter().enumerate() {
            require_keys(file_name, i, &entry, &RECIPE_KEYS)?;
            let recipe: Recipe = serde_json::from_value(entry)
                .map_err(|e| LabError::malformed(file_name, format!("entry {}: {}", i, e)))?;
            recipes.push(recipe);
        }
        info!("{} recipes loaded", recipes.len());
        Ok(Self { recipes })
    }

    pub fn recipes(&self) -> &[Recipe] {
        &self.recipes
    }

    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Recipe> {
        self.recipes.iter().find(|r| r.name == name)
    }

    pub fn find_by_id(&self, id: u64) -> Option<&Recipe> {
        self.recipes.iter().find(|r| r.id == id)
    }

    pub fn resolve(&self, recipe_ref: &RecipeRef) -> Result<&Recipe, LabError> {
        self.recipes
            .iter()
            .find(|r| r.matches(recipe_ref))
            .ok_or_else(|| LabError::not_found("recipe", recipe_ref.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_recipes(value: serde_json::Value) -> NamedTempFile {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(value.to_string().as_bytes()).unwrap();
        temp_file
    }

    #[test]
    fn test_load_and_resolve() {
        let file = write_recipes(json!([
            {"id": 1, "nombre": "titration", "objetivo": "", "reactivos": [], "procedimiento": ""},
            {"id": 2, "nombre": "distillation", "objetivo": "", "reactivos": [], "procedimiento": ""}
        ]));
        let book = RecipeBook::load(file.path().to_str().unwrap()).unwrap();
        assert_eq!(book.recipes().len(), 2);
        assert_eq!(book.find_by_id(2).unwrap().name, "distillation");
        assert_eq!(book.find_by_name("titration").unwrap().id, 1);
        assert_eq!(
            book.resolve(&RecipeRef::Name("distillation".to_string())).unwrap().id,
            2
        );
        let err = book.resolve(&RecipeRef::Id(9)).unwrap_err();
        assert_eq!(err.to_string(), "recipe 'id 9' not found");
    }

    #[test]
    fn test_missing_file_is_empty_book() {
        let dir = tempfile::tempdir().unwrap();
        let book = RecipeBook::load(dir.path().join("recetas.json").to_str().unwrap()).unwrap();
        assert!(book.is_empty());
    }

    #[test]
    fn test_entry_without_procedure_is_malformed() {
        let file = write_recipes(json!([{"id": 1, "nombre": "x", "objetivo": "", "reactivos": []}]));
        assert!(matches!(
            RecipeBook::load(file.path().to_str().unwrap()),
            Err(LabError::MalformedData { .. })
        ));
    }
}
