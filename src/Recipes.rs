/// recipe records and their own availability check
pub mod recipe;
/// read-only recipe catalogue loaded from recetas.json
pub mod recipe_book;
