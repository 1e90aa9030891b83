/// a single reagent record and its unit conversions
pub mod reagent;
/// in-memory inventory with lookup, debits and persistence
pub mod inventory_store;
