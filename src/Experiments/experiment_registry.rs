use crate::Experiments::experiment::{Experiment, ExperimentResult, ExperimentSchema};
use crate::Utils::load_from_file::LoadData;
use crate::lab_error::LabError;
use log::info;
use serde_json::Value;
use std::fmt;

/// How the operator names an experiment: by id or by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExperimentKey {
    Id(u64),
    Name(String),
}

impl fmt::Display for ExperimentKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ExperimentKey::Id(id) => write!(f, "#{}", id),
            ExperimentKey::Name(name) => write!(f, "{}", name),
        }
    }
}

/// All registered experiments, in file order.
#[derive(Debug, Clone, Default)]
pub struct ExperimentRegistry {
    experiments: Vec<Experiment>,
}

impl ExperimentRegistry {
    pub fn new(experiments: Vec<Experiment>) -> Self {
        Self { experiments }
    }

    pub fn load(file_name: &str) -> Result<Self, LabError> {
        let entries = LoadData::new(file_name).load_array()?;
        let experiments = entries
            .into_iter()
            .enumerate()
            .map(|(i, entry)| Experiment::from_value(file_name, i, entry))
            .collect::<Result<Vec<_>, _>>()?;
        info!("{} experiments loaded", experiments.len());
        Ok(Self { experiments })
    }

    pub fn save(&self, file_name: &str, atomic: bool) -> Result<(), LabError> {
        let values = self
            .experiments
            .iter()
            .map(Experiment::to_value)
            .collect::<Result<Vec<Value>, _>>()?;
        LoadData::new(file_name).save(&values, atomic)
    }

    pub fn experiments(&self) -> &[Experiment] {
        &self.experiments
    }

    pub fn len(&self) -> usize {
        self.experiments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.experiments.is_empty()
    }

    pub fn next_id(&self) -> u64 {
        self.experiments.iter().filter_map(|e| e.id).max().unwrap_or(0) + 1
    }

    pub fn find_by_id(&self, id: u64) -> Option<&Experiment> {
        self.experiments.iter().find(|e| e.id == Some(id))
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Experiment> {
        self.experiments
            .iter()
            .find(|e| e.name.as_deref() == Some(name))
    }

    pub fn find_by_id_mut(&mut self, id: u64) -> Result<&mut Experiment, LabError> {
        self.experiments
            .iter_mut()
            .find(|e| e.id == Some(id))
            .ok_or_else(|| LabError::not_found("experiment", format!("#{}", id)))
    }

    pub fn find_by_name_mut(&mut self, name: &str) -> Result<&mut Experiment, LabError> {
        self.experiments
            .iter_mut()
            .find(|e| e.name.as_deref() == Some(name))
            .ok_or_else(|| LabError::not_found("experiment", name))
    }

    pub fn find(&self, key: &ExperimentKey) -> Result<&Experiment, LabError> {
        let found = match key {
            ExperimentKey::Id(id) => self.find_by_id(*id),
            ExperimentKey::Name(name) => self.find_by_name(name),
        };
        found.ok_or_else(|| LabError::not_found("experiment", key.to_string()))
    }

    pub fn find_mut(&mut self, key: &ExperimentKey) -> Result<&mut Experiment, LabError> {
        match key {
            ExperimentKey::Id(id) => self.find_by_id_mut(*id),
            ExperimentKey::Name(name) => self.find_by_name_mut(name),
        }
    }

    pub fn remove(&mut self, key: &ExperimentKey) -> Result<Experiment, LabError> {
        match key {
            ExperimentKey::Id(id) => self.remove_by_id(*id),
            ExperimentKey::Name(name) => self.remove_by_name(name),
        }
    }

    /// Registers an experiment. Keyed experiments without an id get the
    /// next free one; ids and names must stay unique.
    pub fn add(&mut self, mut experiment: Experiment) -> Result<&Experiment, LabError> {
        if experiment.schema == ExperimentSchema::Keyed && experiment.id.is_none() {
            experiment.id = Some(self.next_id());
        }
        if let Some(id) = experiment.id {
            if self.find_by_id(id).is_some() {
                return Err(LabError::invalid_input("experiment id (already registered)", id.to_string()));
            }
        }
        if let Some(name) = &experiment.name {
            if self.find_by_name(name).is_some() {
                return Err(LabError::invalid_input("experiment name (already registered)", name.clone()));
            }
        }
        self.experiments.push(experiment);
        Ok(&self.experiments[self.experiments.len() - 1])
    }

    pub fn set_result_by_name(&mut self, name: &str, result: ExperimentResult) -> Result<(), LabError> {
        self.find_by_name_mut(name)?.result = result;
        Ok(())
    }

    pub fn remove_by_name(&mut self, name: &str) -> Result<Experiment, LabError> {
        let index = self
            .experiments
            .iter()
            .position(|e| e.name.as_deref() == Some(name))
            .ok_or_else(|| LabError::not_found("experiment", name))?;
        Ok(self.experiments.remove(index))
    }

    pub fn remove_by_id(&mut self, id: u64) -> Result<Experiment, LabError> {
        let index = self
            .experiments
            .iter()
            .position(|e| e.id == Some(id))
            .ok_or_else(|| LabError::not_found("experiment", format!("#{}", id)))?;
        Ok(self.experiments.remove(index))
    }
}
