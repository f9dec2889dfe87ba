//! Project metadata document and its integrity rules.
//!
//! This module defines:
//! - `ProjectMetadata`: the JSON document persisted per project
//! - `ModflowMetadata`: description of the single Modflow model of a project
//! - `SimulationMode`, `GridUnit`, `ShapeMapping`: supporting value types
//!
//! All cross-references inside the document (shape -> Hydrus model,
//! Hydrus model -> weather file) are validated by the mutation methods here,
//! so a persisted document never references a model or file it does not own.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::{HydrusId, ProjectId, ShapeColor, ShapeId, WeatherId};

/// How the Hydrus and Modflow simulations are coupled for this project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SimulationMode {
    /// Hydrus output feeds Modflow once.
    #[default]
    SimpleCoupling,
    /// Modflow water table depth is fed back into Hydrus between passes.
    WithFeedback,
}

/// Unit in which the model grid cell sizes are expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GridUnit {
    Feet,
    Meters,
    Centimeters,
}

/// What a shape region of the Modflow grid is mapped to.
///
/// A shape either takes its recharge from a Hydrus model or uses a constant
/// value entered by hand.
///
/// # JSON Example
///
/// ```json
/// {"hydrus": "model1"}
/// {"manual_value": 0.25}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeMapping {
    /// Recharge comes from the named Hydrus model.
    Hydrus(HydrusId),
    /// Constant recharge value applied to the whole shape.
    ManualValue(f64),
}

/// Description of the Modflow model assigned to a project.
///
/// Grid geometry is optional: it is filled in once the frontend has analyzed
/// the uploaded model, and copied onto the project when the model is set.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ModflowMetadata {
    /// Name of the folder containing the Modflow model
    pub modflow_id: String,

    /// Amount of rows in the model grid
    #[serde(default)]
    pub rows: Option<u32>,

    /// Amount of columns in the model grid
    #[serde(default)]
    pub cols: Option<u32>,

    /// Unit of the cell sizes below
    #[serde(default)]
    pub grid_unit: Option<GridUnit>,

    /// Heights of the model's consecutive rows
    #[serde(default)]
    pub row_cells: Vec<f64>,

    /// Widths of the model's consecutive columns
    #[serde(default)]
    pub col_cells: Vec<f64>,
}

impl ModflowMetadata {
    /// Metadata for a freshly uploaded model with no analyzed geometry yet.
    pub fn new(modflow_id: impl Into<String>) -> Self {
        ModflowMetadata {
            modflow_id: modflow_id.into(),
            ..ModflowMetadata::default()
        }
    }
}

/// The project metadata document.
///
/// Persisted as pretty-printed `metadata.json` in the project root, accessed
/// via the DAO. The `project_id` doubles as the name of the root directory
/// (filesystem backend) or object prefix (MinIO backend).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectMetadata {
    /// Name of the project, must match the root catalogue
    pub project_id: ProjectId,

    /// Latitude of the model
    #[serde(default)]
    pub lat: Option<f64>,

    /// Longitude of the model
    #[serde(default)]
    pub long: Option<f64>,

    /// Start date of the simulation
    #[serde(default)]
    pub start_date: Option<NaiveDate>,

    /// End date of the simulation
    #[serde(default)]
    pub end_date: Option<NaiveDate>,

    /// How many days of Hydrus simulation output should be ignored
    #[serde(default)]
    pub spin_up: Option<u32>,

    /// Amount of rows in the model grid
    #[serde(default)]
    pub rows: Option<u32>,

    /// Amount of columns in the model grid
    #[serde(default)]
    pub cols: Option<u32>,

    /// Unit in which the model grid cell sizes are represented
    #[serde(default)]
    pub grid_unit: Option<GridUnit>,

    /// Heights of the model's consecutive rows
    #[serde(default)]
    pub row_cells: Vec<f64>,

    /// Widths of the model's consecutive columns
    #[serde(default)]
    pub col_cells: Vec<f64>,

    /// Coupling mode used when the simulation is run
    #[serde(default)]
    pub simulation_mode: SimulationMode,

    /// The single Modflow model of the project, if one was uploaded
    #[serde(default)]
    pub modflow_metadata: Option<ModflowMetadata>,

    /// Names of folders containing the Hydrus models
    #[serde(default)]
    pub hydrus_models: BTreeSet<HydrusId>,

    /// Names of uploaded weather files
    #[serde(default)]
    pub weather_files: BTreeSet<WeatherId>,

    /// Display color per shape
    #[serde(default)]
    pub shapes: BTreeMap<ShapeId, ShapeColor>,

    /// Recharge source per shape
    #[serde(default)]
    pub shapes_to_hydrus: BTreeMap<ShapeId, ShapeMapping>,

    /// Weather file applied to each Hydrus model
    #[serde(default)]
    pub hydrus_to_weather: BTreeMap<HydrusId, WeatherId>,

    /// Whether the simulation for this project has finished
    #[serde(default)]
    pub finished: bool,
}

impl ProjectMetadata {
    /// Empty metadata for a new project.
    pub fn new(project_id: impl Into<ProjectId>) -> Self {
        ProjectMetadata {
            project_id: project_id.into(),
            lat: None,
            long: None,
            start_date: None,
            end_date: None,
            spin_up: None,
            rows: None,
            cols: None,
            grid_unit: None,
            row_cells: Vec::new(),
            col_cells: Vec::new(),
            simulation_mode: SimulationMode::default(),
            modflow_metadata: None,
            hydrus_models: BTreeSet::new(),
            weather_files: BTreeSet::new(),
            shapes: BTreeMap::new(),
            shapes_to_hydrus: BTreeMap::new(),
            hydrus_to_weather: BTreeMap::new(),
            finished: false,
        }
    }

    /// Register a Hydrus model. Re-registering an existing name is a no-op.
    pub fn add_hydrus_model(&mut self, hydrus_id: impl Into<HydrusId>) {
        self.hydrus_models.insert(hydrus_id.into());
    }

    /// Remove a Hydrus model together with every mapping that references it.
    ///
    /// # Errors
    ///
    /// `UnknownHydrusModel` if the project has no model with this name.
    pub fn remove_hydrus_model(&mut self, hydrus_id: &str) -> Result<(), AppError> {
        if !self.hydrus_models.remove(hydrus_id) {
            return Err(AppError::UnknownHydrusModel(hydrus_id.to_string()));
        }
        self.shapes_to_hydrus
            .retain(|_, mapping| !matches!(mapping, ShapeMapping::Hydrus(id) if id.as_str() == hydrus_id));
        self.hydrus_to_weather.remove(hydrus_id);
        Ok(())
    }

    /// Assign the Modflow model, copying any analyzed grid geometry onto the
    /// project.
    pub fn set_modflow_metadata(&mut self, metadata: ModflowMetadata) {
        if metadata.rows.is_some() {
            self.rows = metadata.rows;
        }
        if metadata.cols.is_some() {
            self.cols = metadata.cols;
        }
        if metadata.grid_unit.is_some() {
            self.grid_unit = metadata.grid_unit;
        }
        if !metadata.row_cells.is_empty() {
            self.row_cells = metadata.row_cells.clone();
        }
        if !metadata.col_cells.is_empty() {
            self.col_cells = metadata.col_cells.clone();
        }
        self.modflow_metadata = Some(metadata);
    }

    /// Drop the Modflow model assignment and return its id.
    ///
    /// # Errors
    ///
    /// `UnknownModflowModel` if no model is assigned.
    pub fn remove_modflow_metadata(&mut self) -> Result<String, AppError> {
        let metadata = self
            .modflow_metadata
            .take()
            .ok_or(AppError::UnknownModflowModel)?;
        Ok(metadata.modflow_id)
    }

    /// Register a weather file. Re-registering an existing name is a no-op.
    pub fn add_weather_file(&mut self, weather_id: impl Into<WeatherId>) {
        self.weather_files.insert(weather_id.into());
    }

    /// Remove a weather file together with the Hydrus mappings that use it.
    ///
    /// # Errors
    ///
    /// `UnknownWeatherFile` if the project has no weather file with this name.
    pub fn remove_weather_file(&mut self, weather_id: &str) -> Result<(), AppError> {
        if !self.weather_files.remove(weather_id) {
            return Err(AppError::UnknownWeatherFile(weather_id.to_string()));
        }
        self.hydrus_to_weather
            .retain(|_, mapped| mapped.as_str() != weather_id);
        Ok(())
    }

    /// Record a shape's display color, creating the shape entry if new.
    pub fn add_shape_metadata(&mut self, shape_id: impl Into<ShapeId>, color: ShapeColor) {
        self.shapes.insert(shape_id.into(), color);
    }

    /// Remove a shape entry and its recharge mapping.
    ///
    /// # Errors
    ///
    /// `UnknownShape` if the project has no shape with this name.
    pub fn remove_shape(&mut self, shape_id: &str) -> Result<(), AppError> {
        if self.shapes.remove(shape_id).is_none() {
            return Err(AppError::UnknownShape(shape_id.to_string()));
        }
        self.shapes_to_hydrus.remove(shape_id);
        Ok(())
    }

    /// Map a shape to a Hydrus model.
    ///
    /// # Errors
    ///
    /// - `UnknownShape` if the shape does not exist
    /// - `UnknownHydrusModel` if the model does not exist
    pub fn map_shape_to_hydrus(
        &mut self,
        shape_id: &str,
        hydrus_id: impl Into<HydrusId>,
    ) -> Result<(), AppError> {
        let hydrus_id = hydrus_id.into();
        if !self.shapes.contains_key(shape_id) {
            return Err(AppError::UnknownShape(shape_id.to_string()));
        }
        if !self.hydrus_models.contains(&hydrus_id) {
            return Err(AppError::UnknownHydrusModel(hydrus_id));
        }
        self.shapes_to_hydrus
            .insert(shape_id.to_string(), ShapeMapping::Hydrus(hydrus_id));
        Ok(())
    }

    /// Map a shape to a constant recharge value.
    ///
    /// # Errors
    ///
    /// `UnknownShape` if the shape does not exist.
    pub fn map_shape_to_manual_value(&mut self, shape_id: &str, value: f64) -> Result<(), AppError> {
        if !self.shapes.contains_key(shape_id) {
            return Err(AppError::UnknownShape(shape_id.to_string()));
        }
        self.shapes_to_hydrus
            .insert(shape_id.to_string(), ShapeMapping::ManualValue(value));
        Ok(())
    }

    /// Drop a shape's recharge mapping. Missing mappings are a no-op, but the
    /// shape itself must exist.
    ///
    /// # Errors
    ///
    /// `UnknownShape` if the shape does not exist.
    pub fn remove_shape_mapping(&mut self, shape_id: &str) -> Result<(), AppError> {
        if !self.shapes.contains_key(shape_id) {
            return Err(AppError::UnknownShape(shape_id.to_string()));
        }
        self.shapes_to_hydrus.remove(shape_id);
        Ok(())
    }

    /// Assign a weather file to a Hydrus model.
    ///
    /// # Errors
    ///
    /// - `UnknownHydrusModel` if the model does not exist
    /// - `UnknownWeatherFile` if the weather file does not exist
    pub fn map_hydrus_to_weather(
        &mut self,
        hydrus_id: &str,
        weather_id: impl Into<WeatherId>,
    ) -> Result<(), AppError> {
        let weather_id = weather_id.into();
        if !self.hydrus_models.contains(hydrus_id) {
            return Err(AppError::UnknownHydrusModel(hydrus_id.to_string()));
        }
        if !self.weather_files.contains(&weather_id) {
            return Err(AppError::UnknownWeatherFile(weather_id));
        }
        self.hydrus_to_weather
            .insert(hydrus_id.to_string(), weather_id);
        Ok(())
    }

    /// Drop the weather assignment of a Hydrus model. Missing assignments are
    /// a no-op, but the model itself must exist.
    ///
    /// # Errors
    ///
    /// `UnknownHydrusModel` if the model does not exist.
    pub fn remove_hydrus_weather_mapping(&mut self, hydrus_id: &str) -> Result<(), AppError> {
        if !self.hydrus_models.contains(hydrus_id) {
            return Err(AppError::UnknownHydrusModel(hydrus_id.to_string()));
        }
        self.hydrus_to_weather.remove(hydrus_id);
        Ok(())
    }
}
