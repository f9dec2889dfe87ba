//! Data models representing stored project entities.
//!
//! This module contains all data structures persisted in the project store
//! and the request/response types derived from them.

/// Project metadata document and its integrity rules
pub mod project;
/// Shape masks, polygon scaling and shape request types
pub mod shape;

/// Name of a project; doubles as its root directory / object prefix.
pub type ProjectId = String;
/// Name of a Hydrus model folder within a project.
pub type HydrusId = String;
/// Name of a weather file within a project.
pub type WeatherId = String;
/// Name of a shape mask within a project.
pub type ShapeId = String;
/// HTML color (`#RRGGBB`) assigned to a shape.
pub type ShapeColor = String;
