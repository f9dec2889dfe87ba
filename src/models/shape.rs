//! Shape masks, polygon scaling and shape request types.
//!
//! Shapes partition the Modflow grid into regions. The frontend either sends
//! a finished mask (one byte per grid cell) or a polygon drawn over the model
//! image, which is scaled onto the grid and rasterized here.

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::ShapeColor;

/// Dense row-major bitmask over the Modflow grid.
///
/// Cell values are 0 (outside the shape) or 1 (inside). Stored per shape as
/// `shapes/<shape_id>.json` inside the project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeMask {
    pub rows: u32,
    pub cols: u32,
    /// `rows * cols` cells, row-major
    pub cells: Vec<u8>,
}

impl ShapeMask {
    /// All-zero mask of the given dimensions.
    pub fn zeros(rows: u32, cols: u32) -> Self {
        ShapeMask {
            rows,
            cols,
            cells: vec![0; rows as usize * cols as usize],
        }
    }

    /// Check that the cell buffer matches the declared dimensions and only
    /// holds 0/1 values. Called on masks received from clients.
    pub fn validate(&self) -> Result<(), AppError> {
        let expected = self.rows as usize * self.cols as usize;
        if self.cells.len() != expected {
            return Err(AppError::InvalidRequest(format!(
                "Mask has {} cells, expected {} ({} rows x {} cols)",
                self.cells.len(),
                expected,
                self.rows,
                self.cols
            )));
        }
        if self.cells.iter().any(|&cell| cell > 1) {
            return Err(AppError::InvalidRequest(
                "Mask cells must be 0 or 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Cell value, or `None` when out of bounds.
    pub fn get(&self, row: u32, col: u32) -> Option<bool> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        Some(self.cells[row as usize * self.cols as usize + col as usize] == 1)
    }

    /// Set a cell. Out-of-bounds coordinates are ignored.
    pub fn set(&mut self, row: u32, col: u32, value: bool) {
        if row < self.rows && col < self.cols {
            self.cells[row as usize * self.cols as usize + col as usize] = value as u8;
        }
    }

    /// Number of cells inside the shape.
    pub fn coverage(&self) -> usize {
        self.cells.iter().filter(|&&cell| cell == 1).count()
    }

    /// Rasterize a polygon given in grid coordinates into a mask.
    ///
    /// A cell belongs to the shape when its center `(col, row)` lies inside
    /// the polygon under the even-odd rule (standard ray casting: a point is
    /// inside when a horizontal ray from it crosses the polygon boundary an
    /// odd number of times).
    pub fn from_polygon(vertices: &[(f64, f64)], rows: u32, cols: u32) -> Self {
        let mut mask = ShapeMask::zeros(rows, cols);
        if vertices.len() < 3 {
            return mask;
        }
        for row in 0..rows {
            for col in 0..cols {
                if point_in_polygon(col as f64, row as f64, vertices) {
                    mask.set(row, col, true);
                }
            }
        }
        mask
    }
}

/// Even-odd point-in-polygon test.
fn point_in_polygon(x: f64, y: f64, vertices: &[(f64, f64)]) -> bool {
    let mut inside = false;
    let mut j = vertices.len() - 1;
    for i in 0..vertices.len() {
        let (xi, yi) = vertices[i];
        let (xj, yj) = vertices[j];
        if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Scale polygon vertices from image pixel space onto grid cell indices.
///
/// The frontend draws polygons over a rendered image of the model; vertex
/// coordinates arrive in pixels of a `source_width x source_height` image.
/// Each axis is mapped linearly onto the cell index range of the grid
/// (`0..=cols-1` horizontally, `0..=rows-1` vertically) and rounded.
///
/// # Errors
///
/// `InvalidRequest` when a source dimension is smaller than 2 pixels or the
/// grid has no cells (both would make the mapping degenerate).
pub fn scale_polygon(
    vertices: &[(f64, f64)],
    source_width: u32,
    source_height: u32,
    rows: u32,
    cols: u32,
) -> Result<Vec<(f64, f64)>, AppError> {
    if source_width < 2 || source_height < 2 {
        return Err(AppError::InvalidRequest(
            "Polygon source image must be at least 2x2 pixels".to_string(),
        ));
    }
    if rows == 0 || cols == 0 {
        return Err(AppError::InvalidRequest(
            "Project grid dimensions are not set".to_string(),
        ));
    }
    let x_scale = (cols - 1) as f64 / (source_width - 1) as f64;
    let y_scale = (rows - 1) as f64 / (source_height - 1) as f64;
    Ok(vertices
        .iter()
        .map(|&(x, y)| ((x * x_scale).round(), (y * y_scale).round()))
        .collect())
}

/// Random HTML color (`#RRGGBB`) assigned to shapes uploaded without one.
pub fn random_html_color() -> ShapeColor {
    let [r, g, b]: [u8; 3] = rand::random();
    format!("#{:02X}{:02X}{:02X}", r, g, b)
}

/// Geometry part of a shape upload: either a finished mask or a polygon
/// drawn over the model image.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeGeometry {
    /// Finished mask, used as-is after validation.
    Mask(ShapeMask),
    /// Polygon in image pixel coordinates; scaled and rasterized on the grid.
    Polygon {
        vertices: Vec<(f64, f64)>,
        source_width: u32,
        source_height: u32,
    },
}

/// Request body for `PUT /api/v1/projects/{id}/shapes/{shape_id}`.
///
/// # JSON Examples
///
/// ```json
/// {"color": "#00FF00", "mask": {"rows": 2, "cols": 2, "cells": [1, 0, 0, 1]}}
/// {"polygon": {"vertices": [[0, 0], [100, 0], [100, 80]], "source_width": 200, "source_height": 160}}
/// ```
#[derive(Debug, Deserialize)]
pub struct UpsertShapeRequest {
    /// Display color; a random one is generated when omitted
    pub color: Option<ShapeColor>,

    #[serde(flatten)]
    pub geometry: ShapeGeometry,
}

/// One shape in the `GET /api/v1/projects/{id}/shapes` response.
#[derive(Debug, Serialize)]
pub struct ShapeResponse {
    pub color: ShapeColor,
    pub mask: ShapeMask,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_round_trips_through_json() {
        let mut mask = ShapeMask::zeros(2, 3);
        mask.set(0, 1, true);
        mask.set(1, 2, true);

        let json = serde_json::to_string(&mask).unwrap();
        let parsed: ShapeMask = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, mask);
        assert_eq!(parsed.coverage(), 2);
        assert_eq!(parsed.get(0, 1), Some(true));
        assert_eq!(parsed.get(0, 0), Some(false));
        assert_eq!(parsed.get(5, 0), None);
    }

    #[test]
    fn validate_rejects_dimension_mismatch() {
        let mask = ShapeMask {
            rows: 2,
            cols: 2,
            cells: vec![0, 1, 0],
        };
        assert!(matches!(
            mask.validate().unwrap_err(),
            AppError::InvalidRequest(_)
        ));
    }

    #[test]
    fn validate_rejects_non_binary_cells() {
        let mask = ShapeMask {
            rows: 1,
            cols: 2,
            cells: vec![0, 7],
        };
        assert!(mask.validate().is_err());
    }

    #[test]
    fn scale_polygon_maps_image_corners_to_grid_corners() {
        // 200x160 image onto a 9x5 grid: corners land on corner cells.
        let vertices = vec![(0.0, 0.0), (199.0, 0.0), (199.0, 159.0), (0.0, 159.0)];
        let scaled = scale_polygon(&vertices, 200, 160, 9, 5).unwrap();
        assert_eq!(
            scaled,
            vec![(0.0, 0.0), (4.0, 0.0), (4.0, 8.0), (0.0, 8.0)]
        );
    }

    #[test]
    fn scale_polygon_rejects_degenerate_source() {
        assert!(scale_polygon(&[(0.0, 0.0)], 1, 160, 9, 5).is_err());
        assert!(scale_polygon(&[(0.0, 0.0)], 200, 160, 0, 5).is_err());
    }

    #[test]
    fn rasterized_rectangle_covers_expected_cells() {
        // Rectangle spanning columns 1..=3, rows 1..=2 of a 4x5 grid.
        let vertices = vec![(0.5, 0.5), (3.5, 0.5), (3.5, 2.5), (0.5, 2.5)];
        let mask = ShapeMask::from_polygon(&vertices, 4, 5);

        assert_eq!(mask.coverage(), 6);
        for row in 1..=2 {
            for col in 1..=3 {
                assert_eq!(mask.get(row, col), Some(true), "cell ({row},{col})");
            }
        }
        assert_eq!(mask.get(0, 0), Some(false));
        assert_eq!(mask.get(3, 4), Some(false));
    }

    #[test]
    fn degenerate_polygon_rasterizes_to_empty_mask() {
        let mask = ShapeMask::from_polygon(&[(0.0, 0.0), (2.0, 2.0)], 3, 3);
        assert_eq!(mask.coverage(), 0);
    }

    #[test]
    fn random_color_is_well_formed() {
        for _ in 0..32 {
            let color = random_html_color();
            assert_eq!(color.len(), 7);
            assert!(color.starts_with('#'));
            assert!(color[1..].chars().all(|c| c.is_ascii_hexdigit()));
        }
    }

    #[test]
    fn upsert_request_accepts_mask_and_polygon_payloads() {
        let mask: UpsertShapeRequest = serde_json::from_str(
            r##"{"color": "#00FF00", "mask": {"rows": 1, "cols": 2, "cells": [1, 0]}}"##,
        )
        .unwrap();
        assert!(matches!(mask.geometry, ShapeGeometry::Mask(_)));

        let polygon: UpsertShapeRequest = serde_json::from_str(
            r#"{"polygon": {"vertices": [[0, 0], [10, 0], [10, 10]], "source_width": 20, "source_height": 20}}"#,
        )
        .unwrap();
        assert!(polygon.color.is_none());
        assert!(matches!(polygon.geometry, ShapeGeometry::Polygon { .. }));
    }
}
