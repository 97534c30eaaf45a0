//! Parcel gridding and box-car aggregation
//!
//! Partitions the parcel bounding box into a fixed grid of zones,
//! rasterizes parcel membership by pixel-center test, and aggregates an
//! index raster into one summary per covered zone.

use crate::core::geometry::point_in_ring;
use crate::types::{BandImage, BoundingBox, HealthError, HealthResult};
use geo::Coord;

/// Gridding parameters
#[derive(Debug, Clone)]
pub struct GridParams {
    /// Number of zone rows (north to south)
    pub rows: usize,
    /// Number of zone columns (west to east)
    pub cols: usize,
}

impl Default for GridParams {
    fn default() -> Self {
        // 6x6 zones per parcel
        Self { rows: 6, cols: 6 }
    }
}

/// One grid zone that covers at least one parcel pixel
#[derive(Debug, Clone)]
pub struct GridCell {
    pub row: usize,
    pub col: usize,
    pub bounds: BoundingBox,
    /// Raster row span [start, end)
    row_span: (usize, usize),
    /// Raster column span [start, end)
    col_span: (usize, usize),
    /// Pixels whose center falls inside the parcel
    pub pixel_count: usize,
    /// Covered fraction of the cell's raster window
    pub coverage: f32,
}

/// Aggregated statistics for one grid zone
#[derive(Debug, Clone)]
pub struct CellSummary {
    pub row: usize,
    pub col: usize,
    pub bounds: BoundingBox,
    pub mean: f32,
    pub std_dev: f32,
    pub min: f32,
    pub max: f32,
    /// Finite pixels that entered the aggregate
    pub pixel_count: usize,
    pub coverage: f32,
}

/// Membership mask and zone layout for one parcel/raster pairing
pub struct ParcelGrid {
    params: GridParams,
    raster_dims: (usize, usize),
    mask: Vec<bool>,
    cells: Vec<GridCell>,
}

impl ParcelGrid {
    /// Build the grid over a parcel.
    ///
    /// The raster is assumed north-up over `bbox` (row 0 at max_lat).
    /// Cells with no covered pixel center are dropped.
    pub fn build(
        bbox: &BoundingBox,
        ring: &[Coord<f64>],
        raster_dims: (usize, usize),
        params: &GridParams,
    ) -> HealthResult<ParcelGrid> {
        let (px_rows, px_cols) = raster_dims;

        if params.rows == 0 || params.cols == 0 {
            return Err(HealthError::Processing(
                "grid must have at least one row and one column".to_string(),
            ));
        }
        if !bbox.is_valid() {
            return Err(HealthError::InvalidGeometry(format!(
                "degenerate bounding box [{}, {}] x [{}, {}]",
                bbox.min_lon, bbox.max_lon, bbox.min_lat, bbox.max_lat
            )));
        }
        if px_rows < params.rows || px_cols < params.cols {
            return Err(HealthError::Processing(format!(
                "raster {}x{} is too small for a {}x{} grid",
                px_rows, px_cols, params.rows, params.cols
            )));
        }

        log::debug!(
            "Rasterizing parcel mask over {}x{} pixels, {}x{} zones",
            px_rows,
            px_cols,
            params.rows,
            params.cols
        );

        // Pixel-center membership mask, north-up
        let lon_step = bbox.width() / px_cols as f64;
        let lat_step = bbox.height() / px_rows as f64;
        let mut mask = vec![false; px_rows * px_cols];
        for pr in 0..px_rows {
            let lat = bbox.max_lat - (pr as f64 + 0.5) * lat_step;
            for pc in 0..px_cols {
                let lon = bbox.min_lon + (pc as f64 + 0.5) * lon_step;
                mask[pr * px_cols + pc] = point_in_ring(ring, lon, lat);
            }
        }

        let cell_w = bbox.width() / params.cols as f64;
        let cell_h = bbox.height() / params.rows as f64;
        let mut cells = Vec::with_capacity(params.rows * params.cols);

        for gr in 0..params.rows {
            let row_span = (gr * px_rows / params.rows, (gr + 1) * px_rows / params.rows);
            for gc in 0..params.cols {
                let col_span = (gc * px_cols / params.cols, (gc + 1) * px_cols / params.cols);

                let mut covered = 0usize;
                for pr in row_span.0..row_span.1 {
                    for pc in col_span.0..col_span.1 {
                        if mask[pr * px_cols + pc] {
                            covered += 1;
                        }
                    }
                }

                if covered == 0 {
                    continue;
                }

                let window = (row_span.1 - row_span.0) * (col_span.1 - col_span.0);
                let top = bbox.max_lat - gr as f64 * cell_h;
                cells.push(GridCell {
                    row: gr,
                    col: gc,
                    bounds: BoundingBox {
                        min_lon: bbox.min_lon + gc as f64 * cell_w,
                        max_lon: bbox.min_lon + (gc + 1) as f64 * cell_w,
                        min_lat: top - cell_h,
                        max_lat: top,
                    },
                    row_span,
                    col_span,
                    pixel_count: covered,
                    coverage: covered as f32 / window as f32,
                });
            }
        }

        if cells.is_empty() {
            return Err(HealthError::InvalidGeometry(
                "parcel covers no raster pixels".to_string(),
            ));
        }

        log::debug!(
            "{} of {} zones cover the parcel",
            cells.len(),
            params.rows * params.cols
        );

        Ok(ParcelGrid {
            params: params.clone(),
            raster_dims,
            mask,
            cells,
        })
    }

    pub fn params(&self) -> &GridParams {
        &self.params
    }

    pub fn cells(&self) -> &[GridCell] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Box-car aggregate an index raster into per-zone summaries.
    ///
    /// Non-finite pixels are skipped; a zone with no finite pixel is
    /// dropped from the output.
    pub fn aggregate(&self, raster: &BandImage) -> HealthResult<Vec<CellSummary>> {
        if raster.dim() != self.raster_dims {
            return Err(HealthError::Processing(format!(
                "raster dimensions {:?} do not match grid dimensions {:?}",
                raster.dim(),
                self.raster_dims
            )));
        }

        let (_, px_cols) = self.raster_dims;
        let mut summaries = Vec::with_capacity(self.cells.len());

        for cell in &self.cells {
            let mut sum = 0.0f64;
            let mut sum_sq = 0.0f64;
            let mut min = f32::INFINITY;
            let mut max = f32::NEG_INFINITY;
            let mut n = 0usize;

            for pr in cell.row_span.0..cell.row_span.1 {
                for pc in cell.col_span.0..cell.col_span.1 {
                    if !self.mask[pr * px_cols + pc] {
                        continue;
                    }
                    let v = raster[[pr, pc]];
                    if !v.is_finite() {
                        continue;
                    }
                    sum += v as f64;
                    sum_sq += (v as f64) * (v as f64);
                    min = min.min(v);
                    max = max.max(v);
                    n += 1;
                }
            }

            if n == 0 {
                log::debug!("Zone ({}, {}) has no finite pixels, dropping", cell.row, cell.col);
                continue;
            }

            let mean = sum / n as f64;
            let var = (sum_sq / n as f64 - mean * mean).max(0.0);

            summaries.push(CellSummary {
                row: cell.row,
                col: cell.col,
                bounds: cell.bounds.clone(),
                mean: mean as f32,
                std_dev: var.sqrt() as f32,
                min,
                max,
                pixel_count: n,
                coverage: cell.coverage,
            });
        }

        Ok(summaries)
    }
}
