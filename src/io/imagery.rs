//! Scene catalog client
//!
//! Fetches composited multispectral imagery for a bounding box from a
//! scene-catalog HTTP API: search the catalog, download per-band grids
//! for the least cloudy scenes, and reduce to a per-pixel median
//! composite. Band grids are cached on disk between runs.

use crate::types::{BandImage, BoundingBox, HealthError, HealthResult, Scene, SpectralBand};
use chrono::{DateTime, NaiveDate, Utc};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Imagery client parameters
#[derive(Debug, Clone)]
pub struct ImageryParams {
    /// Primary catalog endpoint
    pub base_url: String,
    /// Fallback catalog mirrors tried in order after the primary
    pub mirrors: Vec<String>,
    pub timeout: Duration,
    /// Maximum acceptable cloud cover percentage per scene
    pub max_cloud_cover: f32,
    /// Scenes contributing to the median composite
    pub max_scenes: usize,
    /// Bands requested from the catalog
    pub bands: Vec<SpectralBand>,
    /// Band grid cache directory; None disables caching
    pub cache_dir: Option<PathBuf>,
}

impl Default for ImageryParams {
    fn default() -> Self {
        Self {
            base_url: "https://imagery.agrisentinel.example/api/v1".to_string(),
            mirrors: Vec::new(),
            timeout: Duration::from_secs(30),
            max_cloud_cover: 20.0,
            max_scenes: 4,
            bands: SpectralBand::all(),
            cache_dir: dirs::cache_dir().map(|d| d.join("agrisentinel")),
        }
    }
}

/// One catalog record for a scene over the search area
#[derive(Debug, Clone, Deserialize)]
pub struct SceneRecord {
    pub id: String,
    #[serde(default)]
    pub platform: String,
    pub acquired: DateTime<Utc>,
    pub cloud_cover: f32,
    /// Band asset key to download URL
    pub assets: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct SceneSearchResponse {
    scenes: Vec<SceneRecord>,
}

/// Wire format for one band grid asset
#[derive(Debug, Serialize, Deserialize)]
struct BandGrid {
    shape: [usize; 2],
    values: Vec<f32>,
}

impl BandGrid {
    fn into_array(self) -> HealthResult<BandImage> {
        let expected = self.shape[0] * self.shape[1];
        if self.values.len() != expected {
            return Err(HealthError::Imagery(format!(
                "band grid carries {} values for shape {}x{}",
                self.values.len(),
                self.shape[0],
                self.shape[1]
            )));
        }
        Array2::from_shape_vec((self.shape[0], self.shape[1]), self.values)
            .map_err(|e| HealthError::Imagery(format!("band grid reshape failed: {}", e)))
    }
}

/// Scene catalog client
pub struct ImageryClient {
    params: ImageryParams,
    client: reqwest::blocking::Client,
}

impl ImageryClient {
    /// Create a client with default parameters
    pub fn new() -> HealthResult<Self> {
        Self::with_params(ImageryParams::default())
    }

    /// Create a client with custom parameters
    pub fn with_params(params: ImageryParams) -> HealthResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(params.timeout)
            .build()
            .map_err(|e| HealthError::Imagery(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { params, client })
    }

    pub fn params(&self) -> &ImageryParams {
        &self.params
    }

    /// Search the catalog for scenes over a bounding box and date window.
    ///
    /// Mirrors are tried in order after the primary endpoint; the first
    /// responsive catalog wins.
    pub fn search_scenes(
        &self,
        bbox: &BoundingBox,
        start: NaiveDate,
        end: NaiveDate,
    ) -> HealthResult<Vec<SceneRecord>> {
        let mut endpoints = vec![self.params.base_url.as_str()];
        endpoints.extend(self.params.mirrors.iter().map(|m| m.as_str()));

        let bbox_param = format!(
            "{},{},{},{}",
            bbox.min_lon, bbox.min_lat, bbox.max_lon, bbox.max_lat
        );

        let mut last_error = None;
        for (i, base) in endpoints.iter().enumerate() {
            let url = format!("{}/scenes/search", base);
            log::debug!("Searching catalog {}/{}: {}", i + 1, endpoints.len(), url);

            match self.search_one(&url, &bbox_param, start, end) {
                Ok(records) => {
                    log::info!("Catalog returned {} scenes from {}", records.len(), base);
                    return Ok(records);
                }
                Err(e) => {
                    log::warn!("Catalog {} failed: {}", base, e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            HealthError::Imagery("no catalog endpoints configured".to_string())
        }))
    }

    fn search_one(
        &self,
        url: &str,
        bbox_param: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> HealthResult<Vec<SceneRecord>> {
        let response = self
            .client
            .get(url)
            .query(&[
                ("bbox", bbox_param.to_string()),
                ("start", start.format("%Y-%m-%d").to_string()),
                ("end", end.format("%Y-%m-%d").to_string()),
                ("max_cloud", self.params.max_cloud_cover.to_string()),
            ])
            .send()
            .map_err(|e| HealthError::Imagery(format!("search request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(HealthError::Imagery(format!(
                "search returned status {}",
                response.status()
            )));
        }

        let body: SceneSearchResponse = response
            .json()
            .map_err(|e| HealthError::Imagery(format!("invalid search response: {}", e)))?;

        Ok(body.scenes)
    }

    /// Download one band grid, consulting the on-disk cache first.
    pub fn fetch_band(&self, url: &str) -> HealthResult<BandImage> {
        if let Some(dir) = &self.params.cache_dir {
            let path = dir.join(cache_key(url));
            if path.exists() {
                match read_cached_grid(&path) {
                    Ok(grid) => {
                        log::debug!("Band cache hit: {}", path.display());
                        return grid.into_array();
                    }
                    Err(e) => {
                        log::warn!("Discarding unreadable cache entry {}: {}", path.display(), e);
                    }
                }
            }
        }

        log::debug!("Downloading band grid: {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| HealthError::Imagery(format!("band download failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(HealthError::Imagery(format!(
                "band download returned status {}",
                response.status()
            )));
        }

        let grid: BandGrid = response
            .json()
            .map_err(|e| HealthError::Imagery(format!("invalid band grid: {}", e)))?;

        if let Some(dir) = &self.params.cache_dir {
            if let Err(e) = write_cached_grid(dir, &cache_key(url), &grid) {
                log::warn!("Failed to cache band grid: {}", e);
            }
        }

        grid.into_array()
    }

    /// Fetch a per-pixel median composite over the search window.
    ///
    /// The least cloudy scenes are composited; scenes missing bands or
    /// with mismatched grids are skipped with a warning.
    pub fn fetch_composite(
        &self,
        bbox: &BoundingBox,
        start: NaiveDate,
        end: NaiveDate,
    ) -> HealthResult<Scene> {
        let mut records = self.search_scenes(bbox, start, end)?;
        records.retain(|r| r.cloud_cover <= self.params.max_cloud_cover);
        if records.is_empty() {
            return Err(HealthError::Imagery(format!(
                "no scenes below {}% cloud cover between {} and {}",
                self.params.max_cloud_cover, start, end
            )));
        }

        records.sort_by(|a, b| {
            a.cloud_cover
                .partial_cmp(&b.cloud_cover)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        records.truncate(self.params.max_scenes);

        let mut stacks: HashMap<SpectralBand, Vec<BandImage>> = HashMap::new();
        let mut used = 0usize;
        let mut best: Option<&SceneRecord> = None;
        let mut shape: Option<(usize, usize)> = None;

        for record in &records {
            match self.fetch_scene_bands(record) {
                Ok(bands) => {
                    let scene_shape = bands
                        .values()
                        .next()
                        .map(|b| b.dim())
                        .unwrap_or((0, 0));
                    match shape {
                        None => shape = Some(scene_shape),
                        Some(s) if s != scene_shape => {
                            log::warn!(
                                "Scene {} grid {:?} differs from composite grid {:?}, skipping",
                                record.id,
                                scene_shape,
                                s
                            );
                            continue;
                        }
                        Some(_) => {}
                    }
                    for (band, image) in bands {
                        stacks.entry(band).or_default().push(image);
                    }
                    used += 1;
                    if best.is_none() {
                        best = Some(record);
                    }
                }
                Err(e) => {
                    log::warn!("Skipping scene {}: {}", record.id, e);
                }
            }
        }

        let best = match best {
            Some(record) => record,
            None => {
                return Err(HealthError::Imagery(
                    "no usable scenes in the search window".to_string(),
                ));
            }
        };

        log::info!("Compositing {} scenes over {} bands", used, stacks.len());

        let bands: HashMap<SpectralBand, BandImage> = stacks
            .into_iter()
            .map(|(band, stack)| (band, median_stack(&stack)))
            .collect();

        let (rows, cols) = shape.unwrap_or((0, 0));

        Ok(Scene {
            id: best.id.clone(),
            platform: if best.platform.is_empty() {
                "unknown".to_string()
            } else {
                best.platform.clone()
            },
            acquired: best.acquired,
            cloud_cover: best.cloud_cover,
            bounds: bbox.clone(),
            pixel_spacing: (
                bbox.width() / cols.max(1) as f64,
                bbox.height() / rows.max(1) as f64,
            ),
            bands,
        })
    }

    /// Download every configured band for one scene record.
    fn fetch_scene_bands(
        &self,
        record: &SceneRecord,
    ) -> HealthResult<HashMap<SpectralBand, BandImage>> {
        let mut bands = HashMap::new();

        for &band in &self.params.bands {
            let url = record.assets.get(band.asset_key()).ok_or_else(|| {
                HealthError::Imagery(format!(
                    "scene {} has no {} asset",
                    record.id,
                    band.asset_key()
                ))
            })?;
            bands.insert(band, self.fetch_band(url)?);
        }

        // Cross-band shape check before the scene enters the composite
        let mut dims: Option<(usize, usize)> = None;
        for image in bands.values() {
            match dims {
                None => dims = Some(image.dim()),
                Some(d) if d != image.dim() => {
                    return Err(HealthError::Imagery(format!(
                        "scene {} bands disagree on grid shape",
                        record.id
                    )));
                }
                Some(_) => {}
            }
        }

        Ok(bands)
    }
}

/// Element-wise median over a stack of equally shaped rasters.
fn median_stack(stack: &[BandImage]) -> BandImage {
    if stack.len() == 1 {
        return stack[0].clone();
    }

    let dim = stack[0].dim();
    let mut out = BandImage::zeros(dim);
    let mut column: Vec<f32> = Vec::with_capacity(stack.len());

    for r in 0..dim.0 {
        for c in 0..dim.1 {
            column.clear();
            for image in stack {
                let v = image[[r, c]];
                if v.is_finite() {
                    column.push(v);
                }
            }
            out[[r, c]] = if column.is_empty() {
                f32::NAN
            } else {
                column.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
                let n = column.len();
                if n % 2 == 0 {
                    (column[n / 2 - 1] + column[n / 2]) / 2.0
                } else {
                    column[n / 2]
                }
            };
        }
    }

    out
}

/// Stable cache file name for a band asset URL
fn cache_key(url: &str) -> String {
    let mut hasher = DefaultHasher::new();
    url.hash(&mut hasher);
    format!("band_{:016x}.json", hasher.finish())
}

fn read_cached_grid(path: &Path) -> HealthResult<BandGrid> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Write a grid to the cache atomically (temp file then rename).
fn write_cached_grid(dir: &Path, name: &str, grid: &BandGrid) -> HealthResult<()> {
    std::fs::create_dir_all(dir)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(serde_json::to_string(grid)?.as_bytes())?;
    tmp.persist(dir.join(name)).map_err(|e| e.error)?;

    log::debug!("Cached band grid as {}", name);
    Ok(())
}
