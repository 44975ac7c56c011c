use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
};

use thiserror::Error;

use crate::elevation::TerrainOracle;
use crate::models::Coordinate;

#[derive(Debug, Error)]
pub enum DemLoadError {
    #[error("failed to open DEM file {path:?}: {source}")]
    Io {
        source: std::io::Error,
        path: PathBuf,
    },
    #[error("failed to read DEM data: {0}")]
    Read(#[from] std::io::Error),
    #[error("DEM file missing header field `{0}`")]
    MissingHeader(&'static str),
    #[error("DEM file has invalid value for `{field}`: {value:?}")]
    InvalidNumber { field: &'static str, value: String },
    #[error("DEM grid has {expected} cells but file provided {actual}")]
    UnexpectedCellCount { expected: usize, actual: usize },
}

/// Elevation grid in ESRI ASCII format, georeferenced in WGS84 degrees and
/// held fully in memory.
#[derive(Debug, Clone)]
pub struct DemGrid {
    ncols: usize,
    nrows: usize,
    /// Longitude of the lower-left corner.
    xllcorner: f64,
    /// Latitude of the lower-left corner.
    yllcorner: f64,
    cellsize: f64,
    nodata: f64,
    values: Vec<f64>,
}

#[derive(Default)]
struct Header {
    ncols: Option<usize>,
    nrows: Option<usize>,
    xllcorner: Option<f64>,
    yllcorner: Option<f64>,
    cellsize: Option<f64>,
    nodata: Option<f64>,
}

fn parse<T: std::str::FromStr>(field: &'static str, value: &str) -> Result<T, DemLoadError> {
    value.parse().map_err(|_| DemLoadError::InvalidNumber {
        field,
        value: value.to_string(),
    })
}

impl DemGrid {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, DemLoadError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| DemLoadError::Io {
            source,
            path: path.into(),
        })?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn from_reader(reader: impl BufRead) -> Result<Self, DemLoadError> {
        let mut header = Header::default();
        let mut values = Vec::new();

        for line in reader.lines() {
            let line = line?;
            let mut parts = line.split_whitespace();
            let Some(first) = parts.next() else {
                continue;
            };

            if values.is_empty() && first.starts_with(|c: char| c.is_ascii_alphabetic()) {
                let value = parts.next().unwrap_or_default();
                match first.to_lowercase().as_str() {
                    "ncols" => header.ncols = Some(parse("ncols", value)?),
                    "nrows" => header.nrows = Some(parse("nrows", value)?),
                    "xllcorner" | "xllcenter" => {
                        header.xllcorner = Some(parse("xllcorner", value)?)
                    }
                    "yllcorner" | "yllcenter" => {
                        header.yllcorner = Some(parse("yllcorner", value)?)
                    }
                    "cellsize" => header.cellsize = Some(parse("cellsize", value)?),
                    "nodata_value" => header.nodata = Some(parse("nodata_value", value)?),
                    other => tracing::debug!("ignoring DEM header `{other}`"),
                }
                continue;
            }

            for token in std::iter::once(first).chain(parts) {
                values.push(parse::<f64>("value", token)?);
            }
        }

        let ncols = header.ncols.ok_or(DemLoadError::MissingHeader("ncols"))?;
        let nrows = header.nrows.ok_or(DemLoadError::MissingHeader("nrows"))?;
        let expected = ncols * nrows;
        if values.len() != expected || expected == 0 {
            return Err(DemLoadError::UnexpectedCellCount {
                expected,
                actual: values.len(),
            });
        }

        Ok(Self {
            ncols,
            nrows,
            xllcorner: header.xllcorner.ok_or(DemLoadError::MissingHeader("xllcorner"))?,
            yllcorner: header.yllcorner.ok_or(DemLoadError::MissingHeader("yllcorner"))?,
            cellsize: header.cellsize.ok_or(DemLoadError::MissingHeader("cellsize"))?,
            nodata: header.nodata.unwrap_or(-9999.0),
            values,
        })
    }

    fn lat_max(&self) -> f64 {
        self.yllcorner + self.cellsize * (self.nrows - 1) as f64
    }

    fn lon_max(&self) -> f64 {
        self.xllcorner + self.cellsize * (self.ncols - 1) as f64
    }

    /// Bilinear elevation at `lat`/`lon`; `None` outside the grid or when every
    /// surrounding cell is nodata.
    pub fn sample(&self, lat: f64, lon: f64) -> Option<f64> {
        if !lat.is_finite() || !lon.is_finite() {
            return None;
        }
        let lat_max = self.lat_max();
        if lon < self.xllcorner || lon > self.lon_max() || lat < self.yllcorner || lat > lat_max {
            return None;
        }

        // Rows are stored north to south.
        let col = (lon - self.xllcorner) / self.cellsize;
        let row = (lat_max - lat) / self.cellsize;

        let x0 = col.floor() as usize;
        let y0 = row.floor() as usize;
        let x1 = (x0 + 1).min(self.ncols - 1);
        let y1 = (y0 + 1).min(self.nrows - 1);
        let tx = col - x0 as f64;
        let ty = row - y0 as f64;

        let corners = [
            self.value(y0, x0),
            self.value(y0, x1),
            self.value(y1, x0),
            self.value(y1, x1),
        ];
        match corners {
            [Some(a), Some(b), Some(c), Some(d)] => {
                let top = a * (1.0 - tx) + b * tx;
                let bottom = c * (1.0 - tx) + d * tx;
                Some(top * (1.0 - ty) + bottom * ty)
            }
            _ => {
                let known: Vec<f64> = corners.into_iter().flatten().collect();
                (!known.is_empty()).then(|| known.iter().sum::<f64>() / known.len() as f64)
            }
        }
    }

    fn value(&self, row: usize, col: usize) -> Option<f64> {
        let value = *self.values.get(row * self.ncols + col)?;
        ((value - self.nodata).abs() >= f64::EPSILON).then_some(value)
    }
}

impl TerrainOracle for DemGrid {
    fn elevation_at(&self, coord: Coordinate) -> Option<f64> {
        self.sample(coord.lat, coord.lon)
    }
}
