use geo::Polygon;
use std::fmt;

/// Planting technique code attached to every plot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MethodCode(pub u32);

impl fmt::Display for MethodCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One sampled plot, as read from the survey file or generated.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub cell_id: String,
    pub latitude: f64,
    pub longitude: f64,
    // None when the survey cell was left empty
    pub plant_count: Option<u32>,
    pub method: MethodCode,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectedPoint {
    pub easting: f64,
    pub northing: f64,
}

/// Square plot around a record, corners in geographic degrees (x = lon, y = lat),
/// ring order SW, SE, NE, NW.
#[derive(Debug, Clone)]
pub struct PlotPolygon {
    pub geometry: Polygon<f64>,
    pub center: ProjectedPoint,
    pub side_meters: f64,
}

/// Visual encoding derived from a single record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleBinding {
    pub fill_color: String,
    pub fill_band: usize,
    pub border_color: String,
}
