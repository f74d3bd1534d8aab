//! Universal Transverse Mercator on the WGS84 ellipsoid.
//!
//! Forward and inverse use the Krüger series to sixth order in the third
//! flattening, which keeps the round-trip error far below a millimetre inside a
//! zone. The inverse latitude is recovered from the conformal latitude with a
//! few Newton steps.

use crate::error::{Result, SeagrassError};
use crate::types::ProjectedPoint;
use std::fmt;
use std::str::FromStr;

const WGS84_A: f64 = 6_378_137.0;
const WGS84_F: f64 = 1.0 / 298.257_223_563;
const K0: f64 = 0.9996;
const FALSE_EASTING: f64 = 500_000.0;
const FALSE_NORTHING_SOUTH: f64 = 10_000_000.0;

// The series diverges far from the central meridian.
const MAX_MERIDIAN_OFFSET_DEG: f64 = 45.0;
const NEWTON_MAX_ITER: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hemisphere {
    North,
    South,
}

/// A UTM zone, e.g. 31N (EPSG:32631).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UtmZone {
    pub number: u8,
    pub hemisphere: Hemisphere,
}

impl UtmZone {
    pub fn new(number: u8, hemisphere: Hemisphere) -> Result<Self> {
        if !(1..=60).contains(&number) {
            return Err(SeagrassError::Projection(format!(
                "UTM zone number must be between 1 and 60, got {}",
                number
            )));
        }
        Ok(Self { number, hemisphere })
    }

    pub fn central_meridian(&self) -> f64 {
        f64::from(self.number) * 6.0 - 183.0
    }

    pub fn epsg(&self) -> u32 {
        let base = match self.hemisphere {
            Hemisphere::North => 32600,
            Hemisphere::South => 32700,
        };
        base + u32::from(self.number)
    }

    /// True when the coordinate lies in this zone's nominal 6° band and hemisphere.
    pub fn covers(&self, latitude: f64, longitude: f64) -> bool {
        let in_hemisphere = match self.hemisphere {
            Hemisphere::North => latitude >= 0.0,
            Hemisphere::South => latitude < 0.0,
        };
        in_hemisphere && meridian_offset(longitude, self.central_meridian()).abs() <= 3.0 + 1e-9
    }
}

impl fmt::Display for UtmZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.epsg())
    }
}

impl FromStr for UtmZone {
    type Err = SeagrassError;

    /// Accepts `EPSG:32631`, `32631`, `31N` and `31s`.
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || SeagrassError::Projection(format!("Unrecognised UTM zone '{}'", s));
        let trimmed = s.trim();
        let code = match trimmed.get(..5) {
            Some(prefix) if prefix.eq_ignore_ascii_case("epsg:") => &trimmed[5..],
            _ => trimmed,
        };

        if !code.is_empty() && code.chars().all(|c| c.is_ascii_digit()) {
            let epsg: u32 = code.parse().map_err(|_| invalid())?;
            return match epsg {
                32601..=32660 => UtmZone::new((epsg - 32600) as u8, Hemisphere::North),
                32701..=32760 => UtmZone::new((epsg - 32700) as u8, Hemisphere::South),
                _ => Err(invalid()),
            };
        }

        let mut chars = code.chars();
        let hemisphere = match chars.next_back() {
            Some('N' | 'n') => Hemisphere::North,
            Some('S' | 's') => Hemisphere::South,
            _ => return Err(invalid()),
        };
        let number: u8 = chars.as_str().parse().map_err(|_| invalid())?;
        UtmZone::new(number, hemisphere)
    }
}

/// Transverse Mercator bound to one UTM zone.
#[derive(Debug, Clone)]
pub struct Projection {
    zone: UtmZone,
    e: f64,
    // rectifying radius
    a_rect: f64,
    alpha: [f64; 6],
    beta: [f64; 6],
}

impl Projection {
    pub fn utm(zone: UtmZone) -> Self {
        let n = WGS84_F / (2.0 - WGS84_F);
        let (n2, n3) = (n * n, n * n * n);
        let (n4, n5, n6) = (n3 * n, n3 * n2, n3 * n3);

        let a_rect = WGS84_A / (1.0 + n) * (1.0 + n2 / 4.0 + n4 / 64.0 + n6 / 256.0);

        let alpha = [
            n / 2.0 - 2.0 / 3.0 * n2 + 5.0 / 16.0 * n3 + 41.0 / 180.0 * n4 - 127.0 / 288.0 * n5
                + 7891.0 / 37800.0 * n6,
            13.0 / 48.0 * n2 - 3.0 / 5.0 * n3 + 557.0 / 1440.0 * n4 + 281.0 / 630.0 * n5
                - 1983433.0 / 1935360.0 * n6,
            61.0 / 240.0 * n3 - 103.0 / 140.0 * n4 + 15061.0 / 26880.0 * n5
                + 167603.0 / 181440.0 * n6,
            49561.0 / 161280.0 * n4 - 179.0 / 168.0 * n5 + 6601661.0 / 7257600.0 * n6,
            34729.0 / 80640.0 * n5 - 3418889.0 / 1995840.0 * n6,
            212378941.0 / 319334400.0 * n6,
        ];

        let beta = [
            n / 2.0 - 2.0 / 3.0 * n2 + 37.0 / 96.0 * n3 - 1.0 / 360.0 * n4 - 81.0 / 512.0 * n5
                + 96199.0 / 604800.0 * n6,
            1.0 / 48.0 * n2 + 1.0 / 15.0 * n3 - 437.0 / 1440.0 * n4 + 46.0 / 105.0 * n5
                - 1118711.0 / 3870720.0 * n6,
            17.0 / 480.0 * n3 - 37.0 / 840.0 * n4 - 209.0 / 4480.0 * n5 + 5569.0 / 90720.0 * n6,
            4397.0 / 161280.0 * n4 - 11.0 / 504.0 * n5 - 830251.0 / 7257600.0 * n6,
            4583.0 / 161280.0 * n5 - 108847.0 / 3991680.0 * n6,
            20648693.0 / 638668800.0 * n6,
        ];

        Self {
            zone,
            e: (WGS84_F * (2.0 - WGS84_F)).sqrt(),
            a_rect,
            alpha,
            beta,
        }
    }

    pub fn zone(&self) -> UtmZone {
        self.zone
    }

    fn false_northing(&self) -> f64 {
        match self.zone.hemisphere {
            Hemisphere::North => 0.0,
            Hemisphere::South => FALSE_NORTHING_SOUTH,
        }
    }

    // tan of conformal latitude from tan of geodetic latitude
    fn conformal_tan(&self, tau: f64) -> f64 {
        let sigma = (self.e * (self.e * tau / (1.0 + tau * tau).sqrt()).atanh()).sinh();
        tau * (1.0 + sigma * sigma).sqrt() - sigma * (1.0 + tau * tau).sqrt()
    }

    pub fn forward(&self, latitude: f64, longitude: f64) -> Result<ProjectedPoint> {
        if !latitude.is_finite() || !longitude.is_finite() {
            return Err(SeagrassError::Projection(format!(
                "Non-finite coordinate ({}, {})",
                latitude, longitude
            )));
        }
        if latitude.abs() > 90.0 {
            return Err(SeagrassError::Projection(format!(
                "Latitude {} is outside [-90, 90]",
                latitude
            )));
        }
        let dlon = meridian_offset(longitude, self.zone.central_meridian());
        if dlon.abs() > MAX_MERIDIAN_OFFSET_DEG {
            return Err(SeagrassError::Projection(format!(
                "Longitude {} is {:.1}° from the central meridian of {}",
                longitude,
                dlon.abs(),
                self.zone
            )));
        }

        let lam = dlon.to_radians();
        let tau_p = self.conformal_tan(latitude.to_radians().tan());

        let xi_p = tau_p.atan2(lam.cos());
        let eta_p = (lam.sin() / (tau_p * tau_p + lam.cos() * lam.cos()).sqrt()).asinh();

        let mut xi = xi_p;
        let mut eta = eta_p;
        for (j, a) in self.alpha.iter().enumerate() {
            let k = 2.0 * (j + 1) as f64;
            xi += a * (k * xi_p).sin() * (k * eta_p).cosh();
            eta += a * (k * xi_p).cos() * (k * eta_p).sinh();
        }

        Ok(ProjectedPoint {
            easting: K0 * self.a_rect * eta + FALSE_EASTING,
            northing: K0 * self.a_rect * xi + self.false_northing(),
        })
    }

    /// Returns `(latitude, longitude)` in degrees.
    pub fn inverse(&self, point: ProjectedPoint) -> Result<(f64, f64)> {
        if !point.easting.is_finite() || !point.northing.is_finite() {
            return Err(SeagrassError::Projection(format!(
                "Non-finite projected point ({}, {})",
                point.easting, point.northing
            )));
        }

        let eta = (point.easting - FALSE_EASTING) / (K0 * self.a_rect);
        let xi = (point.northing - self.false_northing()) / (K0 * self.a_rect);

        let mut xi_p = xi;
        let mut eta_p = eta;
        for (j, b) in self.beta.iter().enumerate() {
            let k = 2.0 * (j + 1) as f64;
            xi_p -= b * (k * xi).sin() * (k * eta).cosh();
            eta_p -= b * (k * xi).cos() * (k * eta).sinh();
        }

        let sinh_eta_p = eta_p.sinh();
        let cos_xi_p = xi_p.cos();
        let tau_p = xi_p.sin() / (sinh_eta_p * sinh_eta_p + cos_xi_p * cos_xi_p).sqrt();

        let e2 = self.e * self.e;
        let mut tau = tau_p;
        let mut converged = false;
        for _ in 0..NEWTON_MAX_ITER {
            let tau_i_p = self.conformal_tan(tau);
            let delta = (tau_p - tau_i_p) / (1.0 + tau_i_p * tau_i_p).sqrt()
                * (1.0 + (1.0 - e2) * tau * tau)
                / ((1.0 - e2) * (1.0 + tau * tau).sqrt());
            tau += delta;
            if delta.abs() <= 1e-12 * tau.abs().max(1.0) {
                converged = true;
                break;
            }
        }
        if !converged || !tau.is_finite() {
            return Err(SeagrassError::Projection(format!(
                "Inverse projection did not converge for ({}, {}) in {}",
                point.easting, point.northing, self.zone
            )));
        }

        let latitude = tau.atan().to_degrees();
        let longitude = wrap_longitude(self.zone.central_meridian() + sinh_eta_p.atan2(cos_xi_p).to_degrees());
        Ok((latitude, longitude))
    }
}

fn meridian_offset(longitude: f64, central_meridian: f64) -> f64 {
    wrap_longitude(longitude - central_meridian)
}

fn wrap_longitude(lon: f64) -> f64 {
    let wrapped = (lon + 180.0).rem_euclid(360.0) - 180.0;
    if wrapped == -180.0 && lon > 0.0 {
        180.0
    } else {
        wrapped
    }
}
