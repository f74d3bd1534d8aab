//! Visual encodings for plots: fill by plant count, border by planting method.
//!
//! Both mappings are fixed by configuration before any record is seen, so a
//! plot's style depends only on its own fields.

use crate::config::StyleConfig;
use crate::error::{Result, SeagrassError};
use crate::types::{MethodCode, Record, StyleBinding};
use std::collections::BTreeMap;

/// Equal-interval color bands over `[0, max]`.
#[derive(Debug, Clone)]
pub struct ColorScale {
    max: u32,
    colors: Vec<String>,
}

impl ColorScale {
    pub fn new(max: u32, colors: Vec<String>) -> Result<Self> {
        if colors.is_empty() {
            return Err(SeagrassError::Config("color scale needs at least one color".to_string()));
        }
        for color in &colors {
            check_css_color(color)?;
        }
        Ok(Self { max, colors })
    }

    pub fn from_config(config: &StyleConfig) -> Result<Self> {
        Self::new(config.plant_count_max, config.fill_palette.clone())
    }

    /// Missing counts share the lowest band with zero; counts above max share the top band.
    pub fn band_index(&self, count: Option<u32>) -> usize {
        let bands = self.colors.len() as u64;
        let count = u64::from(count.unwrap_or(0));
        if self.max == 0 {
            return if count == 0 { 0 } else { (bands - 1) as usize };
        }
        let max = u64::from(self.max);
        (count.min(max) * bands / max).min(bands - 1) as usize
    }

    pub fn color(&self, count: Option<u32>) -> &str {
        &self.colors[self.band_index(count)]
    }

    // Smallest count that lands in `band`.
    fn lower_bound(&self, band: usize) -> u64 {
        let bands = self.colors.len() as u64;
        let max = u64::from(self.max);
        (band as u64 * max).div_ceil(bands)
    }

    /// Legend rows `(label, color)` from lowest to highest band.
    pub fn legend(&self) -> Vec<(String, String)> {
        let n = self.colors.len();
        if self.max == 0 {
            let mut rows = vec![("0".to_string(), self.colors[0].clone())];
            if n > 1 {
                rows.push(("1+".to_string(), self.colors[n - 1].clone()));
            }
            return rows;
        }

        let mut rows = Vec::with_capacity(n);
        for band in 0..n {
            let lo = self.lower_bound(band);
            let label = if band + 1 == n {
                format!("{}+", lo)
            } else {
                let hi = self.lower_bound(band + 1).saturating_sub(1);
                if hi <= lo {
                    lo.to_string()
                } else {
                    format!("{}–{}", lo, hi)
                }
            };
            // Bands narrower than one count never receive a plot
            if band + 1 < n && self.lower_bound(band + 1) == lo {
                continue;
            }
            rows.push((label, self.colors[band].clone()));
        }
        rows
    }
}

/// Border color per planting method, with a fallback for unlisted codes.
#[derive(Debug, Clone)]
pub struct MethodPalette {
    colors: BTreeMap<MethodCode, String>,
    unknown: String,
}

impl MethodPalette {
    pub fn from_config(config: &StyleConfig) -> Result<Self> {
        let mut colors = BTreeMap::new();
        for (key, color) in &config.method_colors {
            let code: u32 = key.trim().parse().map_err(|_| {
                SeagrassError::Config(format!("style.method_colors key '{}' is not a method code", key))
            })?;
            if colors.insert(MethodCode(code), color.clone()).is_some() {
                return Err(SeagrassError::Config(format!(
                    "style.method_colors lists method {} more than once",
                    code
                )));
            }
        }
        Self::new(colors, config.unknown_method_color.clone())
    }

    pub fn new(colors: BTreeMap<MethodCode, String>, unknown: String) -> Result<Self> {
        check_css_color(&unknown)?;
        let mut seen = vec![unknown.trim().to_ascii_lowercase()];
        for (code, color) in &colors {
            check_css_color(color)?;
            let normalized = color.trim().to_ascii_lowercase();
            if seen.contains(&normalized) {
                return Err(SeagrassError::Config(format!(
                    "border color '{}' for method {} is already in use",
                    color, code
                )));
            }
            seen.push(normalized);
        }
        Ok(Self { colors, unknown })
    }

    pub fn color(&self, method: MethodCode) -> &str {
        self.colors.get(&method).unwrap_or(&self.unknown)
    }

    pub fn is_known(&self, method: MethodCode) -> bool {
        self.colors.contains_key(&method)
    }

    pub fn entries(&self) -> impl Iterator<Item = (MethodCode, &str)> + '_ {
        self.colors.iter().map(|(code, color)| (*code, color.as_str()))
    }

    pub fn unknown_color(&self) -> &str {
        &self.unknown
    }
}

#[derive(Debug, Clone)]
pub struct Styler {
    pub scale: ColorScale,
    pub palette: MethodPalette,
    pub border_weight: f64,
}

impl Styler {
    pub fn from_config(config: &StyleConfig) -> Result<Self> {
        Ok(Self {
            scale: ColorScale::from_config(config)?,
            palette: MethodPalette::from_config(config)?,
            border_weight: config.border_weight,
        })
    }

    pub fn bind(&self, record: &Record) -> StyleBinding {
        StyleBinding {
            fill_color: self.scale.color(record.plant_count).to_string(),
            fill_band: self.scale.band_index(record.plant_count),
            border_color: self.palette.color(record.method).to_string(),
        }
    }
}

// Colors end up inside inline CSS and JSON; keep them to plain tokens.
fn check_css_color(color: &str) -> Result<()> {
    let ok = !color.trim().is_empty()
        && color
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "#(),.% ".contains(c));
    if ok {
        Ok(())
    } else {
        Err(SeagrassError::Config(format!("'{}' is not a usable CSS color", color)))
    }
}
