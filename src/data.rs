use crate::config::RandomDataConfig;
use crate::error::{Result, SeagrassError};
use crate::output;
use crate::types::{MethodCode, Record};
use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::fs;
use std::path::Path;

pub const COLUMNS: [&str; 5] = ["cell", "latitude", "longitude", "n_seagrass_plants", "method"];

/// Reads survey records from a tab- or whitespace-delimited file.
pub fn load_records(path: &Path) -> Result<Vec<Record>> {
    tracing::info!("Loading survey records from {:?}", path);
    let content = fs::read_to_string(path)
        .map_err(|e| SeagrassError::DataFormat(format!("cannot read {:?}: {}", path, e)))?;

    let records = parse_records(&content)?;
    if records.is_empty() {
        return Err(SeagrassError::EmptyDataset(Some(path.to_path_buf())));
    }

    tracing::info!("Loaded {} records", records.len());
    Ok(records)
}

pub fn parse_records(content: &str) -> Result<Vec<Record>> {
    // Keep the original line numbers for error messages; blank lines are dropped.
    let lines: Vec<(usize, &str)> = content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| (i + 1, line))
        .collect();

    let Some(&(_, header_line)) = lines.first() else {
        return Err(SeagrassError::DataFormat("file has no header line".to_string()));
    };

    let normalized = if header_line.contains('\t') {
        lines.iter().map(|(_, l)| *l).collect::<Vec<_>>().join("\n")
    } else {
        lines
            .iter()
            .map(|(_, l)| l.split_whitespace().collect::<Vec<_>>().join("\t"))
            .collect::<Vec<_>>()
            .join("\n")
    };

    let mut rdr = ReaderBuilder::new()
        .delimiter(b'\t')
        .flexible(true)
        .quoting(false)
        .trim(csv::Trim::All)
        .from_reader(normalized.as_bytes());

    let headers = rdr
        .headers()
        .map_err(|e| SeagrassError::DataFormat(format!("unreadable header: {}", e)))?
        .clone();
    check_header(&headers)?;

    let mut records = Vec::new();
    for (i, result) in rdr.records().enumerate() {
        let line_no = lines.get(i + 1).map(|(n, _)| *n).unwrap_or(i + 2);
        let row = result.map_err(|e| SeagrassError::DataFormat(format!("line {}: {}", line_no, e)))?;
        records.push(parse_row(&row, line_no)?);
    }

    Ok(records)
}

fn check_header(headers: &StringRecord) -> Result<()> {
    let found: Vec<&str> = headers.iter().collect();
    if found != COLUMNS {
        return Err(SeagrassError::DataFormat(format!(
            "expected header columns {:?}, found {:?}",
            COLUMNS, found
        )));
    }
    Ok(())
}

fn parse_row(row: &StringRecord, line_no: usize) -> Result<Record> {
    if row.len() != COLUMNS.len() {
        return Err(SeagrassError::DataFormat(format!(
            "line {}: expected {} columns, found {}",
            line_no,
            COLUMNS.len(),
            row.len()
        )));
    }

    let field = |idx: usize| row.get(idx).unwrap_or("");
    let bad = |idx: usize, what: &str| {
        SeagrassError::DataFormat(format!(
            "line {}: column '{}' value '{}' is not {}",
            line_no,
            COLUMNS[idx],
            field(idx),
            what
        ))
    };

    let cell_id = field(0).to_string();
    if cell_id.is_empty() {
        return Err(bad(0, "a cell identifier"));
    }

    let coordinate = |idx: usize| -> Result<f64> {
        field(idx)
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| bad(idx, "a finite number"))
    };
    let latitude = coordinate(1)?;
    let longitude = coordinate(2)?;

    let plant_count = match field(3) {
        "" => None,
        s => Some(s.parse::<u32>().map_err(|_| bad(3, "a non-negative integer"))?),
    };

    let method = field(4)
        .parse::<u32>()
        .map(MethodCode)
        .map_err(|_| bad(4, "a method code"))?;

    Ok(Record {
        cell_id,
        latitude,
        longitude,
        plant_count,
        method,
    })
}

/// Synthesizes survey records inside the configured bounding box.
pub fn generate_records(config: &RandomDataConfig) -> Result<Vec<Record>> {
    check_random_config(config)?;
    if config.count == 0 {
        return Err(SeagrassError::EmptyDataset(None));
    }

    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    tracing::info!(
        "Generating {} random records in [{}, {}] x [{}, {}]",
        config.count,
        config.min_lat,
        config.max_lat,
        config.min_lon,
        config.max_lon
    );

    let records = (0..config.count)
        .map(|i| {
            let plant_count = rng.gen_range(config.plants_min..=config.plants_max);
            let latitude = rng.gen_range(config.min_lat..=config.max_lat);
            let longitude = rng.gen_range(config.min_lon..=config.max_lon);
            let method = *config.methods.choose(&mut rng).unwrap_or(&config.methods[0]);
            Record {
                cell_id: (i + 1).to_string(),
                latitude,
                longitude,
                plant_count: Some(plant_count),
                method: MethodCode(method),
            }
        })
        .collect();

    Ok(records)
}

fn check_random_config(config: &RandomDataConfig) -> Result<()> {
    let range_ok = |lo: f64, hi: f64| lo.is_finite() && hi.is_finite() && lo <= hi;
    if !range_ok(config.min_lat, config.max_lat) || !range_ok(config.min_lon, config.max_lon) {
        return Err(SeagrassError::DataFormat(format!(
            "random data bounds [{}, {}] x [{}, {}] are not a valid box",
            config.min_lat, config.max_lat, config.min_lon, config.max_lon
        )));
    }
    if config.plants_min > config.plants_max {
        return Err(SeagrassError::DataFormat(format!(
            "plants_min {} exceeds plants_max {}",
            config.plants_min, config.plants_max
        )));
    }
    if config.methods.is_empty() {
        return Err(SeagrassError::DataFormat("random method set is empty".to_string()));
    }
    Ok(())
}

/// Writes records in the tab-delimited survey format.
pub fn write_records(path: &Path, records: &[Record]) -> Result<()> {
    let write_err = |e: std::io::Error| SeagrassError::OutputWrite {
        path: path.to_path_buf(),
        source: e,
    };

    let mut wtr = WriterBuilder::new()
        .delimiter(b'\t')
        .quote_style(csv::QuoteStyle::Never)
        .from_writer(Vec::new());

    wtr.write_record(COLUMNS).map_err(|e| write_err(e.into()))?;
    for r in records {
        let plants = r.plant_count.map(|n| n.to_string()).unwrap_or_default();
        wtr.write_record([
            r.cell_id.clone(),
            format!("{:.6}", r.latitude),
            format!("{:.6}", r.longitude),
            plants,
            r.method.to_string(),
        ])
        .map_err(|e| write_err(e.into()))?;
    }

    let bytes = wtr.into_inner().map_err(|e| write_err(e.into_error()))?;
    output::write_atomic(path, &bytes)?;
    tracing::info!("Wrote {} records to {:?}", records.len(), path);
    Ok(())
}
