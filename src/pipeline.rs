use crate::config::AppConfig;
use crate::data;
use crate::error::Result;
use crate::geometry;
use crate::output;
use crate::projection::Projection;
use crate::render::MapDocument;
use crate::style::Styler;
use crate::types::Record;
use std::path::PathBuf;

#[derive(Debug)]
pub struct RunSummary {
    pub plots: usize,
    pub overlapping_pairs: usize,
    pub html: PathBuf,
    pub geojson: Option<PathBuf>,
    pub opened: bool,
}

/// Survey file when one is configured and present, random records otherwise.
pub fn load_or_generate(config: &AppConfig) -> Result<Vec<Record>> {
    match &config.input.data_file {
        Some(path) if path.exists() => data::load_records(path),
        Some(path) => {
            tracing::warn!("Data file {:?} not found, generating random records instead", path);
            data::generate_records(&config.random)
        }
        None => data::generate_records(&config.random),
    }
}

/// Load → plot geometry → style → HTML, then open the result.
pub fn run(config: &AppConfig) -> Result<RunSummary> {
    config.validate()?;

    let records = load_or_generate(config)?;

    let projection = Projection::utm(config.zone()?);
    let plots = geometry::build_plots(&records, &projection, config.grid.size_meters)?;

    let overlaps = geometry::find_overlaps(&plots);
    if !overlaps.is_empty() {
        tracing::warn!(
            "{} pairs of plots overlap (first: cells {} and {}); later plots are drawn on top",
            overlaps.len(),
            records[overlaps[0].0].cell_id,
            records[overlaps[0].1].cell_id
        );
    }

    let styler = Styler::from_config(&config.style)?;
    let document = MapDocument::build(&styler, &records, &plots);
    let html = document.to_html(&config.map)?;
    let geojson = match &config.output.geojson {
        Some(path) => Some((path, document.to_geojson()?)),
        None => None,
    };

    // The map is written last, so a failed export never leaves a fresh map behind
    if let Some((path, text)) = &geojson {
        output::write_geojson(path, text)?;
    }
    output::write_map(&config.output.html, &html)?;

    let opened = config.output.open_browser
        && output::open_in_viewer(&config.output.html, config.output.viewer.as_deref());

    Ok(RunSummary {
        plots: plots.len(),
        overlapping_pairs: overlaps.len(),
        html: config.output.html.clone(),
        geojson: config.output.geojson.clone(),
        opened,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SeagrassError;
    use std::fs;

    fn config_in(dir: &std::path::Path) -> AppConfig {
        let mut config = AppConfig::default();
        config.output.html = dir.join("seagrass_map.html");
        config.output.open_browser = false;
        config
    }

    #[test]
    fn renders_survey_file_to_html() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("plots.txt");
        fs::write(
            &input,
            "cell\tlatitude\tlongitude\tn_seagrass_plants\tmethod\n\
             1\t51.448749\t4.202215\t18\t1\n\
             2\t51.450274\t4.197732\t22\t1\n",
        )
        .unwrap();

        let mut config = config_in(dir.path());
        config.input.data_file = Some(input);
        config.grid.size_meters = 10.0;
        config.output.geojson = Some(dir.path().join("plots.geojson"));

        let summary = run(&config).unwrap();
        assert_eq!(summary.plots, 2);
        assert_eq!(summary.overlapping_pairs, 0);
        assert!(!summary.opened);

        let html = fs::read_to_string(&config.output.html).unwrap();
        assert!(html.contains("Plot number:"));
        assert_eq!(html.matches("\"type\":\"Feature\"").count(), 2);
        assert!(dir.path().join("plots.geojson").exists());
    }

    #[test]
    fn header_only_file_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("plots.txt");
        fs::write(&input, "cell\tlatitude\tlongitude\tn_seagrass_plants\tmethod\n").unwrap();

        let mut config = config_in(dir.path());
        config.input.data_file = Some(input);

        assert!(matches!(run(&config), Err(SeagrassError::EmptyDataset(_))));
        assert!(!config.output.html.exists());
    }

    #[test]
    fn random_mode_when_no_file_is_configured() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_in(dir.path());
        config.random.count = 5;
        config.random.seed = Some(1);

        let records = load_or_generate(&config).unwrap();
        assert_eq!(records.len(), 5);

        let summary = run(&config).unwrap();
        assert_eq!(summary.plots, 5);
    }

    #[test]
    fn missing_data_file_falls_back_to_random_records() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_in(dir.path());
        config.input.data_file = Some(dir.path().join("absent.txt"));
        config.random.count = 3;
        assert_eq!(load_or_generate(&config).unwrap().len(), 3);
    }

    #[test]
    fn projection_failure_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("plots.txt");
        fs::write(
            &input,
            "cell\tlatitude\tlongitude\tn_seagrass_plants\tmethod\n1\t51.45\t120.0\t3\t1\n",
        )
        .unwrap();

        let mut config = config_in(dir.path());
        config.input.data_file = Some(input);

        assert!(matches!(run(&config), Err(SeagrassError::Projection(_))));
        assert!(!config.output.html.exists());
    }

    #[test]
    fn failed_geojson_export_leaves_no_map() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "x").unwrap();

        let mut config = config_in(dir.path());
        config.random.count = 3;
        config.output.geojson = Some(blocker.join("plots.geojson"));

        assert!(matches!(run(&config), Err(SeagrassError::OutputWrite { .. })));
        assert!(!config.output.html.exists());
    }

    #[test]
    fn viewer_failure_still_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_in(dir.path());
        config.random.count = 2;
        config.output.open_browser = true;
        config.output.viewer = Some("/nonexistent/seagrass-viewer".to_string());

        let summary = run(&config).unwrap();
        assert!(!summary.opened);
        assert!(config.output.html.exists());
    }
}
