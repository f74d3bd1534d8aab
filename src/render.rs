//! HTML map output: a Leaflet page with one styled polygon per plot.

use crate::config::MapConfig;
use crate::error::Result;
use crate::style::Styler;
use crate::types::{PlotPolygon, Record};
use geojson::{feature::Id, Feature, FeatureCollection, Geometry, JsonObject, Value};
use serde::Serialize;
use serde_json::json;
use tera::{Context, Tera};

const MAP_TEMPLATE_NAME: &str = "map.html";
const MAP_TEMPLATE: &str = include_str!("map.html");

#[derive(Debug, Clone, Serialize)]
struct MethodRow {
    code: u32,
    color: String,
}

#[derive(Debug, Clone, Serialize)]
struct BandRow {
    label: String,
    color: String,
}

pub struct MapDocument {
    pub features: FeatureCollection,
    methods: Vec<MethodRow>,
    // Set only when some plot uses a method without its own color
    unknown_color: Option<String>,
    bands: Vec<BandRow>,
    border_weight: f64,
}

impl MapDocument {
    /// Pairs each record with its plot; features keep input order so later
    /// plots are drawn on top of earlier ones.
    pub fn build(styler: &Styler, records: &[Record], plots: &[PlotPolygon]) -> Self {
        debug_assert_eq!(records.len(), plots.len());

        let features = records
            .iter()
            .zip(plots)
            .map(|(record, plot)| plot_feature(styler, record, plot))
            .collect();

        let has_unknown = records.iter().any(|r| !styler.palette.is_known(r.method));

        Self {
            features: FeatureCollection {
                bbox: None,
                features,
                foreign_members: None,
            },
            methods: styler
                .palette
                .entries()
                .map(|(code, color)| MethodRow {
                    code: code.0,
                    color: color.to_string(),
                })
                .collect(),
            unknown_color: has_unknown.then(|| styler.palette.unknown_color().to_string()),
            bands: styler
                .scale
                .legend()
                .into_iter()
                .map(|(label, color)| BandRow { label, color })
                .collect(),
            border_weight: styler.border_weight,
        }
    }

    pub fn to_geojson(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.features)?)
    }

    pub fn to_html(&self, view: &MapConfig) -> Result<String> {
        let mut tera = Tera::default();
        tera.add_raw_template(MAP_TEMPLATE_NAME, MAP_TEMPLATE)?;

        let mut context = Context::new();
        context.insert("methods", &self.methods);
        context.insert("unknown_color", &self.unknown_color);
        context.insert("bands", &self.bands);
        context.insert("zoom", &view.zoom);
        // Script values are pre-encoded JSON and bypass autoescaping
        context.insert("center", &script_json(&view.center)?);
        context.insert("tiles", &script_json(&view.tiles)?);
        context.insert("attribution", &script_json(&view.attribution)?);
        context.insert("weight", &script_json(&self.border_weight)?);
        context.insert("plots", &script_json(&self.features)?);

        Ok(tera.render(MAP_TEMPLATE_NAME, &context)?)
    }
}

fn plot_feature(styler: &Styler, record: &Record, plot: &PlotPolygon) -> Feature {
    let style = styler.bind(record);

    let mut properties = JsonObject::new();
    properties.insert("cell".to_string(), json!(record.cell_id));
    properties.insert("method".to_string(), json!(record.method.0));
    properties.insert("n_plants".to_string(), json!(record.plant_count));
    properties.insert("fill_color".to_string(), json!(style.fill_color));
    properties.insert("fill_band".to_string(), json!(style.fill_band));
    properties.insert("border_color".to_string(), json!(style.border_color));
    properties.insert("tooltip".to_string(), json!(tooltip_html(record)));

    Feature {
        bbox: None,
        geometry: Some(Geometry::new(Value::from(&plot.geometry))),
        id: Some(Id::String(record.cell_id.clone())),
        properties: Some(properties),
        foreign_members: None,
    }
}

fn tooltip_html(record: &Record) -> String {
    let plants = record
        .plant_count
        .map(|n| n.to_string())
        .unwrap_or_else(|| "n/a".to_string());
    format!(
        "<b>Plot number:</b> {}<br><b>Method:</b> {}<br><b>Number of plants:</b> {}",
        tera::escape_html(&record.cell_id),
        record.method,
        plants
    )
}

/// JSON that can sit inside a `<script>` element without closing it.
fn script_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?.replace('<', "\\u003c"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StyleConfig;
    use crate::geometry::build_plots;
    use crate::projection::{Hemisphere, Projection, UtmZone};
    use crate::types::MethodCode;

    fn record(id: &str, lat: f64, count: Option<u32>, method: u32) -> Record {
        Record {
            cell_id: id.to_string(),
            latitude: lat,
            longitude: 4.2,
            plant_count: count,
            method: MethodCode(method),
        }
    }

    fn document(records: &[Record]) -> MapDocument {
        let proj = Projection::utm(UtmZone::new(31, Hemisphere::North).unwrap());
        let plots = build_plots(records, &proj, 10.0).unwrap();
        let styler = Styler::from_config(&StyleConfig::default()).unwrap();
        MapDocument::build(&styler, records, &plots)
    }

    #[test]
    fn one_feature_per_record_in_input_order() {
        let records = vec![
            record("3", 51.449, Some(90), 3),
            record("1", 51.450, Some(0), 1),
            record("2", 51.451, None, 2),
        ];
        let doc = document(&records);
        let ids: Vec<String> = doc
            .features
            .features
            .iter()
            .map(|f| f.property("cell").and_then(|v| v.as_str()).unwrap().to_string())
            .collect();
        assert_eq!(ids, vec!["3", "1", "2"]);

        let first = &doc.features.features[0];
        assert_eq!(first.property("fill_color").unwrap(), "#006837");
        assert_eq!(first.property("border_color").unwrap(), "blue");
        let missing = &doc.features.features[2];
        assert!(missing.property("n_plants").unwrap().is_null());
        assert_eq!(missing.property("fill_band").unwrap(), 0);
        assert!(matches!(
            missing.geometry.as_ref().unwrap().value,
            Value::Polygon(_)
        ));
    }

    #[test]
    fn tooltip_shows_plot_fields_and_escapes_markup() {
        let html = tooltip_html(&record("<b>7</b>", 51.45, Some(12), 2));
        assert!(html.contains("Plot number:</b> &lt;b&gt;7&lt;&#x2F;b&gt;"));
        assert!(html.contains("Method:</b> 2"));
        assert!(html.contains("Number of plants:</b> 12"));
        assert!(tooltip_html(&record("1", 51.45, None, 2)).contains("n/a"));
    }

    #[test]
    fn html_embeds_view_and_plots() {
        let doc = document(&[record("1", 51.448749, Some(18), 1)]);
        let html = doc.to_html(&MapConfig::default()).unwrap();
        assert!(html.contains("setView([51.4501,4.1901], 15)"));
        assert!(html.contains("\"FeatureCollection\""));
        assert!(html.contains("weight: 4.0"));
        assert!(html.contains("Method 1 <i style=\"background:orange\">"));
        assert!(!html.contains("Other method"));
        assert!(!html.contains("{{"));
        assert!(!html.contains("{%"));
    }

    #[test]
    fn template_syntax_in_view_settings_stays_literal() {
        let doc = document(&[record("1", 51.45, Some(1), 1)]);
        let view = MapConfig {
            tiles: "https://tiles.example/{z}/{x}/{y}.png?{{ plots }}".to_string(),
            attribution: "Data __PLOTS__ survey {% raw %}".to_string(),
            ..MapConfig::default()
        };
        let html = doc.to_html(&view).unwrap();
        assert!(html.contains("attribution: \"Data __PLOTS__ survey {% raw %}\""));
        assert!(html.contains("\"https://tiles.example/{z}/{x}/{y}.png?{{ plots }}\""));
        assert_eq!(html.matches("\"type\":\"Feature\"").count(), 1);
    }

    #[test]
    fn legend_lists_every_reachable_band() {
        let doc = document(&[record("1", 51.45, Some(1), 1)]);
        let html = doc.to_html(&MapConfig::default()).unwrap();
        for (label, _) in Styler::from_config(&StyleConfig::default()).unwrap().scale.legend() {
            assert!(html.contains(&label), "legend row {} missing", label);
        }
    }

    #[test]
    fn unknown_methods_get_a_legend_row() {
        let doc = document(&[record("1", 51.45, Some(1), 9)]);
        let html = doc.to_html(&MapConfig::default()).unwrap();
        assert!(html.contains("Other method <i style=\"background:gray\">"));
    }

    #[test]
    fn cell_ids_cannot_break_out_of_the_script() {
        let doc = document(&[record("</script><script>alert(1)", 51.45, Some(1), 1)]);
        let html = doc.to_html(&MapConfig::default()).unwrap();
        assert_eq!(html.matches("</script>").count(), 2);
    }

    #[test]
    fn geojson_export_is_a_feature_collection() {
        let doc = document(&[record("1", 51.45, Some(1), 1), record("2", 51.46, Some(2), 2)]);
        let text = doc.to_geojson().unwrap();
        let parsed: geojson::GeoJson = text.parse().unwrap();
        match parsed {
            geojson::GeoJson::FeatureCollection(fc) => assert_eq!(fc.features.len(), 2),
            _ => panic!("expected a feature collection"),
        }
    }
}
