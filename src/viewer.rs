//! Static HTML track viewer: a Leaflet map of the track and a Plotly
//! elevation-vs-distance profile, with all data embedded in the page.

use quick_xml::escape::escape;

use crate::converter::to_feature_collection;
use crate::gpx_types::RenderPoint;

const LEAFLET_CSS: &str = "https://unpkg.com/leaflet@1.9.4/dist/leaflet.css";
const LEAFLET_JS: &str = "https://unpkg.com/leaflet@1.9.4/dist/leaflet.js";
const PLOTLY_JS: &str = "https://cdn.plot.ly/plotly-2.35.2.min.js";

/// Render the viewer page for `points`.
pub fn render_html(title: &str, points: &[RenderPoint]) -> Result<String, serde_json::Error> {
    let geojson = serde_json::to_string(&to_feature_collection(points, Some(title)))?;
    let profile = serde_json::to_string(&profile_series(points))?;
    let title = escape(title);

    Ok(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{title}</title>
<link rel="stylesheet" href="{LEAFLET_CSS}">
<script src="{LEAFLET_JS}"></script>
<script src="{PLOTLY_JS}"></script>
<style>
  body {{ margin: 0; font-family: sans-serif; }}
  h1 {{ font-size: 1.2em; margin: 0.5em; }}
  #map {{ height: 60vh; }}
  #profile {{ height: 35vh; }}
</style>
</head>
<body>
<h1>{title}</h1>
<div id="map"></div>
<div id="profile"></div>
<script>
const track = {geojson};
const profile = {profile};
const map = L.map("map");
L.tileLayer("https://{{s}}.tile.openstreetmap.org/{{z}}/{{x}}/{{y}}.png", {{
  attribution: "&copy; OpenStreetMap contributors"
}}).addTo(map);
const layer = L.geoJSON(track).addTo(map);
if (layer.getBounds().isValid()) {{
  map.fitBounds(layer.getBounds());
}} else {{
  map.setView([0, 0], 2);
}}
Plotly.newPlot("profile", [{{ x: profile.distance_km, y: profile.elevation, mode: "lines" }}], {{
  title: "Elevation profile",
  xaxis: {{ title: "Distance (km)" }},
  yaxis: {{ title: "Elevation (m)" }}
}});
</script>
</body>
</html>
"#,
        geojson = script_safe(&geojson),
        profile = script_safe(&profile),
    ))
}

#[derive(serde::Serialize)]
struct ProfileSeries {
    distance_km: Vec<f64>,
    elevation: Vec<Option<f64>>,
}

fn profile_series(points: &[RenderPoint]) -> ProfileSeries {
    ProfileSeries {
        distance_km: points.iter().map(|p| p.distance_km).collect(),
        elevation: points.iter().map(|p| p.elevation).collect(),
    }
}

/// Keep embedded JSON from closing the surrounding `<script>` element.
fn script_safe(json: &str) -> String {
    json.replace("</", "<\\/")
}
