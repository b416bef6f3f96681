use serde::Serialize;

use crate::observation::Observation;

/// Shown in place of a missing or unusable value.
pub const PLACEHOLDER: &str = "—";

pub const HEADERS: [&str; 11] = [
    "Time (local)",
    "Temp (°C)",
    "Dew point (°C)",
    "Humidity (%)",
    "Pressure (hPa)",
    "Wind (km/h)",
    "Gust (km/h)",
    "Direction (°)",
    "Precip (mm)",
    "UV",
    "Solar (W/m²)",
];

/// Formats a value with a fixed number of decimals. Exact halves round away
/// from zero.
pub fn fmt(value: Option<f64>, digits: usize) -> String {
    match value {
        Some(v) if v.is_finite() => to_fixed(v, digits),
        _ => PLACEHOLDER.to_string(),
    }
}

/// Extra decimals printed to tell an exact half from a value just next to it.
const TIE_GUARD: usize = 30;

fn to_fixed(v: f64, digits: usize) -> String {
    let magnitude = v.abs();
    let exact = format!("{magnitude:.prec$}", prec = digits + TIE_GUARD);
    let (kept, rest) = exact.split_at(exact.len() - TIE_GUARD);
    let is_tie = rest.starts_with('5') && rest[1..].bytes().all(|b| b == b'0');
    let rounded = if is_tie {
        round_up(kept.trim_end_matches('.'))
    } else {
        format!("{magnitude:.digits$}")
    };
    if v < 0.0 {
        format!("-{rounded}")
    } else {
        rounded
    }
}

/// Adds one unit in the last place of a plain decimal string.
fn round_up(decimal: &str) -> String {
    let mut chars: Vec<char> = decimal.chars().collect();
    for c in chars.iter_mut().rev() {
        match *c {
            '.' => continue,
            '9' => *c = '0',
            _ => {
                *c = char::from(*c as u8 + 1);
                return chars.into_iter().collect();
            }
        }
    }
    std::iter::once('1').chain(chars).collect()
}

#[derive(Serialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub count: usize,
    pub min_temp: Option<f64>,
    pub max_temp: Option<f64>,
}

impl Summary {
    pub fn from_observations(observations: &[Observation]) -> Self {
        let mut summary = Summary {
            count: observations.len(),
            ..Default::default()
        };
        let temps = observations
            .iter()
            .filter_map(Observation::stats_temp)
            .filter(|t| t.is_finite());
        for t in temps {
            summary.min_temp = Some(summary.min_temp.map_or(t, |m| m.min(t)));
            summary.max_temp = Some(summary.max_temp.map_or(t, |m| m.max(t)));
        }
        summary
    }

    pub fn min_label(&self) -> String {
        temp_label(self.min_temp)
    }

    pub fn max_label(&self) -> String {
        temp_label(self.max_temp)
    }
}

fn temp_label(temp: Option<f64>) -> String {
    match temp {
        Some(_) => format!("{} °C", fmt(temp, 1)),
        None => PLACEHOLDER.to_string(),
    }
}

/// The rendered history: display strings for every cell and the KPIs.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub summary: Summary,
}

impl Table {
    pub fn render(observations: &[Observation]) -> Self {
        Table {
            headers: HEADERS.iter().map(|h| h.to_string()).collect(),
            rows: observations.iter().map(render_row).collect(),
            summary: Summary::from_observations(observations),
        }
    }

    /// Lays the table out as aligned columns for a terminal.
    pub fn to_text(&self) -> String {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.chars().count()).collect();
        for row in &self.rows {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.chars().count());
            }
        }
        let line = |cells: &[String]| {
            cells
                .iter()
                .zip(&widths)
                .map(|(cell, width)| {
                    let pad = width - cell.chars().count();
                    format!("{}{cell}", " ".repeat(pad))
                })
                .collect::<Vec<_>>()
                .join("  ")
        };
        let mut out = line(self.headers.as_slice());
        out.push('\n');
        for row in &self.rows {
            out.push_str(&line(row.as_slice()));
            out.push('\n');
        }
        out
    }
}

fn render_row(o: &Observation) -> Vec<String> {
    vec![
        o.time_local.clone(),
        fmt(o.temp, 1),
        fmt(o.dew, 1),
        fmt(o.humidity, 0),
        fmt(o.pressure, 1),
        fmt(o.wind_speed, 1),
        fmt(o.gust, 1),
        fmt(o.wind_dir, 0),
        fmt(o.precip, 2),
        fmt(o.uv, 0),
        fmt(o.radiation, 0),
    ]
}
