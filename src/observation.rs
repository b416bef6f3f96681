use chrono::{DateTime, SecondsFormat};
use serde::Serialize;
use serde_json::{Map, Value};

/// One reading of a weather station, normalized from whatever layout the
/// history api returned. `None` means the field was absent upstream, NaN means it
/// was present but not a number.
#[derive(Serialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    pub time_local: String,
    pub temp: Option<f64>,
    pub dew: Option<f64>,
    #[serde(rename = "rh")]
    pub humidity: Option<f64>,
    #[serde(rename = "pres")]
    pub pressure: Option<f64>,
    #[serde(rename = "w")]
    pub wind_speed: Option<f64>,
    pub gust: Option<f64>,
    #[serde(rename = "dir")]
    pub wind_dir: Option<f64>,
    pub precip: Option<f64>,
    pub uv: Option<f64>,
    #[serde(rename = "rad")]
    pub radiation: Option<f64>,
    pub temp_low: Option<f64>,
    pub temp_high: Option<f64>,
}

impl Observation {
    /// Temperature used for the min/max summary. Falls back to the low and
    /// high readings when the average is missing.
    pub fn stats_temp(&self) -> Option<f64> {
        self.temp.or(self.temp_low).or(self.temp_high)
    }
}

/// Where a field can be read from on a single upstream observation.
#[derive(Debug, Clone, Copy)]
enum Source {
    /// A field directly on the observation.
    Record(&'static str),
    /// A field of the nested `metric` object, or of the observation itself
    /// when it has no `metric` at all.
    Metric(&'static str),
}

use self::Source::{Metric, Record};

const TEMP: &[Source] = &[Metric("tempAvg"), Metric("temp")];
const DEW: &[Source] = &[Metric("dewptAvg"), Metric("dewpt")];
const HUMIDITY: &[Source] = &[Record("humidityAvg"), Metric("humidity")];
const PRESSURE: &[Source] = &[
    Metric("pressure"),
    Metric("pressureMax"),
    Metric("pressureMin"),
];
const WIND_SPEED: &[Source] = &[Metric("windspeedAvg"), Metric("windspeed")];
const GUST: &[Source] = &[Metric("windgustHigh"), Metric("windgust")];
const WIND_DIR: &[Source] = &[Record("winddirAvg"), Metric("winddir")];
const PRECIP: &[Source] = &[Metric("precipRate"), Metric("precipTotal")];
const UV: &[Source] = &[Record("uvHigh"), Record("uv")];
const RADIATION: &[Source] = &[Record("solarRadiationHigh"), Record("solarRadiation")];
const TEMP_LOW: &[Source] = &[Metric("tempLow")];
const TEMP_HIGH: &[Source] = &[Metric("tempHigh")];

/// A single upstream observation and the map its metric fields are read from.
struct RawObservation<'a> {
    record: Option<&'a Map<String, Value>>,
    metric: Option<&'a Map<String, Value>>,
}

impl<'a> RawObservation<'a> {
    fn new(value: &'a Value) -> Self {
        let record = value.as_object();
        // A non-null `metric` is the only metric source, even when it is empty
        // or not an object.
        let metric = match record.and_then(|r| defined(r.get("metric"))) {
            Some(nested) => nested.as_object(),
            None => record,
        };
        RawObservation { record, metric }
    }

    fn flat(&self, key: &str) -> Option<&'a Value> {
        defined(self.record?.get(key))
    }

    fn get(&self, source: Source) -> Option<&'a Value> {
        match source {
            Record(key) => self.flat(key),
            Metric(key) => defined(self.metric?.get(key)),
        }
    }

    fn number(&self, sources: &[Source]) -> Option<f64> {
        first_defined(sources.iter().map(|s| self.get(*s))).map(as_number)
    }

    fn time_local(&self) -> String {
        let text = first_defined(
            ["obsTimeLocal", "obsTimeUtc"]
                .into_iter()
                .map(|key| self.flat(key).and_then(Value::as_str)),
        );
        match text {
            Some(text) => text.to_string(),
            None => self
                .flat("epoch")
                .map(as_number)
                .filter(|epoch| epoch.is_finite())
                .and_then(|epoch| epoch_to_iso(epoch as i64))
                .unwrap_or_default(),
        }
    }
}

/// Returns the first candidate that holds a value.
pub fn first_defined<T>(candidates: impl IntoIterator<Item = Option<T>>) -> Option<T> {
    candidates.into_iter().flatten().next()
}

fn defined(value: Option<&Value>) -> Option<&Value> {
    value.filter(|v| !v.is_null())
}

fn as_number(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::String(s) => s.trim().parse().unwrap_or(f64::NAN),
        _ => f64::NAN,
    }
}

fn epoch_to_iso(epoch: i64) -> Option<String> {
    if epoch == 0 {
        return None;
    }
    DateTime::from_timestamp(epoch, 0).map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Extracts the observation list from a history response. Accepts both
/// `{"observations": [...]}` and a bare array; anything else yields nothing.
pub fn normalize(payload: &Value) -> Vec<Observation> {
    let list = match payload.get("observations").and_then(Value::as_array) {
        Some(list) => list,
        None => match payload.as_array() {
            Some(list) => list,
            None => return Vec::new(),
        },
    };
    list.iter().map(|o| from_raw(&RawObservation::new(o))).collect()
}

fn from_raw(raw: &RawObservation) -> Observation {
    Observation {
        time_local: raw.time_local(),
        temp: raw.number(TEMP),
        dew: raw.number(DEW),
        humidity: raw.number(HUMIDITY),
        pressure: raw.number(PRESSURE),
        wind_speed: raw.number(WIND_SPEED),
        gust: raw.number(GUST),
        wind_dir: raw.number(WIND_DIR),
        precip: raw.number(PRECIP),
        uv: raw.number(UV),
        radiation: raw.number(RADIATION),
        temp_low: raw.number(TEMP_LOW),
        temp_high: raw.number(TEMP_HIGH),
    }
}
