use chrono::{NaiveDate, Utc};
use std::path::{Path, PathBuf};

use crate::error::ClientError;
use crate::table::Table;

/// Name of the export file for the given day, e.g. `wu_2024-05-01.csv`.
pub fn csv_filename(today: NaiveDate) -> String {
    format!("wu_{}.csv", today.format("%Y-%m-%d"))
}

pub fn default_filename() -> String {
    csv_filename(Utc::now().date_naive())
}

fn writer<W: std::io::Write>(out: W) -> csv::Writer<W> {
    csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(out)
}

fn write_table<W: std::io::Write>(table: &Table, out: &mut csv::Writer<W>) -> csv::Result<()> {
    out.write_record(&table.headers)?;
    for row in &table.rows {
        out.write_record(row)?;
    }
    out.flush()?;
    Ok(())
}

/// Serializes the header row and every body row, quoting every field.
pub fn to_csv(table: &Table) -> csv::Result<String> {
    let mut out = writer(Vec::new());
    write_table(table, &mut out)?;
    let bytes = out
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))?;
    String::from_utf8(bytes)
        .map_err(|e| csv::Error::from(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))
}

/// Writes the table to `dir` under the default export name and returns the path.
pub fn write_csv(table: &Table, dir: &Path) -> Result<PathBuf, ClientError> {
    if !dir.exists() {
        std::fs::create_dir_all(dir)?;
    }
    let path = dir.join(default_filename());
    let mut out = writer(std::fs::File::create(&path)?);
    write_table(table, &mut out)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observation::Observation;

    fn table_with_time(time: &str) -> Table {
        Table::render(&[Observation {
            time_local: time.to_string(),
            temp: Some(12.0),
            ..Default::default()
        }])
    }

    #[test]
    fn every_field_is_quoted() {
        let csv = to_csv(&table_with_time("2024-05-01 12:00:00")).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next().unwrap(),
            "\"Time (local)\",\"Temp (°C)\",\"Dew point (°C)\",\"Humidity (%)\",\
             \"Pressure (hPa)\",\"Wind (km/h)\",\"Gust (km/h)\",\"Direction (°)\",\
             \"Precip (mm)\",\"UV\",\"Solar (W/m²)\""
        );
        assert_eq!(
            lines.next().unwrap(),
            "\"2024-05-01 12:00:00\",\"12.0\",\"—\",\"—\",\"—\",\"—\",\"—\",\"—\",\"—\",\"—\",\"—\""
        );
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn embedded_quotes_are_doubled_and_read_back() {
        let original = r#"station "north" 12:00"#;
        let csv = to_csv(&table_with_time(original)).unwrap();
        assert!(csv.contains(r#""station ""north"" 12:00""#));

        let mut reader = csv::Reader::from_reader(csv.as_bytes());
        let record = reader.records().next().unwrap().unwrap();
        assert_eq!(&record[0], original);
    }

    #[test]
    fn empty_table_still_has_header() {
        let csv = to_csv(&Table::render(&[])).unwrap();
        assert_eq!(csv.lines().count(), 1);
    }

    #[test]
    fn filename_carries_the_date() {
        let day = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        assert_eq!(csv_filename(day), "wu_2024-05-01.csv");
    }

    #[test]
    fn writes_file_into_directory() {
        let dir = std::env::temp_dir().join(format!("wu_history_export_{}", std::process::id()));
        let path = write_csv(&table_with_time("12:00"), &dir).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, to_csv(&table_with_time("12:00")).unwrap());
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn unusable_directory_is_an_io_error() {
        let file = std::env::temp_dir().join(format!("wu_history_not_a_dir_{}", std::process::id()));
        std::fs::write(&file, "occupied").unwrap();
        let err = write_csv(&table_with_time("12:00"), &file.join("exports")).unwrap_err();
        assert!(matches!(err, ClientError::Io(_)), "{err:?}");
        std::fs::remove_file(&file).unwrap();
    }
}
