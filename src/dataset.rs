//! Reading the input table and merging coordinates into it.

use crate::error::GeoCacheError;
use crate::types::geo_result::GeoResult;
use log::info;
use polars::prelude::*;
use std::path::{Path, PathBuf};
use tokio::task;

pub const LATITUDE: &str = "latitude";
pub const LONGITUDE: &str = "longitude";

/// Reads a CSV file with a header row into a `DataFrame`.
///
/// Columns are passed through as Polars infers them. Nothing beyond the header is
/// required here; the city column is checked when the table is geocoded.
pub async fn load_dataset(path: impl AsRef<Path>) -> Result<DataFrame, GeoCacheError> {
    let path: PathBuf = path.as_ref().to_path_buf();
    let df = task::spawn_blocking(move || {
        CsvReadOptions::default()
            .with_has_header(true)
            .try_into_reader_with_file_path(Some(path.clone()))
            .and_then(|reader| reader.finish())
            .map_err(|e| GeoCacheError::InputRead(path, e))
    })
    .await??;
    info!(
        "Loaded input dataset with {} rows and {} columns",
        df.height(),
        df.width()
    );
    Ok(df)
}

/// Returns the city cell of every row, in row order. Null cells come back as `None`.
pub fn city_names(df: &DataFrame, column: &str) -> Result<Vec<Option<String>>, GeoCacheError> {
    let city = df
        .column(column)
        .map_err(|_| GeoCacheError::MissingColumn {
            column: column.to_string(),
        })?
        .cast(&DataType::String)
        .map_err(|e| GeoCacheError::InvalidColumnType {
            column: column.to_string(),
            expected: "text",
            source: e,
        })?;
    let names = city
        .as_materialized_series()
        .str()
        .map_err(|e| GeoCacheError::InvalidColumnType {
            column: column.to_string(),
            expected: "text",
            source: e,
        })?
        .into_iter()
        .map(|name| name.map(str::to_string))
        .collect();
    Ok(names)
}

/// Appends `latitude` and `longitude` columns built from `results`, one per row.
///
/// Existing coordinate columns are replaced. A miss yields null in both columns.
pub fn merge_geo_results(
    mut df: DataFrame,
    results: &[GeoResult],
) -> Result<DataFrame, GeoCacheError> {
    if results.len() != df.height() {
        return Err(GeoCacheError::RowCountMismatch {
            expected: df.height(),
            found: results.len(),
        });
    }

    for name in [LATITUDE, LONGITUDE] {
        if df.get_column_index(name).is_some() {
            df.drop_in_place(name)?;
        }
    }

    let latitudes: Vec<Option<f64>> = results.iter().map(GeoResult::latitude).collect();
    let longitudes: Vec<Option<f64>> = results.iter().map(GeoResult::longitude).collect();
    df.with_column(Series::new(LATITUDE.into(), latitudes))?;
    df.with_column(Series::new(LONGITUDE.into(), longitudes))?;
    Ok(df)
}

/// Gives all-null coordinate columns the `Float64` type.
///
/// A CSV artifact whose coordinates are all empty would otherwise come back as
/// text. Columns holding any value are left exactly as read.
pub(crate) fn normalize_coordinate_columns(df: &mut DataFrame) -> PolarsResult<()> {
    for name in [LATITUDE, LONGITUDE] {
        let Some(column) = df.column(name).ok() else {
            continue;
        };
        if column.dtype() != &DataType::Float64 && column.null_count() == column.len() {
            let cast = column.cast(&DataType::Float64)?;
            df.with_column(cast)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::geo_result::LatLon;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_load_dataset_passes_columns_through() -> Result<(), GeoCacheError> {
        let mut file = NamedTempFile::new().expect("temp file");
        writeln!(file, "city,jan,avg\n\"Delhi, India\",180,165\n\"Oslo, Norway\",22,19")
            .expect("write fixture");

        let df = load_dataset(file.path()).await?;

        assert_eq!(df.height(), 2);
        let columns: Vec<&str> = df.get_column_names().iter().map(|c| c.as_str()).collect();
        assert_eq!(columns, ["city", "jan", "avg"]);
        assert_eq!(
            city_names(&df, "city")?,
            [Some("Delhi, India".to_string()), Some("Oslo, Norway".to_string())]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_load_missing_file_is_an_input_error() {
        let result = load_dataset("/definitely/not/here/aqi_data.csv").await;
        assert!(matches!(result, Err(GeoCacheError::InputRead(..))));
    }

    #[test]
    fn test_missing_city_column() {
        let df = df!("town" => ["Paris"]).expect("frame");
        assert!(matches!(
            city_names(&df, "city"),
            Err(GeoCacheError::MissingColumn { .. })
        ));
    }

    #[test]
    fn test_city_names_keep_nulls() -> Result<(), GeoCacheError> {
        let df = df!("city" => [Some("Paris"), None, Some("")])?;
        assert_eq!(
            city_names(&df, "city")?,
            [Some("Paris".to_string()), None, Some(String::new())]
        );
        Ok(())
    }

    #[test]
    fn test_merge_replaces_existing_coordinates() -> Result<(), GeoCacheError> {
        let df = df!(
            "city" => ["Springfield", "Nowhereville"],
            LATITUDE => ["stale", "stale"]
        )?;
        let merged = merge_geo_results(
            df,
            &[GeoResult::Found(LatLon(39.8, -89.6)), GeoResult::Miss],
        )?;

        let columns: Vec<&str> = merged
            .get_column_names()
            .iter()
            .map(|c| c.as_str())
            .collect();
        assert_eq!(columns, ["city", LATITUDE, LONGITUDE]);
        let lat: Vec<Option<f64>> = merged
            .column(LATITUDE)?
            .as_materialized_series()
            .f64()?
            .into_iter()
            .collect();
        let lon: Vec<Option<f64>> = merged
            .column(LONGITUDE)?
            .as_materialized_series()
            .f64()?
            .into_iter()
            .collect();
        assert_eq!(lat, [Some(39.8), None]);
        assert_eq!(lon, [Some(-89.6), None]);
        Ok(())
    }

    #[test]
    fn test_merge_rejects_wrong_length() -> Result<(), GeoCacheError> {
        let df = df!("city" => ["Springfield", "Nowhereville"])?;
        assert!(matches!(
            merge_geo_results(df, &[GeoResult::Miss]),
            Err(GeoCacheError::RowCountMismatch {
                expected: 2,
                found: 1
            })
        ));
        Ok(())
    }
}
