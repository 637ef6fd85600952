use crate::dataset::normalize_coordinate_columns;
use crate::store::error::CacheError;
use crate::store::CacheStore;
use crate::utils::{ensure_cache_dir_exists, get_cache_dir};
use async_trait::async_trait;
use log::{info, warn};
use polars::prelude::*;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::{fs, task};

pub const DEFAULT_CACHE_FILE_NAME: &str = "aqi_geo.csv";

/// On-disk encoding of the cache artifact, picked from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheFormat {
    Csv,
    Parquet,
}

impl CacheFormat {
    pub fn from_path(path: &Path) -> Result<Self, CacheError> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());
        match extension.as_deref() {
            Some("csv") => Ok(CacheFormat::Csv),
            Some("parquet") | Some("pq") => Ok(CacheFormat::Parquet),
            _ => Err(CacheError::UnsupportedFormat(path.to_path_buf())),
        }
    }
}

/// Stores the enriched table as a single CSV or Parquet file.
///
/// Writes go to a temporary file next to the target which is then renamed over
/// it, so a crash mid-write never leaves a half-written artifact behind.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
    format: CacheFormat,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, CacheError> {
        let path = path.into();
        let format = CacheFormat::from_path(&path)?;
        Ok(Self { path, format })
    }

    /// A store at `<user cache dir>/aqi_geo_cache/aqi_geo.csv`.
    pub fn in_default_cache_dir() -> Result<Self, CacheError> {
        Self::new(get_cache_dir()?.join(DEFAULT_CACHE_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> CacheFormat {
        self.format
    }

    fn parent_dir(&self) -> PathBuf {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    fn read_frame(path: &Path, format: CacheFormat) -> Result<DataFrame, CacheError> {
        let mut df = match format {
            CacheFormat::Csv => CsvReadOptions::default()
                .with_has_header(true)
                .try_into_reader_with_file_path(Some(path.to_path_buf()))
                .map_err(|e| CacheError::ReadPolars(path.to_path_buf(), e))?
                .finish()
                .map_err(|e| CacheError::ReadPolars(path.to_path_buf(), e))?,
            CacheFormat::Parquet => {
                let file = std::fs::File::open(path)
                    .map_err(|e| CacheError::ReadIo(path.to_path_buf(), e))?;
                ParquetReader::new(file)
                    .finish()
                    .map_err(|e| CacheError::ReadPolars(path.to_path_buf(), e))?
            }
        };
        normalize_coordinate_columns(&mut df)
            .map_err(|e| CacheError::ReadPolars(path.to_path_buf(), e))?;
        Ok(df)
    }

    fn write_frame(
        mut df: DataFrame,
        dir: &Path,
        path: &Path,
        format: CacheFormat,
    ) -> Result<DataFrame, CacheError> {
        let mut temp_file =
            NamedTempFile::new_in(dir).map_err(|e| CacheError::WriteIo(path.to_path_buf(), e))?;
        match format {
            CacheFormat::Csv => CsvWriter::new(temp_file.as_file_mut())
                .include_header(true)
                .finish(&mut df)
                .map_err(|e| CacheError::WritePolars(path.to_path_buf(), e))?,
            CacheFormat::Parquet => {
                ParquetWriter::new(temp_file.as_file_mut())
                    .with_compression(ParquetCompression::Snappy)
                    .finish(&mut df)
                    .map_err(|e| CacheError::WritePolars(path.to_path_buf(), e))?;
            }
        }
        temp_file
            .as_file()
            .sync_all()
            .map_err(|e| CacheError::WriteIo(path.to_path_buf(), e))?;
        temp_file
            .persist(path)
            .map_err(|e| CacheError::Persist(path.to_path_buf(), e.error))?;
        Ok(df)
    }
}

#[async_trait]
impl CacheStore for FileStore {
    async fn load(&self) -> Result<Option<DataFrame>, CacheError> {
        match fs::metadata(&self.path).await {
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!("Cache miss: no artifact at {:?}", self.path);
                return Ok(None);
            }
            Err(e) => return Err(CacheError::CacheMetadataRead(self.path.clone(), e)),
        }

        info!("Cache hit: loading artifact from {:?}", self.path);
        let path = self.path.clone();
        let format = self.format;
        let df = task::spawn_blocking(move || Self::read_frame(&path, format)).await??;
        Ok(Some(df))
    }

    async fn store(&self, frame: DataFrame) -> Result<DataFrame, CacheError> {
        let dir = self.parent_dir();
        ensure_cache_dir_exists(&dir).await?;

        let path = self.path.clone();
        let format = self.format;
        let rows = frame.height();
        let df =
            task::spawn_blocking(move || Self::write_frame(frame, &dir, &path, format)).await??;
        info!("Wrote {} rows to cache artifact {:?}", rows, self.path);
        Ok(df)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{LATITUDE, LONGITUDE};
    use tempfile::TempDir;

    fn enriched_frame() -> DataFrame {
        df!(
            "city" => ["Springfield", "Nowhereville", "Lyon, France"],
            "avg" => [42i64, 57, 61],
            LATITUDE => [Some(39.80), None, Some(45.76)],
            LONGITUDE => [Some(-89.64), None, Some(4.83)]
        )
        .expect("valid test frame")
    }

    fn f64_column(df: &DataFrame, name: &str) -> Vec<Option<f64>> {
        df.column(name)
            .expect("column exists")
            .as_materialized_series()
            .f64()
            .expect("f64 column")
            .into_iter()
            .collect()
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            CacheFormat::from_path(Path::new("aqi_geo.csv")).ok(),
            Some(CacheFormat::Csv)
        );
        assert_eq!(
            CacheFormat::from_path(Path::new("cache/AQI.Parquet")).ok(),
            Some(CacheFormat::Parquet)
        );
        assert!(matches!(
            CacheFormat::from_path(Path::new("aqi_geo.xlsx")),
            Err(CacheError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_default_location() {
        // No cache dir on some CI machines.
        if let Ok(store) = FileStore::in_default_cache_dir() {
            assert!(store.path().ends_with("aqi_geo_cache/aqi_geo.csv"));
            assert_eq!(store.format(), CacheFormat::Csv);
        }
    }

    #[tokio::test]
    async fn test_missing_artifact_loads_as_none() -> Result<(), CacheError> {
        let dir = TempDir::new().expect("temp dir");
        let store = FileStore::new(dir.path().join("aqi_geo.csv"))?;
        assert!(store.load().await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_csv_store_keeps_order_and_empty_coordinates() -> Result<(), CacheError> {
        let dir = TempDir::new().expect("temp dir");
        let store = FileStore::new(dir.path().join("nested").join("aqi_geo.csv"))?;

        store.store(enriched_frame()).await?;
        let loaded = store.load().await?.expect("artifact was written");

        assert_eq!(loaded.height(), 3);
        let cities: Vec<Option<&str>> = loaded
            .column("city")
            .expect("city column")
            .as_materialized_series()
            .str()
            .expect("string column")
            .into_iter()
            .collect();
        assert_eq!(
            cities,
            [Some("Springfield"), Some("Nowhereville"), Some("Lyon, France")]
        );
        assert_eq!(
            f64_column(&loaded, LATITUDE),
            [Some(39.80), None, Some(45.76)]
        );
        assert_eq!(
            f64_column(&loaded, LONGITUDE),
            [Some(-89.64), None, Some(4.83)]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_parquet_store() -> Result<(), CacheError> {
        let dir = TempDir::new().expect("temp dir");
        let store = FileStore::new(dir.path().join("aqi_geo.parquet"))?;

        store.store(enriched_frame()).await?;
        let loaded = store.load().await?.expect("artifact was written");

        assert_eq!(loaded.height(), 3);
        assert_eq!(
            f64_column(&loaded, LATITUDE),
            [Some(39.80), None, Some(45.76)]
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_store_leaves_only_the_artifact() -> Result<(), CacheError> {
        let dir = TempDir::new().expect("temp dir");
        let store = FileStore::new(dir.path().join("aqi_geo.csv"))?;
        store.store(enriched_frame()).await?;

        let entries: Vec<_> = std::fs::read_dir(dir.path())
            .expect("readable dir")
            .map(|entry| entry.expect("dir entry").file_name())
            .collect();
        assert_eq!(entries, ["aqi_geo.csv"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_all_empty_coordinates_load_as_floats() -> Result<(), CacheError> {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("aqi_geo.csv");
        std::fs::write(&path, "city,avg,latitude,longitude\nNowhereville,10,,\nAtlantis,20,,\n")
            .expect("write fixture");

        let loaded = FileStore::new(&path)?.load().await?.expect("artifact");
        assert_eq!(f64_column(&loaded, LATITUDE), [None, None]);
        assert_eq!(f64_column(&loaded, LONGITUDE), [None, None]);
        Ok(())
    }

    #[tokio::test]
    async fn test_coordinate_text_is_loaded_unchanged() -> Result<(), CacheError> {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("aqi_geo.csv");
        std::fs::write(
            &path,
            "city,avg,latitude,longitude\nSpringfield,42,north,west\nOslo,10,59.91,10.75\n",
        )
        .expect("write fixture");

        let loaded = FileStore::new(&path)?.load().await?.expect("artifact");
        let latitude: Vec<Option<String>> = loaded
            .column(LATITUDE)
            .expect("latitude column")
            .as_materialized_series()
            .str()
            .expect("text column")
            .into_iter()
            .map(|value| value.map(str::to_string))
            .collect();
        assert_eq!(latitude, [Some("north".to_string()), Some("59.91".to_string())]);
        Ok(())
    }
}
