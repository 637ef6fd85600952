//! Read-only slices of the enriched table for dashboards: pages, search results,
//! rankings and map points.

use crate::dataset::{LATITUDE, LONGITUDE};
use crate::error::GeoCacheError;
use crate::types::config::DEFAULT_CITY_COLUMN;
use crate::types::month::Month;
use polars::prelude::*;

pub const AVERAGE_COLUMN: &str = "avg";
pub const AQI_COLUMN: &str = "aqi";

/// One page of a table.
#[derive(Debug, Clone)]
pub struct Page {
    /// 1-based page number actually shown.
    pub number: usize,
    pub total_pages: usize,
    pub frame: DataFrame,
}

/// Parses user input as a 1-based page number and clamps it to `[1, total_pages]`.
///
/// Anything that is not an integer yields page 1.
///
/// ```
/// use aqi_geo::views::parse_page_number;
///
/// assert_eq!(parse_page_number("3", 5), 3);
/// assert_eq!(parse_page_number("99", 5), 5);
/// assert_eq!(parse_page_number("-2", 5), 1);
/// assert_eq!(parse_page_number("two", 5), 1);
/// ```
pub fn parse_page_number(input: &str, total_pages: usize) -> usize {
    let last = i64::try_from(total_pages.max(1)).unwrap_or(i64::MAX);
    let requested = input.trim().parse::<i64>().unwrap_or(1);
    // Clamped to [1, last], so the conversion back cannot fail.
    usize::try_from(requested.clamp(1, last)).unwrap_or(1)
}

pub trait AqiFrameExt {
    /// Returns page `input` of the table, `page_size` rows per page.
    ///
    /// An empty table has a single, empty page. A `page_size` of 0 is treated as 1.
    fn page(&self, input: &str, page_size: usize) -> Page;

    /// Rows whose `column` contains `query`, ignoring case. The query is matched
    /// literally. An empty query matches nothing.
    fn search_city(&self, query: &str, column: &str) -> Result<DataFrame, GeoCacheError>;

    /// The `n` highest rows by `value_column` followed by the `n` lowest, keeping
    /// only the city and value columns.
    fn top_bottom(
        &self,
        n: usize,
        value_column: &str,
        city_column: &str,
    ) -> Result<DataFrame, GeoCacheError>;

    /// `city`, `latitude`, `longitude` and `aqi` for plotting.
    ///
    /// `aqi` is the given month's column, or the yearly average when `month` is
    /// `None`. Values that are missing or not numeric become 0.
    fn map_points(&self, month: Option<Month>) -> Result<DataFrame, GeoCacheError>;
}

impl AqiFrameExt for DataFrame {
    fn page(&self, input: &str, page_size: usize) -> Page {
        let page_size = page_size.max(1);
        let total_pages = self.height().div_ceil(page_size).max(1);
        let number = parse_page_number(input, total_pages);
        let offset = i64::try_from((number - 1) * page_size).unwrap_or(i64::MAX);
        Page {
            number,
            total_pages,
            frame: self.slice(offset, page_size),
        }
    }

    fn search_city(&self, query: &str, column: &str) -> Result<DataFrame, GeoCacheError> {
        require_columns(self, &[column])?;
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(self.clear());
        }

        let cities = self.column(column)?.cast(&DataType::String)?;
        let mask: BooleanChunked = cities
            .as_materialized_series()
            .str()?
            .into_iter()
            .map(|city| city.map(|city| city.to_lowercase().contains(&needle)))
            .collect();
        Ok(self.filter(&mask)?)
    }

    fn top_bottom(
        &self,
        n: usize,
        value_column: &str,
        city_column: &str,
    ) -> Result<DataFrame, GeoCacheError> {
        require_columns(self, &[city_column, value_column])?;
        let selected = self.select([city_column, value_column])?;

        let mut top = selected
            .sort(
                [value_column],
                SortMultipleOptions::default()
                    .with_order_descending(true)
                    .with_nulls_last(true),
            )?
            .head(Some(n));
        let bottom = selected
            .sort(
                [value_column],
                SortMultipleOptions::default().with_nulls_last(true),
            )?
            .head(Some(n));
        top.vstack_mut(&bottom)?;
        Ok(top)
    }

    fn map_points(&self, month: Option<Month>) -> Result<DataFrame, GeoCacheError> {
        let source = month.map_or(AVERAGE_COLUMN, |month| month.column_name());
        require_columns(self, &[DEFAULT_CITY_COLUMN, LATITUDE, LONGITUDE, source])?;

        let points = self
            .clone()
            .lazy()
            .select([
                col(DEFAULT_CITY_COLUMN),
                col(LATITUDE),
                col(LONGITUDE),
                col(source)
                    .cast(DataType::Float64)
                    .fill_null(lit(0.0))
                    .alias(AQI_COLUMN),
            ])
            .collect()?;
        Ok(points)
    }
}

fn require_columns(df: &DataFrame, columns: &[&str]) -> Result<(), GeoCacheError> {
    match columns
        .iter()
        .find(|column| df.get_column_index(column).is_none())
    {
        Some(missing) => Err(GeoCacheError::MissingColumn {
            column: missing.to_string(),
        }),
        None => Ok(()),
    }
}
