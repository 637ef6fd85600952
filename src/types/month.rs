//! Calendar months as they appear in the AQI dataset's monthly columns.

use std::fmt;

/// A calendar month, used to pick one of the monthly AQI columns (`jan` .. `dec`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Month {
    January,
    February,
    March,
    April,
    May,
    June,
    July,
    August,
    September,
    October,
    November,
    December,
}

impl Month {
    pub const ALL: [Month; 12] = [
        Month::January,
        Month::February,
        Month::March,
        Month::April,
        Month::May,
        Month::June,
        Month::July,
        Month::August,
        Month::September,
        Month::October,
        Month::November,
        Month::December,
    ];

    /// Maps a 1-based month number to a `Month`. Returns `None` outside `1..=12`.
    ///
    /// # Examples
    ///
    /// ```
    /// use aqi_geo::Month;
    ///
    /// assert_eq!(Month::from_number(3), Some(Month::March));
    /// assert_eq!(Month::from_number(13), None);
    /// ```
    pub fn from_number(number: u32) -> Option<Self> {
        let index = usize::try_from(number).ok()?.checked_sub(1)?;
        Self::ALL.get(index).copied()
    }

    pub fn number(&self) -> u32 {
        *self as u32 + 1
    }

    /// Name of the dataset column holding this month's AQI value.
    pub fn column_name(&self) -> &'static str {
        match self {
            Month::January => "jan",
            Month::February => "feb",
            Month::March => "mar",
            Month::April => "apr",
            Month::May => "may",
            Month::June => "jun",
            Month::July => "jul",
            Month::August => "aug",
            Month::September => "sep",
            Month::October => "oct",
            Month::November => "nov",
            Month::December => "dec",
        }
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.column_name())
    }
}
