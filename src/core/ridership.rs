//! Ridership loading and filtering
//!
//! Reads the per-stop boarding table and narrows it down to the rows the user
//! selected (route, stop name fragment, stop order range, service date).

use std::collections::HashSet;
use std::io::Read;

use chrono::NaiveDate;
use log::debug;
use serde::Serialize;

use crate::core::config::Columns;
use crate::core::error::{suggest_correction, Error, Result};

/// Normalize a station name into its join key: trimmed and case-folded
pub fn normalize_stop_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// One row of the ridership table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RidershipRecord {
    pub route_id: String,
    /// Stop name as it appears in the dataset
    pub stop_name: String,
    /// Normalized stop name used for joining
    pub stop_key: String,
    pub stop_order: i64,
    pub boarding_total: f64,
    pub alighting_total: f64,
    /// Boardings per hourly column, aligned with `Dataset::hourly_labels`
    pub hourly_boardings: Vec<f64>,
    pub date: Option<NaiveDate>,
}

/// User-selected predicates applied to the dataset
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RidershipFilter {
    /// Exact route id; `None` keeps every route
    pub route: Option<String>,
    /// Substring of the stop name; empty keeps every stop
    pub stop_search: String,
    /// Inclusive stop order range
    pub order_range: Option<(i64, i64)>,
    /// Service date equality, applied to records that carry a date
    pub date: Option<NaiveDate>,
}

impl RidershipFilter {
    fn matches(&self, record: &RidershipRecord) -> bool {
        if let Some(route) = &self.route {
            if &record.route_id != route {
                return false;
            }
        }
        if !self.stop_search.is_empty() && !record.stop_name.contains(&self.stop_search) {
            return false;
        }
        if let Some((min, max)) = self.order_range {
            if record.stop_order < min || record.stop_order > max {
                return false;
            }
        }
        if let (Some(wanted), Some(date)) = (self.date, record.date) {
            if wanted != date {
                return false;
            }
        }
        true
    }
}

/// The full ridership table held in memory
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub records: Vec<RidershipRecord>,
    /// Chart labels of the hourly boarding columns, in header order
    pub hourly_labels: Vec<String>,
}

impl Dataset {
    /// Unique route ids in first-seen order
    pub fn route_ids(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.records
            .iter()
            .filter(|r| seen.insert(r.route_id.as_str()))
            .map(|r| r.route_id.clone())
            .collect()
    }

    /// Minimum and maximum stop order of a route
    pub fn order_bounds(&self, route: &str) -> Option<(i64, i64)> {
        let mut orders = self
            .records
            .iter()
            .filter(|r| r.route_id == route)
            .map(|r| r.stop_order);
        let first = orders.next()?;
        Some(orders.fold((first, first), |(min, max), o| (min.min(o), max.max(o))))
    }

    /// Apply a filter, returning the working subset.
    ///
    /// Fails only when the selected route does not exist at all.
    pub fn filter(&self, filter: &RidershipFilter) -> Result<Vec<RidershipRecord>> {
        if let Some(route) = &filter.route {
            if !self.records.iter().any(|r| &r.route_id == route) {
                return Err(Error::RouteNotFound {
                    route: route.clone(),
                    suggestion: suggest_correction(route, &self.route_ids()),
                });
            }
        }

        let subset: Vec<RidershipRecord> = self
            .records
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        debug!(
            "Filter kept {} of {} ridership rows",
            subset.len(),
            self.records.len()
        );
        Ok(subset)
    }
}

/// Parse a ridership CSV with a header row
pub fn load_ridership<R: Read>(reader: R, columns: &Columns) -> Result<Dataset> {
    let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::Headers).from_reader(reader);
    let headers = csv_reader.headers()?.clone();

    let position = |name: &str| -> Result<usize> {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| Error::MissingColumn(name.to_string()))
    };
    let route_idx = position(&columns.route_id)?;
    let stop_idx = position(&columns.stop_name)?;
    let order_idx = position(&columns.stop_order)?;
    let boarding_idx = position(&columns.boarding_total)?;
    let alighting_idx = position(&columns.alighting_total)?;
    let date_idx = match &columns.date {
        Some(name) => Some(position(name)?),
        None => None,
    };

    let hourly: Vec<(usize, String)> = headers
        .iter()
        .enumerate()
        .filter(|(_, h)| h.contains(&columns.hourly_marker) && !h.contains(&columns.total_marker))
        .map(|(i, h)| (i, h.replace(&columns.hourly_suffix, "")))
        .collect();

    let mut records = Vec::new();
    for (i, row) in csv_reader.records().enumerate() {
        let row = row?;
        // Header is line 1
        let line = i + 2;
        let cell = |idx: usize| row.get(idx).unwrap_or("").trim();
        let header = |idx: usize| headers.get(idx).unwrap_or("").to_string();

        let stop_name = cell(stop_idx).to_string();
        let stop_order = parse_order(cell(order_idx)).ok_or_else(|| Error::InvalidRecord {
            row: line,
            column: header(order_idx),
            value: cell(order_idx).to_string(),
        })?;

        let number = |idx: usize| -> Result<f64> {
            parse_count(cell(idx)).ok_or_else(|| Error::InvalidRecord {
                row: line,
                column: header(idx),
                value: cell(idx).to_string(),
            })
        };

        let hourly_boardings = hourly
            .iter()
            .map(|(idx, _)| number(*idx))
            .collect::<Result<Vec<f64>>>()?;

        let date = match date_idx {
            Some(idx) if !cell(idx).is_empty() => {
                Some(parse_date(cell(idx)).ok_or_else(|| Error::InvalidRecord {
                    row: line,
                    column: header(idx),
                    value: cell(idx).to_string(),
                })?)
            }
            _ => None,
        };

        records.push(RidershipRecord {
            route_id: cell(route_idx).to_string(),
            stop_key: normalize_stop_name(&stop_name),
            stop_name,
            stop_order,
            boarding_total: number(boarding_idx)?,
            alighting_total: number(alighting_idx)?,
            hourly_boardings,
            date,
        });
    }

    debug!(
        "Loaded {} ridership rows with {} hourly columns",
        records.len(),
        hourly.len()
    );

    Ok(Dataset {
        records,
        hourly_labels: hourly.into_iter().map(|(_, label)| label).collect(),
    })
}

/// Stop orders are integers, sometimes exported as "3.0"
fn parse_order(value: &str) -> Option<i64> {
    if let Ok(order) = value.parse::<i64>() {
        return Some(order);
    }
    let float = value.parse::<f64>().ok()?;
    (float.fract() == 0.0 && float.is_finite()).then_some(float as i64)
}

/// Counts may carry thousands separators; empty cells count as zero
fn parse_count(value: &str) -> Option<f64> {
    if value.is_empty() {
        return Some(0.0);
    }
    value.replace(',', "").parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Accepts YYYY-MM-DD and YYYYMMDD
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(value, "%Y%m%d"))
        .ok()
}
