//! Wire types for the accident and analytics routes.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An accident record as the backend returns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Accident {
    pub id: i64,
    pub accident_index: Option<String>,
    pub date: NaiveDate,
    pub time: Option<String>,
    pub day_of_week: Option<u8>,
    pub longitude: Option<f64>,
    pub latitude: Option<f64>,
    pub location_easting: Option<f64>,
    pub location_northing: Option<f64>,
    pub police_force: Option<String>,
    pub accident_severity: String,
    pub number_of_vehicles: Option<u32>,
    pub number_of_casualties: Option<u32>,
    pub local_authority_district: Option<String>,
    pub road_type: Option<String>,
    pub speed_limit: Option<u32>,
    pub junction_control: Option<String>,
    pub light_conditions: Option<String>,
    pub weather_conditions: Option<String>,
    pub road_surface_conditions: Option<String>,
    pub urban_or_rural_area: Option<String>,
    pub year: Option<i32>,
}

/// Create/update payload. Unset fields are left out of the JSON body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccidentDraft {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accident_index: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub police_force: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accident_severity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number_of_vehicles: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number_of_casualties: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub road_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed_limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub light_conditions: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weather_conditions: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub road_surface_conditions: Option<String>,
}

/// The pages of the accident entry form, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormStep {
    Details,
    Location,
    Conditions,
}

impl FormStep {
    pub const ALL: [FormStep; 3] = [FormStep::Details, FormStep::Location, FormStep::Conditions];

    /// Fields that must be filled before leaving this step.
    pub fn required_fields(self) -> &'static [&'static str] {
        match self {
            FormStep::Details => &[
                "date",
                "accident_severity",
                "number_of_vehicles",
                "number_of_casualties",
            ],
            FormStep::Location => &["longitude", "latitude", "road_type", "speed_limit"],
            FormStep::Conditions => &["weather_conditions", "light_conditions"],
        }
    }

    pub fn next(self) -> Option<FormStep> {
        match self {
            FormStep::Details => Some(FormStep::Location),
            FormStep::Location => Some(FormStep::Conditions),
            FormStep::Conditions => None,
        }
    }
}

/// A draft lacking fields the backend needs on create.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("accident is missing required fields: {}", .missing.join(", "))]
pub struct IncompleteDraft {
    pub missing: Vec<&'static str>,
}

impl AccidentDraft {
    /// Starts a draft with the backend's key fields; the form steps fill the rest.
    pub fn new(accident_index: impl Into<String>, date: NaiveDate, severity: Severity) -> Self {
        Self {
            accident_index: Some(accident_index.into()),
            date: Some(date),
            accident_severity: Some(severity.code().to_string()),
            ..Self::default()
        }
    }

    /// Required fields of `step` that are unset or blank.
    pub fn missing_fields(&self, step: FormStep) -> Vec<&'static str> {
        step.required_fields()
            .iter()
            .copied()
            .filter(|field| !self.has_field(field))
            .collect()
    }

    /// Every field a create needs, across all steps plus the accident index.
    pub fn missing_required(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if !self.has_field("accident_index") {
            missing.push("accident_index");
        }
        for step in FormStep::ALL {
            missing.extend(self.missing_fields(step));
        }
        missing
    }

    pub fn validate(&self) -> Result<(), IncompleteDraft> {
        let missing = self.missing_required();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(IncompleteDraft { missing })
        }
    }

    fn has_field(&self, field: &str) -> bool {
        fn filled(value: &Option<String>) -> bool {
            value.as_deref().is_some_and(|v| !v.trim().is_empty())
        }
        match field {
            "accident_index" => filled(&self.accident_index),
            "date" => self.date.is_some(),
            "accident_severity" => filled(&self.accident_severity),
            "number_of_vehicles" => self.number_of_vehicles.is_some(),
            "number_of_casualties" => self.number_of_casualties.is_some(),
            "longitude" => self.longitude.is_some(),
            "latitude" => self.latitude.is_some(),
            "road_type" => filled(&self.road_type),
            "speed_limit" => self.speed_limit.is_some(),
            "weather_conditions" => filled(&self.weather_conditions),
            "light_conditions" => filled(&self.light_conditions),
            _ => false,
        }
    }
}

/// STATS19 severity codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Severity {
    Fatal,
    Serious,
    Slight,
}

impl Severity {
    /// Accepts the numeric code or the label, as both appear in uploaded data.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "1" => Some(Severity::Fatal),
            "2" => Some(Severity::Serious),
            "3" => Some(Severity::Slight),
            other if other.eq_ignore_ascii_case("fatal") => Some(Severity::Fatal),
            other if other.eq_ignore_ascii_case("serious") => Some(Severity::Serious),
            other if other.eq_ignore_ascii_case("slight") => Some(Severity::Slight),
            _ => None,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Severity::Fatal => "1",
            Severity::Serious => "2",
            Severity::Slight => "3",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Severity::Fatal => "Fatal",
            Severity::Serious => "Serious",
            Severity::Slight => "Slight",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Inclusive date filter applied by every analytics route.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("start date {start} is after end date {end}")]
pub struct InvalidDateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn between(start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            start_date: Some(start_date),
            end_date: Some(end_date),
        }
    }

    pub fn validate(&self) -> Result<(), InvalidDateRange> {
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) if start > end => Err(InvalidDateRange { start, end }),
            _ => Ok(()),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start_date.map_or(true, |start| date >= start)
            && self.end_date.map_or(true, |end| date <= end)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsSummary {
    pub total_accidents: u64,
    pub total_casualties: u64,
    pub total_vehicles: u64,
    pub average_casualties: f64,
    pub average_vehicles: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeverityStats {
    pub severity: String,
    pub count: u64,
    #[serde(default)]
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoadTypeStats {
    pub road_type: Option<String>,
    pub count: u64,
    #[serde(default)]
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherStats {
    pub weather_condition: Option<String>,
    pub count: u64,
    #[serde(default)]
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationStats {
    pub longitude: f64,
    pub latitude: f64,
    pub count: u64,
    #[serde(default)]
    pub location_name: Option<String>,
}
