use std::fmt;

use serde::Deserialize;

use nagriksetu_common::{
    check_latitude, check_longitude, Category, CoordinateError, GeoPoint, NewTicket,
};

pub const MAX_DESCRIPTION_CHARS: usize = 2000;

/// A coordinate as clients send it: a JSON number, or a numeric string from
/// a form field.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum CoordinateInput {
    Number(f64),
    Text(String),
}

impl From<f64> for CoordinateInput {
    fn from(v: f64) -> Self {
        CoordinateInput::Number(v)
    }
}

impl From<&str> for CoordinateInput {
    fn from(v: &str) -> Self {
        CoordinateInput::Text(v.to_string())
    }
}

/// An unvalidated report exactly as it arrived.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ReportForm {
    pub category: Option<String>,
    pub description: Option<String>,
    pub lat: Option<CoordinateInput>,
    pub lng: Option<CoordinateInput>,
}

/// Metadata of an uploaded photo. The bytes themselves are not kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub size: usize,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Problem {
    Missing,
    NotANumber,
    OutOfRange,
    Unrecognized,
    TooLong,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldIssue {
    pub field: &'static str,
    pub problem: Problem,
    pub detail: String,
}

impl FieldIssue {
    fn missing(field: &'static str) -> Self {
        Self {
            field,
            problem: Problem::Missing,
            detail: format!("{field} is required"),
        }
    }
}

/// Every problem found in a report, not just the first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    issues: Vec<FieldIssue>,
}

impl ValidationError {
    pub fn issues(&self) -> &[FieldIssue] {
        &self.issues
    }

    pub fn missing_fields(&self) -> Vec<&'static str> {
        self.issues
            .iter()
            .filter(|i| i.problem == Problem::Missing)
            .map(|i| i.field)
            .collect()
    }

    pub fn fields(&self) -> Vec<&'static str> {
        self.issues.iter().map(|i| i.field).collect()
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        let missing = self.missing_fields();
        if !missing.is_empty() {
            parts.push(format!("Missing required fields: {}", missing.join(", ")));
        }
        parts.extend(
            self.issues
                .iter()
                .filter(|i| i.problem != Problem::Missing)
                .map(|i| i.detail.clone()),
        );
        f.write_str(&parts.join("; "))
    }
}

impl std::error::Error for ValidationError {}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

impl ReportForm {
    /// Check every field and produce the ticket to record, or all the reasons
    /// it cannot be recorded.
    pub fn validate(&self) -> Result<NewTicket, ValidationError> {
        let mut issues = Vec::new();

        let category = match non_blank(self.category.as_deref()) {
            None => {
                issues.push(FieldIssue::missing("category"));
                None
            }
            Some(raw) => match raw.parse::<Category>() {
                Ok(c) => Some(c),
                Err(e) => {
                    issues.push(FieldIssue {
                        field: "category",
                        problem: Problem::Unrecognized,
                        detail: e.to_string(),
                    });
                    None
                }
            },
        };

        let lat = coordinate("lat", self.lat.as_ref(), check_latitude, &mut issues);
        let lng = coordinate("lng", self.lng.as_ref(), check_longitude, &mut issues);

        if let Some(d) = &self.description {
            let len = d.trim().chars().count();
            if len > MAX_DESCRIPTION_CHARS {
                issues.push(FieldIssue {
                    field: "description",
                    problem: Problem::TooLong,
                    detail: format!(
                        "description must be at most {MAX_DESCRIPTION_CHARS} characters, got {len}"
                    ),
                });
            }
        }

        match (category, lat, lng) {
            (Some(category), Some(lat), Some(lng)) if issues.is_empty() => Ok(NewTicket::new(
                category,
                self.description.as_deref(),
                GeoPoint { lat, lng },
            )),
            _ => Err(ValidationError { issues }),
        }
    }
}

fn non_blank(v: Option<&str>) -> Option<&str> {
    v.map(str::trim).filter(|s| !s.is_empty())
}

fn coordinate(
    field: &'static str,
    input: Option<&CoordinateInput>,
    check: fn(f64) -> Result<f64, CoordinateError>,
    issues: &mut Vec<FieldIssue>,
) -> Option<f64> {
    let value = match input {
        None => None,
        Some(CoordinateInput::Number(n)) => Some(Ok(*n)),
        Some(CoordinateInput::Text(s)) => non_blank(Some(s.as_str())).map(|s| s.parse::<f64>()),
    };

    let parsed = match value {
        None => {
            issues.push(FieldIssue::missing(field));
            return None;
        }
        Some(Err(_)) => {
            issues.push(FieldIssue {
                field,
                problem: Problem::NotANumber,
                detail: format!("{field} must be a number"),
            });
            return None;
        }
        Some(Ok(n)) => n,
    };

    match check(parsed) {
        Ok(v) => Some(v),
        Err(e) => {
            let problem = match e {
                CoordinateError::NotFinite { .. } => Problem::NotANumber,
                CoordinateError::OutOfRange { .. } => Problem::OutOfRange,
            };
            issues.push(FieldIssue {
                field,
                problem,
                detail: e.to_string(),
            });
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nagriksetu_common::DEFAULT_DESCRIPTION;

    fn form(
        category: Option<&str>,
        lat: Option<CoordinateInput>,
        lng: Option<CoordinateInput>,
    ) -> ReportForm {
        ReportForm {
            category: category.map(String::from),
            description: None,
            lat,
            lng,
        }
    }

    #[test]
    fn accepts_numeric_strings() {
        let t = form(Some("Pothole"), Some("23.2599".into()), Some(" 77.4126 ".into()))
            .validate()
            .unwrap();
        assert_eq!(t.category, Category::Pothole);
        assert_eq!(t.location, GeoPoint { lat: 23.2599, lng: 77.4126 });
        assert_eq!(t.description, DEFAULT_DESCRIPTION);
    }

    #[test]
    fn accepts_numbers_and_zero() {
        let t = form(Some("garbage"), Some(0.0.into()), Some(0.0.into()))
            .validate()
            .unwrap();
        assert_eq!(t.location, GeoPoint { lat: 0.0, lng: 0.0 });
    }

    #[test]
    fn reports_every_missing_field() {
        let err = ReportForm::default().validate().unwrap_err();
        assert_eq!(err.missing_fields(), vec!["category", "lat", "lng"]);
        assert_eq!(err.to_string(), "Missing required fields: category, lat, lng");
    }

    #[test]
    fn blank_strings_count_as_missing() {
        let err = form(Some("  "), Some("".into()), Some("1.0".into()))
            .validate()
            .unwrap_err();
        assert_eq!(err.missing_fields(), vec!["category", "lat"]);
    }

    #[test]
    fn rejects_non_numeric_coordinates() {
        let err = form(Some("Pothole"), Some("north".into()), Some("77.4".into()))
            .validate()
            .unwrap_err();
        assert_eq!(err.issues()[0].problem, Problem::NotANumber);
        assert_eq!(err.fields(), vec!["lat"]);
        assert_eq!(err.to_string(), "lat must be a number");
    }

    #[test]
    fn rejects_nan_and_infinite_strings() {
        let err = form(Some("Pothole"), Some("NaN".into()), Some("inf".into()))
            .validate()
            .unwrap_err();
        assert_eq!(err.fields(), vec!["lat", "lng"]);
        assert!(err.issues().iter().all(|i| i.problem == Problem::NotANumber));
    }

    #[test]
    fn rejects_out_of_range_coordinates() {
        let err = form(Some("Pothole"), Some(91.0.into()), Some((-181.0).into()))
            .validate()
            .unwrap_err();
        assert_eq!(err.fields(), vec!["lat", "lng"]);
        assert!(err.issues().iter().all(|i| i.problem == Problem::OutOfRange));
    }

    #[test]
    fn rejects_unknown_category() {
        let err = form(Some("Graffiti"), Some(1.0.into()), Some(1.0.into()))
            .validate()
            .unwrap_err();
        assert_eq!(err.issues()[0].problem, Problem::Unrecognized);
        assert_eq!(err.to_string(), "Unrecognized category: Graffiti");
    }

    #[test]
    fn mixes_missing_and_invalid_in_message() {
        let err = form(None, Some("abc".into()), Some(1.0.into()))
            .validate()
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Missing required fields: category; lat must be a number"
        );
    }

    #[test]
    fn rejects_overlong_description() {
        let mut f = form(Some("Pothole"), Some(1.0.into()), Some(1.0.into()));
        f.description = Some("x".repeat(MAX_DESCRIPTION_CHARS + 1));
        let err = f.validate().unwrap_err();
        assert_eq!(err.issues()[0].problem, Problem::TooLong);

        f.description = Some("x".repeat(MAX_DESCRIPTION_CHARS));
        assert!(f.validate().is_ok());
    }

    #[test]
    fn deserializes_json_numbers_and_strings() {
        let f: ReportForm =
            serde_json::from_str(r#"{"category":"Pothole","lat":23.2599,"lng":"77.4126"}"#)
                .unwrap();
        assert_eq!(f.lat, Some(CoordinateInput::Number(23.2599)));
        assert_eq!(f.lng, Some(CoordinateInput::Text("77.4126".to_string())));
        assert!(f.validate().is_ok());
    }
}
