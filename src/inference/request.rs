//! Request parsing, validation and the response envelope.

use super::service::ServiceError;
use crate::dataset::{RawRecord, Value, MISSING_TOKENS};
use crate::preprocessing::FeatureSchema;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Message shown to callers whose request could not be served.
pub const USER_ERROR_MESSAGE: &str =
    "Unable to make a prediction. Please check the input values and try again.";

/// Parse a flat JSON object of feature name to scalar.
///
/// Numbers and strings keep their type and `null` is a missing value.
/// Arrays, objects and booleans are rejected.
pub fn parse_request(body: &str) -> Result<RawRecord, ServiceError> {
    let json: serde_json::Value =
        serde_json::from_str(body).map_err(|e| ServiceError::validation("<body>", e.to_string()))?;
    let serde_json::Value::Object(fields) = json else {
        return Err(ServiceError::validation(
            "<body>",
            "request must be a JSON object",
        ));
    };

    let mut record = RawRecord::new();
    for (name, value) in fields {
        let value = match value {
            serde_json::Value::Null => Value::Missing,
            serde_json::Value::Number(n) => match n.as_f64() {
                Some(v) => Value::Number(v),
                None => return Err(ServiceError::validation(&name, "number out of range")),
            },
            serde_json::Value::String(s) => Value::Text(s),
            other => {
                return Err(ServiceError::validation(
                    &name,
                    format!("expected a number, string or null, got {other}"),
                ))
            }
        };
        record.insert(name, value);
    }
    Ok(record)
}

/// Trim text and map the CSV missing tokens to [`Value::Missing`].
fn clean(value: &Value) -> Value {
    match value {
        Value::Text(s) => {
            let s = s.trim();
            if MISSING_TOKENS.contains(&s) {
                Value::Missing
            } else {
                Value::Text(s.to_string())
            }
        }
        other => other.clone(),
    }
}

/// Check `record` against `schema` and bring it into canonical form.
///
/// Numeric fields become finite numbers (numeric strings are parsed),
/// categorical fields become text, and undeclared fields are dropped.
/// Text cells are read the way the CSV loader reads them.
pub fn normalize(schema: &FeatureSchema, record: &RawRecord) -> Result<RawRecord, ServiceError> {
    let mut normalized = RawRecord::new();

    for name in schema.numeric() {
        let value = match record.get(name).map(clean) {
            None => return Err(ServiceError::validation(name, "field is required")),
            Some(Value::Missing) => Value::Missing,
            Some(value) => match value.as_number() {
                Some(v) if v.is_finite() => Value::Number(v),
                Some(_) => return Err(ServiceError::validation(name, "value must be finite")),
                None => return Err(ServiceError::validation(name, "value must be numeric")),
            },
        };
        normalized.insert(name.clone(), value);
    }

    for name in schema.categorical() {
        let value = match record.get(name).map(clean) {
            None => return Err(ServiceError::validation(name, "field is required")),
            Some(value) => value.as_category().map_or(Value::Missing, Value::Text),
        };
        normalized.insert(name.clone(), value);
    }

    for (name, _) in record.iter() {
        if !normalized.contains(name) {
            debug!(field = %name, "ignoring undeclared request field");
        }
    }
    Ok(normalized)
}

/// The caller-facing result of one request. Never an error.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prediction: Option<f64>,
    /// The normalized input that was scored.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<RawRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PredictionResponse {
    pub fn success(prediction: f64, input: RawRecord) -> Self {
        Self {
            prediction: Some(prediction),
            input: Some(input),
            error: None,
        }
    }

    pub fn failure() -> Self {
        Self {
            prediction: None,
            input: None,
            error: Some(USER_ERROR_MESSAGE.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.prediction.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> FeatureSchema {
        FeatureSchema::new(
            vec!["Duration".into(), "Cost".into()],
            vec!["Weather".into()],
        )
    }

    #[test]
    fn test_parse_request() {
        let record =
            parse_request(r#"{"Duration": 30, "Cost": "12.5", "Weather": "Sunny", "Note": null}"#)
                .unwrap();
        assert_eq!(record.get("Duration"), Some(&Value::Number(30.0)));
        assert_eq!(record.get("Cost"), Some(&Value::from("12.5")));
        assert_eq!(record.get("Note"), Some(&Value::Missing));
    }

    #[test]
    fn test_parse_request_rejects_nesting() {
        let err = parse_request(r#"{"Duration": [1, 2]}"#).unwrap_err();
        assert!(matches!(err, ServiceError::Validation { ref field, .. } if field == "Duration"));
        assert!(parse_request("[1, 2]").is_err());
        assert!(parse_request("{not json").is_err());
    }

    #[test]
    fn test_normalize_parses_and_drops_extras() {
        let record = RawRecord::new()
            .with("Duration", "30")
            .with("Cost", Value::Missing)
            .with("Weather", 3.0)
            .with("ProjectID", "P-17");
        let normalized = normalize(&schema(), &record).unwrap();
        assert_eq!(normalized.get("Duration"), Some(&Value::Number(30.0)));
        assert_eq!(normalized.get("Cost"), Some(&Value::Missing));
        assert_eq!(normalized.get("Weather"), Some(&Value::from("3")));
        assert!(!normalized.contains("ProjectID"));
    }

    #[test]
    fn test_missing_tokens_match_csv_reading() {
        let record = RawRecord::new()
            .with("Duration", " NA ")
            .with("Cost", " 12.5 ")
            .with("Weather", "");
        let normalized = normalize(&schema(), &record).unwrap();
        assert_eq!(normalized.get("Duration"), Some(&Value::Missing));
        assert_eq!(normalized.get("Cost"), Some(&Value::Number(12.5)));
        assert_eq!(normalized.get("Weather"), Some(&Value::Missing));

        let padded = RawRecord::new()
            .with("Duration", 1.0)
            .with("Cost", 1.0)
            .with("Weather", "  Rainy ");
        let normalized = normalize(&schema(), &padded).unwrap();
        assert_eq!(normalized.get("Weather"), Some(&Value::from("Rainy")));
    }

    #[test]
    fn test_normalize_reports_the_bad_field() {
        let missing = RawRecord::new().with("Duration", 1.0).with("Weather", "Rain");
        let err = normalize(&schema(), &missing).unwrap_err();
        assert!(matches!(err, ServiceError::Validation { ref field, .. } if field == "Cost"));

        let text = RawRecord::new()
            .with("Duration", "long")
            .with("Cost", 1.0)
            .with("Weather", "Rain");
        let err = normalize(&schema(), &text).unwrap_err();
        assert!(matches!(err, ServiceError::Validation { ref field, .. } if field == "Duration"));

        let infinite = RawRecord::new()
            .with("Duration", f64::INFINITY)
            .with("Cost", 1.0)
            .with("Weather", "Rain");
        assert!(normalize(&schema(), &infinite).is_err());
    }

    #[test]
    fn test_response_json_shape() {
        let ok = PredictionResponse::success(1.5, RawRecord::new().with("Duration", 2.0));
        let json = serde_json::to_string(&ok).unwrap();
        assert_eq!(json, r#"{"prediction":1.5,"input":{"Duration":2.0}}"#);

        let failed = serde_json::to_value(PredictionResponse::failure()).unwrap();
        assert_eq!(failed["error"], USER_ERROR_MESSAGE);
        assert!(failed.get("prediction").is_none());
    }
}
