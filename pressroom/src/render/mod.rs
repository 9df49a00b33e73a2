//! Document rendering: turns a validated generation request into PDF bytes.
//!
//! Rendering is deterministic: the same (template, params, timestamp) triple
//! always yields byte-identical output. The request timestamp is the only
//! input that can vary between otherwise identical requests, and it only
//! affects templates that declare a `timestamp` field.
//!
//! - [`template`]: layout definitions and the registry resolving them by name
//! - [`pdf`]: the single-page PDF writer

pub mod pdf;
pub mod template;

pub use template::{Template, TemplateRegistry};

use crate::errors::{Error, Result};
use crate::types::RequestId;
use chrono::{DateTime, NaiveDate, Utc};
use pdf::TextRun;
use serde_json::Value;
use std::collections::HashMap;
use template::{INPUT_DATE_FORMAT, OUTPUT_DATE_FORMAT, param_display};
use uuid::Uuid;

/// Default format for `timestamp` fields.
const TIMESTAMP_FORMAT: &str = "%d-%m-%Y %H:%M";

/// A generation request after intake: immutable, with its id and timestamp
/// already assigned.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub id: RequestId,
    pub template: String,
    pub params: HashMap<String, Value>,
    /// Intake time, or the caller-supplied override. Only consulted by
    /// templates with a `timestamp` field.
    pub timestamp: DateTime<Utc>,
}

impl GenerationRequest {
    pub fn new(template: String, params: HashMap<String, Value>, timestamp: Option<DateTime<Utc>>) -> Self {
        Self {
            id: Uuid::new_v4(),
            template,
            params,
            timestamp: timestamp.unwrap_or_else(Utc::now),
        }
    }
}

/// Render `request` against an already-resolved template.
///
/// The request must have passed [`Template::validate_request`]; remaining
/// failures here are render faults, not validation errors. A render that
/// places no text at all is an error, never an empty artifact.
pub fn render_document(template: &Template, request: &GenerationRequest) -> Result<Vec<u8>> {
    let mut runs: Vec<TextRun> = Vec::new();

    for field in &template.fields {
        let value = field_value(template, field, request)?;
        if value.is_empty() {
            continue;
        }

        let size = field.size.unwrap_or(template.font.size);
        for &x in &field.x {
            runs.push(TextRun {
                x,
                y: field.y,
                size,
                text: value.clone(),
            });
        }
    }

    if runs.is_empty() {
        return Err(Error::Render {
            reason: format!("template '{}' produced no content", template.name),
        });
    }

    Ok(pdf::render_single_page(
        template.page.width,
        template.page.height,
        &template.font.name,
        &runs,
    ))
}

fn field_value(template: &Template, field: &template::Field, request: &GenerationRequest) -> Result<String> {
    if let Some(param) = &field.param {
        // Missing optional params resolve to their default; required ones
        // were checked at validation time
        return Ok(match request.params.get(param) {
            Some(value) => param_display(value),
            None => field.default.clone().unwrap_or_default(),
        });
    }

    if let Some(text) = &field.text {
        return Ok(text.clone());
    }

    if let Some(date) = &field.date {
        let raw = request
            .params
            .get(&date.param)
            .map(param_display)
            .ok_or_else(|| Error::Render {
                reason: format!("date field references missing parameter '{}'", date.param),
            })?;
        let parsed = NaiveDate::parse_from_str(&raw, INPUT_DATE_FORMAT).map_err(|_| Error::Render {
            reason: format!("parameter '{}' is not a {INPUT_DATE_FORMAT} date", date.param),
        })?;
        let shifted = parsed + chrono::Duration::days(date.add_days);
        let format = date.format.as_deref().unwrap_or(OUTPUT_DATE_FORMAT);
        return Ok(shifted.format(format).to_string());
    }

    if let Some(timestamp) = &field.timestamp {
        let format = timestamp.format.as_deref().unwrap_or(TIMESTAMP_FORMAT);
        return Ok(request.timestamp.format(format).to_string());
    }

    // Unreachable for templates that passed layout validation
    Err(Error::Render {
        reason: format!("template '{}' contains a field with no value source", template.name),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    const CHALLAN: &str = r#"
[page]
width = 842.0
height = 595.0

[[field]]
y = 571.0
x = [75.0, 350.0, 625.0]
param = "challan_no"

[[field]]
y = 212.0
x = [142.0, 420.0, 696.0]
date = { param = "expiry_date" }

[[field]]
y = 188.0
x = [220.0, 495.0, 770.0]
size = 9.0
date = { param = "expiry_date", add_days = 7 }

[[field]]
y = 173.0
x = [220.0, 495.0, 770.0]
size = 9.0
date = { param = "expiry_date", add_days = 21 }
"#;

    fn challan_request() -> GenerationRequest {
        GenerationRequest {
            id: Uuid::nil(),
            template: "challan".to_string(),
            params: HashMap::from([
                ("challan_no".to_string(), json!("22")),
                ("expiry_date".to_string(), json!("2025-05-20")),
            ]),
            timestamp: Utc.with_ymd_and_hms(2025, 5, 1, 9, 0, 0).unwrap(),
        }
    }

    #[test]
    fn rerendering_identical_input_is_byte_identical() {
        let template = Template::from_toml("challan", CHALLAN).unwrap();
        let request = challan_request();

        let first = render_document(&template, &request).unwrap();
        let second = render_document(&template, &request).unwrap();
        assert_eq!(first, second);
        assert!(!first.is_empty());
    }

    #[test]
    fn derived_dates_follow_day_offsets() {
        let template = Template::from_toml("challan", CHALLAN).unwrap();
        let bytes = render_document(&template, &challan_request()).unwrap();
        let text = String::from_utf8_lossy(&bytes);

        // expiry itself, +7 days, +21 days, each rendered DD-MM-YYYY
        assert!(text.contains("(20-05-2025)"));
        assert!(text.contains("(27-05-2025)"));
        assert!(text.contains("(10-06-2025)"));
    }

    #[test]
    fn value_is_stamped_at_every_x_position() {
        let template = Template::from_toml("challan", CHALLAN).unwrap();
        let bytes = render_document(&template, &challan_request()).unwrap();
        let text = String::from_utf8_lossy(&bytes);

        assert_eq!(text.matches("(22) Tj").count(), 3);
    }

    #[test]
    fn zero_content_render_is_a_failure() {
        let source = r#"
[[field]]
y = 100.0
x = [50.0]
param = "note"
default = ""
"#;
        let template = Template::from_toml("memo", source).unwrap();
        let request = GenerationRequest::new("memo".to_string(), HashMap::new(), None);

        let err = render_document(&template, &request).unwrap_err();
        assert!(matches!(err, Error::Render { .. }));
    }

    #[test]
    fn optional_param_falls_back_to_default() {
        let source = r#"
[[field]]
y = 100.0
x = [50.0]
param = "note"
default = "n/a"
"#;
        let template = Template::from_toml("memo", source).unwrap();
        let request = GenerationRequest::new("memo".to_string(), HashMap::new(), None);

        let bytes = render_document(&template, &request).unwrap();
        assert!(String::from_utf8_lossy(&bytes).contains("(n/a)"));
    }

    #[test]
    fn timestamp_field_uses_request_timestamp() {
        let source = r#"
[[field]]
y = 100.0
x = [50.0]
timestamp = { format = "%Y-%m-%d" }
"#;
        let template = Template::from_toml("stamped", source).unwrap();
        let mut request = GenerationRequest::new("stamped".to_string(), HashMap::new(), None);
        request.timestamp = Utc.with_ymd_and_hms(2025, 5, 1, 9, 0, 0).unwrap();

        let bytes = render_document(&template, &request).unwrap();
        assert!(String::from_utf8_lossy(&bytes).contains("(2025-05-01)"));
    }

    #[test]
    fn numeric_params_render_via_display() {
        let source = r#"
[[field]]
y = 100.0
x = [50.0]
param = "amount"
"#;
        let template = Template::from_toml("amounts", source).unwrap();
        let request = GenerationRequest::new(
            "amounts".to_string(),
            HashMap::from([("amount".to_string(), json!(42.5))]),
            None,
        );

        let bytes = render_document(&template, &request).unwrap();
        assert!(String::from_utf8_lossy(&bytes).contains("(42.5)"));
    }
}
