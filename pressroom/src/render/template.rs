//! Template layout definitions and the registry that resolves them by name.
//!
//! A template is a TOML file describing a single-page document: page geometry,
//! the base font, and a list of positioned text fields. Fields take their
//! value from one of four sources:
//!
//! - `param = "name"` — a request parameter (optionally with a `default`)
//! - `text = "literal"` — a fixed string
//! - `date = { param, add_days, format }` — a date derived from a request
//!   parameter by adding a day offset (used for payment deadline rows)
//! - `timestamp = { format }` — the request intake timestamp; the one
//!   declared non-deterministic field source
//!
//! Several documents stamp the same value at multiple horizontal positions
//! (e.g. a payment slip with bank, college, and student copies side by side),
//! so `x` is always a list of positions sharing one `y`.

use crate::errors::{Error, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use std::path::Path;

/// Date format parameters arrive in ("2025-05-20").
pub const INPUT_DATE_FORMAT: &str = "%Y-%m-%d";
/// Default format derived dates are rendered with ("20-05-2025").
pub const OUTPUT_DATE_FORMAT: &str = "%d-%m-%Y";

const DEFAULT_FONT: &str = "Helvetica-Bold";
const DEFAULT_FONT_SIZE: f64 = 10.0;

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PageSettings {
    /// Page width in points
    pub width: f64,
    /// Page height in points
    pub height: f64,
}

impl Default for PageSettings {
    fn default() -> Self {
        // A4 portrait
        Self {
            width: 595.0,
            height: 842.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FontSettings {
    /// One of the 14 standard PDF base fonts
    pub name: String,
    /// Default size for fields that do not override it
    pub size: f64,
}

impl Default for FontSettings {
    fn default() -> Self {
        Self {
            name: DEFAULT_FONT.to_string(),
            size: DEFAULT_FONT_SIZE,
        }
    }
}

/// A derived date: parse `param` as YYYY-MM-DD, add `add_days`, render with `format`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DateField {
    pub param: String,
    #[serde(default)]
    pub add_days: i64,
    pub format: Option<String>,
}

/// Renders the request intake timestamp.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimestampField {
    pub format: Option<String>,
}

impl Default for TimestampField {
    fn default() -> Self {
        Self { format: None }
    }
}

/// One positioned text field. Exactly one of `param`, `text`, `date`,
/// `timestamp` must be set; this is enforced when the template is loaded.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Field {
    /// Vertical position shared by all copies of this field
    pub y: f64,
    /// Horizontal positions, one per copy
    pub x: Vec<f64>,
    /// Font size override
    pub size: Option<f64>,
    pub param: Option<String>,
    /// Fallback value when the named param is omitted; makes the param optional
    pub default: Option<String>,
    pub text: Option<String>,
    pub date: Option<DateField>,
    pub timestamp: Option<TimestampField>,
}

impl Field {
    fn source_count(&self) -> usize {
        [
            self.param.is_some(),
            self.text.is_some(),
            self.date.is_some(),
            self.timestamp.is_some(),
        ]
        .iter()
        .filter(|set| **set)
        .count()
    }
}

/// A parsed, validated template layout.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Template {
    #[serde(skip)]
    pub name: String,
    #[serde(default)]
    pub page: PageSettings,
    #[serde(default)]
    pub font: FontSettings,
    #[serde(rename = "field", default)]
    pub fields: Vec<Field>,
}

impl Template {
    /// Parse a template from TOML source. `name` is the registry key callers
    /// use to reference it (the file stem when loaded from disk).
    pub fn from_toml(name: &str, source: &str) -> anyhow::Result<Self> {
        let mut template: Template = toml::from_str(source)?;
        template.name = name.to_string();
        template.validate_layout()?;
        Ok(template)
    }

    /// Structural checks performed once at load time, not per request.
    fn validate_layout(&self) -> anyhow::Result<()> {
        if self.page.width <= 0.0 || self.page.height <= 0.0 {
            anyhow::bail!("template '{}': page dimensions must be positive", self.name);
        }
        for (index, field) in self.fields.iter().enumerate() {
            if field.source_count() != 1 {
                anyhow::bail!(
                    "template '{}': field {} must set exactly one of param, text, date, timestamp",
                    self.name,
                    index
                );
            }
            if field.x.is_empty() {
                anyhow::bail!("template '{}': field {} has no x positions", self.name, index);
            }
            if field.default.is_some() && field.param.is_none() {
                anyhow::bail!(
                    "template '{}': field {} sets a default without a param",
                    self.name,
                    index
                );
            }
        }
        Ok(())
    }

    /// Parameters a request must supply: every `param` field without a
    /// default, plus the source param of every `date` field.
    pub fn required_params(&self) -> BTreeSet<&str> {
        let mut required = BTreeSet::new();
        for field in &self.fields {
            if let Some(param) = &field.param
                && field.default.is_none()
            {
                required.insert(param.as_str());
            }
            if let Some(date) = &field.date {
                required.insert(date.param.as_str());
            }
        }
        required
    }

    /// Params consumed by `date` fields, which must parse as YYYY-MM-DD.
    fn date_params(&self) -> BTreeSet<&str> {
        self.fields
            .iter()
            .filter_map(|field| field.date.as_ref())
            .map(|date| date.param.as_str())
            .collect()
    }

    /// Whether the template contains a timestamp field (i.e. whether output
    /// depends on the request intake time).
    pub fn has_timestamp_field(&self) -> bool {
        self.fields.iter().any(|field| field.timestamp.is_some())
    }

    /// Validate a request's parameter map against this template.
    ///
    /// Fails fast with [`Error::Validation`] before any rendering work:
    /// required params must be present, all values must be JSON scalars, and
    /// date-source params must parse as YYYY-MM-DD.
    pub fn validate_request(&self, params: &HashMap<String, Value>) -> Result<()> {
        for required in self.required_params() {
            if !params.contains_key(required) {
                return Err(Error::Validation {
                    message: format!("missing required parameter '{required}'"),
                });
            }
        }

        for (key, value) in params {
            if !matches!(value, Value::String(_) | Value::Number(_) | Value::Bool(_)) {
                return Err(Error::Validation {
                    message: format!("parameter '{key}' must be a string, number, or boolean"),
                });
            }
        }

        for date_param in self.date_params() {
            let value = &params[date_param];
            let text = param_display(value);
            if NaiveDate::parse_from_str(&text, INPUT_DATE_FORMAT).is_err() {
                return Err(Error::Validation {
                    message: format!("parameter '{date_param}' must be a date in YYYY-MM-DD format"),
                });
            }
        }

        Ok(())
    }
}

/// Render a scalar parameter value as the text that appears on the page.
pub fn param_display(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Number(number) => number.to_string(),
        Value::Bool(flag) => flag.to_string(),
        // validate_request rejects everything else before rendering
        other => other.to_string(),
    }
}

/// Immutable collection of templates, loaded once at startup and shared
/// read-only across handlers.
#[derive(Debug, Default)]
pub struct TemplateRegistry {
    templates: HashMap<String, Template>,
}

impl TemplateRegistry {
    /// Build a registry from already-parsed templates (used by tests).
    pub fn from_templates(templates: impl IntoIterator<Item = Template>) -> Self {
        Self {
            templates: templates
                .into_iter()
                .map(|template| (template.name.clone(), template))
                .collect(),
        }
    }

    /// Load every `*.toml` file in `dir` as a template named after its stem.
    ///
    /// A missing directory yields an empty registry (the health endpoint
    /// reports it as degraded) rather than a startup failure; a malformed
    /// template file is a hard error since it means a broken deployment.
    pub fn load_dir(dir: &Path) -> anyhow::Result<Self> {
        let mut templates = HashMap::new();

        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!("Template directory {:?} does not exist; no templates loaded", dir);
                return Ok(Self::default());
            }
            Err(error) => return Err(error.into()),
        };

        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("toml") {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };

            let source = std::fs::read_to_string(&path)?;
            let template = Template::from_toml(name, &source)
                .map_err(|error| anyhow::anyhow!("failed to load template {:?}: {error}", path))?;

            tracing::debug!(template = name, fields = template.fields.len(), "Loaded template");
            templates.insert(name.to_string(), template);
        }

        tracing::info!("Loaded {} template(s) from {:?}", templates.len(), dir);
        Ok(Self { templates })
    }

    pub fn resolve(&self, name: &str) -> Option<&Template> {
        self.templates.get(name)
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.templates.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
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
y = 460.0
x = [75.0, 350.0, 625.0]
param = "student_name"

[[field]]
y = 212.0
x = [142.0, 420.0, 696.0]
date = { param = "expiry_date" }

[[field]]
y = 188.0
x = [220.0, 495.0, 770.0]
size = 9.0
date = { param = "expiry_date", add_days = 7 }
"#;

    #[test]
    fn parses_layout_and_collects_required_params() {
        let template = Template::from_toml("challan", CHALLAN).unwrap();

        assert_eq!(template.name, "challan");
        assert_eq!(template.page.width, 842.0);
        assert_eq!(template.fields.len(), 4);
        assert_eq!(
            template.required_params(),
            ["challan_no", "expiry_date", "student_name"].into_iter().collect()
        );
        assert!(!template.has_timestamp_field());
    }

    #[test]
    fn default_makes_param_optional() {
        let source = r#"
[[field]]
y = 100.0
x = [50.0]
param = "note"
default = ""
"#;
        let template = Template::from_toml("memo", source).unwrap();
        assert!(template.required_params().is_empty());
        template.validate_request(&HashMap::new()).unwrap();
    }

    #[test]
    fn rejects_field_with_two_sources() {
        let source = r#"
[[field]]
y = 100.0
x = [50.0]
param = "a"
text = "b"
"#;
        assert!(Template::from_toml("bad", source).is_err());
    }

    #[test]
    fn rejects_field_without_positions() {
        let source = r#"
[[field]]
y = 100.0
x = []
text = "header"
"#;
        assert!(Template::from_toml("bad", source).is_err());
    }

    #[test]
    fn missing_required_param_is_validation_error() {
        let template = Template::from_toml("challan", CHALLAN).unwrap();
        let params = HashMap::from([("challan_no".to_string(), json!("22"))]);

        let err = template.validate_request(&params).unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
    }

    #[test]
    fn malformed_date_param_is_validation_error() {
        let template = Template::from_toml("challan", CHALLAN).unwrap();
        let params = HashMap::from([
            ("challan_no".to_string(), json!("22")),
            ("student_name".to_string(), json!("Adeel Ahmed")),
            ("expiry_date".to_string(), json!("20/05/2025")),
        ]);

        let err = template.validate_request(&params).unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
    }

    #[test]
    fn non_scalar_param_is_validation_error() {
        let template = Template::from_toml("challan", CHALLAN).unwrap();
        let params = HashMap::from([
            ("challan_no".to_string(), json!(["22"])),
            ("student_name".to_string(), json!("Adeel Ahmed")),
            ("expiry_date".to_string(), json!("2025-05-20")),
        ]);

        let err = template.validate_request(&params).unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
    }

    #[test]
    fn registry_resolves_by_name() {
        let registry = TemplateRegistry::from_templates([Template::from_toml("challan", CHALLAN).unwrap()]);

        assert!(registry.resolve("challan").is_some());
        assert!(registry.resolve("nonexistent").is_none());
        assert_eq!(registry.names(), vec!["challan"]);
    }

    #[test]
    fn load_dir_tolerates_missing_directory() {
        let registry = TemplateRegistry::load_dir(Path::new("/nonexistent/templates")).unwrap();
        assert!(registry.is_empty());
    }

    #[test]
    fn load_dir_reads_toml_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("challan.toml"), CHALLAN).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let registry = TemplateRegistry::load_dir(dir.path()).unwrap();
        assert_eq!(registry.len(), 1);
        assert!(registry.resolve("challan").is_some());
    }
}
