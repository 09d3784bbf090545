//! Service option descriptors and resolution.
//!
//! Each service publishes descriptors for the options its `run` accepts:
//! a voice picker, a speed knob, and so on. [`resolve_options`] turns a
//! caller-supplied key/value map into a fully validated map by applying
//! per-option normalization, filling defaults, and rejecting anything the
//! descriptors do not cover.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::errors::TtsError;

/// Normalization hook applied to a raw value before validation. Typical
/// uses are case-folding and mapping human aliases onto canonical values.
pub type Transform = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// The values a single option accepts.
#[derive(Clone, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionValues {
    /// An enumerated set of `(value, label)` pairs; the stored value must
    /// match one of the `value` halves exactly (after transform).
    Choices(Vec<(String, String)>),
    /// A closed numeric interval.
    Range { min: f64, max: f64, unit: String },
}

impl fmt::Debug for OptionValues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValues::Choices(choices) => {
                write!(f, "Choices({} values)", choices.len())
            }
            OptionValues::Range { min, max, unit } => {
                write!(f, "Range({min}..{max} {unit})")
            }
        }
    }
}

/// Descriptor for one option a service accepts.
#[derive(Clone, Serialize)]
pub struct ServiceOption {
    /// Key the caller supplies the value under.
    pub key: String,
    /// Human-readable label for configuration UIs.
    pub label: String,
    /// The acceptable values.
    pub values: OptionValues,
    /// Value used when the caller supplies none. Options without a
    /// default are mandatory.
    pub default: Option<String>,
    #[serde(skip)]
    transform: Option<Transform>,
}

impl fmt::Debug for ServiceOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceOption")
            .field("key", &self.key)
            .field("label", &self.label)
            .field("values", &self.values)
            .field("default", &self.default)
            .field("transform", &self.transform.is_some())
            .finish()
    }
}

impl ServiceOption {
    pub fn new(key: impl Into<String>, label: impl Into<String>, values: OptionValues) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            values,
            default: None,
            transform: None,
        }
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn with_transform(
        mut self,
        transform: impl Fn(&str) -> String + Send + Sync + 'static,
    ) -> Self {
        self.transform = Some(Arc::new(transform));
        self
    }

    fn normalize(&self, raw: &str) -> String {
        match &self.transform {
            Some(transform) => transform(raw),
            None => raw.to_string(),
        }
    }
}

/// Resolve caller-supplied values against a service's descriptors.
///
/// Values go through the descriptor's transform first, then defaults fill
/// the gaps. A mandatory option with no value, a value outside its
/// descriptor, or a key no descriptor covers all fail resolution.
pub fn resolve_options(
    service: &str,
    descriptors: &[ServiceOption],
    given: &HashMap<String, String>,
) -> Result<HashMap<String, String>, TtsError> {
    for key in given.keys() {
        if !descriptors.iter().any(|d| d.key == *key) {
            return Err(TtsError::InvalidOption {
                service: service.to_string(),
                key: key.clone(),
                value: given[key].clone(),
                reason: "no such option".to_string(),
            });
        }
    }

    let mut resolved = HashMap::new();

    for descriptor in descriptors {
        let value = match given.get(&descriptor.key) {
            Some(raw) => descriptor.normalize(raw),
            None => match &descriptor.default {
                Some(default) => default.clone(),
                None => {
                    return Err(TtsError::MissingOption {
                        service: service.to_string(),
                        key: descriptor.key.clone(),
                    });
                }
            },
        };

        validate(service, descriptor, &value)?;
        resolved.insert(descriptor.key.clone(), value);
    }

    Ok(resolved)
}

fn validate(service: &str, descriptor: &ServiceOption, value: &str) -> Result<(), TtsError> {
    let reject = |reason: String| TtsError::InvalidOption {
        service: service.to_string(),
        key: descriptor.key.clone(),
        value: value.to_string(),
        reason,
    };

    match &descriptor.values {
        OptionValues::Choices(choices) => {
            if !choices.iter().any(|(v, _)| v == value) {
                return Err(reject(format!(
                    "not one of the {} allowed values",
                    choices.len()
                )));
            }
        }
        OptionValues::Range { min, max, unit } => {
            let parsed: f64 = value
                .parse()
                .map_err(|_| reject("not a number".to_string()))?;
            if parsed < *min || parsed > *max {
                return Err(reject(format!("outside {min}..{max} {unit}")));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn choices(pairs: &[(&str, &str)]) -> OptionValues {
        OptionValues::Choices(
            pairs
                .iter()
                .map(|(v, l)| (v.to_string(), l.to_string()))
                .collect(),
        )
    }

    fn descriptors() -> Vec<ServiceOption> {
        vec![
            ServiceOption::new("voice", "Voice", choices(&[("en", "English"), ("de", "German")]))
                .with_transform(|raw| raw.trim().to_lowercase()),
            ServiceOption::new(
                "speed",
                "Speed",
                OptionValues::Range {
                    min: 80.0,
                    max: 450.0,
                    unit: "wpm".to_string(),
                },
            )
            .with_default("175"),
        ]
    }

    #[test]
    fn test_defaults_fill_missing_values() {
        let given = HashMap::from([("voice".to_string(), "en".to_string())]);
        let resolved = resolve_options("svc", &descriptors(), &given).unwrap();
        assert_eq!(resolved["voice"], "en");
        assert_eq!(resolved["speed"], "175");
    }

    #[test]
    fn test_transform_runs_before_validation() {
        let given = HashMap::from([("voice".to_string(), "  DE ".to_string())]);
        let resolved = resolve_options("svc", &descriptors(), &given).unwrap();
        assert_eq!(resolved["voice"], "de");
    }

    #[test]
    fn test_mandatory_option_must_be_given() {
        let err = resolve_options("svc", &descriptors(), &HashMap::new()).unwrap_err();
        match err {
            TtsError::MissingOption { service, key } => {
                assert_eq!(service, "svc");
                assert_eq!(key, "voice");
            }
            other => panic!("expected MissingOption, got {other:?}"),
        }
    }

    #[test]
    fn test_choice_membership_is_enforced() {
        let given = HashMap::from([("voice".to_string(), "fr".to_string())]);
        let err = resolve_options("svc", &descriptors(), &given).unwrap_err();
        assert!(matches!(err, TtsError::InvalidOption { .. }));
    }

    #[test]
    fn test_range_bounds_and_parsing() {
        let base = HashMap::from([("voice".to_string(), "en".to_string())]);

        let mut over = base.clone();
        over.insert("speed".to_string(), "900".to_string());
        assert!(matches!(
            resolve_options("svc", &descriptors(), &over),
            Err(TtsError::InvalidOption { .. }),
        ));

        let mut junk = base.clone();
        junk.insert("speed".to_string(), "fast".to_string());
        assert!(matches!(
            resolve_options("svc", &descriptors(), &junk),
            Err(TtsError::InvalidOption { .. }),
        ));

        let mut edge = base;
        edge.insert("speed".to_string(), "450".to_string());
        let resolved = resolve_options("svc", &descriptors(), &edge).unwrap();
        assert_eq!(resolved["speed"], "450");
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let given = HashMap::from([
            ("voice".to_string(), "en".to_string()),
            ("pitch".to_string(), "50".to_string()),
        ]);
        let err = resolve_options("svc", &descriptors(), &given).unwrap_err();
        match err {
            TtsError::InvalidOption { key, reason, .. } => {
                assert_eq!(key, "pitch");
                assert_eq!(reason, "no such option");
            }
            other => panic!("expected InvalidOption, got {other:?}"),
        }
    }
}
