use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use validator::{Validate, ValidationError};

use crate::models::PropertyType;

/// Query string of the comparables endpoint
///
/// Field names follow the public contract of the lookup tool (French keys).
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_query"))]
pub struct ComparablesQuery {
    #[validate(length(min = 1, message = "Adresse manquante"))]
    #[validate(custom(function = "validate_address", message = "Adresse manquante"))]
    #[serde(default)]
    pub adresse: String,
    #[serde(default)]
    pub type_bien: Option<String>,
    #[validate(range(min = 1.0))]
    #[serde(default)]
    pub surface: Option<f64>,
    #[validate(range(min = 1.0))]
    #[serde(default)]
    pub prix: Option<f64>,
    #[validate(range(max = 50))]
    #[serde(default)]
    pub pieces: Option<u32>,
    #[validate(range(min = 50.0, max = 5000.0))]
    #[serde(default)]
    pub rayon: Option<f64>,
    #[serde(default)]
    pub format: Option<String>,
}

fn validate_address(address: &str) -> Result<(), ValidationError> {
    if address.trim().is_empty() {
        return Err(ValidationError::new("blank_address"));
    }
    Ok(())
}

fn invalid(code: &'static str, message: String) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(Cow::from(message));
    err
}

/// Cross-field checks the field attributes cannot express
///
/// Range checks let NaN through, so every numeric input must also be finite.
fn validate_query(query: &ComparablesQuery) -> Result<(), ValidationError> {
    for (name, value) in [
        ("surface", query.surface),
        ("prix", query.prix),
        ("rayon", query.rayon),
    ] {
        if let Some(v) = value {
            if !v.is_finite() {
                return Err(invalid("non_finite", format!("{} doit être un nombre fini", name)));
            }
        }
    }

    if let Some(type_bien) = query.type_bien.as_deref() {
        if PropertyType::parse(type_bien).is_none() {
            return Err(invalid(
                "unknown_property_type",
                format!("type_bien inconnu: {} (Maison ou Appartement)", type_bien),
            ));
        }
    }

    Ok(())
}

impl ComparablesQuery {
    pub fn wants_html(&self) -> bool {
        self.format
            .as_deref()
            .map(|f| f.eq_ignore_ascii_case("html"))
            .unwrap_or(false)
    }
}
