use crate::error::{Error, Result};
use crate::threshold::Threshold;

use std::collections::{BTreeMap, HashSet};

use serde::de::Deserializer;
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};

/// API version assumed when a document does not declare one.
pub const DEFAULT_API_VERSION: &str = "indicatorprotocol.io/v1";

/// Kind assumed when a document does not declare one.
pub const DEFAULT_KIND: &str = "IndicatorDocument";

/// A product-scoped bundle of indicators.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndicatorDocument {
    /// Schema version of the document.
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Stable identifier derived from the product name and labels.
    #[serde(default)]
    pub uid: String,

    /// Resource kind.
    #[serde(default = "default_kind")]
    pub kind: String,

    /// Labels describing where the document applies.
    #[serde(default)]
    pub metadata: Metadata,

    /// Product, indicators, and layout.
    pub spec: DocumentSpec,
}

/// Document metadata.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Metadata {
    /// Label names to values.
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

/// Body of an indicator document.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct DocumentSpec {
    /// The product the indicators describe.
    pub product: Product,

    /// Indicators in declaration order.
    #[serde(default)]
    pub indicators: Vec<Indicator>,

    /// Presentation layout. Filled with a single section when omitted.
    #[serde(default)]
    pub layout: Option<Layout>,
}

/// Product identity.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Product {
    /// Product name.
    #[serde(default)]
    pub name: String,

    /// Product version.
    #[serde(default, deserialize_with = "deserialize_scalar_string")]
    pub version: String,
}

/// A named health signal.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Indicator {
    /// Name, unique within its document.
    #[serde(default)]
    pub name: String,

    /// The query evaluated against the metrics store.
    #[serde(default)]
    pub promql: String,

    /// Thresholds in evaluation order.
    #[serde(default)]
    pub thresholds: Vec<Threshold>,

    /// Free-form documentation fields.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub documentation: BTreeMap<String, String>,

    /// Chart presentation hints. Opaque to the evaluator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presentation: Option<serde_json::Value>,
}

/// Dashboard layout of a document.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Layout {
    /// Layout title.
    #[serde(default)]
    pub title: String,

    /// Layout description.
    #[serde(default)]
    pub description: String,

    /// Grouped indicator names.
    #[serde(default)]
    pub sections: Vec<Section>,
}

/// A group of indicators in a layout.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Section {
    /// Section title.
    #[serde(default)]
    pub title: String,

    /// Section description.
    #[serde(default)]
    pub description: String,

    /// Names of the indicators in this section.
    #[serde(default)]
    pub indicators: Vec<String>,
}

impl IndicatorDocument {
    /// Parses and validates a YAML (or JSON) document, then fills in the
    /// derived fields: `uid`, and a default layout if none was given.
    ///
    /// # Errors
    ///
    /// Returns an error if the body is malformed, a threshold is not a finite
    /// number, the product has no name, or indicator names are missing or
    /// repeated.
    pub fn from_yaml(bytes: &[u8]) -> Result<Self> {
        let mut document: Self = serde_yaml::from_slice(bytes)?;
        document.validate()?;

        document.uid = document.bound_uid();
        if document.spec.layout.is_none() {
            document.spec.layout = Some(document.default_layout());
        }

        Ok(document)
    }

    /// Product name; half of the registry key.
    #[must_use]
    pub fn product_name(&self) -> &str {
        &self.spec.product.name
    }

    /// Looks up an indicator by name.
    #[must_use]
    pub fn indicator(&self, name: &str) -> Option<&Indicator> {
        self.spec.indicators.iter().find(|i| i.name == name)
    }

    /// `<product>-<sha1 of sorted labels>`.
    #[must_use]
    pub fn bound_uid(&self) -> String {
        let mut hasher = Sha1::new();
        for (key, value) in &self.metadata.labels {
            hasher.update(key.as_bytes());
            hasher.update(b"=");
            hasher.update(value.as_bytes());
            hasher.update(b"\n");
        }

        format!(
            "{}-{}",
            self.spec.product.name,
            hex::encode(hasher.finalize())
        )
    }

    fn validate(&self) -> Result<()> {
        if self.spec.product.name.trim().is_empty() {
            return Err(Error::MissingProductName);
        }

        let mut seen = HashSet::new();
        for (position, indicator) in self.spec.indicators.iter().enumerate() {
            if indicator.name.trim().is_empty() {
                return Err(Error::MissingIndicatorName(position));
            }
            if indicator.promql.trim().is_empty() {
                return Err(Error::MissingPromql(indicator.name.clone()));
            }
            if !seen.insert(indicator.name.as_str()) {
                return Err(Error::DuplicateIndicator(indicator.name.clone()));
            }
        }

        Ok(())
    }

    fn default_layout(&self) -> Layout {
        let product = &self.spec.product;

        Layout {
            title: format!("{} - {}", product.name, product.version),
            description: String::new(),
            sections: vec![Section {
                title: "Metrics".to_string(),
                description: String::new(),
                indicators: self
                    .spec
                    .indicators
                    .iter()
                    .map(|i| i.name.clone())
                    .collect(),
            }],
        }
    }
}

fn default_api_version() -> String {
    DEFAULT_API_VERSION.to_string()
}

fn default_kind() -> String {
    DEFAULT_KIND.to_string()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    String(String),
    Integer(i64),
    Float(f64),
}

// YAML reads `version: 1.0` as a float.
fn deserialize_scalar_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Scalar::deserialize(deserializer)? {
        Scalar::String(s) => s,
        Scalar::Integer(i) => i.to_string(),
        Scalar::Float(f) => f.to_string(),
    })
}
