//! Features and feature collections.
//!
//! A [`Feature`] is a geometry with a schema-less set of scalar attributes. Features live in a
//! [`FeatureCollection`], which also records the coordinate system of all its geometries and the attribute schema
//! (names of the columns the collection was created with).

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use alerta_types::Crs;
use serde::{Deserialize, Serialize};

use crate::error::{AlertaError, Result};

/// Attribute value types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    /// Missing value.
    Null,
    /// Integer number.
    Integer(i64),
    /// Floating point number.
    Float(f64),
    /// String.
    Text(String),
}

impl AttributeValue {
    /// Returns the string for text values.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the numeric value for numbers.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns true for [`AttributeValue::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Text representation used for pattern matching and grouping. `None` for null values.
    pub fn to_text(&self) -> Option<String> {
        match self {
            Self::Null => None,
            Self::Integer(v) => Some(v.to_string()),
            Self::Float(v) => Some(v.to_string()),
            Self::Text(v) => Some(v.clone()),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

/// Attribute map of a feature.
pub type Attributes = BTreeMap<String, AttributeValue>;

/// Identifier of a feature, unique within one collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FeatureId(pub u64);

impl Display for FeatureId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identifier of a cadastral property, used to correlate overlay fragments with their property and to group them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JoinKey(String);

impl JoinKey {
    /// Creates a key from the attribute value. Null values have no key.
    pub fn from_value(value: &AttributeValue) -> Option<Self> {
        value.to_text().map(Self)
    }

    /// The key as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for JoinKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<JoinKey> for AttributeValue {
    fn from(value: JoinKey) -> Self {
        Self::Text(value.0)
    }
}

/// A geographic feature with geometry and attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature<G> {
    id: FeatureId,
    /// Feature attributes.
    pub attributes: Attributes,
    /// Feature geometry.
    pub geometry: G,
}

impl<G> Feature<G> {
    /// Identifier of the feature in its collection.
    pub fn id(&self) -> FeatureId {
        self.id
    }

    /// Get an attribute.
    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }

    /// Join key stored in the `name` attribute. `None` if the attribute is missing or null.
    pub fn join_key(&self, name: &str) -> Option<JoinKey> {
        self.get(name).and_then(JoinKey::from_value)
    }
}

/// Ordered collection of features sharing one coordinate system.
///
/// Order is preserved by every operation of the pipeline, so that runs over the same input are reproducible.
/// Identifiers are assigned sequentially on insertion and never reused within a collection.
#[derive(Debug, Clone)]
pub struct FeatureCollection<G> {
    crs: Crs,
    schema: Vec<String>,
    features: Vec<Feature<G>>,
    next_id: u64,
}

impl<G> FeatureCollection<G> {
    /// Creates an empty collection with the given schema.
    pub fn new(crs: Crs, schema: impl IntoIterator<Item = impl Into<String>>) -> Self {
        let mut unique: Vec<String> = Vec::new();
        for name in schema {
            let name = name.into();
            if !unique.contains(&name) {
                unique.push(name);
            }
        }

        Self {
            crs,
            schema: unique,
            features: Vec::new(),
            next_id: 0,
        }
    }

    /// Adds a feature to the end of the collection and returns its id.
    ///
    /// Attributes not present in the schema are dropped.
    pub fn push(&mut self, mut attributes: Attributes, geometry: G) -> FeatureId {
        attributes.retain(|name, _| self.schema.contains(name));
        let id = FeatureId(self.next_id);
        self.next_id += 1;
        self.features.push(Feature {
            id,
            attributes,
            geometry,
        });

        id
    }

    /// Coordinate system of the geometries.
    pub fn crs(&self) -> &Crs {
        &self.crs
    }

    /// Names of the attribute columns.
    pub fn schema(&self) -> &[String] {
        &self.schema
    }

    /// Returns true if the column exists in the schema, even if every feature has a null value in it.
    pub fn has_field(&self, name: &str) -> bool {
        self.schema.iter().any(|f| f == name)
    }

    /// Returns [`AlertaError::Schema`] if the column does not exist.
    pub fn require_field(&self, name: &str) -> Result<()> {
        if self.has_field(name) {
            Ok(())
        } else {
            Err(AlertaError::Schema(name.to_string()))
        }
    }

    /// Adds a column to the schema. Existing features get no value for it.
    pub fn add_field(&mut self, name: impl Into<String>) {
        let name = name.into();
        if !self.has_field(&name) {
            self.schema.push(name);
        }
    }

    /// Number of features.
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Returns true if there are no features.
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Iterates over the features in order.
    pub fn iter(&self) -> impl Iterator<Item = &Feature<G>> {
        self.features.iter()
    }

    /// Features as a slice.
    pub fn features(&self) -> &[Feature<G>] {
        &self.features
    }

    /// Mutable access to the features. Ids cannot be changed through it.
    pub fn features_mut(&mut self) -> &mut [Feature<G>] {
        &mut self.features
    }

    /// Creates an empty collection with the same coordinate system and schema.
    pub fn empty_like<T>(&self) -> FeatureCollection<T> {
        FeatureCollection {
            crs: self.crs.clone(),
            schema: self.schema.clone(),
            features: Vec::new(),
            next_id: 0,
        }
    }

    /// Keeps the features for which the predicate returns true. Ids of the retained features do not change.
    pub fn retain(&mut self, f: impl FnMut(&Feature<G>) -> bool) {
        self.features.retain(f);
    }

    /// Splits the collection into the coordinate system, schema and features.
    pub fn into_parts(self) -> (Crs, Vec<String>, Vec<Feature<G>>) {
        (self.crs, self.schema, self.features)
    }

    /// Replaces every geometry using the function, keeping ids and attributes, and declares the new coordinate
    /// system.
    pub fn try_map_geometries<T, E>(
        self,
        crs: Crs,
        mut f: impl FnMut(&Feature<G>) -> std::result::Result<T, E>,
    ) -> std::result::Result<FeatureCollection<T>, E> {
        let features = self
            .features
            .iter()
            .map(|feature| {
                Ok(Feature {
                    id: feature.id,
                    attributes: feature.attributes.clone(),
                    geometry: f(feature)?,
                })
            })
            .collect::<std::result::Result<Vec<_>, E>>()?;

        Ok(FeatureCollection {
            crs,
            schema: self.schema,
            features,
            next_id: self.next_id,
        })
    }
}

impl<G> IntoIterator for FeatureCollection<G> {
    type Item = Feature<G>;
    type IntoIter = std::vec::IntoIter<Feature<G>>;

    fn into_iter(self) -> Self::IntoIter {
        self.features.into_iter()
    }
}

/// Builds an attribute map from `(name, value)` pairs.
///
/// ```
/// use alerta::attributes;
///
/// let attrs = attributes! { "cod_imovel" => "PA-1", "area_ha" => 2.5 };
/// assert_eq!(attrs.len(), 2);
/// ```
#[macro_export]
macro_rules! attributes {
    ($($name:expr => $value:expr),* $(,)?) => {{
        #[allow(unused_mut)]
        let mut map = $crate::feature::Attributes::new();
        $(map.insert($name.to_string(), $crate::feature::AttributeValue::from($value));)*
        map
    }};
}
