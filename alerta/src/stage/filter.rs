use crate::engine::GeometryEngine;
use crate::error::Result;
use crate::feature::FeatureCollection;

/// Substring predicate with SQL `LIKE '%pattern%'` semantics.
///
/// The pattern is matched literally: `%` and `_` have no special meaning, the only wildcards are the implicit ones at
/// both ends. An empty pattern matches every value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LikePattern {
    pattern: String,
    folded: String,
    case_insensitive: bool,
}

impl LikePattern {
    /// Creates a new pattern.
    pub fn new(pattern: impl Into<String>, case_insensitive: bool) -> Self {
        let pattern = pattern.into();
        let folded = pattern.to_lowercase();
        Self {
            pattern,
            folded,
            case_insensitive,
        }
    }

    /// The pattern text.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Whether matching ignores letter case.
    pub fn is_case_insensitive(&self) -> bool {
        self.case_insensitive
    }

    /// Returns true if the value contains the pattern.
    pub fn matches(&self, value: &str) -> bool {
        if self.case_insensitive {
            value.to_lowercase().contains(&self.folded)
        } else {
            value.contains(&self.pattern)
        }
    }
}

/// Selects cadastral features by their status attribute.
#[derive(Debug, Clone)]
pub struct StatusFilter {
    field: String,
    pattern: LikePattern,
}

impl StatusFilter {
    /// Creates a filter on the `field` attribute.
    pub fn new(field: impl Into<String>, pattern: LikePattern) -> Self {
        Self {
            field: field.into(),
            pattern,
        }
    }

    /// Keeps the features whose status contains the pattern, in input order.
    ///
    /// Features that miss the attribute or have a null value in it are dropped. Fails with
    /// [`AlertaError::Schema`](crate::AlertaError::Schema) if the attribute is not in the collection schema.
    pub fn filter<E: GeometryEngine>(
        &self,
        engine: &E,
        mut features: FeatureCollection<E::Geometry>,
    ) -> Result<FeatureCollection<E::Geometry>> {
        features.require_field(&self.field)?;

        features.retain(|feature| {
            feature
                .get(&self.field)
                .and_then(|value| value.to_text())
                .is_some_and(|text| engine.matches(&text, &self.pattern))
        });

        Ok(features)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes;
    use crate::engine::{GeoEngine, GeoEngineOptions};
    use crate::error::AlertaError;
    use crate::feature::AttributeValue;
    use alerta_types::Crs;
    use assert_matches::assert_matches;
    use geo_types::{polygon, MultiPolygon};

    fn geometry() -> MultiPolygon<f64> {
        MultiPolygon::new(vec![polygon![
            (x: 0.0, y: 0.0),
            (x: 1.0, y: 0.0),
            (x: 1.0, y: 1.0),
            (x: 0.0, y: 0.0),
        ]])
    }

    fn cadastre() -> FeatureCollection<MultiPolygon<f64>> {
        let mut fc = FeatureCollection::new(Crs::SIRGAS2000, ["cod_imovel", "des_condic"]);
        fc.push(
            attributes! { "cod_imovel" => "A", "des_condic" => "Em analise" },
            geometry(),
        );
        fc.push(
            attributes! { "cod_imovel" => "B", "des_condic" => "Aprovado" },
            geometry(),
        );
        fc.push(
            attributes! { "cod_imovel" => "C", "des_condic" => "Analise concluida" },
            geometry(),
        );
        fc.push(attributes! { "cod_imovel" => "D" }, geometry());
        fc.push(
            attributes! { "cod_imovel" => "E", "des_condic" => AttributeValue::Null },
            geometry(),
        );
        fc
    }

    fn keys(fc: &FeatureCollection<MultiPolygon<f64>>) -> Vec<String> {
        fc.iter()
            .filter_map(|f| f.join_key("cod_imovel"))
            .map(|k| k.to_string())
            .collect()
    }

    #[test]
    fn like_pattern() {
        let pattern = LikePattern::new("Analise", false);
        assert!(pattern.matches("Analise pendente"));
        assert!(!pattern.matches("Em analise"));

        let pattern = LikePattern::new("ANÁLISE", true);
        assert!(pattern.matches("Em análise"));

        assert!(LikePattern::new("", false).matches(""));
        assert!(!LikePattern::new("an%se", true).matches("analise"));
    }

    #[test]
    fn case_insensitive_filter() {
        let engine = GeoEngine::open(GeoEngineOptions::default()).unwrap();
        let filter = StatusFilter::new("des_condic", LikePattern::new("analise", true));
        let filtered = filter.filter(&engine, cadastre()).unwrap();
        assert_eq!(keys(&filtered), ["A", "C"]);
    }

    #[test]
    fn case_sensitive_filter() {
        let engine = GeoEngine::open(GeoEngineOptions::default()).unwrap();
        let filter = StatusFilter::new("des_condic", LikePattern::new("analise", false));
        let filtered = filter.filter(&engine, cadastre()).unwrap();
        assert_eq!(keys(&filtered), ["A"]);
    }

    #[test]
    fn output_is_subset_of_input() {
        let engine = GeoEngine::open(GeoEngineOptions::default()).unwrap();
        let input = cadastre();
        let input_ids: Vec<_> = input.iter().map(|f| f.id()).collect();
        let pattern = LikePattern::new("a", true);
        let filtered = StatusFilter::new("des_condic", pattern.clone())
            .filter(&engine, input)
            .unwrap();

        for feature in filtered.iter() {
            assert!(input_ids.contains(&feature.id()));
            let status = feature.get("des_condic").and_then(|v| v.as_str()).unwrap();
            assert!(pattern.matches(status));
        }
        assert_eq!(filtered.len(), 3);
    }

    #[test]
    fn no_match_is_empty_not_error() {
        let engine = GeoEngine::open(GeoEngineOptions::default()).unwrap();
        let filter = StatusFilter::new("des_condic", LikePattern::new("cancelado", true));
        let filtered = filter.filter(&engine, cadastre()).unwrap();
        assert!(filtered.is_empty());
        assert_eq!(filtered.schema(), ["cod_imovel", "des_condic"]);
    }

    #[test]
    fn missing_field_is_schema_error() {
        let engine = GeoEngine::open(GeoEngineOptions::default()).unwrap();
        let filter = StatusFilter::new("status", LikePattern::new("analise", true));
        assert_matches!(
            filter.filter(&engine, cadastre()),
            Err(AlertaError::Schema(field)) if field == "status"
        );
    }
}
