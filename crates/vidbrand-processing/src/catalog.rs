//! Static registry of named video filter presets.
//!
//! Each entry maps a symbolic name to a filter-graph fragment applied to
//! the primary video stream before the logo overlay. The set is fixed at
//! startup; operators may replace it through configuration.

use anyhow::{Context, Result};
use rand::seq::IndexedRandom;
use rand::Rng;

use vidbrand_core::config::FilterSelection;

/// One catalog entry: a symbolic name and the graph fragment it expands to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterSpec {
    pub name: String,
    pub graph: String,
}

impl FilterSpec {
    fn new(name: &str, graph: &str) -> Self {
        Self {
            name: name.to_string(),
            graph: graph.to_string(),
        }
    }
}

/// Process-wide set of filter presets.
#[derive(Debug, Clone)]
pub struct FilterCatalog {
    specs: Vec<FilterSpec>,
}

impl Default for FilterCatalog {
    fn default() -> Self {
        Self {
            specs: vec![
                FilterSpec::new("grayscale", "hue=s=0"),
                FilterSpec::new("high_contrast", "eq=contrast=1.5"),
                FilterSpec::new("hue_shift", "hue=h=90"),
                FilterSpec::new("invert", "negate"),
                FilterSpec::new("blur", "boxblur=2:1"),
                FilterSpec::new("warm", "eq=saturation=1.3:gamma=1.1"),
            ],
        }
    }
}

impl FilterCatalog {
    /// Build a catalog from configuration overrides, falling back to the
    /// built-in set when none are configured.
    pub fn from_config(overrides: Option<&[(String, String)]>) -> Self {
        match overrides {
            Some(pairs) if !pairs.is_empty() => Self {
                specs: pairs
                    .iter()
                    .map(|(name, graph)| FilterSpec {
                        name: name.clone(),
                        graph: graph.clone(),
                    })
                    .collect(),
            },
            _ => Self::default(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&FilterSpec> {
        self.specs.iter().find(|spec| spec.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.specs.iter().map(|spec| spec.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Resolve the configured selection strategy to a concrete preset.
    /// Random selection draws from the caller-supplied source so tests
    /// can seed it.
    pub fn select<R: Rng + ?Sized>(
        &self,
        selection: &FilterSelection,
        rng: &mut R,
    ) -> Result<&FilterSpec> {
        match selection {
            FilterSelection::Fixed(name) => self
                .get(name)
                .with_context(|| format!("filter '{}' is not in the catalog", name)),
            FilterSelection::Random => self
                .specs
                .choose(rng)
                .context("filter catalog is empty"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_default_catalog_has_distinct_names() {
        let catalog = FilterCatalog::default();
        let mut names: Vec<&str> = catalog.names().collect();
        let total = names.len();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), total);
        assert!(total >= 4);
    }

    #[test]
    fn test_lookup_by_name() {
        let catalog = FilterCatalog::default();
        assert_eq!(catalog.get("grayscale").unwrap().graph, "hue=s=0");
        assert!(catalog.get("nonexistent").is_none());
    }

    #[test]
    fn test_overrides_replace_builtin_set() {
        let pairs = vec![("mono".to_string(), "hue=s=0".to_string())];
        let catalog = FilterCatalog::from_config(Some(&pairs));
        assert_eq!(catalog.len(), 1);
        assert!(catalog.get("mono").is_some());
        assert!(catalog.get("grayscale").is_none());
    }

    #[test]
    fn test_select_fixed() {
        let catalog = FilterCatalog::default();
        let mut rng = StdRng::seed_from_u64(0);
        let selection = FilterSelection::Fixed("invert".to_string());
        assert_eq!(
            catalog.select(&selection, &mut rng).unwrap().name,
            "invert"
        );
    }

    #[test]
    fn test_select_fixed_unknown_fails() {
        let catalog = FilterCatalog::default();
        let mut rng = StdRng::seed_from_u64(0);
        let selection = FilterSelection::Fixed("sepia".to_string());
        assert!(catalog.select(&selection, &mut rng).is_err());
    }

    #[test]
    fn test_select_random_is_deterministic_under_a_seed() {
        let catalog = FilterCatalog::default();
        let pick = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            catalog
                .select(&FilterSelection::Random, &mut rng)
                .unwrap()
                .name
                .clone()
        };
        assert_eq!(pick(42), pick(42));
    }

    #[test]
    fn test_select_random_from_empty_catalog_fails() {
        let catalog = FilterCatalog { specs: vec![] };
        let mut rng = StdRng::seed_from_u64(0);
        assert!(catalog.select(&FilterSelection::Random, &mut rng).is_err());
    }
}
