//! Registry of recognized product short names.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;
use thiserror::Error;

/// Products known without any configuration
pub const BUILTIN_PRODUCTS: &[&str] = &[
    // VIIRS fire and geolocation
    "VNP14IMG", "VJ114IMG", "VJ214IMG", "VNP03IMG", "VJ103IMG",
    // MODIS fire and geolocation
    "MOD14", "MYD14", "MOD03", "MYD03",
];

static PRODUCT_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_]+$").expect("valid product name pattern"));

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ProductError {
    #[error("Invalid product name: '{0}'")]
    InvalidName(String),

    #[error("Unknown product '{name}'. Available products: {available}")]
    Unknown { name: String, available: String },
}

/// Check that a product name is usable as a path component
pub fn is_valid_product_name(name: &str) -> bool {
    PRODUCT_NAME.is_match(name)
}

/// The set of products a run may reconcile
#[derive(Debug, Clone)]
pub struct ProductRegistry {
    products: BTreeSet<String>,
}

impl Default for ProductRegistry {
    fn default() -> Self {
        Self {
            products: BUILTIN_PRODUCTS.iter().map(|p| p.to_string()).collect(),
        }
    }
}

impl ProductRegistry {
    /// Built-in products plus `extra`
    pub fn with_extra<I, S>(extra: I) -> Result<Self, ProductError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut registry = Self::default();
        for name in extra {
            let name = name.as_ref().trim();
            if !is_valid_product_name(name) {
                return Err(ProductError::InvalidName(name.to_string()));
            }
            registry.products.insert(name.to_string());
        }
        Ok(registry)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.products.contains(name)
    }

    /// Resolve a product given on the command line
    pub fn resolve<'a>(&self, name: &'a str) -> Result<&'a str, ProductError> {
        if !is_valid_product_name(name) {
            return Err(ProductError::InvalidName(name.to_string()));
        }
        if !self.contains(name) {
            return Err(ProductError::Unknown {
                name: name.to_string(),
                available: self.names().collect::<Vec<_>>().join(", "),
            });
        }
        Ok(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.products.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_products_resolve() {
        let registry = ProductRegistry::default();
        assert_eq!(registry.resolve("VJ114IMG"), Ok("VJ114IMG"));
        assert!(registry.contains("MYD03"));
    }

    #[test]
    fn test_unknown_product() {
        let registry = ProductRegistry::default();
        let err = registry.resolve("NOPE").unwrap_err();
        assert!(matches!(err, ProductError::Unknown { .. }));
        assert!(err.to_string().contains("MOD14"));
    }

    #[test]
    fn test_path_like_product_rejected() {
        let registry = ProductRegistry::default();
        assert!(matches!(
            registry.resolve("../MOD14"),
            Err(ProductError::InvalidName(_))
        ));
    }

    #[test]
    fn test_extra_products() {
        let registry = ProductRegistry::with_extra(["VNP46A1"]).unwrap();
        assert!(registry.contains("VNP46A1"));
        assert!(ProductRegistry::with_extra(["bad name"]).is_err());
    }
}
