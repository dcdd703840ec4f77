//! Donation products offered through the checkout provider.

use gitreader_api_types::{CheckoutMode, ProductView};
use serde::Deserialize;

use super::error::DomainError;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Product {
    pub id: String,
    pub price_id: String,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub mode: CheckoutMode,
}

impl Product {
    pub fn view(&self) -> ProductView {
        ProductView {
            id: self.id.clone(),
            price_id: self.price_id.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            mode: self.mode,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductCatalog {
    products: Vec<Product>,
}

impl ProductCatalog {
    pub fn new(products: Vec<Product>) -> Self {
        Self { products }
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn find_by_id(&self, id: &str) -> Option<&Product> {
        self.products.iter().find(|product| product.id == id)
    }

    pub fn find_by_price_id(&self, price_id: &str) -> Option<&Product> {
        self.products
            .iter()
            .find(|product| product.price_id == price_id)
    }

    /// Resolve the product a checkout request refers to.
    pub fn require_price(&self, price_id: &str) -> Result<&Product, DomainError> {
        self.find_by_price_id(price_id)
            .ok_or_else(|| DomainError::UnknownProduct {
                price_id: price_id.to_string(),
            })
    }
}

impl Default for ProductCatalog {
    fn default() -> Self {
        Self::new(vec![Product {
            id: "prod_SV22oFHwwL6FWa".to_string(),
            price_id: "price_1Ra1y6FyAcNX3QOkMGnmklSO".to_string(),
            name: "GitReader".to_string(),
            description: "Donate a couple of tokens to keep the vibes flowing".to_string(),
            mode: CheckoutMode::Payment,
        }])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_catalog_resolves_by_id_and_price() {
        let catalog = ProductCatalog::default();
        let product = catalog
            .find_by_id("prod_SV22oFHwwL6FWa")
            .expect("default product");
        assert_eq!(
            catalog.find_by_price_id(&product.price_id),
            Some(product)
        );
        assert_eq!(product.mode, CheckoutMode::Payment);
    }

    #[test]
    fn unknown_price_is_rejected() {
        let catalog = ProductCatalog::default();
        assert!(matches!(
            catalog.require_price("price_missing"),
            Err(DomainError::UnknownProduct { .. })
        ));
    }
}
