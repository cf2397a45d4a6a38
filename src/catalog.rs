use {
    rand::{seq::SliceRandom, Rng},
    serde::{Deserialize, Serialize},
    std::sync::Arc,
};

/// A monitored product with our baseline price
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: u32,
    pub name: String,
    pub category: String,
    pub our_price: f64,
}

impl Product {
    pub fn new(id: u32, name: impl Into<String>, category: impl Into<String>, our_price: f64) -> Self {
        Self {
            id,
            name: name.into(),
            category: category.into(),
            our_price,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CatalogError {
    Empty,
    DuplicateId(u32),
    InvalidPrice { id: u32, price: f64 },
}

impl std::fmt::Display for CatalogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogError::Empty => write!(f, "Catalog must contain at least one product"),
            CatalogError::DuplicateId(id) => write!(f, "Duplicate product id: {}", id),
            CatalogError::InvalidPrice { id, price } => {
                write!(f, "Product {} has non-positive price {}", id, price)
            }
        }
    }
}

impl std::error::Error for CatalogError {}

/// Static, read-only product list
///
/// Loaded once at startup and never mutated afterwards. Cloning is cheap
/// (shared `Arc`), so the emitter and the dashboard can each hold one.
#[derive(Debug, Clone)]
pub struct Catalog {
    products: Arc<[Product]>,
}

impl Catalog {
    pub fn new(products: Vec<Product>) -> Result<Self, CatalogError> {
        if products.is_empty() {
            return Err(CatalogError::Empty);
        }

        for (i, product) in products.iter().enumerate() {
            if product.our_price <= 0.0 || !product.our_price.is_finite() {
                return Err(CatalogError::InvalidPrice {
                    id: product.id,
                    price: product.our_price,
                });
            }
            if products[..i].iter().any(|p| p.id == product.id) {
                return Err(CatalogError::DuplicateId(product.id));
            }
        }

        Ok(Self {
            products: products.into(),
        })
    }

    /// Built-in sample catalog (in production this would come from a database)
    pub fn sample() -> Self {
        Self {
            products: sample_products().into(),
        }
    }

    /// Pick one product uniformly at random
    pub fn choose<R: Rng + ?Sized>(&self, rng: &mut R) -> &Product {
        // Construction guarantees at least one product
        self.products
            .choose(rng)
            .unwrap_or(&self.products[0])
    }

    pub fn get(&self, id: u32) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

pub fn sample_products() -> Vec<Product> {
    vec![
        Product::new(1, "4K Smart TV", "electronics", 799.99),
        Product::new(2, "Blender", "appliances", 89.99),
        Product::new(3, "Smart Thermostat", "smart home", 149.99),
    ]
}
