//! Catalog & party registry.
//!
//! Static reference data the workflows read: products (with their physical
//! envelope), suppliers and customers. Pure domain values, no IO.

pub mod party;
pub mod product;

pub use party::{ContactInfo, Customer, CustomerId, Supplier, SupplierId};
pub use product::{Brand, Dimensions, NewProduct, Product, ProductId};
