//! Product catalogue and product images.

pub mod image;
pub mod service;

pub use image::{DiskImageStore, ImageError, ImageStore, ImageUpload};
pub use service::ProductService;
