//! # quill-core
//! Foundation types, size model and fee policy for Quill transaction authoring.

pub mod constants;
pub mod crypto;
pub mod error;
pub mod fees;
pub mod size;
pub mod traits;
pub mod types;
pub mod validation;
