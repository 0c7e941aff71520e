pub mod engine;
pub mod extractor;
pub mod materializer;
pub mod verifier;

pub use crate::domain::model::{CheckOutcome, Fingerprint, Role, Snippet};
pub use crate::domain::ports::{CheckContext, Storage, Validator};
pub use crate::utils::error::Result;
