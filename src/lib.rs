pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::cli::CliConfig;

pub use config::{FailurePolicy, ValidatorKind, VerifyConfig};
pub use core::engine::{VerificationReport, VerifyEngine};
pub use core::verifier::{SnippetOutcome, SnippetState};
pub use domain::model::{CheckOutcome, Role, Snippet};
pub use utils::error::{Result, VerifyError};
