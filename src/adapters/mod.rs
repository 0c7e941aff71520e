// Adapters layer: concrete implementations for external systems (validator processes).

pub mod process;
pub mod validator;

pub use validator::{BinaryValidator, DockerValidator};
