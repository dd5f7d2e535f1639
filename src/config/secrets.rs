//! Secret handling utilities.
//!
//! Re-exports the secrecy types used for store connection URLs so callers
//! can expose them without depending on secrecy directly.

pub use secrecy::{ExposeSecret, SecretString};
