#![forbid(unsafe_code)]

//! Pluggable validation: the validator trait, verdict model, and registry.
//!
//! This crate provides:
//! - A core [`Validator`] trait covering synchronous and asynchronous
//!   validators (descriptor folded in: trigger attributes, governed
//!   condition, message)
//! - The [`Verdict`] model with epoch-bound [`AsyncCompleter`] handles for
//!   deferred results and staleness-safe delivery
//! - An ordered [`ValidatorSet`] registry with observed-attribute derivation
//!   and per-attribute lookup
//! - Built-in validators for common constraints (required, min/max length,
//!   pattern, email, URL, programmatic)
//!
//! # Example
//!
//! ```rust
//! use formic_validity::{RequiredValidator, MinLengthValidator, ValidatorSet};
//!
//! let validators = ValidatorSet::new(vec![
//!     Box::new(RequiredValidator::new()),
//!     Box::new(MinLengthValidator::new()),
//! ]);
//! assert_eq!(validators.observed_attributes(), vec!["required", "minlength"]);
//! assert_eq!(validators.triggered_by("minlength"), vec![1]);
//! ```

pub mod eval;
pub mod registry;
pub mod validator;
pub mod validators;

pub use eval::{AsyncCompleter, AsyncCompletion, CompletionChannel, EvalContext, RunEpoch, Verdict};
pub use registry::ValidatorSet;
pub use validator::Validator;
pub use validators::{
    EmailValidator, MaxLengthValidator, MinLengthValidator, PatternValidator,
    ProgrammaticValidator, RequiredValidator, UrlValidator,
};
