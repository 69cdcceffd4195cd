#![forbid(unsafe_code)]

//! Form-participation engine for custom controls.
//!
//! A [`ControlEngine`] lets a custom control participate in a host form:
//! value submission through the commit-gated bridge, ordered sync/async
//! validation with epoch-based staleness rejection, and the focus/blur/
//! touched-driven show-error policy. The concrete control implements
//! `formic_core::FormControl` and delegates lifecycle calls to the engine;
//! the platform side implements `formic_core::FormBinding` and receives the
//! commits.
//!
//! # Example
//!
//! ```rust,ignore
//! use formic_control::ControlEngine;
//! use formic_validity::{RequiredValidator, MinLengthValidator, ValidatorSet};
//!
//! let mut engine = ControlEngine::new(ValidatorSet::new(vec![
//!     Box::new(RequiredValidator::new()),
//!     Box::new(MinLengthValidator::new()),
//! ]));
//! engine.connected(&mut control, &mut form);
//! engine.set_value(&mut control, &mut form, Some("hello".into()));
//! assert!(engine.is_valid());
//! ```

pub mod engine;
pub mod state;
pub mod trace;

pub use engine::{ControlEngine, RevalidateSource, TARGET_RETRY_ATTEMPTS, ValidationTicket};
pub use state::{ControlState, InteractionPhase};
pub use trace::{RunEvent, ValidationTrace};
