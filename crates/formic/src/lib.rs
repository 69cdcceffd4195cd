#![forbid(unsafe_code)]

//! Formic public facade crate.
//!
//! This crate provides the stable, ergonomic surface area for users. It
//! re-exports common types from the internal crates and offers a
//! lightweight prelude for day-to-day usage.

// --- Core re-exports -------------------------------------------------------

pub use formic_core::event::ControlEvent;
pub use formic_core::host::{ControlView, FocusTarget, FormBinding, FormControl};
pub use formic_core::validity::{ValidityFlags, ValidityKind, ValidityMap};
pub use formic_core::value::{FileUpload, FormValue};

// --- Validator re-exports --------------------------------------------------

pub use formic_validity::{
    AsyncCompleter, AsyncCompletion, EvalContext, RunEpoch, Validator, ValidatorSet, Verdict,
};
pub use formic_validity::{
    EmailValidator, MaxLengthValidator, MinLengthValidator, PatternValidator,
    ProgrammaticValidator, RequiredValidator, UrlValidator,
};

// --- Engine re-exports -----------------------------------------------------

pub use formic_control::{
    ControlEngine, ControlState, InteractionPhase, RevalidateSource, RunEvent, ValidationTicket,
    ValidationTrace,
};

// --- Data helper re-exports ------------------------------------------------

#[cfg(feature = "data")]
pub use formic_data::{form_values, form_values_nested};

// --- Prelude --------------------------------------------------------------

pub mod prelude {
    //! Common imports for building a form-participating control.

    pub use crate::{
        ControlEngine, ControlEvent, ControlView, FocusTarget, FormBinding, FormControl,
        FormValue, Validator, ValidatorSet, ValidityKind, ValidityMap, Verdict,
    };
}
