#![forbid(unsafe_code)]

//! Core: form value model, validity state, events, and host abstractions.

pub mod event;
pub mod host;
pub mod validity;
pub mod value;

pub use event::ControlEvent;
pub use host::{ControlView, FocusTarget, FormBinding, FormControl};
pub use validity::{ValidityFlags, ValidityKind, ValidityMap};
pub use value::{FileUpload, FormValue};
