#![forbid(unsafe_code)]

//! The validator trait.

use formic_core::host::ControlView;
use formic_core::validity::ValidityKind;
use formic_core::value::FormValue;

use crate::eval::{EvalContext, Verdict};

/// A pluggable validity rule for a form-participating control.
///
/// The descriptor is folded into the trait: each validator declares the
/// attributes whose change re-triggers it, the validity condition it
/// governs, and its message. `evaluate` may resolve synchronously or return
/// [`Verdict::Pending`] after arranging for a completer (taken from the
/// [`EvalContext`]) to deliver the verdict later.
///
/// # Message selection
///
/// Within one ordered set, the first validator (registration order) whose
/// synchronous result is invalid determines the surfaced message; later
/// validators may still flip other validity conditions but never overwrite
/// the chosen message.
///
/// # Implementing a Custom Validator
///
/// ```rust
/// use formic_core::{ControlView, FormValue};
/// use formic_validity::{EvalContext, Validator, Verdict};
///
/// struct NoSpaces;
///
/// impl Validator for NoSpaces {
///     fn message(&self, _host: &dyn ControlView, _value: Option<&FormValue>) -> String {
///         "Value must not contain spaces".to_string()
///     }
///
///     fn evaluate(
///         &self,
///         _host: &dyn ControlView,
///         value: Option<&FormValue>,
///         _cx: &EvalContext,
///     ) -> Verdict {
///         let has_space = value
///             .and_then(FormValue::as_text)
///             .is_some_and(|text| text.contains(' '));
///         Verdict::from_bool(!has_space)
///     }
/// }
/// ```
pub trait Validator: Send + Sync {
    /// Attribute names whose change re-triggers this validator. A validator
    /// tied to several names is re-triggered by a change to any of them.
    fn trigger_attributes(&self) -> &[&str] {
        &[]
    }

    /// The validity condition this validator governs.
    fn kind(&self) -> ValidityKind {
        ValidityKind::Custom
    }

    /// Resolve the message for the current host and value.
    fn message(&self, host: &dyn ControlView, value: Option<&FormValue>) -> String;

    /// Evaluate the control's value.
    ///
    /// Synchronous validators return [`Verdict::Valid`] or
    /// [`Verdict::Invalid`] directly. Asynchronous validators take a
    /// completer from `cx`, start their work, and return
    /// [`Verdict::Pending`]; a completion of `None` means "no opinion,
    /// leave the prior state for this condition".
    fn evaluate(
        &self,
        host: &dyn ControlView,
        value: Option<&FormValue>,
        cx: &EvalContext,
    ) -> Verdict;
}
