#![forbid(unsafe_code)]

//! Host abstraction traits.
//!
//! The engine never mutates a concrete control type's internals. The
//! control implements [`FormControl`] (value slot, checked slot, override
//! hooks) and delegates lifecycle calls to the engine, while the platform
//! side implements [`FormBinding`] (value commit, validity commit, styling
//! marker, group clearing).

use crate::validity::{ValidityKind, ValidityMap};
use crate::value::FormValue;

// ---------------------------------------------------------------------------
// FocusTarget
// ---------------------------------------------------------------------------

/// Opaque handle to the element that should receive keyboard focus when the
/// control is reported invalid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FocusTarget {
    id: String,
}

impl FocusTarget {
    /// Create a focus target handle.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    /// The host-side identifier of the target element.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }
}

// ---------------------------------------------------------------------------
// ControlView
// ---------------------------------------------------------------------------

/// Read-only view of a control, as seen by validators and message functions.
pub trait ControlView {
    /// Current value of the named attribute, if set.
    fn attribute(&self, name: &str) -> Option<String>;

    /// Whether the control is disabled.
    fn is_disabled(&self) -> bool {
        false
    }
}

// ---------------------------------------------------------------------------
// FormControl
// ---------------------------------------------------------------------------

/// Author-facing surface of a form-participating control.
///
/// Every method except [`value`](Self::value) has a default; a minimal text
/// control only supplies its value slot and attribute lookup.
pub trait FormControl: ControlView {
    /// The value slot: the control's current internal value.
    fn value(&self) -> Option<FormValue>;

    /// The checked slot. Controls without a checked notion stay `true`.
    fn is_checked(&self) -> bool {
        true
    }

    /// Whether the current value should actually reach the form.
    ///
    /// The canonical override is a checkbox/radio-like control gating on its
    /// checked slot. When this returns `false`, the form receives `None`
    /// regardless of the value handed to the bridge.
    fn should_form_value_update(&self) -> bool {
        self.is_checked()
    }

    /// Hook invoked on form reset, after the engine clears interaction
    /// state. Restore the value slot to its initial state here.
    fn reset_form_control(&mut self) {}

    /// Message override per condition. A non-empty return wins over the
    /// validator's own message.
    fn validity_callback(&self, kind: ValidityKind) -> Option<String> {
        let _ = kind;
        None
    }

    /// Invoked whenever the displayed message should change.
    fn validation_message_callback(&mut self, message: Option<&str>) {
        let _ = message;
    }

    /// Invoked after a value has been committed to the form. Fire-and-forget:
    /// the bridge does not await any work this hook starts.
    fn value_changed_callback(&mut self, value: Option<&FormValue>) {
        let _ = value;
    }

    /// The element that should receive focus when the control is reported
    /// invalid. `None` defers the focus handshake (retried, bounded).
    fn validation_target(&self) -> Option<FocusTarget> {
        None
    }
}

// ---------------------------------------------------------------------------
// FormBinding
// ---------------------------------------------------------------------------

/// Platform-side surface the engine commits into.
pub trait FormBinding {
    /// Commit the control's form value. `None` means the control currently
    /// contributes nothing.
    fn set_form_value(&mut self, value: Option<&FormValue>);

    /// Commit the validity snapshot, the selected message, and the focus
    /// target when one is available.
    fn set_validity(
        &mut self,
        validity: &ValidityMap,
        message: Option<&str>,
        target: Option<&FocusTarget>,
    );

    /// Toggle the externally observable show-error marker used for styling.
    fn set_error_shown(&mut self, shown: bool) {
        let _ = shown;
    }

    /// Clear the validity of every sibling control sharing this control's
    /// group (same local name + `name` attribute under the same root).
    /// One-directional: no sibling re-evaluation.
    fn clear_group_validity(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Minimal;

    impl ControlView for Minimal {
        fn attribute(&self, _name: &str) -> Option<String> {
            None
        }
    }

    impl FormControl for Minimal {
        fn value(&self) -> Option<FormValue> {
            Some(FormValue::text("x"))
        }
    }

    #[test]
    fn defaults_keep_gate_open() {
        let control = Minimal;
        assert!(control.is_checked());
        assert!(control.should_form_value_update());
        assert!(!control.is_disabled());
        assert!(control.validation_target().is_none());
        assert!(control.validity_callback(ValidityKind::Custom).is_none());
    }

    struct CheckboxLike {
        checked: bool,
    }

    impl ControlView for CheckboxLike {
        fn attribute(&self, _name: &str) -> Option<String> {
            None
        }
    }

    impl FormControl for CheckboxLike {
        fn value(&self) -> Option<FormValue> {
            Some(FormValue::text("on"))
        }

        fn is_checked(&self) -> bool {
            self.checked
        }
    }

    #[test]
    fn checked_slot_drives_default_gate() {
        assert!(!CheckboxLike { checked: false }.should_form_value_update());
        assert!(CheckboxLike { checked: true }.should_form_value_update());
    }

    #[test]
    fn focus_target_id() {
        let target = FocusTarget::new("inner-input");
        assert_eq!(target.id(), "inner-input");
    }
}
