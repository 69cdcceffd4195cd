#![forbid(unsafe_code)]

//! Control-level events delivered by the host platform.
//!
//! The host delegates focus, validity, and lifecycle notifications to the
//! engine as [`ControlEvent`]s. Events carry only what the engine needs to
//! drive the interaction state machine; raw input handling stays host-side.

/// An event delivered to a form-participating control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlEvent {
    /// Focus gained or lost.
    ///
    /// `true` = focus gained, `false` = focus lost.
    Focus(bool),
    /// The platform flagged the control invalid (submit-time constraint
    /// report or an explicit validity check).
    Invalid,
    /// The owning form was reset.
    FormReset,
    /// An observed attribute changed.
    AttributeChanged(String),
    /// The disabled flag flipped; the show-error decision must be
    /// re-derived without touching validity.
    DisabledChanged,
}

impl ControlEvent {
    /// Short name for logging.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Focus(true) => "focus",
            Self::Focus(false) => "blur",
            Self::Invalid => "invalid",
            Self::FormReset => "form_reset",
            Self::AttributeChanged(_) => "attribute_changed",
            Self::DisabledChanged => "disabled_changed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_names() {
        assert_eq!(ControlEvent::Focus(true).name(), "focus");
        assert_eq!(ControlEvent::Focus(false).name(), "blur");
        assert_eq!(ControlEvent::Invalid.name(), "invalid");
        assert_eq!(ControlEvent::FormReset.name(), "form_reset");
        assert_eq!(
            ControlEvent::AttributeChanged("minlength".into()).name(),
            "attribute_changed"
        );
        assert_eq!(ControlEvent::DisabledChanged.name(), "disabled_changed");
    }
}
