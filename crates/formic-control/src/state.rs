#![forbid(unsafe_code)]

//! Per-control interaction state.
//!
//! Tracks the touched/focused/forced-error flags fed by focus, blur, and
//! invalid events, the value slots the bridge maintains, and the
//! focus-target handshake bookkeeping. The show-error decision is a pure
//! function of this state plus the control's validity and disabled flag, so
//! re-enabling a control restores the previously derived value without any
//! stored history.

use formic_core::value::FormValue;
use formic_validity::RunEpoch;

// ---------------------------------------------------------------------------
// InteractionPhase
// ---------------------------------------------------------------------------

/// Derived interaction phase of a control.
///
/// Blurred-but-untouched is unreachable: blur always implies touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionPhase {
    /// Never focused, never flagged.
    Pristine,
    /// Touched, currently valid and holding focus.
    Focused,
    /// Touched, valid, not focused.
    TouchedValid,
    /// Touched and invalid, but the error is not currently surfaced.
    TouchedInvalidHidden,
    /// Touched and invalid with the error surfaced.
    TouchedInvalidShown,
}

// ---------------------------------------------------------------------------
// ControlState
// ---------------------------------------------------------------------------

/// Mutable state of one form-participating control.
#[derive(Debug, Clone, Default)]
pub struct ControlState {
    /// The control's internal value, held even while the commit gate is off.
    pub current_value: Option<FormValue>,
    /// The value the form actually received on the last commit.
    pub committed_value: Option<FormValue>,
    /// True from first focus; cleared only by form reset.
    pub touched: bool,
    /// True between focus and blur.
    pub focused: bool,
    /// Sticky error flag: keeps the error surfaced after blur until the
    /// value changes or validation clears it.
    pub forced_error: bool,
    /// True while an invalid commit is waiting for a focus target to appear.
    pub awaiting_target: bool,
    /// Remaining bounded retries for the focus-target poll.
    pub target_retries: u8,
    /// Epoch whose target retries were exhausted; retried again on the next
    /// run's commit, never within the same one.
    pub target_exhausted_epoch: RunEpoch,
    /// Last pushed value of the externally observable show-error marker.
    pub error_shown: bool,
    /// Last message handed to the control's message callback.
    pub displayed_message: Option<String>,
}

impl ControlState {
    /// Fresh state for a newly constructed control.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The show-error decision.
    ///
    /// Pure: `!disabled && (forced_error || (touched && !valid && !focused))`.
    #[must_use]
    pub fn show_error(&self, valid: bool, disabled: bool) -> bool {
        if disabled {
            return false;
        }
        self.forced_error || (self.touched && !valid && !self.focused)
    }

    /// Derived interaction phase.
    #[must_use]
    pub fn phase(&self, valid: bool, disabled: bool) -> InteractionPhase {
        if !self.touched {
            return InteractionPhase::Pristine;
        }
        if !valid {
            return if self.show_error(valid, disabled) {
                InteractionPhase::TouchedInvalidShown
            } else {
                InteractionPhase::TouchedInvalidHidden
            };
        }
        if self.focused {
            InteractionPhase::Focused
        } else {
            InteractionPhase::TouchedValid
        }
    }

    /// First focus: marks touched.
    pub fn focus_gained(&mut self) {
        self.touched = true;
        self.focused = true;
    }

    /// Blur. Blur always implies touched.
    pub fn focus_lost(&mut self) {
        self.touched = true;
        self.focused = false;
    }

    /// Form reset: clears touched and forced-error. Value slots are the
    /// control's to restore via its reset hook.
    pub fn reset(&mut self) {
        self.touched = false;
        self.forced_error = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn pristine_shows_no_error() {
        let state = ControlState::new();
        assert!(!state.show_error(false, false));
        assert_eq!(state.phase(false, false), InteractionPhase::Pristine);
    }

    #[test]
    fn invalid_while_focused_stays_hidden() {
        let mut state = ControlState::new();
        state.focus_gained();
        assert!(!state.show_error(false, false));
        assert_eq!(state.phase(false, false), InteractionPhase::TouchedInvalidHidden);
    }

    #[test]
    fn invalid_after_blur_is_shown() {
        let mut state = ControlState::new();
        state.focus_gained();
        state.focus_lost();
        assert!(state.show_error(false, false));
        assert_eq!(state.phase(false, false), InteractionPhase::TouchedInvalidShown);
    }

    #[test]
    fn forced_error_overrides_focus() {
        let mut state = ControlState::new();
        state.focus_gained();
        state.forced_error = true;
        assert!(state.show_error(false, false));
        assert!(state.show_error(true, false), "forced error shows even when valid");
    }

    #[test]
    fn disabled_gates_everything() {
        let mut state = ControlState::new();
        state.focus_gained();
        state.focus_lost();
        state.forced_error = true;
        assert!(!state.show_error(false, true));
        // Re-enabling restores the derived value.
        assert!(state.show_error(false, false));
    }

    #[test]
    fn reset_clears_flags() {
        let mut state = ControlState::new();
        state.focus_gained();
        state.focus_lost();
        state.forced_error = true;
        state.reset();
        assert!(!state.touched);
        assert!(!state.forced_error);
        assert!(!state.show_error(false, false));
    }

    #[test]
    fn valid_phases() {
        let mut state = ControlState::new();
        state.focus_gained();
        assert_eq!(state.phase(true, false), InteractionPhase::Focused);
        state.focus_lost();
        assert_eq!(state.phase(true, false), InteractionPhase::TouchedValid);
    }

    proptest! {
        // Disabled always wins, for every flag combination.
        #[test]
        fn disabled_always_suppresses(touched: bool, focused: bool, forced: bool, valid: bool) {
            let state = ControlState {
                touched,
                focused,
                forced_error: forced,
                ..ControlState::default()
            };
            prop_assert!(!state.show_error(valid, true));
        }

        // The decision is exactly the documented formula.
        #[test]
        fn show_error_matches_formula(touched: bool, focused: bool, forced: bool, valid: bool) {
            let state = ControlState {
                touched,
                focused,
                forced_error: forced,
                ..ControlState::default()
            };
            let expected = forced || (touched && !valid && !focused);
            prop_assert_eq!(state.show_error(valid, false), expected);
        }
    }
}
