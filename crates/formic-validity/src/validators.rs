#![forbid(unsafe_code)]

//! Built-in validators.
//!
//! Each built-in reads its constraint from the host's attributes (the same
//! attribute that re-triggers it), so a control picks up constraint changes
//! without re-registering validators. Conventions, applied consistently:
//!
//! - An empty or absent value is valid for length, pattern, and type
//!   validators — pair them with [`RequiredValidator`] to reject emptiness.
//! - Length boundaries are inclusive: a value exactly at `minlength` or
//!   `maxlength` is valid.
//! - A malformed constraint attribute (unparsable length, invalid pattern
//!   source) disables that validator rather than failing the control.

use formic_core::host::ControlView;
use formic_core::validity::ValidityKind;
use formic_core::value::FormValue;
use regex::Regex;

use crate::eval::{EvalContext, Verdict};
use crate::validator::Validator;

// ---------------------------------------------------------------------------
// Default messages
// ---------------------------------------------------------------------------

/// Default message for a missing required value.
pub const MSG_REQUIRED: &str = "This field is required";
/// Default message for a pattern mismatch.
pub const MSG_PATTERN: &str = "Please match the requested format";
/// Default message for an invalid email address.
pub const MSG_EMAIL: &str = "Invalid email address";
/// Default message for an invalid URL.
pub const MSG_URL: &str = "Invalid URL";

fn text_of(value: Option<&FormValue>) -> Option<&str> {
    value.and_then(FormValue::as_text)
}

// ---------------------------------------------------------------------------
// RequiredValidator
// ---------------------------------------------------------------------------

/// Requires a non-empty value while the host carries the `required`
/// attribute. Without the attribute, always valid.
#[derive(Debug, Clone, Default)]
pub struct RequiredValidator {
    message: Option<String>,
}

impl RequiredValidator {
    /// Create a new required validator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the default message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl Validator for RequiredValidator {
    fn trigger_attributes(&self) -> &[&str] {
        &["required"]
    }

    fn kind(&self) -> ValidityKind {
        ValidityKind::ValueMissing
    }

    fn message(&self, _host: &dyn ControlView, _value: Option<&FormValue>) -> String {
        self.message.clone().unwrap_or_else(|| MSG_REQUIRED.into())
    }

    fn evaluate(
        &self,
        host: &dyn ControlView,
        value: Option<&FormValue>,
        _cx: &EvalContext,
    ) -> Verdict {
        if host.attribute("required").is_none() {
            return Verdict::Valid;
        }
        Verdict::from_bool(value.is_some_and(|v| !v.is_empty()))
    }
}

// ---------------------------------------------------------------------------
// MinLengthValidator
// ---------------------------------------------------------------------------

/// Enforces the `minlength` attribute on text values.
///
/// Empty values are valid; the boundary is inclusive (a value exactly
/// `minlength` characters long passes).
#[derive(Debug, Clone, Default)]
pub struct MinLengthValidator {
    message: Option<String>,
}

impl MinLengthValidator {
    /// Create a new min-length validator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the default message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    fn constraint(host: &dyn ControlView) -> Option<usize> {
        host.attribute("minlength")?.trim().parse().ok()
    }
}

impl Validator for MinLengthValidator {
    fn trigger_attributes(&self) -> &[&str] {
        &["minlength"]
    }

    fn kind(&self) -> ValidityKind {
        ValidityKind::TooShort
    }

    fn message(&self, host: &dyn ControlView, _value: Option<&FormValue>) -> String {
        if let Some(message) = &self.message {
            return message.clone();
        }
        match Self::constraint(host) {
            Some(min) => format!("Must be at least {min} characters"),
            None => "Value is too short".to_string(),
        }
    }

    fn evaluate(
        &self,
        host: &dyn ControlView,
        value: Option<&FormValue>,
        _cx: &EvalContext,
    ) -> Verdict {
        let Some(min) = Self::constraint(host) else {
            return Verdict::Valid;
        };
        match text_of(value) {
            Some(text) if !text.is_empty() => {
                Verdict::from_bool(text.chars().count() >= min)
            }
            _ => Verdict::Valid,
        }
    }
}

// ---------------------------------------------------------------------------
// MaxLengthValidator
// ---------------------------------------------------------------------------

/// Enforces the `maxlength` attribute on text values.
///
/// Empty values are valid; the boundary is inclusive (a value exactly
/// `maxlength` characters long passes).
#[derive(Debug, Clone, Default)]
pub struct MaxLengthValidator {
    message: Option<String>,
}

impl MaxLengthValidator {
    /// Create a new max-length validator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the default message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    fn constraint(host: &dyn ControlView) -> Option<usize> {
        host.attribute("maxlength")?.trim().parse().ok()
    }
}

impl Validator for MaxLengthValidator {
    fn trigger_attributes(&self) -> &[&str] {
        &["maxlength"]
    }

    fn kind(&self) -> ValidityKind {
        ValidityKind::TooLong
    }

    fn message(&self, host: &dyn ControlView, _value: Option<&FormValue>) -> String {
        if let Some(message) = &self.message {
            return message.clone();
        }
        match Self::constraint(host) {
            Some(max) => format!("Must be at most {max} characters"),
            None => "Value is too long".to_string(),
        }
    }

    fn evaluate(
        &self,
        host: &dyn ControlView,
        value: Option<&FormValue>,
        _cx: &EvalContext,
    ) -> Verdict {
        let Some(max) = Self::constraint(host) else {
            return Verdict::Valid;
        };
        match text_of(value) {
            Some(text) if !text.is_empty() => {
                Verdict::from_bool(text.chars().count() <= max)
            }
            _ => Verdict::Valid,
        }
    }
}

// ---------------------------------------------------------------------------
// PatternValidator
// ---------------------------------------------------------------------------

/// Matches text values against a regular expression, anchored to the whole
/// value.
///
/// By default the pattern source comes from the host's `pattern` attribute;
/// an invalid attribute source disables the validator. A fixed source
/// supplied at construction is compiled eagerly and panics on error.
#[derive(Debug, Clone)]
pub struct PatternValidator {
    fixed: Option<Regex>,
    message: String,
}

impl PatternValidator {
    /// Pattern source read from the host's `pattern` attribute.
    #[must_use]
    pub fn from_attribute() -> Self {
        Self {
            fixed: None,
            message: MSG_PATTERN.to_string(),
        }
    }

    /// Fixed pattern source, compiled at construction.
    ///
    /// # Panics
    ///
    /// Panics if `source` is not a valid regular expression.
    #[must_use]
    pub fn with_source(source: &str) -> Self {
        let regex = Self::compile(source)
            .unwrap_or_else(|| panic!("invalid pattern source: {source:?}"));
        Self {
            fixed: Some(regex),
            message: MSG_PATTERN.to_string(),
        }
    }

    /// Override the default message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    fn compile(source: &str) -> Option<Regex> {
        Regex::new(&format!("^(?:{source})$")).ok()
    }

    fn effective(&self, host: &dyn ControlView) -> Option<Regex> {
        if let Some(fixed) = &self.fixed {
            return Some(fixed.clone());
        }
        Self::compile(&host.attribute("pattern")?)
    }
}

impl Default for PatternValidator {
    fn default() -> Self {
        Self::from_attribute()
    }
}

impl Validator for PatternValidator {
    fn trigger_attributes(&self) -> &[&str] {
        &["pattern"]
    }

    fn kind(&self) -> ValidityKind {
        ValidityKind::PatternMismatch
    }

    fn message(&self, _host: &dyn ControlView, _value: Option<&FormValue>) -> String {
        self.message.clone()
    }

    fn evaluate(
        &self,
        host: &dyn ControlView,
        value: Option<&FormValue>,
        _cx: &EvalContext,
    ) -> Verdict {
        let Some(regex) = self.effective(host) else {
            return Verdict::Valid;
        };
        match text_of(value) {
            Some(text) if !text.is_empty() => Verdict::from_bool(regex.is_match(text)),
            _ => Verdict::Valid,
        }
    }
}

// ---------------------------------------------------------------------------
// EmailValidator
// ---------------------------------------------------------------------------

/// Heuristic email check: local part, `@`, dotted domain with a TLD of at
/// least two characters. Empty values are valid.
#[derive(Debug, Clone, Default)]
pub struct EmailValidator {
    message: Option<String>,
}

impl EmailValidator {
    /// Create a new email validator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the default message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    fn looks_like_email(text: &str) -> bool {
        let Some((local, domain)) = text.split_once('@') else {
            return false;
        };
        if local.is_empty() || domain.is_empty() || !domain.contains('.') {
            return false;
        }
        let parts: Vec<&str> = domain.split('.').collect();
        if parts.iter().any(|p| p.is_empty()) {
            return false;
        }
        parts.last().is_some_and(|tld| tld.len() >= 2)
    }
}

impl Validator for EmailValidator {
    fn kind(&self) -> ValidityKind {
        ValidityKind::TypeMismatch
    }

    fn message(&self, _host: &dyn ControlView, _value: Option<&FormValue>) -> String {
        self.message.clone().unwrap_or_else(|| MSG_EMAIL.into())
    }

    fn evaluate(
        &self,
        _host: &dyn ControlView,
        value: Option<&FormValue>,
        _cx: &EvalContext,
    ) -> Verdict {
        match text_of(value).map(str::trim) {
            Some(text) if !text.is_empty() => Verdict::from_bool(Self::looks_like_email(text)),
            _ => Verdict::Valid,
        }
    }
}

// ---------------------------------------------------------------------------
// UrlValidator
// ---------------------------------------------------------------------------

/// Heuristic URL check: `http://` or `https://` scheme with a non-empty
/// remainder. Empty values are valid.
#[derive(Debug, Clone, Copy, Default)]
pub struct UrlValidator {
    /// If `true`, require HTTPS only.
    pub require_https: bool,
}

impl UrlValidator {
    /// Create a new URL validator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Require HTTPS URLs only.
    #[must_use]
    pub fn require_https(mut self) -> Self {
        self.require_https = true;
        self
    }

    fn looks_like_url(self, text: &str) -> bool {
        if self.require_https {
            return text.starts_with("https://") && text.len() > 8;
        }
        (text.starts_with("http://") && text.len() > 7)
            || (text.starts_with("https://") && text.len() > 8)
    }
}

impl Validator for UrlValidator {
    fn kind(&self) -> ValidityKind {
        ValidityKind::TypeMismatch
    }

    fn message(&self, _host: &dyn ControlView, _value: Option<&FormValue>) -> String {
        if self.require_https {
            "Invalid URL (must use HTTPS)".to_string()
        } else {
            MSG_URL.to_string()
        }
    }

    fn evaluate(
        &self,
        _host: &dyn ControlView,
        value: Option<&FormValue>,
        _cx: &EvalContext,
    ) -> Verdict {
        match text_of(value).map(str::trim) {
            Some(text) if !text.is_empty() => Verdict::from_bool(self.looks_like_url(text)),
            _ => Verdict::Valid,
        }
    }
}

// ---------------------------------------------------------------------------
// ProgrammaticValidator
// ---------------------------------------------------------------------------

/// Predicate function type for [`ProgrammaticValidator`]. Returns `true`
/// when the value is valid.
pub type PredicateFn = Box<dyn Fn(&dyn ControlView, Option<&FormValue>) -> bool + Send + Sync>;

/// Author-defined synchronous rule wrapping a predicate closure.
pub struct ProgrammaticValidator {
    kind: ValidityKind,
    message: String,
    triggers: Vec<&'static str>,
    predicate: PredicateFn,
}

impl ProgrammaticValidator {
    /// Create a programmatic validator from a message and predicate.
    ///
    /// # Panics
    ///
    /// Panics if `message` is empty.
    #[must_use]
    pub fn new(message: impl Into<String>, predicate: PredicateFn) -> Self {
        let message = message.into();
        assert!(
            !message.is_empty(),
            "programmatic validator requires a non-empty message"
        );
        Self {
            kind: ValidityKind::Custom,
            message,
            triggers: Vec::new(),
            predicate,
        }
    }

    /// Govern a specific validity condition instead of `Custom`.
    #[must_use]
    pub fn with_kind(mut self, kind: ValidityKind) -> Self {
        self.kind = kind;
        self
    }

    /// Re-trigger on changes to the given attributes.
    #[must_use]
    pub fn watching(mut self, attributes: &[&'static str]) -> Self {
        self.triggers = attributes.to_vec();
        self
    }
}

impl std::fmt::Debug for ProgrammaticValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgrammaticValidator")
            .field("kind", &self.kind)
            .field("message", &self.message)
            .field("triggers", &self.triggers)
            .finish()
    }
}

impl Validator for ProgrammaticValidator {
    fn trigger_attributes(&self) -> &[&str] {
        &self.triggers
    }

    fn kind(&self) -> ValidityKind {
        self.kind
    }

    fn message(&self, _host: &dyn ControlView, _value: Option<&FormValue>) -> String {
        self.message.clone()
    }

    fn evaluate(
        &self,
        host: &dyn ControlView,
        value: Option<&FormValue>,
        _cx: &EvalContext,
    ) -> Verdict {
        Verdict::from_bool((self.predicate)(host, value))
    }
}
