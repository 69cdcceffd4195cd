#![forbid(unsafe_code)]

//! Ordered validator registry.
//!
//! Each control type declares one ordered [`ValidatorSet`]. Composition
//! across a type hierarchy is explicit and deterministic: a subtype either
//! builds its own set or extends its ancestor's with
//! [`ValidatorSet::extended_with`] — there is no automatic merging.
//!
//! An empty registry is valid and means the control is always considered
//! valid.

use crate::validator::Validator;

/// Ordered list of validators registered for one control type.
pub struct ValidatorSet {
    validators: Vec<Box<dyn Validator>>,
}

impl ValidatorSet {
    /// Build a set from an ordered validator list.
    ///
    /// # Panics
    ///
    /// Panics if any validator declares an empty trigger-attribute name.
    #[must_use]
    pub fn new(validators: Vec<Box<dyn Validator>>) -> Self {
        for (index, validator) in validators.iter().enumerate() {
            for attribute in validator.trigger_attributes() {
                assert!(
                    !attribute.is_empty(),
                    "validator #{index} declares an empty trigger attribute"
                );
            }
        }
        Self { validators }
    }

    /// An empty registry: the control is always valid.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            validators: Vec::new(),
        }
    }

    /// Extend this set with additional validators, preserving order.
    ///
    /// The deterministic composition point for subtypes: the ancestor's
    /// validators keep their positions, the new ones append after.
    #[must_use]
    pub fn extended_with(mut self, more: Vec<Box<dyn Validator>>) -> Self {
        let mut appended = Self::new(more);
        self.validators.append(&mut appended.validators);
        self
    }

    /// Number of registered validators.
    #[must_use]
    pub fn len(&self) -> usize {
        self.validators.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    /// Validator at `index`, in registration order.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&dyn Validator> {
        self.validators.get(index).map(|validator| validator.as_ref())
    }

    /// Iterate validators in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &dyn Validator> {
        self.validators.iter().map(|validator| validator.as_ref())
    }

    /// The ordered union of all trigger attributes, first occurrence wins.
    ///
    /// This is the set of attribute names the host must observe.
    #[must_use]
    pub fn observed_attributes(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for validator in &self.validators {
            for &attribute in validator.trigger_attributes() {
                if !names.contains(&attribute) {
                    names.push(attribute);
                }
            }
        }
        names
    }

    /// Indices of every validator re-triggered by a change to `attribute`.
    #[must_use]
    pub fn triggered_by(&self, attribute: &str) -> Vec<usize> {
        self.validators
            .iter()
            .enumerate()
            .filter(|(_, validator)| validator.trigger_attributes().contains(&attribute))
            .map(|(index, _)| index)
            .collect()
    }
}

impl std::fmt::Debug for ValidatorSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidatorSet")
            .field("len", &self.validators.len())
            .field("observed_attributes", &self.observed_attributes())
            .finish()
    }
}

impl Default for ValidatorSet {
    fn default() -> Self {
        Self::empty()
    }
}
