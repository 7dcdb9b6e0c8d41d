//! Field addressing within (possibly nested) models.

use std::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::model::ModelRef;

/// Identifies one validatable field: the model that owns it plus its name.
///
/// The owner may be a child object of the form's root model. Two
/// identifiers are equal iff they name the same model instance and the
/// same field.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct FieldIdentifier {
    model: ModelRef,
    field_name: Arc<str>,
}

impl FieldIdentifier {
    /// Creates an identifier, rejecting blank field names.
    ///
    /// Model-level messages use [`model_level`](Self::model_level) instead.
    pub fn new(model: ModelRef, field_name: impl Into<Arc<str>>) -> Result<Self> {
        let field_name = field_name.into();
        if field_name.trim().is_empty() {
            return Err(Error::invalid_input(
                "field_name",
                format!("field name on '{}' must not be empty", model.type_name()),
            ));
        }
        Ok(Self { model, field_name })
    }

    /// Identifier for messages about the model as a whole rather than one
    /// of its fields (findings reported with an empty property path).
    pub fn model_level(model: ModelRef) -> Self {
        Self {
            model,
            field_name: Arc::from(""),
        }
    }

    /// Returns `true` for a [model-level](Self::model_level) identifier.
    pub fn is_model_level(&self) -> bool {
        self.field_name.is_empty()
    }

    /// The model instance owning the field.
    pub fn model(&self) -> &ModelRef {
        &self.model
    }

    /// The field's name (or property path, for findings that report one).
    pub fn field_name(&self) -> &str {
        &self.field_name
    }
}

impl fmt::Debug for FieldIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldIdentifier")
            .field("model", &self.model)
            .field("field_name", &self.field_name)
            .finish()
    }
}

impl fmt::Display for FieldIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.model.type_name(), self.field_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    struct Person;

    #[test]
    fn equal_when_model_and_name_match() {
        let model = ModelRef::new(Person);
        let a = FieldIdentifier::new(model.clone(), "name").unwrap();
        let b = FieldIdentifier::new(model.clone(), "name").unwrap();
        let c = FieldIdentifier::new(model, "age").unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn same_name_on_other_instance_differs() {
        let a = FieldIdentifier::new(ModelRef::new(Person), "name").unwrap();
        let b = FieldIdentifier::new(ModelRef::new(Person), "name").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn model_level_identifier() {
        let model = ModelRef::new(Person);
        let field = FieldIdentifier::model_level(model.clone());

        assert!(field.is_model_level());
        assert_eq!(field, FieldIdentifier::model_level(model.clone()));
        assert!(!FieldIdentifier::new(model, "name").unwrap().is_model_level());
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    fn blank_names_are_rejected(#[case] name: &str) {
        let err = FieldIdentifier::new(ModelRef::new(Person), name).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidInput {
                argument: "field_name",
                ..
            }
        ));
    }
}
