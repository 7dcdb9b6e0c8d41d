//! Validator contracts at the boundary with the rule engine.
//!
//! The engine side is expressed twice:
//!
//! - [`Validator<M>`] is what rule authors implement: typed, async, and told
//!   which members are in scope.
//! - [`ModelValidator`] is the type-erased form the resolver hands to the
//!   orchestrator. [`TypedValidator`] adapts the former into the latter.
//!
//! Both report failures of the validator itself (a remote lookup that
//! timed out, say) as `Err`; rule violations are `Ok` findings.

use std::any::TypeId;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::BoxError;
use crate::model::ModelRef;

/// Shared, type-erased validator.
pub type SharedValidator = Arc<dyn ModelValidator>;

// ============================================================================
// FINDINGS AND SCOPE
// ============================================================================

/// One rule violation reported by a validator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    /// Property path relative to the validated model, e.g. `Age` or
    /// `Address.City`.
    pub property_path: String,
    /// Human-readable message.
    pub message: String,
}

impl Finding {
    /// Creates a finding.
    pub fn new(property_path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            property_path: property_path.into(),
            message: message.into(),
        }
    }
}

/// Which rules a validation run should evaluate.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ValidationScope {
    /// Every rule the validator defines.
    #[default]
    All,
    /// Only rules for the named members (and anything nested beneath them).
    Members(Vec<String>),
}

impl ValidationScope {
    /// Restricts validation to the given member names.
    pub fn members<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Members(names.into_iter().map(Into::into).collect())
    }

    /// Returns `true` if rules for `property_path` should run.
    ///
    /// A member selects its own path and every path nested under it, so
    /// `Address` selects `Address.City` and `Items[0]`-style children.
    pub fn includes(&self, property_path: &str) -> bool {
        match self {
            Self::All => true,
            Self::Members(names) => names.iter().any(|name| {
                property_path == name
                    || property_path
                        .strip_prefix(name.as_str())
                        .is_some_and(|rest| rest.starts_with('.') || rest.starts_with('['))
            }),
        }
    }

    /// Returns `true` for [`ValidationScope::All`].
    pub fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }
}

/// A model instance together with the scope to validate it under.
#[derive(Debug, Clone)]
pub struct ValidationRequest {
    model: ModelRef,
    scope: ValidationScope,
}

impl ValidationRequest {
    /// Validate everything on `model`.
    pub fn new(model: ModelRef) -> Self {
        Self {
            model,
            scope: ValidationScope::All,
        }
    }

    /// Validate only the named members of `model`.
    pub fn restricted<I, S>(model: ModelRef, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            model,
            scope: ValidationScope::members(members),
        }
    }

    /// The instance under validation.
    pub fn model(&self) -> &ModelRef {
        &self.model
    }

    /// The rule selection.
    pub fn scope(&self) -> &ValidationScope {
        &self.scope
    }
}

// ============================================================================
// TRAITS
// ============================================================================

/// Type-erased validator as seen by the resolver and orchestrator.
#[async_trait]
pub trait ModelValidator: Send + Sync {
    /// Type name of the implementation, for diagnostics.
    fn validator_type(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Evaluates the request.
    async fn validate(&self, request: &ValidationRequest) -> Result<Vec<Finding>, BoxError>;
}

/// Typed validator for models of type `M`.
///
/// Implementations should honour `scope` and skip rules for members it
/// does not [include](ValidationScope::includes); the single-field pass
/// relies on that.
#[async_trait]
pub trait Validator<M>: Send + Sync + 'static
where
    M: Send + Sync + 'static,
{
    /// Evaluates the rules selected by `scope` against `model`.
    async fn validate(&self, model: &M, scope: &ValidationScope) -> Result<Vec<Finding>, BoxError>;
}

#[async_trait]
impl<T: ModelValidator + ?Sized> ModelValidator for Arc<T> {
    fn validator_type(&self) -> &'static str {
        (**self).validator_type()
    }

    async fn validate(&self, request: &ValidationRequest) -> Result<Vec<Finding>, BoxError> {
        (**self).validate(request).await
    }
}

// ============================================================================
// TYPED ADAPTER
// ============================================================================

/// Raised when a validator is handed a model it has no rules for.
#[derive(Debug, thiserror::Error)]
#[error("validator '{validator_type}' expects '{expected}' but was given '{actual}'")]
pub struct ModelTypeMismatch {
    /// The validator that refused the model
    pub validator_type: &'static str,
    /// The model type it validates
    pub expected: &'static str,
    /// The model type it received
    pub actual: &'static str,
}

/// Adapts a [`Validator<M>`] into a [`ModelValidator`].
///
/// Field passes run against the model that owns the field, which can be a
/// child of the form's root model. Register child validators with
/// [`with_child`](Self::with_child) so those passes find rules for the
/// nested type.
pub struct TypedValidator<M, V> {
    inner: V,
    children: Vec<(TypeId, SharedValidator)>,
    _model: PhantomData<fn(&M)>,
}

impl<M, V> TypedValidator<M, V>
where
    M: Send + Sync + 'static,
    V: Validator<M>,
{
    /// Wraps `inner`.
    pub fn new(inner: V) -> Self {
        Self {
            inner,
            children: Vec::new(),
            _model: PhantomData,
        }
    }

    /// Delegates requests for child models of type `C` to `validator`.
    #[must_use = "builder methods must be chained or built"]
    pub fn with_child<C, W>(mut self, validator: W) -> Self
    where
        C: Send + Sync + 'static,
        W: Validator<C>,
    {
        self.children
            .push((TypeId::of::<C>(), typed::<C, W>(validator)));
        self
    }

    /// The wrapped validator.
    pub fn inner(&self) -> &V {
        &self.inner
    }
}

#[async_trait]
impl<M, V> ModelValidator for TypedValidator<M, V>
where
    M: Send + Sync + 'static,
    V: Validator<M>,
{
    fn validator_type(&self) -> &'static str {
        std::any::type_name::<V>()
    }

    async fn validate(&self, request: &ValidationRequest) -> Result<Vec<Finding>, BoxError> {
        if let Some(model) = request.model().downcast::<M>() {
            return self.inner.validate(&model, request.scope()).await;
        }

        let type_id = request.model().type_id();
        match self.children.iter().find(|(id, _)| *id == type_id) {
            Some((_, child)) => child.validate(request).await,
            None => Err(Box::new(ModelTypeMismatch {
                validator_type: self.validator_type(),
                expected: std::any::type_name::<M>(),
                actual: request.model().type_name(),
            })),
        }
    }
}

impl<M, V> fmt::Debug for TypedValidator<M, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedValidator")
            .field("model", &std::any::type_name::<M>())
            .field("validator", &std::any::type_name::<V>())
            .field("children", &self.children.len())
            .finish()
    }
}

/// Erases a typed validator into a [`SharedValidator`].
pub fn typed<M, V>(validator: V) -> SharedValidator
where
    M: Send + Sync + 'static,
    V: Validator<M>,
{
    Arc::new(TypedValidator::<M, V>::new(validator))
}
