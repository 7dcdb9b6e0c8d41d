//! Explicit model-type -> validator registry.
//!
//! The host application populates a [`ValidatorRegistry`] at startup. Each
//! entry is a [`ValidatorDescriptor`]: the model type it validates plus the
//! ways to construct the validator, either with no dependencies or through
//! a [`ServiceProvider`].

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;

use crate::error::{BoxError, Error, Result};
use crate::validator::{SharedValidator, Validator, typed};

type DefaultCtor = Arc<dyn Fn() -> std::result::Result<SharedValidator, BoxError> + Send + Sync>;
type InjectedCtor =
    Arc<dyn Fn(&dyn ServiceProvider) -> std::result::Result<SharedValidator, BoxError> + Send + Sync>;

// ---------------------------------------------------------------------------
// ServiceProvider
// ---------------------------------------------------------------------------

/// Dependency-resolution container used to build validators that need
/// collaborators (repositories, remote clients, clocks).
pub trait ServiceProvider: Send + Sync {
    /// Looks up a service by type.
    fn get_service(&self, type_id: TypeId) -> Option<Arc<dyn Any + Send + Sync>>;
}

impl dyn ServiceProvider + '_ {
    /// Typed lookup.
    pub fn get<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.get_service(TypeId::of::<T>())
            .and_then(|service| service.downcast::<T>().ok())
    }

    /// Typed lookup that fails with a descriptive error, for use inside
    /// validator factories.
    pub fn require<T: Send + Sync + 'static>(&self) -> std::result::Result<Arc<T>, BoxError> {
        self.get::<T>().ok_or_else(|| {
            format!("service '{}' is not registered", std::any::type_name::<T>()).into()
        })
    }
}

/// Minimal [`ServiceProvider`] keyed by concrete service type.
#[derive(Default)]
pub struct ServiceContainer {
    services: DashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl ServiceContainer {
    /// Creates an empty container.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `service`, replacing any previous service of the same type.
    pub fn insert<T: Send + Sync + 'static>(&self, service: T) {
        self.insert_arc(Arc::new(service));
    }

    /// Registers an already shared service.
    pub fn insert_arc<T: Send + Sync + 'static>(&self, service: Arc<T>) {
        self.services.insert(TypeId::of::<T>(), service);
    }

    /// Number of registered services.
    pub fn len(&self) -> usize {
        self.services.len()
    }

    /// Returns `true` if no services are registered.
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

impl ServiceProvider for ServiceContainer {
    fn get_service(&self, type_id: TypeId) -> Option<Arc<dyn Any + Send + Sync>> {
        self.services
            .get(&type_id)
            .map(|entry| Arc::clone(entry.value()))
    }
}

impl fmt::Debug for ServiceContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceContainer")
            .field("services", &self.services.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// ValidatorDescriptor
// ---------------------------------------------------------------------------

/// A validator type known to the resolver: which model type it validates
/// and how to build it.
#[derive(Clone)]
pub struct ValidatorDescriptor {
    model_type: TypeId,
    model_type_name: &'static str,
    validator_type_name: &'static str,
    default_ctor: Option<DefaultCtor>,
    injected_ctor: Option<InjectedCtor>,
}

impl ValidatorDescriptor {
    /// Describes a validator built with `V::default()` on both paths.
    pub fn of_default<M, V>() -> Self
    where
        M: Send + Sync + 'static,
        V: Validator<M> + Default,
    {
        let ctor: DefaultCtor = Arc::new(|| Ok(typed::<M, V>(V::default())));
        let injected = Arc::clone(&ctor);
        Self {
            model_type: TypeId::of::<M>(),
            model_type_name: std::any::type_name::<M>(),
            validator_type_name: std::any::type_name::<V>(),
            default_ctor: Some(ctor),
            injected_ctor: Some(Arc::new(move |_| injected())),
        }
    }

    /// Describes a validator that needs services from a container.
    ///
    /// Without a container such a validator has no construction path and
    /// resolution fails with [`Error::ValidatorConstructionFailed`].
    pub fn of_factory<M, V, F>(factory: F) -> Self
    where
        M: Send + Sync + 'static,
        V: Validator<M>,
        F: Fn(&dyn ServiceProvider) -> std::result::Result<V, BoxError> + Send + Sync + 'static,
    {
        Self {
            model_type: TypeId::of::<M>(),
            model_type_name: std::any::type_name::<M>(),
            validator_type_name: std::any::type_name::<V>(),
            default_ctor: None,
            injected_ctor: Some(Arc::new(move |services| {
                factory(services).map(typed::<M, V>)
            })),
        }
    }

    /// Adds (or replaces) the dependency-free construction path.
    #[must_use = "builder methods must be chained or built"]
    pub fn with_default<F>(mut self, ctor: F) -> Self
    where
        F: Fn() -> std::result::Result<SharedValidator, BoxError> + Send + Sync + 'static,
    {
        self.default_ctor = Some(Arc::new(ctor));
        self
    }

    /// The model type this validator accepts.
    pub fn model_type(&self) -> TypeId {
        self.model_type
    }

    /// Model type name, for diagnostics.
    pub fn model_type_name(&self) -> &'static str {
        self.model_type_name
    }

    /// Validator type name, for diagnostics.
    pub fn validator_type_name(&self) -> &'static str {
        self.validator_type_name
    }

    /// Exact runtime type match; supertypes do not exist here, so there is
    /// nothing looser to match on.
    pub fn validates(&self, model_type: TypeId) -> bool {
        self.model_type == model_type
    }

    /// Builds a fresh validator instance.
    ///
    /// With a container the injected path is used; otherwise the default
    /// path. Factory errors surface as
    /// [`Error::ValidatorConstructionFailed`].
    pub fn instantiate(&self, services: Option<&dyn ServiceProvider>) -> Result<SharedValidator> {
        let built = match (services, &self.injected_ctor, &self.default_ctor) {
            (Some(services), Some(injected), _) => injected(services),
            (_, _, Some(default)) => default(),
            (None, _, None) => Err("no default construction path; a service provider is required".into()),
            (Some(_), None, None) => Err("descriptor has no construction path".into()),
        };

        built.map_err(|source| Error::ValidatorConstructionFailed {
            model_type: self.model_type_name,
            validator_type: self.validator_type_name,
            source,
        })
    }
}

impl fmt::Debug for ValidatorDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidatorDescriptor")
            .field("model_type", &self.model_type_name)
            .field("validator_type", &self.validator_type_name)
            .field("default_ctor", &self.default_ctor.is_some())
            .field("injected_ctor", &self.injected_ctor.is_some())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// ValidatorRegistry
// ---------------------------------------------------------------------------

/// Startup-populated mapping from model type to validator descriptors.
///
/// Several validators may be registered for one model type; the resolver
/// uses the first one registered.
#[derive(Default)]
pub struct ValidatorRegistry {
    by_model: DashMap<TypeId, Vec<ValidatorDescriptor>>,
}

impl ValidatorRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `V` for models of type `M`, built with `V::default()`.
    pub fn register<M, V>(&self)
    where
        M: Send + Sync + 'static,
        V: Validator<M> + Default,
    {
        self.register_descriptor(ValidatorDescriptor::of_default::<M, V>());
    }

    /// Registers a validator whose construction needs a container.
    pub fn register_factory<M, V, F>(&self, factory: F)
    where
        M: Send + Sync + 'static,
        V: Validator<M>,
        F: Fn(&dyn ServiceProvider) -> std::result::Result<V, BoxError> + Send + Sync + 'static,
    {
        self.register_descriptor(ValidatorDescriptor::of_factory::<M, V, F>(factory));
    }

    /// Registers a prepared descriptor.
    pub fn register_descriptor(&self, descriptor: ValidatorDescriptor) {
        tracing::debug!(
            model_type = descriptor.model_type_name(),
            validator_type = descriptor.validator_type_name(),
            "Registered validator"
        );
        self.by_model
            .entry(descriptor.model_type())
            .or_default()
            .push(descriptor);
    }

    /// First descriptor registered for `model_type`.
    pub fn find(&self, model_type: TypeId) -> Option<ValidatorDescriptor> {
        self.by_model
            .get(&model_type)
            .and_then(|entry| entry.value().first().cloned())
    }

    /// All descriptors registered for `model_type`, in registration order.
    pub fn candidates(&self, model_type: TypeId) -> Vec<ValidatorDescriptor> {
        self.by_model
            .get(&model_type)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    /// Returns `true` if any validator is registered for `M`.
    pub fn contains<M: 'static>(&self) -> bool {
        self.by_model.contains_key(&TypeId::of::<M>())
    }

    /// Number of model types with at least one validator.
    pub fn len(&self) -> usize {
        self.by_model.len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.by_model.is_empty()
    }
}

impl fmt::Debug for ValidatorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidatorRegistry")
            .field("model_types", &self.by_model.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModelRef;
    use crate::validator::{Finding, ValidationRequest, ValidationScope};
    use async_trait::async_trait;

    struct Invoice {
        total: i64,
    }

    #[derive(Default)]
    struct InvoiceValidator;

    #[async_trait]
    impl Validator<Invoice> for InvoiceValidator {
        async fn validate(
            &self,
            model: &Invoice,
            _scope: &ValidationScope,
        ) -> std::result::Result<Vec<Finding>, BoxError> {
            Ok(if model.total < 0 {
                vec![Finding::new("Total", "Total must not be negative")]
            } else {
                Vec::new()
            })
        }
    }

    struct Limits {
        max_total: i64,
    }

    struct LimitedInvoiceValidator {
        limits: Arc<Limits>,
    }

    #[async_trait]
    impl Validator<Invoice> for LimitedInvoiceValidator {
        async fn validate(
            &self,
            model: &Invoice,
            _scope: &ValidationScope,
        ) -> std::result::Result<Vec<Finding>, BoxError> {
            Ok(if model.total > self.limits.max_total {
                vec![Finding::new("Total", "Total over limit")]
            } else {
                Vec::new()
            })
        }
    }

    fn limited() -> ValidatorDescriptor {
        ValidatorDescriptor::of_factory::<Invoice, _, _>(|services| {
            Ok(LimitedInvoiceValidator {
                limits: services.require::<Limits>()?,
            })
        })
    }

    #[test]
    fn first_registration_wins() {
        let registry = ValidatorRegistry::new();
        registry.register::<Invoice, InvoiceValidator>();
        registry.register_descriptor(limited());

        let found = registry.find(TypeId::of::<Invoice>()).unwrap();
        assert!(found.validator_type_name().ends_with("InvoiceValidator"));
        assert!(!found.validator_type_name().ends_with("LimitedInvoiceValidator"));
        assert_eq!(registry.candidates(TypeId::of::<Invoice>()).len(), 2);
        assert_eq!(registry.len(), 1);
        assert!(registry.contains::<Invoice>());
        assert!(!registry.contains::<String>());
    }

    #[tokio::test]
    async fn factory_pulls_dependencies_from_container() {
        let services = ServiceContainer::new();
        services.insert(Limits { max_total: 100 });

        let validator = limited().instantiate(Some(&services)).unwrap();
        let findings = validator
            .validate(&ValidationRequest::new(ModelRef::new(Invoice { total: 250 })))
            .await
            .unwrap();
        assert_eq!(findings, vec![Finding::new("Total", "Total over limit")]);
    }

    #[test]
    fn factory_without_container_cannot_be_built() {
        let err = limited().instantiate(None).map(|_| ()).unwrap_err();
        assert!(matches!(err, Error::ValidatorConstructionFailed { .. }));
    }

    #[test]
    fn factory_with_missing_service_fails_construction() {
        let services = ServiceContainer::new();
        let err = limited().instantiate(Some(&services)).map(|_| ()).unwrap_err();

        match err {
            Error::ValidatorConstructionFailed { source, .. } => {
                assert!(source.to_string().contains("Limits"));
            }
            other => panic!("expected construction failure, got {other:?}"),
        }
    }

    #[test]
    fn default_descriptor_builds_with_or_without_container() {
        let descriptor = ValidatorDescriptor::of_default::<Invoice, InvoiceValidator>();
        assert!(descriptor.validates(TypeId::of::<Invoice>()));
        assert!(descriptor.instantiate(None).is_ok());
        assert!(descriptor.instantiate(Some(&ServiceContainer::new())).is_ok());
    }
}
