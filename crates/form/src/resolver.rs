//! Picks the validator for a model instance.

use std::fmt;
use std::sync::Arc;

use crate::discovery::TypeDiscovery;
use crate::error::{Error, Result};
use crate::model::ModelRef;
use crate::registry::{ServiceProvider, ValidatorRegistry};
use crate::validator::SharedValidator;

/// Where a resolved validator came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionSource {
    /// Supplied at bind time.
    Explicit,
    /// Found in the explicit registry.
    Registry,
    /// Found by fallback discovery.
    Discovery,
}

/// Resolves exactly one validator per model instance.
///
/// Order: the explicit validator (unconditionally, nothing else is
/// consulted), then the registry, then fallback discovery. Registry and
/// discovery hits are instantiated afresh on every call, through the
/// service provider when one is configured.
#[derive(Clone)]
pub struct ValidatorResolver {
    explicit: Option<SharedValidator>,
    registry: Arc<ValidatorRegistry>,
    services: Option<Arc<dyn ServiceProvider>>,
    discovery: Option<Arc<dyn TypeDiscovery>>,
}

impl ValidatorResolver {
    /// Resolver backed by `registry` only.
    pub fn new(registry: Arc<ValidatorRegistry>) -> Self {
        Self {
            explicit: None,
            registry,
            services: None,
            discovery: None,
        }
    }

    /// Always resolve to `validator`.
    #[must_use = "builder methods must be chained or built"]
    pub fn with_explicit(mut self, validator: Option<SharedValidator>) -> Self {
        self.explicit = validator;
        self
    }

    /// Instantiate discovered validators through `services`.
    #[must_use = "builder methods must be chained or built"]
    pub fn with_services(mut self, services: Option<Arc<dyn ServiceProvider>>) -> Self {
        self.services = services;
        self
    }

    /// Consult `discovery` when the registry has no match.
    #[must_use = "builder methods must be chained or built"]
    pub fn with_discovery(mut self, discovery: Option<Arc<dyn TypeDiscovery>>) -> Self {
        self.discovery = discovery;
        self
    }

    /// Returns `true` if an explicit validator short-circuits resolution.
    pub fn has_explicit(&self) -> bool {
        self.explicit.is_some()
    }

    /// Resolves a validator for `model`'s runtime type.
    pub fn resolve(&self, model: &ModelRef) -> Result<SharedValidator> {
        self.resolve_with_source(model).map(|(validator, _)| validator)
    }

    /// Like [`resolve`](Self::resolve), also reporting where the validator
    /// came from.
    pub fn resolve_with_source(
        &self,
        model: &ModelRef,
    ) -> Result<(SharedValidator, ResolutionSource)> {
        if let Some(explicit) = &self.explicit {
            return Ok((Arc::clone(explicit), ResolutionSource::Explicit));
        }

        let (descriptor, source) = match self.registry.find(model.type_id()) {
            Some(descriptor) => (descriptor, ResolutionSource::Registry),
            None => self
                .discovery
                .as_ref()
                .and_then(|discovery| discovery.discover(model.type_id()))
                .map(|descriptor| (descriptor, ResolutionSource::Discovery))
                .ok_or(Error::ValidatorNotFound {
                    model_type: model.type_name(),
                })?,
        };

        let validator = descriptor.instantiate(self.services.as_deref())?;
        tracing::debug!(
            model_type = model.type_name(),
            validator_type = descriptor.validator_type_name(),
            ?source,
            "Resolved validator"
        );
        Ok((validator, source))
    }
}

impl fmt::Debug for ValidatorResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidatorResolver")
            .field(
                "explicit",
                &self.explicit.as_ref().map(|validator| validator.validator_type()),
            )
            .field("registry", &self.registry)
            .field("services", &self.services.is_some())
            .field("discovery", &self.discovery.is_some())
            .finish()
    }
}
