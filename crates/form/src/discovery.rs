//! Fallback validator discovery.
//!
//! Consulted only when the explicit [`ValidatorRegistry`](crate::registry::ValidatorRegistry)
//! has no entry for a model type. Candidates are scanned in the order the
//! source yields them and the first exact type match wins. That order is
//! not a contract: `inventory` collects submissions in link order.

use std::any::TypeId;

use crate::registry::ValidatorDescriptor;

/// Source of every validator type known to the process.
pub trait TypeDiscovery: Send + Sync {
    /// All known validator descriptors.
    fn all_known_types(&self) -> Vec<ValidatorDescriptor>;

    /// First known validator for `model_type`.
    fn discover(&self, model_type: TypeId) -> Option<ValidatorDescriptor> {
        self.all_known_types()
            .into_iter()
            .find(|descriptor| descriptor.validates(model_type))
    }
}

/// Discovery over a fixed, injected list of descriptors.
#[derive(Debug, Clone, Default)]
pub struct StaticDiscovery {
    descriptors: Vec<ValidatorDescriptor>,
}

impl StaticDiscovery {
    /// Creates discovery over `descriptors`, scanned in order.
    pub fn new(descriptors: Vec<ValidatorDescriptor>) -> Self {
        Self { descriptors }
    }
}

impl FromIterator<ValidatorDescriptor> for StaticDiscovery {
    fn from_iter<I: IntoIterator<Item = ValidatorDescriptor>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl TypeDiscovery for StaticDiscovery {
    fn all_known_types(&self) -> Vec<ValidatorDescriptor> {
        self.descriptors.clone()
    }

    fn discover(&self, model_type: TypeId) -> Option<ValidatorDescriptor> {
        self.descriptors
            .iter()
            .find(|descriptor| descriptor.validates(model_type))
            .cloned()
    }
}

// ---------------------------------------------------------------------------
// Link-time registry
// ---------------------------------------------------------------------------

/// Link-time registration entry, submitted with [`submit_validator!`](crate::submit_validator).
#[cfg(feature = "inventory")]
pub struct ValidatorRegistration {
    describe: fn() -> ValidatorDescriptor,
}

#[cfg(feature = "inventory")]
impl ValidatorRegistration {
    /// Creates a registration from a descriptor constructor.
    pub const fn new(describe: fn() -> ValidatorDescriptor) -> Self {
        Self { describe }
    }

    /// Builds the descriptor.
    pub fn descriptor(&self) -> ValidatorDescriptor {
        (self.describe)()
    }
}

#[cfg(feature = "inventory")]
inventory::collect!(ValidatorRegistration);

/// Discovery over every [`ValidatorRegistration`] linked into the binary.
#[cfg(feature = "inventory")]
#[derive(Debug, Clone, Copy, Default)]
pub struct InventoryDiscovery;

#[cfg(feature = "inventory")]
impl TypeDiscovery for InventoryDiscovery {
    fn all_known_types(&self) -> Vec<ValidatorDescriptor> {
        inventory::iter::<ValidatorRegistration>()
            .map(ValidatorRegistration::descriptor)
            .collect()
    }
}

/// Submits a default-constructible validator to [`InventoryDiscovery`].
///
/// ```rust,ignore
/// nebula_form::submit_validator!(Person => PersonValidator);
/// ```
#[cfg(feature = "inventory")]
#[macro_export]
macro_rules! submit_validator {
    ($model:ty => $validator:ty) => {
        $crate::__private::inventory::submit! {
            $crate::discovery::ValidatorRegistration::new(|| {
                $crate::registry::ValidatorDescriptor::of_default::<$model, $validator>()
            })
        }
    };
}
