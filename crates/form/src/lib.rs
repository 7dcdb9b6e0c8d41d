//! # Nebula Form
//!
//! Binds a form's state to an async model validator and keeps a
//! field-indexed message store in sync with the model.
//!
//! A [`FormState`] raises "validation requested" and "field changed".
//! [`FormValidation::bind`] subscribes to both: the first re-validates the
//! whole model and replaces every message, the second re-validates one
//! field and replaces only that field's messages. After each committed pass
//! the form emits "validation state changed" so the UI can re-read the
//! [`ValidationMessageStore`].
//!
//! Validators are resolved per pass: an explicit validator given at bind
//! time, else the [`ValidatorRegistry`], else fallback [`TypeDiscovery`].
//!
//! ```rust,ignore
//! use nebula_form::prelude::*;
//!
//! let registry = Arc::new(ValidatorRegistry::new());
//! registry.register::<Person, PersonValidator>();
//!
//! let form = FormState::new(person);
//! let binding = FormValidation::new(registry).bind(&form);
//!
//! form.request_validation().await?;
//! let messages = binding.store().all_messages();
//! ```

#![allow(clippy::type_complexity)]

pub mod config;
pub mod discovery;
pub mod error;
pub mod field;
pub mod form;
pub mod model;
pub mod orchestrator;
pub mod prelude;
pub mod registry;
pub mod resolver;
mod sequencer;
pub mod store;
pub mod validator;

pub use config::{FormValidationConfig, PassPolicy};
pub use discovery::{StaticDiscovery, TypeDiscovery};
pub use error::{BoxError, Error, Result};
pub use field::FieldIdentifier;
pub use form::{Dispatch, FormState, PassFuture, ValidationStateChanged, pass};
pub use model::ModelRef;
pub use orchestrator::{Binding, FormValidation, bind};
pub use registry::{ServiceContainer, ServiceProvider, ValidatorDescriptor, ValidatorRegistry};
pub use resolver::{ResolutionSource, ValidatorResolver};
pub use store::{StoreBatch, ValidationMessageStore};
pub use validator::{
    Finding, ModelTypeMismatch, ModelValidator, SharedValidator, TypedValidator, ValidationRequest,
    ValidationScope, Validator, typed,
};

#[cfg(feature = "inventory")]
pub use discovery::{InventoryDiscovery, ValidatorRegistration};

#[cfg(feature = "inventory")]
#[doc(hidden)]
pub mod __private {
    pub use inventory;
}
