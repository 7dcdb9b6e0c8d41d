//! Prelude module for convenient imports.
//!
//! `use nebula_form::prelude::*;` brings in what a host needs to bind a
//! form and what a rule author needs to write a validator.

pub use std::sync::Arc;

pub use async_trait::async_trait;

// ============================================================================
// HOST: forms, bindings, stores
// ============================================================================

pub use crate::config::{FormValidationConfig, PassPolicy};
pub use crate::error::{BoxError, Error};
pub use crate::field::FieldIdentifier;
pub use crate::form::{Dispatch, FormState, ValidationStateChanged};
pub use crate::model::ModelRef;
pub use crate::orchestrator::{Binding, FormValidation, bind};
pub use crate::registry::{ServiceContainer, ServiceProvider, ValidatorRegistry};
pub use crate::store::ValidationMessageStore;

// ============================================================================
// RULE AUTHORS: validator traits and helpers
// ============================================================================

pub use crate::validator::{
    Finding, ModelValidator, SharedValidator, TypedValidator, ValidationRequest, ValidationScope,
    Validator, typed,
};

#[cfg(feature = "inventory")]
pub use crate::submit_validator;
