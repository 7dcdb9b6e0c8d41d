//! Failed passes propagate their error and leave the store untouched.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use pretty_assertions::assert_eq;

use nebula_form::{
    BoxError, Error, Finding, FormState, FormValidation, FormValidationConfig, ValidationScope,
    Validator, ValidatorRegistry, typed,
};

struct Invoice;

struct Unregistered;

/// Fails once `broken` is set.
struct FlakyValidator {
    broken: Arc<AtomicBool>,
}

#[async_trait]
impl Validator<Invoice> for FlakyValidator {
    async fn validate(&self, _: &Invoice, _: &ValidationScope) -> Result<Vec<Finding>, BoxError> {
        if self.broken.load(Ordering::SeqCst) {
            return Err("rule engine unavailable".into());
        }
        Ok(vec![Finding::new("Total", "Total must be positive")])
    }
}

fn flaky_binding() -> (FormState, nebula_form::Binding, Arc<AtomicBool>) {
    let broken = Arc::new(AtomicBool::new(false));
    let form = FormState::new(Invoice);
    let binding = FormValidation::new(Arc::new(ValidatorRegistry::new())).bind_with(
        &form,
        typed::<Invoice, _>(FlakyValidator {
            broken: Arc::clone(&broken),
        }),
    );
    (form, binding, broken)
}

#[tokio::test]
async fn missing_validator_is_reported_and_nothing_is_written() {
    let form = FormState::new(Unregistered);
    let binding = FormValidation::new(Arc::new(ValidatorRegistry::new())).bind(&form);
    let seeded = form.field("Code").unwrap();
    binding.store().add(seeded.clone(), "seeded");
    let mut signals = form.subscribe();

    let err = form.request_validation().await.unwrap_err();

    match err {
        Error::ValidatorNotFound { model_type } => assert!(model_type.ends_with("Unregistered")),
        other => panic!("expected ValidatorNotFound, got {other:?}"),
    }
    assert_eq!(binding.store().messages(&seeded), vec!["seeded"]);
    assert!(signals.try_recv().is_err());
}

#[tokio::test]
async fn engine_failure_keeps_previous_messages() {
    let (form, binding, broken) = flaky_binding();
    let total = form.field("Total").unwrap();

    form.request_validation().await.unwrap();
    let before = binding.store().snapshot();
    broken.store(true, Ordering::SeqCst);

    let err = form.request_validation().await.unwrap_err();
    assert!(matches!(err, Error::ValidationEngineFailure { .. }));
    assert!(!err.is_resolution_error());
    assert_eq!(binding.store().snapshot(), before);

    let err = form.notify_field_changed(total.clone()).await.unwrap_err();
    assert!(matches!(err, Error::ValidationEngineFailure { .. }));
    assert_eq!(binding.store().messages(&total), vec!["Total must be positive"]);
}

#[tokio::test]
async fn engine_failure_keeps_the_source_error() {
    let (form, _binding, broken) = flaky_binding();
    broken.store(true, Ordering::SeqCst);

    let err = form.request_validation().await.unwrap_err();
    let source = std::error::Error::source(&err).map(ToString::to_string);
    assert_eq!(source.as_deref(), Some("rule engine unavailable"));
}

struct Clock;

struct ClockedValidator {
    _clock: Arc<Clock>,
}

#[async_trait]
impl Validator<Invoice> for ClockedValidator {
    async fn validate(&self, _: &Invoice, _: &ValidationScope) -> Result<Vec<Finding>, BoxError> {
        Ok(Vec::new())
    }
}

#[tokio::test]
async fn factory_without_container_fails_construction() {
    let registry = ValidatorRegistry::new();
    registry.register_factory::<Invoice, _, _>(|services| {
        Ok(ClockedValidator {
            _clock: services.require::<Clock>()?,
        })
    });
    let form = FormState::new(Invoice);
    let binding = FormValidation::new(Arc::new(registry)).bind(&form);

    let err = binding.validate_model().await.unwrap_err();
    assert!(matches!(err, Error::ValidatorConstructionFailed { .. }));
    assert!(err.is_resolution_error());
    assert!(binding.store().is_empty());
}

#[tokio::test]
async fn failure_signal_is_opt_in() {
    let form = FormState::new(Unregistered);
    let _binding = FormValidation::new(Arc::new(ValidatorRegistry::new()))
        .with_config(FormValidationConfig::new().with_notify_on_failure(true))
        .bind(&form);
    let mut signals = form.subscribe();

    assert!(form.request_validation().await.is_err());
    assert!(signals.try_recv().is_ok());
}

#[tokio::test]
async fn missing_validator_fails_field_pass_without_writing() {
    let form = FormState::new(Unregistered);
    let binding = FormValidation::new(Arc::new(ValidatorRegistry::new())).bind(&form);
    let code = form.field("Code").unwrap();
    let label = form.field("Label").unwrap();
    binding.store().add(code.clone(), "seeded");
    binding.store().add(label.clone(), "untouched");
    let before = binding.store().snapshot();
    let mut signals = form.subscribe();

    let err = form.notify_field_changed(code.clone()).await.unwrap_err();

    assert!(matches!(err, Error::ValidatorNotFound { .. }));
    assert_eq!(binding.store().snapshot(), before);
    assert!(signals.try_recv().is_err());
}
