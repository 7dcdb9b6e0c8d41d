//! Link-time fallback discovery through `submit_validator!`.
#![cfg(feature = "inventory")]

use std::sync::Arc;

use async_trait::async_trait;
use pretty_assertions::assert_eq;

use nebula_form::{
    BoxError, Finding, FormState, InventoryDiscovery, ModelRef, ResolutionSource, TypeDiscovery,
    ValidationScope, Validator, ValidatorRegistry, ValidatorResolver, bind,
};

struct Ticket {
    seats: u32,
}

#[derive(Default)]
struct TicketValidator;

#[async_trait]
impl Validator<Ticket> for TicketValidator {
    async fn validate(
        &self,
        ticket: &Ticket,
        scope: &ValidationScope,
    ) -> Result<Vec<Finding>, BoxError> {
        let mut findings = Vec::new();
        if scope.includes("Seats") && ticket.seats == 0 {
            findings.push(Finding::new("Seats", "Book at least one seat"));
        }
        Ok(findings)
    }
}

nebula_form::submit_validator!(Ticket => TicketValidator);

#[test]
fn submitted_validator_is_known() {
    let known = InventoryDiscovery.all_known_types();
    assert!(
        known
            .iter()
            .any(|descriptor| descriptor.validator_type_name().ends_with("TicketValidator"))
    );
}

#[test]
fn resolver_falls_back_to_inventory() {
    let discovery: Arc<dyn TypeDiscovery> = Arc::new(InventoryDiscovery);
    let resolver =
        ValidatorResolver::new(Arc::new(ValidatorRegistry::new())).with_discovery(Some(discovery));

    let (_, source) = resolver
        .resolve_with_source(&ModelRef::new(Ticket { seats: 1 }))
        .unwrap();
    assert_eq!(source, ResolutionSource::Discovery);
}

#[tokio::test]
async fn default_binding_uses_discovered_validator() {
    let form = FormState::new(Ticket { seats: 0 });
    let binding = bind(&form, None);

    assert!(!form.validate().await.unwrap());
    assert_eq!(
        binding.store().messages(&form.field("Seats").unwrap()),
        vec!["Book at least one seat"]
    );
}
