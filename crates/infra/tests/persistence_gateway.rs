//! Entity lifecycle through the in-memory persistence gateway.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Result;
use uuid::Uuid;

use sharplite_core::{
    DomainSignature, Entity, Identity, SignatureProperty, SignatureValue, entity_id,
    impl_entity_equality,
};
use sharplite_infra::{
    InMemoryRepository, Repository, UniqueSignatureValidator, UuidV7Ids, ValidationError,
};

entity_id! {
    /// Identifier of a customer.
    pub struct CustomerId(i64);
}

entity_id! {
    /// Identifier of an order.
    pub struct OrderId(Uuid);
}

#[derive(Debug, Clone)]
struct Customer {
    identity: Identity<CustomerId>,
    email: String,
    display_name: String,
}

impl Customer {
    fn new(email: &str, display_name: &str) -> Self {
        Self {
            identity: Identity::transient(),
            email: email.to_string(),
            display_name: display_name.to_string(),
        }
    }
}

impl DomainSignature for Customer {
    fn declare_signature() -> Vec<SignatureProperty<Self>> {
        vec![SignatureProperty::new("email", |c: &Customer| c.email.clone())]
    }
}

impl Entity for Customer {
    type Id = CustomerId;

    fn identity(&self) -> &Identity<CustomerId> {
        &self.identity
    }

    fn identity_mut(&mut self) -> &mut Identity<CustomerId> {
        &mut self.identity
    }
}

#[derive(Debug, Clone)]
struct Order {
    identity: Identity<OrderId>,
    customer: CustomerId,
    reference: String,
}

impl DomainSignature for Order {
    fn declare_signature() -> Vec<SignatureProperty<Self>> {
        vec![
            SignatureProperty::new("customer", |o: &Order| {
                SignatureValue::reference(o.customer.clone())
            }),
            SignatureProperty::new("reference", |o: &Order| o.reference.clone()),
        ]
    }
}

impl Entity for Order {
    type Id = OrderId;

    fn identity(&self) -> &Identity<OrderId> {
        &self.identity
    }

    fn identity_mut(&mut self) -> &mut Identity<OrderId> {
        &mut self.identity
    }
}

impl_entity_equality!(Customer, Order);

#[test]
fn customers_keep_their_identity_across_saves() -> Result<()> {
    sharplite_observability::init();
    let repo = InMemoryRepository::<Customer>::new();

    let draft = Customer::new("a@x.com", "Ada");
    assert!(draft.is_transient());

    let saved = repo.save_or_update(draft.clone())?;
    assert!(!saved.is_transient());
    assert_eq!(saved.id(), &CustomerId::new(1));

    // Persisted and transient copies of "the same" customer are different objects.
    assert_ne!(saved, draft);

    let mut edited = saved.clone();
    edited.email = "ada@x.com".to_string();
    edited.display_name = "Ada L.".to_string();
    let updated = repo.save_or_update(edited)?;
    assert_eq!(updated, saved);

    let loaded = repo.get(saved.id())?.expect("customer stored");
    assert_eq!(loaded.email, "ada@x.com");
    assert_eq!(repo.get_all()?.len(), 1);
    Ok(())
}

#[test]
fn saving_a_set_member_detaches_it_from_its_transient_copy() -> Result<()> {
    let repo = InMemoryRepository::<Customer>::new();
    let mut pending = Customer::new("b@x.com", "Bo");

    let mut set = HashSet::new();
    set.insert(pending.clone());
    assert!(set.contains(&Customer::new("b@x.com", "someone else")));

    // The hash stays frozen once the id arrives, but the copy in the set is still
    // transient and a persisted entity never equals a transient one.
    let hash_before = pending.entity_hash();
    let saved = repo.save_or_update(pending.clone())?;
    pending.assign_id(saved.id().clone())?;
    assert_eq!(pending.entity_hash(), hash_before);
    assert_eq!(pending, saved);
    assert!(!set.contains(&pending));
    assert!(set.contains(&Customer::new("b@x.com", "Bo")));
    Ok(())
}

#[test]
fn uuid_backed_orders_reference_their_customer() -> Result<()> {
    let customers = InMemoryRepository::<Customer>::new();
    let orders = InMemoryRepository::<Order, _>::with_allocator(UuidV7Ids);

    let customer = customers.save_or_update(Customer::new("c@x.com", "Cy"))?;
    let order = orders.save_or_update(Order {
        identity: Identity::transient(),
        customer: customer.id().clone(),
        reference: "PO-1".to_string(),
    })?;

    assert!(!order.id().as_inner().is_nil());
    let parsed: OrderId = order.id().to_string().parse()?;
    assert_eq!(&parsed, order.id());
    Ok(())
}

#[test]
fn validator_blocks_duplicate_signatures() -> Result<()> {
    let repo = Arc::new(InMemoryRepository::<Customer>::new());
    let validator = UniqueSignatureValidator::new(Arc::clone(&repo));

    let first = Customer::new("dup@x.com", "First");
    validator.validate(&first)?;
    let first = repo.save_or_update(first)?;

    // Re-validating the stored row does not flag itself.
    validator.validate(&first)?;

    let second = Customer::new("DUP@x.com", "Second");
    let err = validator.validate(&second).unwrap_err();
    assert!(matches!(err, ValidationError::DuplicateSignature { .. }));
    Ok(())
}

#[test]
fn malformed_identifiers_are_rejected_at_the_boundary() {
    let err = "abc".parse::<CustomerId>().unwrap_err();
    assert!(err.to_string().contains("CustomerId"));
}
