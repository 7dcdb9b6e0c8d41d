//! Shared, identity-compared model handles.
//!
//! A model is whatever object the form edits. The crate never looks inside
//! it; validators downcast it back to their concrete type. Two handles are
//! equal only when they point at the same allocation, so two structurally
//! identical models remain distinct field owners.

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Type-erased, reference-counted handle to a model instance.
///
/// Mutation goes through the model type's own interior mutability
/// (typically a `parking_lot::RwLock` around its fields), because the same
/// instance is shared between the form, in-flight passes and nested field
/// identifiers.
#[derive(Clone)]
pub struct ModelRef {
    inner: Arc<dyn Any + Send + Sync>,
    type_id: TypeId,
    type_name: &'static str,
}

impl ModelRef {
    /// Wraps a freshly constructed model.
    pub fn new<M: Send + Sync + 'static>(model: M) -> Self {
        Self::from_arc(Arc::new(model))
    }

    /// Wraps a model that is already shared.
    ///
    /// Handles created from clones of the same `Arc` compare equal.
    pub fn from_arc<M: Send + Sync + 'static>(model: Arc<M>) -> Self {
        Self {
            inner: model,
            type_id: TypeId::of::<M>(),
            type_name: std::any::type_name::<M>(),
        }
    }

    /// Runtime type of the model.
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Runtime type name of the model, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Returns `true` if the model is an `M`.
    pub fn is<M: 'static>(&self) -> bool {
        self.type_id == TypeId::of::<M>()
    }

    /// Borrows the model as `M`.
    pub fn downcast_ref<M: 'static>(&self) -> Option<&M> {
        self.inner.downcast_ref::<M>()
    }

    /// Recovers the typed `Arc`, sharing ownership with this handle.
    pub fn downcast<M: Send + Sync + 'static>(&self) -> Option<Arc<M>> {
        Arc::clone(&self.inner).downcast::<M>().ok()
    }

    /// Reference identity comparison.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.addr() == other.addr()
    }

    fn addr(&self) -> usize {
        Arc::as_ptr(&self.inner).cast::<()>() as usize
    }
}

impl PartialEq for ModelRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for ModelRef {}

impl Hash for ModelRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.addr().hash(state);
    }
}

impl fmt::Debug for ModelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelRef")
            .field("type", &self.type_name)
            .field("addr", &format_args!("{:#x}", self.addr()))
            .finish()
    }
}

impl<M: Send + Sync + 'static> From<Arc<M>> for ModelRef {
    fn from(model: Arc<M>) -> Self {
        Self::from_arc(model)
    }
}
