//! Form state: the model being edited plus its notification channels.
//!
//! The form owns two inbound channels ("validation requested" and "field
//! changed") and one outbound signal ("validation state changed"). Inbound
//! handlers return futures instead of running detached work; the form
//! spawns them and hands back a [`Dispatch`] the caller may await for
//! completion or drop to let the passes finish in the background.

use std::fmt;
use std::future::{Future, IntoFuture};
use std::sync::Arc;

use futures::future::{BoxFuture, join_all};
use parking_lot::RwLock;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::error::{Error, Result};
use crate::field::FieldIdentifier;
use crate::model::ModelRef;
use crate::store::ValidationMessageStore;

/// Future returned by a form event handler: one validation pass.
pub type PassFuture = BoxFuture<'static, Result<()>>;

type ValidationRequestedHandler = Arc<dyn Fn(&FormState) -> PassFuture + Send + Sync>;
type FieldChangedHandler = Arc<dyn Fn(&FormState, &FieldIdentifier) -> PassFuture + Send + Sync>;

/// Outbound signal: a pass committed and the UI should re-read messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationStateChanged;

const SIGNAL_BUFFER: usize = 64;

/// Handle to a form's state. Clones share the same form.
#[derive(Clone)]
pub struct FormState {
    inner: Arc<FormInner>,
}

struct FormInner {
    model: ModelRef,
    on_validation_requested: RwLock<Vec<ValidationRequestedHandler>>,
    on_field_changed: RwLock<Vec<FieldChangedHandler>>,
    stores: RwLock<Vec<ValidationMessageStore>>,
    state_changed: broadcast::Sender<ValidationStateChanged>,
}

impl FormState {
    /// Creates a form editing `model`.
    pub fn new<M: Send + Sync + 'static>(model: M) -> Self {
        Self::from_model(ModelRef::new(model))
    }

    /// Creates a form editing an already shared model.
    pub fn from_model(model: ModelRef) -> Self {
        let (state_changed, _) = broadcast::channel(SIGNAL_BUFFER);
        Self {
            inner: Arc::new(FormInner {
                model,
                on_validation_requested: RwLock::new(Vec::new()),
                on_field_changed: RwLock::new(Vec::new()),
                stores: RwLock::new(Vec::new()),
                state_changed,
            }),
        }
    }

    /// The root model.
    pub fn model(&self) -> &ModelRef {
        &self.inner.model
    }

    /// Identifier for a field on the root model.
    pub fn field(&self, field_name: &str) -> Result<FieldIdentifier> {
        FieldIdentifier::new(self.inner.model.clone(), field_name)
    }

    // ---------------------------------------------------------------------
    // Inbound channels
    // ---------------------------------------------------------------------

    /// Subscribes to "validation requested". Handlers stay subscribed for
    /// the life of the form.
    pub fn on_validation_requested<F>(&self, handler: F)
    where
        F: Fn(&FormState) -> PassFuture + Send + Sync + 'static,
    {
        self.inner.on_validation_requested.write().push(Arc::new(handler));
    }

    /// Subscribes to "field changed". Handlers stay subscribed for the life
    /// of the form.
    pub fn on_field_changed<F>(&self, handler: F)
    where
        F: Fn(&FormState, &FieldIdentifier) -> PassFuture + Send + Sync + 'static,
    {
        self.inner.on_field_changed.write().push(Arc::new(handler));
    }

    /// Announces that `field` changed, starting every field-changed handler.
    pub fn notify_field_changed(&self, field: FieldIdentifier) -> Dispatch {
        let handlers = self.inner.on_field_changed.read().clone();
        Dispatch::spawn(handlers.iter().map(|handler| handler(self, &field)))
    }

    /// Requests whole-model validation, starting every validation-requested
    /// handler.
    pub fn request_validation(&self) -> Dispatch {
        let handlers = self.inner.on_validation_requested.read().clone();
        Dispatch::spawn(handlers.iter().map(|handler| handler(self)))
    }

    /// Requests validation, waits for every pass, and reports whether the
    /// form is free of messages.
    pub async fn validate(&self) -> Result<bool> {
        self.request_validation().await?;
        Ok(self.is_valid())
    }

    // ---------------------------------------------------------------------
    // Outbound signal
    // ---------------------------------------------------------------------

    /// Emits "validation state changed" to every subscriber.
    pub fn notify_validation_state_changed(&self) {
        // No receivers is fine: nobody is rendering this form right now.
        let _ = self.inner.state_changed.send(ValidationStateChanged);
    }

    /// Receives "validation state changed" signals emitted after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<ValidationStateChanged> {
        self.inner.state_changed.subscribe()
    }

    // ---------------------------------------------------------------------
    // Message queries
    // ---------------------------------------------------------------------

    pub(crate) fn attach_store(&self, store: ValidationMessageStore) {
        self.inner.stores.write().push(store);
    }

    /// Every message across all attached stores.
    pub fn validation_messages(&self) -> Vec<String> {
        self.inner
            .stores
            .read()
            .iter()
            .flat_map(ValidationMessageStore::all_messages)
            .collect()
    }

    /// Messages for `field` across all attached stores.
    pub fn messages_for(&self, field: &FieldIdentifier) -> Vec<String> {
        self.inner
            .stores
            .read()
            .iter()
            .flat_map(|store| store.messages(field))
            .collect()
    }

    /// Returns `true` if no attached store holds any message.
    pub fn is_valid(&self) -> bool {
        self.inner.stores.read().iter().all(ValidationMessageStore::is_empty)
    }

    /// Returns `true` if both handles refer to the same form.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for FormState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormState")
            .field("model", &self.inner.model)
            .field(
                "validation_requested_handlers",
                &self.inner.on_validation_requested.read().len(),
            )
            .field("field_changed_handlers", &self.inner.on_field_changed.read().len())
            .field("stores", &self.inner.stores.read().len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

enum Pass {
    Spawned(JoinHandle<Result<()>>),
    Deferred(PassFuture),
}

impl Pass {
    async fn finish(self) -> Result<()> {
        match self {
            Self::Spawned(handle) => handle.await.unwrap_or_else(|join| {
                Err(Error::PassAborted {
                    reason: join.to_string(),
                })
            }),
            Self::Deferred(future) => future.await,
        }
    }
}

/// Completion handle for the passes started by one notification.
///
/// Inside a Tokio runtime every pass is spawned immediately, so dropping
/// the handle leaves them running. Outside a runtime passes are deferred
/// and only run when the handle is awaited.
///
/// Awaiting yields the first error in subscription order, after every pass
/// has finished.
#[must_use = "passes outside a runtime only run when the dispatch is awaited"]
pub struct Dispatch {
    passes: Vec<Pass>,
}

impl Dispatch {
    fn spawn(futures: impl Iterator<Item = PassFuture>) -> Self {
        let runtime = tokio::runtime::Handle::try_current().ok();
        let passes = futures
            .map(|future| match &runtime {
                Some(runtime) => Pass::Spawned(runtime.spawn(future)),
                None => Pass::Deferred(future),
            })
            .collect();
        Self { passes }
    }

    /// Number of passes started.
    pub fn len(&self) -> usize {
        self.passes.len()
    }

    /// Returns `true` if no handler was subscribed.
    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }

    /// Lets spawned passes finish in the background.
    pub fn detach(self) {
        drop(self);
    }
}

impl IntoFuture for Dispatch {
    type Output = Result<()>;
    type IntoFuture = BoxFuture<'static, Result<()>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(async move {
            join_all(self.passes.into_iter().map(Pass::finish))
                .await
                .into_iter()
                .collect::<Result<Vec<()>>>()
                .map(|_| ())
        })
    }
}

impl fmt::Debug for Dispatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatch")
            .field("passes", &self.passes.len())
            .finish()
    }
}

/// Boxes a pass future; handy when writing handlers by hand.
pub fn pass<F>(future: F) -> PassFuture
where
    F: Future<Output = Result<()>> + Send + 'static,
{
    Box::pin(future)
}
