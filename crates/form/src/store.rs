//! Field-indexed validation message store.
//!
//! The store is a buffer: passes write into it, and the orchestrator's
//! "validation state changed" signal tells the UI to re-read it. Each pass
//! writes through a single [`batch`](ValidationMessageStore::batch) so a
//! reader never observes a cleared-but-not-yet-refilled scope.
//!
//! An empty message list is never stored; a field without messages is
//! simply absent.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;

use crate::field::FieldIdentifier;
use crate::form::FormState;

type MessageMap = IndexMap<FieldIdentifier, Vec<String>>;

/// Shared handle to a form's validation messages.
///
/// Clones refer to the same store.
#[derive(Clone, Default)]
pub struct ValidationMessageStore {
    messages: Arc<RwLock<MessageMap>>,
}

impl ValidationMessageStore {
    /// Creates a store and attaches it to `form`, so the form's message
    /// queries include its contents.
    pub fn new(form: &FormState) -> Self {
        let store = Self::default();
        form.attach_store(store.clone());
        store
    }

    /// Removes every entry.
    pub fn clear_all(&self) {
        self.batch(|batch| batch.clear_all());
    }

    /// Removes the entries for `field`.
    pub fn clear(&self, field: &FieldIdentifier) {
        self.batch(|batch| batch.clear(field));
    }

    /// Appends one message for `field`.
    pub fn add(&self, field: FieldIdentifier, message: impl Into<String>) {
        self.batch(|batch| batch.add(field, message));
    }

    /// Appends `messages` for `field`, creating the entry only if there is
    /// at least one message.
    pub fn add_range<I, S>(&self, field: FieldIdentifier, messages: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.batch(|batch| batch.add_range(field, messages));
    }

    /// Applies several mutations under one write lock.
    pub fn batch<R>(&self, apply: impl FnOnce(&mut StoreBatch<'_>) -> R) -> R {
        let mut messages = self.messages.write();
        apply(&mut StoreBatch {
            messages: &mut messages,
        })
    }

    /// Messages for `field`, in the order the validator produced them.
    pub fn messages(&self, field: &FieldIdentifier) -> Vec<String> {
        self.messages.read().get(field).cloned().unwrap_or_default()
    }

    /// Every message in the store.
    pub fn all_messages(&self) -> Vec<String> {
        self.messages.read().values().flatten().cloned().collect()
    }

    /// Fields that currently have messages.
    pub fn fields(&self) -> Vec<FieldIdentifier> {
        self.messages.read().keys().cloned().collect()
    }

    /// Returns `true` if `field` has at least one message.
    pub fn contains(&self, field: &FieldIdentifier) -> bool {
        self.messages.read().contains_key(field)
    }

    /// Copy of the whole store.
    pub fn snapshot(&self) -> Vec<(FieldIdentifier, Vec<String>)> {
        self.messages
            .read()
            .iter()
            .map(|(field, messages)| (field.clone(), messages.clone()))
            .collect()
    }

    /// Number of fields with messages.
    pub fn len(&self) -> usize {
        self.messages.read().len()
    }

    /// Returns `true` if no field has messages.
    pub fn is_empty(&self) -> bool {
        self.messages.read().is_empty()
    }

    /// Returns `true` if both handles refer to the same store.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.messages, &other.messages)
    }
}

impl fmt::Debug for ValidationMessageStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(
                self.messages
                    .read()
                    .iter()
                    .map(|(field, messages)| (field.to_string(), messages.clone())),
            )
            .finish()
    }
}

/// Write access to a store for the duration of one
/// [`batch`](ValidationMessageStore::batch).
pub struct StoreBatch<'a> {
    messages: &'a mut MessageMap,
}

impl StoreBatch<'_> {
    /// Removes every entry.
    pub fn clear_all(&mut self) {
        self.messages.clear();
    }

    /// Removes the entries for `field`.
    pub fn clear(&mut self, field: &FieldIdentifier) {
        self.messages.shift_remove(field);
    }

    /// Keeps only the fields for which `keep` returns `true`.
    pub fn retain(&mut self, mut keep: impl FnMut(&FieldIdentifier) -> bool) {
        self.messages.retain(|field, _| keep(field));
    }

    /// Appends one message for `field`.
    pub fn add(&mut self, field: FieldIdentifier, message: impl Into<String>) {
        self.messages.entry(field).or_default().push(message.into());
    }

    /// Appends `messages` for `field`; an empty iterator leaves the store
    /// unchanged.
    pub fn add_range<I, S>(&mut self, field: FieldIdentifier, messages: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut messages = messages.into_iter().map(Into::into).peekable();
        if messages.peek().is_some() {
            self.messages.entry(field).or_default().extend(messages);
        }
    }
}
