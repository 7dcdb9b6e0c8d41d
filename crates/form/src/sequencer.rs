//! Overlap control between passes of one binding.
//!
//! Every pass enters the gate before resolving its validator and commits
//! through it. What the gate enforces depends on [`PassPolicy`]:
//!
//! - `Concurrent`: nothing; commits are plain store batches.
//! - `Serialized`: a FIFO async mutex is held from entry until the ticket
//!   is dropped after commit.
//! - `LatestWins`: entries are numbered, and only passes that committed
//!   count as newer. A model pass is stale once a newer model pass has
//!   committed; a field pass is stale once a newer model pass or a newer
//!   pass on the same field has committed. A model pass leaves alone the
//!   fields a newer field pass has committed. A pass that fails or is
//!   dropped supersedes nothing.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::OwnedMutexGuard;

use crate::config::PassPolicy;
use crate::field::FieldIdentifier;
use crate::store::ValidationMessageStore;

#[derive(Default)]
struct Sequence {
    next: u64,
    /// Latest committed model pass.
    model: u64,
    /// Latest committed field pass per field. An entry only matters to
    /// older passes, so it is dropped once none of them is in flight.
    fields: HashMap<FieldIdentifier, u64>,
    in_flight: BTreeSet<u64>,
}

impl Sequence {
    fn claimed_after(&self, field: &FieldIdentifier, seq: u64) -> bool {
        self.fields.get(field).is_some_and(|&claimed| claimed > seq)
    }

    fn prune(&mut self) {
        match self.in_flight.first().copied() {
            Some(oldest) => self.fields.retain(|_, claimed| *claimed > oldest),
            None => self.fields.clear(),
        }
    }
}

/// Proof of entry. Dropping it, whether the pass committed, failed or was
/// cancelled, takes the pass out of flight and releases the serial lock.
pub(crate) struct PassTicket {
    seq: u64,
    sequence: Option<Arc<Mutex<Sequence>>>,
    _serial: Option<OwnedMutexGuard<()>>,
}

impl Drop for PassTicket {
    fn drop(&mut self) {
        if let Some(sequence) = &self.sequence {
            let mut sequence = sequence.lock();
            sequence.in_flight.remove(&self.seq);
            sequence.prune();
        }
    }
}

pub(crate) struct PassGate {
    policy: PassPolicy,
    serial: Arc<tokio::sync::Mutex<()>>,
    sequence: Arc<Mutex<Sequence>>,
}

impl PassGate {
    pub(crate) fn new(policy: PassPolicy) -> Self {
        Self {
            policy,
            serial: Arc::new(tokio::sync::Mutex::new(())),
            sequence: Arc::new(Mutex::new(Sequence::default())),
        }
    }

    pub(crate) async fn enter(&self) -> PassTicket {
        let serial = match self.policy {
            PassPolicy::Serialized => Some(Arc::clone(&self.serial).lock_owned().await),
            PassPolicy::Concurrent | PassPolicy::LatestWins => None,
        };

        let mut sequence = self.sequence.lock();
        sequence.next += 1;
        let seq = sequence.next;
        let tracked = self.policy == PassPolicy::LatestWins;
        if tracked {
            sequence.in_flight.insert(seq);
        }
        PassTicket {
            seq,
            sequence: tracked.then(|| Arc::clone(&self.sequence)),
            _serial: serial,
        }
    }

    /// Replaces the whole store with `entries`. Returns `false` if the pass
    /// was superseded and nothing was written.
    pub(crate) fn commit_model(
        &self,
        ticket: &PassTicket,
        store: &ValidationMessageStore,
        entries: Vec<(FieldIdentifier, String)>,
    ) -> bool {
        if self.policy != PassPolicy::LatestWins {
            store.batch(|batch| {
                batch.clear_all();
                for (field, message) in entries {
                    batch.add(field, message);
                }
            });
            return true;
        }

        let mut sequence = self.sequence.lock();
        if sequence.model > ticket.seq {
            return false;
        }
        store.batch(|batch| {
            batch.retain(|field| sequence.claimed_after(field, ticket.seq));
            for (field, message) in entries {
                if !sequence.claimed_after(&field, ticket.seq) {
                    batch.add(field, message);
                }
            }
        });
        sequence.model = ticket.seq;
        // Field commits at or before this one can no longer win anything.
        sequence.fields.retain(|_, claimed| *claimed > ticket.seq);
        true
    }

    /// Replaces the entries of `field`. Returns `false` if the pass was
    /// superseded and nothing was written.
    pub(crate) fn commit_field(
        &self,
        ticket: &PassTicket,
        store: &ValidationMessageStore,
        field: &FieldIdentifier,
        messages: Vec<String>,
    ) -> bool {
        let write = |messages: Vec<String>| {
            store.batch(|batch| {
                batch.clear(field);
                batch.add_range(field.clone(), messages);
            });
        };

        if self.policy != PassPolicy::LatestWins {
            write(messages);
            return true;
        }

        let mut sequence = self.sequence.lock();
        if sequence.model > ticket.seq || sequence.claimed_after(field, ticket.seq) {
            return false;
        }
        write(messages);
        sequence.fields.insert(field.clone(), ticket.seq);
        true
    }
}
