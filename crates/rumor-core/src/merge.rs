//! Last-writer-wins merge engine
//!
//! All three gossip merge flavours run the same reconciliation pass and only
//! differ in what they report back:
//!
//! | mode       | gossip path        | report                                     |
//! |------------|--------------------|--------------------------------------------|
//! | `Complete` | direct unicast     | nothing                                    |
//! | `New`      | pull anti-entropy  | what the sender is missing or has stale    |
//! | `Delta`    | push broadcast     | the incoming entries that were absorbed    |
//!
//! For every incoming `(k, v)`: absorb `v` iff `k` is absent or the resident
//! entry's `expires_at` is strictly less than `v.expires_at`. Ties keep the
//! resident entry, which makes redelivery a no-op. Tombstones follow the same
//! rule and are never filtered, so deletions keep propagating.

use crate::entry::{Entry, PeerId};
use crate::message::Message;
use std::collections::{BTreeMap, HashMap};

/// Anything that holds replicated entries and can absorb merged ones
pub trait ReplicaState {
    /// Entry currently held for `key`
    fn resident(&self, key: &str) -> Option<&Entry>;

    /// Install an entry that won reconciliation
    fn absorb(&mut self, key: String, entry: Entry);

    /// Visit every held entry
    fn for_each_resident(&self, visit: &mut dyn FnMut(&str, &Entry));
}

impl ReplicaState for HashMap<String, Entry> {
    fn resident(&self, key: &str) -> Option<&Entry> {
        self.get(key)
    }

    fn absorb(&mut self, key: String, entry: Entry) {
        self.insert(key, entry);
    }

    fn for_each_resident(&self, visit: &mut dyn FnMut(&str, &Entry)) {
        for (key, entry) in self {
            visit(key, entry);
        }
    }
}

impl ReplicaState for BTreeMap<String, Entry> {
    fn resident(&self, key: &str) -> Option<&Entry> {
        self.get(key)
    }

    fn absorb(&mut self, key: String, entry: Entry) {
        self.insert(key, entry);
    }

    fn for_each_resident(&self, visit: &mut dyn FnMut(&str, &Entry)) {
        for (key, entry) in self {
            visit(key, entry);
        }
    }
}

/// Which subset of a merge's effects to report back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeMode {
    /// Apply only
    Complete,
    /// Report what the sender does not yet know
    New,
    /// Report what this merge absorbed
    Delta,
}

/// Tagged outcome of a merge
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeDelta {
    /// Nothing to report
    Nothing,
    /// Entries to return to the peer that initiated a pull
    ToSender(Message),
    /// Entries newly absorbed, to be relayed further
    Incorporated(Message),
}

impl MergeDelta {
    /// Reported message, if any
    pub fn into_message(self) -> Option<Message> {
        match self {
            Self::Nothing => None,
            Self::ToSender(msg) | Self::Incorporated(msg) => Some(msg),
        }
    }

    /// Whether there is nothing to report
    pub fn is_nothing(&self) -> bool {
        matches!(self, Self::Nothing)
    }
}

/// Reconcile `incoming` into `state` and report according to `mode`
///
/// Reported messages are tagged with `local`, the recipient's identity.
pub fn reconcile<S>(
    state: &mut S,
    local: PeerId,
    incoming: &BTreeMap<String, Entry>,
    mode: MergeMode,
) -> MergeDelta
where
    S: ReplicaState + ?Sized,
{
    let mut absorbed: BTreeMap<String, Entry> = BTreeMap::new();

    for (key, entry) in incoming {
        let wins = match state.resident(key) {
            None => true,
            Some(resident) => entry.supersedes(resident),
        };
        if wins {
            state.absorb(key.clone(), entry.clone());
            if mode == MergeMode::Delta {
                absorbed.insert(key.clone(), entry.clone());
            }
        }
    }

    match mode {
        MergeMode::Complete => MergeDelta::Nothing,
        MergeMode::Delta if absorbed.is_empty() => MergeDelta::Nothing,
        MergeMode::Delta => MergeDelta::Incorporated(Message::from_entries(local, &absorbed)),
        MergeMode::New => {
            let mut newer: BTreeMap<String, Entry> = BTreeMap::new();
            state.for_each_resident(&mut |key, resident| {
                let sender_stale = match incoming.get(key) {
                    None => true,
                    Some(theirs) => resident.supersedes(theirs),
                };
                if sender_stale {
                    newer.insert(key.to_string(), resident.clone());
                }
            });
            if newer.is_empty() {
                MergeDelta::Nothing
            } else {
                MergeDelta::ToSender(Message::from_entries(local, &newer))
            }
        }
    }
}
