//! Per-namespace output policy for producer subsystems.
//!
//! Rules are a finite, explicit table applied once at initialization; they
//! are not re-evaluated per event beyond a prefix lookup. Two combinations
//! matter in practice: detach a subsystem's own channel and let its records
//! flow once through the shared pipeline, or detach it and silence the
//! subtree entirely because the application re-derives a richer record
//! itself.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use tokio::sync::broadcast;

/// Default capacity for direct subsystem channels.
const DEFAULT_CHANNEL_CAPACITY: usize = 1000;

/// One static rule bound to a logger-name prefix (exact subtree match).
#[derive(Debug, Clone)]
pub struct NamespaceRule {
    pub name_prefix: &'static str,
    /// Remove any direct channel the subsystem attached for its own output.
    pub detach_existing_sinks: bool,
    /// Whether the subtree's records reach the shared root sink at all.
    pub propagate_to_root: bool,
}

/// The rule table applied to the dispatch collaborator's logger subtrees:
/// its worker, broker and scheduler records flow through the shared
/// pipeline, while its raw duplicate subtree is silenced because the worker
/// emits an equivalent, richer record itself.
pub fn default_rules() -> Vec<NamespaceRule> {
    vec![
        NamespaceRule {
            name_prefix: "dispatch",
            detach_existing_sinks: true,
            propagate_to_root: true,
        },
        NamespaceRule {
            name_prefix: "dispatch::worker",
            detach_existing_sinks: true,
            propagate_to_root: true,
        },
        NamespaceRule {
            name_prefix: "dispatch::broker",
            detach_existing_sinks: true,
            propagate_to_root: true,
        },
        NamespaceRule {
            name_prefix: "dispatch::scheduler",
            detach_existing_sinks: true,
            propagate_to_root: true,
        },
        NamespaceRule {
            name_prefix: "dispatch::raw",
            detach_existing_sinks: true,
            propagate_to_root: false,
        },
    ]
}

/// `name` is `prefix` itself or a descendant in the `::` hierarchy.
fn subtree_match(prefix: &str, name: &str) -> bool {
    match name.strip_prefix(prefix) {
        Some("") => true,
        Some(rest) => rest.starts_with("::"),
        None => false,
    }
}

/// Static policy table. The most specific (longest) matching prefix wins,
/// so a silenced child subtree can live under a redirected parent.
pub struct NamespacePolicy {
    rules: Vec<NamespaceRule>,
}

impl NamespacePolicy {
    pub fn new(rules: Vec<NamespaceRule>) -> Self {
        NamespacePolicy { rules }
    }

    /// Detach direct subsystem channels for every rule that asks for it.
    /// Called once during logging setup.
    pub fn apply(&self, sinks: &SubsystemSinks) {
        for rule in self.rules.iter().filter(|r| r.detach_existing_sinks) {
            sinks.detach(rule.name_prefix);
        }
    }

    /// Whether records from `logger` may reach the shared sink.
    pub fn allows(&self, logger: &str) -> bool {
        self.matching(logger)
            .map(|rule| rule.propagate_to_root)
            .unwrap_or(true)
    }

    fn matching(&self, logger: &str) -> Option<&NamespaceRule> {
        self.rules
            .iter()
            .filter(|rule| subtree_match(rule.name_prefix, logger))
            .max_by_key(|rule| rule.name_prefix.len())
    }
}

/// Registry of direct per-subsystem channels, keyed by logger-name prefix.
///
/// A subsystem may register its own channel to receive its subtree's
/// rendered lines directly, the way a third-party library attaches its own
/// handler. Detached prefixes stay detached: late registration against a
/// detached prefix yields a channel that is never published to.
pub struct SubsystemSinks {
    channels: RwLock<HashMap<String, broadcast::Sender<String>>>,
    detached: RwLock<HashSet<String>>,
    channel_capacity: usize,
}

impl SubsystemSinks {
    pub fn new() -> Self {
        SubsystemSinks {
            channels: RwLock::new(HashMap::new()),
            detached: RwLock::new(HashSet::new()),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }

    /// Register a direct channel for a subsystem prefix. Returns the sender
    /// for the channel; an existing registration is reused.
    pub fn register(&self, prefix: &str) -> broadcast::Sender<String> {
        if self.detached.read().unwrap().contains(prefix) {
            // Dormant channel: created but never stored, so it receives
            // nothing.
            let (tx, _rx) = broadcast::channel(self.channel_capacity);
            return tx;
        }
        let mut channels = self.channels.write().unwrap();
        if let Some(sender) = channels.get(prefix) {
            return sender.clone();
        }
        let (tx, _rx) = broadcast::channel(self.channel_capacity);
        channels.insert(prefix.to_string(), tx.clone());
        tx
    }

    /// Remove a prefix's direct channel and refuse future registrations.
    pub fn detach(&self, prefix: &str) {
        self.channels.write().unwrap().remove(prefix);
        self.detached.write().unwrap().insert(prefix.to_string());
    }

    /// Subscribe to a prefix's direct channel, if one is registered.
    pub fn subscribe(&self, prefix: &str) -> Option<broadcast::Receiver<String>> {
        let channels = self.channels.read().unwrap();
        channels.get(prefix).map(|tx| tx.subscribe())
    }

    /// Publish a rendered line to every channel whose prefix covers
    /// `logger`. Returns the number of channels that received it.
    pub fn publish(&self, logger: &str, line: &str) -> usize {
        let channels = self.channels.read().unwrap();
        let mut delivered = 0;
        for (prefix, tx) in channels.iter() {
            if subtree_match(prefix, logger) {
                delivered += tx.send(line.to_string()).map(|_| 1).unwrap_or(0);
            }
        }
        delivered
    }

    pub fn registered(&self) -> Vec<String> {
        self.channels.read().unwrap().keys().cloned().collect()
    }
}

impl Default for SubsystemSinks {
    fn default() -> Self {
        Self::new()
    }
}
