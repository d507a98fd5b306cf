//! Agent registry: (business, branch, agent) -> live agent record.
//!
//! Buckets are kept per branch in insertion order so round-robin selection
//! sees a stable agent sequence across calls. Two secondary indexes are
//! maintained alongside the buckets:
//!
//! - connection id -> agent keys, for teardown on disconnect;
//! - agent id -> branches it is registered under, so relocation does not
//!   need to scan every bucket.

use std::collections::HashMap;

use indexmap::{IndexMap, IndexSet};
use serde::Serialize;

use crate::types::{AgentKey, BranchKey, ConnId};

/// Printer name given to agents that are relocated before they registered.
pub const UNKNOWN_PRINTER: &str = "Unknown";

/// One registered agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentRecord {
    pub agent_id: String,
    pub business_id: String,
    pub branch_id: String,
    pub printer_name: String,
    pub connection_id: ConnId,
    /// Jobs delivered to this agent without a done/error report yet.
    pub in_flight_jobs: u32,
}

impl AgentRecord {
    fn new(key: &AgentKey, printer_name: String, connection_id: ConnId, in_flight_jobs: u32) -> Self {
        Self {
            agent_id: key.agent_id.clone(),
            business_id: key.business_id().to_string(),
            branch_id: key.branch_id().to_string(),
            printer_name,
            connection_id,
            in_flight_jobs,
        }
    }

    pub fn key(&self) -> AgentKey {
        AgentKey::new(&self.business_id, &self.branch_id, &self.agent_id)
    }
}

/// Nested `business -> branch -> agent -> record` view served by `GET /agents`.
pub type AgentSnapshot = IndexMap<String, IndexMap<String, IndexMap<String, AgentRecord>>>;

/// Result of [`AgentRegistry::move_agent`].
#[derive(Debug, Clone)]
pub struct Relocation {
    /// Branch the agent was found under, if it was registered at all.
    pub from: Option<BranchKey>,
    /// The record now stored under the target keys.
    pub record: AgentRecord,
    /// Records that left the registry (the old location and anything the
    /// move overwrote at the target).
    pub displaced: Vec<AgentRecord>,
}

#[derive(Debug, Default)]
pub struct AgentRegistry {
    branches: IndexMap<BranchKey, IndexMap<String, AgentRecord>>,
    by_connection: HashMap<ConnId, IndexSet<AgentKey>>,
    locations: HashMap<String, IndexSet<BranchKey>>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the record for `key` with a zeroed job counter.
    ///
    /// Returns the record that was replaced, if any.
    pub fn register(
        &mut self,
        key: AgentKey,
        printer_name: impl Into<String>,
        connection_id: impl Into<ConnId>,
    ) -> Option<AgentRecord> {
        let record = AgentRecord::new(&key, printer_name.into(), connection_id.into(), 0);
        self.insert(key, record)
    }

    /// Relocate `agent_id` to `to`, re-pointing it at `connection_id`.
    ///
    /// The source location is `from` when the agent is registered there,
    /// otherwise the first branch the agent is known under. Printer name and
    /// in-flight count carry over. An agent that is not registered anywhere
    /// is created with printer name [`UNKNOWN_PRINTER`].
    pub fn move_agent(
        &mut self,
        agent_id: &str,
        from: Option<&BranchKey>,
        to: BranchKey,
        connection_id: impl Into<ConnId>,
    ) -> Relocation {
        let connection_id = connection_id.into();
        let source = from
            .filter(|branch| self.lookup(&branch.agent(agent_id)).is_some())
            .cloned()
            .or_else(|| {
                self.locations
                    .get(agent_id)
                    .and_then(|branches| branches.first().cloned())
            });

        let mut displaced = Vec::new();
        let (printer_name, in_flight_jobs) = match &source {
            // Same bucket: update in place so the round-robin order holds.
            Some(branch) if *branch == to => {
                let current = self.lookup(&to.agent(agent_id)).cloned();
                match current {
                    Some(current) => (current.printer_name, current.in_flight_jobs),
                    None => (UNKNOWN_PRINTER.to_string(), 0),
                }
            }
            Some(branch) => match self.remove(&branch.agent(agent_id)) {
                Some(old) => {
                    let carried = (old.printer_name.clone(), old.in_flight_jobs);
                    displaced.push(old);
                    carried
                }
                None => (UNKNOWN_PRINTER.to_string(), 0),
            },
            None => (UNKNOWN_PRINTER.to_string(), 0),
        };

        let key = to.agent(agent_id);
        let record = AgentRecord::new(&key, printer_name, connection_id, in_flight_jobs);
        if let Some(replaced) = self.insert(key, record.clone()) {
            if source.as_ref() != Some(&to) || replaced.connection_id != record.connection_id {
                displaced.push(replaced);
            }
        }

        Relocation {
            from: source,
            record,
            displaced,
        }
    }

    pub fn lookup(&self, key: &AgentKey) -> Option<&AgentRecord> {
        self.branches
            .get(&key.branch)
            .and_then(|agents| agents.get(&key.agent_id))
    }

    /// Agent ids registered under `branch`, in registration order.
    pub fn list_agents_for_branch(&self, branch: &BranchKey) -> Vec<String> {
        self.branches
            .get(branch)
            .map(|agents| agents.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Remove every record bound to `connection_id`. Idempotent.
    pub fn remove_by_connection(&mut self, connection_id: &str) -> Vec<AgentRecord> {
        let Some(keys) = self.by_connection.remove(connection_id) else {
            return Vec::new();
        };
        keys.iter().filter_map(|key| self.remove(key)).collect()
    }

    /// Bump the in-flight counter. Returns the new count, or `None` if the
    /// agent is not registered.
    pub fn increment_jobs(&mut self, key: &AgentKey) -> Option<u32> {
        let record = self.lookup_mut(key)?;
        record.in_flight_jobs = record.in_flight_jobs.saturating_add(1);
        Some(record.in_flight_jobs)
    }

    /// Lower the in-flight counter, never below zero.
    pub fn decrement_jobs(&mut self, key: &AgentKey) -> Option<u32> {
        let record = self.lookup_mut(key)?;
        record.in_flight_jobs = record.in_flight_jobs.saturating_sub(1);
        Some(record.in_flight_jobs)
    }

    pub fn snapshot(&self) -> AgentSnapshot {
        let mut snapshot = AgentSnapshot::new();
        for (branch, agents) in &self.branches {
            let branches = snapshot.entry(branch.business_id.clone()).or_default();
            let bucket = branches.entry(branch.branch_id.clone()).or_default();
            for (agent_id, record) in agents {
                bucket.insert(agent_id.clone(), record.clone());
            }
        }
        snapshot
    }

    /// Printer names of every registered agent.
    pub fn printer_names(&self) -> Vec<String> {
        self.branches
            .values()
            .flat_map(|agents| agents.values().map(|r| r.printer_name.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.branches.values().map(IndexMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.branches.is_empty()
    }

    pub fn clear(&mut self) {
        self.branches.clear();
        self.by_connection.clear();
        self.locations.clear();
    }

    fn lookup_mut(&mut self, key: &AgentKey) -> Option<&mut AgentRecord> {
        self.branches
            .get_mut(&key.branch)
            .and_then(|agents| agents.get_mut(&key.agent_id))
    }

    fn insert(&mut self, key: AgentKey, record: AgentRecord) -> Option<AgentRecord> {
        let connection_id = record.connection_id.clone();
        let previous = self
            .branches
            .entry(key.branch.clone())
            .or_default()
            .insert(key.agent_id.clone(), record);

        if let Some(previous) = &previous {
            if previous.connection_id != connection_id {
                self.unlink_connection(&previous.connection_id, &key);
            }
        }
        self.locations
            .entry(key.agent_id.clone())
            .or_default()
            .insert(key.branch.clone());
        self.by_connection
            .entry(connection_id)
            .or_default()
            .insert(key);
        previous
    }

    fn remove(&mut self, key: &AgentKey) -> Option<AgentRecord> {
        let agents = self.branches.get_mut(&key.branch)?;
        let record = agents.shift_remove(&key.agent_id)?;
        if agents.is_empty() {
            self.branches.shift_remove(&key.branch);
        }

        self.unlink_connection(&record.connection_id, key);
        if let Some(branches) = self.locations.get_mut(&key.agent_id) {
            branches.shift_remove(&key.branch);
            if branches.is_empty() {
                self.locations.remove(&key.agent_id);
            }
        }
        Some(record)
    }

    fn unlink_connection(&mut self, connection_id: &str, key: &AgentKey) {
        if let Some(keys) = self.by_connection.get_mut(connection_id) {
            keys.shift_remove(key);
            if keys.is_empty() {
                self.by_connection.remove(connection_id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn branch() -> BranchKey {
        BranchKey::new("b1", "br1")
    }

    // -- register / lookup ----------------------------------------------------

    #[test]
    fn lookup_returns_latest_registration() {
        let mut registry = AgentRegistry::new();
        let key = branch().agent("a1");

        assert!(registry.register(key.clone(), "Epson", "c1").is_none());
        let replaced = registry.register(key.clone(), "Zebra", "c2");

        assert_eq!(replaced.map(|r| r.printer_name), Some("Epson".to_string()));
        let record = registry.lookup(&key).unwrap();
        assert_eq!(record.printer_name, "Zebra");
        assert_eq!(record.connection_id, "c2");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn reregistration_resets_job_count() {
        let mut registry = AgentRegistry::new();
        let key = branch().agent("a1");
        registry.register(key.clone(), "Epson", "c1");
        registry.increment_jobs(&key);
        registry.increment_jobs(&key);

        registry.register(key.clone(), "Epson", "c1");

        assert_eq!(registry.lookup(&key).unwrap().in_flight_jobs, 0);
    }

    #[test]
    fn list_agents_keeps_registration_order() {
        let mut registry = AgentRegistry::new();
        for (agent, conn) in [("a2", "c2"), ("a1", "c1"), ("a3", "c3")] {
            registry.register(branch().agent(agent), "P", conn);
        }
        // Re-registering keeps the original slot.
        registry.register(branch().agent("a2"), "P", "c9");

        assert_eq!(registry.list_agents_for_branch(&branch()), ["a2", "a1", "a3"]);
        assert!(registry
            .list_agents_for_branch(&BranchKey::new("b1", "other"))
            .is_empty());
    }

    #[test]
    fn same_agent_id_in_two_branches_is_two_records() {
        let mut registry = AgentRegistry::new();
        registry.register(AgentKey::new("b1", "br1", "a1"), "Front", "c1");
        registry.register(AgentKey::new("b1", "br2", "a1"), "Back", "c2");

        assert_eq!(registry.len(), 2);
        assert_eq!(
            registry.lookup(&AgentKey::new("b1", "br2", "a1")).unwrap().printer_name,
            "Back"
        );
    }

    // -- remove_by_connection -------------------------------------------------

    #[test]
    fn remove_by_connection_drops_every_matching_record() {
        let mut registry = AgentRegistry::new();
        registry.register(AgentKey::new("b1", "br1", "a1"), "P1", "c1");
        registry.register(AgentKey::new("b2", "br9", "a2"), "P2", "c1");
        registry.register(AgentKey::new("b1", "br1", "a3"), "P3", "c2");

        let removed = registry.remove_by_connection("c1");

        assert_eq!(removed.len(), 2);
        assert_eq!(registry.len(), 1);
        assert!(registry.lookup(&AgentKey::new("b1", "br1", "a1")).is_none());
        assert!(registry.lookup(&AgentKey::new("b1", "br1", "a3")).is_some());
    }

    #[test]
    fn remove_by_connection_twice_is_noop() {
        let mut registry = AgentRegistry::new();
        registry.register(branch().agent("a1"), "P1", "c1");

        assert_eq!(registry.remove_by_connection("c1").len(), 1);
        assert!(registry.remove_by_connection("c1").is_empty());
        assert!(registry.is_empty());
    }

    #[test]
    fn replaced_connection_no_longer_owns_the_agent() {
        let mut registry = AgentRegistry::new();
        let key = branch().agent("a1");
        registry.register(key.clone(), "P1", "old");
        registry.register(key.clone(), "P1", "new");

        assert!(registry.remove_by_connection("old").is_empty());
        assert!(registry.lookup(&key).is_some());
    }

    // -- move_agent -----------------------------------------------------------

    #[test]
    fn move_carries_printer_name_and_job_count() {
        let mut registry = AgentRegistry::new();
        let old = branch().agent("a1");
        registry.register(old.clone(), "Epson", "c1");
        registry.increment_jobs(&old);

        let to = BranchKey::new("b2", "br7");
        let moved = registry.move_agent("a1", None, to.clone(), "c1");

        assert_eq!(moved.from, Some(branch()));
        assert_eq!(moved.displaced.len(), 1);
        assert!(registry.lookup(&old).is_none());
        let record = registry.lookup(&to.agent("a1")).unwrap();
        assert_eq!(record.printer_name, "Epson");
        assert_eq!(record.in_flight_jobs, 1);
        assert!(registry.list_agents_for_branch(&branch()).is_empty());
    }

    #[test]
    fn move_unknown_agent_creates_placeholder() {
        let mut registry = AgentRegistry::new();
        let to = BranchKey::new("b2", "br7");

        let moved = registry.move_agent("ghost", None, to.clone(), "c5");

        assert!(moved.from.is_none());
        assert!(moved.displaced.is_empty());
        let record = registry.lookup(&to.agent("ghost")).unwrap();
        assert_eq!(record.printer_name, UNKNOWN_PRINTER);
        assert_eq!(record.in_flight_jobs, 0);
        assert_eq!(record.connection_id, "c5");
    }

    #[test]
    fn move_prefers_explicit_source_branch() {
        let mut registry = AgentRegistry::new();
        registry.register(AgentKey::new("b1", "br1", "a1"), "First", "c1");
        registry.register(AgentKey::new("b1", "br2", "a1"), "Second", "c1");

        let from = BranchKey::new("b1", "br2");
        let moved = registry.move_agent("a1", Some(&from), BranchKey::new("b1", "br3"), "c1");

        assert_eq!(moved.record.printer_name, "Second");
        assert!(registry.lookup(&AgentKey::new("b1", "br1", "a1")).is_some());
        assert!(registry.lookup(&AgentKey::new("b1", "br2", "a1")).is_none());
    }

    #[test]
    fn move_within_same_branch_keeps_position() {
        let mut registry = AgentRegistry::new();
        registry.register(branch().agent("a1"), "P1", "c1");
        registry.register(branch().agent("a2"), "P2", "c2");

        let moved = registry.move_agent("a1", None, branch(), "c3");

        assert!(moved.displaced.iter().all(|r| r.connection_id == "c1"));
        assert_eq!(registry.list_agents_for_branch(&branch()), ["a1", "a2"]);
        assert_eq!(registry.lookup(&branch().agent("a1")).unwrap().connection_id, "c3");
        assert!(registry.remove_by_connection("c1").is_empty());
    }

    // -- job counters ---------------------------------------------------------

    #[test]
    fn decrement_never_goes_below_zero() {
        let mut registry = AgentRegistry::new();
        let key = branch().agent("a1");
        registry.register(key.clone(), "P1", "c1");

        assert_eq!(registry.decrement_jobs(&key), Some(0));
        assert_eq!(registry.increment_jobs(&key), Some(1));
        assert_eq!(registry.decrement_jobs(&key), Some(0));
        assert_eq!(registry.decrement_jobs(&key), Some(0));
    }

    #[test]
    fn counters_on_missing_agent_return_none() {
        let mut registry = AgentRegistry::new();
        let key = branch().agent("missing");
        assert_eq!(registry.increment_jobs(&key), None);
        assert_eq!(registry.decrement_jobs(&key), None);
    }

    // -- snapshot -------------------------------------------------------------

    #[test]
    fn snapshot_nests_business_branch_agent() {
        let mut registry = AgentRegistry::new();
        registry.register(AgentKey::new("b1", "br1", "a1"), "P1", "c1");
        registry.register(AgentKey::new("b1", "br2", "a2"), "P2", "c2");

        let json = serde_json::to_value(registry.snapshot()).unwrap();

        assert_eq!(json["b1"]["br1"]["a1"]["printerName"], "P1");
        assert_eq!(json["b1"]["br2"]["a2"]["connectionId"], "c2");
        assert_eq!(json["b1"]["br2"]["a2"]["inFlightJobs"], 0);
        assert_eq!(registry.printer_names(), ["P1", "P2"]);
    }
}
