//! Composite event filters
//!
//! A filter is a union of clauses. Within a clause, an event must carry one
//! of the listed tags AND satisfy every field predicate; across clauses the
//! filter matches if ANY clause does. Builders keep both the type set and
//! the clause list non-empty by construction.

use crate::events::{DomainEvent, EventType};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One clause of an event filter
///
/// Matches an event when the event's tag is in `types` and, for every
/// predicate, the payload has that field with a deeply equal value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterClause {
    types: Vec<EventType>,
    predicates: IndexMap<String, Value>,
}

impl FilterClause {
    /// A clause matching one event type, with no predicates yet
    pub fn of(event_type: EventType) -> Self {
        Self {
            types: vec![event_type],
            predicates: IndexMap::new(),
        }
    }

    /// Widen the clause to also match another event type
    pub fn or_type(mut self, event_type: EventType) -> Self {
        if !self.types.contains(&event_type) {
            self.types.push(event_type);
        }
        self
    }

    /// Require a payload field to deeply equal the given value
    pub fn with_predicate(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.predicates.insert(field.into(), value.into());
        self
    }

    /// The event types this clause matches
    pub fn types(&self) -> &[EventType] {
        &self.types
    }

    /// The field predicates of this clause
    pub fn predicates(&self) -> &IndexMap<String, Value> {
        &self.predicates
    }

    /// Whether this clause matches the event
    pub fn matches(&self, event: &DomainEvent) -> bool {
        if !self.types.contains(&event.event_type()) {
            return false;
        }
        if self.predicates.is_empty() {
            return true;
        }
        let payload = event.payload_value();
        self.predicates
            .iter()
            .all(|(field, expected)| payload.get(field) == Some(expected))
    }
}

/// A union of filter clauses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventFilter {
    clauses: Vec<FilterClause>,
}

impl EventFilter {
    /// A filter with a single clause
    pub fn clause(clause: FilterClause) -> Self {
        Self {
            clauses: vec![clause],
        }
    }

    /// Extend the filter with an alternative clause
    pub fn or(mut self, clause: FilterClause) -> Self {
        self.clauses.push(clause);
        self
    }

    /// The clauses of this filter
    pub fn clauses(&self) -> &[FilterClause] {
        &self.clauses
    }

    /// Whether any clause matches the event
    pub fn matches(&self, event: &DomainEvent) -> bool {
        self.clauses.iter().any(|clause| clause.matches(event))
    }
}

impl From<FilterClause> for EventFilter {
    fn from(clause: FilterClause) -> Self {
        EventFilter::clause(clause)
    }
}
