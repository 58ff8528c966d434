//! # Filing Events
//!
//! This crate provides the change-event bus of the filing access platform.
//! Every mutation of the access core (units, business roles, rules,
//! overrides) publishes an event so audit trails, caches and search indexes
//! can follow along.
//!
//! ## Overview
//!
//! The filing-events crate handles:
//! - **Event Envelope**: Id, type, organization, subject, payload
//! - **Typed Events**: One enum per entity, converted with `to_event`
//! - **Event Bus**: Publish/subscribe with topic wildcards
//! - **Event Handlers**: Async event processing
//!
//! ## Usage
//!
//! ```rust,no_run
//! use filing_events::{EventBus, MemoryEventBus, OrgUnitEvent};
//! use uuid::Uuid;
//!
//! async fn listen() {
//!     let bus = MemoryEventBus::new();
//!     let mut sub = bus.subscribe("filing.org_unit.*").await.unwrap();
//!
//!     let org_id = Uuid::now_v7();
//!     let event = OrgUnitEvent::Updated { unit_id: Uuid::now_v7() }.to_event(org_id);
//!     bus.publish(event).await.unwrap();
//!
//!     while let Ok(event) = sub.recv().await {
//!         println!("Received: {}", event.event_type);
//!     }
//! }
//! ```
//!
//! ## Topic Patterns
//!
//! Topics are structured as `filing.{entity}.{verb}`:
//! - `filing.org_unit.deleted` - Specific event
//! - `filing.access_override.*` - All override events
//! - `filing.#` - All events
//!
//! Wildcards:
//! - `*` matches exactly one segment
//! - `#` matches zero or more segments
//!
//! ## Ordering
//!
//! A cascading unit deletion publishes one `org_unit.deleted` per unit,
//! leaves before parents, on the same bus in a single task; subscribers see
//! them in that order.

pub mod bus;
pub mod types;

// Re-export main types
pub use bus::{
    EventBus, EventBusError, EventBusResult, EventBusStats, EventHandler, MemoryEventBus,
    Subscription,
};
pub use types::{
    AccessOverrideEvent, AccessRuleEvent, BusinessRoleEvent, Event, OrgUnitEvent, TOPIC_PREFIX,
};
