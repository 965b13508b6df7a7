//! Notification objects shared between the interrupt path and the consumer.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  external id  ┌───────────────┐
//! │   Consumer   │ ────────────> │ NotifierTable │ lookup() takes a reference
//! └──────┬───────┘               └───────┬───────┘
//!        │ read()/poll()                 │ Arc<dyn EventNotifier>
//!        │                               ▼
//!        │                       ┌───────────────┐
//!        │                       │ Vector slot   │ bound by the registry
//!        │                       └───────┬───────┘
//!        │                               │ signal() from interrupt context
//!        ▼                               ▼
//! ┌──────────────┐               ┌───────────────┐
//! │  UioEvent    │ <─ legacy ─── │  EventFd      │
//! └──────────────┘    line       └───────────────┘
//! ```
//!
//! Vector interrupts signal the notifier bound to their slot. Legacy-line
//! interrupts are counted in the device's [`UioEvent`] by the exposer.

mod eventfd;
mod poll;
mod table;

pub use eventfd::{EventFd, EventNotifier};
pub use poll::UioEvent;
pub use table::{NotifierLookup, NotifierTable};
