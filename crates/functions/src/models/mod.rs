//! Domain models for the functions service.
//!
//! These are validated domain objects, separate from the row types the
//! repositories read from Postgres.

pub mod order;
pub mod subscriber;

pub use order::{NewOrder, NewOrderItem, Order, OrderItem};
pub use subscriber::{NewSubscriber, Subscriber};
