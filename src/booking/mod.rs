//! Booking and checkout flow state machines.
//!
//! Each flow is a tagged state plus a pure reducer, so a variant only carries
//! the data valid at that step and transitions are testable without any UI.

pub mod card_form;
pub mod cart;
pub mod quick_book;
pub mod wizard;
