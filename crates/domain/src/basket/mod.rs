//! Basket aggregate: items, limits and lifecycle.

mod aggregate;
mod item;
mod state;

pub use aggregate::Basket;
pub use item::{BasketItem, Price, Product};
pub use state::BasketStatus;
