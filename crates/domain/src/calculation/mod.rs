//! Calculation engine and the cached basket calculation.

mod basket_calculation;
pub mod engine;

pub use basket_calculation::BasketCalculation;
pub use engine::{CalculationResult, Cost, combine, item_result};
