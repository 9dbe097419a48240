//! Payment settlement.

mod payment;
mod process;

pub use payment::{Payment, PaymentMethod, PaymentStatus};
pub use process::{PaymentProcess, PaymentProcessStatus};
