pub mod address;
pub mod cart;
pub mod checkout;
pub mod config;
pub mod feedback;
pub mod form;
pub mod logging;
pub mod postal;

pub use checkout::{CheckoutError, CheckoutResult, IdentificationScreen, SubmitOutcome};
pub use config::{CheckoutConfig, ConfigError};
