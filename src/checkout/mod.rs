//! The identification step of checkout: capturing a new shipping address.

mod autofill;
mod identification;
mod submission;

pub use autofill::{AutofillController, DEFAULT_DEBOUNCE, LOOKUP_FAILED_MESSAGE};
pub use identification::{ADD_NEW_ADDRESS_LABEL, IdentificationScreen, TITLE};
pub use submission::{
    SAVE_FAILED_MESSAGE, SAVED_MESSAGE, SUBMIT_LABEL, SUBMITTING_LABEL, SubmissionController,
    SubmitOutcome,
};

use crate::form::{FormError, UnknownField};

#[derive(Debug, thiserror::Error)]
pub enum CheckoutError {
    #[error(transparent)]
    Form(#[from] FormError),
    #[error(transparent)]
    UnknownField(#[from] UnknownField),
    #[error("checkout controllers need a running Tokio runtime: {0}")]
    NoRuntime(#[from] tokio::runtime::TryCurrentError),
}

pub type CheckoutResult<T> = Result<T, CheckoutError>;
