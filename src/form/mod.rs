mod controller;
mod validation;


pub use checkout_form_derive::FormModel;
pub use controller::{
    FieldKey, FieldMeta, FormController, FormError, FormResult, FormSnapshot, SubmitAttempt,
    SubmitState, UnknownField,
};
pub use validation::{FieldLens, FieldValidator, FormModel, ValidationError};
