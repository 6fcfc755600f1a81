mod gateway;
mod model;

pub use gateway::{
    AddressGateway, BoxedGatewayFuture, InMemoryAddressBook, PersistenceError, ShippingAddress,
    ShippingAddressId,
};
pub use model::{
    ADDRESS_RULES, AddressField, AddressForm, AddressFormData, CPF_PATTERN, Check, FieldError,
    FieldRule, PHONE_PATTERN, POSTAL_CODE_PATTERN,
};
