#![allow(unused)]

use storefront_checkout::form::FormModel;

#[derive(FormModel)]
#[form_model(field_enum = SignupField)]
struct SignupForm {
    email: String,
    accepts_terms: bool,
}

fn main() {}
