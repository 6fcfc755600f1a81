#![allow(unused)]

use storefront_checkout::form::FormModel;

#[derive(FormModel)]
enum DeliveryOption {
    Standard,
    Express,
}

fn main() {}
