#![allow(unused)]

use storefront_checkout::form::FormModel;

#[derive(FormModel)]
struct Draft<T> {
    value: T,
}

fn main() {}
