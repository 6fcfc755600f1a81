#![allow(unused)]

use storefront_checkout::form::FormModel;

#[derive(FormModel)]
struct Coordinates(f64, f64);

fn main() {}
