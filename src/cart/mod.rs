//! Cart drawer state: line items, the item-count badge and the subtotal.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, RwLock};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub const DRAWER_TITLE: &str = "Carrinho";
pub const LOADING_LABEL: &str = "Carregando...";

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub id: String,
    pub product_name: String,
    pub variant_name: String,
    pub variant_image_url: String,
    pub variant_price_in_cents: i64,
    pub quantity: u32,
}

impl CartItem {
    pub fn unit_price(&self) -> Decimal {
        cents_to_decimal(self.variant_price_in_cents)
    }

    pub fn line_total(&self) -> Decimal {
        self.unit_price().saturating_mul(Decimal::from(self.quantity))
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    pub items: Vec<CartItem>,
}

impl Cart {
    pub fn total_items(&self) -> u32 {
        self.items
            .iter()
            .fold(0u32, |total, item| total.saturating_add(item.quantity))
    }

    /// Saturates at `Decimal::MAX` instead of overflowing.
    pub fn subtotal(&self) -> Decimal {
        self.items
            .iter()
            .map(CartItem::line_total)
            .fold(Decimal::ZERO, Decimal::saturating_add)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

pub fn cents_to_decimal(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

/// `R$ 1.234,56`.
pub fn format_brl(amount: Decimal) -> String {
    let rounded = amount.round_dp(2);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let fixed = format!("{:.2}", rounded.abs());
    let (whole, fraction) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (index, digit) in whole.chars().enumerate() {
        if index > 0 && (whole.len() - index) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(digit);
    }

    let sign = if negative { "-" } else { "" };
    format!("{sign}R$ {grouped},{fraction}")
}

#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum CartError {
    #[error("cart service unavailable: {0}")]
    Unavailable(String),
    #[error("not signed in")]
    Unauthorized,
}

pub type BoxedCartFuture<'a> = Pin<Box<dyn Future<Output = Result<Cart, CartError>> + Send + 'a>>;

pub trait CartSource: Send + Sync + 'static {
    fn fetch_cart(&self) -> BoxedCartFuture<'_>;
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CartView {
    Loading,
    Ready(Cart),
    Unavailable(CartError),
}

/// Drawer contents, refreshed from a [`CartSource`].
pub struct CartDrawer {
    source: Arc<dyn CartSource>,
    view: RwLock<CartView>,
}

impl CartDrawer {
    pub fn new(source: Arc<dyn CartSource>) -> Self {
        Self {
            source,
            view: RwLock::new(CartView::Loading),
        }
    }

    pub async fn refresh(&self) -> CartView {
        let next = match self.source.fetch_cart().await {
            Ok(cart) => {
                tracing::debug!(items = cart.total_items(), "cart loaded");
                CartView::Ready(cart)
            }
            Err(error) => {
                tracing::warn!(%error, "cart could not be loaded");
                CartView::Unavailable(error)
            }
        };
        match self.view.write() {
            Ok(mut view) => *view = next.clone(),
            Err(poisoned) => *poisoned.into_inner() = next.clone(),
        }
        next
    }

    pub fn view(&self) -> CartView {
        match self.view.read() {
            Ok(view) => view.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.view(), CartView::Loading)
    }

    /// The count shown on the cart button; hidden when the cart is empty.
    pub fn badge(&self) -> Option<u32> {
        match self.view() {
            CartView::Ready(cart) => Some(cart.total_items()).filter(|count| *count > 0),
            CartView::Loading | CartView::Unavailable(_) => None,
        }
    }

    pub fn subtotal_label(&self) -> Option<String> {
        match self.view() {
            CartView::Ready(cart) if !cart.is_empty() => Some(format_brl(cart.subtotal())),
            _ => None,
        }
    }
}
