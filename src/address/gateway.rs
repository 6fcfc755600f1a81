use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use super::model::AddressFormData;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct ShippingAddressId(pub u64);

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub id: ShippingAddressId,
    #[serde(flatten)]
    pub address: AddressFormData,
}

#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum PersistenceError {
    #[error("address service rejected the request: {0}")]
    Rejected(String),
    #[error("address service unavailable: {0}")]
    Unavailable(String),
}

pub type BoxedGatewayFuture<'a, T> =
    Pin<Box<dyn Future<Output = Result<T, PersistenceError>> + Send + 'a>>;

/// Remote store of the customer's shipping addresses.
pub trait AddressGateway: Send + Sync + 'static {
    fn create<'a>(&'a self, address: &'a AddressFormData)
    -> BoxedGatewayFuture<'a, ShippingAddress>;

    fn list(&self) -> BoxedGatewayFuture<'_, Vec<ShippingAddress>>;
}

impl<G: AddressGateway + ?Sized> AddressGateway for Arc<G> {
    fn create<'a>(
        &'a self,
        address: &'a AddressFormData,
    ) -> BoxedGatewayFuture<'a, ShippingAddress> {
        (**self).create(address)
    }

    fn list(&self) -> BoxedGatewayFuture<'_, Vec<ShippingAddress>> {
        (**self).list()
    }
}

/// Process-local address book, for demos and tests.
#[derive(Clone, Default)]
pub struct InMemoryAddressBook {
    next_id: Arc<AtomicU64>,
    addresses: Arc<RwLock<Vec<ShippingAddress>>>,
}

impl InMemoryAddressBook {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AddressGateway for InMemoryAddressBook {
    fn create<'a>(
        &'a self,
        address: &'a AddressFormData,
    ) -> BoxedGatewayFuture<'a, ShippingAddress> {
        Box::pin(async move {
            let record = ShippingAddress {
                id: ShippingAddressId(self.next_id.fetch_add(1, Ordering::SeqCst) + 1),
                address: address.clone(),
            };
            let mut addresses = self
                .addresses
                .write()
                .map_err(|_| PersistenceError::Unavailable("address book poisoned".into()))?;
            addresses.push(record.clone());
            Ok(record)
        })
    }

    fn list(&self) -> BoxedGatewayFuture<'_, Vec<ShippingAddress>> {
        Box::pin(async move {
            let addresses = self
                .addresses
                .read()
                .map_err(|_| PersistenceError::Unavailable("address book poisoned".into()))?;
            Ok(addresses.clone())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;

    #[test]
    fn address_book_assigns_ids_and_lists_in_creation_order() {
        let book = InMemoryAddressBook::new();
        let first = AddressFormData {
            city: "Recife".into(),
            ..AddressFormData::default()
        };
        let second = AddressFormData {
            city: "Natal".into(),
            ..AddressFormData::default()
        };

        let created = block_on(book.create(&first)).expect("create first");
        block_on(book.create(&second)).expect("create second");
        assert_eq!(created.id, ShippingAddressId(1));

        let listed = block_on(book.list()).expect("list");
        let cities = listed
            .iter()
            .map(|record| record.address.city.as_str())
            .collect::<Vec<_>>();
        assert_eq!(cities, vec!["Recife", "Natal"]);
        assert_eq!(listed[1].id, ShippingAddressId(2));
    }
}
