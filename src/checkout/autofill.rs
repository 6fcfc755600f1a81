use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use super::CheckoutResult;
use crate::address::{AddressField, AddressForm};
use crate::feedback::{Notification, NotificationSink};
use crate::postal::{PostalAddress, PostalLookupClient};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);
pub const LOOKUP_FAILED_MESSAGE: &str = "Não foi possível buscar o CEP.";

struct AutofillShared {
    form: AddressForm,
    client: PostalLookupClient,
    sink: Arc<dyn NotificationSink>,
    debounce: Duration,
    runtime: Handle,
    generation: AtomicU64,
    torn_down: AtomicBool,
    pending: Mutex<Option<JoinHandle<()>>>,
}

/// Fills street, neighborhood, city and state from the postal code once the
/// user stops typing.
pub struct AutofillController {
    shared: Arc<AutofillShared>,
}

impl AutofillController {
    /// Watches the postal-code field of `form`. Must be called from within a
    /// Tokio runtime; lookups are spawned onto it.
    pub fn attach(
        form: AddressForm,
        client: PostalLookupClient,
        sink: Arc<dyn NotificationSink>,
        debounce: Duration,
    ) -> CheckoutResult<Self> {
        let shared = Arc::new(AutofillShared {
            form,
            client,
            sink,
            debounce,
            runtime: Handle::try_current()?,
            generation: AtomicU64::new(0),
            torn_down: AtomicBool::new(false),
            pending: Mutex::new(None),
        });

        let weak: Weak<AutofillShared> = Arc::downgrade(&shared);
        shared
            .form
            .controller()
            .watch(AddressField::PostalCode, move |_model| {
                if let Some(shared) = weak.upgrade() {
                    shared.schedule();
                }
            })?;
        Ok(Self { shared })
    }

    pub fn debounce(&self) -> Duration {
        self.shared.debounce
    }

    /// True while a timer or lookup is outstanding.
    pub fn is_pending(&self) -> bool {
        pending_slot(&self.shared.pending)
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// Cancels the pending timer and ignores any in-flight lookup. Later
    /// postal-code edits no longer trigger lookups.
    pub fn teardown(&self) {
        self.shared.torn_down.store(true, Ordering::SeqCst);
        self.shared.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(task) = pending_slot(&self.shared.pending).take() {
            task.abort();
        }
    }
}

impl Drop for AutofillController {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl AutofillShared {
    fn schedule(self: &Arc<Self>) {
        if self.torn_down.load(Ordering::SeqCst) {
            return;
        }
        let ticket = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let shared = Arc::clone(self);
        let task = self.runtime.spawn(async move {
            tokio::time::sleep(shared.debounce).await;
            shared.fire(ticket).await;
        });
        if let Some(previous) = pending_slot(&self.pending).replace(task) {
            previous.abort();
        }
    }

    fn is_current(&self, ticket: u64) -> bool {
        !self.torn_down.load(Ordering::SeqCst) && self.generation.load(Ordering::SeqCst) == ticket
    }

    async fn fire(&self, ticket: u64) {
        if !self.is_current(ticket) {
            return;
        }
        let captured = match self.form.value(AddressField::PostalCode) {
            Ok(value) => value,
            Err(error) => {
                tracing::warn!(%error, "could not read postal code for lookup");
                return;
            }
        };

        tracing::debug!(postal_code = %captured, "debounce elapsed");
        let result = self.client.lookup(&captured).await;
        if !self.is_current(ticket) {
            tracing::debug!(postal_code = %captured, "discarding lookup for superseded edit");
            return;
        }

        match result {
            Ok(Some(address)) => {
                let current = self.form.value(AddressField::PostalCode).ok();
                if current.as_deref() != Some(captured.as_str()) {
                    tracing::debug!(
                        postal_code = %captured,
                        "postal code changed, discarding lookup"
                    );
                    return;
                }
                self.apply(address);
            }
            Ok(None) => {}
            Err(error) => {
                tracing::warn!(postal_code = %captured, %error, "postal lookup failed");
                self.sink.notify(Notification::error(LOOKUP_FAILED_MESSAGE));
            }
        }
    }

    fn apply(&self, address: PostalAddress) {
        let PostalAddress {
            street,
            neighborhood,
            city,
            state,
        } = address;
        let values = AddressField::AUTOFILLED.into_iter().zip([street, neighborhood, city, state]);
        for (field, value) in values {
            if let Err(error) = self.form.set_field(field, value) {
                tracing::warn!(%field, %error, "could not apply autofilled value");
                return;
            }
        }
        tracing::debug!("address autofilled from postal code");
    }
}

fn pending_slot(slot: &Mutex<Option<JoinHandle<()>>>) -> MutexGuard<'_, Option<JoinHandle<()>>> {
    match slot.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
