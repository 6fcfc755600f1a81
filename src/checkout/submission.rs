use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::address::{AddressField, AddressForm, AddressGateway, PersistenceError, ShippingAddress};
use crate::feedback::{Notification, NotificationSink};
use crate::form::{FormError, FormResult, SubmitAttempt, SubmitState};

pub const SAVED_MESSAGE: &str = "Endereço criado com sucesso!";
pub const SAVE_FAILED_MESSAGE: &str = "Erro ao criar endereço. Tente novamente.";
pub const SUBMIT_LABEL: &str = "Salvar endereço";
pub const SUBMITTING_LABEL: &str = "Salvando...";

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SubmitOutcome {
    /// Some fields failed validation; nothing was sent.
    Rejected(BTreeSet<AddressField>),
    /// Another submission was still pending.
    Ignored,
    /// The address was created and the form reset.
    Saved(ShippingAddress),
    /// The gateway failed; every entered value is still in the form.
    Failed(PersistenceError),
    /// The controller was torn down before the gateway answered.
    Discarded,
}

/// Drives validate, persist and reset for the address form.
pub struct SubmissionController {
    form: AddressForm,
    gateway: Arc<dyn AddressGateway>,
    sink: Arc<dyn NotificationSink>,
    mounted: AtomicBool,
}

impl SubmissionController {
    pub fn new(
        form: AddressForm,
        gateway: Arc<dyn AddressGateway>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            form,
            gateway,
            sink,
            mounted: AtomicBool::new(true),
        }
    }

    pub fn state(&self) -> FormResult<SubmitState> {
        self.form.controller().submit_state()
    }

    pub fn is_submit_disabled(&self) -> bool {
        matches!(self.state(), Ok(SubmitState::Pending))
    }

    pub fn submit_label(&self) -> &'static str {
        if self.is_submit_disabled() {
            SUBMITTING_LABEL
        } else {
            SUBMIT_LABEL
        }
    }

    /// Later gateway answers are dropped without notifying or resetting.
    pub fn teardown(&self) {
        self.mounted.store(false, Ordering::SeqCst);
    }

    pub async fn submit(&self) -> FormResult<SubmitOutcome> {
        let gateway = &self.gateway;
        let attempt = self
            .form
            .controller()
            .submit_async(|model| async move { gateway.create(&model).await })
            .await;

        let result = match attempt {
            Err(FormError::AlreadySubmitting) => {
                tracing::debug!("submit ignored, previous submission still pending");
                return Ok(SubmitOutcome::Ignored);
            }
            Err(error) => return Err(error),
            Ok(SubmitAttempt::Rejected(keys)) => {
                let fields = keys
                    .into_iter()
                    .filter_map(AddressField::from_key)
                    .collect::<BTreeSet<_>>();
                tracing::debug!(?fields, "submit rejected by validation");
                return Ok(SubmitOutcome::Rejected(fields));
            }
            Ok(SubmitAttempt::Completed(result)) => result,
        };

        if !self.mounted.load(Ordering::SeqCst) {
            tracing::debug!("form unmounted, discarding submission result");
            self.form.controller().finish_submit()?;
            return Ok(SubmitOutcome::Discarded);
        }

        match result {
            Ok(saved) => {
                tracing::info!(id = saved.id.0, "shipping address created");
                self.sink.notify(Notification::success(SAVED_MESSAGE));
                self.form.reset()?;
                Ok(SubmitOutcome::Saved(saved))
            }
            Err(error) => {
                tracing::warn!(%error, "shipping address creation failed");
                self.sink.notify(Notification::error(SAVE_FAILED_MESSAGE));
                self.form.controller().finish_submit()?;
                Ok(SubmitOutcome::Failed(error))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::{AddressFormData, BoxedGatewayFuture, InMemoryAddressBook};
    use crate::feedback::ToastManager;
    use std::time::Duration;

    struct DownGateway;

    impl AddressGateway for DownGateway {
        fn create<'a>(
            &'a self,
            _address: &'a AddressFormData,
        ) -> BoxedGatewayFuture<'a, ShippingAddress> {
            Box::pin(async { Err(PersistenceError::Unavailable("503".into())) })
        }

        fn list(&self) -> BoxedGatewayFuture<'_, Vec<ShippingAddress>> {
            Box::pin(async { Ok(Vec::new()) })
        }
    }

    struct SlowBook {
        inner: InMemoryAddressBook,
    }

    impl AddressGateway for SlowBook {
        fn create<'a>(
            &'a self,
            address: &'a AddressFormData,
        ) -> BoxedGatewayFuture<'a, ShippingAddress> {
            Box::pin(async move {
                tokio::time::sleep(Duration::from_millis(200)).await;
                self.inner.create(address).await
            })
        }

        fn list(&self) -> BoxedGatewayFuture<'_, Vec<ShippingAddress>> {
            self.inner.list()
        }
    }

    fn filled_form() -> AddressForm {
        let form = AddressForm::new().expect("form");
        let entries = [
            (AddressField::Email, "joao@example.com"),
            (AddressField::FullName, "João Souza"),
            (AddressField::DocumentId, "987.654.321-00"),
            (AddressField::Phone, "(31) 99876-5432"),
            (AddressField::PostalCode, "30130-010"),
            (AddressField::Street, "Avenida Afonso Pena"),
            (AddressField::Number, "1500"),
            (AddressField::Neighborhood, "Centro"),
            (AddressField::City, "Belo Horizonte"),
            (AddressField::State, "MG"),
        ];
        for (field, value) in entries {
            form.set_field(field, value).expect("set field");
        }
        form
    }

    #[tokio::test]
    async fn invalid_form_is_rejected_without_gateway_call() {
        let form = filled_form();
        form.set_field(AddressField::DocumentId, "987.654.321").expect("set");
        let book = Arc::new(InMemoryAddressBook::new());
        let controller =
            SubmissionController::new(form, book.clone(), Arc::new(ToastManager::new()));

        let outcome = controller.submit().await.expect("submit");
        assert_eq!(
            outcome,
            SubmitOutcome::Rejected(BTreeSet::from([AddressField::DocumentId]))
        );
        assert_eq!(controller.state().expect("state"), SubmitState::Idle);
        assert!(book.list().await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn failure_keeps_values_and_returns_to_idle() {
        let form = filled_form();
        let before = form.values().expect("values");
        let toasts = Arc::new(ToastManager::new());
        let controller =
            SubmissionController::new(form.clone(), Arc::new(DownGateway), toasts.clone());

        let outcome = controller.submit().await.expect("submit");
        assert_eq!(
            outcome,
            SubmitOutcome::Failed(PersistenceError::Unavailable("503".into()))
        );
        assert_eq!(form.values().expect("values"), before);
        assert_eq!(controller.state().expect("state"), SubmitState::Idle);
        assert_eq!(toasts.messages(), vec![Notification::error(SAVE_FAILED_MESSAGE)]);
    }

    #[tokio::test(start_paused = true)]
    async fn pending_submission_disables_the_button_and_ignores_repeats() {
        let book = Arc::new(SlowBook {
            inner: InMemoryAddressBook::new(),
        });
        let controller = SubmissionController::new(
            filled_form(),
            book.clone(),
            Arc::new(ToastManager::new()),
        );

        let probe = async {
            tokio::task::yield_now().await;
            let disabled = controller.is_submit_disabled();
            let label = controller.submit_label();
            (disabled, label, controller.submit().await.expect("second submit"))
        };
        let (first, (disabled, label, second)) = tokio::join!(controller.submit(), probe);

        assert!(matches!(first.expect("first submit"), SubmitOutcome::Saved(_)));
        assert!(disabled);
        assert_eq!(label, SUBMITTING_LABEL);
        assert_eq!(second, SubmitOutcome::Ignored);
        assert_eq!(book.list().await.expect("list").len(), 1);
        assert_eq!(controller.submit_label(), SUBMIT_LABEL);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_while_saving_still_reports_the_saved_address() {
        let form = filled_form();
        let toasts = Arc::new(ToastManager::new());
        let book = Arc::new(SlowBook {
            inner: InMemoryAddressBook::new(),
        });
        let controller = SubmissionController::new(form.clone(), book.clone(), toasts.clone());

        let reset = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            form.reset().expect("reset while pending");
            controller.state().expect("state")
        };
        let (outcome, state_after_reset) = tokio::join!(controller.submit(), reset);

        assert_eq!(state_after_reset, SubmitState::Pending);
        let saved = match outcome.expect("submit") {
            SubmitOutcome::Saved(saved) => saved,
            other => panic!("expected a saved address, got {other:?}"),
        };
        assert_eq!(saved.address.city, "Belo Horizonte");
        assert_eq!(book.list().await.expect("list").len(), 1);
        assert_eq!(toasts.messages(), vec![Notification::success(SAVED_MESSAGE)]);
        assert_eq!(controller.state().expect("state"), SubmitState::Idle);
        assert_eq!(form.values().expect("values"), AddressFormData::default());
    }

    #[tokio::test(start_paused = true)]
    async fn teardown_discards_a_late_answer() {
        let form = filled_form();
        let toasts = Arc::new(ToastManager::new());
        let controller = SubmissionController::new(
            form.clone(),
            Arc::new(SlowBook {
                inner: InMemoryAddressBook::new(),
            }),
            toasts.clone(),
        );

        let unmount = async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            controller.teardown();
        };
        let (outcome, ()) = tokio::join!(controller.submit(), unmount);

        assert_eq!(outcome.expect("submit"), SubmitOutcome::Discarded);
        assert!(toasts.messages().is_empty());
        assert_eq!(form.value(AddressField::City).expect("city"), "Belo Horizonte");
        assert_eq!(controller.state().expect("state"), SubmitState::Idle);
    }
}
