use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use super::{AutofillController, CheckoutResult, SubmissionController, SubmitOutcome};
use crate::address::{
    AddressField, AddressForm, AddressGateway, PersistenceError, ShippingAddress,
};
use crate::config::CheckoutConfig;
use crate::feedback::NotificationSink;
use crate::form::SubmitState;
use crate::postal::{PostalDirectory, PostalLookupClient, ViaCepDirectory};

pub const TITLE: &str = "Identificação";
pub const ADD_NEW_ADDRESS_LABEL: &str = "Adicionar novo endereço";

/// The identification card: an "add new address" option that reveals the
/// address form, with postal autofill and submission wired in.
pub struct IdentificationScreen {
    form: AddressForm,
    autofill: AutofillController,
    submission: SubmissionController,
    gateway: Arc<dyn AddressGateway>,
    adding_new_address: AtomicBool,
}

impl IdentificationScreen {
    pub fn new(
        config: &CheckoutConfig,
        directory: impl PostalDirectory,
        gateway: Arc<dyn AddressGateway>,
        sink: Arc<dyn NotificationSink>,
    ) -> CheckoutResult<Self> {
        let form = AddressForm::new()?;
        let autofill = AutofillController::attach(
            form.clone(),
            PostalLookupClient::new(directory),
            sink.clone(),
            config.debounce(),
        )?;
        let submission = SubmissionController::new(form.clone(), gateway.clone(), sink);
        Ok(Self {
            form,
            autofill,
            submission,
            gateway,
            adding_new_address: AtomicBool::new(false),
        })
    }

    /// Uses ViaCEP at the configured base URL.
    pub fn with_viacep(
        config: &CheckoutConfig,
        gateway: Arc<dyn AddressGateway>,
        sink: Arc<dyn NotificationSink>,
    ) -> CheckoutResult<Self> {
        let directory =
            ViaCepDirectory::new(config.viacep_base_url.clone(), config.lookup_timeout());
        Self::new(config, directory, gateway, sink)
    }

    pub fn form(&self) -> &AddressForm {
        &self.form
    }

    pub fn autofill(&self) -> &AutofillController {
        &self.autofill
    }

    pub fn select_new_address(&self) {
        self.adding_new_address.store(true, Ordering::SeqCst);
    }

    pub fn clear_selection(&self) {
        self.adding_new_address.store(false, Ordering::SeqCst);
    }

    pub fn is_form_visible(&self) -> bool {
        self.adding_new_address.load(Ordering::SeqCst)
    }

    pub fn set_field(&self, field: AddressField, value: impl Into<String>) -> CheckoutResult<()> {
        Ok(self.form.set_field(field, value)?)
    }

    pub fn set_field_by_name(&self, name: &str, value: impl Into<String>) -> CheckoutResult<()> {
        let field = name.parse::<AddressField>()?;
        self.set_field(field, value)
    }

    pub fn submit_state(&self) -> CheckoutResult<SubmitState> {
        Ok(self.submission.state()?)
    }

    pub fn is_submit_disabled(&self) -> bool {
        self.submission.is_submit_disabled()
    }

    pub fn submit_label(&self) -> &'static str {
        self.submission.submit_label()
    }

    /// Submits the address form. A saved address also collapses the form.
    pub async fn submit(&self) -> CheckoutResult<SubmitOutcome> {
        if !self.is_form_visible() {
            tracing::debug!("submit ignored, address form is hidden");
            return Ok(SubmitOutcome::Ignored);
        }
        let outcome = self.submission.submit().await?;
        if matches!(outcome, SubmitOutcome::Saved(_)) {
            self.clear_selection();
        }
        Ok(outcome)
    }

    pub async fn saved_addresses(&self) -> Result<Vec<ShippingAddress>, PersistenceError> {
        self.gateway.list().await
    }

    pub fn teardown(&self) {
        self.autofill.teardown();
        self.submission.teardown();
    }
}
