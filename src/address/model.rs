use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::form::{
    FieldKey, FormController, FormModel, FormResult, FormSnapshot, ValidationError,
};

/// Values captured by the "add new address" form.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize, FormModel)]
#[form_model(field_enum = AddressField)]
#[serde(rename_all = "camelCase")]
pub struct AddressFormData {
    pub email: String,
    pub full_name: String,
    /// CPF, formatted `000.000.000-00`.
    pub document_id: String,
    pub phone: String,
    /// CEP, formatted `00000-000`.
    pub postal_code: String,
    pub street: String,
    pub number: String,
    pub complement: String,
    pub neighborhood: String,
    pub city: String,
    pub state: String,
}

impl AddressField {
    /// Fields a postal lookup is allowed to overwrite.
    pub const AUTOFILLED: [Self; 4] = [Self::Street, Self::Neighborhood, Self::City, Self::State];
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FieldError {
    pub field: AddressField,
    pub message: &'static str,
}

impl ValidationError for FieldError {
    fn message(&self) -> &str {
        self.message
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Check {
    Email,
    Pattern(&'static str),
    Required,
}

impl Check {
    pub fn passes(self, value: &str) -> bool {
        match self {
            Check::Email => EMAIL.as_ref().is_some_and(|re| re.is_match(value)),
            Check::Pattern(pattern) => pattern_regex(pattern).is_some_and(|re| re.is_match(value)),
            Check::Required => !value.trim().is_empty(),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FieldRule {
    pub field: AddressField,
    pub check: Check,
    pub message: &'static str,
}

// `[0-9]` rather than `\d`: the regex crate's `\d` matches any Unicode digit.
pub const CPF_PATTERN: &str = r"^[0-9]{3}\.[0-9]{3}\.[0-9]{3}-[0-9]{2}$";
pub const PHONE_PATTERN: &str = r"^\([0-9]{2}\) [0-9]{5}-[0-9]{4}$";
pub const POSTAL_CODE_PATTERN: &str = r"^[0-9]{5}-[0-9]{3}$";

/// Every validation rule of the address form. `complement` is free-form.
pub const ADDRESS_RULES: &[FieldRule] = &[
    FieldRule {
        field: AddressField::Email,
        check: Check::Email,
        message: "E-mail inválido",
    },
    FieldRule {
        field: AddressField::FullName,
        check: Check::Required,
        message: "Nome completo é obrigatório",
    },
    FieldRule {
        field: AddressField::DocumentId,
        check: Check::Pattern(CPF_PATTERN),
        message: "CPF inválido",
    },
    FieldRule {
        field: AddressField::Phone,
        check: Check::Pattern(PHONE_PATTERN),
        message: "Celular inválido",
    },
    FieldRule {
        field: AddressField::PostalCode,
        check: Check::Pattern(POSTAL_CODE_PATTERN),
        message: "CEP inválido",
    },
    FieldRule {
        field: AddressField::Street,
        check: Check::Required,
        message: "Endereço é obrigatório",
    },
    FieldRule {
        field: AddressField::Number,
        check: Check::Required,
        message: "Número é obrigatório",
    },
    FieldRule {
        field: AddressField::Neighborhood,
        check: Check::Required,
        message: "Bairro é obrigatório",
    },
    FieldRule {
        field: AddressField::City,
        check: Check::Required,
        message: "Cidade é obrigatória",
    },
    FieldRule {
        field: AddressField::State,
        check: Check::Required,
        message: "Estado é obrigatório",
    },
];

static EMAIL: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9-]+(\.[A-Za-z0-9-]+)*\.[A-Za-z]{2,}$").ok()
});

static PATTERNS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    ADDRESS_RULES
        .iter()
        .filter_map(|rule| match rule.check {
            Check::Pattern(pattern) => Regex::new(pattern).ok().map(|re| (pattern, re)),
            Check::Email | Check::Required => None,
        })
        .collect()
});

fn pattern_regex(pattern: &str) -> Option<&'static Regex> {
    PATTERNS
        .iter()
        .find(|(candidate, _)| *candidate == pattern)
        .map(|(_, re)| re)
}

/// The address form: [`AddressFormData`] plus per-field error state, driven
/// by [`ADDRESS_RULES`].
#[derive(Clone)]
pub struct AddressForm {
    controller: FormController<AddressFormData, FieldError>,
}

impl AddressForm {
    pub fn new() -> FormResult<Self> {
        let controller = FormController::new(AddressFormData::default());
        for rule in ADDRESS_RULES {
            controller.register_field_validator(
                rule.field,
                move |_model: &AddressFormData, value: &String| {
                    if rule.check.passes(value) {
                        Ok(())
                    } else {
                        Err(FieldError {
                            field: rule.field,
                            message: rule.message,
                        })
                    }
                },
            )?;
        }
        Ok(Self { controller })
    }

    pub fn controller(&self) -> &FormController<AddressFormData, FieldError> {
        &self.controller
    }

    pub fn set_field(&self, field: AddressField, value: impl Into<String>) -> FormResult<()> {
        self.controller.set(field, value.into())
    }

    pub fn value(&self, field: AddressField) -> FormResult<String> {
        self.controller.value(field)
    }

    pub fn values(&self) -> FormResult<AddressFormData> {
        self.controller.model()
    }

    pub fn error(&self, field: AddressField) -> FormResult<Option<&'static str>> {
        Ok(self
            .controller
            .field_error(field)?
            .map(|error| error.message))
    }

    /// Re-runs every rule; an empty set means the form may be submitted.
    pub fn validate_all(&self) -> FormResult<BTreeSet<AddressField>> {
        Ok(self
            .controller
            .validate_all()?
            .into_iter()
            .filter_map(AddressField::from_key)
            .collect())
    }

    pub fn reset(&self) -> FormResult<()> {
        self.controller.reset_to_initial()
    }

    pub fn snapshot(&self) -> FormResult<FormSnapshot<AddressFormData, FieldError>> {
        self.controller.snapshot()
    }

    pub fn field_keys() -> &'static [FieldKey] {
        AddressFormData::FIELD_KEYS
    }
}
