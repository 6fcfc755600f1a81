use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use super::controller::{
    FieldKey, FormController, FormResult, SyncFieldValidatorFn, read_lock, write_lock,
};

pub trait ValidationError: Clone + Send + Sync + 'static {
    fn message(&self) -> &str;
}

pub trait FieldLens<T>: Copy + Send + Sync + 'static {
    type Value: Clone + PartialEq + Send + Sync + 'static;

    fn key(self) -> FieldKey;
    fn get<'a>(self, model: &'a T) -> &'a Self::Value;
    fn set(self, model: &mut T, value: Self::Value);
}

pub trait FormModel: Clone + Send + Sync + 'static {
    type Fields;

    const FIELD_KEYS: &'static [FieldKey];

    fn fields() -> Self::Fields;
}

pub trait FieldValidator<T, L, E>: Send + Sync
where
    L: FieldLens<T>,
    E: ValidationError,
{
    fn validate(&self, model: &T, value: &L::Value) -> Result<(), E>;
}

impl<T, L, E, F> FieldValidator<T, L, E> for F
where
    L: FieldLens<T>,
    E: ValidationError,
    F: for<'a> Fn(&'a T, &'a L::Value) -> Result<(), E> + Send + Sync,
{
    fn validate(&self, model: &T, value: &L::Value) -> Result<(), E> {
        (self)(model, value)
    }
}

impl<T, E> FormController<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: ValidationError,
{
    pub fn register_field_validator<L, V>(&self, lens: L, validator: V) -> FormResult<()>
    where
        L: FieldLens<T>,
        V: FieldValidator<T, L, E> + 'static,
    {
        let key = lens.key();
        let validator = Arc::new(validator);
        let wrapped: SyncFieldValidatorFn<T, E> =
            Arc::new(move |model: &T| validator.validate(model, lens.get(model)));
        let mut validators =
            write_lock(&self.sync_field_validators, "registering field validator")?;
        validators.entry(key).or_default().push(wrapped);
        Ok(())
    }

    pub fn set<L>(&self, lens: L, value: L::Value) -> FormResult<()>
    where
        L: FieldLens<T>,
    {
        let key = lens.key();
        let model = {
            let mut state = write_lock(&self.state, "writing form model")?;
            lens.set(&mut state.model, value);
            let is_dirty = lens.get(&state.model) != lens.get(&state.initial_model);
            if is_dirty {
                state.dirty_fields.insert(key);
            } else {
                state.dirty_fields.remove(&key);
            }
            state.ensure_meta(key).dirty = is_dirty;
            state.model.clone()
        };

        self.validate_field_by_key(key)?;
        self.notify_watchers(key, &model)
    }

    /// Runs every registered validator and returns the keys that failed.
    pub fn validate_all(&self) -> FormResult<BTreeSet<FieldKey>> {
        let model = {
            read_lock(&self.state, "reading model for form validation")?
                .model
                .clone()
        };
        let field_validators = read_lock(
            &self.sync_field_validators,
            "reading field validators for form validation",
        )?
        .clone();

        let mut field_errors = BTreeMap::<FieldKey, Vec<E>>::new();
        for (key, validators) in field_validators {
            field_errors.insert(key, self.run_validators(&validators, &model));
        }

        let mut state = write_lock(&self.state, "applying form validation result")?;
        let mut keys = state
            .field_meta
            .keys()
            .copied()
            .collect::<BTreeSet<FieldKey>>();
        keys.extend(field_errors.keys().copied());
        let mut failed = BTreeSet::new();
        for key in keys {
            let errors = field_errors.remove(&key).unwrap_or_default();
            if !errors.is_empty() {
                failed.insert(key);
            }
            state.ensure_meta(key).errors = errors;
        }
        Ok(failed)
    }

    pub(super) fn validate_field_by_key(&self, key: FieldKey) -> FormResult<bool> {
        let model = {
            read_lock(&self.state, "reading model for field validation")?
                .model
                .clone()
        };
        let validators = {
            read_lock(
                &self.sync_field_validators,
                "reading field validators for key validation",
            )?
            .get(&key)
            .cloned()
            .unwrap_or_default()
        };

        let errors = self.run_validators(&validators, &model);
        let is_valid = errors.is_empty();
        let mut state = write_lock(&self.state, "writing field validation result")?;
        state.ensure_meta(key).errors = errors;
        Ok(is_valid)
    }

    fn run_validators(&self, validators: &[SyncFieldValidatorFn<T, E>], model: &T) -> Vec<E> {
        validators
            .iter()
            .filter_map(|validator| validator(model).err())
            .collect()
    }

    fn notify_watchers(&self, key: FieldKey, model: &T) -> FormResult<()> {
        let watchers = read_lock(&self.watchers, "reading field watchers")?
            .get(&key)
            .cloned()
            .unwrap_or_default();
        for watcher in watchers {
            watcher(model);
        }
        Ok(())
    }
}
