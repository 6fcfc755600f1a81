use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{Display, Formatter};
use std::future::Future;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::validation::ValidationError;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct FieldKey(&'static str);

impl FieldKey {
    pub const fn new(value: &'static str) -> Self {
        Self(value)
    }

    pub const fn as_str(self) -> &'static str {
        self.0
    }
}

impl Display for FieldKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0)
    }
}

#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[error("unknown form field `{0}`")]
pub struct UnknownField(pub String);

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SubmitState {
    Idle,
    Pending,
    Succeeded,
    Failed,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FieldMeta<E> {
    pub dirty: bool,
    pub errors: Vec<E>,
}

impl<E> Default for FieldMeta<E> {
    fn default() -> Self {
        Self {
            dirty: false,
            errors: Vec::new(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct FormSnapshot<T, E> {
    pub model: T,
    pub submit_state: SubmitState,
    pub submit_count: u32,
    pub is_dirty: bool,
    pub is_valid: bool,
    pub field_meta: BTreeMap<FieldKey, FieldMeta<E>>,
}

impl<T, E> FormSnapshot<T, E> {
    pub fn error_keys(&self) -> BTreeSet<FieldKey> {
        self.field_meta
            .iter()
            .filter(|(_, meta)| !meta.errors.is_empty())
            .map(|(key, _)| *key)
            .collect()
    }
}

/// Outcome of a submit attempt that was allowed to start.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SubmitAttempt<R> {
    /// Validation failed; the handler was not called.
    Rejected(BTreeSet<FieldKey>),
    /// The handler ran to completion with this result.
    Completed(R),
}

#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
pub enum FormError {
    #[error("form state lock poisoned while {0}")]
    StatePoisoned(&'static str),
    #[error("invalid submit state transition: {from:?} -> {to:?}")]
    InvalidStateTransition { from: SubmitState, to: SubmitState },
    #[error("form submit is already in progress")]
    AlreadySubmitting,
}

pub type FormResult<T> = Result<T, FormError>;

pub(super) type SyncFieldValidatorFn<T, E> = Arc<dyn Fn(&T) -> Result<(), E> + Send + Sync>;
pub(super) type WatchFn<T> = Arc<dyn Fn(&T) + Send + Sync>;

pub(super) struct FormState<T, E> {
    pub(super) initial_model: T,
    pub(super) model: T,
    pub(super) submit_state: SubmitState,
    pub(super) submit_count: u32,
    pub(super) dirty_fields: BTreeSet<FieldKey>,
    pub(super) field_meta: BTreeMap<FieldKey, FieldMeta<E>>,
}

impl<T, E> FormState<T, E> {
    pub(super) fn ensure_meta(&mut self, key: FieldKey) -> &mut FieldMeta<E> {
        self.field_meta.entry(key).or_default()
    }
}

#[derive(Clone)]
pub struct FormController<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: ValidationError,
{
    pub(super) state: Arc<RwLock<FormState<T, E>>>,
    pub(super) sync_field_validators:
        Arc<RwLock<BTreeMap<FieldKey, Vec<SyncFieldValidatorFn<T, E>>>>>,
    pub(super) watchers: Arc<RwLock<BTreeMap<FieldKey, Vec<WatchFn<T>>>>>,
}

impl<T, E> FormController<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: ValidationError,
{
    pub fn new(initial: T) -> Self {
        Self {
            state: Arc::new(RwLock::new(FormState {
                initial_model: initial.clone(),
                model: initial,
                submit_state: SubmitState::Idle,
                submit_count: 0,
                dirty_fields: BTreeSet::new(),
                field_meta: BTreeMap::new(),
            })),
            sync_field_validators: Arc::new(RwLock::new(BTreeMap::new())),
            watchers: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }

    /// Runs `f` with the current model after every `set` of the watched field.
    ///
    /// Watchers run after all form locks are released, so they may read or
    /// write the form themselves.
    pub fn watch<L>(&self, lens: L, f: impl Fn(&T) + Send + Sync + 'static) -> FormResult<()>
    where
        L: super::validation::FieldLens<T>,
    {
        let mut watchers = write_lock(&self.watchers, "registering field watcher")?;
        watchers.entry(lens.key()).or_default().push(Arc::new(f));
        Ok(())
    }

    /// Validates, then runs `f` with a copy of the model.
    ///
    /// The state moves `Idle -> Pending -> Succeeded | Failed` and stays there
    /// until [`finish_submit`](Self::finish_submit) or a reset. A rejected
    /// attempt leaves the state untouched. Claiming `Pending` and reading the
    /// model happen under one lock, so only one caller can reach `f`.
    pub async fn submit_async<F, Fut, R, X>(&self, f: F) -> FormResult<SubmitAttempt<Result<R, X>>>
    where
        F: FnOnce(T) -> Fut,
        Fut: Future<Output = Result<R, X>>,
    {
        if self.submit_state()? == SubmitState::Pending {
            return Err(FormError::AlreadySubmitting);
        }

        let errors = self.validate_all()?;
        if !errors.is_empty() {
            return Ok(SubmitAttempt::Rejected(errors));
        }

        let model = {
            let mut state = write_lock(&self.state, "moving submit state to pending")?;
            transition_submit_state(&mut state, SubmitState::Pending)?;
            state.submit_count = state.submit_count.saturating_add(1);
            state.model.clone()
        };
        let submit_result = f(model).await;

        let mut state = write_lock(&self.state, "completing async submit")?;
        if submit_result.is_ok() {
            transition_submit_state(&mut state, SubmitState::Succeeded)?;
        } else {
            transition_submit_state(&mut state, SubmitState::Failed)?;
        }
        Ok(SubmitAttempt::Completed(submit_result))
    }

    pub fn finish_submit(&self) -> FormResult<()> {
        let mut state = write_lock(&self.state, "finishing submit")?;
        transition_submit_state(&mut state, SubmitState::Idle)
    }

    pub fn submit_state(&self) -> FormResult<SubmitState> {
        Ok(read_lock(&self.state, "reading submit state")?.submit_state)
    }

    /// Restores the initial model and clears field state. A pending submit
    /// keeps its `Pending` state so that its completion still lands.
    pub fn reset_to_initial(&self) -> FormResult<()> {
        let mut state = write_lock(&self.state, "resetting form")?;
        state.model = state.initial_model.clone();
        if state.submit_state != SubmitState::Pending {
            state.submit_state = SubmitState::Idle;
        }
        state.dirty_fields.clear();
        for meta in state.field_meta.values_mut() {
            meta.dirty = false;
            meta.errors.clear();
        }
        Ok(())
    }

    pub fn clear_errors(&self) -> FormResult<()> {
        let mut state = write_lock(&self.state, "clearing all field errors")?;
        for meta in state.field_meta.values_mut() {
            meta.errors.clear();
        }
        Ok(())
    }

    pub fn snapshot(&self) -> FormResult<FormSnapshot<T, E>> {
        let state = read_lock(&self.state, "creating form snapshot")?;
        let is_valid = state.field_meta.values().all(|meta| meta.errors.is_empty());
        Ok(FormSnapshot {
            model: state.model.clone(),
            submit_state: state.submit_state,
            submit_count: state.submit_count,
            is_dirty: !state.dirty_fields.is_empty(),
            is_valid,
            field_meta: state.field_meta.clone(),
        })
    }

    pub fn model(&self) -> FormResult<T> {
        Ok(read_lock(&self.state, "reading form model")?.model.clone())
    }

    pub fn value<L>(&self, lens: L) -> FormResult<L::Value>
    where
        L: super::validation::FieldLens<T>,
    {
        Ok(lens.get(&read_lock(&self.state, "reading field value")?.model).clone())
    }

    pub fn field_meta<L>(&self, lens: L) -> FormResult<Option<FieldMeta<E>>>
    where
        L: super::validation::FieldLens<T>,
    {
        Ok(read_lock(&self.state, "reading field meta")?
            .field_meta
            .get(&lens.key())
            .cloned())
    }

    pub fn field_error<L>(&self, lens: L) -> FormResult<Option<E>>
    where
        L: super::validation::FieldLens<T>,
    {
        Ok(read_lock(&self.state, "reading field error")?
            .field_meta
            .get(&lens.key())
            .and_then(|meta| meta.errors.first().cloned()))
    }
}

pub(super) fn transition_submit_state<T, E>(
    state: &mut FormState<T, E>,
    next: SubmitState,
) -> FormResult<()> {
    let current = state.submit_state;
    if current == SubmitState::Pending && next == SubmitState::Pending {
        return Err(FormError::AlreadySubmitting);
    }
    if current == next {
        return Ok(());
    }

    let allowed = matches!(
        (current, next),
        (SubmitState::Idle, SubmitState::Pending)
            | (SubmitState::Pending, SubmitState::Succeeded)
            | (SubmitState::Pending, SubmitState::Failed)
            | (SubmitState::Succeeded, SubmitState::Idle)
            | (SubmitState::Failed, SubmitState::Idle)
    );
    if !allowed {
        return Err(FormError::InvalidStateTransition {
            from: current,
            to: next,
        });
    }
    state.submit_state = next;
    Ok(())
}

pub(super) fn read_lock<'a, T>(
    lock: &'a RwLock<T>,
    context: &'static str,
) -> FormResult<RwLockReadGuard<'a, T>> {
    lock.read().map_err(|_| FormError::StatePoisoned(context))
}

pub(super) fn write_lock<'a, T>(
    lock: &'a RwLock<T>,
    context: &'static str,
) -> FormResult<RwLockWriteGuard<'a, T>> {
    lock.write().map_err(|_| FormError::StatePoisoned(context))
}
