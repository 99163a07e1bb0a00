use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use rust_decimal::Decimal;

use super::submit::SubmitHandler;
use super::validation::{FieldValidator, FormFields, ValidationOutcome};

static FORM_ID_ALLOCATOR: AtomicU64 = AtomicU64::new(1);

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct FormId(pub u64);

impl FormId {
    pub fn next() -> Self {
        Self(FORM_ID_ALLOCATOR.fetch_add(1, Ordering::SeqCst))
    }
}

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

#[derive(Clone, Debug, Default, PartialEq)]
pub enum FieldValue {
    Text(String),
    List(Vec<String>),
    Number(Decimal),
    #[default]
    Absent,
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Self::List(values) => Some(values),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<Decimal> {
        match self {
            Self::Number(value) => Some(*value),
            _ => None,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(values: Vec<String>) -> Self {
        Self::List(values)
    }
}

impl From<Decimal> for FieldValue {
    fn from(value: Decimal) -> Self {
        Self::Number(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Number(Decimal::from(value))
    }
}

impl<T> From<Option<T>> for FieldValue
where
    T: Into<FieldValue>,
{
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Self::Absent)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FieldState {
    pub value: FieldValue,
    pub dirty: bool,
    pub is_valid: bool,
    pub has_error: bool,
    pub error_message: String,
}

impl FieldState {
    fn initial(value: FieldValue) -> Self {
        Self {
            value,
            dirty: false,
            is_valid: false,
            has_error: false,
            error_message: String::new(),
        }
    }

    fn reset_to(&mut self, value: FieldValue) {
        self.value = value;
        self.dirty = false;
        self.is_valid = false;
        self.has_error = false;
        self.error_message.clear();
    }
}

#[derive(Clone, Debug)]
pub struct FormValues {
    order: Arc<[FieldKey]>,
    fields: BTreeMap<FieldKey, FieldState>,
}

impl FormValues {
    pub fn get(&self, key: FieldKey) -> Option<&FieldState> {
        self.fields.get(&key)
    }

    pub fn value(&self, key: FieldKey) -> Option<&FieldValue> {
        self.fields.get(&key).map(|field| &field.value)
    }

    pub fn keys(&self) -> impl Iterator<Item = FieldKey> + '_ {
        self.order.iter().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (FieldKey, &FieldState)> + '_ {
        self.order.iter().filter_map(|key| {
            self.fields.get(key).map(|field| (*key, field))
        })
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SubmitState {
    Idle,
    Pending,
    Succeeded,
    Failed,
}

impl SubmitState {
    pub fn is_pending(self) -> bool {
        self == Self::Pending
    }
}

#[derive(Clone, Debug)]
pub struct FormSnapshot {
    pub values: FormValues,
    pub can_submit: bool,
    pub dirty: bool,
    pub pending: bool,
    pub has_submit_error: bool,
    pub submit_error_message: String,
    pub submit_state: SubmitState,
    pub submit_count: u32,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum FormError {
    StatePoisoned(&'static str),
    InvalidStateTransition { from: SubmitState, to: SubmitState },
    EmptyFieldList,
    DuplicateField(FieldKey),
    UnknownField(FieldKey),
}

impl Display for FormError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            FormError::StatePoisoned(context) => {
                write!(f, "form state lock poisoned while {context}")
            }
            FormError::InvalidStateTransition { from, to } => {
                write!(f, "invalid submit state transition: {from:?} -> {to:?}")
            }
            FormError::EmptyFieldList => f.write_str("form requires at least one declared field"),
            FormError::DuplicateField(key) => write!(f, "field {key} declared more than once"),
            FormError::UnknownField(key) => write!(f, "field {key} is not declared on this form"),
        }
    }
}

impl std::error::Error for FormError {}

pub type FormResult<T> = Result<T, FormError>;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct SubscriberId(u64);

type SnapshotSubscriber = Arc<dyn Fn(&FormSnapshot) + Send + Sync>;

pub(super) struct FormState {
    pub(super) id: FormId,
    pub(super) order: Arc<[FieldKey]>,
    pub(super) initial: BTreeMap<FieldKey, FieldValue>,
    pub(super) fields: BTreeMap<FieldKey, FieldState>,
    pub(super) can_submit: bool,
    pub(super) dirty: bool,
    pub(super) submit_state: SubmitState,
    pub(super) submit_count: u32,
    pub(super) submit_error: Option<String>,
}

impl FormState {
    pub(super) fn values(&self) -> FormValues {
        FormValues {
            order: self.order.clone(),
            fields: self.fields.clone(),
        }
    }

    pub(super) fn recompute_can_submit(&mut self) {
        self.can_submit = self.fields.values().all(|field| field.is_valid);
    }
}

#[derive(Clone)]
pub struct FormController {
    pub(super) state: Arc<RwLock<FormState>>,
    pub(super) validator: Arc<dyn FieldValidator>,
    pub(super) on_submit: Arc<dyn SubmitHandler>,
    subscribers: Arc<RwLock<BTreeMap<SubscriberId, SnapshotSubscriber>>>,
    subscriber_ids: Arc<AtomicU64>,
}

impl FormController {
    pub fn new(
        fields: Vec<(FieldKey, FieldValue)>,
        validator: impl FieldValidator + 'static,
        on_submit: impl SubmitHandler + 'static,
    ) -> FormResult<Self> {
        if fields.is_empty() {
            return Err(FormError::EmptyFieldList);
        }

        let order: Arc<[FieldKey]> = fields.iter().map(|(key, _)| *key).collect();
        let mut initial = BTreeMap::new();
        let mut states = BTreeMap::new();
        for (key, value) in fields {
            if initial.insert(key, value.clone()).is_some() {
                return Err(FormError::DuplicateField(key));
            }
            states.insert(key, FieldState::initial(value));
        }

        Ok(Self {
            state: Arc::new(RwLock::new(FormState {
                id: FormId::next(),
                order,
                initial,
                fields: states,
                can_submit: false,
                dirty: false,
                submit_state: SubmitState::Idle,
                submit_count: 0,
                submit_error: None,
            })),
            validator: Arc::new(validator),
            on_submit: Arc::new(on_submit),
            subscribers: Arc::new(RwLock::new(BTreeMap::new())),
            subscriber_ids: Arc::new(AtomicU64::new(1)),
        })
    }

    pub fn from_model<M>(
        model: M,
        validator: impl FieldValidator + 'static,
        on_submit: impl SubmitHandler + 'static,
    ) -> FormResult<Self>
    where
        M: FormFields,
    {
        Self::new(model.initial_values(), validator, on_submit)
    }

    pub fn form_id(&self) -> FormResult<FormId> {
        Ok(read_lock(&self.state, "reading form id")?.id)
    }

    pub fn field_keys(&self) -> FormResult<Arc<[FieldKey]>> {
        Ok(read_lock(&self.state, "reading field keys")?.order.clone())
    }

    pub fn snapshot(&self) -> FormResult<FormSnapshot> {
        let state = read_lock(&self.state, "creating form snapshot")?;
        Ok(FormSnapshot {
            values: state.values(),
            can_submit: state.can_submit,
            dirty: state.dirty,
            pending: state.submit_state.is_pending(),
            has_submit_error: state.submit_error.is_some(),
            submit_error_message: state.submit_error.clone().unwrap_or_default(),
            submit_state: state.submit_state,
            submit_count: state.submit_count,
        })
    }

    pub fn field(&self, key: FieldKey) -> FormResult<Option<FieldState>> {
        Ok(read_lock(&self.state, "reading field state")?
            .fields
            .get(&key)
            .cloned())
    }

    pub fn validate_and_update_field(
        &self,
        key: FieldKey,
        value: FieldValue,
        invalid_is_error: bool,
    ) -> FormResult<ValidationOutcome> {
        let current = {
            let state = read_lock(&self.state, "reading values for validation")?;
            if !state.fields.contains_key(&key) {
                return Err(FormError::UnknownField(key));
            }
            state.values()
        };

        let outcome = self
            .validator
            .validate(key, &value, invalid_is_error, &current);

        {
            let mut state = write_lock(&self.state, "committing field update")?;
            let field = state
                .fields
                .get_mut(&key)
                .ok_or(FormError::UnknownField(key))?;
            if outcome.can_update {
                field.value = outcome.value.clone();
                field.is_valid = outcome.is_valid;
            }
            field.dirty = true;
            // Error message always carries the latest outcome, even when the
            // value itself was rejected.
            field.has_error = outcome.has_error || (invalid_is_error && !field.is_valid);
            field.error_message = outcome.error.clone();
            state.dirty = true;
            state.recompute_can_submit();
        }
        self.notify_subscribers()?;

        Ok(outcome)
    }

    pub fn handle_input_change(
        &self,
        key: FieldKey,
        value: impl Into<FieldValue>,
    ) -> FormResult<()> {
        {
            let state = read_lock(&self.state, "checking pending before input change")?;
            if state.submit_state.is_pending() {
                log::debug!("form {}: input change for {key} ignored while pending", state.id.0);
                return Ok(());
            }
        }
        self.validate_and_update_field(key, value.into(), false)?;
        Ok(())
    }

    pub fn set_value(&self, key: FieldKey, value: impl Into<FieldValue>) -> FormResult<()> {
        self.handle_input_change(key, value)
    }

    pub fn reset_to_initial(&self) -> FormResult<()> {
        {
            let mut state = write_lock(&self.state, "resetting form")?;
            let initial = state.initial.clone();
            for (key, value) in initial {
                if let Some(field) = state.fields.get_mut(&key) {
                    field.reset_to(value);
                }
            }
            state.can_submit = false;
            state.dirty = false;
            state.submit_state = SubmitState::Idle;
            state.submit_error = None;
        }
        self.notify_subscribers()
    }

    pub fn subscribe(
        &self,
        subscriber: impl Fn(&FormSnapshot) + Send + Sync + 'static,
    ) -> FormResult<SubscriberId> {
        let id = SubscriberId(self.subscriber_ids.fetch_add(1, Ordering::SeqCst));
        let mut subscribers = write_lock(&self.subscribers, "registering form subscriber")?;
        subscribers.insert(id, Arc::new(subscriber));
        Ok(id)
    }

    pub fn unsubscribe(&self, id: SubscriberId) -> FormResult<()> {
        let mut subscribers = write_lock(&self.subscribers, "removing form subscriber")?;
        subscribers.remove(&id);
        Ok(())
    }

    pub(super) fn notify_subscribers(&self) -> FormResult<()> {
        let subscribers = read_lock(&self.subscribers, "reading form subscribers")?
            .values()
            .cloned()
            .collect::<Vec<_>>();
        if subscribers.is_empty() {
            return Ok(());
        }
        let snapshot = self.snapshot()?;
        for subscriber in subscribers {
            subscriber(&snapshot);
        }
        Ok(())
    }
}

pub(super) fn transition_submit_state(
    state: &mut FormState,
    next: SubmitState,
) -> FormResult<()> {
    let current = state.submit_state;
    if current == next {
        return Ok(());
    }

    let allowed = matches!(
        (current, next),
        (SubmitState::Idle, SubmitState::Pending)
            | (SubmitState::Succeeded, SubmitState::Pending)
            | (SubmitState::Failed, SubmitState::Pending)
            | (SubmitState::Pending, SubmitState::Succeeded)
            | (SubmitState::Pending, SubmitState::Failed)
            | (_, SubmitState::Idle)
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
