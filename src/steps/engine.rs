use std::collections::BTreeMap;
use std::fmt::{Debug, Display, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

pub struct Transition<S, C> {
    pub from: S,
    pub to: S,
    guard: Arc<dyn Fn(&C) -> bool + Send + Sync>,
}

impl<S, C> Transition<S, C> {
    pub fn new(from: S, to: S, guard: impl Fn(&C) -> bool + Send + Sync + 'static) -> Self {
        Self {
            from,
            to,
            guard: Arc::new(guard),
        }
    }

    // Guards are caller-owned predicates; a panicking guard propagates.
    pub(super) fn guard_passes(&self, context: &C) -> bool {
        (self.guard)(context)
    }
}

impl<S: Clone, C> Clone for Transition<S, C> {
    fn clone(&self) -> Self {
        Self {
            from: self.from.clone(),
            to: self.to.clone(),
            guard: self.guard.clone(),
        }
    }
}

impl<S: Debug, C> Debug for Transition<S, C> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transition")
            .field("from", &self.from)
            .field("to", &self.to)
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum StepError {
    StatePoisoned(&'static str),
    NoSteps,
    DuplicateStep(String),
    UnknownStep(String),
}

impl Display for StepError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StepError::StatePoisoned(context) => {
                write!(f, "step state lock poisoned while {context}")
            }
            StepError::NoSteps => f.write_str("step engine requires at least one declared step"),
            StepError::DuplicateStep(step) => write!(f, "step {step} declared more than once"),
            StepError::UnknownStep(step) => write!(f, "step {step} is not declared"),
        }
    }
}

impl std::error::Error for StepError {}

pub type StepResult<T> = Result<T, StepError>;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct SubscriberId(u64);

type StepSubscriber<S> = Arc<dyn Fn(&S) + Send + Sync>;

pub struct StepEngine<S, C, V> {
    current: Arc<RwLock<S>>,
    transitions: Arc<[Transition<S, C>]>,
    views: Arc<BTreeMap<S, V>>,
    subscribers: Arc<RwLock<BTreeMap<SubscriberId, StepSubscriber<S>>>>,
    subscriber_ids: Arc<AtomicU64>,
}

impl<S, C, V> Clone for StepEngine<S, C, V> {
    fn clone(&self) -> Self {
        Self {
            current: self.current.clone(),
            transitions: self.transitions.clone(),
            views: self.views.clone(),
            subscribers: self.subscribers.clone(),
            subscriber_ids: self.subscriber_ids.clone(),
        }
    }
}

impl<S, C, V> StepEngine<S, C, V>
where
    S: Clone + Ord + Debug + Send + Sync + 'static,
{
    pub fn new(
        initial: S,
        transitions: Vec<Transition<S, C>>,
        views: Vec<(S, V)>,
    ) -> StepResult<Self> {
        if views.is_empty() {
            return Err(StepError::NoSteps);
        }

        let mut table = BTreeMap::new();
        for (step, view) in views {
            if table.insert(step.clone(), view).is_some() {
                return Err(StepError::DuplicateStep(format!("{step:?}")));
            }
        }
        if !table.contains_key(&initial) {
            return Err(StepError::UnknownStep(format!("{initial:?}")));
        }
        for transition in &transitions {
            if !table.contains_key(&transition.from) {
                return Err(StepError::UnknownStep(format!("{:?}", transition.from)));
            }
            if !table.contains_key(&transition.to) {
                return Err(StepError::UnknownStep(format!("{:?}", transition.to)));
            }
        }

        Ok(Self {
            current: Arc::new(RwLock::new(initial)),
            transitions: transitions.into(),
            views: Arc::new(table),
            subscribers: Arc::new(RwLock::new(BTreeMap::new())),
            subscriber_ids: Arc::new(AtomicU64::new(1)),
        })
    }

    pub fn current_step(&self) -> StepResult<S> {
        Ok(read_lock(&self.current, "reading current step")?.clone())
    }

    pub fn current_view(&self) -> StepResult<&V> {
        let step = self.current_step()?;
        self.views
            .get(&step)
            .ok_or_else(|| StepError::UnknownStep(format!("{step:?}")))
    }

    pub fn transition_to(&self, next: S, context: &C) -> StepResult<bool> {
        let current = self.current_step()?;
        let permitted = self
            .transitions
            .iter()
            .filter(|transition| transition.from == current && transition.to == next)
            .any(|transition| transition.guard_passes(context));

        if !permitted {
            log::debug!("step transition denied: {current:?} -> {next:?}");
            return Ok(false);
        }

        {
            let mut step = write_lock(&self.current, "committing step transition")?;
            *step = next.clone();
        }
        log::debug!("step transition: {current:?} -> {next:?}");
        self.notify_subscribers(&next)?;
        Ok(true)
    }

    pub fn subscribe(
        &self,
        subscriber: impl Fn(&S) + Send + Sync + 'static,
    ) -> StepResult<SubscriberId> {
        let id = SubscriberId(self.subscriber_ids.fetch_add(1, Ordering::SeqCst));
        let mut subscribers = write_lock(&self.subscribers, "registering step subscriber")?;
        subscribers.insert(id, Arc::new(subscriber));
        Ok(id)
    }

    pub fn unsubscribe(&self, id: SubscriberId) -> StepResult<()> {
        let mut subscribers = write_lock(&self.subscribers, "removing step subscriber")?;
        subscribers.remove(&id);
        Ok(())
    }

    fn notify_subscribers(&self, step: &S) -> StepResult<()> {
        let subscribers = read_lock(&self.subscribers, "reading step subscribers")?
            .values()
            .cloned()
            .collect::<Vec<_>>();
        for subscriber in subscribers {
            subscriber(step);
        }
        Ok(())
    }
}

fn read_lock<'a, T>(
    lock: &'a RwLock<T>,
    context: &'static str,
) -> StepResult<RwLockReadGuard<'a, T>> {
    lock.read().map_err(|_| StepError::StatePoisoned(context))
}

fn write_lock<'a, T>(
    lock: &'a RwLock<T>,
    context: &'static str,
) -> StepResult<RwLockWriteGuard<'a, T>> {
    lock.write().map_err(|_| StepError::StatePoisoned(context))
}
