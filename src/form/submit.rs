use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use super::controller::{
    FieldKey, FormController, FormResult, FormValues, SubmitState, read_lock,
    transition_submit_state, write_lock,
};

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SubmitError {
    message: String,
}

impl SubmitError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for SubmitError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.message.is_empty() {
            f.write_str("submit failed")
        } else {
            f.write_str(&self.message)
        }
    }
}

impl std::error::Error for SubmitError {}

impl From<String> for SubmitError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for SubmitError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

pub type BoxedSubmitFuture = Pin<Box<dyn Future<Output = Result<(), SubmitError>> + Send>>;

pub trait SubmitHandler: Send + Sync {
    fn submit(&self, values: FormValues) -> BoxedSubmitFuture;
}

impl<F> SubmitHandler for F
where
    F: Fn(FormValues) -> BoxedSubmitFuture + Send + Sync,
{
    fn submit(&self, values: FormValues) -> BoxedSubmitFuture {
        (self)(values)
    }
}

pub struct SubmitFn<F>(F);

impl<F> SubmitHandler for SubmitFn<F>
where
    F: Fn(&FormValues) -> Result<(), SubmitError> + Send + Sync,
{
    fn submit(&self, values: FormValues) -> BoxedSubmitFuture {
        let result = (self.0)(&values);
        Box::pin(std::future::ready(result))
    }
}

pub fn submit_fn<F>(handler: F) -> SubmitFn<F>
where
    F: Fn(&FormValues) -> Result<(), SubmitError> + Send + Sync,
{
    SubmitFn(handler)
}

// The flight is lazy: `pending` is already committed when `handle_submit`
// returns, and the handler only runs once the rendering layer polls it.
pub struct SubmitFlight {
    inner: Pin<Box<dyn Future<Output = FormResult<()>> + Send>>,
}

impl Future for SubmitFlight {
    type Output = FormResult<()>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.inner.as_mut().poll(cx)
    }
}

impl FormController {
    pub fn handle_submit(&self) -> FormResult<Option<SubmitFlight>> {
        let keys: Vec<FieldKey> = {
            let state = read_lock(&self.state, "checking submit eligibility")?;
            if state.submit_state.is_pending() {
                log::debug!("form {}: submit ignored while pending", state.id.0);
                return Ok(None);
            }
            state.order.iter().copied().collect()
        };

        let mut saw_error = false;
        for key in keys {
            let value = {
                let state = read_lock(&self.state, "reading field for submit validation")?;
                state
                    .fields
                    .get(&key)
                    .map(|field| field.value.clone())
                    .unwrap_or_default()
            };
            let outcome = self.validate_and_update_field(key, value, true)?;
            if outcome.has_error || !outcome.is_valid {
                saw_error = true;
            }
        }

        let values = {
            let mut state = write_lock(&self.state, "entering submit")?;
            state.recompute_can_submit();
            if !state.can_submit {
                log::debug!("form {}: submit aborted, form is not valid", state.id.0);
                return Ok(None);
            }
            if saw_error {
                log::debug!("form {}: submit aborted, validation reported errors", state.id.0);
                return Ok(None);
            }
            transition_submit_state(&mut state, SubmitState::Pending)?;
            state.submit_count = state.submit_count.saturating_add(1);
            log::debug!("form {}: submit {} started", state.id.0, state.submit_count);
            state.values()
        };
        self.notify_subscribers()?;

        let controller = self.clone();
        let handler = self.on_submit.clone();
        Ok(Some(SubmitFlight {
            inner: Box::pin(async move {
                let result = handler.submit(values).await;
                controller.finish_submit(result)
            }),
        }))
    }

    fn finish_submit(&self, result: Result<(), SubmitError>) -> FormResult<()> {
        {
            let mut state = write_lock(&self.state, "completing submit")?;
            match &result {
                Ok(()) => {
                    transition_submit_state(&mut state, SubmitState::Succeeded)?;
                    state.submit_error = None;
                    log::debug!("form {}: submit succeeded", state.id.0);
                }
                Err(error) => {
                    transition_submit_state(&mut state, SubmitState::Failed)?;
                    state.submit_error = Some(error.message().to_string());
                    log::warn!("form {}: submit failed: {error}", state.id.0);
                }
            }
        }
        self.notify_subscribers()
    }
}
