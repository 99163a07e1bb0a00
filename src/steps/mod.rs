mod engine;

#[cfg(test)]
mod tests;

pub use engine::{StepEngine, StepError, StepResult, SubscriberId, Transition};
