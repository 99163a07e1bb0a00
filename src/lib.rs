pub mod form;
pub mod steps;

pub use form::{FormController, FormSnapshot};
pub use steps::StepEngine;
