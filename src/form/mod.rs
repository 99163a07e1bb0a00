mod controller;
mod submit;
mod validation;


pub use calmstate_form_derive::FormFields;
pub use controller::{
    FieldKey, FieldState, FieldValue, FormController, FormError, FormId, FormResult, FormSnapshot,
    FormValues, SubmitState, SubscriberId,
};
pub use submit::{
    BoxedSubmitFuture, SubmitError, SubmitFlight, SubmitFn, SubmitHandler, submit_fn,
};
pub use validation::{FieldValidator, FormFields, ValidationOutcome};
