use super::controller::{FieldKey, FieldValue, FormValues};

#[derive(Clone, Debug, PartialEq)]
pub struct ValidationOutcome {
    pub error: String,
    pub has_error: bool,
    pub is_valid: bool,
    pub can_update: bool,
    pub value: FieldValue,
}

impl ValidationOutcome {
    pub fn accept(value: impl Into<FieldValue>) -> Self {
        Self {
            error: String::new(),
            has_error: false,
            is_valid: true,
            can_update: true,
            value: value.into(),
        }
    }

    // Not yet valid, but nothing to surface while the user is still typing.
    pub fn invalid(value: impl Into<FieldValue>) -> Self {
        Self {
            error: String::new(),
            has_error: false,
            is_valid: false,
            can_update: true,
            value: value.into(),
        }
    }

    pub fn error(value: impl Into<FieldValue>, message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
            has_error: true,
            is_valid: false,
            can_update: true,
            value: value.into(),
        }
    }

    // Veto the change entirely; the previous value and validity are retained
    // while the message still reaches the field.
    pub fn reject(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
            has_error: true,
            is_valid: false,
            can_update: false,
            value: FieldValue::Absent,
        }
    }
}

pub trait FieldValidator: Send + Sync {
    fn validate(
        &self,
        key: FieldKey,
        proposed: &FieldValue,
        submit_attempt: bool,
        values: &FormValues,
    ) -> ValidationOutcome;
}

impl<F> FieldValidator for F
where
    F: Fn(FieldKey, &FieldValue, bool, &FormValues) -> ValidationOutcome + Send + Sync,
{
    fn validate(
        &self,
        key: FieldKey,
        proposed: &FieldValue,
        submit_attempt: bool,
        values: &FormValues,
    ) -> ValidationOutcome {
        (self)(key, proposed, submit_attempt, values)
    }
}

pub trait FormFields {
    type Keys;

    const FIELDS: &'static [FieldKey];

    fn keys() -> Self::Keys;

    fn initial_values(self) -> Vec<(FieldKey, FieldValue)>;
}
