use calmstate::form::{FieldValue, FormFields};

#[derive(Clone, calmstate::form::FormFields)]
struct DemoForm {
    email: String,
    tags: Vec<String>,
}

fn main() {
    let keys = DemoForm::keys();
    assert_eq!(keys.email().as_str(), "email");
    assert_eq!(DemoForm::FIELDS.len(), 2);

    let model = DemoForm {
        email: "a@calm.ui".to_string(),
        tags: vec!["b".to_string()],
    };
    let initials = model.initial_values();
    assert_eq!(initials[0].1, FieldValue::Text("a@calm.ui".to_string()));
    assert_eq!(
        initials[1].1,
        FieldValue::List(vec!["b".to_string()])
    );
}
