use storefront_checkout::form::{FieldLens, FormModel};

#[derive(Clone, storefront_checkout::form::FormModel)]
struct DemoForm {
    email: String,
    accepts_marketing: bool,
}

fn main() {
    let fields = DemoForm::fields();
    let lens = fields.email();
    let mut model = DemoForm {
        email: "a@loja.com.br".to_string(),
        accepts_marketing: false,
    };
    lens.set(&mut model, "b@loja.com.br".to_string());
    fields.accepts_marketing().set(&mut model, true);
    assert_eq!(lens.key().as_str(), "email");
    assert_eq!(lens.get(&model), "b@loja.com.br");
    assert!(model.accepts_marketing);
    assert_eq!(DemoForm::FIELD_KEYS.len(), 2);
}
