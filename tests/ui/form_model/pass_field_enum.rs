use storefront_checkout::form::{FieldLens, FormModel};

#[derive(Clone, storefront_checkout::form::FormModel)]
#[form_model(field_enum = LoginField)]
struct LoginForm {
    user_name: String,
    password: String,
}

fn main() {
    let mut model = LoginForm {
        user_name: String::new(),
        password: String::new(),
    };
    for field in LoginField::ALL {
        field.set(&mut model, field.as_str().to_uppercase());
    }
    assert_eq!(model.user_name, "USER_NAME");
    assert_eq!("password".parse::<LoginField>().ok(), Some(LoginField::Password));
    assert_eq!(LoginField::UserName.key(), LoginForm::fields().user_name().key());
    assert_eq!(LoginField::Password.to_string(), "password");
}
