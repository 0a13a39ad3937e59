use appng_binding::{
    BindRegistry, Constraint, ConstraintRule, ConstraintValidator, PropertyDescriptor, PropertyKind,
    TypeDescriptor, ValidationProvider, convert_field_value,
};
use appng_schema::{FieldDef, FieldType};
use domain::Value;
use std::sync::Arc;

fn registry() -> Arc<BindRegistry> {
    Arc::new(
        BindRegistry::new()
            .with_type(
                TypeDescriptor::new("Person")
                    .property(PropertyDescriptor::new("name", PropertyKind::Text))
                    .property(PropertyDescriptor::new("age", PropertyKind::Int))
                    .property(
                        PropertyDescriptor::new("active", PropertyKind::Bool)
                            .with_default(Value::Bool(true)),
                    )
                    .constraint(Constraint::new("age", ConstraintRule::Min(18))),
            )
            .with_group("Strict"),
    )
}

#[test]
fn form_values_fill_and_validate_bean() {
    let registry = registry();
    let mut person = registry.new_instance("Person").expect("person");
    assert_eq!(person.get("active"), Some(&Value::Bool(true)));

    let age = FieldDef::new("age", FieldType::Int);
    let value = convert_field_value(&age, &["16".to_string()]).expect("convert");
    registry
        .set_property(&mut person, age.binding_path(), value)
        .expect("set age");

    let validator = ConstraintValidator::new(Arc::clone(&registry));
    let violations = validator.validate_field(&person, &age, &[]);
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].field.as_deref(), Some("age"));
    assert!(registry.has_group("Strict"));
}

#[test]
fn unknown_property_is_an_error() {
    let registry = registry();
    let mut person = registry.new_instance("Person").expect("person");
    assert!(
        registry
            .set_property(&mut person, "email", Value::from("a@b.c"))
            .is_err()
    );
}
