//! Property-based tests for request validation.
//!
//! These use proptest to check the validation rules across a wide
//! range of inputs rather than a handful of hand-picked cases.

use marketplace_api::entities::order::PaymentMethod;
use marketplace_api::entities::user::Role;
use marketplace_api::services::cart::{AddToCartInput, UpdateCartItemInput};
use marketplace_api::services::checkout::PlaceOrderInput;
use marketplace_api::services::users::RegisterInput;
use proptest::prelude::*;
use uuid::Uuid;
use validator::Validate;

fn cod_order(shipping_address: &str, phone: &str) -> PlaceOrderInput {
    PlaceOrderInput {
        shipping_address: shipping_address.to_string(),
        phone: phone.to_string(),
        payment_method: PaymentMethod::Cod,
        payment_proof: None,
        notes: None,
    }
}

fn register_input(name: &str, email: &str, password: &str) -> RegisterInput {
    RegisterInput {
        name: name.to_string(),
        email: email.to_string(),
        password: password.to_string(),
        role: Role::Buyer,
    }
}

fn email_strategy() -> impl Strategy<Value = String> {
    (
        "[a-z]{3,10}",
        "[a-z]{3,8}",
        prop_oneof!["com", "org", "net", "io"],
    )
        .prop_map(|(local, domain, tld)| format!("{}@{}.{}", local, domain, tld))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn phones_up_to_twenty_characters_pass(phone in "[0-9]{1,20}") {
        let input = cod_order("1 Test Lane", &phone);
        prop_assert!(input.validate().is_ok(), "phone rejected: {}", phone);
    }

    #[test]
    fn overlong_phones_fail(phone in "[0-9]{21,60}") {
        let input = cod_order("1 Test Lane", &phone);
        prop_assert!(input.validate().is_err(), "overlong phone accepted: {}", phone);
    }

    #[test]
    fn blank_shipping_address_fails(phone in "[0-9]{1,20}") {
        let input = cod_order("", &phone);
        prop_assert!(input.validate().is_err(), "empty address accepted");
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn generated_emails_pass_registration(email in email_strategy()) {
        let input = register_input("Jess", &email, "password123");
        prop_assert!(input.validate().is_ok(), "email rejected: {}", email);
    }

    #[test]
    fn emails_without_at_symbol_fail(email in "[a-z0-9.]{5,30}") {
        prop_assume!(!email.contains('@'));
        let input = register_input("Jess", &email, "password123");
        prop_assert!(input.validate().is_err(), "email accepted: {}", email);
    }

    #[test]
    fn short_passwords_fail(password in "[a-zA-Z0-9]{0,7}", email in email_strategy()) {
        let input = register_input("Jess", &email, &password);
        prop_assert!(input.validate().is_err(), "short password accepted: {}", password);
    }

    #[test]
    fn passwords_of_eight_or_more_pass(password in "[a-zA-Z0-9]{8,64}", email in email_strategy()) {
        let input = register_input("Jess", &email, &password);
        prop_assert!(input.validate().is_ok(), "password rejected: {}", password);
    }
}

proptest! {
    #[test]
    fn positive_quantities_are_valid(quantity in 1i32..1_000_000) {
        let add = AddToCartInput { product_id: Uuid::new_v4(), quantity };
        prop_assert!(add.validate().is_ok());
        let update = UpdateCartItemInput { quantity };
        prop_assert!(update.validate().is_ok());
    }

    #[test]
    fn non_positive_quantities_are_invalid(quantity in -1_000_000i32..=0) {
        let add = AddToCartInput { product_id: Uuid::new_v4(), quantity };
        prop_assert!(add.validate().is_err());
        let update = UpdateCartItemInput { quantity };
        prop_assert!(update.validate().is_err());
    }
}
