//! Field rules shared by the account, category and product services.

use crate::error::FieldErrors;
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;

static EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles"));
static USERNAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_]+$").expect("username pattern compiles"));

pub const MIN_USERNAME_LEN: usize = 3;
pub const MIN_NAME_LEN: usize = 2;
pub const MIN_PASSWORD_LEN: usize = 6;
pub const MIN_PRODUCT_NAME_LEN: usize = 2;
pub const MIN_DESCRIPTION_LEN: usize = 10;

/// Trimmed text with a minimum length; records `"<Label> is required"` when blank
pub fn text(
    errors: &mut FieldErrors,
    field: &'static str,
    label: &str,
    value: &str,
    min_len: usize,
) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        errors.add(field, format!("{label} is required"));
    } else if trimmed.chars().count() < min_len {
        errors.add(
            field,
            format!("{label} must be at least {min_len} characters long"),
        );
    }
    trimmed.to_string()
}

pub fn username(errors: &mut FieldErrors, value: &str) -> String {
    let value = text(errors, "username", "Username", value, MIN_USERNAME_LEN);
    if !value.is_empty() && !USERNAME.is_match(&value) {
        errors.add(
            "username",
            "Username can only contain letters, numbers and underscores",
        );
    }
    value
}

pub fn email(errors: &mut FieldErrors, value: &str) -> String {
    let value = text(errors, "email", "Email", value, 1);
    if !value.is_empty() && !EMAIL.is_match(&value) {
        errors.add("email", "Invalid email format");
    }
    value
}

pub fn password(errors: &mut FieldErrors, value: &str) {
    if value.is_empty() {
        errors.add("password", "Password is required");
    } else if value.chars().count() < MIN_PASSWORD_LEN {
        errors.add(
            "password",
            format!("Password must be at least {MIN_PASSWORD_LEN} characters long"),
        );
    }
}

pub fn price(errors: &mut FieldErrors, value: Decimal) {
    if value <= Decimal::ZERO {
        errors.add("price", "Price must be a positive number");
    }
}
