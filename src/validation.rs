//! Input validation and sanitization module
//!
//! Centralized checks for user, catalog and order input. Every function
//! returns `ValidationResult`; callers lift the message into
//! `AppError::Validation` with `?` via the `From` impl below.

use serde_json::Value;

use crate::errors::AppError;

/// Validation result type
pub type ValidationResult = Result<(), ValidationError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError(pub String);

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Validation(err.0)
    }
}

fn fail(msg: impl Into<String>) -> ValidationResult {
    Err(ValidationError(msg.into()))
}

/// Validate a person's display name (1-100 characters after trimming)
pub fn validate_name(name: &str) -> ValidationResult {
    let trimmed = name.trim();

    if trimmed.is_empty() {
        return fail("Name cannot be empty");
    }

    if trimmed.chars().count() > 100 {
        return fail("Name must be at most 100 characters");
    }

    Ok(())
}

/// Validate email format
pub fn validate_email(email: &str) -> ValidationResult {
    let trimmed = email.trim();

    if trimmed.is_empty() {
        return fail("Email cannot be empty");
    }

    if trimmed.len() > 254 {
        return fail("Email is too long (max 254 characters)");
    }

    let Some((local, domain)) = trimmed.split_once('@') else {
        return fail("Email must contain '@'");
    };

    if local.is_empty() || local.len() > 64 || domain.contains('@') {
        return fail("Invalid email format");
    }

    if !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
        return fail("Invalid email domain");
    }

    Ok(())
}

/// Emails are compared case-insensitively; store them normalized.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Validate password strength
/// - Minimum length: `min_len`
/// - Must contain: a letter and a number
pub fn validate_password(password: &str, min_len: usize) -> ValidationResult {
    if password.is_empty() {
        return fail("Password cannot be empty");
    }

    if password.chars().count() < min_len {
        return fail(format!("Password must be at least {} characters", min_len));
    }

    // bcrypt only reads the first 72 bytes
    if password.len() > 72 {
        return fail("Password must be at most 72 bytes");
    }

    let has_letter = password.chars().any(|c| c.is_alphabetic());
    let has_digit = password.chars().any(|c| c.is_numeric());

    if !has_letter || !has_digit {
        return fail("Password must contain at least one letter and one number");
    }

    Ok(())
}

/// Validate monetary amount
pub fn validate_amount(amount: f64, field: &str) -> ValidationResult {
    if amount.is_nan() || amount.is_infinite() {
        return fail(format!("{} is not a valid amount", field));
    }

    if amount < 0.0 {
        return fail(format!("{} cannot be negative", field));
    }

    if amount > 1_000_000_000.0 {
        return fail(format!("{} is too large", field));
    }

    Ok(())
}

/// Validate stock count
pub fn validate_stock(stock: i64) -> ValidationResult {
    if stock < 0 {
        return fail("Stock cannot be negative");
    }

    if stock > 1_000_000_000 {
        return fail("Stock is too large");
    }

    Ok(())
}

/// Validate product name
pub fn validate_product_name(name: &str) -> ValidationResult {
    let trimmed = name.trim();

    if trimmed.is_empty() {
        return fail("Product name cannot be empty");
    }

    if trimmed.chars().count() > 200 {
        return fail("Product name must be at most 200 characters");
    }

    Ok(())
}

pub fn validate_category_name(name: &str) -> ValidationResult {
    let trimmed = name.trim();

    if trimmed.is_empty() {
        return fail("Category name cannot be empty");
    }

    if trimmed.chars().count() > 100 {
        return fail("Category name must be at most 100 characters");
    }

    Ok(())
}

/// Validate an uploaded product image
pub fn validate_image(mime_type: &str, size: usize, max_bytes: usize) -> ValidationResult {
    if !mime_type.starts_with("image/") {
        return fail("Image must be an image/* file");
    }

    if size == 0 {
        return fail("Image is empty");
    }

    if size > max_bytes {
        return fail(format!("Image must be at most {} bytes", max_bytes));
    }

    Ok(())
}

/// Sanitize string input (drop control characters, trim)
pub fn sanitize_string(input: &str) -> String {
    input.chars().filter(|c| !c.is_control()).collect::<String>().trim().to_string()
}

/// Largest quantity a single order line may carry.
pub const MAX_QUANTITY: i64 = 1_000_000;

/// Order item quantity: a positive integer, or 1 when omitted or invalid.
///
/// Accepts JSON numbers and numeric strings (form posts send strings).
/// Whole quantities above `MAX_QUANTITY` are rejected rather than defaulted.
pub fn normalize_quantity(raw: Option<&Value>) -> Result<i64, ValidationError> {
    let parsed = match raw {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    match parsed {
        Some(q) if q.is_finite() && q.fract() == 0.0 && q >= 1.0 => {
            if q > MAX_QUANTITY as f64 {
                return Err(ValidationError(format!(
                    "Quantity must be at most {}",
                    MAX_QUANTITY
                )));
            }
            Ok(q as i64)
        }
        _ => Ok(1),
    }
}

/// Round a currency amount to cents.
pub fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// `Σ price × quantity`, summed in integer cents.
pub fn line_total<I>(lines: I) -> Result<f64, ValidationError>
where
    I: IntoIterator<Item = (f64, i64)>,
{
    let overflow = || ValidationError("Order total is too large".to_string());

    let mut cents: i64 = 0;
    for (price, quantity) in lines {
        let line = ((price * 100.0).round() as i64)
            .checked_mul(quantity)
            .ok_or_else(overflow)?;
        cents = cents.checked_add(line).ok_or_else(overflow)?;
    }
    Ok(cents as f64 / 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn email_rules() {
        assert!(validate_email("ann@shop.test").is_ok());
        assert!(validate_email("").is_err());
        assert!(validate_email("ann.shop.test").is_err());
        assert!(validate_email("@shop.test").is_err());
        assert!(validate_email("ann@localhost").is_err());
        assert!(validate_email("a@b@c.test").is_err());
        assert_eq!(normalize_email("  Ann@Shop.Test "), "ann@shop.test");
    }

    #[test]
    fn password_rules() {
        assert!(validate_password("Admin123!", 8).is_ok());
        assert!(validate_password("short1", 8).is_err());
        assert!(validate_password("lettersonly", 8).is_err());
        assert!(validate_password("12345678", 8).is_err());
        assert!(validate_password(&"a1".repeat(40), 8).is_err());
    }

    #[test]
    fn amount_rules() {
        assert!(validate_amount(0.0, "Price").is_ok());
        assert!(validate_amount(19.99, "Price").is_ok());
        assert!(validate_amount(-0.01, "Price").is_err());
        assert!(validate_amount(f64::NAN, "Price").is_err());
        assert!(validate_stock(-1).is_err());
    }

    #[test]
    fn image_rules() {
        assert!(validate_image("image/png", 10, 100).is_ok());
        assert!(validate_image("text/plain", 10, 100).is_err());
        assert!(validate_image("image/png", 101, 100).is_err());
        assert!(validate_image("image/png", 0, 100).is_err());
    }

    #[test]
    fn quantity_defaults_to_one() {
        let q = |v: Option<&Value>| normalize_quantity(v).unwrap();
        assert_eq!(q(None), 1);
        assert_eq!(q(Some(&json!(3))), 3);
        assert_eq!(q(Some(&json!("4"))), 4);
        assert_eq!(q(Some(&json!(2.0))), 2);
        assert_eq!(q(Some(&json!(2.5))), 1);
        assert_eq!(q(Some(&json!(0))), 1);
        assert_eq!(q(Some(&json!(-3))), 1);
        assert_eq!(q(Some(&json!("many"))), 1);
        assert_eq!(q(Some(&json!("NaN"))), 1);
        assert_eq!(q(Some(&json!(null))), 1);
    }

    #[test]
    fn quantity_is_capped() {
        assert_eq!(normalize_quantity(Some(&json!(MAX_QUANTITY))), Ok(MAX_QUANTITY));
        assert!(normalize_quantity(Some(&json!(MAX_QUANTITY + 1))).is_err());
        assert!(normalize_quantity(Some(&json!(i64::MAX))).is_err());
        assert!(normalize_quantity(Some(&json!(u64::MAX))).is_err());
        assert!(normalize_quantity(Some(&json!(1e30))).is_err());
        assert!(normalize_quantity(Some(&json!("99999999999999999999"))).is_err());
    }

    #[test]
    fn totals_are_exact_in_cents() {
        assert_eq!(line_total([(19.99, 2)]), Ok(39.98));
        assert_eq!(line_total([(0.1, 1), (0.2, 1)]), Ok(0.3));
        assert_eq!(line_total(Vec::<(f64, i64)>::new()), Ok(0.0));
        assert_eq!(round_cents(10.005 + 0.0049), 10.01);
    }

    #[test]
    fn total_overflow_is_an_error() {
        assert!(line_total([(19.99, 500_000_000_000_000_000)]).is_err());
        assert!(line_total([(19.99, i64::MAX)]).is_err());
        let near_max = i64::MAX / 100_000_000_000;
        assert!(line_total([(1e9, near_max)]).is_ok());
        assert!(line_total([(1e9, near_max), (1e9, near_max)]).is_err());
        assert_eq!(line_total([(1e9, MAX_QUANTITY)]), Ok(1e15));
    }

    #[test]
    fn sanitize_strips_control_chars() {
        assert_eq!(sanitize_string("  Mug\u{0}\n "), "Mug");
    }
}
