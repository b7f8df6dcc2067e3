//! Request input validation.
//!
//! Pure checks over untrusted input, run before any store is touched.
//! Failures map to 400 with a message naming the offending field.

use crate::error::ApiError;

/// Digits required after the `+` in an international phone number.
pub const PHONE_MIN_DIGITS: usize = 8;
pub const PHONE_MAX_DIGITS: usize = 15;

const MAX_EMAIL_LENGTH: usize = 254;
const MAX_USER_ID_LENGTH: usize = 128;
const MAX_PATTERN_LENGTH: usize = 8192;

/// Accepts `+` followed by 8 to 15 digits, nothing else.
pub fn validate_phone(phone: &str) -> Result<(), ApiError> {
    let digits = phone
        .strip_prefix('+')
        .ok_or_else(|| ApiError::bad_request("Phone number must start with '+'"))?;

    if !(PHONE_MIN_DIGITS..=PHONE_MAX_DIGITS).contains(&digits.len())
        || !digits.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(ApiError::bad_request(format!(
            "Phone number must be '+' followed by {PHONE_MIN_DIGITS} to {PHONE_MAX_DIGITS} digits"
        )));
    }

    Ok(())
}

/// Shape check only. The OTP round trip is the real proof the address is
/// reachable, so this stays deliberately loose.
pub fn validate_email(email: &str) -> Result<(), ApiError> {
    let email = email.trim();
    if email.is_empty() {
        return Err(ApiError::bad_request("Email is required"));
    }
    if email.len() > MAX_EMAIL_LENGTH {
        return Err(ApiError::bad_request(format!(
            "Email must be at most {MAX_EMAIL_LENGTH} characters"
        )));
    }

    let well_formed = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    };

    if !well_formed {
        return Err(ApiError::bad_request("Email address is not valid"));
    }
    Ok(())
}

/// Account identifiers are embedded in vendor URL paths and store keys, so
/// they must be short, printable and slash-free.
pub fn validate_user_id(user_id: &str) -> Result<(), ApiError> {
    let user_id = user_id.trim();
    if user_id.is_empty() {
        return Err(ApiError::bad_request("User id is required"));
    }
    if user_id.len() > MAX_USER_ID_LENGTH {
        return Err(ApiError::bad_request(format!(
            "User id must be at most {MAX_USER_ID_LENGTH} characters"
        )));
    }
    if user_id.contains(char::is_whitespace) || user_id.contains('/') {
        return Err(ApiError::bad_request(
            "User id must not contain whitespace or '/'",
        ));
    }
    Ok(())
}

/// Typing patterns are opaque vendor blobs; bound their size and require
/// printable ASCII, which is all the recorder emits.
pub fn validate_typing_pattern(pattern: &str) -> Result<(), ApiError> {
    if pattern.is_empty() {
        return Err(ApiError::bad_request("Typing pattern is required"));
    }
    if pattern.len() > MAX_PATTERN_LENGTH {
        return Err(ApiError::bad_request(format!(
            "Typing pattern must be at most {MAX_PATTERN_LENGTH} bytes"
        )));
    }
    if !pattern.bytes().all(|b| (0x20..0x7f).contains(&b)) {
        return Err(ApiError::bad_request(
            "Typing pattern contains unexpected characters",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_phones_pass() {
        assert!(validate_phone("+12345678").is_ok()); // 8 digits, lower bound
        assert!(validate_phone("+123456789").is_ok());
        assert!(validate_phone("+14155550123").is_ok());
        assert!(validate_phone("+123456789012345").is_ok()); // 15 digits, upper bound
    }

    #[test]
    fn short_and_long_phones_fail() {
        assert!(validate_phone("+1234567").is_err()); // 7 digits
        assert!(validate_phone("+1234567890123456").is_err()); // 16 digits
    }

    #[test]
    fn malformed_phones_fail() {
        assert!(validate_phone("").is_err());
        assert!(validate_phone("14155550123").is_err()); // missing '+'
        assert!(validate_phone("+1415555O123").is_err()); // letter O
        assert!(validate_phone("+1 415 555 0123").is_err()); // spaces
        assert!(validate_phone("++14155550123").is_err());
    }

    #[test]
    fn valid_emails_pass() {
        assert!(validate_email("alice@example.com").is_ok());
        assert!(validate_email("a.b+tag@sub.example.co.uk").is_ok());
        assert!(validate_email("  alice@example.com  ").is_ok()); // trimmed
    }

    #[test]
    fn malformed_emails_fail() {
        assert!(validate_email("").is_err());
        assert!(validate_email("   ").is_err());
        assert!(validate_email("alice").is_err());
        assert!(validate_email("alice@").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("alice@localhost").is_err()); // no dot in domain
        assert!(validate_email("alice bob@example.com").is_err());
        assert!(validate_email("alice@@example.com").is_err());
    }

    #[test]
    fn overlong_email_fails() {
        let local = "a".repeat(250);
        assert!(validate_email(&format!("{local}@example.com")).is_err());
    }

    #[test]
    fn user_ids_reject_path_metacharacters() {
        assert!(validate_user_id("alice@example.com").is_ok());
        assert!(validate_user_id("alice-123").is_ok());
        assert!(validate_user_id("").is_err());
        assert!(validate_user_id("alice/../etc").is_err());
        assert!(validate_user_id("alice bob").is_err());
        assert!(validate_user_id(&"a".repeat(129)).is_err());
    }

    #[test]
    fn typing_patterns_are_bounded() {
        assert!(validate_typing_pattern("0,3.2,1,0,0,1|1,2,3").is_ok());
        assert!(validate_typing_pattern("").is_err());
        assert!(validate_typing_pattern(&"1".repeat(8193)).is_err());
        assert!(validate_typing_pattern("abc\u{7}def").is_err());
    }
}
