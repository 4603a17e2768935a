use crate::auth::MIN_PASSWORD_LENGTH;
use crate::server::response::ApiError;

const MAX_CODE_LEN: usize = 50;
const MAX_USERNAME_LEN: usize = 50;

/// Loose `local@domain.tld` shape check.
#[must_use]
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') || email.chars().any(char::is_whitespace) {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty(),
        None => false,
    }
}

/// Trims a required text field, rejecting blank values.
pub fn required(value: &str, field: &str) -> Result<String, ApiError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ApiError::bad_request(format!("{field} is required")));
    }
    Ok(value.to_string())
}

/// Trims an optional text field, mapping blank to `None`.
#[must_use]
pub fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn validate_code(code: &str, field: &str) -> Result<String, ApiError> {
    let code = required(code, field)?;
    if code.chars().count() > MAX_CODE_LEN {
        return Err(ApiError::bad_request(format!(
            "{field} cannot exceed {MAX_CODE_LEN} characters"
        )));
    }
    Ok(code)
}

pub fn validate_email(email: &str) -> Result<String, ApiError> {
    let email = required(email, "Email")?;
    if !is_valid_email(&email) {
        return Err(ApiError::bad_request("Invalid email address"));
    }
    Ok(email)
}

pub fn validate_username(username: &str) -> Result<String, ApiError> {
    let username = required(username, "Username")?;
    if username.len() > MAX_USERNAME_LEN {
        return Err(ApiError::bad_request(format!(
            "Username cannot exceed {MAX_USERNAME_LEN} characters"
        )));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '-')
    {
        return Err(ApiError::bad_request(
            "Username can only contain letters, digits, periods, hyphens, and underscores",
        ));
    }
    Ok(username)
}

pub fn validate_password(password: &str) -> Result<(), ApiError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ApiError::bad_request(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

pub fn validate_price(price: Option<f64>) -> Result<Option<f64>, ApiError> {
    match price {
        Some(p) if !p.is_finite() || p < 0.0 => {
            Err(ApiError::bad_request("Purchase price cannot be negative"))
        }
        other => Ok(other),
    }
}
