mod helpers;
mod middleware;
mod password;
mod token;

pub use middleware::{AuthError, RequireAdmin, RequireAuth};
pub use password::{MIN_PASSWORD_LENGTH, PasswordManager, generate_password};
pub use token::{Claims, TokenIssuer, generate_secret};
