/// Authentication primitives for FreeCRM
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and the signup password rule
/// - [`jwt`]: Access/refresh token generation and validation
/// - [`session`]: The authenticated `Session` injected into every protected handler
///
/// Every record in the CRM is owned by exactly one user; the `Session`
/// carries that user id and is the only source of the ownership key used in
/// queries.
///
/// # Example
///
/// ```no_run
/// use freecrm_shared::auth::password::{hash_password, verify_password};
/// use freecrm_shared::auth::jwt::{create_token, validate_access_token, Claims, TokenType};
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("user_password")?;
/// assert!(verify_password("user_password", &hash)?);
///
/// let claims = Claims::new(Uuid::new_v4(), TokenType::Access);
/// let token = create_token(&claims, "secret-key-at-least-32-bytes-long")?;
/// let claims = validate_access_token(&token, "secret-key-at-least-32-bytes-long")?;
/// # Ok(())
/// # }
/// ```

pub mod jwt;
pub mod password;
pub mod session;
