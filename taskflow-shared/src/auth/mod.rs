/// Authentication and authorization
///
/// # Modules
///
/// - [`password`]: Argon2id hashing and strength rules
/// - [`jwt`]: access/refresh token issuance and verification
/// - [`middleware`]: bearer-token extraction and the request auth context
/// - [`authorization`]: group and task permission checks
///
/// # Example
///
/// ```
/// use taskflow_shared::auth::jwt::{create_token, validate_access_token, Claims, TokenType};
/// use taskflow_shared::auth::password::{hash_password, verify_password};
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("Sup3r$ecret")?;
/// assert!(verify_password("Sup3r$ecret", &hash)?);
///
/// let secret = "a-secret-of-at-least-thirty-two-bytes!!";
/// let token = create_token(&Claims::new(Uuid::new_v4(), TokenType::Access), secret)?;
/// assert!(validate_access_token(&token, secret).is_ok());
/// # Ok(())
/// # }
/// ```

pub mod authorization;
pub mod jwt;
pub mod middleware;
pub mod password;
