/// Invitation codes
///
/// A group's invitation code is 8 characters from the base-36 alphabet
/// (`A-Z`, `0-9`), stored uppercase and unique across all groups. Codes are
/// matched case-insensitively: user input is trimmed and uppercased before
/// lookup.
///
/// Uniqueness is enforced by the `groups_invitation_code_key` constraint.
/// Callers that insert or rotate a code retry with a fresh one when
/// [`is_code_collision`] reports a violation of that constraint.
///
/// # Example
///
/// ```
/// use taskflow_shared::invitation::{generate_code, normalize_code, CODE_LENGTH};
///
/// let code = generate_code();
/// assert_eq!(code.len(), CODE_LENGTH);
/// assert_eq!(normalize_code(&code.to_lowercase()), Some(code));
/// ```

use rand::Rng;

/// Length of every invitation code
pub const CODE_LENGTH: usize = 8;

/// How many fresh codes to try before giving up on a unique one
pub const MAX_CODE_ATTEMPTS: usize = 5;

/// Name of the unique constraint guarding invitation codes
pub const CODE_CONSTRAINT: &str = "groups_invitation_code_key";

const ALPHABET: &[u8; 36] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Generates a random 8-character uppercase base-36 code
pub fn generate_code() -> String {
    let mut rng = rand::thread_rng();
    (0..CODE_LENGTH)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}

/// Normalizes user input for lookup
///
/// Returns `None` when nothing but whitespace was supplied.
pub fn normalize_code(input: &str) -> Option<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_uppercase())
    }
}

/// Checks whether a string has the shape of a generated code
pub fn is_well_formed(code: &str) -> bool {
    code.len() == CODE_LENGTH && code.bytes().all(|b| ALPHABET.contains(&b))
}

/// Returns true if the error is a unique violation on the invitation code
pub fn is_code_collision(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.constraint() == Some(CODE_CONSTRAINT),
        _ => false,
    }
}
