//! Human-readable codes printed on sales and tokens

use uuid::Uuid;

pub const CODE_ALPHABET: &[u8; 36] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
pub const DEFAULT_CODE_LENGTH: usize = 8;

/// Generate a random code of `len` characters drawn from [`CODE_ALPHABET`]
///
/// Uniqueness is enforced by the database; callers retry on a conflict.
pub fn generate_issuance_code(len: usize) -> String {
    let mut code = String::with_capacity(len);
    let mut entropy = 0u128;
    let mut digits_left = 0;

    while code.len() < len {
        if digits_left == 0 {
            // 122 random bits give 23 full base-36 digits
            entropy = Uuid::new_v4().as_u128();
            digits_left = 23;
        }
        let index = (entropy % 36) as usize;
        entropy /= 36;
        digits_left -= 1;
        code.push(char::from(CODE_ALPHABET[index]));
    }
    code
}

pub fn is_valid_issuance_code(code: &str, len: usize) -> bool {
    code.len() == len && code.bytes().all(|b| CODE_ALPHABET.contains(&b))
}
