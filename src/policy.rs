//! Password-strength policy applied at registration and password change.
//! Deliberately separate from hashing: the hasher accepts any plaintext, the
//! policy decides what an account is allowed to store.

const MIN_PASSWORD_LEN: usize = 8;

/// A character that strengthens a password: a digit, an uppercase letter,
/// or anything outside the alphanumeric range.
fn strengthens(character: char) -> bool {
    character.is_ascii_digit() || character.is_uppercase() || !character.is_alphanumeric()
}

/// Returns whether a candidate password meets the storefront policy:
/// at least eight characters, at least one of which is a digit, an
/// uppercase letter, or a symbol.
pub fn is_valid_password(password: &str) -> bool {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return false;
    }
    password.chars().any(strengthens)
}

#[cfg(test)]
mod tests {
    use super::is_valid_password;

    #[test]
    fn rejects_short_passwords() {
        assert!(!is_valid_password(""));
        assert!(!is_valid_password("Ab1!"));
        assert!(!is_valid_password("seven77"));
    }

    #[test]
    fn rejects_long_but_weak_passwords() {
        assert!(!is_valid_password("lowercaseonly"));
    }

    #[test]
    fn accepts_each_strengthening_class() {
        assert!(is_valid_password("password1"));
        assert!(is_valid_password("Password"));
        assert!(is_valid_password("password!"));
    }

    #[test]
    fn counts_characters_not_bytes() {
        // Eight multibyte characters with an uppercase present.
        assert!(is_valid_password("Päässwörd"));
    }
}
