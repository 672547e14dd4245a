use super::AuthError;

pub const MIN_SECRET_LENGTH: usize = 8;

/// Provisioning rule for new account secrets: at least 8 characters with
/// an uppercase letter, a lowercase letter, a digit and a symbol.
pub fn check_secret_strength(secret: &str) -> Result<(), AuthError> {
    let mut missing = Vec::new();
    if secret.chars().count() < MIN_SECRET_LENGTH {
        missing.push("at least 8 characters");
    }
    if !secret.chars().any(|c| c.is_uppercase()) {
        missing.push("an uppercase letter");
    }
    if !secret.chars().any(|c| c.is_lowercase()) {
        missing.push("a lowercase letter");
    }
    if !secret.chars().any(|c| c.is_ascii_digit()) {
        missing.push("a digit");
    }
    if !secret.chars().any(|c| !c.is_alphanumeric() && !c.is_whitespace()) {
        missing.push("a special character");
    }

    if missing.is_empty() {
        Ok(())
    } else {
        Err(AuthError::WeakSecret(format!("needs {}", missing.join(", "))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strong_secret_passes() {
        assert!(check_secret_strength("Sx9!aB2k").is_ok());
        assert!(check_secret_strength("Ção#2024x").is_ok());
    }

    #[test]
    fn each_rule_is_enforced() {
        for weak in ["Sx9!aB2", "sx9!ab2k", "SX9!AB2K", "Sxy!aBzk", "Sx9aaB2k"] {
            assert!(
                matches!(check_secret_strength(weak), Err(AuthError::WeakSecret(_))),
                "accepted {weak:?}"
            );
        }
    }

    #[test]
    fn message_lists_what_is_missing() {
        let Err(AuthError::WeakSecret(msg)) = check_secret_strength("abcdefgh") else {
            panic!("expected weak secret");
        };
        assert!(msg.contains("uppercase"));
        assert!(msg.contains("digit"));
        assert!(!msg.contains("lowercase"));
    }
}
