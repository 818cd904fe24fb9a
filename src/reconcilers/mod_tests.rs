// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for reconciler helper functions.

#[cfg(test)]
mod tests {
    use super::super::generate_secret;

    #[test]
    fn test_generate_secret_length_and_alphabet() {
        let secret = generate_secret(32);
        assert_eq!(secret.len(), 32);
        assert!(secret.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_generate_secret_is_random() {
        assert_ne!(generate_secret(32), generate_secret(32));
    }

    #[test]
    fn test_generate_secret_empty() {
        assert!(generate_secret(0).is_empty());
    }
}
