use lazy_static::lazy_static;
use regex::Regex;
use uuid::Uuid;

use crate::PrimaryKey;

lazy_static! {
    static ref EMAIL: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
}

/// A new time-ordered identifier
pub fn new_id() -> PrimaryKey {
    Uuid::now_v7().to_string()
}

/// Returns true if the identifier has the shape of one produced by [new_id]
pub fn is_valid_id(id: &str) -> bool {
    Uuid::parse_str(id).is_ok()
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL.is_match(email)
}

#[cfg(test)]
mod test {
    use super::{is_valid_email, is_valid_id, new_id};

    #[test]
    fn ids_are_unique_uuids() {
        let first = new_id();
        let second = new_id();

        assert!(is_valid_id(&first));
        assert_ne!(first, second);
    }

    #[test]
    fn emails_are_checked_for_shape() {
        assert!(is_valid_email("m@example.com"));
        assert!(!is_valid_email("m@example"));
        assert!(!is_valid_email("m example@example.com"));
    }
}
