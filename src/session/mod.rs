//! Session store (C2): session identity, per-domain cookie jar, last-visited
//! page — the state that binds a browser cookie to a sticky upstream IP.

pub mod cookie;
pub mod store;

pub use cookie::Cookie;
pub use store::{Session, SessionStore};

/// Build the SOCKS5 sticky username `A(S)` (§3 data model).
///
/// Format: `<user>-zone-<zone>-region-<region>-sessid-<cleaned(id)>-sessTime-<mins>`.
/// `cleaned` strips `S.id` to `[A-Za-z0-9]` and truncates to 32 chars, so the
/// same session produces the same username character-for-character for the
/// lifetime of `sess_time_minutes`.
pub fn sticky_username(
    base_user: &str,
    zone: &str,
    region: &str,
    session_id: &str,
    sess_time_minutes: u32,
) -> String {
    let cleaned: String = session_id
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(32)
        .collect();
    format!("{base_user}-zone-{zone}-region-{region}-sessid-{cleaned}-sessTime-{sess_time_minutes}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sticky_username_is_stable_for_a_fixed_session() {
        // §8 scenario 4
        let a = sticky_username("Ashish", "custom", "US", "s1-weird!@#chars", 120);
        let b = sticky_username("Ashish", "custom", "US", "s1-weird!@#chars", 120);
        assert_eq!(a, b);
        assert_eq!(a, "Ashish-zone-custom-region-US-sessid-s1weirdchars-sessTime-120");
    }

    #[test]
    fn sticky_username_truncates_cleaned_id_to_32_chars() {
        let long_id = "a".repeat(64);
        let name = sticky_username("u", "z", "r", &long_id, 60);
        let sessid_part = name.split("sessid-").nth(1).unwrap().split("-sessTime").next().unwrap();
        assert_eq!(sessid_part.len(), 32);
    }
}
