//! Environment variable utilities
//!
//! ```ignore
//! use dstream_core::env::{env_get, env_get_bool};
//!
//! let rcvbuf: usize = env_get("DSTREAM_RCVBUF", 4 * 1024 * 1024);
//! let flush = env_get_bool("DSTREAM_FLUSH_EPRINT", false);
//! ```

use std::str::FromStr;

/// Get environment variable parsed as `T`, or `default` when unset or
/// unparseable
#[inline]
pub fn env_get<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Get environment variable as boolean
///
/// "1", "true", "yes", "on" (any case) are true; any other set value is
/// false; unset returns `default`.
#[inline]
pub fn env_get_bool(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(val) => matches!(val.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_get_default() {
        let val: usize = env_get("__DSTREAM_TEST_UNSET__", 42);
        assert_eq!(val, 42);
    }

    #[test]
    fn test_env_get_with_set_var() {
        std::env::set_var("__DSTREAM_TEST_NUM__", " 8192 ");
        let val: usize = env_get("__DSTREAM_TEST_NUM__", 0);
        assert_eq!(val, 8192);
        std::env::remove_var("__DSTREAM_TEST_NUM__");
    }

    #[test]
    fn test_env_get_invalid_parse() {
        std::env::set_var("__DSTREAM_TEST_INVALID__", "lots");
        let val: i32 = env_get("__DSTREAM_TEST_INVALID__", -1);
        assert_eq!(val, -1);
        std::env::remove_var("__DSTREAM_TEST_INVALID__");
    }

    #[test]
    fn test_env_get_bool_variants() {
        assert!(env_get_bool("__DSTREAM_TEST_UNSET__", true));

        std::env::set_var("__DSTREAM_TEST_BOOL__", "Yes");
        assert!(env_get_bool("__DSTREAM_TEST_BOOL__", false));

        std::env::set_var("__DSTREAM_TEST_BOOL__", "0");
        assert!(!env_get_bool("__DSTREAM_TEST_BOOL__", true));

        std::env::set_var("__DSTREAM_TEST_BOOL__", "garbage");
        assert!(!env_get_bool("__DSTREAM_TEST_BOOL__", true));

        std::env::remove_var("__DSTREAM_TEST_BOOL__");
    }
}
