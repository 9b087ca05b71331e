//! Tracing setup and log-safe text identifiers.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub const DEFAULT_LOG_FILTER: &str = "slide_curator=info,warn";
pub const ENV_LOG_JSON: &str = "SLIDE_LOG_JSON";

/// Install the global subscriber. `RUST_LOG` wins over the default filter;
/// `SLIDE_LOG_JSON=1` switches to JSON lines. Safe to call twice.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let json = std::env::var(ENV_LOG_JSON).ok().as_deref() == Some("1");

    let registry = tracing_subscriber::registry().with(filter);
    let res = if json {
        registry.with(fmt::layer().json().with_writer(std::io::stderr)).try_init()
    } else {
        registry.with(fmt::layer().compact().with_writer(std::io::stderr)).try_init()
    };
    if res.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

/// Short SHA-256 prefix used in place of raw slide or response text in logs.
pub fn anon_hash(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let digest = Sha256::digest(text.as_bytes());
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anon_hash_is_stable_and_short() {
        let a = anon_hash("Quarterly revenue grew 12%");
        assert_eq!(a.len(), 12);
        assert_eq!(a, anon_hash("Quarterly revenue grew 12%"));
        assert_ne!(a, anon_hash("Quarterly revenue grew 13%"));
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
