//! Hostname matching.
//!
//! # Responsibilities
//! - Compile the trusted-host pattern once at startup
//! - Match destination hostnames against it
//! - Lint the pattern source for probable mistakes
//!
//! # Design Decisions
//! - Unanchored search semantics: anchors must be written in the pattern
//! - Matching is case-sensitive, exactly as written

use regex::Regex;

/// Trait for matching destination hostnames.
pub trait Matcher: Send + Sync + std::fmt::Debug {
    /// Returns true if the hostname matches this condition.
    fn matches(&self, hostname: &str) -> bool;
}

/// Compiled pattern selecting hostnames for the trusted route.
#[derive(Debug, Clone)]
pub struct HostPattern {
    regex: Regex,
}

impl HostPattern {
    /// Compile a pattern.
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            regex: Regex::new(pattern)?,
        })
    }

    /// The pattern source.
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    /// Number of `.` metacharacters not preceded by an escaping backslash.
    ///
    /// Best effort: a dot inside a character class (`[.]`) is literal but is
    /// still counted.
    pub fn unescaped_dots(&self) -> usize {
        unescaped_dots(self.as_str())
    }
}

impl Matcher for HostPattern {
    fn matches(&self, hostname: &str) -> bool {
        self.regex.is_match(hostname)
    }
}

/// Count unescaped `.` characters in a pattern source.
pub fn unescaped_dots(pattern: &str) -> usize {
    let mut count = 0;
    let mut escaped = false;
    for c in pattern.chars() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '.' => count += 1,
            _ => {}
        }
    }
    count
}
