use crate::base62;
use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Inclusive length bounds for short codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeLength {
    min: usize,
    max: usize,
}

impl CodeLength {
    pub const DEFAULT: CodeLength = CodeLength { min: 7, max: 8 };

    pub fn new(min: usize, max: usize) -> Result<Self> {
        if min == 0 || min > max {
            return Err(CoreError::InvalidCodeLength(format!(
                "expected 1 <= min <= max, got min={min} max={max}"
            )));
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> usize {
        self.min
    }

    pub fn max(&self) -> usize {
        self.max
    }

    pub fn contains(&self, len: usize) -> bool {
        (self.min..=self.max).contains(&len)
    }
}

impl Default for CodeLength {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// A validated short code identifier for a shortened URL.
///
/// Short codes are base62 (`[A-Za-z0-9]`) and their length falls within a
/// [`CodeLength`] range, `[7, 8]` by default.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShortCode(String);

impl ShortCode {
    /// Validates `code` against the default length bounds.
    pub fn new(code: impl Into<String>) -> Result<Self> {
        Self::parse(code, CodeLength::DEFAULT)
    }

    /// Validates `code` against the given length bounds.
    ///
    /// Empty input, characters outside base62 and out-of-range lengths are
    /// all rejected as [`CoreError::InvalidShortCode`].
    pub fn parse(code: impl Into<String>, length: CodeLength) -> Result<Self> {
        let code = code.into();

        if code.is_empty() {
            return Err(CoreError::InvalidShortCode("code is required".to_string()));
        }

        if !base62::is_base62(&code) || !length.contains(code.len()) {
            return Err(CoreError::InvalidShortCode("code is invalid".to_string()));
        }

        Ok(Self(code))
    }

    /// Creates a `ShortCode` without validation.
    ///
    /// Use this only for codes produced by trusted internal sources
    /// (the generator, or rows read back from the store).
    pub fn new_unchecked(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Generates the full shortened URL based on the provided base URL.
    pub fn to_url(&self, base_url: &str) -> String {
        format!("{}/{}", base_url.trim_end_matches('/'), self.0)
    }

    /// Returns the short code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ShortCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for ShortCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
