use crate::transform::TransformError;

/// Encode a dotted version string as an integer by concatenating its components.
///
/// The encoding is lossy: "1.23" and "12.3" both become 123, and leading zeros of the
/// concatenation are lost ("0.1" becomes 1). Components must be non-empty ASCII digits and
/// the result must fit an `INTEGER` column, anything else is rejected.
pub fn encode(version: &str) -> Result<i32, TransformError> {
    let mut digits = String::with_capacity(version.len());

    for component in version.split('.') {
        if component.is_empty() || !component.bytes().all(|b| b.is_ascii_digit()) {
            return Err(TransformError::InvalidVersion(version.to_owned()));
        }
        digits.push_str(component);
    }

    digits
        .parse::<i32>()
        .map_err(|_| TransformError::VersionOutOfRange(version.to_owned()))
}
