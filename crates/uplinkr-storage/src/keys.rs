//! Storage filename generation.

use rand::distr::Alphanumeric;
use rand::Rng;
use std::path::Path;

/// Length of the random stem, which is also the public file id
pub const STORAGE_ID_LENGTH: usize = 10;

const MAX_EXTENSION_LEN: usize = 16;

/// Generate a fresh storage filename for an upload named `original_name`.
///
/// The extension of the original name is kept when it is plain ASCII
/// alphanumeric; anything else is dropped so the filename stays safe.
pub fn generate_storage_filename(original_name: &str) -> String {
    let stem: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(STORAGE_ID_LENGTH)
        .map(char::from)
        .collect();

    match safe_extension(original_name) {
        Some(ext) => format!("{}.{}", stem, ext),
        None => stem,
    }
}

fn safe_extension(original_name: &str) -> Option<&str> {
    let ext = Path::new(original_name).extension()?.to_str()?;
    if ext.is_empty()
        || ext.len() > MAX_EXTENSION_LEN
        || !ext.chars().all(|c| c.is_ascii_alphanumeric())
    {
        return None;
    }
    Some(ext)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_simple_extension() {
        let name = generate_storage_filename("holiday photo.JPG");
        let (stem, ext) = name.split_once('.').unwrap();
        assert_eq!(stem.len(), STORAGE_ID_LENGTH);
        assert!(stem.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_eq!(ext, "JPG");
    }

    #[test]
    fn drops_unsafe_or_missing_extension() {
        assert_eq!(generate_storage_filename("README").len(), STORAGE_ID_LENGTH);
        assert_eq!(
            generate_storage_filename("evil.p/hp").len(),
            STORAGE_ID_LENGTH
        );
        assert_eq!(
            generate_storage_filename("weird.ext with space").len(),
            STORAGE_ID_LENGTH
        );
    }

    #[test]
    fn names_are_random() {
        assert_ne!(
            generate_storage_filename("a.txt"),
            generate_storage_filename("a.txt")
        );
    }
}
