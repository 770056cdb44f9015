use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Extension given to every written score.
pub const OUTPUT_EXTENSION: &str = "xml";

/// Where the score for `image` lands: `<output_dir>/<image stem>.xml`.
///
/// # Errors
/// Returns [`Error::NoFileStem`] when `image` has no file name (`/`, `..`).
pub fn output_path(output_dir: &Path, image: &Path) -> Result<PathBuf> {
    let stem = image
        .file_stem()
        .ok_or_else(|| Error::NoFileStem(image.to_path_buf()))?;

    let mut file_name = stem.to_os_string();
    file_name.push(".");
    file_name.push(OUTPUT_EXTENSION);
    Ok(output_dir.join(file_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_path_replaces_extension() {
        let path = output_path(Path::new("/out"), Path::new("/scans/sonata.png")).unwrap();
        assert_eq!(path, PathBuf::from("/out/sonata.xml"));
    }

    #[test]
    fn test_output_path_keeps_inner_dots() {
        let path = output_path(Path::new("out"), Path::new("op.27.no2.jpg")).unwrap();
        assert_eq!(path, PathBuf::from("out/op.27.no2.xml"));
    }

    #[test]
    fn test_output_path_without_extension() {
        let path = output_path(Path::new("out"), Path::new("page")).unwrap();
        assert_eq!(path, PathBuf::from("out/page.xml"));
    }

    #[test]
    fn test_output_path_rejects_stemless_paths() {
        assert!(matches!(
            output_path(Path::new("out"), Path::new("..")),
            Err(Error::NoFileStem(_))
        ));
    }
}
