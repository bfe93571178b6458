//! Legacy `.doc` to `.docx` conversion through a headless office suite
//!
//! The converted file is written next to the source as `<stem>.docx`; the
//! `.doc` file itself is not modified or removed.

use crate::error::{Result, ScrubError};
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::SystemTime;

/// Office suite executable used when none is configured
pub const DEFAULT_OFFICE_BINARY: &str = "libreoffice";

/// CFB (Compound File Binary) / OLE2 magic signature
///
/// All OLE-based Microsoft Office formats (DOC, XLS, PPT) start with these 8 bytes.
pub const CFB_SIGNATURE: [u8; 8] = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

/// Converter driving an office suite in headless mode
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OfficeConverter {
    binary: PathBuf,
}

impl Default for OfficeConverter {
    #[inline]
    fn default() -> Self {
        Self::new(DEFAULT_OFFICE_BINARY)
    }
}

impl OfficeConverter {
    /// Use the given executable (a name looked up on `PATH`, or a path)
    #[inline]
    #[must_use]
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    #[inline]
    #[must_use]
    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Check if the office suite can be started
    #[must_use = "checks if the office suite is installed"]
    pub fn is_available(&self) -> bool {
        Command::new(&self.binary)
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    /// Convert a `.doc` file to `.docx` in the same directory
    ///
    /// Returns the path of the new `.docx` file.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - the file does not exist or is not a `.doc` file
    /// - the file does not carry the CFB/OLE2 signature
    /// - the office suite cannot be started or reports a failure
    /// - the expected output is missing, empty, or left as it was before
    ///   the run
    #[must_use = "conversion produces a result that should be handled"]
    pub fn convert_to_docx(&self, path: &Path) -> Result<PathBuf> {
        if !path.is_file() {
            return Err(ScrubError::Conversion(format!(
                "File not found: {}",
                path.display()
            )));
        }

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        if !ext.eq_ignore_ascii_case("doc") {
            return Err(ScrubError::Conversion(format!(
                "Expected .doc file, got: .{ext}"
            )));
        }

        verify_cfb_signature(path)?;

        let outdir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let target = docx_target(path);
        let previous = output_stamp(&target);

        log::debug!(
            "Running {} --headless --convert-to docx --outdir {} {}",
            self.binary.display(),
            outdir.display(),
            path.display()
        );
        let output = Command::new(&self.binary)
            .arg("--headless")
            .arg("--convert-to")
            .arg("docx")
            .arg("--outdir")
            .arg(outdir)
            .arg(path)
            .output()
            .map_err(|e| {
                ScrubError::Conversion(format!(
                    "Failed to execute {}: {e}. Ensure LibreOffice is installed and accessible.",
                    self.binary.display()
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ScrubError::Conversion(format!(
                "{} exited with {}: {}",
                self.binary.display(),
                output.status,
                stderr.trim()
            )));
        }

        match output_stamp(&target) {
            None | Some((_, 0)) => {
                return Err(ScrubError::Conversion(format!(
                    "Converted DOCX not found at {}",
                    target.display()
                )));
            }
            // The office suite can exit 0 without converting anything
            stamp if stamp == previous => {
                return Err(ScrubError::Conversion(format!(
                    "{} was not rewritten by {}",
                    target.display(),
                    self.binary.display()
                )));
            }
            Some(_) => {}
        }

        log::info!("Converted {} -> {}", path.display(), target.display());
        Ok(target)
    }
}

/// Modification time and size of an existing conversion output
fn output_stamp(path: &Path) -> Option<(SystemTime, u64)> {
    let metadata = fs::metadata(path).ok()?;
    Some((metadata.modified().ok()?, metadata.len()))
}

/// Path of the `.docx` produced for a `.doc` file: same directory and stem
#[must_use]
pub fn docx_target(path: &Path) -> PathBuf {
    path.with_extension("docx")
}

/// Verify that the file starts with the CFB signature `D0 CF 11 E0 A1 B1 1A E1`
///
/// # Errors
///
/// Returns an error if the file cannot be read, is shorter than the
/// signature, or starts with other bytes.
pub fn verify_cfb_signature(path: &Path) -> Result<()> {
    let mut header = Vec::with_capacity(CFB_SIGNATURE.len());
    File::open(path)?
        .take(CFB_SIGNATURE.len() as u64)
        .read_to_end(&mut header)?;

    if header.len() < CFB_SIGNATURE.len() {
        return Err(ScrubError::InvalidDocument(
            "File too small to be a valid .doc file (< 8 bytes)".to_string(),
        ));
    }
    if header != CFB_SIGNATURE {
        return Err(ScrubError::InvalidDocument(format!(
            "Invalid .doc file signature. Expected CFB signature {CFB_SIGNATURE:02X?}, got {header:02X?}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_verify_cfb_signature_valid() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(&CFB_SIGNATURE).unwrap();
        temp.write_all(b"rest of the compound file").unwrap();
        temp.flush().unwrap();

        assert!(verify_cfb_signature(temp.path()).is_ok());
    }

    #[test]
    fn test_verify_cfb_signature_invalid() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(b"PK\x03\x04 this is a zip").unwrap();
        temp.flush().unwrap();

        let err = verify_cfb_signature(temp.path()).unwrap_err();
        assert!(err.to_string().contains("Invalid .doc file signature"));
    }

    #[test]
    fn test_verify_cfb_signature_too_small() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(&CFB_SIGNATURE[..4]).unwrap();
        temp.flush().unwrap();

        let err = verify_cfb_signature(temp.path()).unwrap_err();
        assert!(err.to_string().contains("too small"));
    }

    #[test]
    fn test_convert_file_not_found() {
        let converter = OfficeConverter::default();
        let err = converter
            .convert_to_docx(Path::new("/nonexistent/path/document.doc"))
            .unwrap_err();
        assert!(err.to_string().contains("File not found"));
    }

    #[test]
    fn test_convert_wrong_extension() {
        let mut temp = NamedTempFile::with_suffix(".txt").unwrap();
        temp.write_all(&CFB_SIGNATURE).unwrap();
        temp.flush().unwrap();

        let err = OfficeConverter::default()
            .convert_to_docx(temp.path())
            .unwrap_err();
        assert!(err.to_string().contains("Expected .doc"));
    }

    #[test]
    fn test_convert_rejects_bad_signature_before_running_anything() {
        let mut temp = NamedTempFile::with_suffix(".DOC").unwrap();
        temp.write_all(b"plain text pretending").unwrap();
        temp.flush().unwrap();

        let converter = OfficeConverter::new("/nonexistent/office");
        let err = converter.convert_to_docx(temp.path()).unwrap_err();
        assert!(matches!(err, ScrubError::InvalidDocument(_)));
    }

    #[test]
    fn test_docx_target() {
        assert_eq!(
            docx_target(Path::new("/data/in/report.v2.doc")),
            PathBuf::from("/data/in/report.v2.docx")
        );
    }

    #[test]
    fn test_default_binary() {
        assert_eq!(
            OfficeConverter::default().binary(),
            Path::new(DEFAULT_OFFICE_BINARY)
        );
        assert!(!OfficeConverter::new("/nonexistent/office").is_available());
    }
}
