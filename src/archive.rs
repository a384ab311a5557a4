// Archive builder: packs a bento directory into an in-memory tar.gz whose
// root is the directory's contents (not nested under the directory name).
// The whole archive is held in memory before the upload starts.

use crate::bento::DESCRIPTOR_FILE;
use crate::error::{CliError, Result};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::path::Path;
use tracing::debug;

/// Builds a gzip-compressed tar of `dir`. Fails before touching the
/// filesystem further if `dir` or its descriptor is missing.
pub fn build_archive(dir: &Path) -> Result<Vec<u8>> {
    if !dir.is_dir() {
        return Err(CliError::Input(format!(
            "Bento directory not found: {}",
            dir.display()
        )));
    }
    if !dir.join(DESCRIPTOR_FILE).is_file() {
        return Err(CliError::Input(format!(
            "Bento descriptor {} not found in {}",
            DESCRIPTOR_FILE,
            dir.display()
        )));
    }

    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut tar = tar::Builder::new(encoder);
    tar.append_dir_all("", dir)?;
    let bytes = tar.into_inner()?.finish()?;

    debug!(path = %dir.display(), bytes = bytes.len(), "built bento archive");
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use std::io::Read;
    use tempfile::TempDir;

    fn entries(archive: &[u8]) -> Vec<(String, Vec<u8>)> {
        let mut tar = tar::Archive::new(GzDecoder::new(archive));
        let mut out = Vec::new();
        for entry in tar.entries().unwrap() {
            let mut entry = entry.unwrap();
            let path = entry.path().unwrap().to_string_lossy().to_string();
            let mut contents = Vec::new();
            entry.read_to_end(&mut contents).unwrap();
            out.push((path, contents));
        }
        out
    }

    #[test]
    fn archive_is_rooted_at_directory_contents() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("1.0");
        std::fs::create_dir_all(dir.join("iris_classifier")).unwrap();
        std::fs::write(dir.join(DESCRIPTOR_FILE), "kind: BentoService\n").unwrap();
        std::fs::write(dir.join("iris_classifier").join("svc.py"), "print('hi')\n").unwrap();

        let archive = build_archive(&dir).unwrap();
        let entries = entries(&archive);
        let paths: Vec<&str> = entries.iter().map(|(p, _)| p.trim_end_matches('/')).collect();

        assert!(paths.contains(&DESCRIPTOR_FILE));
        assert!(paths.contains(&"iris_classifier/svc.py"));
        assert!(paths.iter().all(|p| !p.starts_with("1.0")));

        let svc = entries
            .iter()
            .find(|(p, _)| p == "iris_classifier/svc.py")
            .map(|(_, c)| c.clone())
            .unwrap();
        assert_eq!(svc, b"print('hi')\n");
    }

    #[test]
    fn missing_directory_fails_fast() {
        let temp = TempDir::new().unwrap();
        let err = build_archive(&temp.path().join("absent")).unwrap_err();
        assert!(matches!(err, CliError::Input(_)));
    }

    #[test]
    fn missing_descriptor_fails_fast() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("model.pkl"), b"weights").unwrap();
        let err = build_archive(temp.path()).unwrap_err();
        assert!(matches!(err, CliError::Input(_)));
        assert!(err.to_string().contains(DESCRIPTOR_FILE));
    }
}
