//! Template lookup across deployment layouts
//!
//! The service runs from several layouts (a plain checkout, a bundled binary,
//! a serverless function directory). Each layout keeps its templates in a
//! different place relative to the working directory or the executable, so
//! lookup walks an ordered list of candidate roots and takes the first one
//! that holds a readable file.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{Result, ServiceError};
use crate::registry::TemplateRegistry;

#[derive(Debug, Clone, Copy)]
enum Base {
    WorkingDir,
    ExecutableDir,
}

/// Built-in layouts, searched after operator-supplied directories.
const LAYOUTS: &[(&str, Base, &[&str])] = &[
    ("working-dir", Base::WorkingDir, &["templates"]),
    ("executable-parent", Base::ExecutableDir, &["..", "templates"]),
    ("executable-dir", Base::ExecutableDir, &["templates"]),
    ("working-dir-api", Base::WorkingDir, &["api", "templates"]),
    (
        "executable-grandparent",
        Base::ExecutableDir,
        &["..", "..", "templates"],
    ),
];

/// A directory that may contain template files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateRoot {
    pub label: String,
    pub dir: PathBuf,
}

impl CandidateRoot {
    pub fn new(label: impl Into<String>, dir: impl Into<PathBuf>) -> Self {
        Self {
            label: label.into(),
            dir: dir.into(),
        }
    }
}

/// Ordered candidate roots. Earlier roots win.
#[derive(Debug, Clone, Default)]
pub struct CandidateRoots {
    roots: Vec<CandidateRoot>,
}

impl CandidateRoots {
    pub fn new(roots: Vec<CandidateRoot>) -> Self {
        Self { roots }
    }

    /// Build the candidate list for the running process.
    pub fn discover(template_dirs: &[PathBuf]) -> Self {
        let cwd = match std::env::current_dir() {
            Ok(dir) => Some(dir),
            Err(e) => {
                warn!(error = %e, "Cannot determine working directory");
                None
            }
        };
        let exe_dir = executable_dir();
        Self::from_layout(template_dirs, cwd.as_deref(), exe_dir.as_deref())
    }

    /// Build the candidate list from explicit base directories.
    ///
    /// Layouts whose base directory is unknown are skipped.
    pub fn from_layout(
        template_dirs: &[PathBuf],
        working_dir: Option<&Path>,
        executable_dir: Option<&Path>,
    ) -> Self {
        let mut roots: Vec<CandidateRoot> = template_dirs
            .iter()
            .enumerate()
            .map(|(i, dir)| CandidateRoot::new(format!("configured-{}", i + 1), dir.clone()))
            .collect();

        for (label, base, segments) in LAYOUTS {
            let base_dir = match base {
                Base::WorkingDir => working_dir,
                Base::ExecutableDir => executable_dir,
            };
            let Some(base_dir) = base_dir else {
                continue;
            };
            let dir = segments
                .iter()
                .fold(base_dir.to_path_buf(), |dir, segment| dir.join(segment));
            roots.push(CandidateRoot::new(*label, dir));
        }

        Self { roots }
    }

    pub fn iter(&self) -> impl Iterator<Item = &CandidateRoot> {
        self.roots.iter()
    }

    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }
}

pub fn executable_dir() -> Option<PathBuf> {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
}

/// Raw template bytes, exactly as read from disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateBytes(Vec<u8>);

impl TemplateBytes {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.0
    }
}

/// State of one candidate root, for diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct RootProbe {
    pub label: String,
    pub path: String,
    pub exists: bool,
    pub files: Vec<String>,
}

/// Maps template identifiers to template bytes.
#[derive(Debug, Clone)]
pub struct TemplateResolver {
    registry: TemplateRegistry,
    roots: CandidateRoots,
}

impl TemplateResolver {
    pub fn new(registry: TemplateRegistry, roots: CandidateRoots) -> Self {
        Self { registry, roots }
    }

    pub fn registry(&self) -> &TemplateRegistry {
        &self.registry
    }

    pub fn roots(&self) -> &CandidateRoots {
        &self.roots
    }

    /// Load the template for `template_id`.
    ///
    /// Unknown identifiers use the default template. A file that exists but
    /// cannot be read is skipped.
    pub fn resolve(&self, template_id: &str) -> Result<TemplateBytes> {
        let file_name = self.registry.file_name(template_id);
        if !self.registry.contains(template_id) {
            debug!(template_id, file_name, "Unknown template id, using default template");
        }
        info!(template_id, file_name, "Looking for template");

        let mut tried = Vec::with_capacity(self.roots.len());
        for root in self.roots.iter() {
            let path = root.dir.join(file_name);
            debug!(root = %root.label, path = %path.display(), "Trying template path");

            if !path.is_file() {
                tried.push(path);
                continue;
            }

            match fs::read(&path) {
                Ok(bytes) => {
                    info!(path = %path.display(), size = bytes.len(), "Template loaded");
                    return Ok(TemplateBytes::new(bytes));
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Template exists but cannot be read");
                    tried.push(path);
                }
            }
        }

        warn!(file_name, tried = tried.len(), "Template not found on any candidate path");
        Err(ServiceError::TemplateNotFound {
            file_name: file_name.to_string(),
            tried,
        })
    }

    /// Inspect every candidate root.
    pub fn probe(&self) -> Vec<RootProbe> {
        self.roots
            .iter()
            .map(|root| {
                let exists = root.dir.is_dir();
                let mut files = Vec::new();
                if exists {
                    match fs::read_dir(&root.dir) {
                        Ok(entries) => {
                            files = entries
                                .filter_map(|entry| entry.ok())
                                .map(|entry| entry.file_name().to_string_lossy().into_owned())
                                .collect();
                            files.sort();
                        }
                        Err(e) => {
                            debug!(path = %root.dir.display(), error = %e, "Cannot list template directory");
                        }
                    }
                }
                RootProbe {
                    label: root.label.clone(),
                    path: root.dir.display().to_string(),
                    exists,
                    files,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn resolver_for(dirs: &[&Path]) -> TemplateResolver {
        let roots = dirs
            .iter()
            .enumerate()
            .map(|(i, dir)| CandidateRoot::new(format!("root-{}", i), *dir))
            .collect();
        TemplateResolver::new(TemplateRegistry::builtin(), CandidateRoots::new(roots))
    }

    #[test]
    fn test_layout_order() {
        let roots = CandidateRoots::from_layout(
            &[PathBuf::from("/srv/templates")],
            Some(Path::new("/work")),
            Some(Path::new("/opt/app/bin")),
        );
        let dirs: Vec<PathBuf> = roots.iter().map(|r| r.dir.clone()).collect();
        assert_eq!(
            dirs,
            vec![
                PathBuf::from("/srv/templates"),
                PathBuf::from("/work/templates"),
                PathBuf::from("/opt/app/bin/../templates"),
                PathBuf::from("/opt/app/bin/templates"),
                PathBuf::from("/work/api/templates"),
                PathBuf::from("/opt/app/bin/../../templates"),
            ]
        );
    }

    #[test]
    fn test_layout_skips_unknown_bases() {
        let roots = CandidateRoots::from_layout(&[], Some(Path::new("/work")), None);
        let labels: Vec<&str> = roots.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, vec!["working-dir", "working-dir-api"]);
    }

    #[test]
    fn test_first_root_with_file_wins() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        let third = TempDir::new().unwrap();
        fs::write(second.path().join("academic-resume.docx"), b"second").unwrap();
        fs::write(third.path().join("academic-resume.docx"), b"third").unwrap();

        let resolver = resolver_for(&[first.path(), second.path(), third.path()]);
        let bytes = resolver.resolve("academic").unwrap();
        assert_eq!(bytes.as_bytes(), b"second");
    }

    #[test]
    fn test_bytes_are_not_transcoded() {
        let dir = TempDir::new().unwrap();
        let raw = vec![0x50, 0x4b, 0x03, 0x04, 0xff, 0x00, 0x80, 0xfe];
        fs::write(dir.path().join("default-resume.docx"), &raw).unwrap();

        let resolver = resolver_for(&[dir.path()]);
        assert_eq!(resolver.resolve("default").unwrap().into_inner(), raw);
    }

    #[test]
    fn test_unknown_identifier_falls_back_to_default() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("default-resume.docx"), b"default").unwrap();

        let resolver = resolver_for(&[dir.path()]);
        assert_eq!(resolver.resolve("no-such-style").unwrap().as_bytes(), b"default");
    }

    #[test]
    fn test_directory_with_template_name_is_skipped() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        fs::create_dir(first.path().join("creative-resume.docx")).unwrap();
        fs::write(second.path().join("creative-resume.docx"), b"creative").unwrap();

        let resolver = resolver_for(&[first.path(), second.path()]);
        assert_eq!(resolver.resolve("creative").unwrap().as_bytes(), b"creative");
    }

    #[test]
    fn test_not_found_lists_every_path() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();

        let resolver = resolver_for(&[first.path(), second.path()]);
        let err = resolver.resolve("professional").unwrap_err();
        let ServiceError::TemplateNotFound { file_name, tried } = err else {
            panic!("expected TemplateNotFound");
        };
        assert_eq!(file_name, "professional-resume.docx");
        assert_eq!(
            tried,
            vec![
                first.path().join("professional-resume.docx"),
                second.path().join("professional-resume.docx"),
            ]
        );
    }

    #[test]
    fn test_probe_lists_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("b.docx"), b"").unwrap();
        fs::write(dir.path().join("a.docx"), b"").unwrap();
        let missing = dir.path().join("missing");

        let resolver = resolver_for(&[dir.path(), missing.as_path()]);
        let probes = resolver.probe();
        assert_eq!(probes.len(), 2);
        assert!(probes[0].exists);
        assert_eq!(probes[0].files, vec!["a.docx", "b.docx"]);
        assert!(!probes[1].exists);
        assert!(probes[1].files.is_empty());
    }
}
