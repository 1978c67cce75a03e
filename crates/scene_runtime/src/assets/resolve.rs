//! File lookup across search directories
//!
//! Scene files and the binary streams they reference may be addressed relative to the
//! working directory, to the scene file, or to one of the configured search
//! directories. Candidates are tried in order and the first existing file wins.

use std::path::{Path, PathBuf};

/// No candidate path existed
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("could not find \"{name}\" (tried {})", display_paths(.tried))]
pub struct NotFound {
    /// Name as written in the scene or configuration
    pub name: String,
    /// Every path that was checked
    pub tried: Vec<PathBuf>,
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Ordered list of places to look for a file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchPaths {
    base: Option<PathBuf>,
    dirs: Vec<PathBuf>,
}

impl SearchPaths {
    /// Search the bare name first, then each directory
    pub fn new(dirs: Vec<PathBuf>) -> Self {
        Self { base: None, dirs }
    }

    /// Try `base` before everything else (used for the scene file's directory)
    pub fn with_base(mut self, base: impl Into<PathBuf>) -> Self {
        self.base = Some(base.into());
        self
    }

    /// Candidate paths in lookup order. With an `extension`, each location is tried
    /// as given and then with the extension appended.
    pub fn candidates(&self, name: &str, extension: Option<&str>) -> Vec<PathBuf> {
        let roots = self
            .base
            .iter()
            .cloned()
            .chain(std::iter::once(PathBuf::new()))
            .chain(self.dirs.iter().cloned());

        let mut out = Vec::new();
        for root in roots {
            out.push(root.join(name));
            if let Some(ext) = extension {
                if !name.ends_with(&format!(".{ext}")) {
                    out.push(root.join(format!("{name}.{ext}")));
                }
            }
        }
        out.dedup();
        out
    }

    /// First existing candidate
    pub fn resolve(&self, name: &str, extension: Option<&str>) -> Result<PathBuf, NotFound> {
        let tried = self.candidates(name, extension);
        match tried.iter().find(|p| Path::new(p).is_file()) {
            Some(found) => {
                log::debug!("Resolved \"{name}\" to {}", found.display());
                Ok(found.clone())
            }
            None => Err(NotFound {
                name: name.to_string(),
                tried,
            }),
        }
    }
}
