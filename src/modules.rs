//! Module resolution and the loaded-module registry.
//!
//! Module names are file paths with an optional `.tl` extension, relative to
//! the directory of the module currently being loaded. Each module is loaded
//! at most once per program; a module is identified by its absolute,
//! lexically normalized path.

use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::Error;

/// Source file extension
pub const EXTENSION: &str = ".tl";

/// Name under which the bundled core library resolves
pub const CORE_LIBRARY: &str = "lib/core.tl";

const CORE_LIBRARY_SOURCE: &str = include_str!("../lib/core.tl");

#[derive(Debug, Clone, PartialEq, Eq)]
enum Source {
    File,
    Embedded(&'static str),
}

/// A module name resolved against the current directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedModule {
    /// The requested name, with the extension appended if missing
    pub name: String,
    /// Absolute path identifying the module
    pub path: PathBuf,
    source: Source,
}

impl ResolvedModule {
    /// Directory that nested loads resolve against
    pub fn directory(&self) -> PathBuf {
        self.path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default()
    }

    pub fn is_embedded(&self) -> bool {
        matches!(self.source, Source::Embedded(_))
    }

    pub fn read(&self) -> Result<String, Error> {
        match self.source {
            Source::Embedded(code) => Ok(code.to_owned()),
            Source::File => fs::read_to_string(&self.path).map_err(|err| {
                tracing::debug!(path = %self.path.display(), %err, "module read failed");
                Error::LoadError {
                    module: self
                        .path
                        .file_name()
                        .map(|name| name.to_string_lossy().into_owned())
                        .unwrap_or_else(|| self.name.clone()),
                    directory: self.directory().display().to_string(),
                }
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ModuleRegistry {
    /// Directories of the modules being loaded, innermost last; the first
    /// entry is the program's base directory
    directories: Vec<PathBuf>,
    loaded: Vec<PathBuf>,
}

impl ModuleRegistry {
    pub fn new(base_dir: &Path) -> Self {
        ModuleRegistry {
            directories: vec![absolute(base_dir)],
            loaded: Vec::new(),
        }
    }

    pub fn current_directory(&self) -> &Path {
        self.directories
            .last()
            .map_or_else(|| Path::new("."), PathBuf::as_path)
    }

    /// True while any module is being loaded
    pub fn is_loading(&self) -> bool {
        self.directories.len() > 1
    }

    pub fn resolve(&self, name: &str) -> ResolvedModule {
        let name = if name.ends_with(EXTENSION) {
            name.to_owned()
        } else {
            format!("{name}{EXTENSION}")
        };
        let path = absolute(&self.current_directory().join(&name));
        // A file on disk takes precedence over the bundled library
        let source = if name == CORE_LIBRARY && !path.is_file() {
            Source::Embedded(CORE_LIBRARY_SOURCE)
        } else {
            Source::File
        };
        ResolvedModule { name, path, source }
    }

    pub fn is_loaded(&self, module: &ResolvedModule) -> bool {
        self.loaded.contains(&module.path)
    }

    /// Record `module` as loaded and make its directory current
    pub fn enter(&mut self, module: &ResolvedModule) {
        self.loaded.push(module.path.clone());
        self.directories.push(module.directory());
    }

    /// Resolve top-level loads against `directory` from now on
    pub fn set_base_directory(&mut self, directory: &Path) {
        if let Some(base) = self.directories.first_mut() {
            *base = absolute(directory);
        }
    }

    pub fn leave(&mut self) {
        if self.directories.len() > 1 {
            self.directories.pop();
        }
    }
}

/// Absolute path with `.` and `..` components resolved lexically
fn absolute(path: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };

    let mut normalized = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

#[cfg(test)]
#[expect(clippy::unwrap_used)] // test code OK
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_resolution_appends_extension() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ModuleRegistry::new(dir.path());

        let module = registry.resolve("util");
        assert_eq!(module.name, "util.tl");
        assert_eq!(module.path, absolute(&dir.path().join("util.tl")));

        let module = registry.resolve("util.tl");
        assert_eq!(module.name, "util.tl");

        let module = registry.resolve("sub/../other");
        assert_eq!(module.path, absolute(&dir.path().join("other.tl")));
    }

    #[test]
    fn test_nested_directories() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub/inner.tl"), "(def inner 1)").unwrap();

        let mut registry = ModuleRegistry::new(dir.path());
        assert!(!registry.is_loading());

        let inner = registry.resolve("sub/inner");
        assert!(!registry.is_loaded(&inner));
        assert_eq!(inner.read().unwrap(), "(def inner 1)");

        registry.enter(&inner);
        assert!(registry.is_loading());
        assert!(registry.is_loaded(&inner));
        assert_eq!(registry.current_directory(), absolute(&dir.path().join("sub")));
        // Relative to the module being loaded
        assert_eq!(registry.resolve("x").path, absolute(&dir.path().join("sub/x.tl")));

        registry.leave();
        assert!(!registry.is_loading());
        assert_eq!(registry.resolve("x").path, absolute(&dir.path().join("x.tl")));
        // Leaving at the base is a no-op
        registry.leave();
        assert_eq!(registry.current_directory(), absolute(dir.path()));
    }

    #[test]
    fn test_missing_module() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ModuleRegistry::new(dir.path());
        let err = registry.resolve("nope").read().unwrap_err();
        assert_eq!(
            err,
            Error::LoadError {
                module: "nope.tl".into(),
                directory: absolute(dir.path()).display().to_string(),
            }
        );
    }

    #[test]
    fn test_embedded_core_library() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ModuleRegistry::new(dir.path());
        let core = registry.resolve("lib/core");
        assert!(core.is_embedded());
        assert!(core.read().unwrap().contains("(def "));

        // A local file shadows the bundled one
        fs::create_dir(dir.path().join("lib")).unwrap();
        fs::write(dir.path().join("lib/core.tl"), "(comment local)").unwrap();
        let core = registry.resolve("lib/core");
        assert!(!core.is_embedded());
        assert_eq!(core.read().unwrap(), "(comment local)");
    }
}
