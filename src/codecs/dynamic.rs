//! Runtime loading of the external library module.
#![allow(unsafe_code)]

use std::ffi::c_char;
use std::path::{Path, PathBuf};

use libloading::Library;

/// Symbol every libheif build exports.
const VERSION_SYMBOL: &[u8] = b"heif_get_version\0";

/// A loaded shared library, unloaded on drop.
pub(crate) struct DynamicModule {
    path: PathBuf,
    _lib: Library,
}

impl DynamicModule {
    pub(crate) fn load(path: &Path) -> Result<Self, String> {
        log::debug!("loading HEIF module '{}'", path.display());

        // SAFETY: loading runs the library's initializers; libheif's are
        // plain static setup with no preconditions on the caller.
        let lib = unsafe { Library::new(path) }
            .map_err(|e| format!("failed to load '{}': {e}", path.display()))?;

        // SAFETY: the symbol is only looked up, never called.
        unsafe { lib.get::<unsafe extern "C" fn() -> *const c_char>(VERSION_SYMBOL) }
            .map_err(|e| format!("'{}' is not libheif: {e}", path.display()))?;

        Ok(Self {
            path: path.to_path_buf(),
            _lib: lib,
        })
    }
}

impl Drop for DynamicModule {
    fn drop(&mut self) {
        log::debug!("unloading HEIF module '{}'", self.path.display());
    }
}
