//! Reference-counted init guard for the external library.

use crate::LoadError;
use crate::codecs::HeifBackend;
use crate::config::LibraryConfig;

/// Tracks how many users have initialized the external library.
///
/// Backend setup runs only on the 0→1 transition of [`init`](Self::init) and
/// teardown only on the 1→0 transition of [`quit`](Self::quit). The guard is
/// an ordinary value: give each independent user its own, or share one
/// behind whatever synchronization the caller already has.
pub struct LibraryGuard<B: HeifBackend> {
    backend: B,
    count: usize,
    config: LibraryConfig,
    #[cfg(feature = "dynamic")]
    module: Option<crate::codecs::dynamic::DynamicModule>,
}

impl<B: HeifBackend> LibraryGuard<B> {
    /// Wrap a backend. Nothing is set up until the first `init`.
    pub fn new(backend: B) -> Self {
        Self::with_config(backend, LibraryConfig::default())
    }

    pub fn with_config(backend: B, config: LibraryConfig) -> Self {
        Self {
            backend,
            count: 0,
            config,
            #[cfg(feature = "dynamic")]
            module: None,
        }
    }

    /// Add a user. Sets the library up if this is the first one.
    ///
    /// A failed setup leaves the count unchanged.
    pub fn init(&mut self) -> Result<(), LoadError> {
        if self.count == 0 {
            self.setup()?;
            log::debug!("{}: library initialized", self.backend.name());
        }
        self.count += 1;
        Ok(())
    }

    /// Remove a user. Tears the library down if this was the last one.
    ///
    /// Does nothing when the count is already zero.
    pub fn quit(&mut self) {
        match self.count {
            0 => {}
            1 => {
                self.count = 0;
                self.teardown();
                log::debug!("{}: library shut down", self.backend.name());
            }
            _ => self.count -= 1,
        }
    }

    /// Initialize unless someone already has.
    pub fn ensure_initialized(&mut self) -> Result<(), LoadError> {
        if self.count == 0 { self.init() } else { Ok(()) }
    }

    pub fn is_initialized(&self) -> bool {
        self.count > 0
    }

    /// Current number of users.
    pub fn ref_count(&self) -> usize {
        self.count
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    fn setup(&mut self) -> Result<(), LoadError> {
        #[cfg(feature = "dynamic")]
        if let Some(path) = &self.config.dynamic_module {
            let module = crate::codecs::dynamic::DynamicModule::load(path)
                .map_err(LoadError::LibraryUnavailable)?;
            self.module = Some(module);
        }

        if let Err(msg) = self.backend.setup() {
            log::warn!("{}: setup failed: {msg}", self.backend.name());
            #[cfg(feature = "dynamic")]
            {
                self.module = None;
            }
            return Err(LoadError::LibraryUnavailable(msg));
        }
        Ok(())
    }

    fn teardown(&mut self) {
        self.backend.teardown();
        #[cfg(feature = "dynamic")]
        {
            self.module = None;
        }
    }

    pub fn config(&self) -> &LibraryConfig {
        &self.config
    }
}

/// Dropping a guard that still has users tears the library down.
impl<B: HeifBackend> Drop for LibraryGuard<B> {
    fn drop(&mut self) {
        if self.count > 0 {
            log::debug!(
                "{}: guard dropped with {} users",
                self.backend.name(),
                self.count
            );
            self.count = 0;
            self.teardown();
        }
    }
}
