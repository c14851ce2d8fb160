//! Engine handle with its capability table.

use std::sync::OnceLock;

use crate::engine::Engine;
use crate::{CodecRegistry, ImageFormat};

/// An engine plus the table of formats it can load.
///
/// The table is built on first use, exactly once even under concurrent first
/// use, and never changes afterwards. Share one `Foreign` (typically in a
/// `static`) to get a process-wide table.
pub struct Foreign<E> {
    engine: E,
    registry: OnceLock<CodecRegistry>,
}

impl<E: Engine> Foreign<E> {
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            registry: OnceLock::new(),
        }
    }

    /// Use `registry` instead of asking the engine.
    ///
    /// Listing a format the engine cannot actually load surfaces as a
    /// [`CodecError::Decode`](crate::CodecError::Decode) from that engine.
    pub fn with_registry(engine: E, registry: CodecRegistry) -> Self {
        Self {
            engine,
            registry: OnceLock::from(registry),
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// The capability table, built on first call.
    pub fn registry(&self) -> &CodecRegistry {
        self.registry.get_or_init(|| {
            let supported = self.engine.supported_formats();
            tracing::debug!(?supported, "built capability table");
            CodecRegistry::from_set(supported)
        })
    }

    /// Can the engine load `format`? Always false for `Unknown`.
    pub fn is_supported(&self, format: ImageFormat) -> bool {
        self.registry().can_load(format)
    }
}

impl<E> core::fmt::Debug for Foreign<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Foreign")
            .field("registry", &self.registry.get())
            .finish_non_exhaustive()
    }
}
