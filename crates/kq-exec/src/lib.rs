//! Subprocess-backed tasks and the manifest directory provider.

mod error;
pub use error::ExecError;

#[cfg(feature = "proc")]
pub mod proc;
#[cfg(feature = "proc")]
pub use proc::{ExecOperation, ProcConfig};

#[cfg(feature = "proc")]
pub mod manifest;
#[cfg(feature = "proc")]
pub use manifest::{ManifestProvider, TaskManifest};

pub mod prelude {
    pub use crate::error::ExecError;
    #[cfg(feature = "proc")]
    pub use crate::{ExecOperation, ManifestProvider, ProcConfig, TaskManifest};
}
