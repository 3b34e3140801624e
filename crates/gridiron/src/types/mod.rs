//! Shared type descriptor loading.
//!
//! Descriptors come from `SharedTypeDescriptors.ebx` inside the encrypted
//! initfs (patch first, then data), from the type cache, or from a running
//! game through [`live::LiveTypeExtractor`].

pub mod live;
mod pipeline;

pub use live::{CommandLauncher, LaunchPolicy, LiveTypeExtractor, ProcessInspector, ProcessLauncher};
pub use pipeline::{InitFsLoader, TocLoader, TypeReadOptions, TypeTablePipeline};
