//! # capture-studio-fs
//!
//! Desktop filesystem backend for capture-studio persistence.
//!
//! Provides:
//! - `WorkspaceFolderSink`: saves recordings (plus metadata sidecars) into a
//!   user-chosen folder that is remembered across sessions
//! - `DownloadSink`: fallback that writes into the downloads directory
//! - `ProfileCache`: cached cloud account profile
//!
//! ## Usage
//! ```ignore
//! use std::sync::Arc;
//! use capture_studio_core::{DiskStore, Studio, StudioConfiguration, StudioServices};
//! use capture_studio_fs::{DownloadSink, WorkspaceFolderSink};
//!
//! let store = Arc::new(DiskStore::open(".capture-studio")?);
//! let folder = Arc::new(WorkspaceFolderSink::open(store.clone())?);
//! let services = StudioServices {
//!     buffer: store.clone(),
//!     settings: store,
//!     fallback_sink: Arc::new(DownloadSink::user_downloads()?),
//!     primary_sink: folder.is_connected().then(|| folder.clone() as _),
//!     prompt: None,
//! };
//! let studio = Studio::new(StudioConfiguration::default(), devices, backend, services)?;
//! ```

pub mod downloads;
pub mod profile;
pub mod workspace;

pub use downloads::DownloadSink;
pub use profile::{CloudProfile, ProfileCache};
pub use workspace::WorkspaceFolderSink;
