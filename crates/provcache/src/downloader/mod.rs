//! Package downloading and extraction module.
//!
//! This module materializes packages from the three kinds of location:
//! HTTP archives, local archives and local directories.

mod archive;
mod file;
mod path;
mod transfer;

pub use archive::{ArchiveInstaller, ExtractError, ZipExtractor};
pub use file::FileDownloader;
pub use path::{copy_dir, same_directory, LinkMode, PathDownloader, PathInstallResult, PathStrategy};
pub use transfer::{copy_cancellable, CopyError};
