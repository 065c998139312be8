//! The host contract

use async_trait::async_trait;

use sprig_core::types::{FileMap, PackageRef};

use crate::api::{ExtensionInfo, HexInfo};
use crate::HostResult;

/// File access and downloads on behalf of the resolver
///
/// A host decides where a package's files live. The resolver addresses
/// packages only through [`PackageRef`] handles and never assumes a layout.
#[async_trait]
pub trait Host: Send + Sync {
    /// Contents of `name` in `package`, `None` if the file does not exist
    async fn read_file(&self, package: &PackageRef, name: &str) -> HostResult<Option<String>>;

    async fn write_file(&self, package: &PackageRef, name: &str, contents: &str) -> HostResult<()>;

    /// Fetch every file of `package` and stage it so later reads see it
    async fn download_package(&self, package: &PackageRef) -> HostResult<FileMap>;

    /// Precompiled native metadata for a native-target build
    async fn hex_info(&self, _info: &ExtensionInfo) -> HostResult<Option<HexInfo>> {
        Ok(None)
    }
}
