//! The map/unmap lifecycle of GPU-backed resources
//!
//! A mappable resource keeps its data on the CPU and, while mapped, also owns
//! the GPU objects holding a copy of it. Mapping twice or unmapping an
//! unmapped resource is an error and leaves the resource unchanged.

use crate::render::api::GpuDevice;
use crate::render::RenderResult;

/// Resource with an explicit unmapped/mapped lifecycle
pub trait Mappable {
    /// Allocate GPU objects and upload the CPU data
    ///
    /// Fails with [`crate::render::RenderError::BuffersAlreadyMapped`] if the
    /// resource is already mapped.
    fn map(&mut self, device: &GpuDevice) -> RenderResult<()>;

    /// Release the GPU objects
    ///
    /// Fails with [`crate::render::RenderError::BuffersNotYetMapped`] if the
    /// resource is not mapped.
    fn unmap(&mut self) -> RenderResult<()>;

    /// Whether the GPU copy exists
    fn is_mapped(&self) -> bool;

    /// Unmap, then map again
    ///
    /// Re-uploads the current CPU data. Fails like [`Mappable::unmap`] on an
    /// unmapped resource.
    fn remap(&mut self, device: &GpuDevice) -> RenderResult<()> {
        self.unmap()?;
        self.map(device)
    }
}
