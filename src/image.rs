//! Persistent image file.
//!
//! The whole address space is a shared memory mapping of a fixed-size file, so
//! code and data written through the mapping reach the file without an explicit
//! save. Only the three cursors need an explicit checkpoint.
//!
//! The image format is not self-describing: a file whose size differs from the
//! configured memory size is rejected. Concurrent use of one image by several
//! processes is not supported.

use log::{debug, error, info};
use memmap2::MmapMut;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use crate::error::VmError;
use crate::header::Header;
use crate::memory::{check_size, AddressSpace, Backing};
use crate::opcodes::Opcode;

pub struct Image {
    path: PathBuf,
    space: AddressSpace,
    existed: bool,
}

impl Image {
    /// Open `path`, creating and initializing a `size`-byte image if it does not
    /// exist yet. An existing image must be exactly `size` bytes and carry a
    /// valid header.
    pub fn open(path: &Path, size: usize) -> Result<Image, VmError> {
        info!("Opening image {:?} (0x{:04x} bytes)", path, size);
        check_size(size)?;

        let (file, existed) = match OpenOptions::new().read(true).write(true).open(path) {
            Ok(file) => (file, true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                (Image::create(path, size)?, false)
            }
            Err(e) => return Err(e.into()),
        };

        let space = match Image::map(path, file, size, existed) {
            Err(e) if !existed => return Err(remove_unfinished(path, e)),
            other => other?,
        };

        Ok(Image {
            path: path.to_path_buf(),
            space,
            existed,
        })
    }

    /// Map `file` and set up its cursors. The file handle is closed on return; the
    /// mapping stays valid.
    fn map(path: &Path, file: File, size: usize, existed: bool) -> Result<AddressSpace, VmError> {
        let found = file.metadata()?.len();
        if found != size as u64 {
            return Err(VmError::SizeMismatch {
                path: path.display().to_string(),
                expected: size,
                found,
            });
        }

        // Safety: one process at a time owns the image; nothing truncates the file
        // while it is mapped.
        let map = unsafe { MmapMut::map_mut(&file)? };
        let mut space = AddressSpace::new(Backing::Mapped(map))?;

        if existed {
            space.cursors = Header::load(&space)?;
            info!(
                "Restored image: Ip={:04x} Cp={:04x} Hp={:04x}",
                space.cursors.ip, space.cursors.cp, space.cursors.hp
            );
        } else {
            space.fill(Opcode::Nop.code());
            space.cursors = Header::fresh();
            debug!("Initialized fresh image");
        }
        Ok(space)
    }

    fn create(path: &Path, size: usize) -> Result<File, VmError> {
        info!("Creating image {:?}", path);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)?;
        if let Err(e) = file.set_len(size as u64) {
            drop(file);
            return Err(remove_unfinished(path, e.into()));
        }
        Ok(file)
    }

    /// True if the image was restored rather than created by `open`
    pub fn existed(&self) -> bool {
        self.existed
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn space(&self) -> &AddressSpace {
        &self.space
    }

    pub fn space_mut(&mut self) -> &mut AddressSpace {
        &mut self.space
    }

    /// Persist the cursors and sync the mapping to disk.
    pub fn checkpoint(&mut self) -> Result<(), VmError> {
        self.space.checkpoint()?;
        info!("Checkpointed image {:?}", self.path);
        Ok(())
    }

    /// Remove an image created by this `open`, e.g. after a failed assembly, so a
    /// half-assembled image is never resumed. Restored images are left alone.
    pub fn discard(self) -> Result<(), VmError> {
        let Image {
            path,
            space,
            existed,
        } = self;
        drop(space);
        if !existed {
            info!("Discarding unfinished image {:?}", path);
            fs::remove_file(&path)?;
        }
        Ok(())
    }

    /// Hand the mapped address space over to the VM
    pub fn into_space(self) -> AddressSpace {
        self.space
    }
}

/// Remove a file this process just created but could not initialize. Returns
/// `err` unchanged.
fn remove_unfinished(path: &Path, err: VmError) -> VmError {
    match fs::remove_file(path) {
        Ok(()) => debug!("Removed unfinished image {:?}", path),
        Err(e) => error!("Could not remove unfinished image {:?}: {}", path, e),
    }
    err
}

#[cfg(test)]
#[path = "image_tests.rs"]
mod tests;
