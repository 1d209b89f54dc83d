//! Reading and writing `.npy` array files
//!
//! The header is parsed independently by every worker; only the payload goes
//! through a [`CollectiveFileChannel`].

use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use pario_core::{Element, NpyHeader, Order, ParioError};
use tracing::debug;

use crate::channel::{CollectiveFileChannel, DynamicArray, LocalArray};
use crate::group::ProcessGroup;
use crate::{Error, Result};

/// Read and decode the header of an array file
pub fn head(path: impl AsRef<Path>) -> Result<NpyHeader> {
    let mut file = File::open(path.as_ref()).map_err(Error::io("open"))?;

    let mut bytes = vec![0u8; NpyHeader::PREFIX_LEN];
    file.read_exact(&mut bytes).map_err(Error::io("read header"))?;
    let total = NpyHeader::required_len(&bytes)?;
    if total > bytes.len() {
        let prefix = bytes.len();
        bytes.resize(total, 0);
        file.read_exact(&mut bytes[prefix..])
            .map_err(Error::io("read header"))?;
    }
    Ok(NpyHeader::parse(&bytes)?)
}

/// Header read by every worker, failing on all of them if any failed
fn group_head(path: &Path, group: &ProcessGroup) -> Result<NpyHeader> {
    let header = head(path).and_then(|header| {
        if header.fortran_order() {
            Err(ParioError::FortranOrderUnsupported.into())
        } else {
            Ok(header)
        }
    });
    if group.comm().all_true(header.is_ok()) {
        header
    } else {
        Err(header.err().unwrap_or(Error::Collective {
            operation: "read header",
            rank: group.rank(),
        }))
    }
}

/// Collectively load this worker's brick of the array stored at `path`
pub fn load<T: Element>(path: impl AsRef<Path>, group: &ProcessGroup) -> Result<LocalArray<T>> {
    let path = path.as_ref();
    let header = group_head(path, group)?;
    let stored = header.element_type()?;
    if stored != T::ELEMENT_TYPE {
        return Err(Error::InvalidArgument(format!(
            "file holds {stored} elements, {} requested",
            T::ELEMENT_TYPE
        )));
    }

    let mut channel = CollectiveFileChannel::new(path, group)?;
    let array = channel.load(header.shape(), header.order(), header.data_offset() as u64)?;
    channel.close()?;
    Ok(array)
}

/// Like [`load`], with the element type taken from the header
pub fn load_dynamic(path: impl AsRef<Path>, group: &ProcessGroup) -> Result<DynamicArray> {
    let path = path.as_ref();
    let header = group_head(path, group)?;
    let element = header.element_type()?;

    let mut channel = CollectiveFileChannel::new(path, group)?;
    let array = channel.load_dynamic(
        header.shape(),
        element,
        header.order(),
        header.data_offset() as u64,
    )?;
    channel.close()?;
    Ok(array)
}

/// Write a complete array owned by a single worker
pub fn save<T: Element>(path: impl AsRef<Path>, array: &LocalArray<T>) -> Result<()> {
    if !array.is_whole() {
        return Err(Error::InvalidArgument(
            "only a complete array can be saved by one worker".to_string(),
        ));
    }
    let header = NpyHeader::for_array(T::ELEMENT_TYPE, Order::C, array.global_shape());

    let file = File::create(path.as_ref()).map_err(Error::io("create"))?;
    let mut writer = BufWriter::new(file);
    let mut write = || -> std::io::Result<()> {
        writer.write_all(&header.to_bytes())?;
        writer.write_all(bytemuck::cast_slice(array.data()))?;
        writer.flush()
    };
    write().map_err(Error::io("write"))?;
    debug!(path = %path.as_ref().display(), shape = ?array.global_shape(), "saved array");
    Ok(())
}

/// Save from a process group
///
/// Only a group of one worker is supported; larger groups fail before any
/// file is created.
pub fn save_collective<T: Element>(
    path: impl AsRef<Path>,
    array: &LocalArray<T>,
    group: &ProcessGroup,
) -> Result<()> {
    if group.size() > 1 {
        return Err(Error::NotImplemented("collective save"));
    }
    save(path, array)
}
