//! Collectively opened files
//!
//! Every worker holds its own local handle bound to the same path. All
//! operations here are collective: each one ends with a group agreement, so a
//! local failure on one worker surfaces as an error on every worker instead
//! of leaving the group split between success and failure.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use memmap2::Mmap;
use pario_core::{AccessMode, CommittedRegion, OpenMode};
use tracing::{debug, warn};

use crate::comm::Communicator;
use crate::{Error, Result};

/// A worker's view: its committed region, placed `displacement` bytes into the file
#[derive(Debug, Clone)]
pub struct FileView {
    displacement: u64,
    region: CommittedRegion,
}

impl FileView {
    pub fn displacement(&self) -> u64 {
        self.displacement
    }

    pub fn region(&self) -> &CommittedRegion {
        &self.region
    }

    /// Absolute file offset one past the last byte this worker touches
    fn local_end(&self) -> u64 {
        self.region
            .runs()
            .last()
            .map_or(self.displacement, |run| self.displacement + run.end())
    }
}

/// One worker's handle on a file shared by the whole group
#[derive(Debug)]
pub struct CollectiveFile {
    comm: Arc<dyn Communicator>,
    path: PathBuf,
    mode: OpenMode,
    file: File,
    position: u64,
    view: Option<FileView>,
}

impl CollectiveFile {
    /// Open `path` on every worker of the group
    ///
    /// With [`AccessMode::Create`] only rank 0 creates the file; the others
    /// open it once rank 0 has succeeded.
    pub fn open(comm: Arc<dyn Communicator>, path: impl AsRef<Path>, mode: OpenMode) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let creating = mode.contains(AccessMode::Create);

        let mut local = None;
        if creating {
            let created = (comm.rank() == 0).then(|| open_local(&path, mode, true));
            let ok = created.as_ref().map_or(true, |r| r.is_ok());
            if !comm.all_true(ok) {
                return Err(collective_failure(&*comm, "open", created));
            }
            local = created;
        }
        let local = match local {
            Some(file) => file,
            None => open_local(&path, mode, false),
        };
        if !comm.all_true(local.is_ok()) {
            return Err(collective_failure(&*comm, "open", Some(local)));
        }
        let file = local?;

        let position = if mode.contains(AccessMode::Append) {
            file.metadata().map_err(Error::io("stat"))?.len()
        } else {
            0
        };
        debug!(rank = comm.rank(), path = %path.display(), %mode, "opened collective file");
        Ok(Self {
            comm,
            path,
            mode,
            file,
            position,
            view: None,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    pub fn view(&self) -> Option<&FileView> {
        self.view.as_ref()
    }

    /// Individual file pointer in bytes, relative to the start of the view
    ///
    /// Collective reads and writes are anchored at the view and leave it
    /// unchanged. Setting a view resets it to zero.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Current file length as seen by this worker
    pub fn len(&self) -> Result<u64> {
        Ok(self.file.metadata().map_err(Error::io("stat"))?.len())
    }

    /// Restrict subsequent transfers to `region`, starting `displacement`
    /// bytes into the file
    pub fn set_view(&mut self, displacement: u64, region: CommittedRegion) {
        debug!(
            rank = self.comm.rank(),
            displacement,
            runs = region.runs().len(),
            bytes = region.local_bytes(),
            "set file view"
        );
        self.position = 0;
        self.view = Some(FileView {
            displacement,
            region,
        });
    }

    /// Fail on every worker unless the file holds at least `required` bytes
    /// on every worker
    pub fn ensure_len(&self, required: u64) -> Result<()> {
        let local = self.len().and_then(|len| {
            if len < required {
                Err(short_file(len, required))
            } else {
                Ok(())
            }
        });
        self.agree("size check", local)
    }

    /// Collective read of exactly this worker's view into `buf`
    pub fn read_all(&mut self, buf: &mut [u8]) -> Result<()> {
        if !self.mode.is_readable() {
            return Err(Error::InvalidOperation("file not opened for reading"));
        }
        let view = checked_view(self.view.as_ref(), buf.len())?;
        let local = read_runs(&self.file, view, buf);
        if local.is_ok() {
            debug!(rank = self.comm.rank(), bytes = buf.len(), "collective read");
        }
        self.agree("read", local)
    }

    /// Collective write of `buf` into exactly this worker's view
    pub fn write_all(&mut self, buf: &[u8]) -> Result<()> {
        if !self.mode.is_writable() {
            return Err(Error::InvalidOperation("file not opened for writing"));
        }
        let view = checked_view(self.view.as_ref(), buf.len())?;
        let displacement = view.displacement;
        let mut local = Ok(());
        let mut consumed = 0usize;
        for run in view.region.runs() {
            let len = run.len as usize;
            let chunk = &buf[consumed..consumed + len];
            consumed += len;
            local = self
                .file
                .seek(SeekFrom::Start(displacement + run.offset))
                .and_then(|_| self.file.write_all(chunk))
                .map_err(Error::io("write"));
            if local.is_err() {
                break;
            }
        }
        if local.is_ok() {
            debug!(rank = self.comm.rank(), bytes = buf.len(), "collective write");
        }
        self.agree("write", local)
    }

    /// Collectively close the file, removing it when opened with
    /// [`AccessMode::DeleteOnClose`]
    pub fn close(self) -> Result<()> {
        let Self {
            comm,
            path,
            mode,
            file,
            ..
        } = self;
        let local = if mode.is_writable() {
            file.sync_all().map_err(Error::io("close"))
        } else {
            Ok(())
        };
        drop(file);
        // Every handle is gone before the file can be unlinked
        comm.barrier();

        let local = local.and_then(|()| {
            if mode.contains(AccessMode::DeleteOnClose) && comm.rank() == 0 {
                fs::remove_file(&path).map_err(Error::io("delete on close"))
            } else {
                Ok(())
            }
        });
        if comm.all_true(local.is_ok()) {
            debug!(rank = comm.rank(), path = %path.display(), "closed collective file");
            Ok(())
        } else {
            Err(collective_failure(&*comm, "close", Some(local)))
        }
    }

    fn agree(&self, operation: &'static str, local: Result<()>) -> Result<()> {
        if self.comm.all_true(local.is_ok()) {
            Ok(())
        } else {
            Err(collective_failure(&*self.comm, operation, Some(local)))
        }
    }
}

fn checked_view(view: Option<&FileView>, len: usize) -> Result<&FileView> {
    let view = view.ok_or(Error::InvalidOperation("no file view set"))?;
    let expected = view.region.local_bytes();
    if len as u64 != expected {
        return Err(Error::InvalidArgument(format!(
            "buffer holds {len} bytes but the view selects {expected}"
        )));
    }
    Ok(view)
}

fn open_local(path: &Path, mode: OpenMode, creating: bool) -> Result<File> {
    let mut options = OpenOptions::new();
    options.read(mode.is_readable()).write(mode.is_writable());
    if creating {
        if mode.contains(AccessMode::Exclusive) {
            options.create_new(true);
        } else {
            options.create(true);
        }
    }
    options.open(path).map_err(Error::io("open"))
}

fn read_runs(file: &File, view: &FileView, buf: &mut [u8]) -> Result<()> {
    if buf.is_empty() {
        return Ok(());
    }
    let len = file.metadata().map_err(Error::io("stat"))?.len();
    let required = view.local_end();
    if len < required {
        return Err(short_file(len, required));
    }

    // SAFETY: the map is read-only and only lives for this call. Regions of
    // different workers are disjoint, so no peer writes the mapped bytes.
    let map = unsafe { Mmap::map(file) }.map_err(Error::io("map"))?;
    let mut filled = 0usize;
    for run in view.region.runs() {
        let start = (view.displacement + run.offset) as usize;
        let len = run.len as usize;
        buf[filled..filled + len].copy_from_slice(&map[start..start + len]);
        filled += len;
    }
    Ok(())
}

fn short_file(len: u64, required: u64) -> Error {
    Error::Io {
        context: "read",
        source: io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("file holds {len} bytes, {required} required"),
        ),
    }
}

/// Error reported by a worker once the group disagreed on success
fn collective_failure<T>(
    comm: &dyn Communicator,
    operation: &'static str,
    local: Option<Result<T>>,
) -> Error {
    match local {
        Some(Err(e)) => {
            warn!(rank = comm.rank(), operation, error = %e, "collective operation failed");
            e
        }
        _ => Error::Collective {
            operation,
            rank: comm.rank(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comm::SelfComm;
    use pario_core::{Decomposition, ElementType, Order, Subarray};

    fn whole(shape: &[usize]) -> CommittedRegion {
        Subarray::new(Decomposition::whole(shape).unwrap(), ElementType::U8, Order::C)
            .unwrap()
            .commit()
    }

    #[test]
    fn test_write_then_read_through_view() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.bin");
        let comm: Arc<dyn Communicator> = Arc::new(SelfComm);

        let mode = OpenMode::from_flags(&[AccessMode::Create, AccessMode::ReadWrite]).unwrap();
        let mut file = CollectiveFile::open(comm.clone(), &path, mode).unwrap();
        file.set_view(4, whole(&[2, 3]));
        file.write_all(&[1, 2, 3, 4, 5, 6]).unwrap();
        assert_eq!(file.len().unwrap(), 10);

        let mut back = [0u8; 6];
        file.read_all(&mut back).unwrap();
        assert_eq!(back, [1, 2, 3, 4, 5, 6]);
        assert_eq!(file.position(), 0);
        file.close().unwrap();
        assert_eq!(fs::read(&path).unwrap()[4..], [1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_short_file_is_eof() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short.bin");
        fs::write(&path, [0u8; 5]).unwrap();

        let mut file = CollectiveFile::open(Arc::new(SelfComm), &path, OpenMode::READ_ONLY).unwrap();
        file.set_view(0, whole(&[8]));
        let mut buf = [0u8; 8];
        match file.read_all(&mut buf) {
            Err(Error::Io { source, .. }) => assert_eq!(source.kind(), io::ErrorKind::UnexpectedEof),
            other => panic!("expected EOF, got {other:?}"),
        }
        assert!(file.ensure_len(8).is_err());
        assert!(file.ensure_len(5).is_ok());
    }

    #[test]
    fn test_read_requires_view_and_matching_buffer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.bin");
        fs::write(&path, [7u8; 4]).unwrap();

        let mut file = CollectiveFile::open(Arc::new(SelfComm), &path, OpenMode::READ_ONLY).unwrap();
        let mut buf = [0u8; 4];
        assert!(matches!(file.read_all(&mut buf), Err(Error::InvalidOperation(_))));
        assert!(matches!(file.write_all(&buf), Err(Error::InvalidOperation(_))));

        file.set_view(0, whole(&[2]));
        assert!(matches!(file.read_all(&mut buf), Err(Error::InvalidArgument(_))));
        file.read_all(&mut buf[..2]).unwrap();
        assert_eq!(buf, [7, 7, 0, 0]);
    }

    #[test]
    fn test_exclusive_create_and_delete_on_close() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scratch.bin");
        let comm: Arc<dyn Communicator> = Arc::new(SelfComm);

        let mode = OpenMode::from_flags(&[
            AccessMode::Create,
            AccessMode::Exclusive,
            AccessMode::WriteOnly,
            AccessMode::DeleteOnClose,
        ])
        .unwrap();
        let file = CollectiveFile::open(comm.clone(), &path, mode).unwrap();
        assert!(path.exists());
        assert!(CollectiveFile::open(comm, &path, mode).is_err());
        file.close().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_append_starts_at_end() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.bin");
        fs::write(&path, [0u8; 12]).unwrap();

        let mode = OpenMode::from_flags(&[AccessMode::WriteOnly, AccessMode::Append]).unwrap();
        let file = CollectiveFile::open(Arc::new(SelfComm), &path, mode).unwrap();
        assert_eq!(file.position(), 12);
    }
}
