//! Decomposition-aware collective file channel
//!
//! A [`CollectiveFileChannel`] ties a shared file to the decomposer of a
//! process group. Each `load` reads precisely the calling worker's brick of
//! the global array: bricks of different workers never overlap and together
//! cover the whole payload.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytemuck::Zeroable;
use pario_core::{
    CommittedRegion, Decomposer, Decomposition, Element, ElementType, NpyHeader, OpenMode, Order,
    Subarray,
};
use tracing::trace;

use crate::comm::Communicator;
use crate::config::ChannelConfig;
use crate::file::CollectiveFile;
use crate::group::ProcessGroup;
use crate::{Error, Result};

/// One worker's brick of a global array, stored row-major
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct LocalArray<T: Element> {
    data: Vec<T>,
    decomposition: Decomposition,
}

impl<T: Element> LocalArray<T> {
    fn new(data: Vec<T>, decomposition: Decomposition) -> Self {
        debug_assert_eq!(data.len(), decomposition.local_len());
        Self {
            data,
            decomposition,
        }
    }

    /// Wrap a complete array owned by a single worker
    pub fn whole(data: Vec<T>, shape: &[usize]) -> Result<Self> {
        let decomposition = Decomposition::whole(shape)?;
        if data.len() != decomposition.local_len() {
            return Err(Error::InvalidArgument(format!(
                "{} elements do not fill shape {shape:?}",
                data.len()
            )));
        }
        Ok(Self::new(data, decomposition))
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn into_data(self) -> Vec<T> {
        self.data
    }

    /// Local extent of each axis
    pub fn shape(&self) -> &[usize] {
        &self.decomposition.subsizes
    }

    /// Global index of the first local element on each axis
    pub fn starts(&self) -> &[usize] {
        &self.decomposition.starts
    }

    pub fn global_shape(&self) -> &[usize] {
        &self.decomposition.sizes
    }

    pub fn decomposition(&self) -> &Decomposition {
        &self.decomposition
    }

    /// Whether this brick is the entire global array
    pub fn is_whole(&self) -> bool {
        self.decomposition.subsizes == self.decomposition.sizes
    }

    /// Element at a local multi-index
    pub fn get(&self, index: &[usize]) -> Option<&T> {
        let shape = self.shape();
        if index.len() != shape.len() {
            return None;
        }
        let mut flat = 0;
        for (&i, &n) in index.iter().zip(shape) {
            if i >= n {
                return None;
            }
            flat = flat * n + i;
        }
        self.data.get(flat)
    }

    /// Element at a global multi-index, if this worker owns it
    pub fn get_global(&self, index: &[usize]) -> Option<&T> {
        if !self.decomposition.contains(index) {
            return None;
        }
        let local: Vec<usize> = index.iter().zip(self.starts()).map(|(i, s)| i - s).collect();
        self.get(&local)
    }
}

/// Local brick whose element type is only known at run time
///
/// Serializes tagged by element type, e.g. `{"F32": {"data": .., "decomposition": ..}}`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum DynamicArray {
    I8(LocalArray<i8>),
    I16(LocalArray<i16>),
    I32(LocalArray<i32>),
    I64(LocalArray<i64>),
    U8(LocalArray<u8>),
    U16(LocalArray<u16>),
    U32(LocalArray<u32>),
    U64(LocalArray<u64>),
    F32(LocalArray<f32>),
    F64(LocalArray<f64>),
}

macro_rules! dispatch {
    ($self:expr, $array:ident => $body:expr) => {
        match $self {
            DynamicArray::I8($array) => $body,
            DynamicArray::I16($array) => $body,
            DynamicArray::I32($array) => $body,
            DynamicArray::I64($array) => $body,
            DynamicArray::U8($array) => $body,
            DynamicArray::U16($array) => $body,
            DynamicArray::U32($array) => $body,
            DynamicArray::U64($array) => $body,
            DynamicArray::F32($array) => $body,
            DynamicArray::F64($array) => $body,
        }
    };
}

impl DynamicArray {
    pub fn element_type(&self) -> ElementType {
        match self {
            DynamicArray::I8(_) => ElementType::I8,
            DynamicArray::I16(_) => ElementType::I16,
            DynamicArray::I32(_) => ElementType::I32,
            DynamicArray::I64(_) => ElementType::I64,
            DynamicArray::U8(_) => ElementType::U8,
            DynamicArray::U16(_) => ElementType::U16,
            DynamicArray::U32(_) => ElementType::U32,
            DynamicArray::U64(_) => ElementType::U64,
            DynamicArray::F32(_) => ElementType::F32,
            DynamicArray::F64(_) => ElementType::F64,
        }
    }

    /// Number of local elements
    pub fn len(&self) -> usize {
        dispatch!(self, a => a.data().len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn decomposition(&self) -> &Decomposition {
        dispatch!(self, a => a.decomposition())
    }

    /// Raw native-endian bytes of the local brick
    pub fn as_bytes(&self) -> &[u8] {
        dispatch!(self, a => bytemuck::cast_slice(a.data()))
    }
}

#[derive(Debug)]
enum State {
    Closed,
    Open(CollectiveFile),
}

/// Collective reader of one shared array file
#[derive(Debug)]
pub struct CollectiveFileChannel {
    comm: Arc<dyn Communicator>,
    decomposer: Decomposer,
    path: PathBuf,
    config: ChannelConfig,
    state: State,
}

impl CollectiveFileChannel {
    /// Channel over `path`, decomposing arrays the way `group`'s topology dictates
    pub fn new(path: impl AsRef<Path>, group: &ProcessGroup) -> Result<Self> {
        Self::with_config(path, group, ChannelConfig::default())
    }

    pub fn with_config(
        path: impl AsRef<Path>,
        group: &ProcessGroup,
        config: ChannelConfig,
    ) -> Result<Self> {
        Ok(Self {
            comm: Arc::clone(group.comm()),
            decomposer: Decomposer::for_topology(group.topology())?,
            path: path.as_ref().to_path_buf(),
            config,
            state: State::Closed,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    pub fn decomposer(&self) -> &Decomposer {
        &self.decomposer
    }

    /// Mode the channel is currently open with
    pub fn mode(&self) -> Option<OpenMode> {
        match &self.state {
            State::Open(file) => Some(file.mode()),
            State::Closed => None,
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, State::Open(_))
    }

    /// Collectively open with a raw access-mode word
    ///
    /// The word is validated before the file system is touched.
    pub fn open(&mut self, bits: u32) -> Result<()> {
        let mode = OpenMode::from_bits(bits)?;
        self.open_mode(mode)
    }

    pub fn open_mode(&mut self, mode: OpenMode) -> Result<()> {
        if self.is_open() {
            return Err(Error::InvalidOperation("channel is already open"));
        }
        let file = CollectiveFile::open(Arc::clone(&self.comm), &self.path, mode)?;
        self.state = State::Open(file);
        Ok(())
    }

    /// Collectively read this worker's brick of a row-major array of shape
    /// `domain` stored `header_offset` bytes past the current position
    ///
    /// A closed channel is opened with the configured read mode first.
    pub fn load<T: Element>(
        &mut self,
        domain: &[usize],
        order: Order,
        header_offset: u64,
    ) -> Result<LocalArray<T>> {
        order.require_row_major()?;
        let region = self.region(domain, T::ELEMENT_TYPE, order)?;

        if !self.is_open() {
            let mode = self.config.read_mode;
            self.open_mode(mode)?;
        }
        let size_check = self.config.size_check;
        let State::Open(file) = &mut self.state else {
            return Err(Error::InvalidOperation("channel is not open"));
        };

        let displacement = file.position() + header_offset;
        if size_check {
            file.ensure_len(displacement + region.global_bytes())?;
        }

        let decomposition = region.subarray().decomposition().clone();
        let mut data = vec![T::zeroed(); region.local_len()];
        file.set_view(displacement, region);
        file.read_all(bytemuck::cast_slice_mut(&mut data))?;
        Ok(LocalArray::new(data, decomposition))
    }

    /// [`load`](Self::load) with the element type chosen at run time
    pub fn load_dynamic(
        &mut self,
        domain: &[usize],
        element: ElementType,
        order: Order,
        header_offset: u64,
    ) -> Result<DynamicArray> {
        Ok(match element {
            ElementType::I8 => DynamicArray::I8(self.load(domain, order, header_offset)?),
            ElementType::I16 => DynamicArray::I16(self.load(domain, order, header_offset)?),
            ElementType::I32 => DynamicArray::I32(self.load(domain, order, header_offset)?),
            ElementType::I64 => DynamicArray::I64(self.load(domain, order, header_offset)?),
            ElementType::U8 => DynamicArray::U8(self.load(domain, order, header_offset)?),
            ElementType::U16 => DynamicArray::U16(self.load(domain, order, header_offset)?),
            ElementType::U32 => DynamicArray::U32(self.load(domain, order, header_offset)?),
            ElementType::U64 => DynamicArray::U64(self.load(domain, order, header_offset)?),
            ElementType::F32 => DynamicArray::F32(self.load(domain, order, header_offset)?),
            ElementType::F64 => DynamicArray::F64(self.load(domain, order, header_offset)?),
        })
    }

    /// Collective write of a local brick together with its header
    ///
    /// Not supported: the global shape would first have to be agreed on by
    /// the whole group and a single worker would have to author the header.
    /// Fails without touching the file.
    pub fn save<T: Element>(&mut self, _array: &LocalArray<T>, _header: &NpyHeader) -> Result<()> {
        Err(Error::NotImplemented("collective save"))
    }

    /// Collectively close the file
    ///
    /// Closing a channel that is not open fails.
    pub fn close(&mut self) -> Result<()> {
        match std::mem::replace(&mut self.state, State::Closed) {
            State::Open(file) => file.close(),
            State::Closed => Err(Error::InvalidOperation("channel is not open")),
        }
    }

    fn region(&self, domain: &[usize], element: ElementType, order: Order) -> Result<CommittedRegion> {
        let decomposition = self.decomposer.decompose(domain)?;
        trace!(
            rank = self.comm.rank(),
            sizes = ?decomposition.sizes,
            subsizes = ?decomposition.subsizes,
            starts = ?decomposition.starts,
            "decomposed domain"
        );
        Ok(Subarray::new(decomposition, element, order)?.commit())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comm::SelfComm;

    fn single() -> ProcessGroup {
        ProcessGroup::linear(Arc::new(SelfComm)).unwrap()
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_arrays_serialize_with_their_brick() {
        let array = LocalArray::whole(vec![1u16, 2, 3, 4], &[2, 2]).unwrap();
        let value = serde_json::to_value(&array).unwrap();
        assert_eq!(value["data"], serde_json::json!([1, 2, 3, 4]));
        assert_eq!(value["decomposition"]["sizes"], serde_json::json!([2, 2]));
        assert_eq!(value["decomposition"]["starts"], serde_json::json!([0, 0]));

        let dynamic = serde_json::to_value(DynamicArray::U16(array)).unwrap();
        assert_eq!(dynamic["U16"]["data"], serde_json::json!([1, 2, 3, 4]));
    }

    #[test]
    fn test_local_array_indexing() {
        let array = LocalArray::new(
            (0..6).collect::<Vec<i32>>(),
            Decomposition {
                sizes: vec![4, 3],
                subsizes: vec![2, 3],
                starts: vec![2, 0],
            },
        );
        assert_eq!(array.get(&[1, 2]), Some(&5));
        assert_eq!(array.get(&[2, 0]), None);
        assert_eq!(array.get_global(&[2, 1]), Some(&1));
        assert_eq!(array.get_global(&[0, 0]), None);
        assert!(!array.is_whole());
        assert!(LocalArray::whole(vec![1u8; 5], &[2, 3]).is_err());
    }

    #[test]
    fn test_single_worker_load_whole_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.bin");
        let values: Vec<u16> = (0..12).collect();
        let mut bytes = vec![0xffu8; 16];
        bytes.extend_from_slice(bytemuck::cast_slice(&values));
        std::fs::write(&path, bytes).unwrap();

        let mut channel = CollectiveFileChannel::new(&path, &single()).unwrap();
        let array = channel.load::<u16>(&[3, 4], Order::C, 16).unwrap();
        assert!(array.is_whole());
        assert_eq!(array.data(), &values[..]);
        assert_eq!(channel.mode(), Some(OpenMode::READ_ONLY));

        let dynamic = channel.load_dynamic(&[3, 4], ElementType::U16, Order::C, 16).unwrap();
        assert_eq!(dynamic.element_type(), ElementType::U16);
        assert_eq!(dynamic.len(), 12);
        channel.close().unwrap();
    }

    #[test]
    fn test_size_check_rejects_truncated_payload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short.bin");
        std::fs::write(&path, [0u8; 10]).unwrap();

        let mut channel = CollectiveFileChannel::new(&path, &single()).unwrap();
        assert!(matches!(
            channel.load::<u32>(&[3], Order::C, 0),
            Err(Error::Io { .. })
        ));
    }

    #[test]
    fn test_state_machine() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.bin");
        std::fs::write(&path, [0u8; 8]).unwrap();

        let mut channel = CollectiveFileChannel::new(&path, &single()).unwrap();
        assert!(matches!(channel.close(), Err(Error::InvalidOperation(_))));
        channel.open(OpenMode::READ_ONLY.bits()).unwrap();
        assert!(matches!(
            channel.open(OpenMode::READ_ONLY.bits()),
            Err(Error::InvalidOperation(_))
        ));
        channel.close().unwrap();
        assert!(!channel.is_open());
        assert!(matches!(channel.close(), Err(Error::InvalidOperation(_))));
    }
}
