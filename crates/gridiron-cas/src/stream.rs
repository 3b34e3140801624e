//! Block stream reader.
//!
//! A container is a sequence of blocks. A block whose header carries the
//! chunk-start flag opens a new chunk; the chunk runs until the next such
//! block or the end of the file.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use gridiron_common::FbGuid;
use gridiron_ebx::{decode_instance, EbxHeader, EbxInstance, TypeTable};
use tracing::{debug, warn};

use crate::block::{Block, BlockHeader};
use crate::chunk::Chunk;
use crate::decode::decompress_chunk;
use crate::{Error, Result};

/// A byte range inside a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub offset: u64,
    pub size: u64,
}

/// Export settings for read resources.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportOptions {
    /// Return resource bytes in `data`.
    pub export: bool,
    /// Export the decompressed stream instead of the stored bytes.
    pub uncompressed: bool,
}

/// What a read returns besides the resource identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadOptions {
    /// Return the instance payload in `data`.
    pub read_ebx_data: bool,
    /// Decode chunks during a full scan. When off, [`CasBlockReader::read_all`]
    /// returns nothing and callers consume [`CasBlockReader::chunks`] instead.
    pub decompress_chunks: bool,
    pub export: ExportOptions,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            read_ebx_data: false,
            decompress_chunks: true,
            export: ExportOptions::default(),
        }
    }
}

/// A resource read from a container.
#[derive(Debug, Clone, PartialEq)]
pub struct EbxResource {
    pub id: FbGuid,
    pub name: String,
    pub offset: u64,
    pub size: u64,
    /// Payload selected by [`ReadOptions`]; empty by default.
    pub data: Vec<u8>,
    /// Structured fields, when a type table was supplied.
    pub fields: Option<EbxInstance>,
}

/// Streams blocks and chunks out of a container.
pub struct CasBlockReader<R> {
    reader: R,
    path: Option<PathBuf>,
    position: u64,
}

impl CasBlockReader<BufReader<File>> {
    /// Open a container file for sequential reading.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let mut reader = Self::new(BufReader::new(file));
        reader.path = Some(path.to_path_buf());
        Ok(reader)
    }
}

impl<R: Read> CasBlockReader<R> {
    /// Wrap a reader positioned at the start of a container.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            path: None,
            position: 0,
        }
    }

    /// Offset of the next block.
    #[inline]
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Read the next block. `None` at a clean end of file.
    pub fn next_block(&mut self) -> Result<Option<Block>> {
        let offset = self.position;
        let mut header_bytes = [0u8; BlockHeader::SIZE];
        let got = read_full(&mut self.reader, &mut header_bytes)?;
        if got == 0 {
            return Ok(None);
        }
        if got < BlockHeader::SIZE {
            return Err(Error::Truncated {
                offset,
                needed: BlockHeader::SIZE,
                available: got,
            });
        }

        let header = BlockHeader::parse(&header_bytes)?;
        let mut payload = vec![0u8; header.payload_len()];
        let got = read_full(&mut self.reader, &mut payload)?;
        if got < payload.len() {
            return Err(Error::Truncated {
                offset,
                needed: payload.len(),
                available: got,
            });
        }

        self.position += (BlockHeader::SIZE + payload.len()) as u64;
        Ok(Some(Block {
            offset,
            header,
            payload,
        }))
    }

    /// Lazily group blocks into chunks.
    pub fn chunks(self) -> Chunks<R> {
        Chunks {
            reader: self,
            pending: Vec::new(),
            done: false,
        }
    }

    /// Scan the whole container and decode every chunk inline.
    ///
    /// Chunks that do not decode are skipped. Returns nothing when
    /// `decompress_chunks` is off.
    pub fn read_all(self, types: Option<&TypeTable>, options: &ReadOptions) -> Result<Vec<EbxResource>> {
        if !options.decompress_chunks {
            return Ok(Vec::new());
        }

        let path = self.path.clone();
        let mut resources = Vec::new();
        for chunk in self.chunks() {
            let chunk = chunk?;
            match decode_resource(&chunk, types, options) {
                Ok(Some(resource)) => resources.push(resource),
                Ok(None) => {}
                Err(e) => warn!(path = ?path, offset = chunk.offset, error = %e, "skipping chunk"),
            }
        }
        debug!(path = ?path, resources = resources.len(), "read container");
        Ok(resources)
    }
}

/// Iterator over the chunks of a container.
pub struct Chunks<R> {
    reader: CasBlockReader<R>,
    pending: Vec<Block>,
    done: bool,
}

impl<R: Read> Iterator for Chunks<R> {
    type Item = Result<Chunk>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        loop {
            match self.reader.next_block() {
                Ok(Some(block)) => {
                    if block.header.is_chunk_start() && !self.pending.is_empty() {
                        let chunk = Chunk::from_blocks(std::mem::take(&mut self.pending));
                        self.pending.push(block);
                        return Some(Ok(chunk));
                    }
                    self.pending.push(block);
                }
                Ok(None) => {
                    self.done = true;
                    if self.pending.is_empty() {
                        return None;
                    }
                    return Some(Ok(Chunk::from_blocks(std::mem::take(&mut self.pending))));
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

/// Parse every block in `data`, the first one located at `base_offset`.
pub fn parse_blocks(data: &[u8], base_offset: u64) -> Result<Vec<Block>> {
    let mut reader = CasBlockReader::new(data);
    let mut blocks = Vec::new();
    while let Some(mut block) = reader.next_block()? {
        block.offset += base_offset;
        blocks.push(block);
    }
    Ok(blocks)
}

/// Read the single resource stored at `range`.
///
/// Every block inside the range belongs to one chunk. The returned resource
/// reports the requested offset and size. Ranged reads always decompress.
pub fn read_range<P: AsRef<Path>>(
    path: P,
    range: ByteRange,
    types: Option<&TypeTable>,
    options: &ReadOptions,
) -> Result<EbxResource> {
    let path = path.as_ref();
    let mut file = File::open(path)?;
    file.seek(SeekFrom::Start(range.offset))?;

    // Sizes come from the cache; never reserve more than the file holds.
    let available = file.metadata()?.len().saturating_sub(range.offset);
    let mut data = Vec::with_capacity(range.size.min(available) as usize);
    file.take(range.size).read_to_end(&mut data)?;
    if (data.len() as u64) < range.size {
        return Err(Error::Truncated {
            offset: range.offset,
            needed: range.size as usize,
            available: data.len(),
        });
    }

    let chunk = Chunk::from_blocks(parse_blocks(&data, range.offset)?);
    let options = ReadOptions {
        decompress_chunks: true,
        ..*options
    };
    let mut resource = decode_resource(&chunk, types, &options)?
        .ok_or(Error::NoResource { offset: range.offset })?;
    resource.offset = range.offset;
    resource.size = range.size;

    debug!(path = %path.display(), offset = range.offset, size = range.size, name = %resource.name, "ranged read");
    Ok(resource)
}

fn decode_resource(
    chunk: &Chunk,
    types: Option<&TypeTable>,
    options: &ReadOptions,
) -> Result<Option<EbxResource>> {
    let Some(stream) = decompress_chunk(chunk) else {
        return Ok(None);
    };
    let header = EbxHeader::parse(&stream)?;
    let payload = header.payload(&stream);

    let fields = match types {
        Some(table) => Some(decode_instance(table, header.root_type_hash, payload)?),
        None => None,
    };

    let data = if options.export.export {
        if options.export.uncompressed {
            stream.clone()
        } else {
            chunk.stored_bytes()
        }
    } else if options.read_ebx_data {
        payload.to_vec()
    } else {
        Vec::new()
    };

    Ok(Some(EbxResource {
        id: header.guid,
        name: header.name,
        offset: chunk.offset,
        size: chunk.size_in_container,
        data,
        fields,
    }))
}

/// Read until `buf` is full or the reader is exhausted.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BlockWriter;
    use gridiron_ebx::{EbxBuilder, EbxFieldType, EbxValue, SharedTypeWriter};
    use gridiron_common::hash::hash_str;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    fn partition(name: &str, type_hash: u32, payload: &[u8]) -> Vec<u8> {
        EbxBuilder::new(name, FbGuid::EMPTY, type_hash).payload(payload).build()
    }

    fn container() -> (Vec<u8>, Vec<u64>) {
        let mut writer = BlockWriter::new();
        let a = writer.write_zstd(&partition("Sound/A", 0, &[1; 40]), true).unwrap();
        let b = writer
            .write_zstd_chunk(&partition("Sound/B", 0, &[2; 300]), 100)
            .unwrap();
        let c = writer.write_stored(b"stored chunk", true).unwrap();
        (writer.into_inner(), vec![a, b, c])
    }

    #[test]
    fn test_chunks_split_on_start_flag() {
        let (data, offsets) = container();
        let chunks: Vec<Chunk> = CasBlockReader::new(Cursor::new(data.clone()))
            .chunks()
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks.iter().map(|c| c.offset).collect::<Vec<_>>(), offsets);
        assert_eq!(chunks[0].blocks.len(), 1);
        assert!(chunks[1].blocks.len() > 1);
        assert_eq!(chunks[1].size_in_container, offsets[2] - offsets[1]);
        assert_eq!(chunks[2].offset + chunks[2].size_in_container, data.len() as u64);
    }

    #[test]
    fn test_empty_container() {
        let mut chunks = CasBlockReader::new(Cursor::new(Vec::new())).chunks();
        assert!(chunks.next().is_none());
    }

    #[test]
    fn test_truncated_block_is_an_error_then_stops() {
        let (mut data, _) = container();
        data.truncate(data.len() - 3);
        let results: Vec<_> = CasBlockReader::new(Cursor::new(data)).chunks().collect();
        assert!(matches!(results.last(), Some(Err(Error::Truncated { .. }))));
    }

    #[test]
    fn test_read_all_skips_undecodable_chunks() {
        let (data, offsets) = container();
        let resources = CasBlockReader::new(Cursor::new(data))
            .read_all(None, &ReadOptions::default())
            .unwrap();

        assert_eq!(resources.len(), 2);
        assert_eq!(resources[0].name, "Sound/A");
        assert_eq!(resources[1].name, "Sound/B");
        assert_eq!(resources[1].offset, offsets[1]);
        assert!(resources[0].data.is_empty());
        assert!(resources[0].fields.is_none());
    }

    #[test]
    fn test_read_all_without_decompression() {
        let (data, _) = container();
        let options = ReadOptions {
            decompress_chunks: false,
            ..Default::default()
        };
        let resources = CasBlockReader::new(Cursor::new(data)).read_all(None, &options).unwrap();
        assert!(resources.is_empty());
    }

    #[test]
    fn test_read_range_matches_full_scan() {
        let (data, offsets) = container();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, &data).unwrap();

        let scanned = CasBlockReader::open(file.path())
            .unwrap()
            .read_all(None, &ReadOptions::default())
            .unwrap();
        let b = &scanned[1];

        let range = ByteRange {
            offset: b.offset,
            size: b.size,
        };
        let ranged = read_range(file.path(), range, None, &ReadOptions::default()).unwrap();
        assert_eq!(ranged.name, b.name);
        assert_eq!(ranged.offset, offsets[1]);
        assert_eq!(ranged.size, b.size);
    }

    #[test]
    fn test_read_range_data_options() {
        let payload = [9u8; 64];
        let ebx = partition("Sound/X", 0, &payload);
        let mut writer = BlockWriter::new();
        writer.write_zstd(&ebx, true).unwrap();
        let data = writer.into_inner();

        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, &data).unwrap();
        let range = ByteRange {
            offset: 0,
            size: data.len() as u64,
        };

        let bare = read_range(file.path(), range, None, &ReadOptions::default()).unwrap();
        assert!(bare.data.is_empty());

        let with_data = ReadOptions {
            read_ebx_data: true,
            ..Default::default()
        };
        assert_eq!(read_range(file.path(), range, None, &with_data).unwrap().data, payload);

        let uncompressed = ReadOptions {
            export: ExportOptions {
                export: true,
                uncompressed: true,
            },
            ..Default::default()
        };
        assert_eq!(read_range(file.path(), range, None, &uncompressed).unwrap().data, ebx);

        let stored = ReadOptions {
            export: ExportOptions {
                export: true,
                uncompressed: false,
            },
            ..Default::default()
        };
        assert_eq!(read_range(file.path(), range, None, &stored).unwrap().data, data);
    }

    #[test]
    fn test_read_range_with_types_decodes_fields() {
        let mut types = SharedTypeWriter::new();
        let t = types.add_type("SoundAsset", EbxFieldType::Struct, 8, 4);
        types.add_field(t, "Volume", EbxFieldType::Float32, 0, 0);
        types.add_field(t, "Loop", EbxFieldType::Boolean, 4, 0);
        let table = TypeTable::from_records(types.records());

        let mut payload = 0.75f32.to_le_bytes().to_vec();
        payload.extend_from_slice(&[1, 0, 0, 0]);
        let mut writer = BlockWriter::new();
        writer
            .write_zstd(&partition("Sound/X", hash_str("SoundAsset"), &payload), true)
            .unwrap();
        let data = writer.into_inner();

        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, &data).unwrap();
        let range = ByteRange {
            offset: 0,
            size: data.len() as u64,
        };

        let resource = read_range(file.path(), range, Some(&table), &ReadOptions::default()).unwrap();
        let fields = resource.fields.unwrap();
        assert_eq!(fields.type_name, "SoundAsset");
        assert_eq!(fields.get("Volume"), Some(&EbxValue::Float32(0.75)));
        assert_eq!(fields.get("Loop"), Some(&EbxValue::Bool(true)));
    }

    #[test]
    fn test_read_range_past_end() {
        let (data, _) = container();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, &data).unwrap();

        let range = ByteRange {
            offset: 0,
            size: data.len() as u64 + 10,
        };
        assert!(matches!(
            read_range(file.path(), range, None, &ReadOptions::default()),
            Err(Error::Truncated { .. })
        ));
    }

    #[test]
    fn test_read_range_with_absurd_size() {
        let (data, _) = container();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, &data).unwrap();

        let range = ByteRange {
            offset: 8,
            size: u64::MAX / 2,
        };
        match read_range(file.path(), range, None, &ReadOptions::default()) {
            Err(Error::Truncated { available, .. }) => assert_eq!(available, data.len() - 8),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_read_range_on_stored_chunk() {
        let (data, offsets) = container();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut file, &data).unwrap();

        let range = ByteRange {
            offset: offsets[2],
            size: data.len() as u64 - offsets[2],
        };
        assert!(matches!(
            read_range(file.path(), range, None, &ReadOptions::default()),
            Err(Error::NoResource { .. })
        ));
    }
}
