//! Journal entry codec.
//!
//! Every mutation that must survive the durability boundary is one entry
//! in the journal file. Entries are serialized with CRC32 checksums and
//! sentinel markers so that torn writes are detectable during replay.
//!
//! # Entry Format
//!
//! ```text
//! [ENTRY_START:u32][seq:u64][kind:u8][length:u32][payload:bytes][crc32:u32][ENTRY_END:u32]
//!        4B           8B       1B        4B          variable        4B           4B
//! ```
//!
//! All integers are little-endian. The CRC covers everything from the
//! start sentinel through the payload. If ENTRY_END is missing during
//! replay, the entry was incompletely written (power loss) and the journal
//! is truncated back to the previous entry boundary.
//!
//! # File Header
//!
//! The journal file opens with an 8-byte header:
//!
//! ```text
//! ┌───────────────────────────────────────────┐
//! │  Offset  │  Size  │  Description          │
//! ├───────────────────────────────────────────┤
//! │  0       │  4     │  Magic bytes: "BRCJ"  │
//! │  4       │  1     │  Version: 0x01        │
//! │  5       │  3     │  Reserved (zeros)     │
//! └───────────────────────────────────────────┘
//! ```

use breccia_types::RecordSeq;
use bytes::Bytes;

use crate::StoreError;

/// Magic bytes identifying a valid journal file.
pub(crate) const JOURNAL_MAGIC: &[u8; 4] = b"BRCJ";

/// Current journal file format version.
pub(crate) const JOURNAL_VERSION: u8 = 0x01;

/// Reserved header bytes for future use.
pub(crate) const JOURNAL_RESERVED: [u8; 3] = [0u8; 3];

/// Header size: magic(4) + version(1) + reserved(3) = 8 bytes.
pub(crate) const JOURNAL_HEADER_SIZE: usize = 8;

// Magic number marking the start of an entry.
const ENTRY_START: u32 = 0xB10C_FEED;

// Magic number marking the end of a completely written entry.
const ENTRY_END: u32 = 0xC105_ED42;

// Prefix size: start_sentinel(4) + seq(8) + kind(1) + length(4) = 17 bytes.
const PREFIX_SIZE: usize = 17;

/// Total overhead per entry: prefix(17) + crc(4) + end_sentinel(4) = 25 bytes.
pub(crate) const ENTRY_OVERHEAD: usize = 25;

/// What a journal entry records about the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EntryKind {
    /// A record entered the buffer; the payload is the record payload.
    Ingest,
    /// The record named by `seq` left the buffer (confirmed or evicted).
    Retire,
}

impl EntryKind {
    pub(crate) fn as_byte(self) -> u8 {
        match self {
            EntryKind::Ingest => 0x01,
            EntryKind::Retire => 0x02,
        }
    }

    pub(crate) fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(EntryKind::Ingest),
            0x02 => Some(EntryKind::Retire),
            _ => None,
        }
    }
}

/// One serialized mutation in the journal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct JournalEntry {
    seq: RecordSeq,
    kind: EntryKind,
    payload: Bytes,
}

impl JournalEntry {
    /// Creates an ingest entry carrying a record payload.
    pub(crate) fn ingest(seq: RecordSeq, payload: Bytes) -> Self {
        Self {
            seq,
            kind: EntryKind::Ingest,
            payload,
        }
    }

    /// Creates a retire entry for a confirmed or evicted record.
    pub(crate) fn retire(seq: RecordSeq) -> Self {
        Self {
            seq,
            kind: EntryKind::Retire,
            payload: Bytes::new(),
        }
    }

    pub(crate) fn seq(&self) -> RecordSeq {
        self.seq
    }

    pub(crate) fn kind(&self) -> EntryKind {
        self.kind
    }

    pub(crate) fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Serialized size of an entry with the given payload length.
    pub(crate) fn encoded_len(payload_len: usize) -> usize {
        ENTRY_OVERHEAD + payload_len
    }

    /// Serializes the entry to bytes.
    pub(crate) fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::encoded_len(self.payload.len()));
        self.write_into(&mut buf);
        buf
    }

    /// Serializes the entry onto the end of an existing buffer.
    pub(crate) fn write_into(&self, buf: &mut Vec<u8>) {
        let start = buf.len();

        // ENTRY_START sentinel (4 bytes)
        buf.extend_from_slice(&ENTRY_START.to_le_bytes());

        // seq (8 bytes)
        buf.extend_from_slice(&self.seq.as_u64().to_le_bytes());

        // kind (1 byte)
        buf.push(self.kind.as_byte());

        // length (4 bytes)
        buf.extend_from_slice(&(self.payload.len() as u32).to_le_bytes());

        // payload (variable)
        buf.extend_from_slice(&self.payload);

        // crc (4 bytes) - checksum of everything from start sentinel to payload
        let crc = crc32fast::hash(&buf[start..]);
        buf.extend_from_slice(&crc.to_le_bytes());

        // ENTRY_END sentinel (4 bytes) - absent means the write was torn
        buf.extend_from_slice(&ENTRY_END.to_le_bytes());
    }

    /// Deserializes an entry from bytes.
    ///
    /// Returns the parsed entry and the number of bytes consumed.
    ///
    /// # Errors
    ///
    /// - [`StoreError::UnexpectedEof`] if the data is truncated
    /// - [`StoreError::TornWrite`] if a sentinel is missing or corrupted
    /// - [`StoreError::InvalidEntryKind`] if the kind byte is unknown
    /// - [`StoreError::CorruptedEntry`] if the CRC doesn't match
    pub(crate) fn from_bytes(data: &Bytes) -> Result<(Self, usize), StoreError> {
        if data.len() < PREFIX_SIZE {
            return Err(StoreError::UnexpectedEof);
        }

        // Check ENTRY_START sentinel (bytes 0-3)
        let start_sentinel = u32::from_le_bytes(
            data[0..4]
                .try_into()
                .expect("slice is exactly 4 bytes after bounds check"),
        );
        if start_sentinel != ENTRY_START {
            return Err(StoreError::TornWrite {
                reason: "missing or corrupted ENTRY_START sentinel".to_string(),
            });
        }

        // Read seq (bytes 4-11)
        let seq = RecordSeq::new(u64::from_le_bytes(
            data[4..12]
                .try_into()
                .expect("slice is exactly 8 bytes after bounds check"),
        ));

        // Read kind (byte 12)
        let kind =
            EntryKind::from_byte(data[12]).ok_or(StoreError::InvalidEntryKind { byte: data[12] })?;

        // Read length (bytes 13-16)
        let length = u32::from_le_bytes(
            data[13..17]
                .try_into()
                .expect("slice is exactly 4 bytes after bounds check"),
        ) as usize;

        // Check we have enough for payload + crc(4) + end_sentinel(4)
        let total_size = PREFIX_SIZE + length + 4 + 4;
        if data.len() < total_size {
            return Err(StoreError::UnexpectedEof);
        }

        // Read payload (zero-copy slice)
        let payload = data.slice(PREFIX_SIZE..PREFIX_SIZE + length);

        // Read and verify CRC
        let crc_offset = PREFIX_SIZE + length;
        let stored_crc = u32::from_le_bytes(
            data[crc_offset..crc_offset + 4]
                .try_into()
                .expect("slice is exactly 4 bytes after bounds check"),
        );
        let computed_crc = crc32fast::hash(&data[0..crc_offset]);
        if stored_crc != computed_crc {
            return Err(StoreError::CorruptedEntry);
        }

        // Check ENTRY_END sentinel
        let end_offset = crc_offset + 4;
        let end_sentinel = u32::from_le_bytes(
            data[end_offset..end_offset + 4]
                .try_into()
                .expect("slice is exactly 4 bytes after bounds check"),
        );
        if end_sentinel != ENTRY_END {
            return Err(StoreError::TornWrite {
                reason: format!(
                    "missing or corrupted ENTRY_END sentinel for seq {}: expected {:#010x}, found {:#010x}",
                    seq.as_u64(),
                    ENTRY_END,
                    end_sentinel
                ),
            });
        }

        Ok((Self { seq, kind, payload }, total_size))
    }
}

/// Writes the journal file header into a buffer.
pub(crate) fn write_header(buf: &mut Vec<u8>) {
    buf.extend_from_slice(JOURNAL_MAGIC);
    buf.push(JOURNAL_VERSION);
    buf.extend_from_slice(&JOURNAL_RESERVED);
}

/// Validates the journal file header.
///
/// # Errors
///
/// [`StoreError::InvalidHeader`] if the magic or version doesn't match.
pub(crate) fn check_header(data: &[u8]) -> Result<(), StoreError> {
    if data.len() < JOURNAL_HEADER_SIZE {
        return Err(StoreError::InvalidHeader {
            reason: format!("file too short for header: {} bytes", data.len()),
        });
    }
    if &data[0..4] != JOURNAL_MAGIC {
        return Err(StoreError::InvalidHeader {
            reason: "bad magic bytes".to_string(),
        });
    }
    if data[4] != JOURNAL_VERSION {
        return Err(StoreError::InvalidHeader {
            reason: format!("unsupported version {:#04x}", data[4]),
        });
    }
    Ok(())
}
