//! Binary format of WAL records
//!
//! Every record is a fixed 32-byte header followed by a payload:
//!
//! ```text
//! RecordHeader (32) | payload
//!
//! payload (Put / Delete): key_len u16 | value_len u32 | op u8 | pad u8 | key | value
//! payload (Batch):        count u32 | op payload * count
//! ```
//!
//! A batch is one record with one checksum, which is what makes batch replay
//! all-or-nothing.

use std::path::PathBuf;

use crate::config::Config;
use crate::error::{EngineError, EngineResult};

/// Magic bytes identifying a record start: "BRRW"
pub const MAGIC_ARRAY: [u8; 4] = *b"BRRW";

/// Header size in bytes
pub const HEADER_SIZE: usize = 32;

/// Fixed part of a single-op payload: key_len + value_len + op + pad
const OP_FIXED_SIZE: usize = 2 + 4 + 1 + 1;

/// Record kinds, stored in the header and in each op payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RecordType {
    Put = 1,
    Delete = 2,
    Batch = 3,
}

impl RecordType {
    fn from_u8(b: u8) -> Option<Self> {
        match b {
            1 => Some(RecordType::Put),
            2 => Some(RecordType::Delete),
            3 => Some(RecordType::Batch),
            _ => None,
        }
    }
}

/// One mutation, either applied alone or as part of an atomic batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOp {
    Put { key: Vec<u8>, value: Vec<u8> },
    Delete { key: Vec<u8> },
}

impl BatchOp {
    pub fn key(&self) -> &[u8] {
        match self {
            BatchOp::Put { key, .. } | BatchOp::Delete { key } => key,
        }
    }

    fn value(&self) -> &[u8] {
        match self {
            BatchOp::Put { value, .. } => value,
            BatchOp::Delete { .. } => &[],
        }
    }

    fn record_type(&self) -> RecordType {
        match self {
            BatchOp::Put { .. } => RecordType::Put,
            BatchOp::Delete { .. } => RecordType::Delete,
        }
    }

    /// Bytes this op occupies inside a payload.
    pub fn encoded_len(&self) -> usize {
        OP_FIXED_SIZE + self.key().len() + self.value().len()
    }
}

/// Fixed-size header for each WAL record
///
/// Layout:
///   [0..4]   magic:       "BRRW"
///   [4..8]   length:      u32 LE payload length
///   [8..12]  checksum:    u32 LE CRC32C of the payload
///   [12]     record_type: u8
///   [13..32] reserved, zero
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    pub magic: [u8; 4],
    pub length: u32,
    pub checksum: u32,
    pub record_type: u8,
}

impl RecordHeader {
    fn new(length: u32, checksum: u32, record_type: RecordType) -> Self {
        Self {
            magic: MAGIC_ARRAY,
            length,
            checksum,
            record_type: record_type as u8,
        }
    }

    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..4].copy_from_slice(&self.magic);
        buf[4..8].copy_from_slice(&self.length.to_le_bytes());
        buf[8..12].copy_from_slice(&self.checksum.to_le_bytes());
        buf[12] = self.record_type;
        buf
    }

    pub fn from_bytes(bytes: &[u8; HEADER_SIZE]) -> Self {
        Self {
            magic: [bytes[0], bytes[1], bytes[2], bytes[3]],
            length: u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
            checksum: u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]),
            record_type: bytes[12],
        }
    }
}

/// A decoded record: its header and the ops it carries, in order.
#[derive(Debug, Clone)]
pub struct WalRecord {
    pub header: RecordHeader,
    pub ops: Vec<BatchOp>,
}

fn write_op(buf: &mut Vec<u8>, op: &BatchOp) {
    let key = op.key();
    let value = op.value();
    buf.extend_from_slice(&(key.len() as u16).to_le_bytes());
    buf.extend_from_slice(&(value.len() as u32).to_le_bytes());
    buf.push(op.record_type() as u8);
    buf.push(0);
    buf.extend_from_slice(key);
    buf.extend_from_slice(value);
}

/// Encode `ops` as one WAL record.
///
/// A single op is written as a Put/Delete record; anything else becomes a
/// Batch record. Limits are checked for every op before anything is built.
pub fn encode_record(ops: &[BatchOp], config: &Config) -> EngineResult<Vec<u8>> {
    for op in ops {
        config.check_entry(op.key(), op.value())?;
    }

    let (record_type, payload) = match ops {
        [single] => {
            let mut payload = Vec::with_capacity(single.encoded_len());
            write_op(&mut payload, single);
            (single.record_type(), payload)
        }
        _ => {
            let body: usize = ops.iter().map(BatchOp::encoded_len).sum();
            let mut payload = Vec::with_capacity(4 + body);
            payload.extend_from_slice(&(ops.len() as u32).to_le_bytes());
            for op in ops {
                write_op(&mut payload, op);
            }
            (RecordType::Batch, payload)
        }
    };

    if payload.len() > u32::MAX as usize {
        return Err(EngineError::OversizedEntry {
            entry_size: payload.len() as u64,
            max_size: u32::MAX as u64,
            component: "value",
        });
    }

    let checksum = crc32c::crc32c(&payload);
    let header = RecordHeader::new(payload.len() as u32, checksum, record_type);

    let mut buffer = Vec::with_capacity(HEADER_SIZE + payload.len());
    buffer.extend_from_slice(&header.to_bytes());
    buffer.extend_from_slice(&payload);
    Ok(buffer)
}

fn corrupted(offset: usize, reason: String) -> EngineError {
    EngineError::WalCorrupted {
        path: PathBuf::from("<buffer>"),
        offset: offset as u64,
        reason,
    }
}

/// Parse one op starting at `payload[at..]`; returns the op and the offset
/// just past it.
fn read_op(payload: &[u8], at: usize) -> EngineResult<(BatchOp, usize)> {
    if payload.len() < at + OP_FIXED_SIZE {
        return Err(corrupted(at, "payload too short for op header".into()));
    }
    let key_len = u16::from_le_bytes([payload[at], payload[at + 1]]) as usize;
    let value_len = u32::from_le_bytes([
        payload[at + 2],
        payload[at + 3],
        payload[at + 4],
        payload[at + 5],
    ]) as usize;
    let op_type = payload[at + 6];

    let key_start = at + OP_FIXED_SIZE;
    let key_end = key_start + key_len;
    let value_end = key_end + value_len;
    if payload.len() < value_end {
        return Err(corrupted(
            at,
            format!(
                "payload too short: need {} bytes for key({}) + value({})",
                value_end, key_len, value_len
            ),
        ));
    }

    let key = payload[key_start..key_end].to_vec();
    let op = match RecordType::from_u8(op_type) {
        Some(RecordType::Put) => BatchOp::Put {
            key,
            value: payload[key_end..value_end].to_vec(),
        },
        Some(RecordType::Delete) => BatchOp::Delete { key },
        _ => {
            return Err(corrupted(at + 6, format!("invalid op type: {}", op_type)));
        }
    };
    Ok((op, value_end))
}

/// Decode one record from the front of `data`.
pub fn decode_record(data: &[u8]) -> EngineResult<WalRecord> {
    let Some(header_bytes) = data.get(..HEADER_SIZE) else {
        return Err(corrupted(
            0,
            format!(
                "record too short: {} bytes, need at least {}",
                data.len(),
                HEADER_SIZE
            ),
        ));
    };
    let mut raw = [0u8; HEADER_SIZE];
    raw.copy_from_slice(header_bytes);
    let header = RecordHeader::from_bytes(&raw);

    if header.magic != MAGIC_ARRAY {
        return Err(EngineError::NoMagicFound {
            path: PathBuf::from("<buffer>"),
            offset: 0,
            found_bytes: header.magic,
        });
    }

    let payload_end = HEADER_SIZE + header.length as usize;
    if data.len() < payload_end {
        return Err(EngineError::TornWrite {
            path: PathBuf::from("<buffer>"),
            expected_size: header.length,
            available_bytes: (data.len() - HEADER_SIZE) as u64,
            offset: HEADER_SIZE as u64,
        });
    }

    let payload = &data[HEADER_SIZE..payload_end];
    let computed = crc32c::crc32c(payload);
    if computed != header.checksum {
        return Err(EngineError::ChecksumMismatch {
            path: PathBuf::from("<buffer>"),
            expected: header.checksum,
            actual: computed,
            offset: HEADER_SIZE as u64,
        });
    }

    let ops = match RecordType::from_u8(header.record_type) {
        Some(RecordType::Put) | Some(RecordType::Delete) => {
            let (op, end) = read_op(payload, 0)?;
            if end != payload.len() {
                return Err(corrupted(end, "trailing bytes after op".into()));
            }
            vec![op]
        }
        Some(RecordType::Batch) => {
            if payload.len() < 4 {
                return Err(corrupted(0, "batch payload missing count".into()));
            }
            let count =
                u32::from_le_bytes([payload[0], payload[1], payload[2], payload[3]]) as usize;
            // Each op needs at least OP_FIXED_SIZE bytes; bound the allocation.
            let mut ops = Vec::with_capacity(count.min(payload.len() / OP_FIXED_SIZE));
            let mut at = 4;
            for _ in 0..count {
                let (op, next) = read_op(payload, at)?;
                ops.push(op);
                at = next;
            }
            if at != payload.len() {
                return Err(corrupted(at, "trailing bytes after batch".into()));
            }
            ops
        }
        None => {
            return Err(corrupted(
                12,
                format!("invalid record type: {}", header.record_type),
            ));
        }
    };

    Ok(WalRecord { header, ops })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn put(k: &[u8], v: &[u8]) -> BatchOp {
        BatchOp::Put {
            key: k.to_vec(),
            value: v.to_vec(),
        }
    }

    #[test]
    fn test_single_put_uses_put_record() {
        let bytes = encode_record(&[put(b"k", b"v")], &Config::default()).unwrap();
        let record = decode_record(&bytes).unwrap();
        assert_eq!(record.header.record_type, RecordType::Put as u8);
        assert_eq!(record.header.magic, MAGIC_ARRAY);
        assert_eq!(record.ops, vec![put(b"k", b"v")]);
    }

    #[test]
    fn test_batch_preserves_order() {
        let ops = vec![
            put(b"x", b"1"),
            BatchOp::Delete { key: b"x".to_vec() },
            put(b"x", b"2"),
            put(b"empty", b""),
        ];
        let bytes = encode_record(&ops, &Config::default()).unwrap();
        let record = decode_record(&bytes).unwrap();
        assert_eq!(record.header.record_type, RecordType::Batch as u8);
        assert_eq!(record.ops, ops);
    }

    #[test]
    fn test_oversized_key_rejected() {
        let config = Config::default().with_max_key_size(8);
        let result = encode_record(&[put(&[0u8; 9], b"v")], &config);
        assert!(matches!(
            result,
            Err(EngineError::OversizedEntry { component: "key", .. })
        ));
    }

    #[test]
    fn test_oversized_value_in_batch_rejects_whole_batch() {
        let config = Config::default().with_max_value_size(4);
        let ops = vec![put(b"a", b"ok"), put(b"b", b"too long")];
        assert!(matches!(
            encode_record(&ops, &config),
            Err(EngineError::OversizedEntry { component: "value", .. })
        ));
    }

    #[test]
    fn test_corrupted_magic_detected() {
        let mut data = encode_record(&[put(b"key", b"value")], &Config::default()).unwrap();
        data[0] = 0xFF;
        assert!(matches!(
            decode_record(&data),
            Err(EngineError::NoMagicFound { .. })
        ));
    }

    #[test]
    fn test_corrupted_payload_detected() {
        let mut data = encode_record(&[put(b"key", b"value")], &Config::default()).unwrap();
        let last = data.len() - 1;
        data[last] ^= 0xFF;
        assert!(matches!(
            decode_record(&data),
            Err(EngineError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_truncated_record_is_torn() {
        let data = encode_record(&[put(b"key", b"value")], &Config::default()).unwrap();
        let truncated = &data[..data.len() - 2];
        assert!(matches!(
            decode_record(truncated),
            Err(EngineError::TornWrite { .. })
        ));
    }
}
