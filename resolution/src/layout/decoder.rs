//! Layout blob decoder. Reads desktop icon records from the persisted layout value.
//!
//! Blob structure (all integers little-endian):
//!
//! ```text
//! 0x00  ┌──────────────────────────────┐
//!       │ preamble                     │
//! 0x18  │ item count N (u32)           │
//! 0x1C  ├──────────────────────────────┤
//!       │ name record 0                │  12-byte header (len L at +4)
//!       │   name: 2·L − 8 bytes UTF-16 │
//!       │   4-byte trailer             │
//!       │ name record 1 ...            │
//!       ├──────────────────────────────┤
//!       │ (unparsed middle)            │
//!       ├──────────────────────────────┤
//!       │ position record N−1 ...      │  10 bytes each, walked from the end:
//!       │ position record 0            │  column +2, row +6, icon index +8
//! end   └──────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::geometry::GridPosition;
use super::mapping::build_mapping;
use crate::error::DecodeError;

/// Offset of the item count.
pub const COUNT_OFFSET: usize = 0x18;
/// Offset of the first name record.
pub const NAMES_OFFSET: usize = 0x1C;
/// Fixed header preceding every name.
pub const NAME_HEADER_LEN: usize = 12;
/// Offset of the length field inside a name header.
pub const NAME_LENGTH_FIELD: usize = 4;
/// Padding after every name.
pub const NAME_TRAILER_LEN: usize = 4;
/// Size of one trailing position record.
pub const POSITION_RECORD_LEN: usize = 10;

const COLUMN_FIELD: usize = 2;
const ROW_FIELD: usize = 6;
const INDEX_FIELD: usize = 8;

/// Smallest possible name record: header, one UTF-16 unit, trailer.
const MIN_NAME_RECORD_LEN: usize = NAME_HEADER_LEN + 2 + NAME_TRAILER_LEN;

/// One icon on the desktop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesktopIcon {
    /// Label as shown under the icon.
    pub name: String,
    /// 0-based enumeration order in the blob; links positions to names.
    pub origin_index: usize,
    /// Present only when positions were requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grid_position: Option<GridPosition>,
}

fn read_bytes(blob: &[u8], offset: usize, len: usize) -> Result<&[u8], DecodeError> {
    offset
        .checked_add(len)
        .and_then(|end| blob.get(offset..end))
        .ok_or(DecodeError::Truncated {
            offset,
            len,
            blob_len: blob.len(),
        })
}

fn read_u16(blob: &[u8], offset: usize) -> Result<u16, DecodeError> {
    let b = read_bytes(blob, offset, 2)?;
    Ok(u16::from_le_bytes([b[0], b[1]]))
}

fn read_u32(blob: &[u8], offset: usize) -> Result<u32, DecodeError> {
    let b = read_bytes(blob, offset, 4)?;
    Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

/// Byte length of a name given its header length field.
fn name_byte_len(index: usize, length: u32) -> Result<usize, DecodeError> {
    (length as usize)
        .checked_mul(2)
        .and_then(|n| n.checked_sub(8))
        .filter(|n| *n > 0 && n % 2 == 0)
        .ok_or(DecodeError::InvalidNameLength { index, length })
}

fn decode_utf16le(index: usize, bytes: &[u8]) -> Result<String, DecodeError> {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .collect();
    String::from_utf16(&units).map_err(|_| DecodeError::InvalidName { index })
}

/// Decode the icon records of a layout blob.
///
/// With `want_positions`, also decodes the trailing position region and
/// attaches a [`GridPosition`] to every icon.
pub fn decode(blob: &[u8], want_positions: bool) -> Result<Vec<DesktopIcon>, DecodeError> {
    let count = read_u32(blob, COUNT_OFFSET)?;
    let available = blob.len().saturating_sub(NAMES_OFFSET);
    if count as usize > available / MIN_NAME_RECORD_LEN {
        return Err(DecodeError::InconsistentCount {
            count,
            blob_len: blob.len(),
        });
    }

    let mut icons = Vec::with_capacity(count as usize);
    let mut offset = NAMES_OFFSET;
    for index in 0..count as usize {
        let length = read_u32(blob, offset + NAME_LENGTH_FIELD)?;
        let name_len = name_byte_len(index, length)?;
        let name_start = offset + NAME_HEADER_LEN;
        let name = decode_utf16le(index, read_bytes(blob, name_start, name_len)?)?;
        debug!(index, offset, %name, "decoded name record");

        icons.push(DesktopIcon {
            name,
            origin_index: index,
            grid_position: None,
        });
        offset = name_start + name_len + NAME_TRAILER_LEN;
    }

    if want_positions && count > 0 {
        attach_positions(blob, &mut icons, count)?;
    }

    Ok(icons)
}

fn attach_positions(blob: &[u8], icons: &mut [DesktopIcon], count: u32) -> Result<(), DecodeError> {
    let region_len = icons.len() * POSITION_RECORD_LEN;
    if region_len > blob.len() {
        return Err(DecodeError::InconsistentCount {
            count,
            blob_len: blob.len(),
        });
    }

    let mapping = build_mapping(count);
    let mut offset = blob.len();
    for _ in 0..icons.len() {
        offset -= POSITION_RECORD_LEN;
        let column = read_u16(blob, offset + COLUMN_FIELD)?;
        let row = read_u16(blob, offset + ROW_FIELD)?;
        let reference = read_u16(blob, offset + INDEX_FIELD)?;

        let icon = icons
            .get_mut(reference as usize)
            .ok_or(DecodeError::DanglingReference {
                reference,
                count: count as usize,
            })?;
        if icon.grid_position.is_some() {
            return Err(DecodeError::DuplicatePosition { reference });
        }

        let position = GridPosition {
            row: mapping.grid_index(u32::from(row)),
            column: mapping.grid_index(u32::from(column)),
        };
        debug!(reference, row, column, ?position, "decoded position record");
        icon.grid_position = Some(position);
    }

    Ok(())
}
