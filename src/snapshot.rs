//! Compact binary snapshot of a board position.
//!
//! Layout (little endian):
//!
//! | offset | size | field                  |
//! |--------|------|------------------------|
//! | 0      | 4    | magic `CKRS`           |
//! | 4      | 4    | format version         |
//! | 8      | 4    | piece count            |
//! | 12     | 4    | CRC32 of the payload   |
//! | 16     | ..   | payload                |
//!
//! Each payload record is `flags: u8` (bit 0 black, bit 1 king),
//! `square: u8` (`row * 8 + col`), `id_len: u8` and the UTF-8 id bytes.
//! Pieces keep their board order, which decides fuki tie-breaks.

use thiserror::Error;

use crate::board::Board;
use crate::error::EngineError;
use crate::types::{Color, Piece, Position};

const MAGIC: &[u8; 4] = b"CKRS";
const VERSION: u32 = 1;
const HEADER_SIZE: usize = 16;

const FLAG_BLACK: u8 = 0b01;
const FLAG_KING: u8 = 0b10;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SnapshotError {
    #[error("snapshot too short: expected at least 16 bytes, got {0}")]
    TooShort(usize),
    #[error("invalid snapshot magic (expected CKRS)")]
    BadMagic,
    #[error("unsupported snapshot version: expected 1, got {0}")]
    UnsupportedVersion(u32),
    #[error("CRC32 mismatch: expected {expected:#010x}, got {actual:#010x}")]
    ChecksumMismatch { expected: u32, actual: u32 },
    #[error("unexpected EOF while reading piece {0}")]
    UnexpectedEof(usize),
    #[error("piece {index} has out-of-range square {square}")]
    BadSquare { index: usize, square: u8 },
    #[error("piece {0} has an empty or non UTF-8 id")]
    BadId(usize),
    #[error("{0} trailing bytes after the last piece")]
    TrailingBytes(usize),
    #[error(transparent)]
    InvalidBoard(#[from] EngineError),
}

pub fn encode(board: &Board) -> Vec<u8> {
    let mut payload = Vec::new();
    for piece in board.pieces() {
        let mut flags = 0;
        if piece.color == Color::Black {
            flags |= FLAG_BLACK;
        }
        if piece.is_king {
            flags |= FLAG_KING;
        }
        // Ids longer than a length byte are cut at a char boundary.
        let id = truncate_id(piece.id.as_str());
        payload.push(flags);
        payload.push(piece.position.index() as u8);
        payload.push(id.len() as u8);
        payload.extend_from_slice(id.as_bytes());
    }

    let mut out = Vec::with_capacity(HEADER_SIZE + payload.len());
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&VERSION.to_le_bytes());
    out.extend_from_slice(&(board.pieces().len() as u32).to_le_bytes());
    out.extend_from_slice(&crc32fast::hash(&payload).to_le_bytes());
    out.extend_from_slice(&payload);
    out
}

pub fn decode(data: &[u8]) -> Result<Board, SnapshotError> {
    if data.len() < HEADER_SIZE {
        return Err(SnapshotError::TooShort(data.len()));
    }
    if &data[0..4] != MAGIC {
        return Err(SnapshotError::BadMagic);
    }

    let version = read_u32_le(data, 4);
    if version != VERSION {
        return Err(SnapshotError::UnsupportedVersion(version));
    }

    let count = read_u32_le(data, 8) as usize;
    let expected = read_u32_le(data, 12);
    let payload = &data[HEADER_SIZE..];

    let actual = crc32fast::hash(payload);
    if actual != expected {
        return Err(SnapshotError::ChecksumMismatch { expected, actual });
    }

    let mut pieces = Vec::with_capacity(count.min(64));
    let mut offset = 0;
    for index in 0..count {
        let header = payload
            .get(offset..offset + 3)
            .ok_or(SnapshotError::UnexpectedEof(index))?;
        let (flags, square, id_len) = (header[0], header[1], header[2] as usize);
        offset += 3;

        let id_bytes = payload
            .get(offset..offset + id_len)
            .ok_or(SnapshotError::UnexpectedEof(index))?;
        offset += id_len;

        let position = Position::from_index(square as usize)
            .ok_or(SnapshotError::BadSquare { index, square })?;
        let id = std::str::from_utf8(id_bytes)
            .ok()
            .filter(|id| !id.is_empty())
            .ok_or(SnapshotError::BadId(index))?;
        let color = if flags & FLAG_BLACK != 0 {
            Color::Black
        } else {
            Color::White
        };

        pieces.push(if flags & FLAG_KING != 0 {
            Piece::king(id, color, position)
        } else {
            Piece::man(id, color, position)
        });
    }

    if offset != payload.len() {
        return Err(SnapshotError::TrailingBytes(payload.len() - offset));
    }

    Ok(Board::from_pieces(pieces)?)
}

fn read_u32_le(data: &[u8], offset: usize) -> u32 {
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&data[offset..offset + 4]);
    u32::from_le_bytes(bytes)
}

fn truncate_id(id: &str) -> &str {
    if id.len() <= u8::MAX as usize {
        return id;
    }
    let mut end = u8::MAX as usize;
    while !id.is_char_boundary(end) {
        end -= 1;
    }
    &id[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::test_support::board_from_rows;
    use crate::movegen::moves_for_piece;

    fn midgame() -> Board {
        board_from_rows([
            ".b...b..", "......B.", "...b....", "..w.....", "........", "..W...w.",
            ".w......", "..w.....",
        ])
    }

    fn recrc(bytes: &mut [u8]) {
        let crc = crc32fast::hash(&bytes[HEADER_SIZE..]);
        bytes[12..16].copy_from_slice(&crc.to_le_bytes());
    }

    #[test]
    fn decoded_board_has_the_same_moves_for_every_piece() {
        let board = midgame();

        let decoded = decode(&encode(&board)).unwrap();

        assert_eq!(decoded, board);
        for piece in board.pieces() {
            let restored = decoded.piece_by_id(&piece.id).unwrap();
            assert_eq!(
                moves_for_piece(&decoded, restored, None),
                moves_for_piece(&board, piece, None)
            );
        }
    }

    #[test]
    fn encodes_the_documented_header() {
        let bytes = encode(&Board::new());

        assert_eq!(&bytes[0..4], b"CKRS");
        assert_eq!(read_u32_le(&bytes, 4), 1);
        assert_eq!(read_u32_le(&bytes, 8), 24);
        // "b-0".."b-9" are 3 bytes, "b-10", "b-11" and every "w-NN" are 4.
        assert_eq!(bytes.len(), HEADER_SIZE + 24 * 3 + 10 * 3 + 14 * 4);
    }

    #[test]
    fn rejects_invalid_magic() {
        let mut bytes = encode(&midgame());
        bytes[0] = b'X';

        assert_eq!(decode(&bytes), Err(SnapshotError::BadMagic));
    }

    #[test]
    fn rejects_unsupported_version() {
        let mut bytes = encode(&midgame());
        bytes[4..8].copy_from_slice(&2u32.to_le_bytes());

        assert_eq!(decode(&bytes), Err(SnapshotError::UnsupportedVersion(2)));
    }

    #[test]
    fn rejects_crc_mismatch() {
        let mut bytes = encode(&midgame());
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;

        assert!(matches!(
            decode(&bytes),
            Err(SnapshotError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn rejects_truncated_input() {
        let bytes = encode(&midgame());

        assert_eq!(decode(&bytes[..10]), Err(SnapshotError::TooShort(10)));

        let mut cut = bytes[..bytes.len() - 2].to_vec();
        recrc(&mut cut);
        assert!(matches!(decode(&cut), Err(SnapshotError::UnexpectedEof(_))));
    }

    #[test]
    fn rejects_trailing_bytes() {
        let mut bytes = encode(&midgame());
        bytes.extend_from_slice(&[0, 0]);
        recrc(&mut bytes);

        assert_eq!(decode(&bytes), Err(SnapshotError::TrailingBytes(2)));
    }

    #[test]
    fn rejects_boards_that_break_placement_rules() {
        let mut bytes = encode(&board_from_rows([
            ".b......", "........", "........", "........", "........", "........",
            "........", "w.......",
        ]));
        // Move the black man from square 1 to the light square 0.
        bytes[HEADER_SIZE + 1] = 0;
        recrc(&mut bytes);

        assert!(matches!(
            decode(&bytes),
            Err(SnapshotError::InvalidBoard(EngineError::InvalidBoard(_)))
        ));
    }
}
