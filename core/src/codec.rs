//! Fixed-width binary encoding used for replay buffers.
//!
//! Integers are written little-endian at their natural width, booleans as a
//! single byte, [`Number`] as its raw scaled integer and sequences as a `u32`
//! element count followed by the elements. Changing the order or width of any
//! field breaks previously recorded buffers.

use thiserror::Error;

use crate::{
    fixed::{Number, Point},
    CellCoord, KeyState, MatchConfig, Maze, MazeGeneration, Replay, TankState, TankUpgradeState,
    UpgradeKind,
};

/// Errors raised while decoding a byte buffer.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    /// The buffer ended before the value was complete.
    #[error("buffer ended after {offset} bytes while {needed} more were required")]
    UnexpectedEnd {
        /// Offset at which decoding stopped.
        offset: usize,
        /// Number of bytes still required.
        needed: usize,
    },
    /// An enumeration tag did not match any known variant.
    #[error("unknown {kind} tag {tag}")]
    InvalidTag {
        /// Name of the enumeration being decoded.
        kind: &'static str,
        /// Offending tag byte.
        tag: u8,
    },
    /// A boolean byte held a value other than zero or one.
    #[error("invalid boolean byte {0}")]
    InvalidBool(u8),
    /// A sequence length does not fit in memory on this platform.
    #[error("sequence length {0} is not addressable")]
    LengthOverflow(u32),
    /// Decoded data violated a structural constraint.
    #[error("malformed {0}")]
    InvalidShape(&'static str),
    /// Bytes remained after the top-level value was decoded.
    #[error("{0} trailing bytes after decoded value")]
    TrailingBytes(usize),
}

/// Cursor over an encoded buffer.
#[derive(Clone, Debug)]
pub struct Reader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    /// Creates a reader positioned at the start of `bytes`.
    #[must_use]
    pub const fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    /// Number of bytes not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.offset
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N], CodecError> {
        let end = self.offset + N;
        let Some(slice) = self.bytes.get(self.offset..end) else {
            return Err(CodecError::UnexpectedEnd {
                offset: self.offset,
                needed: end - self.bytes.len(),
            });
        };
        let mut buffer = [0; N];
        buffer.copy_from_slice(slice);
        self.offset = end;
        Ok(buffer)
    }
}

/// Types with a canonical binary encoding.
pub trait Encode {
    /// Appends the encoding of `self` to `out`.
    fn encode(&self, out: &mut Vec<u8>);
}

/// Types that can be restored from their canonical binary encoding.
pub trait Decode: Sized {
    /// Reads one value from the reader.
    fn decode(reader: &mut Reader<'_>) -> Result<Self, CodecError>;
}

/// Encodes a value into a fresh buffer.
#[must_use]
pub fn to_bytes<T: Encode + ?Sized>(value: &T) -> Vec<u8> {
    let mut out = Vec::new();
    value.encode(&mut out);
    out
}

/// Decodes a value that must span the whole buffer.
pub fn from_bytes<T: Decode>(bytes: &[u8]) -> Result<T, CodecError> {
    let mut reader = Reader::new(bytes);
    let value = T::decode(&mut reader)?;
    match reader.remaining() {
        0 => Ok(value),
        trailing => Err(CodecError::TrailingBytes(trailing)),
    }
}

impl Encode for u8 {
    fn encode(&self, out: &mut Vec<u8>) {
        out.push(*self);
    }
}

impl Decode for u8 {
    fn decode(reader: &mut Reader<'_>) -> Result<Self, CodecError> {
        let [byte] = reader.take::<1>()?;
        Ok(byte)
    }
}

impl Encode for bool {
    fn encode(&self, out: &mut Vec<u8>) {
        out.push(u8::from(*self));
    }
}

impl Decode for bool {
    fn decode(reader: &mut Reader<'_>) -> Result<Self, CodecError> {
        match u8::decode(reader)? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(CodecError::InvalidBool(other)),
        }
    }
}

macro_rules! impl_int_codec {
    ($($ty:ty),*) => {
        $(
            impl Encode for $ty {
                fn encode(&self, out: &mut Vec<u8>) {
                    out.extend_from_slice(&self.to_le_bytes());
                }
            }

            impl Decode for $ty {
                fn decode(reader: &mut Reader<'_>) -> Result<Self, CodecError> {
                    Ok(<$ty>::from_le_bytes(reader.take()?))
                }
            }
        )*
    };
}

impl_int_codec!(i32, u32, u64);

impl Encode for Number {
    fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_le_bytes());
    }
}

impl Decode for Number {
    fn decode(reader: &mut Reader<'_>) -> Result<Self, CodecError> {
        Ok(Number::from_le_bytes(reader.take()?))
    }
}

impl Encode for Point {
    fn encode(&self, out: &mut Vec<u8>) {
        self.x.encode(out);
        self.y.encode(out);
    }
}

impl Decode for Point {
    fn decode(reader: &mut Reader<'_>) -> Result<Self, CodecError> {
        let x = Number::decode(reader)?;
        let y = Number::decode(reader)?;
        Ok(Point::new(x, y))
    }
}

impl<T: Encode> Encode for [T] {
    fn encode(&self, out: &mut Vec<u8>) {
        let length = u32::try_from(self.len()).unwrap_or(u32::MAX);
        length.encode(out);
        for element in self.iter().take(length as usize) {
            element.encode(out);
        }
    }
}

impl<T: Encode> Encode for Vec<T> {
    fn encode(&self, out: &mut Vec<u8>) {
        self.as_slice().encode(out);
    }
}

impl<T: Decode> Decode for Vec<T> {
    fn decode(reader: &mut Reader<'_>) -> Result<Self, CodecError> {
        let length = u32::decode(reader)?;
        let count = usize::try_from(length).map_err(|_| CodecError::LengthOverflow(length))?;
        // Every element occupies at least one byte.
        let mut elements = Vec::with_capacity(count.min(reader.remaining()));
        for _ in 0..count {
            elements.push(T::decode(reader)?);
        }
        Ok(elements)
    }
}

impl Encode for KeyState {
    fn encode(&self, out: &mut Vec<u8>) {
        self.to_bits().encode(out);
    }
}

impl Decode for KeyState {
    fn decode(reader: &mut Reader<'_>) -> Result<Self, CodecError> {
        let bits = u8::decode(reader)?;
        if bits & !KeyState::ALL_BITS != 0 {
            return Err(CodecError::InvalidTag {
                kind: "key state",
                tag: bits,
            });
        }
        Ok(KeyState::from_bits(bits))
    }
}

impl Encode for UpgradeKind {
    fn encode(&self, out: &mut Vec<u8>) {
        self.tag().encode(out);
    }
}

impl Decode for UpgradeKind {
    fn decode(reader: &mut Reader<'_>) -> Result<Self, CodecError> {
        let tag = u8::decode(reader)?;
        UpgradeKind::from_tag(tag).ok_or(CodecError::InvalidTag {
            kind: "upgrade",
            tag,
        })
    }
}

impl Encode for CellCoord {
    fn encode(&self, out: &mut Vec<u8>) {
        self.column().encode(out);
        self.row().encode(out);
    }
}

impl Decode for CellCoord {
    fn decode(reader: &mut Reader<'_>) -> Result<Self, CodecError> {
        let column = u32::decode(reader)?;
        let row = u32::decode(reader)?;
        Ok(CellCoord::new(column, row))
    }
}

impl Encode for TankState {
    fn encode(&self, out: &mut Vec<u8>) {
        self.position.encode(out);
        self.direction.encode(out);
        self.key_state.encode(out);
        self.active.encode(out);
        self.alive.encode(out);
    }
}

impl Decode for TankState {
    fn decode(reader: &mut Reader<'_>) -> Result<Self, CodecError> {
        Ok(TankState {
            position: Point::decode(reader)?,
            direction: Point::decode(reader)?,
            key_state: KeyState::decode(reader)?,
            active: bool::decode(reader)?,
            alive: bool::decode(reader)?,
        })
    }
}

impl Encode for TankUpgradeState {
    fn encode(&self, out: &mut Vec<u8>) {
        self.kind.encode(out);
        self.state.encode(out);
        self.timer.encode(out);
    }
}

impl Decode for TankUpgradeState {
    fn decode(reader: &mut Reader<'_>) -> Result<Self, CodecError> {
        Ok(TankUpgradeState {
            kind: UpgradeKind::decode(reader)?,
            state: i32::decode(reader)?,
            timer: i32::decode(reader)?,
        })
    }
}

impl Encode for MazeGeneration {
    fn encode(&self, out: &mut Vec<u8>) {
        let tag: u8 = match self {
            Self::Empty => 0,
            Self::ExpandTree => 1,
        };
        tag.encode(out);
    }
}

impl Decode for MazeGeneration {
    fn decode(reader: &mut Reader<'_>) -> Result<Self, CodecError> {
        match u8::decode(reader)? {
            0 => Ok(Self::Empty),
            1 => Ok(Self::ExpandTree),
            tag => Err(CodecError::InvalidTag {
                kind: "maze generation",
                tag,
            }),
        }
    }
}

impl Encode for Maze {
    fn encode(&self, out: &mut Vec<u8>) {
        self.horizontal_walls().encode(out);
        self.vertical_walls().encode(out);
    }
}

impl Decode for Maze {
    fn decode(reader: &mut Reader<'_>) -> Result<Self, CodecError> {
        let horizontal = Vec::<Vec<bool>>::decode(reader)?;
        let vertical = Vec::<Vec<bool>>::decode(reader)?;
        Maze::from_walls(horizontal, vertical).ok_or(CodecError::InvalidShape("maze"))
    }
}

impl Encode for MatchConfig {
    fn encode(&self, out: &mut Vec<u8>) {
        self.seed.encode(out);
        self.tank_count.encode(out);
        self.allowed_upgrades.encode(out);
        self.maze_generation.encode(out);
        self.min_maze_size.encode(out);
        self.max_maze_size.encode(out);
        self.round_end_delay.encode(out);
    }
}

impl Decode for MatchConfig {
    fn decode(reader: &mut Reader<'_>) -> Result<Self, CodecError> {
        let config = MatchConfig {
            seed: u64::decode(reader)?,
            tank_count: u32::decode(reader)?,
            allowed_upgrades: Vec::decode(reader)?,
            maze_generation: MazeGeneration::decode(reader)?,
            min_maze_size: u32::decode(reader)?,
            max_maze_size: u32::decode(reader)?,
            round_end_delay: u32::decode(reader)?,
        };
        if config.min_maze_size == 0 || config.max_maze_size <= config.min_maze_size {
            return Err(CodecError::InvalidShape("match config"));
        }
        Ok(config)
    }
}

impl Encode for Replay {
    fn encode(&self, out: &mut Vec<u8>) {
        self.config.encode(out);
        self.frames.encode(out);
    }
}

impl Decode for Replay {
    fn decode(reader: &mut Reader<'_>) -> Result<Self, CodecError> {
        let config = MatchConfig::decode(reader)?;
        let frames: Vec<Vec<KeyState>> = Vec::decode(reader)?;
        let tanks = config.tank_count as usize;
        if frames.iter().any(|frame| frame.len() != tanks) {
            return Err(CodecError::InvalidShape("replay frame"));
        }
        Ok(Replay { config, frames })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn number_encodes_raw_little_endian() {
        assert_eq!(to_bytes(&Number::ONE), vec![0x00, 0x00, 0x01, 0x00]);
        assert_eq!(to_bytes(&-Number::ONE), vec![0x00, 0x00, 0xff, 0xff]);
    }

    #[test]
    fn number_round_trips_bit_exactly() {
        let samples = [
            Number::ZERO,
            Number::ONE,
            -Number::ONE,
            Number::MAX,
            Number::RESOLUTION,
            Number::MIN,
        ];
        for value in samples {
            let decoded: Number = from_bytes(&to_bytes(&value)).expect("decodes");
            assert_eq!(decoded.raw(), value.raw());
        }
    }

    #[test]
    fn sequences_are_length_prefixed() {
        let bytes = to_bytes(&vec![true, false, true]);
        assert_eq!(bytes, vec![3, 0, 0, 0, 1, 0, 1]);
    }

    #[test]
    fn truncated_buffer_reports_unexpected_end() {
        let error = from_bytes::<u32>(&[1, 2]).expect_err("too short");
        assert_eq!(
            error,
            CodecError::UnexpectedEnd {
                offset: 0,
                needed: 2
            }
        );
    }

    #[test]
    fn trailing_bytes_are_rejected() {
        let error = from_bytes::<u8>(&[1, 2]).expect_err("trailing");
        assert_eq!(error, CodecError::TrailingBytes(1));
    }

    #[test]
    fn invalid_bool_is_rejected() {
        assert_eq!(from_bytes::<bool>(&[2]), Err(CodecError::InvalidBool(2)));
    }

    #[test]
    fn key_state_packs_into_single_byte() {
        let keys = KeyState {
            left: true,
            right: false,
            forward: true,
            back: false,
            fire: true,
        };
        assert_eq!(to_bytes(&keys), vec![0b1_0101]);
        assert_eq!(from_bytes::<KeyState>(&[0b1_0101]), Ok(keys));
        assert!(from_bytes::<KeyState>(&[0b10_0000]).is_err());
    }

    #[test]
    fn maze_round_trips_with_shape_checks() {
        let mut maze = Maze::walled(3, 2);
        maze.set_horizontal_wall(1, 0, false);
        maze.set_vertical_wall(0, 1, false);
        let decoded: Maze = from_bytes(&to_bytes(&maze)).expect("decodes");
        assert_eq!(decoded, maze);

        let mut broken = to_bytes(&vec![vec![true], vec![true, false]]);
        broken.extend(to_bytes(&Vec::<Vec<bool>>::new()));
        assert_eq!(
            from_bytes::<Maze>(&broken),
            Err(CodecError::InvalidShape("maze"))
        );
    }

    #[test]
    fn tank_state_layout_is_fixed() {
        let state = TankState {
            position: Point::new(Number::from_ratio(3, 2), Number::ONE),
            direction: Point::from_ints(0, -1),
            key_state: KeyState::from_bits(0b1_0001),
            active: true,
            alive: false,
        };
        let bytes = to_bytes(&state);
        assert_eq!(bytes.len(), 16 + 1 + 2);
        assert_eq!(&bytes[..4], &[0x00, 0x80, 0x01, 0x00]);
        assert_eq!(&bytes[16..], &[0b1_0001, 1, 0]);
        assert_eq!(from_bytes::<TankState>(&bytes), Ok(state));
    }

    #[test]
    fn upgrade_state_keeps_negative_timers() {
        let state = TankUpgradeState {
            kind: UpgradeKind::Gatling,
            state: 1,
            timer: -30,
        };
        let bytes = to_bytes(&state);
        assert_eq!(bytes[0], UpgradeKind::Gatling.tag());
        assert_eq!(from_bytes::<TankUpgradeState>(&bytes), Ok(state));
    }

    #[test]
    fn replay_round_trips() {
        let config = MatchConfig {
            tank_count: 2,
            ..MatchConfig::default()
        };
        let replay = Replay {
            config,
            frames: vec![
                vec![KeyState::default(), KeyState::from_bits(0b0_0100)],
                vec![KeyState::from_bits(0b1_0000), KeyState::default()],
            ],
        };
        let decoded: Replay = from_bytes(&to_bytes(&replay)).expect("decodes");
        assert_eq!(decoded, replay);
    }

    proptest! {
        #[test]
        fn any_number_round_trips(raw in any::<i32>()) {
            let value = Number::from_raw(raw);
            let decoded: Number = from_bytes(&to_bytes(&value)).expect("decodes");
            prop_assert_eq!(decoded, value);
        }

        #[test]
        fn any_point_sequence_round_trips(raws in prop::collection::vec((any::<i32>(), any::<i32>()), 0..16)) {
            let points: Vec<Point> = raws
                .into_iter()
                .map(|(x, y)| Point::new(Number::from_raw(x), Number::from_raw(y)))
                .collect();
            let decoded: Vec<Point> = from_bytes(&to_bytes(&points)).expect("decodes");
            prop_assert_eq!(decoded, points);
        }
    }
}
