// Property tests for the base-128 integer codec.

use proptest::prelude::*;

use undelta::{DecodeError, FormatError, varint};

proptest! {
    #[test]
    fn roundtrip(num in 0u64..(1 << 31)) {
        let encoded = varint::to_vec(num);
        let (decoded, used) = varint::read_slice(&encoded).unwrap();
        prop_assert_eq!(decoded, num);
        prop_assert_eq!(used, encoded.len());
    }

    #[test]
    fn encoding_is_minimal(num in 0u64..(1 << 31)) {
        let encoded = varint::to_vec(num);
        let expected = match num {
            0..=0x7F => 1,
            0x80..=0x3FFF => 2,
            0x4000..=0x1F_FFFF => 3,
            0x20_0000..=0xFFF_FFFF => 4,
            _ => 5,
        };
        prop_assert_eq!(encoded.len(), expected);
        // Only the final byte has the continuation bit clear.
        for (i, b) in encoded.iter().enumerate() {
            prop_assert_eq!(b & 0x80 != 0, i + 1 < encoded.len());
        }
    }

    #[test]
    fn stream_and_slice_agree(num in 0u64..(1 << 31), trailer: Vec<u8>) {
        let mut bytes = varint::to_vec(num);
        let used = bytes.len();
        bytes.extend_from_slice(&trailer);

        let (from_slice, n) = varint::read_slice(&bytes).unwrap();
        prop_assert_eq!(n, used);

        let mut cursor = std::io::Cursor::new(&bytes[..]);
        let from_stream = varint::read_stream(&mut cursor).unwrap();
        prop_assert_eq!(from_stream, from_slice);
        prop_assert_eq!(cursor.position() as usize, used);
    }

    #[test]
    fn truncated_input_is_eof(num in 0x80u64..(1 << 31)) {
        let mut encoded = varint::to_vec(num);
        encoded.pop();
        prop_assert!(matches!(
            varint::read_slice(&encoded),
            Err(DecodeError::UnexpectedEof(_))
        ));
    }
}

#[test]
fn five_continuation_bytes_are_malformed() {
    assert!(matches!(
        varint::read_slice(&[0x80; 6]),
        Err(DecodeError::Format(FormatError::MalformedVarint))
    ));
}
