use std::io::Cursor;

use super::{read_message, write_message, MAX_CHUNK_SIZE};

#[test]
fn small_message_is_one_chunk() {
    let mut buffer = Vec::new();
    write_message(&mut buffer, &[0xB0, 0x0F]);
    assert_eq!(buffer, [0x00, 0x02, 0xB0, 0x0F, 0x00, 0x00]);
}

#[test]
fn large_message_is_split_at_chunk_boundary() {
    let payload = vec![0xAB; MAX_CHUNK_SIZE + 10];
    let mut buffer = Vec::new();
    write_message(&mut buffer, &payload);

    assert_eq!(&buffer[..2], &[0xFF, 0xFF]);
    let second_header = 2 + MAX_CHUNK_SIZE;
    assert_eq!(&buffer[second_header..second_header + 2], &[0x00, 0x0A]);
    assert_eq!(&buffer[buffer.len() - 2..], &[0x00, 0x00]);

    let read = read_message(&mut Cursor::new(buffer)).expect("message should read back");
    assert_eq!(read, payload);
}

#[test]
fn read_skips_empty_chunks_between_messages() {
    let mut wire = vec![0x00, 0x00, 0x00, 0x00];
    write_message(&mut wire, &[0x42]);
    let read = read_message(&mut Cursor::new(wire)).expect("message should read back");
    assert_eq!(read, [0x42]);
}

#[test]
fn read_reassembles_split_chunks() {
    let wire = vec![0x00, 0x02, 0x01, 0x02, 0x00, 0x01, 0x03, 0x00, 0x00];
    let read = read_message(&mut Cursor::new(wire)).expect("message should read back");
    assert_eq!(read, [0x01, 0x02, 0x03]);
}

#[test]
fn truncated_stream_is_an_io_error() {
    let wire = vec![0x00, 0x05, 0x01];
    assert!(read_message(&mut Cursor::new(wire)).is_err());
}
