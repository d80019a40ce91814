use super::*;
use pretty_assertions::assert_eq;
use quickcheck_macros::quickcheck;
use std::io::Cursor;

fn record(payload: &[u8]) -> Vec<u8> {
    let mut out = vec![0x00, 0x00, 0x00, 0x01];
    out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    out.extend_from_slice(payload);
    out
}

#[test]
fn test_sps_record_round_trip() {
    let input = vec![0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x02, 0x67, 0x11];
    let mut cursor = Cursor::new(&input);

    let unit = read_unit(&mut cursor).unwrap().unwrap();
    assert_eq!(unit.len(), 6);
    assert_eq!(unit.type_code(), 0x67);
    assert_eq!(unit.nal_type(), 7);
    assert!(unit.is_header());
    assert_eq!(unit.payload(), &[0x67, 0x11]);
    assert!(read_unit(&mut cursor).unwrap().is_none());

    let mut out = Vec::new();
    write_unit(&unit, &mut out).unwrap();
    assert_eq!(out, input);
}

#[test]
fn test_empty_input_is_end_of_stream() {
    let mut empty: &[u8] = &[];
    assert!(read_unit(&mut empty).unwrap().is_none());
    assert!(read_unit_skip_headers(&mut empty).unwrap().is_none());
}

#[test]
fn test_bad_marker() {
    let mut input: &[u8] = &[0x00, 0x00, 0x01, 0x67, 0x00, 0x00, 0x00, 0x01, 0x00];
    let err = read_unit(&mut input).unwrap_err();
    assert!(matches!(err, RelayError::Framing(_)), "{:?}", err);
}

#[test]
fn test_truncated_stream() {
    // partial marker
    let mut input: &[u8] = &[0x00, 0x00];
    assert!(matches!(
        read_unit(&mut input).unwrap_err(),
        RelayError::TruncatedStream(_)
    ));

    // partial length
    let mut input: &[u8] = &[0x00, 0x00, 0x00, 0x01, 0x00, 0x00];
    assert!(matches!(
        read_unit(&mut input).unwrap_err(),
        RelayError::TruncatedStream(_)
    ));

    // payload shorter than announced
    let mut input: &[u8] = &[0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x05, 0x65, 0x01];
    assert!(matches!(
        read_unit(&mut input).unwrap_err(),
        RelayError::TruncatedStream(_)
    ));
}

#[test]
fn test_zero_length_payload_is_rejected() {
    let mut input: &[u8] = &[0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00];
    assert!(matches!(read_unit(&mut input).unwrap_err(), RelayError::Framing(_)));
}

#[test]
fn test_skip_headers() {
    let mut input = Vec::new();
    input.extend(record(&[0x67, 0x42]));
    input.extend(record(&[0x68, 0xce]));
    input.extend(record(&[0x06, 0x05]));
    input.extend(record(&[0x65, 0x88, 0x84]));
    input.extend(record(&[0x41, 0x9a]));
    let mut cursor = Cursor::new(input);

    let unit = read_unit_skip_headers(&mut cursor).unwrap().unwrap();
    assert_eq!(unit.nal_type(), 5);
    let unit = read_unit_skip_headers(&mut cursor).unwrap().unwrap();
    assert_eq!(unit.nal_type(), 1);
    assert!(read_unit_skip_headers(&mut cursor).unwrap().is_none());
}

#[test]
fn test_skip_headers_only_headers_left() {
    let mut input = record(&[0x67, 0x42]);
    input.extend(record(&[0x68, 0xce]));
    let mut cursor = Cursor::new(input);
    assert!(read_unit_skip_headers(&mut cursor).unwrap().is_none());
}

#[test]
fn test_reader_writer() {
    let mut input = Vec::new();
    for payload in [&[0x67u8, 1][..], &[0x68, 2][..], &[0x06, 3][..], &[0x65, 4, 4, 4][..]] {
        input.extend(record(payload));
    }

    let mut reader = UnitReader::new(Cursor::new(input.clone()));
    let mut writer = UnitWriter::new(Vec::new());
    while let Some(unit) = reader.read_unit().unwrap() {
        writer.write_unit(&unit).unwrap();
    }
    assert!(reader.is_exhausted());
    assert!(reader.read_unit().unwrap().is_none());
    assert_eq!(writer.units_written(), 4);
    assert_eq!(writer.into_inner(), input);
}

#[test]
fn test_reader_non_header() {
    let mut input = record(&[0x67, 1]);
    input.extend(record(&[0x41, 2]));
    let mut reader = UnitReader::new(Cursor::new(input));
    let unit = reader.read_non_header().unwrap().unwrap();
    assert_eq!(unit.nal_type(), 1);
    assert!(reader.read_non_header().unwrap().is_none());
}

#[quickcheck]
fn prop_write_then_read(type_code: u8, body: Vec<u8>) -> bool {
    let mut payload = vec![type_code];
    payload.extend(body);
    let original = Unit::from_payload(&payload).unwrap();

    let mut framed = Vec::new();
    write_unit(&original, &mut framed).unwrap();
    if framed != record(&payload) {
        return false;
    }

    match read_unit(&mut framed.as_slice()) {
        Ok(Some(unit)) => {
            unit.len() == original.len()
                && unit.type_code() == original.type_code()
                && unit.payload() == original.payload()
        }
        _ => false,
    }
}
