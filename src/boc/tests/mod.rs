use std::rc::Rc;

use num_bigint::BigUint;

use super::*;
use crate::address::StdAddr;
use crate::cell::{Cell, EMPTY_CELL_HASH};

fn leaf(data: &[u8]) -> Rc<Cell> {
    let mut cell = Cell::new();
    cell.bits_mut().store_bytes(data).unwrap();
    Rc::new(cell)
}

#[test]
fn empty_cell_envelope() {
    let cell = Cell::new();

    let boc = Boc::encode(&cell).unwrap();
    assert_eq!(hex::encode(&boc), "b5ee9c72010101010002000000");
    assert_eq!(Boc::encode_base64(&cell).unwrap(), "te6ccgEBAQEAAgAAAA==");

    let decoded = Boc::decode(&boc).unwrap();
    assert_eq!(decoded.repr_hash(), EMPTY_CELL_HASH);
    assert!(decoded.bits().is_empty());
    assert!(decoded.references().is_empty());
}

#[test]
fn envelope_with_index_and_crc() {
    let cell = Cell::new();

    let boc = ser::BocHeader::with_root(&cell)
        .with_index(true)
        .with_crc(true)
        .encode()
        .unwrap();
    assert_eq!(hex::encode(&boc), "b5ee9c72c1010101000200000000b5539724");

    // magic, then flags byte with has_idx + has_crc and ref size 1
    assert_eq!(&boc[..4], BocTag::Generic.to_bytes());
    assert_eq!(boc[4], 0b1100_0001);
    // one cell, one root with index 0
    assert_eq!(boc[6], 1);
    assert_eq!(boc[10], 0);

    let decoded = Boc::decode(&boc).unwrap();
    assert!(decoded.is_empty());
}

#[test]
fn distinct_leaves_keep_walk_order() {
    let mut root = Cell::new();
    root.bits_mut().store_bit(true).unwrap();
    root.push_reference(leaf(&[0xa5])).unwrap();

    let mut b = Cell::new();
    b.bits_mut().store_small_uint(0b101, 3).unwrap();
    root.push_reference(Rc::new(b)).unwrap();

    let boc = ser::BocHeader::with_root(&root)
        .with_crc(true)
        .encode()
        .unwrap();
    assert_eq!(
        hex::encode(&boc),
        "b5ee9c7241010301000b000201c001020002a50001b05773d6a5"
    );

    let decoded = Boc::decode(&boc).unwrap();
    assert_eq!(decoded.repr_hash(), root.repr_hash());
}

#[test]
fn duplicates_are_merged() {
    let child = leaf(&[0x77]);

    let mut root = Cell::new();
    root.push_reference(child.clone()).unwrap();
    root.push_reference(child).unwrap();

    let boc = Boc::encode(&root).unwrap();
    // two unique cells only
    assert_eq!(hex::encode(&boc), "b5ee9c720101020100070002000101000277");

    let decoded = Boc::decode(&boc).unwrap();
    assert_eq!(decoded.references().len(), 2);
    assert!(Rc::ptr_eq(
        decoded.reference(0).unwrap(),
        decoded.reference(1).unwrap()
    ));
    assert_eq!(decoded.repr_hash(), root.repr_hash());
}

#[test]
fn relocation_keeps_references_forward() {
    // Diamond: root -> a -> c, root -> b -> c. The walk first records
    // c right after a, then pulls it past b.
    let c = leaf(&[0xcc]);

    let mut a = Cell::new();
    a.bits_mut().store_u8(0x0a).unwrap();
    a.push_reference(c.clone()).unwrap();

    let mut b = Cell::new();
    b.bits_mut().store_u8(0x0b).unwrap();
    b.push_reference(c).unwrap();

    let mut root = Cell::new();
    root.push_reference(Rc::new(a)).unwrap();
    root.push_reference(Rc::new(b)).unwrap();

    let boc = Boc::encode(&root).unwrap();
    assert_eq!(
        hex::encode(&boc),
        "b5ee9c7201010401000f000200010201020a0301020b030002cc"
    );

    let decoded = Boc::decode(&boc).unwrap();
    assert_eq!(decoded.repr_hash(), root.repr_hash());
    assert!(Rc::ptr_eq(
        decoded.reference(0).unwrap().reference(0).unwrap(),
        decoded.reference(1).unwrap().reference(0).unwrap(),
    ));
}

#[test]
fn round_trip_all_envelope_forms() {
    let shared = leaf(b"shared");

    let mut payload = Cell::new();
    payload
        .bits_mut()
        .store_uint(&BigUint::from(0xdead_beefu32), 32)
        .unwrap();
    payload.push_reference(shared.clone()).unwrap();

    let mut root = Cell::new();
    root.bits_mut()
        .store_address(Some(&StdAddr::new(-1, [0x33; 32])))
        .unwrap();
    root.bits_mut()
        .store_coins(&BigUint::from(1_000_000_000u64))
        .unwrap();
    root.push_reference(Rc::new(payload)).unwrap();
    root.push_reference(shared).unwrap();

    for include_index in [false, true] {
        for include_crc in [false, true] {
            let boc = ser::BocHeader::with_root(&root)
                .with_index(include_index)
                .with_crc(include_crc)
                .encode()
                .unwrap();
            let decoded = Boc::decode(&boc).unwrap();
            assert_eq!(decoded.repr_hash(), root.repr_hash());
        }
    }

    let decoded = Boc::decode_base64(Boc::encode_base64(&root).unwrap()).unwrap();
    assert_eq!(decoded.repr_hash(), root.repr_hash());
}

#[test]
fn crc_protects_every_bit() {
    let cell = Cell::new();
    let boc = ser::BocHeader::with_root(&cell)
        .with_crc(true)
        .encode()
        .unwrap();
    assert!(Boc::decode(&boc).is_ok());

    for byte in 0..boc.len() {
        for bit in 0..8 {
            let mut corrupted = boc.clone();
            corrupted[byte] ^= 1 << bit;
            assert!(
                Boc::decode(&corrupted).is_err(),
                "corruption at {byte}:{bit} went unnoticed"
            );
        }
    }
}

#[test]
fn lean_magic_tolerance() {
    // 68ff65f3, ref size 1, one empty cell, offset index present
    let boc = hex::decode("68ff65f301010101000200020000").unwrap();
    let cell = Boc::decode(&boc).unwrap();
    assert_eq!(cell.bits().bit_len(), 0);
    assert!(cell.is_empty());

    // acc3a728 adds a CRC trailer
    let boc = hex::decode("acc3a72801010101000200020000f66369a8").unwrap();
    let cell = Boc::decode(&boc).unwrap();
    assert!(cell.is_empty());

    // The offset index is skipped during parsing but still CRC-protected
    let mut corrupted = boc;
    corrupted[11] ^= 1;
    assert!(matches!(
        Boc::decode(&corrupted),
        Err(de::Error::InvalidChecksum)
    ));
}

#[test]
fn wide_size_fields_are_accepted() {
    // The encoder always emits single-byte size fields, but the decoder
    // accepts up to 4 bytes per reference index
    let boc = hex::decode("b5ee9c7202010001000100000200000000").unwrap();
    let cell = Boc::decode(&boc).unwrap();
    assert!(cell.is_empty());
}

#[test]
fn unknown_magic_is_rejected() {
    let boc = hex::decode("b5ee9c73010101010002000000").unwrap();
    assert!(matches!(
        Boc::decode(&boc),
        Err(de::Error::UnknownBocTag)
    ));
}

#[test]
fn backward_references_are_rejected() {
    // Second cell references the first one
    let boc = hex::decode("b5ee9c72010102010005000000010000").unwrap();
    assert!(matches!(
        Boc::decode(&boc),
        Err(de::Error::InvalidRefOrder)
    ));

    // A cell referencing itself
    let boc = hex::decode("b5ee9c7201010101000300010000").unwrap();
    assert!(matches!(
        Boc::decode(&boc),
        Err(de::Error::InvalidRefOrder)
    ));
}

#[test]
fn malformed_envelopes() {
    // Truncated header
    assert!(matches!(
        Boc::decode(hex::decode("b5ee9c7201").unwrap()),
        Err(de::Error::UnexpectedEof)
    ));

    // Trailing garbage after a complete envelope
    let mut boc = hex::decode("b5ee9c72010101010002000000").unwrap();
    boc.push(0x00);
    assert!(matches!(
        Boc::decode(&boc),
        Err(de::Error::UnexpectedTrailingBytes)
    ));

    // Declared total size does not match the cells
    let boc = hex::decode("b5ee9c7201010101000300000000").unwrap();
    assert!(matches!(
        Boc::decode(&boc),
        Err(de::Error::InvalidTotalSize)
    ));

    // Non-aligned cell without a completion tag
    let boc = hex::decode("b5ee9c7201010101000300000100").unwrap();
    assert!(matches!(
        Boc::decode(&boc),
        Err(de::Error::UnnormalizedCell)
    ));
}

#[test]
fn internal_message_header_layout() {
    let mut cell = Cell::new();
    let bits = cell.bits_mut();
    bits.store_bit(false).unwrap(); // int_msg_info$0
    bits.store_bit(true).unwrap(); // ihr_disabled
    bits.store_bit(false).unwrap(); // bounce
    bits.store_bit(false).unwrap(); // bounced
    bits.store_bit(false).unwrap();
    bits.store_address(None).unwrap(); // src
    bits.store_address(Some(&StdAddr::new(0, [0x00; 32])))
        .unwrap(); // dest
    bits.store_coins(&BigUint::default()).unwrap(); // value

    assert_eq!(bits.bit_len(), 5 + 2 + 267 + 4);
    let mut expected = vec![0x41];
    expected.extend_from_slice(&[0x00; 33]);
    expected.push(0x02);
    assert_eq!(bits.to_bytes_with_completion_tag(), expected);

    bits.store_uint(&BigUint::default(), 64).unwrap(); // created_lt
    bits.store_uint(&BigUint::default(), 32).unwrap(); // created_at

    let boc = Boc::encode(&cell).unwrap();
    let decoded = Boc::decode(&boc).unwrap();
    assert_eq!(decoded.repr_hash(), cell.repr_hash());

    let mut slice = decoded.as_slice();
    assert!(!slice.load_bit().unwrap());
    assert!(slice.load_bit().unwrap());
    assert!(!slice.load_bit().unwrap());
    assert!(!slice.load_bit().unwrap());
    assert!(!slice.load_bit().unwrap());
    assert_eq!(slice.load_address().unwrap(), None);
    assert_eq!(
        slice.load_address().unwrap(),
        Some(StdAddr::new(0, [0x00; 32]))
    );
    assert_eq!(slice.load_coins().unwrap(), BigUint::default());
}

#[test]
fn exotic_flag_round_trip() {
    let mut cell = Cell::new();
    cell.set_exotic(true);
    cell.bits_mut().store_bytes(&[0x01, 0x02]).unwrap();

    let boc = Boc::encode(&cell).unwrap();
    let decoded = Boc::decode(&boc).unwrap();
    assert!(decoded.is_exotic());
    assert_eq!(decoded.repr_hash(), cell.repr_hash());
}

#[test]
fn decode_roots_list() {
    let cell = Cell::new();
    let boc = Boc::encode(&cell).unwrap();

    let roots = Boc::decode_roots(&boc).unwrap();
    assert_eq!(roots.len(), 1);
    assert!(roots[0].is_empty());
}
