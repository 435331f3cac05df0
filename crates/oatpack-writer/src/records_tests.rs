//! Tests for the structural records.

use oatpack_format::{ChecksumAccumulator, MethodLayout};

use crate::records::{ClassTable, InputDescriptor, MethodsTable};

#[test]
fn descriptor_size_counts_length_prefix_and_trailing_words() {
    let descriptor = InputDescriptor::new("core.jar", 0xABCD);

    assert_eq!(descriptor.size_of(), 4 + 8 + 4 + 4);
}

#[test]
fn descriptor_writes_length_location_checksum_offset() {
    let mut descriptor = InputDescriptor::new("a.jar", 0x0102_0304);
    descriptor.classes_offset = 0x44;

    let mut bytes = Vec::new();
    descriptor.write_to(&mut bytes).unwrap();

    assert_eq!(bytes.len(), descriptor.size_of());
    assert_eq!(&bytes[0..4], &[5, 0, 0, 0]);
    assert_eq!(&bytes[4..9], b"a.jar");
    assert_eq!(&bytes[9..13], &[0x04, 0x03, 0x02, 0x01]);
    assert_eq!(&bytes[13..17], &[0x44, 0, 0, 0]);
}

#[test]
fn descriptor_checksum_covers_the_written_bytes() {
    let mut descriptor = InputDescriptor::new("a.jar", 0x0102_0304);
    descriptor.classes_offset = 0x44;

    let mut from_record = ChecksumAccumulator::new();
    descriptor.update_checksum(&mut from_record);

    let mut bytes = Vec::new();
    descriptor.write_to(&mut bytes).unwrap();
    let mut from_bytes = ChecksumAccumulator::new();
    from_bytes.update(&bytes);

    assert_eq!(from_record.value(), from_bytes.value());
}

#[test]
fn class_table_is_one_word_per_class_def() {
    let mut table = ClassTable::new(3);
    table.methods_offsets = vec![0x100, 0x200, 0x300];

    assert_eq!(table.size_of(), 12);

    let mut bytes = Vec::new();
    table.write_to(&mut bytes).unwrap();
    assert_eq!(&bytes[0..4], &[0x00, 0x01, 0, 0]);
    assert_eq!(&bytes[8..12], &[0x00, 0x03, 0, 0]);
}

#[test]
fn methods_table_writes_records_back_to_back() {
    let mut table = MethodsTable::new(2);
    table.layouts[1] = MethodLayout {
        code_offset: 0x1000,
        ..MethodLayout::default()
    };

    assert_eq!(table.size_of(), 2 * MethodLayout::SIZE);

    let mut bytes = Vec::new();
    table.write_to(&mut bytes).unwrap();
    assert_eq!(&bytes[..MethodLayout::SIZE], &[0u8; MethodLayout::SIZE]);
    assert_eq!(
        MethodLayout::from_bytes(&bytes[MethodLayout::SIZE..]).code_offset,
        0x1000
    );
}

#[test]
fn empty_methods_table_has_no_bytes_and_no_checksum_effect() {
    let table = MethodsTable::new(0);

    assert_eq!(table.size_of(), 0);

    let mut untouched = ChecksumAccumulator::new();
    let before = untouched.value();
    table.update_checksum(&mut untouched);
    assert_eq!(untouched.value(), before);
}
