//! Archive listings through the default registry

use crate::common::{registry, serialize};
use moin_babel::{Arguments, Element, HostConfig, Type};
use std::io::{Cursor, Write};

fn parse_archive(data: &[u8], content_type: &str) -> Element {
    let arguments = Arguments::from_keywords([("item", "Files/bundle")]);
    registry()
        .parse_bytes(data, &Type::parse(content_type).unwrap(), &HostConfig::default(), &arguments)
        .expect("archive to parse")
}

#[test]
fn deflated_zip_is_not_decoded_as_text() {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default()
        .last_modified_time(zip::DateTime::from_date_and_time(2023, 1, 2, 3, 4, 6).unwrap());
    writer.start_file("data.bin", options).unwrap();
    writer.write_all(&[0xff; 64]).unwrap();
    let data = writer.finish().unwrap().into_inner();

    let out = serialize(&parse_archive(&data, "application/zip"), "text");
    assert!(out.contains("64 | 2023-01-02 03:04:06 | data.bin"), "{out}");
}

#[test]
fn gtar_reads_as_tar() {
    let mut builder = tar::Builder::new(Vec::new());
    let mut header = tar::Header::new_gnu();
    header.set_size(2);
    header.set_mode(0o644);
    header.set_mtime(0);
    builder.append_data(&mut header, "notes.txt", &b"hi"[..]).unwrap();
    let data = builder.into_inner().unwrap();

    let out = serialize(&parse_archive(&data, "application/x-gtar"), "text");
    assert!(out.contains("2 | 1970-01-01 00:00:00 | notes.txt"), "{out}");
}

#[test]
fn gzipped_tar_reports_an_error() {
    let out = serialize(&parse_archive(&[0x1f, 0x8b, 8, 0, 0, 0], "application/x-gtar"), "text");
    assert!(out.contains("compressed tar archives are not supported"), "{out}");
}
