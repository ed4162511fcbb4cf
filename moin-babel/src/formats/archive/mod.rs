//! Archive listings
//!
//! Zip and tar archives are not documents, but an item holding one still gets
//! a rendering: a table of the regular files inside, with size, modification
//! time and a link that fetches the member. Directories are left out. An
//! archive that cannot be read becomes a one-cell table holding the error.
//!
//! The `item` argument names the wiki item the archive is stored under; member
//! links point at it, or at the current item when it is missing.

use crate::common::links::{urlencode, wiki_local};
use crate::common::table::{build_dom_table, CellData};
use crate::error::ConvertError;
use crate::format::{Format, ParseContext};
use crate::ir::names::attr;
use crate::ir::{Element, QName};
use crate::mime::Type;
use chrono::{DateTime, NaiveDate};
use std::io::Cursor;
use thiserror::Error;

const TABLE_CLASS: &str = "zebra";
const HEADER: [&str; 3] = ["Size", "Timestamp", "Name"];
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Why an archive could not be listed
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("bad zip archive: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("bad tar archive: {0}")]
    Tar(#[from] std::io::Error),
    #[error("compressed tar archives are not supported")]
    Compressed,
}

/// One regular file inside an archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub name: String,
    pub size: u64,
    /// `YYYY-MM-DD HH:MM:SS`, empty when the archive has no usable time
    pub modified: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    Zip,
    Tar,
}

/// Members of a zip archive, in central directory order.
pub fn zip_members(data: &[u8]) -> Result<Vec<Member>, ArchiveError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(data))?;
    let mut members = Vec::new();
    for index in 0..archive.len() {
        // raw access reads the metadata only, so encrypted members list too
        let file = archive.by_index_raw(index)?;
        if file.is_dir() {
            continue;
        }
        let modified = file
            .last_modified()
            .and_then(|time| {
                NaiveDate::from_ymd_opt(time.year().into(), time.month().into(), time.day().into())?
                    .and_hms_opt(time.hour().into(), time.minute().into(), time.second().into())
            })
            .map(|time| time.format(TIMESTAMP_FORMAT).to_string())
            .unwrap_or_default();
        members.push(Member {
            name: file.name().to_string(),
            size: file.size(),
            modified,
        });
    }
    Ok(members)
}

/// Regular files of an uncompressed tar archive, in archive order.
pub fn tar_members(data: &[u8]) -> Result<Vec<Member>, ArchiveError> {
    if data.starts_with(&[0x1f, 0x8b]) || data.starts_with(b"BZh") || data.starts_with(&[0xfd, b'7', b'z']) {
        return Err(ArchiveError::Compressed);
    }
    let mut archive = tar::Archive::new(data);
    let mut members = Vec::new();
    for entry in archive.entries()? {
        let entry = entry?;
        let header = entry.header();
        if !header.entry_type().is_file() {
            continue;
        }
        let modified = header
            .mtime()
            .ok()
            .and_then(|seconds| i64::try_from(seconds).ok())
            .and_then(|seconds| DateTime::from_timestamp(seconds, 0))
            .map(|time| time.format(TIMESTAMP_FORMAT).to_string())
            .unwrap_or_default();
        members.push(Member {
            name: entry.path()?.to_string_lossy().into_owned(),
            size: header.size()?,
            modified,
        });
    }
    Ok(members)
}

fn member_link(item: &str, member: &str) -> Element {
    let query = urlencode([("do", "get"), ("member", member)]);
    Element::page("a")
        .with_attr(QName::xlink("href"), wiki_local(item, Some(&query), None))
        .with_child(member)
}

/// The listing table of `members`.
pub fn listing(members: &[Member], item: &str) -> Element {
    let rows: Vec<Vec<CellData>> = members
        .iter()
        .map(|member| {
            vec![
                CellData::from(member.size.to_string()),
                CellData::from(member.modified.as_str()),
                CellData::from(member_link(item, &member.name)),
            ]
        })
        .collect();
    let head: Vec<String> = HEADER.iter().map(|h| h.to_string()).collect();
    build_dom_table(&rows, Some(head.as_slice()), Some(TABLE_CLASS))
}

/// Format implementation for zip and tar archives
#[derive(Debug, Clone, Copy)]
pub struct ArchiveFormat {
    kind: ArchiveKind,
}

impl ArchiveFormat {
    pub fn zip() -> Self {
        ArchiveFormat { kind: ArchiveKind::Zip }
    }

    pub fn tar() -> Self {
        ArchiveFormat { kind: ArchiveKind::Tar }
    }

    pub fn kind(&self) -> ArchiveKind {
        self.kind
    }

    fn members(&self, data: &[u8]) -> Result<Vec<Member>, ArchiveError> {
        match self.kind {
            ArchiveKind::Zip => zip_members(data),
            ArchiveKind::Tar => tar_members(data),
        }
    }
}

impl Format for ArchiveFormat {
    fn name(&self) -> &str {
        match self.kind {
            ArchiveKind::Zip => "zip",
            ArchiveKind::Tar => "tar",
        }
    }

    fn description(&self) -> &str {
        match self.kind {
            ArchiveKind::Zip => "Zip archive, listed as a table",
            ArchiveKind::Tar => "Tar archive, listed as a table",
        }
    }

    fn file_extensions(&self) -> &[&str] {
        match self.kind {
            ArchiveKind::Zip => &["zip"],
            ArchiveKind::Tar => &["tar"],
        }
    }

    fn input_types(&self) -> Vec<Type> {
        match self.kind {
            ArchiveKind::Zip => vec![Type::new(Some("application"), Some("zip"))],
            ArchiveKind::Tar => vec![
                Type::new(Some("application"), Some("x-tar")),
                Type::new(Some("application"), Some("x-gtar")),
            ],
        }
    }

    fn supports_parsing(&self) -> bool {
        true
    }

    fn parse(&self, source: &str, ctx: &ParseContext<'_>) -> Result<Element, ConvertError> {
        self.parse_bytes(source.as_bytes(), ctx)
    }

    #[tracing::instrument(level = "debug", skip_all, fields(kind = ?self.kind, len = data.len()))]
    fn parse_bytes(&self, data: &[u8], ctx: &ParseContext<'_>) -> Result<Element, ConvertError> {
        let mut body = Element::page("body");
        if data.is_empty() {
            return Ok(Element::document(body));
        }
        let item = ctx.arguments.get("item").unwrap_or_default();
        match self.members(data) {
            Ok(members) => {
                tracing::debug!(members = members.len(), "archive listed");
                body.push(listing(&members, item));
            }
            Err(err) => {
                tracing::warn!(error = %err, "archive could not be listed");
                let cell = vec![CellData::from(err.to_string())];
                body.push(build_dom_table(&[cell], None, None).with_page_attr(attr::CLASS, "moin-error"));
            }
        }
        Ok(Element::document(body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::args::Arguments;
    use crate::format::HostConfig;
    use crate::ir::xml::to_fragment;
    use crate::registry::ConverterRegistry;
    use std::io::Write;

    fn zip_bytes() -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let time = zip::DateTime::from_date_and_time(2024, 5, 17, 10, 30, 0).unwrap();
        let options = zip::write::SimpleFileOptions::default().last_modified_time(time);
        writer.add_directory("docs/", options).unwrap();
        writer.start_file("docs/readme.txt", options).unwrap();
        writer.write_all(b"hello").unwrap();
        writer.start_file("a b.txt", options).unwrap();
        writer.write_all(b"abc").unwrap();
        writer.finish().unwrap().into_inner()
    }

    fn tar_bytes() -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());
        let mut dir = tar::Header::new_gnu();
        dir.set_entry_type(tar::EntryType::Directory);
        dir.set_size(0);
        dir.set_mode(0o755);
        dir.set_mtime(0);
        builder.append_data(&mut dir, "src/", std::io::empty()).unwrap();
        let mut file = tar::Header::new_gnu();
        file.set_entry_type(tar::EntryType::Regular);
        file.set_size(4);
        file.set_mode(0o644);
        file.set_mtime(1_715_941_800);
        builder.append_data(&mut file, "src/main.rs", &b"fn m"[..]).unwrap();
        builder.into_inner().unwrap()
    }

    fn listed(format: ArchiveFormat, data: &[u8], item: &str) -> String {
        let registry = ConverterRegistry::new();
        let host = HostConfig::default();
        let ctx = ParseContext::new(&registry, &host, Type::moin_document())
            .with_arguments(Arguments::from_keywords([("item", item)]));
        to_fragment(&format.parse_bytes(data, &ctx).unwrap())
    }

    #[test]
    fn zip_lists_files_without_directories() {
        let members = zip_members(&zip_bytes()).unwrap();
        assert_eq!(
            members,
            vec![
                Member {
                    name: "docs/readme.txt".into(),
                    size: 5,
                    modified: "2024-05-17 10:30:00".into(),
                },
                Member {
                    name: "a b.txt".into(),
                    size: 3,
                    modified: "2024-05-17 10:30:00".into(),
                },
            ]
        );
    }

    #[test]
    fn tar_lists_regular_files_with_utc_times() {
        let members = tar_members(&tar_bytes()).unwrap();
        assert_eq!(
            members,
            vec![Member {
                name: "src/main.rs".into(),
                size: 4,
                modified: "2024-05-17 10:30:00".into(),
            }]
        );
    }

    #[test]
    fn compressed_tar_is_refused() {
        assert!(matches!(tar_members(&[0x1f, 0x8b, 8, 0]), Err(ArchiveError::Compressed)));
    }

    #[test]
    fn listing_links_members_to_the_item() {
        let xml = listed(ArchiveFormat::tar(), &tar_bytes(), "Files/src.tar");
        assert!(xml.starts_with("<page><body><table class=\"zebra\"><table-header><table-row>"));
        assert!(xml.contains("<table-cell>Timestamp</table-cell><table-cell>Name</table-cell>"));
        assert!(xml.contains(
            "<table-cell class=\"moin-integer\">4</table-cell><table-cell>2024-05-17 10:30:00</table-cell>"
        ));
        assert!(xml.contains("xlink:href=\"wiki.local:Files/src.tar?do=get&amp;member=src%2Fmain.rs\">src/main.rs</a>"));
    }

    #[test]
    fn unreadable_archive_becomes_an_error_table() {
        let xml = listed(ArchiveFormat::zip(), b"not a zip", "x.zip");
        assert!(xml.starts_with("<page><body><table class=\"moin-error\"><table-body><table-row><table-cell>bad zip archive"));
    }

    #[test]
    fn empty_archive_is_an_empty_body() {
        assert_eq!(listed(ArchiveFormat::zip(), b"", "x.zip"), "<page><body /></page>");
    }
}
