//! WOFF and WOFF2 containers around a compiled TTF.
//!
//! WOFF compresses every table on its own with zlib. WOFF2 compresses the
//! whole table set as one brotli stream; `glyf` and `loca` are stored with
//! the null transform, so the font decodes back to the same tables.

use anyhow::{Context, Result};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::Write;
use write_fonts::read::FontRef;

const SFNT_VERSION: u32 = 0x0001_0000;
const WOFF_SIGNATURE: u32 = 0x774F_4646;
const WOFF2_SIGNATURE: u32 = 0x774F_4632;

const WOFF_HEADER_SIZE: usize = 44;
const WOFF_ENTRY_SIZE: usize = 20;
const WOFF2_HEADER_SIZE: usize = 48;

const BROTLI_QUALITY: u32 = 11;
const BROTLI_WINDOW: u32 = 22;

/// Tags with a one-byte code in the WOFF2 table directory; anything else is
/// written out in full after the escape code 63.
const WOFF2_KNOWN_TAGS: [&[u8; 4]; 25] = [
    b"cmap", b"head", b"hhea", b"hmtx", b"maxp", b"name", b"OS/2", b"post", b"cvt ", b"fpgm",
    b"glyf", b"loca", b"prep", b"CFF ", b"VORG", b"EBDT", b"EBLC", b"gasp", b"hdmx", b"kern",
    b"LTSH", b"PCLT", b"VDMX", b"vhea", b"vmtx",
];

/// Transform version 3 marks `glyf`/`loca` as stored untransformed
const WOFF2_NULL_TRANSFORM: u8 = 3 << 6;

struct SfntTable<'a> {
    tag: [u8; 4],
    checksum: u32,
    data: &'a [u8],
}

/// Tables of a TTF, sorted by tag.
fn sfnt_tables(ttf: &[u8]) -> Result<Vec<SfntTable<'_>>> {
    let font =
        FontRef::new(ttf).map_err(|e| anyhow::anyhow!("Not a valid TrueType font: {e}"))?;

    let mut tables = font
        .table_directory
        .table_records()
        .iter()
        .map(|record| -> Result<SfntTable> {
            let tag = record.tag().to_be_bytes();
            let start = record.offset() as usize;
            let data = ttf
                .get(start..start + record.length() as usize)
                .with_context(|| format!("Table {} is truncated", String::from_utf8_lossy(&tag)))?;
            Ok(SfntTable {
                tag,
                checksum: record.checksum(),
                data,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    tables.sort_by_key(|t| t.tag);
    Ok(tables)
}

fn padded(len: usize) -> usize {
    (len + 3) & !3
}

fn total_sfnt_size(tables: &[SfntTable]) -> usize {
    12 + 16 * tables.len() + tables.iter().map(|t| padded(t.data.len())).sum::<usize>()
}

fn put_u16(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_be_bytes());
}

fn put_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_be_bytes());
}

fn pad_to_4(out: &mut Vec<u8>) {
    out.resize(padded(out.len()), 0);
}

/// WOFF 1.0 file of `ttf`. `version` is the `(major, minor)` font version.
pub fn encode_woff(ttf: &[u8], version: (u16, u16)) -> Result<Vec<u8>> {
    let tables = sfnt_tables(ttf)?;

    let mut blocks = Vec::with_capacity(tables.len());
    for table in &tables {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
        encoder.write_all(table.data)?;
        let compressed = encoder.finish()?;
        // Tables that do not shrink are stored as they are
        blocks.push(if compressed.len() < table.data.len() {
            compressed
        } else {
            table.data.to_vec()
        });
    }

    let mut offset = WOFF_HEADER_SIZE + WOFF_ENTRY_SIZE * tables.len();
    let mut directory = Vec::with_capacity(WOFF_ENTRY_SIZE * tables.len());
    for (table, block) in tables.iter().zip(&blocks) {
        directory.extend_from_slice(&table.tag);
        put_u32(&mut directory, offset as u32);
        put_u32(&mut directory, block.len() as u32);
        put_u32(&mut directory, table.data.len() as u32);
        put_u32(&mut directory, table.checksum);
        offset += padded(block.len());
    }
    let length = offset;

    let mut out = Vec::with_capacity(length);
    put_u32(&mut out, WOFF_SIGNATURE);
    put_u32(&mut out, SFNT_VERSION);
    put_u32(&mut out, length as u32);
    put_u16(&mut out, tables.len() as u16);
    put_u16(&mut out, 0);
    put_u32(&mut out, total_sfnt_size(&tables) as u32);
    put_u16(&mut out, version.0);
    put_u16(&mut out, version.1);
    // No metadata or private block
    out.extend_from_slice(&[0; 20]);

    out.extend_from_slice(&directory);
    for block in &blocks {
        out.extend_from_slice(block);
        pad_to_4(&mut out);
    }

    Ok(out)
}

/// UIntBase128: big-endian groups of 7 bits, high bit set on all but the last.
fn put_base128(out: &mut Vec<u8>, value: u32) {
    let mut groups = [0u8; 5];
    let mut count = 0;
    let mut rest = value;
    loop {
        groups[count] = (rest & 0x7f) as u8;
        count += 1;
        rest >>= 7;
        if rest == 0 {
            break;
        }
    }
    for i in (0..count).rev() {
        let continuation = if i > 0 { 0x80 } else { 0 };
        out.push(groups[i] | continuation);
    }
}

/// WOFF2 file of `ttf`. `version` is the `(major, minor)` font version.
pub fn encode_woff2(ttf: &[u8], version: (u16, u16)) -> Result<Vec<u8>> {
    let mut tables = sfnt_tables(ttf)?;

    // `loca` has to follow `glyf` directly
    if let Some(loca) = tables.iter().position(|t| &t.tag == b"loca") {
        let loca = tables.remove(loca);
        let glyf = tables.iter().position(|t| &t.tag == b"glyf").map_or(tables.len(), |i| i + 1);
        tables.insert(glyf, loca);
    }

    let mut directory = Vec::new();
    let mut stream = Vec::new();
    for table in &tables {
        let known = WOFF2_KNOWN_TAGS.iter().position(|tag| **tag == table.tag);
        let transform = match &table.tag {
            b"glyf" | b"loca" => WOFF2_NULL_TRANSFORM,
            _ => 0,
        };
        match known {
            Some(index) => directory.push(index as u8 | transform),
            None => {
                directory.push(63 | transform);
                directory.extend_from_slice(&table.tag);
            }
        }
        put_base128(&mut directory, table.data.len() as u32);
        stream.extend_from_slice(table.data);
    }

    let mut compressed = Vec::new();
    {
        let mut writer =
            brotli::CompressorWriter::new(&mut compressed, 4096, BROTLI_QUALITY, BROTLI_WINDOW);
        writer.write_all(&stream)?;
    }

    let length = padded(WOFF2_HEADER_SIZE + directory.len() + compressed.len());

    let mut out = Vec::with_capacity(length);
    put_u32(&mut out, WOFF2_SIGNATURE);
    put_u32(&mut out, SFNT_VERSION);
    put_u32(&mut out, length as u32);
    put_u16(&mut out, tables.len() as u16);
    put_u16(&mut out, 0);
    put_u32(&mut out, total_sfnt_size(&tables) as u32);
    put_u32(&mut out, compressed.len() as u32);
    put_u16(&mut out, version.0);
    put_u16(&mut out, version.1);
    out.extend_from_slice(&[0; 20]);

    out.extend_from_slice(&directory);
    out.extend_from_slice(&compressed);
    pad_to_4(&mut out);

    Ok(out)
}
