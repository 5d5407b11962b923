//! file: core/src/assembly/unix.rs
//! description: hand-rolled ELF64 section-header parser, used as the POSIX
//! fallback when the image isn't a PE (`windows_pe::parse_sections` fails).
//! Modeled on the same "walk the object format's section table" shape as
//! `src/utils/assembly_linux.cpp` uses, minus virtual-table support (the
//! original documents that as Windows-only).

use super::Section;

const ELF_MAGIC: [u8; 4] = [0x7f, b'E', b'L', b'F'];
const ELFCLASS64: u8 = 2;

fn read_u16(buf: &[u8], offset: usize) -> Option<u16> {
    buf.get(offset..offset + 2)
        .map(|b| u16::from_le_bytes([b[0], b[1]]))
}

fn read_u32(buf: &[u8], offset: usize) -> Option<u32> {
    buf.get(offset..offset + 4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

fn read_u64(buf: &[u8], offset: usize) -> Option<u64> {
    buf.get(offset..offset + 8).map(|b| {
        u64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]])
    })
}

/// Walks `Elf64_Ehdr` -> `Elf64_Shdr[]`, resolving section names via the
/// section-header string table (`e_shstrndx`).
pub(super) fn parse_sections(image: &[u8]) -> Option<Vec<Section>> {
    if image.get(0..4)? != ELF_MAGIC {
        return None;
    }
    if image.get(4).copied()? != ELFCLASS64 {
        return None;
    }

    let e_shoff = read_u64(image, 0x28)? as usize;
    let e_shentsize = read_u16(image, 0x3a)? as usize;
    let e_shnum = read_u16(image, 0x3c)? as usize;
    let e_shstrndx = read_u16(image, 0x3e)? as usize;

    if e_shnum == 0 {
        return Some(Vec::new());
    }

    let strtab_hdr = e_shoff + e_shstrndx * e_shentsize;
    let strtab_offset = read_u64(image, strtab_hdr + 0x18)? as usize;

    let mut sections = Vec::with_capacity(e_shnum);
    for i in 0..e_shnum {
        let base = e_shoff + i * e_shentsize;
        let name_offset = read_u32(image, base)? as usize;
        let name = read_cstr(image, strtab_offset + name_offset).unwrap_or_default();
        let addr = read_u64(image, base + 0x10)?;
        let size = read_u64(image, base + 0x20)?;
        sections.push(Section {
            name,
            virtual_address: addr,
            size,
        });
    }
    Some(sections)
}

fn read_cstr(buf: &[u8], offset: usize) -> Option<String> {
    let slice = buf.get(offset..)?;
    let end = slice.iter().position(|&b| b == 0)?;
    Some(String::from_utf8_lossy(&slice[..end]).to_string())
}
