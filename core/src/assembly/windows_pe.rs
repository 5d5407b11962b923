//! file: core/src/assembly/windows_pe.rs
//! description: hand-rolled PE header parser and the Windows x86-64 RTTI
//! complete-object-locator scan, modeled byte-for-byte on
//! `src/utils/assembly_windows.cpp`'s `Init` and `GetVirtualTableByName`.
//!
//! No `goblin`/`object` dependency: nothing in this codebase's lineage
//! reaches for a binary-parsing crate for a task this narrow, and the
//! original hand-rolls it too.

use super::Section;

const DOS_SIGNATURE: u16 = 0x5A4D; // "MZ"
const NT_SIGNATURE: u32 = 0x0000_4550; // "PE\0\0"
const OPTIONAL_HDR64_MAGIC: u16 = 0x20b;

fn read_u16(buf: &[u8], offset: usize) -> Option<u16> {
    buf.get(offset..offset + 2)
        .map(|b| u16::from_le_bytes([b[0], b[1]]))
}

fn read_u32(buf: &[u8], offset: usize) -> Option<u32> {
    buf.get(offset..offset + 4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

fn read_i32(buf: &[u8], offset: usize) -> Option<i32> {
    read_u32(buf, offset).map(|v| v as i32)
}

/// Walks `IMAGE_DOS_HEADER` -> `IMAGE_NT_HEADERS` -> `IMAGE_SECTION_HEADER[]`
/// exactly as the original's `Assembly::Init` does, treating each section's
/// `VirtualAddress`/`SizeOfRawData` pair as the section descriptor.
pub(super) fn parse_sections(image: &[u8]) -> Option<Vec<Section>> {
    if read_u16(image, 0)? != DOS_SIGNATURE {
        return None;
    }
    let e_lfanew = read_i32(image, 0x3c)? as usize;
    if read_u32(image, e_lfanew)? != NT_SIGNATURE {
        return None;
    }

    let file_header = e_lfanew + 4;
    let number_of_sections = read_u16(image, file_header + 2)? as usize;
    let size_of_optional_header = read_u16(image, file_header + 16)? as usize;
    let optional_header = file_header + 20;
    // 32-bit PE images' section headers line up the same way, but
    // find_virtual_table only needs x86-64, so the magic isn't checked here.
    let section_table = optional_header + size_of_optional_header;
    const IMAGE_SECTION_HEADER_SIZE: usize = 40;

    let mut sections = Vec::with_capacity(number_of_sections);
    for i in 0..number_of_sections {
        let base = section_table + i * IMAGE_SECTION_HEADER_SIZE;
        let name_bytes = image.get(base..base + 8)?;
        let name = String::from_utf8_lossy(name_bytes)
            .trim_end_matches('\0')
            .to_string();
        let virtual_address = read_u32(image, base + 12)? as u64;
        let size_of_raw_data = read_u32(image, base + 16)? as u64;
        sections.push(Section {
            name,
            virtual_address,
            size: size_of_raw_data,
        });
    }
    Some(sections)
}

fn section_bytes<'a>(image: &'a [u8], sections: &[Section], name: &str) -> Option<&'a [u8]> {
    let section = sections.iter().find(|s| s.name == name)?;
    let start = section.virtual_address as usize;
    image.get(start..start + section.size as usize)
}

fn find_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Reproduces `Assembly::GetVirtualTableByName`'s x86-64 scan: find the
/// decorated type-descriptor name in `.data`, walk back 0x10 bytes to the
/// RTTI type descriptor, then scan `.rdata` for 4-byte references whose
/// surrounding layout matches a complete-object-locator (signature field
/// == 1, offset field == 0), returning the locator + 0x8.
pub(super) fn find_virtual_table(
    image: &[u8],
    sections: &[Section],
    class_name: &str,
    decorated: bool,
) -> Option<VirtualTableRefInternal> {
    if class_name.is_empty() {
        return None;
    }
    let data = section_bytes(image, sections, ".data")?;
    let rdata = section_bytes(image, sections, ".rdata")?;

    let decorated_name = if decorated {
        class_name.to_string()
    } else {
        format!(".?AV{class_name}@@")
    };

    let type_descriptor_name_offset = find_bytes(data, decorated_name.as_bytes())?;
    // RTTI type descriptor begins 0x10 bytes before the mangled name.
    let rtti_type_descriptor_offset = type_descriptor_name_offset.checked_sub(0x10)?;
    let data_section = sections.iter().find(|s| s.name == ".data")?;
    let rtti_td_rva = data_section.virtual_address + rtti_type_descriptor_offset as u64;
    let needle = (rtti_td_rva as u32).to_le_bytes();

    let mut search_from = 0usize;
    while let Some(found) = find_bytes(&rdata[search_from..], &needle) {
        let reference = search_from + found;
        let signature_offset = reference.checked_sub(0xC);
        let vtable_offset_field = reference.checked_sub(0x8);
        if let (Some(sig_off), Some(off_off)) = (signature_offset, vtable_offset_field) {
            let signature = read_i32(rdata, sig_off);
            let vtable_offset = read_i32(rdata, off_off);
            if signature == Some(1) && vtable_offset == Some(0) {
                let locator_offset = sig_off;
                let rdata_section = sections.iter().find(|s| s.name == ".rdata")?;
                return Some(VirtualTableRefInternal {
                    section: rdata_section.name.clone(),
                    offset: locator_offset as u64 + 0x8,
                });
            }
        }
        search_from = reference + 4;
    }
    None
}

pub(super) type VirtualTableRefInternal = super::VirtualTableRef;
