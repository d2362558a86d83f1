// This module provides the final linking step for bfaot: it turns a code buffer, an initialized
// data buffer, a zero-region size and a list of relocations into a directly executable ELF64
// image for x86-64 Linux. The image is written with the object crate's low-level ELF writer and
// contains no section headers, only two PT_LOAD program headers: a read/execute segment
// covering the ELF headers and the code, and a read/write segment holding the initialized data
// followed by the zero-initialized cell region. The cell region takes no space in the file;
// the loader maps it as demand-zeroed memory, which is why the emitter addresses it through a
// relocation instead of a literal. Relocations are applied to a copy of the code before it is
// written.

//! ELF64 executable linker.
//!
//! Layout of a linked image:
//!
//! ```text
//! file offset 0        ELF header, 2 program headers
//!             code     entry point            (PT_LOAD R+X, vaddr 0x400000 + offset)
//!             data     initialized data       (PT_LOAD R+W, fresh page)
//!             -        zero region, memsz only
//! ```

use object::elf;
use object::write::elf::{FileHeader, ProgramHeader, Writer};
use object::{Architecture, Endianness};
use thiserror::Error;

use crate::core::{Relocation, RelocationKind};

/// Virtual address the first byte of the file is mapped at.
pub const BASE_ADDRESS: u64 = 0x40_0000;
/// Segment alignment.
pub const PAGE_SIZE: u64 = 0x1000;
/// Alignment of the code and data blobs within the file.
const BLOB_ALIGN: usize = 16;

/// Errors returned by [`link`].
#[derive(Error, Debug)]
pub enum LinkError {
    #[error("unsupported architecture: {0:?}")]
    UnsupportedArchitecture(Architecture),

    #[error("relocation at offset {offset} does not fit in {len} bytes of code")]
    RelocationOutOfBounds { offset: usize, len: usize },

    #[error("image does not fit in the address space")]
    AddressOverflow,

    #[error("ELF writer: {0}")]
    Writer(#[from] object::write::Error),
}

/// Addresses and offsets chosen for one image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Layout {
    code_offset: u64,
    data_offset: u64,
    entry: u64,
    data_address: u64,
    /// First byte of the zero-initialized region.
    zero_base: u64,
    /// Size in memory of the data segment, zero region included.
    data_mem_size: u64,
}

impl Layout {
    fn new(code_offset: usize, data_offset: usize, data_len: usize, zero_size: u64) -> Result<Self, LinkError> {
        let code_offset = code_offset as u64;
        let data_offset = data_offset as u64;
        let data_len = data_len as u64;

        // A PT_LOAD's vaddr must be congruent to its file offset modulo the
        // page size, and the data segment must start on a page of its own.
        let data_page = BASE_ADDRESS
            .checked_add(data_offset)
            .and_then(|end| end.checked_next_multiple_of(PAGE_SIZE))
            .ok_or(LinkError::AddressOverflow)?;
        let data_address = data_page + data_offset % PAGE_SIZE;
        let zero_base = data_address.checked_add(data_len).ok_or(LinkError::AddressOverflow)?;
        let data_mem_size = data_len.checked_add(zero_size).ok_or(LinkError::AddressOverflow)?;
        zero_base.checked_add(zero_size).ok_or(LinkError::AddressOverflow)?;

        Ok(Self {
            code_offset,
            data_offset,
            entry: BASE_ADDRESS + code_offset,
            data_address,
            zero_base,
            data_mem_size,
        })
    }
}

/// Link `code` and `data` into an executable image.
///
/// `zero_size` bytes of zero-initialized memory follow `data` at run time.
/// Every relocation is resolved against the final layout and written into
/// a copy of `code`; the caller's buffer is not modified.
pub fn link(
    arch: Architecture,
    code: &[u8],
    data: &[u8],
    zero_size: u64,
    relocations: &[Relocation],
) -> Result<Vec<u8>, LinkError> {
    if arch != Architecture::X86_64 {
        return Err(LinkError::UnsupportedArchitecture(arch));
    }

    let mut image = Vec::new();
    let mut writer = Writer::new(Endianness::Little, true, &mut image);

    writer.reserve_file_header();
    writer.reserve_program_headers(2);
    let code_offset = writer.reserve(code.len(), BLOB_ALIGN);
    let data_offset = if data.is_empty() {
        writer.reserved_len()
    } else {
        writer.reserve(data.len(), BLOB_ALIGN)
    };

    let layout = Layout::new(code_offset, data_offset, data.len(), zero_size)?;
    log::debug!(
        "link layout: entry {:#x}, data at {:#x}, zero region {:#x}..+{:#x}",
        layout.entry,
        layout.data_address,
        layout.zero_base,
        zero_size
    );

    let patched = apply_relocations(code, relocations, &layout)?;
    let text_size = layout.code_offset + code.len() as u64;

    writer.write_file_header(&FileHeader {
        os_abi: elf::ELFOSABI_NONE,
        abi_version: 0,
        e_type: elf::ET_EXEC,
        e_machine: elf::EM_X86_64,
        e_entry: layout.entry,
        e_flags: 0,
    })?;

    writer.write_align_program_headers();
    writer.write_program_header(&ProgramHeader {
        p_type: elf::PT_LOAD,
        p_flags: elf::PF_R | elf::PF_X,
        p_offset: 0,
        p_vaddr: BASE_ADDRESS,
        p_paddr: BASE_ADDRESS,
        p_filesz: text_size,
        p_memsz: text_size,
        p_align: PAGE_SIZE,
    });
    writer.write_program_header(&ProgramHeader {
        p_type: elf::PT_LOAD,
        p_flags: elf::PF_R | elf::PF_W,
        p_offset: layout.data_offset,
        p_vaddr: layout.data_address,
        p_paddr: layout.data_address,
        p_filesz: data.len() as u64,
        p_memsz: layout.data_mem_size,
        p_align: PAGE_SIZE,
    });

    writer.pad_until(code_offset);
    writer.write(&patched);
    if !data.is_empty() {
        writer.pad_until(data_offset);
        writer.write(data);
    }
    drop(writer);

    log::debug!("linked image: {} bytes", image.len());
    Ok(image)
}

fn apply_relocations(
    code: &[u8],
    relocations: &[Relocation],
    layout: &Layout,
) -> Result<Vec<u8>, LinkError> {
    let mut patched = code.to_vec();

    for reloc in relocations {
        let end = reloc
            .offset
            .checked_add(reloc.kind.size())
            .filter(|&end| end <= patched.len())
            .ok_or(LinkError::RelocationOutOfBounds {
                offset: reloc.offset,
                len: patched.len(),
            })?;

        match reloc.kind {
            RelocationKind::ZeroRegionBase64 => {
                let value = layout
                    .zero_base
                    .checked_add_signed(reloc.addend)
                    .ok_or(LinkError::AddressOverflow)?;
                patched[reloc.offset..end].copy_from_slice(&value.to_le_bytes());
            }
        }
        log::trace!("applied {:?} at code offset {:#x}", reloc.kind, reloc.offset);
    }

    Ok(patched)
}
