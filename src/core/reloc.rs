//! Relocation records handed from the emitter to the linker.

/// What the linker must write at a relocation site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelocationKind {
    /// 64-bit absolute address of the start of the zero-initialized region,
    /// plus the addend.
    ZeroRegionBase64,
}

impl RelocationKind {
    /// Width in bytes of the patched field.
    pub const fn size(self) -> usize {
        match self {
            RelocationKind::ZeroRegionBase64 => 8,
        }
    }
}

/// A patch the linker applies to the emitted code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relocation {
    pub kind: RelocationKind,
    /// Offset in the code buffer of the field to patch.
    pub offset: usize,
    /// Added to the resolved address before it is stored.
    pub addend: i64,
}

impl Relocation {
    pub const fn zero_region_base(offset: usize) -> Self {
        Self {
            kind: RelocationKind::ZeroRegionBase64,
            offset,
            addend: 0,
        }
    }
}
