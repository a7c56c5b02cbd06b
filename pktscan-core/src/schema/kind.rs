/// Wire representation of a declared header field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    /// Single-bit or boolean flag
    Flag,

    /// Sub-byte bit field of the given width
    Bits(u8),

    UInt8,
    UInt16,
    UInt32,

    /// Fixed-size byte run (e.g., MAC address = 6, IPv6 address = 16)
    Fixed(usize),

    /// Variable-length bytes whose size comes from another field
    Bytes,

    /// Text that runs up to a delimiter
    Text,
}

impl FieldKind {
    /// Short type name for display.
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldKind::Flag => "flag",
            FieldKind::Bits(_) => "bits",
            FieldKind::UInt8 => "u8",
            FieldKind::UInt16 => "u16",
            FieldKind::UInt32 => "u32",
            FieldKind::Fixed(6) => "mac",
            FieldKind::Fixed(16) => "ipv6",
            FieldKind::Fixed(_) => "fixed",
            FieldKind::Bytes => "bytes",
            FieldKind::Text => "text",
        }
    }

    /// Width in bits for fixed-width kinds, None for variable-width ones.
    pub fn bit_width(&self) -> Option<usize> {
        match self {
            FieldKind::Flag => Some(1),
            FieldKind::Bits(n) => Some(*n as usize),
            FieldKind::UInt8 => Some(8),
            FieldKind::UInt16 => Some(16),
            FieldKind::UInt32 => Some(32),
            FieldKind::Fixed(n) => Some(n * 8),
            FieldKind::Bytes | FieldKind::Text => None,
        }
    }
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.type_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_names() {
        assert_eq!(FieldKind::UInt16.type_name(), "u16");
        assert_eq!(FieldKind::Fixed(6).type_name(), "mac");
        assert_eq!(FieldKind::Fixed(16).type_name(), "ipv6");
        assert_eq!(FieldKind::Fixed(4).type_name(), "fixed");
    }

    #[test]
    fn test_bit_widths() {
        assert_eq!(FieldKind::Bits(4).bit_width(), Some(4));
        assert_eq!(FieldKind::Fixed(6).bit_width(), Some(48));
        assert_eq!(FieldKind::Text.bit_width(), None);
    }
}
