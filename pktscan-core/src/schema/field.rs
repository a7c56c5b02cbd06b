//! Field descriptor for header layouts.

use super::FieldKind;

/// One declared field of a header.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    /// Field name (snake_case, e.g., "src_port")
    pub name: &'static str,

    /// Wire representation
    pub kind: FieldKind,

    /// Byte offset from the header start, when fixed
    pub offset: Option<usize>,

    /// Whether the field may be absent (options, extensions)
    pub optional: bool,

    /// Optional description for documentation
    pub description: Option<&'static str>,
}

impl FieldDescriptor {
    /// Create a new mandatory field with no fixed offset.
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            offset: None,
            optional: false,
            description: None,
        }
    }

    /// Builder: pin the field at a byte offset.
    pub const fn at(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Builder: mark the field as optional.
    pub const fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Add a description to the field.
    pub const fn with_description(mut self, desc: &'static str) -> Self {
        self.description = Some(desc);
        self
    }
}

/// Shorthands for fields that recur across headers.
impl FieldDescriptor {
    pub const fn src_port(offset: usize) -> Self {
        Self::new("src_port", FieldKind::UInt16)
            .at(offset)
            .with_description("Source port number")
    }

    pub const fn dst_port(offset: usize) -> Self {
        Self::new("dst_port", FieldKind::UInt16)
            .at(offset)
            .with_description("Destination port number")
    }

    pub const fn checksum(offset: usize) -> Self {
        Self::new("checksum", FieldKind::UInt16).at(offset)
    }

    pub const fn mac(name: &'static str, offset: usize) -> Self {
        Self::new(name, FieldKind::Fixed(6)).at(offset)
    }

    pub const fn ipv4(name: &'static str, offset: usize) -> Self {
        Self::new(name, FieldKind::Fixed(4)).at(offset)
    }

    pub const fn ipv6(name: &'static str, offset: usize) -> Self {
        Self::new(name, FieldKind::Fixed(16)).at(offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_creation() {
        let field = FieldDescriptor::new("ttl", FieldKind::UInt8);
        assert_eq!(field.name, "ttl");
        assert_eq!(field.kind, FieldKind::UInt8);
        assert!(!field.optional);
        assert!(field.offset.is_none());
    }

    #[test]
    fn test_builder_pattern() {
        let field = FieldDescriptor::new("options", FieldKind::Bytes)
            .at(20)
            .optional()
            .with_description("IP options");
        assert_eq!(field.offset, Some(20));
        assert!(field.optional);
        assert_eq!(field.description, Some("IP options"));
    }

    #[test]
    fn test_shorthands() {
        let port = FieldDescriptor::dst_port(2);
        assert_eq!(port.name, "dst_port");
        assert_eq!(port.offset, Some(2));

        let addr = FieldDescriptor::ipv6("src", 8);
        assert_eq!(addr.kind, FieldKind::Fixed(16));
    }
}
