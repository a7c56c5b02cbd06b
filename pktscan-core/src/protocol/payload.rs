//! Opaque payload, the terminal protocol of every chain.

use crate::schema::{FieldDescriptor, FieldKind};

use super::Header;

/// Whatever is left once no further header can be identified.
#[derive(Debug, Clone, Copy)]
pub struct PayloadHeader;

impl Header for PayloadHeader {
    fn name(&self) -> &'static str {
        "payload"
    }

    fn display_name(&self) -> &'static str {
        "Payload"
    }

    fn fields(&self) -> Vec<FieldDescriptor> {
        vec![FieldDescriptor::new("data", FieldKind::Bytes).at(0)]
    }

    fn header_length(&self, data: &[u8], offset: usize) -> usize {
        data.len().saturating_sub(offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_takes_everything_left() {
        assert_eq!(PayloadHeader.header_length(&[0; 10], 4), 6);
        assert_eq!(PayloadHeader.header_length(&[0; 10], 12), 0);
    }
}
