//! The header plug-in interface.

use std::any::TypeId;
use std::fmt;
use std::sync::Arc;

use crate::flow::FlowKeyBuilder;
use crate::scan::HeaderFlags;
use crate::schema::FieldDescriptor;

use super::{BindingRule, ProtocolId, ScannerFlags};

/// Lengths of the five logical byte ranges around one header occurrence.
///
/// Layout on the wire: `prefix | header | gap | payload | postfix`. A payload
/// of 0 means "everything up to the end of the enclosing region".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Segments {
    pub prefix: usize,
    pub header: usize,
    pub gap: usize,
    pub payload: usize,
    pub postfix: usize,
}

impl Segments {
    /// Segments of a plain fixed-size header with no framing around it.
    pub const fn header(len: usize) -> Self {
        Self {
            prefix: 0,
            header: len,
            gap: 0,
            payload: 0,
            postfix: 0,
        }
    }

    pub const fn with_payload(mut self, payload: usize) -> Self {
        self.payload = payload;
        self
    }

    pub const fn with_postfix(mut self, postfix: usize) -> Self {
        self.postfix = postfix;
        self
    }

    pub fn total(&self) -> usize {
        self.prefix
            .saturating_add(self.header)
            .saturating_add(self.gap)
            .saturating_add(self.payload)
            .saturating_add(self.postfix)
    }
}

/// Descriptor of a nested option or extension header.
///
/// Sub-headers are not scanned as separate records; they describe optional
/// structures that live inside their parent's header bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct SubHeader {
    /// Type code that selects this sub-header inside the parent
    pub code: u8,
    pub name: &'static str,
    pub display_name: &'static str,
    pub fields: Vec<FieldDescriptor>,
}

impl SubHeader {
    pub fn new(code: u8, name: &'static str, display_name: &'static str) -> Self {
        Self {
            code,
            name,
            display_name,
            fields: Vec::new(),
        }
    }

    pub fn with_fields(mut self, fields: Vec<FieldDescriptor>) -> Self {
        self.fields = fields;
        self
    }
}

/// A protocol header type the scanner can walk over.
///
/// Only [`name`](Header::name) and [`header_length`](Header::header_length)
/// are required. Every length hook receives the full captured buffer and the
/// offset the segment starts at; bytes past the end of the slice are absent.
/// Hooks that inspect "the header" receive exactly the header's bytes.
pub trait Header: Send + Sync + 'static {
    /// Short name (e.g., "ipv4").
    fn name(&self) -> &'static str;

    /// Human-readable display name.
    fn display_name(&self) -> &'static str {
        self.name()
    }

    /// Fields this header declares.
    fn fields(&self) -> Vec<FieldDescriptor> {
        Vec::new()
    }

    /// Nested option/extension descriptors.
    fn sub_headers(&self) -> Vec<SubHeader> {
        Vec::new()
    }

    /// Capture link types that start a scan at this header.
    fn link_types(&self) -> &'static [u16] {
        &[]
    }

    /// Scanner flags installed at registration.
    fn scanner_flags(&self) -> ScannerFlags {
        ScannerFlags::empty()
    }

    fn prefix_length(&self, _data: &[u8], _offset: usize) -> usize {
        0
    }

    /// Length of the header proper. 0 means the header is not present.
    fn header_length(&self, data: &[u8], offset: usize) -> usize;

    fn gap_length(&self, _data: &[u8], _offset: usize) -> usize {
        0
    }

    fn payload_length(&self, _data: &[u8], _offset: usize) -> usize {
        0
    }

    fn postfix_length(&self, _data: &[u8], _offset: usize) -> usize {
        0
    }

    /// Whole-segment hook for layouts that cannot be measured piecewise.
    ///
    /// When this returns `Some`, the individual length hooks are skipped.
    /// `offset` is where the prefix would start.
    fn segments(&self, _data: &[u8], _offset: usize) -> Option<Segments> {
        None
    }

    /// Explicit next-header hook, given this header's bytes.
    ///
    /// `Some` is final and skips binding rules. `None` lets the rules decide.
    fn next_header(&self, _header: &[u8]) -> Option<ProtocolId> {
        None
    }

    /// Binding rules that let this header follow another one.
    ///
    /// The rule's source is filled in with this header's id at registration.
    fn bindings(&self) -> Vec<BindingRule> {
        Vec::new()
    }

    /// Heuristic bindings, evaluated only when the target's scanner has
    /// heuristic binding enabled.
    fn heuristics(&self) -> Vec<BindingRule> {
        Vec::new()
    }

    /// Per-record flags derived from the header bytes (e.g., fragmentation).
    fn record_flags(&self, _header: &[u8]) -> HeaderFlags {
        HeaderFlags::empty()
    }

    /// Checksum verdict, if this header carries one it can verify.
    ///
    /// Called only for records whose header, gap and payload were captured
    /// in full.
    fn checksum(&self, _header: &[u8], _payload: &[u8]) -> Option<bool> {
        None
    }

    /// Contribute to the packet's flow key. Called for the first instance of
    /// each header in a packet.
    fn flow_key(&self, _header: &[u8], _key: &mut FlowKeyBuilder<'_>) {}
}

/// Static metadata for a registered protocol.
#[derive(Clone)]
pub struct HeaderDescriptor {
    pub id: ProtocolId,
    pub name: &'static str,
    pub display_name: &'static str,
    pub fields: Vec<FieldDescriptor>,
    pub sub_headers: Vec<SubHeader>,
    pub link_types: Vec<u16>,
    pub(crate) type_id: TypeId,
    pub(crate) hooks: Arc<dyn Header>,
}

impl HeaderDescriptor {
    pub(crate) fn from_header<H: Header>(id: ProtocolId, header: H) -> Self {
        Self {
            id,
            name: header.name(),
            display_name: header.display_name(),
            fields: header.fields(),
            sub_headers: header.sub_headers(),
            link_types: header.link_types().to_vec(),
            type_id: TypeId::of::<H>(),
            hooks: Arc::new(header),
        }
    }

    /// The header implementation behind this descriptor.
    pub fn hooks(&self) -> &dyn Header {
        self.hooks.as_ref()
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn sub_header(&self, code: u8) -> Option<&SubHeader> {
        self.sub_headers.iter().find(|s| s.code == code)
    }
}

impl fmt::Debug for HeaderDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeaderDescriptor")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("fields", &self.fields.len())
            .field("sub_headers", &self.sub_headers.len())
            .field("link_types", &self.link_types)
            .finish()
    }
}
