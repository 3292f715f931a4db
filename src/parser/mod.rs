//! Parser: error-tolerant XML with exact source spans
//!
//! MSBuild files are XML, but an editor sees them half-typed most of the
//! time. The parser here never fails: it records [`XmlError`]s and returns
//! whatever tree it could build, closing open elements at end of input.
//!
//! Tokenization is done by `quick-xml`; tag internals (names, attributes and
//! their quoted values) are scanned directly from the source text so every
//! node carries byte ranges into the original buffer.

mod xml;

pub use xml::{NodeId, XAttribute, XElement, XmlDocument, XmlError, XmlErrorKind, parse_xml};
