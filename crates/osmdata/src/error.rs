//! Error types for loading and saving OSM documents

use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OsmError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("XML attribute error: {0}")]
    Attr(#[from] quick_xml::events::attributes::AttrError),

    #[error("document has no root element")]
    Empty,

    /// The root element was not `<osm>`. Fatal for this document; filtering cannot recover it.
    #[error("invalid OSM XML data: the root element was <{0}>, expected <osm>")]
    InvalidRoot(String),

    #[error("<{0}> element is missing its `{1}` attribute")]
    MissingAttribute(String, &'static str),

    #[error("invalid entity identifier {0:?}")]
    InvalidId(String),
}

pub type Result<T> = std::result::Result<T, OsmError>;
