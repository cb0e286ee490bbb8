//! OSMDATA: in-memory OSM XML documents for trail/terrain extraction.
//!
//! - Nodes and ways live in arenas; every other top-level element (bounds,
//!   relations, ...) is carried through untouched in document order.
//! - Each arena has an "included" id set that starts out holding every id.
//!   Filters only shrink the included sets; nothing is removed until
//!   [`VectorDocument::prepare_for_save`].
//! - Filter groups are AND-ed internally and OR-ed with each other.
//! - Reference closure: a retained way always keeps the nodes it references.
//! - [`merge`] concatenates documents without reconciling duplicate ids.
//!
//! Document shape (attributes other than the ones listed are preserved):
//!   <osm ...>
//!     <node id=".." lat=".." lon=".."> <tag k=".." v=".."/>* </node>
//!     <way id=".."> <nd ref=".."/>* <tag k=".." v=".."/>* </way>
//!     <anything-else .../>
//!   </osm>

mod document;
mod element;
mod error;
mod filter;
mod merge;
pub mod predicates;

pub use document::{Entity, Node, VectorDocument, Way};
pub use element::Element;
pub use error::{OsmError, Result};
pub use filter::{FilterComposer, FilterGroup, Predicate};
pub use merge::merge;

pub const TAG_ROOT: &str = "osm";
pub const TAG_NODE: &str = "node";
pub const TAG_WAY: &str = "way";
pub const TAG_WAY_NODE: &str = "nd";
pub const TAG_TAG: &str = "tag";
pub const ATTRIB_ID: &str = "id";
pub const ATTRIB_REF: &str = "ref";
pub const ATTRIB_KEY: &str = "k";
pub const ATTRIB_VALUE: &str = "v";
pub const KEY_LANDUSE: &str = "landuse";
pub const KEY_HIGHWAY: &str = "highway";
