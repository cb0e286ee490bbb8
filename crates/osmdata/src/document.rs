use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::mem;
use std::path::Path;

use log::debug;
use quick_xml::events::{BytesDecl, BytesEnd, Event};
use quick_xml::{Reader, Writer};

use crate::filter::{FilterComposer, FilterGroup};
use crate::{
    Element, OsmError, Result, ATTRIB_ID, ATTRIB_REF, TAG_NODE, TAG_ROOT, TAG_WAY, TAG_WAY_NODE,
};

/// Common view over the two filterable entity kinds.
pub trait Entity {
    fn id(&self) -> i64;
    fn element(&self) -> &Element;

    fn tag(&self, key: &str) -> Option<&str> {
        self.element().tag(key)
    }
}

/// A single geographic point.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    id: i64,
    element: Element,
}

impl Node {
    pub fn lat(&self) -> Option<f64> {
        self.element.attr("lat")?.trim().parse().ok()
    }

    pub fn lon(&self) -> Option<f64> {
        self.element.attr("lon")?.trim().parse().ok()
    }

    /// `(lon, lat)`, or `None` when either coordinate is missing or malformed.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        let (lon, lat) = (self.lon()?, self.lat()?);
        (lon.is_finite() && lat.is_finite()).then_some((lon, lat))
    }
}

impl Entity for Node {
    fn id(&self) -> i64 {
        self.id
    }

    fn element(&self) -> &Element {
        &self.element
    }
}

/// An ordered list of node references plus tags.
#[derive(Debug, Clone, PartialEq)]
pub struct Way {
    id: i64,
    refs: Vec<i64>,
    element: Element,
}

impl Way {
    pub fn refs(&self) -> &[i64] {
        &self.refs
    }

    pub fn add_tag(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.element.push_tag(key, value);
    }
}

impl Entity for Way {
    fn id(&self) -> i64 {
        self.id
    }

    fn element(&self) -> &Element {
        &self.element
    }
}

/// Position of a top-level element in document order.
#[derive(Debug, Clone)]
enum Entry {
    Node(usize),
    Way(usize),
    Other(Element),
}

/// Owned top-level element, used while moving entries between arenas.
enum Item {
    Node(Node),
    Way(Way),
    Other(Element),
}

/// Node/way graph loaded from an OSM XML document.
pub struct VectorDocument {
    root: Element,
    entries: Vec<Entry>,
    nodes: Vec<Node>,
    ways: Vec<Way>,
    node_lookup: HashMap<i64, usize>,
    way_lookup: HashMap<i64, usize>,
    included_nodes: HashSet<i64>,
    included_ways: HashSet<i64>,
    node_filters: FilterComposer<Node>,
    way_filters: FilterComposer<Way>,
}

impl VectorDocument {
    /// Empty `<osm>` document.
    pub fn new() -> Self {
        Self::with_root(Element::new(TAG_ROOT))
    }

    fn with_root(root: Element) -> Self {
        Self {
            root,
            entries: Vec::new(),
            nodes: Vec::new(),
            ways: Vec::new(),
            node_lookup: HashMap::new(),
            way_lookup: HashMap::new(),
            included_nodes: HashSet::new(),
            included_ways: HashSet::new(),
            node_filters: FilterComposer::default(),
            way_filters: FilterComposer::default(),
        }
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading OSM document {}", path.display());
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn from_xml(xml: &str) -> Result<Self> {
        Self::from_reader(xml.as_bytes())
    }

    pub fn from_reader<R: BufRead>(source: R) -> Result<Self> {
        let mut reader = Reader::from_reader(source);
        reader.trim_text(true);

        // Open elements; the finished root ends up in `root`.
        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) => stack.push(Element::from_start(&e)?),
                Event::Empty(e) => {
                    let element = Element::from_start(&e)?;
                    attach(&mut stack, &mut root, element);
                }
                Event::End(_) => {
                    if let Some(element) = stack.pop() {
                        attach(&mut stack, &mut root, element);
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        Self::from_root(root.ok_or(OsmError::Empty)?)
    }

    fn from_root(mut root: Element) -> Result<Self> {
        if root.name != TAG_ROOT {
            return Err(OsmError::InvalidRoot(root.name));
        }

        let children = mem::take(&mut root.children);
        let mut doc = Self::with_root(root);
        for child in children {
            let item = match child.name.as_str() {
                TAG_NODE => Item::Node(Node {
                    id: parse_id(&child, ATTRIB_ID)?,
                    element: child,
                }),
                TAG_WAY => {
                    let refs = child
                        .children_named(TAG_WAY_NODE)
                        .map(|nd| parse_id(nd, ATTRIB_REF))
                        .collect::<Result<Vec<_>>>()?;
                    Item::Way(Way {
                        id: parse_id(&child, ATTRIB_ID)?,
                        refs,
                        element: child,
                    })
                }
                _ => Item::Other(child),
            };
            doc.push_item(item, true);
        }

        debug!(
            "Loaded {} nodes and {} ways",
            doc.nodes.len(),
            doc.ways.len()
        );
        Ok(doc)
    }

    // ---------- Arena bookkeeping ----------

    fn push_item(&mut self, item: Item, include: bool) {
        match item {
            Item::Node(node) => {
                let idx = self.nodes.len();
                self.node_lookup.entry(node.id).or_insert(idx);
                if include {
                    self.included_nodes.insert(node.id);
                }
                self.nodes.push(node);
                self.entries.push(Entry::Node(idx));
            }
            Item::Way(way) => {
                let idx = self.ways.len();
                self.way_lookup.entry(way.id).or_insert(idx);
                if include {
                    self.included_ways.insert(way.id);
                }
                self.ways.push(way);
                self.entries.push(Entry::Way(idx));
            }
            Item::Other(element) => self.entries.push(Entry::Other(element)),
        }
    }

    /// Move every top-level element out of the arenas, in document order.
    fn take_items(&mut self) -> Vec<Item> {
        let mut nodes: Vec<Option<Node>> = mem::take(&mut self.nodes).into_iter().map(Some).collect();
        let mut ways: Vec<Option<Way>> = mem::take(&mut self.ways).into_iter().map(Some).collect();
        self.node_lookup.clear();
        self.way_lookup.clear();

        mem::take(&mut self.entries)
            .into_iter()
            .filter_map(|entry| match entry {
                Entry::Node(idx) => nodes[idx].take().map(Item::Node),
                Entry::Way(idx) => ways[idx].take().map(Item::Way),
                Entry::Other(element) => Some(Item::Other(element)),
            })
            .collect()
    }

    /// Append all of `other`'s top-level elements after this document's.
    /// Included sets are unioned; `other`'s registered filters are discarded.
    pub(crate) fn append(&mut self, mut other: VectorDocument) {
        for item in other.take_items() {
            self.push_item(item, false);
        }
        self.included_nodes.extend(other.included_nodes);
        self.included_ways.extend(other.included_ways);
    }

    // ---------- Queries ----------

    pub fn root(&self) -> &Element {
        &self.root
    }

    pub fn node(&self, id: i64) -> Option<&Node> {
        self.node_lookup.get(&id).map(|&idx| &self.nodes[idx])
    }

    pub fn way(&self, id: i64) -> Option<&Way> {
        self.way_lookup.get(&id).map(|&idx| &self.ways[idx])
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    pub fn ways(&self) -> impl Iterator<Item = &Way> {
        self.ways.iter()
    }

    pub fn ways_mut(&mut self) -> impl Iterator<Item = &mut Way> {
        self.ways.iter_mut()
    }

    /// Size of the node table, duplicates included.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Size of the way table, duplicates included.
    pub fn way_count(&self) -> usize {
        self.ways.len()
    }

    pub fn included_nodes(&self) -> &HashSet<i64> {
        &self.included_nodes
    }

    pub fn included_ways(&self) -> &HashSet<i64> {
        &self.included_ways
    }

    // ---------- Filtering ----------

    /// Register one AND-group for nodes; groups are OR-ed with each other.
    pub fn add_node_filter(&mut self, group: FilterGroup<Node>) {
        self.node_filters.add_group(group);
    }

    /// Register one AND-group for ways; groups are OR-ed with each other.
    pub fn add_way_filter(&mut self, group: FilterGroup<Way>) {
        self.way_filters.add_group(group);
    }

    /// Shrink the included sets to the entities accepted by the registered groups.
    /// Without any registered group everything stays included.
    pub fn apply_filters(&mut self) {
        let node_filters = mem::take(&mut self.node_filters);
        let way_filters = mem::take(&mut self.way_filters);

        let this = &*self;
        let dropped_nodes: Vec<i64> = this
            .included_nodes
            .iter()
            .copied()
            .filter(|&id| match this.node(id) {
                Some(node) => !node_filters.retains(node, this),
                None => true,
            })
            .collect();
        let dropped_ways: Vec<i64> = this
            .included_ways
            .iter()
            .copied()
            .filter(|&id| match this.way(id) {
                Some(way) => !way_filters.retains(way, this),
                None => true,
            })
            .collect();

        for id in &dropped_nodes {
            self.included_nodes.remove(id);
        }
        for id in &dropped_ways {
            self.included_ways.remove(id);
        }
        debug!(
            "Filtering dropped {} nodes and {} ways",
            dropped_nodes.len(),
            dropped_ways.len()
        );

        self.node_filters = node_filters;
        self.way_filters = way_filters;
    }

    /// Re-include every node referenced by a still-included way.
    /// Must run after filtering, never before.
    pub fn close_references(&mut self) {
        for way in &self.ways {
            if self.included_ways.contains(&way.id) {
                self.included_nodes.extend(way.refs.iter().copied());
            }
        }
    }

    /// Reference closure, then physical removal of every excluded node and way.
    pub fn prepare_for_save(&mut self) {
        self.close_references();

        let before = (self.nodes.len(), self.ways.len());
        for item in self.take_items() {
            let keep = match &item {
                Item::Node(node) => self.included_nodes.contains(&node.id),
                Item::Way(way) => self.included_ways.contains(&way.id),
                Item::Other(_) => true,
            };
            if keep {
                self.push_item(item, false);
            }
        }
        debug!(
            "Kept {}/{} nodes and {}/{} ways",
            self.nodes.len(),
            before.0,
            self.ways.len(),
            before.1
        );
    }

    // ---------- Output ----------

    /// Serialize the included entities (and every non-entity element).
    pub fn write_to<W: Write>(&self, out: W) -> Result<()> {
        let mut writer = Writer::new_with_indent(out, b' ', 2);
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        writer.write_event(Event::Start(self.root.start_tag()))?;

        for entry in &self.entries {
            match entry {
                Entry::Node(idx) => {
                    let node = &self.nodes[*idx];
                    if self.included_nodes.contains(&node.id) {
                        node.element.write(&mut writer)?;
                    }
                }
                Entry::Way(idx) => {
                    let way = &self.ways[*idx];
                    if self.included_ways.contains(&way.id) {
                        way.element.write(&mut writer)?;
                    }
                }
                Entry::Other(element) => element.write(&mut writer)?,
            }
        }

        writer.write_event(Event::End(BytesEnd::new(self.root.name.as_str())))?;
        writer.into_inner().flush()?;
        Ok(())
    }

    pub fn to_xml_string(&self) -> Result<String> {
        let mut buf = Vec::new();
        self.write_to(&mut buf)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    /// [`prepare_for_save`](Self::prepare_for_save), then write to `path`.
    pub fn save<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.prepare_for_save();
        let file = File::create(path.as_ref())?;
        self.write_to(BufWriter::new(file))
    }
}

impl Default for VectorDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for VectorDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorDocument")
            .field("nodes", &self.nodes.len())
            .field("ways", &self.ways.len())
            .field("included_nodes", &self.included_nodes.len())
            .field("included_ways", &self.included_ways.len())
            .finish()
    }
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None => {
            if root.is_none() {
                *root = Some(element);
            }
        }
    }
}

fn parse_id(element: &Element, attribute: &'static str) -> Result<i64> {
    let raw = element
        .attr(attribute)
        .ok_or_else(|| OsmError::MissingAttribute(element.name.clone(), attribute))?;
    raw.trim()
        .parse()
        .map_err(|_| OsmError::InvalidId(raw.to_owned()))
}
