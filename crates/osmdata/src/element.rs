use std::io::Write;

use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::Writer;

use crate::{Result, ATTRIB_KEY, ATTRIB_VALUE, TAG_TAG};

/// Owned XML element. Text content is not retained; OSM carries everything in attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Element>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Value of the attribute `key`, if present.
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find_map(|(k, v)| (k == key).then_some(v.as_str()))
    }

    /// Replace the value of `key`, or append it when absent.
    pub fn set_attr(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = value,
            None => self.attributes.push((key, value)),
        }
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Value of the first `<tag k="key" v=".."/>` child.
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.children_named(TAG_TAG)
            .find(|t| t.attr(ATTRIB_KEY) == Some(key))
            .and_then(|t| t.attr(ATTRIB_VALUE))
    }

    /// Iterate over all `(k, v)` pairs of the `<tag>` children.
    pub fn tags(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.children_named(TAG_TAG)
            .filter_map(|t| Some((t.attr(ATTRIB_KEY)?, t.attr(ATTRIB_VALUE)?)))
    }

    /// Append a `<tag k=".." v=".."/>` child.
    pub fn push_tag(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let mut tag = Element::new(TAG_TAG);
        tag.attributes.push((ATTRIB_KEY.to_owned(), key.into()));
        tag.attributes.push((ATTRIB_VALUE.to_owned(), value.into()));
        self.children.push(tag);
    }

    pub(crate) fn from_start(start: &BytesStart<'_>) -> Result<Self> {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let mut element = Element::new(name);
        for attr in start.attributes() {
            let attr = attr?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr.unescape_value()?.into_owned();
            element.attributes.push((key, value));
        }
        Ok(element)
    }

    pub(crate) fn start_tag(&self) -> BytesStart<'_> {
        let mut start = BytesStart::new(self.name.as_str());
        for (k, v) in &self.attributes {
            start.push_attribute((k.as_str(), v.as_str()));
        }
        start
    }

    pub(crate) fn write<W: Write>(&self, writer: &mut Writer<W>) -> Result<()> {
        if self.children.is_empty() {
            writer.write_event(Event::Empty(self.start_tag()))?;
            return Ok(());
        }

        writer.write_event(Event::Start(self.start_tag()))?;
        for child in &self.children {
            child.write(writer)?;
        }
        writer.write_event(Event::End(BytesEnd::new(self.name.as_str())))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_lookup_uses_first_match() {
        let mut way = Element::new("way");
        way.push_tag("highway", "footway");
        way.push_tag("highway", "path");
        way.push_tag("name", "Ridge trail");

        assert_eq!(way.tag("highway"), Some("footway"));
        assert_eq!(way.tag("surface"), None);
        assert_eq!(way.tags().count(), 3);
    }

    #[test]
    fn set_attr_replaces_in_place() {
        let mut node = Element::new("node");
        node.set_attr("lat", "1.0");
        node.set_attr("lon", "2.0");
        node.set_attr("lat", "3.0");

        assert_eq!(node.attributes.len(), 2);
        assert_eq!(node.attr("lat"), Some("3.0"));
        assert_eq!(node.attributes[0].0, "lat");
    }
}
