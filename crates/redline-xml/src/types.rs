//! Core types for the WordprocessingML DOM.

/// An XML element.
///
/// The element name is split into an optional namespace prefix and a local
/// name. OOXML fragments arrive with prefixes (`w:`, `r:`, `w14:`) but
/// usually without the declarations that would bind them, so prefixes are
/// carried as opaque strings and re-emitted verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct XmlElement {
    /// The local name of the element (without namespace prefix).
    pub name: String,

    /// Namespace prefix, if any (e.g., "w" in `<w:p>`).
    pub prefix: Option<String>,

    /// Attributes of this element, in source order.
    pub attributes: Vec<XmlAttribute>,

    /// Child nodes of this element, in source order.
    pub children: Vec<XmlNode>,
}

/// An XML attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct XmlAttribute {
    /// The local name of the attribute (without namespace prefix).
    pub name: String,

    /// Namespace prefix, if any.
    pub prefix: Option<String>,

    /// The attribute value, after unescaping XML entities.
    pub value: String,
}

/// A child node: either an element or a text run.
#[derive(Debug, Clone, PartialEq)]
pub enum XmlNode {
    /// A child element.
    Element(XmlElement),

    /// Text content, after unescaping XML entities.
    Text(String),
}

/// Split a qualified name into (local, prefix).
pub(crate) fn split_qualified(qualified: &str) -> (String, Option<String>) {
    match qualified.find(':') {
        Some(pos) => (
            qualified[pos + 1..].to_string(),
            Some(qualified[..pos].to_string()),
        ),
        None => (qualified.to_string(), None),
    }
}

impl XmlElement {
    /// Create an empty element from a qualified name like `"w:p"`.
    pub fn new(qualified: &str) -> Self {
        let (name, prefix) = split_qualified(qualified);
        Self {
            name,
            prefix,
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Create an element with a single text child.
    pub fn with_text(qualified: &str, text: impl Into<String>) -> Self {
        let mut el = Self::new(qualified);
        el.children.push(XmlNode::Text(text.into()));
        el
    }

    /// The qualified name, prefix included.
    pub fn qualified_name(&self) -> String {
        match &self.prefix {
            Some(p) => format!("{}:{}", p, self.name),
            None => self.name.clone(),
        }
    }

    /// Get an attribute value.
    ///
    /// A qualified query (`"w:id"`) matches prefix and local name; a bare
    /// query (`"id"`) matches the local name regardless of prefix.
    pub fn attribute(&self, query: &str) -> Option<&str> {
        let (name, prefix) = split_qualified(query);
        self.attributes
            .iter()
            .find(|a| a.name == name && (prefix.is_none() || a.prefix == prefix))
            .map(|a| a.value.as_str())
    }

    /// Set an attribute from a qualified name, replacing any existing value.
    pub fn set_attribute(&mut self, qualified: &str, value: impl Into<String>) {
        let (name, prefix) = split_qualified(qualified);
        let value = value.into();
        if let Some(attr) = self
            .attributes
            .iter_mut()
            .find(|a| a.name == name && a.prefix == prefix)
        {
            attr.value = value;
        } else {
            self.attributes.push(XmlAttribute {
                name,
                prefix,
                value,
            });
        }
    }

    /// Iterate over child elements.
    pub fn child_elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|c| match c {
            XmlNode::Element(e) => Some(e),
            XmlNode::Text(_) => None,
        })
    }

    /// Iterate mutably over child elements.
    pub fn child_elements_mut(&mut self) -> impl Iterator<Item = &mut XmlElement> {
        self.children.iter_mut().filter_map(|c| match c {
            XmlNode::Element(e) => Some(e),
            XmlNode::Text(_) => None,
        })
    }

    /// First child element with the given local name.
    pub fn first_child(&self, local_name: &str) -> Option<&XmlElement> {
        self.child_elements().find(|e| e.name == local_name)
    }

    /// Concatenated text of all direct text children.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            if let XmlNode::Text(t) = child {
                out.push_str(t);
            }
        }
        out
    }

    /// Concatenated text of all descendant text nodes, in document order.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for child in &self.children {
            match child {
                XmlNode::Text(t) => out.push_str(t),
                XmlNode::Element(e) => e.collect_text(out),
            }
        }
    }

    /// Append a child element.
    pub fn push_element(&mut self, element: XmlElement) {
        self.children.push(XmlNode::Element(element));
    }

    /// Remove every `xmlns` / `xmlns:*` attribute, recursively.
    pub fn strip_namespace_decls(&mut self) {
        self.attributes.retain(|a| !a.is_namespace_decl());
        for child in self.child_elements_mut() {
            child.strip_namespace_decls();
        }
    }
}

impl XmlAttribute {
    /// Create a new attribute from a qualified name.
    pub fn new(qualified: &str, value: impl Into<String>) -> Self {
        let (name, prefix) = split_qualified(qualified);
        Self {
            name,
            prefix,
            value: value.into(),
        }
    }

    /// The qualified name, prefix included.
    pub fn qualified_name(&self) -> String {
        match &self.prefix {
            Some(p) => format!("{}:{}", p, self.name),
            None => self.name.clone(),
        }
    }

    /// Whether this attribute is a namespace declaration (`xmlns` or
    /// `xmlns:foo`).
    pub fn is_namespace_decl(&self) -> bool {
        self.prefix.as_deref() == Some("xmlns") || (self.prefix.is_none() && self.name == "xmlns")
    }
}

impl XmlNode {
    /// The element inside this node, if it is one.
    pub fn as_element(&self) -> Option<&XmlElement> {
        match self {
            XmlNode::Element(e) => Some(e),
            XmlNode::Text(_) => None,
        }
    }

    /// Mutable access to the element inside this node, if it is one.
    pub fn as_element_mut(&mut self) -> Option<&mut XmlElement> {
        match self {
            XmlNode::Element(e) => Some(e),
            XmlNode::Text(_) => None,
        }
    }
}
