//! Streaming extraction of derived fields from XML records.
//!
//! Records are large metadata documents of which only a handful of scalar
//! values are needed. Instead of building a tree, the extractor runs a single
//! forward pass over the parse events and tracks the current element path as
//! a stack of qualified names. Each derived field owns a `PathMatcher` that
//! captures character data while the stack equals its target path exactly.
//!
//! ```text
//! <XIP>                        path = [XIP]
//!   <Metadata>                 path = [XIP, Metadata]
//!     ...
//!       <dateAvailableStart>   path == target  → capturing
//!         2021-05-01           appended to buffer
//!       </dateAvailableStart>  capturing stops, path popped
//! ```
//!
//! Memory is bounded by the path depth plus the captured text.

use std::collections::BTreeMap;
use std::fmt;
use std::io::BufRead;
use std::sync::OnceLock;

use quick_xml::events::Event;
use quick_xml::reader::Reader;
use thiserror::Error;

/// Name of the derived field holding the availability start date.
pub const START_DATE_FIELD: &str = "start_date";

/// Element path of the PBCore availability start date inside a XIP package.
pub const START_DATE_PATH: [&str; 7] = [
    "XIP",
    "Metadata",
    "Content",
    "PBCoreDescriptionDocument",
    "pbcoreInstantiation",
    "pbcoreDateAvailable",
    "dateAvailableStart",
];

/// Derived field values keyed by field name.
///
/// A field is present only if its target path was reached.
pub type DerivedFields = BTreeMap<String, String>;

/// Errors raised while scanning a document.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// The parser rejected the document
    #[error("XML parse error {0}")]
    Xml(String),

    /// The document ended before all elements were closed
    #[error("document ended inside <{0}>")]
    Unclosed(String),
}

/// Root-relative sequence of qualified element names.
///
/// Matching is exact: case-sensitive and including any namespace prefix,
/// so `pb:dateAvailableStart` never matches `dateAvailableStart`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementPath {
    segments: Vec<String>,
}

impl ElementPath {
    /// Create a path from its element names, outermost first.
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse a `/`-separated path such as `XIP/Metadata/Content`.
    ///
    /// A single leading `/` is accepted. Returns `None` for an empty path or
    /// one containing empty segments.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.strip_prefix('/').unwrap_or(s);
        if s.is_empty() {
            return None;
        }

        let segments: Vec<&str> = s.split('/').collect();
        if segments.iter().any(|segment| segment.is_empty()) {
            return None;
        }

        Some(Self::new(segments))
    }

    /// Element names, outermost first.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Full-sequence equality against the parser's current path.
    pub fn matches(&self, current: &[String]) -> bool {
        self.segments.as_slice() == current
    }
}

impl fmt::Display for ElementPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("/"))
    }
}

/// A named value extracted from record content at a fixed element path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedField {
    pub name: String,
    pub path: ElementPath,
}

impl DerivedField {
    pub fn new(name: impl Into<String>, path: ElementPath) -> Self {
        Self {
            name: name.into(),
            path,
        }
    }
}

/// Capture state for one target path.
///
/// Driven by [`PathMatcher::enter`] after every element push and
/// [`PathMatcher::leave`] after every pop. Text handed to
/// [`PathMatcher::text`] is kept only while the current path equals the
/// target, so text inside child elements of the target is skipped and a
/// repeated target element appends to the same buffer.
#[derive(Debug)]
pub(crate) struct PathMatcher<'p> {
    target: &'p ElementPath,
    capturing: bool,
    matched: bool,
    buffer: String,
}

impl<'p> PathMatcher<'p> {
    pub fn new(target: &'p ElementPath) -> Self {
        Self {
            target,
            capturing: false,
            matched: false,
            buffer: String::new(),
        }
    }

    /// Re-evaluate after an element start was pushed onto `current`.
    pub fn enter(&mut self, current: &[String]) {
        self.capturing = self.target.matches(current);
        if self.capturing {
            self.matched = true;
        }
    }

    /// Re-evaluate after an element end was popped from `current`.
    ///
    /// The closing element stops any capture before the pop; capture resumes
    /// only when a child of the target closes and the path is the target again.
    pub fn leave(&mut self, current: &[String]) {
        self.capturing = self.target.matches(current);
    }

    /// Append character data if currently capturing.
    pub fn text(&mut self, text: &str) {
        if self.capturing {
            self.buffer.push_str(text);
        }
    }

    pub fn is_capturing(&self) -> bool {
        self.capturing
    }

    /// Captured text, or `None` if the target path was never reached.
    pub fn finish(self) -> Option<String> {
        self.matched.then_some(self.buffer)
    }
}

/// Current element path plus one matcher per derived field.
struct Scan<'p> {
    path: Vec<String>,
    matchers: Vec<(&'p str, PathMatcher<'p>)>,
}

impl<'p> Scan<'p> {
    fn new(fields: &'p [DerivedField]) -> Self {
        Self {
            path: Vec::new(),
            matchers: fields
                .iter()
                .map(|field| (field.name.as_str(), PathMatcher::new(&field.path)))
                .collect(),
        }
    }

    fn start(&mut self, name: String) {
        self.path.push(name);
        for (_, matcher) in &mut self.matchers {
            matcher.enter(&self.path);
        }
    }

    fn end(&mut self) {
        self.path.pop();
        for (_, matcher) in &mut self.matchers {
            matcher.leave(&self.path);
        }
    }

    fn capturing(&self) -> bool {
        self.matchers.iter().any(|(_, matcher)| matcher.is_capturing())
    }

    fn text(&mut self, text: &str) {
        for (_, matcher) in &mut self.matchers {
            matcher.text(text);
        }
    }

    fn finish(self) -> DerivedFields {
        let mut fields = DerivedFields::new();
        for (name, matcher) in self.matchers {
            if let Some(value) = matcher.finish() {
                // Two fields sharing a name keep the first value found.
                fields.entry(name.to_string()).or_insert(value);
            }
        }
        fields
    }
}

/// Extracts a fixed set of derived fields from XML documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordExtractor {
    fields: Vec<DerivedField>,
}

impl RecordExtractor {
    /// Create an extractor for the given fields.
    pub fn new(fields: Vec<DerivedField>) -> Self {
        Self { fields }
    }

    /// The extractor used by backends unless configured otherwise.
    ///
    /// Derives [`START_DATE_FIELD`] from [`START_DATE_PATH`].
    pub fn standard() -> &'static RecordExtractor {
        static STANDARD: OnceLock<RecordExtractor> = OnceLock::new();
        STANDARD.get_or_init(|| {
            RecordExtractor::new(vec![DerivedField::new(
                START_DATE_FIELD,
                ElementPath::new(START_DATE_PATH),
            )])
        })
    }

    pub fn fields(&self) -> &[DerivedField] {
        &self.fields
    }

    /// Extract all fields from an in-memory document.
    pub fn extract(&self, content: &[u8]) -> Result<DerivedFields, ExtractError> {
        self.extract_from_reader(content)
    }

    /// Extract all fields from a readable document in one streaming pass.
    pub fn extract_from_reader<R: BufRead>(&self, source: R) -> Result<DerivedFields, ExtractError> {
        let mut reader = Reader::from_reader(source);
        let mut scan = Scan::new(&self.fields);
        let mut buf = Vec::with_capacity(8 * 1024);

        loop {
            buf.clear();
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(ref e)) => scan.start(qualified_name(e.name().as_ref())),
                Ok(Event::Empty(ref e)) => {
                    scan.start(qualified_name(e.name().as_ref()));
                    scan.end();
                }
                Ok(Event::End(_)) => scan.end(),
                Ok(Event::Text(ref e)) if scan.capturing() => {
                    let text = e
                        .unescape()
                        .map_err(|err| xml_error(reader.buffer_position(), err))?;
                    scan.text(&text);
                }
                Ok(Event::CData(ref e)) if scan.capturing() => {
                    scan.text(&String::from_utf8_lossy(e));
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(err) => return Err(xml_error(reader.error_position(), err)),
            }
        }

        if let Some(open) = scan.path.last() {
            return Err(ExtractError::Unclosed(open.clone()));
        }

        Ok(scan.finish())
    }

    /// Extract the text at a single path.
    ///
    /// Returns `Ok(None)` when the path never occurs in the document.
    pub fn extract_value(path: &ElementPath, content: &[u8]) -> Result<Option<String>, ExtractError> {
        let extractor = RecordExtractor::new(vec![DerivedField::new("value", path.clone())]);
        Ok(extractor.extract(content)?.remove("value"))
    }
}

fn qualified_name(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).into_owned()
}

fn xml_error(position: impl fmt::Display, err: impl fmt::Display) -> ExtractError {
    ExtractError::Xml(format!("at byte {}: {}", position, err))
}
