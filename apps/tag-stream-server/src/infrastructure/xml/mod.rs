//! Tag Dictionary XML Decoder
//!
//! Incremental decoder for the `exiftool -listx` output format:
//!
//! ```xml
//! <taginfo>
//!   <table name="EXIF">
//!     <tag id="271" name="Make" type="string" writable="true" g2="Camera">
//!       <desc lang="en">Make</desc>
//!     </tag>
//!   </table>
//! </taginfo>
//! ```
//!
//! The decoder walks the document token by token. Anything outside a
//! `<table>` element is reported as [`DecodedToken::Other`]; a `<table>`
//! start is decoded together with its whole subtree into one [`Record`], so
//! at most one record is held in memory at a time.

use quick_xml::Reader;
use quick_xml::events::attributes::AttrError;
use quick_xml::events::{BytesStart, Event};
use tokio::io::AsyncBufRead;

use crate::domain::tags::{Description, Entry, Record};

const TABLE: &[u8] = b"table";
const TAG: &[u8] = b"tag";
const DESC: &[u8] = b"desc";

/// One top-level step through the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedToken {
    /// A complete `<table>` element.
    Record(Record),
    /// Any token that is not the start of a table.
    Other,
    /// The input is exhausted.
    Eof,
}

/// Decoder errors.
#[derive(Debug, thiserror::Error)]
pub enum XmlError {
    /// The markup itself is not well formed.
    #[error("malformed XML near byte {position}: {source}")]
    Malformed {
        /// Reader position when the error was detected.
        position: u64,
        /// Underlying parser error.
        #[source]
        source: quick_xml::Error,
    },

    /// An attribute could not be parsed.
    #[error("invalid attribute: {0}")]
    Attribute(#[from] AttrError),

    /// Text or attribute value contains an invalid escape.
    #[error("invalid escaped content: {0}")]
    Escape(#[from] quick_xml::Error),

    /// CDATA content is not valid UTF-8.
    #[error("invalid UTF-8 in CDATA: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    /// A boolean attribute has an unrecognized value.
    #[error("invalid boolean {value:?} in attribute {attribute}")]
    InvalidBool {
        /// Attribute name.
        attribute: &'static str,
        /// Raw value.
        value: String,
    },

    /// The input ended inside an open element.
    #[error("unexpected end of input inside <{0}>")]
    UnexpectedEof(&'static str),

    /// The input ended while an element enclosing the tables was open.
    #[error("unexpected end of input inside <{0}>")]
    Unclosed(String),
}

/// What a single event means at the current nesting level.
enum Step<T> {
    /// Start of an element of interest; its body follows.
    Open(T),
    /// Self-closing element of interest.
    Leaf(T),
    /// Start of an element to skip, subtree included.
    Nested,
    /// Start of an element enclosing the tables.
    Enter(String),
    /// Character data.
    Text(String),
    /// End of the enclosing element.
    Close,
    Eof,
    Ignore,
}

/// Streaming decoder over any buffered async reader.
pub struct RecordDecoder<R> {
    reader: Reader<R>,
    buf: Vec<u8>,
    open: Vec<String>,
}

impl<R: AsyncBufRead + Unpin> RecordDecoder<R> {
    /// Wrap a reader positioned at the start of the document.
    pub fn new(inner: R) -> Self {
        Self {
            reader: Reader::from_reader(inner),
            buf: Vec::with_capacity(1024),
            open: Vec::new(),
        }
    }

    /// Read the next top-level token.
    ///
    /// # Errors
    ///
    /// Returns `XmlError` on malformed markup or when the input ends while
    /// any element is still open.
    pub async fn next_token(&mut self) -> Result<DecodedToken, XmlError> {
        let step = {
            let event = self.next_event().await?;
            match event {
                Event::Start(e) if is(&e, TABLE) => Step::Open(table_name(&e)?),
                Event::Empty(e) if is(&e, TABLE) => Step::Leaf(table_name(&e)?),
                Event::Start(e) => {
                    Step::Enter(String::from_utf8_lossy(e.local_name().as_ref()).into_owned())
                }
                Event::End(_) => Step::Close,
                Event::Eof => Step::Eof,
                _ => Step::Ignore,
            }
        };

        match step {
            Step::Open(name) => {
                let mut record = Record {
                    name,
                    entries: Vec::new(),
                };
                self.read_table_body(&mut record).await?;
                Ok(DecodedToken::Record(record))
            }
            Step::Leaf(name) => Ok(DecodedToken::Record(Record {
                name,
                entries: Vec::new(),
            })),
            Step::Enter(name) => {
                self.open.push(name);
                Ok(DecodedToken::Other)
            }
            Step::Close => {
                self.open.pop();
                Ok(DecodedToken::Other)
            }
            Step::Eof => match self.open.pop() {
                Some(name) => Err(XmlError::Unclosed(name)),
                None => Ok(DecodedToken::Eof),
            },
            Step::Nested | Step::Text(_) | Step::Ignore => Ok(DecodedToken::Other),
        }
    }

    async fn read_table_body(&mut self, record: &mut Record) -> Result<(), XmlError> {
        loop {
            let step = {
                let event = self.next_event().await?;
                match event {
                    Event::Start(e) if is(&e, TAG) => Step::Open(entry_from(&e)?),
                    Event::Empty(e) if is(&e, TAG) => Step::Leaf(entry_from(&e)?),
                    Event::Start(_) => Step::Nested,
                    Event::End(_) => Step::Close,
                    Event::Eof => Step::Eof,
                    _ => Step::Ignore,
                }
            };

            match step {
                Step::Open(mut entry) => {
                    self.read_tag_body(&mut entry).await?;
                    record.entries.push(entry);
                }
                Step::Leaf(entry) => record.entries.push(entry),
                Step::Nested => self.skip_element("table").await?,
                Step::Close => return Ok(()),
                Step::Eof => return Err(XmlError::UnexpectedEof("table")),
                Step::Enter(_) | Step::Text(_) | Step::Ignore => {}
            }
        }
    }

    async fn read_tag_body(&mut self, entry: &mut Entry) -> Result<(), XmlError> {
        loop {
            let step = {
                let event = self.next_event().await?;
                match event {
                    Event::Start(e) if is(&e, DESC) => Step::Open(desc_lang(&e)?),
                    Event::Empty(e) if is(&e, DESC) => Step::Leaf(desc_lang(&e)?),
                    Event::Start(_) => Step::Nested,
                    Event::End(_) => Step::Close,
                    Event::Eof => Step::Eof,
                    _ => Step::Ignore,
                }
            };

            match step {
                Step::Open(lang) => {
                    let text = self.read_desc_text().await?;
                    entry.descriptions.push(Description { lang, text });
                }
                Step::Leaf(lang) => entry.descriptions.push(Description {
                    lang,
                    text: String::new(),
                }),
                Step::Nested => self.skip_element("tag").await?,
                Step::Close => return Ok(()),
                Step::Eof => return Err(XmlError::UnexpectedEof("tag")),
                Step::Enter(_) | Step::Text(_) | Step::Ignore => {}
            }
        }
    }

    async fn read_desc_text(&mut self) -> Result<String, XmlError> {
        let mut text = String::new();
        loop {
            let step: Step<()> = {
                let event = self.next_event().await?;
                match event {
                    Event::Text(t) => Step::Text(t.unescape()?.into_owned()),
                    Event::CData(c) => Step::Text(std::str::from_utf8(&c)?.to_string()),
                    Event::Start(_) => Step::Nested,
                    Event::End(_) => Step::Close,
                    Event::Eof => Step::Eof,
                    _ => Step::Ignore,
                }
            };

            match step {
                Step::Text(chunk) => text.push_str(&chunk),
                Step::Nested => self.skip_element("desc").await?,
                Step::Close => return Ok(text),
                Step::Eof => return Err(XmlError::UnexpectedEof("desc")),
                Step::Open(()) | Step::Leaf(()) | Step::Enter(_) | Step::Ignore => {}
            }
        }
    }

    /// Consume the rest of an element whose start tag was just read.
    async fn skip_element(&mut self, within: &'static str) -> Result<(), XmlError> {
        let mut depth = 1usize;
        while depth > 0 {
            let event = self.next_event().await?;
            match event {
                Event::Start(_) => depth += 1,
                Event::End(_) => depth -= 1,
                Event::Eof => return Err(XmlError::UnexpectedEof(within)),
                _ => {}
            }
        }
        Ok(())
    }

    async fn next_event(&mut self) -> Result<Event<'_>, XmlError> {
        self.buf.clear();
        let reader = &mut self.reader;
        match reader.read_event_into_async(&mut self.buf).await {
            Ok(event) => Ok(event),
            Err(source) => Err(XmlError::Malformed {
                position: u64::try_from(reader.buffer_position()).unwrap_or(u64::MAX),
                source,
            }),
        }
    }
}

fn is(element: &BytesStart<'_>, name: &[u8]) -> bool {
    element.local_name().as_ref() == name
}

fn table_name(element: &BytesStart<'_>) -> Result<String, XmlError> {
    let mut name = String::new();
    for attr in element.attributes() {
        let attr = attr?;
        if attr.key.local_name().as_ref() == b"name" {
            name = attr.unescape_value()?.into_owned();
        }
    }
    Ok(name)
}

fn desc_lang(element: &BytesStart<'_>) -> Result<String, XmlError> {
    let mut lang = String::new();
    for attr in element.attributes() {
        let attr = attr?;
        if attr.key.local_name().as_ref() == b"lang" {
            lang = attr.unescape_value()?.into_owned();
        }
    }
    Ok(lang)
}

fn entry_from(element: &BytesStart<'_>) -> Result<Entry, XmlError> {
    let mut entry = Entry::default();
    for attr in element.attributes() {
        let attr = attr?;
        let value = attr.unescape_value()?;
        match attr.key.local_name().as_ref() {
            b"id" => entry.id = value.into_owned(),
            b"name" => entry.name = value.into_owned(),
            b"type" => entry.tag_type = value.into_owned(),
            b"writable" => entry.writable = parse_bool("writable", &value)?,
            b"g2" => entry.group = value.into_owned(),
            _ => {}
        }
    }
    Ok(entry)
}

/// Boolean attribute value; surrounding whitespace is ignored and an
/// empty value reads as `false`.
fn parse_bool(attribute: &'static str, value: &str) -> Result<bool, XmlError> {
    match value.trim() {
        "" => Ok(false),
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Ok(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Ok(false),
        other => Err(XmlError::InvalidBool {
            attribute,
            value: other.to_string(),
        }),
    }
}

// =============================================================================
// Tests
// =============================================================================
