/*! deb822 control-file parsing: [ControlField], [ControlParagraph],
[ControlFileParser], [ControlParagraphReader].

Ported from the corpus's own `control` module. Only the asynchronous reader
variant (`ControlParagraphAsyncReader`, built on `futures::AsyncBufRead` and
`pin_project`) is dropped: nothing in this crate's blocking pipeline reads
control files asynchronously. */

use {
    crate::error::{DebError, Result},
    std::{
        borrow::Cow,
        collections::HashMap,
        io::{BufRead, Write},
    },
};

/// A field value in a control file: *simple* (single line), *folded*
/// (logically one line wrapped across several, whitespace insignificant), or
/// *multiline* (whitespace significant).
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum ControlFieldValue<'a> {
    Simple(Cow<'a, str>),
    Folded(Cow<'a, str>),
    Multiline(Cow<'a, str>),
}

impl<'a> ControlFieldValue<'a> {
    pub fn iter_lines(&self) -> Box<dyn Iterator<Item = &str> + '_> {
        match self {
            Self::Simple(v) => Box::new([v.as_ref()].into_iter()),
            Self::Folded(v) | Self::Multiline(v) => Box::new(v.lines().map(str::trim_start)),
        }
    }
}

/// A single `Name: value` field in a control paragraph.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct ControlField<'a> {
    name: Cow<'a, str>,
    value: Cow<'a, str>,
}

impl<'a> ControlField<'a> {
    pub fn new(name: Cow<'a, str>, value: Cow<'a, str>) -> Self {
        Self { name, value }
    }

    pub fn name(&self) -> &str {
        self.name.as_ref()
    }

    pub fn value_str(&self) -> &str {
        self.value.as_ref()
    }

    pub fn as_simple(&self) -> Result<ControlFieldValue<'a>> {
        if self.value.contains('\n') {
            Err(DebError::ControlParse(format!(
                "field {} has multiple lines, cannot treat as simple",
                self.name
            )))
        } else {
            Ok(ControlFieldValue::Simple(self.value.clone()))
        }
    }

    pub fn iter_words(&self) -> impl Iterator<Item = &str> {
        self.value.split_ascii_whitespace()
    }

    pub fn iter_lines(&self) -> impl Iterator<Item = &str> {
        self.value.lines().map(str::trim_start)
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.write_all(self.name.as_bytes())?;
        writer.write_all(b": ")?;
        writer.write_all(self.value.as_bytes())?;
        writer.write_all(b"\n")
    }
}

/// An ordered series of [ControlField]s. Field names are case-insensitive on
/// read and case-preserving on set; a paragraph holds at most one field per
/// name.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ControlParagraph<'a> {
    fields: Vec<ControlField<'a>>,
}

impl<'a> ControlParagraph<'a> {
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn set_field(&mut self, field: ControlField<'a>) {
        self.fields
            .retain(|f| f.name.to_lowercase() != field.name.to_lowercase());
        self.fields.push(field);
    }

    pub fn set_field_from_string(&mut self, name: Cow<'a, str>, value: Cow<'a, str>) {
        self.set_field(ControlField::new(name, value));
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    pub fn iter_fields(&self) -> impl Iterator<Item = &ControlField<'a>> {
        self.fields.iter()
    }

    pub fn field(&self, name: &str) -> Option<&ControlField<'a>> {
        self.fields
            .iter()
            .find(|f| f.name.eq_ignore_ascii_case(name))
    }

    pub fn field_str(&self, name: &str) -> Option<&str> {
        self.field(name).map(|f| f.value_str())
    }

    /// Words of the named field, or an empty iterator if the field is absent.
    pub fn field_words(&self, name: &str) -> Box<dyn Iterator<Item = &str> + '_> {
        match self.field(name) {
            Some(f) => Box::new(f.iter_words()),
            None => Box::new(std::iter::empty()),
        }
    }

    pub fn as_str_hash_map(&self) -> HashMap<&str, &str> {
        self.fields
            .iter()
            .map(|f| (f.name.as_ref(), f.value_str()))
            .collect()
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        for field in &self.fields {
            field.write(writer)?;
        }
        Ok(())
    }
}

/// Incremental parser: fed lines of text, periodically emits completed
/// [ControlParagraph] instances.
#[derive(Clone, Debug, Default)]
pub struct ControlFileParser {
    paragraph: ControlParagraph<'static>,
    field: Option<String>,
}

impl ControlFileParser {
    /// Write a line to the parser. If the line terminates an in-progress
    /// paragraph, that paragraph is returned.
    pub fn write_line(&mut self, line: &str) -> Result<Option<ControlParagraph<'static>>> {
        let is_empty_line = line.trim().is_empty();
        let is_indented = line.starts_with(' ') && line.len() > 1;

        let current_field = self.field.take();

        if is_empty_line {
            if let Some(field) = current_field {
                self.flush_field(field)?;
            }

            return Ok(if self.paragraph.is_empty() {
                None
            } else {
                let para = std::mem::take(&mut self.paragraph);
                Some(para)
            });
        }

        match (current_field, is_indented) {
            (Some(v), false) => {
                self.flush_field(v)?;
                self.field = Some(line.to_string());
                Ok(None)
            }
            (None, _) => {
                self.field = Some(line.to_string());
                Ok(None)
            }
            (Some(v), true) => {
                self.field = Some(v + line);
                Ok(None)
            }
        }
    }

    /// Finish parsing, returning any unflushed paragraph.
    pub fn finish(mut self) -> Result<Option<ControlParagraph<'static>>> {
        if let Some(field) = self.field.take() {
            self.flush_field(field)?;
        }

        Ok(if self.paragraph.is_empty() {
            None
        } else {
            Some(self.paragraph)
        })
    }

    fn flush_field(&mut self, v: String) -> Result<()> {
        let mut parts = v.splitn(2, ':');

        let name = parts
            .next()
            .ok_or_else(|| DebError::ControlParse(format!("missing colon in '{v}'")))?;
        let value = parts
            .next()
            .ok_or_else(|| DebError::ControlParse(format!("no value for field '{v}'")))?
            .trim();

        self.paragraph
            .set_field_from_string(Cow::Owned(name.to_string()), Cow::Owned(value.to_string()));

        Ok(())
    }
}

/// Iterator adapter reading successive [ControlParagraph]s from a [BufRead].
pub struct ControlParagraphReader<R: BufRead> {
    reader: R,
    parser: Option<ControlFileParser>,
}

impl<R: BufRead> ControlParagraphReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            parser: Some(ControlFileParser::default()),
        }
    }

    fn get_next(&mut self) -> Result<Option<ControlParagraph<'static>>> {
        let mut parser = self.parser.take().expect("parser consumed after exhaustion");

        loop {
            let mut line = String::new();
            let bytes_read = self.reader.read_line(&mut line)?;

            if bytes_read != 0 {
                if let Some(paragraph) = parser.write_line(&line)? {
                    self.parser.replace(parser);
                    return Ok(Some(paragraph));
                }
            } else {
                return parser.finish();
            }
        }
    }
}

impl<R: BufRead> Iterator for ControlParagraphReader<R> {
    type Item = Result<ControlParagraph<'static>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.parser.as_ref()?;

        match self.get_next() {
            Ok(Some(para)) => Some(Ok(para)),
            Ok(None) => None,
            Err(e) => Some(Err(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::BufReader;

    #[test]
    fn parses_single_paragraph() {
        let data = "Package: foo\nVersion: 1.0\nDepends: libc6 (>= 2.1),\n libssl (>= 1.0)\n\n";
        let mut paragraphs = ControlParagraphReader::new(BufReader::new(data.as_bytes()));
        let para = paragraphs.next().unwrap().unwrap();

        assert_eq!(para.field_str("Package"), Some("foo"));
        assert_eq!(para.field_str("version"), Some("1.0"));
        assert!(para.field_str("Depends").unwrap().contains("libssl"));
        assert!(paragraphs.next().is_none());
    }

    #[test]
    fn parses_multiple_paragraphs() {
        let data = "Package: a\n\nPackage: b\n";
        let paragraphs: Vec<_> = ControlParagraphReader::new(BufReader::new(data.as_bytes()))
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(paragraphs.len(), 2);
        assert_eq!(paragraphs[0].field_str("Package"), Some("a"));
        assert_eq!(paragraphs[1].field_str("Package"), Some("b"));
    }
}
