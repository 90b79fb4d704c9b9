//! Attribute helpers and the error type shared by the protXML and pepXML readers

use quick_xml::events::BytesStart;
use std::str::FromStr;

#[derive(Debug, thiserror::Error)]
pub enum XmlError {
    #[error("malformed document: {0}")]
    Malformed(String),
    #[error("missing attribute `{attribute}` on <{element}>")]
    MissingAttribute {
        element: String,
        attribute: &'static str,
    },
    #[error("no {0} found")]
    NoRecordsFound(&'static str),
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("XML attribute error: {0}")]
    Attr(#[from] quick_xml::events::attributes::AttrError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("invalid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("invalid number: {0}")]
    Float(#[from] std::num::ParseFloatError),
    #[error("invalid integer: {0}")]
    Int(#[from] std::num::ParseIntError),
}

/// Unescaped value of an optional attribute
pub(crate) fn text(ev: &BytesStart, key: &'static str) -> Result<Option<String>, XmlError> {
    match ev.try_get_attribute(key)? {
        Some(attr) => Ok(Some(attr.unescape_value()?.into_owned())),
        None => Ok(None),
    }
}

/// Unescaped value of an attribute the element cannot do without
pub(crate) fn required(ev: &BytesStart, key: &'static str) -> Result<String, XmlError> {
    text(ev, key)?.ok_or_else(|| XmlError::MissingAttribute {
        element: String::from_utf8_lossy(ev.local_name().into_inner()).into_owned(),
        attribute: key,
    })
}

/// Parse an optional numeric attribute. Surrounding whitespace is ignored.
pub(crate) fn number<T>(ev: &BytesStart, key: &'static str) -> Result<Option<T>, XmlError>
where
    T: FromStr,
    XmlError: From<T::Err>,
{
    match ev.try_get_attribute(key)? {
        Some(attr) => {
            let value = std::str::from_utf8(&attr.value)?;
            Ok(Some(value.trim().parse::<T>()?))
        }
        None => Ok(None),
    }
}

/// `Y`/`y` flags, as used by the TPP schemas
pub(crate) fn flag(ev: &BytesStart, key: &'static str) -> Result<bool, XmlError> {
    Ok(matches!(text(ev, key)?.as_deref(), Some("Y") | Some("y")))
}
