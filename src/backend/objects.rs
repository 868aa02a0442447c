//! Small helpers over `lopdf` objects.

use lopdf::{Dictionary, Document, Object, ObjectId, StringFormat};

use crate::model::{PdfRect, Rotation};

/// Reference chains longer than this are treated as broken.
const MAX_DEPTH: usize = 32;

/// Follow references until a direct object is reached.
pub fn resolve<'a>(doc: &'a Document, mut obj: &'a Object) -> Option<&'a Object> {
    for _ in 0..MAX_DEPTH {
        match obj {
            Object::Reference(id) => obj = doc.get_object(*id).ok()?,
            other => return Some(other),
        }
    }
    None
}

/// `key` of `dict`, dereferenced.
pub fn get<'a>(doc: &'a Document, dict: &'a Dictionary, key: &[u8]) -> Option<&'a Object> {
    resolve(doc, dict.get(key).ok()?)
}

/// A dictionary-valued entry. Streams yield their dictionary.
pub fn get_dict<'a>(doc: &'a Document, dict: &'a Dictionary, key: &[u8]) -> Option<&'a Dictionary> {
    match get(doc, dict, key)? {
        Object::Dictionary(d) => Some(d),
        Object::Stream(s) => Some(&s.dict),
        _ => None,
    }
}

pub fn number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

pub fn integer(obj: &Object) -> Option<i64> {
    match obj {
        Object::Integer(i) => Some(*i),
        Object::Real(r) => Some(*r as i64),
        _ => None,
    }
}

pub fn name(obj: &Object) -> Option<&str> {
    match obj {
        Object::Name(n) => std::str::from_utf8(n).ok(),
        _ => None,
    }
}

/// Look up a page attribute, walking `/Parent` for inheritable keys.
pub fn inherited<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut dict = doc.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_DEPTH {
        if let Ok(value) = dict.get(key) {
            return resolve(doc, value);
        }
        let parent = dict.get(b"Parent").ok()?.as_reference().ok()?;
        dict = doc.get_dictionary(parent).ok()?;
    }
    None
}

/// A `[x0 y0 x1 y1]` array with corners put in min/max order.
pub fn rect(doc: &Document, obj: &Object) -> Option<PdfRect> {
    let arr = resolve(doc, obj)?.as_array().ok()?;
    if arr.len() != 4 {
        return None;
    }
    let mut v = [0f32; 4];
    for (slot, item) in v.iter_mut().zip(arr) {
        *slot = number(resolve(doc, item)?)?;
    }
    Some(PdfRect::new(
        v[0].min(v[2]),
        v[1].min(v[3]),
        v[0].max(v[2]),
        v[1].max(v[3]),
    ))
}

/// Visible box of a page: `/CropBox` if present, else `/MediaBox`.
pub fn page_box(doc: &Document, page_id: ObjectId) -> Option<PdfRect> {
    inherited(doc, page_id, b"CropBox")
        .or_else(|| inherited(doc, page_id, b"MediaBox"))
        .and_then(|obj| rect(doc, obj))
        .filter(|r| !r.is_degenerate())
}

/// `/Rotate` of a page, inherited.
pub fn page_rotation(doc: &Document, page_id: ObjectId) -> Rotation {
    inherited(doc, page_id, b"Rotate")
        .and_then(integer)
        .map(Rotation::from_degrees)
        .unwrap_or_default()
}

/// Decode a PDF text string (UTF-16BE with BOM, else UTF-8, else Latin-1).
pub fn decode_text_string(bytes: &[u8]) -> String {
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let utf16: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        return String::from_utf16_lossy(&utf16);
    }
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

/// Encode a text string: plain ASCII literal, or UTF-16BE with a BOM.
pub fn encode_text_string(text: &str) -> Object {
    if text.is_ascii() {
        return Object::string_literal(text);
    }
    let mut bytes = vec![0xFE, 0xFF];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}

/// String value of a dictionary entry, decoded as a text string.
pub fn text(doc: &Document, dict: &Dictionary, key: &[u8]) -> Option<String> {
    match get(doc, dict, key)? {
        Object::String(bytes, _) => Some(decode_text_string(bytes)),
        Object::Name(bytes) => Some(String::from_utf8_lossy(bytes).to_string()),
        _ => None,
    }
}
