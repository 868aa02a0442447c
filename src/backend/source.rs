//! Source document backed by `lopdf`.

use std::path::Path;

use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

use super::filters::{self, FilterParams};
use super::metadata;
use super::objects::{self, get, get_dict, inherited, integer, name};
use super::{LopdfTarget, SourceDocument};
use crate::error::{Error, Result};
use crate::model::{
    CcittParams, ColorSpace, DecodeArray, ImageHandle, ImageStream, Outline, PageLabelRange,
    PdfRect, SourcePage, StreamEncoding,
};

/// US Letter, used when a page has no usable `/MediaBox`.
const DEFAULT_MEDIA_BOX: PdfRect = PdfRect {
    x0: 0.0,
    y0: 0.0,
    x1: 612.0,
    y1: 792.0,
};

/// A PDF opened for reading.
pub struct LopdfSource {
    doc: Document,
    pages: Vec<ObjectId>,
}

impl LopdfSource {
    /// Load from a file path.
    pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let doc = Document::load(path).map_err(|e| match e {
            lopdf::Error::Decryption(_) => Error::Encrypted,
            _ => Error::from(e),
        })?;
        Ok(Self::from_document(doc))
    }

    /// Load from an in-memory byte slice.
    pub fn load_bytes(data: &[u8]) -> Result<Self> {
        let doc = Document::load_mem(data).map_err(|e| match e {
            lopdf::Error::Decryption(_) => Error::Encrypted,
            _ => Error::from(e),
        })?;
        Ok(Self::from_document(doc))
    }

    /// Wrap an already loaded document.
    pub fn from_document(doc: Document) -> Self {
        let pages = doc.get_pages().into_values().collect();
        Self { doc, pages }
    }

    /// Direct access to the underlying `lopdf::Document`.
    pub fn raw_doc(&self) -> &Document {
        &self.doc
    }

    /// PDF version string.
    pub fn version(&self) -> String {
        self.doc.version.to_string()
    }

    fn page_id(&self, index: usize) -> Result<ObjectId> {
        self.pages
            .get(index)
            .copied()
            .ok_or(Error::PageOutOfRange(index, self.pages.len()))
    }

    /// First image XObject in the page's resources, in dictionary order.
    fn first_image(&self, page_id: ObjectId) -> Option<ImageHandle> {
        let resources = match inherited(&self.doc, page_id, b"Resources")? {
            Object::Dictionary(d) => d,
            _ => return None,
        };
        let xobjects = get_dict(&self.doc, resources, b"XObject")?;
        xobjects.iter().find_map(|(key, value)| {
            let id = value.as_reference().ok()?;
            let stream = self.doc.get_object(id).ok()?.as_stream().ok()?;
            let is_image = stream
                .dict
                .get(b"Subtype")
                .ok()
                .and_then(|s| name(s))
                == Some("Image");
            is_image.then(|| ImageHandle::new(id.0, id.1, String::from_utf8_lossy(key)))
        })
    }
}

impl SourceDocument for LopdfSource {
    type Target = LopdfTarget;

    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn source_page(&self, index: usize) -> Result<SourcePage> {
        let page_id = self.page_id(index)?;
        let media_box = objects::page_box(&self.doc, page_id).unwrap_or_else(|| {
            log::debug!("Page {} has no usable media box, assuming Letter", index + 1);
            DEFAULT_MEDIA_BOX
        });
        let rotation = objects::page_rotation(&self.doc, page_id);

        let page = SourcePage::new(index, media_box, rotation);
        Ok(match self.first_image(page_id) {
            Some(image) => page.with_image(image),
            None => page,
        })
    }

    fn image_stream(&self, handle: &ImageHandle) -> Result<ImageStream> {
        let id = (handle.object, handle.generation);
        let stream = self
            .doc
            .get_object(id)
            .and_then(Object::as_stream)
            .map_err(|_| Error::MissingObject(format!("image {}", handle)))?;
        read_image_stream(&self.doc, handle.clone(), stream)
    }

    fn page_labels(&self) -> Result<Vec<PageLabelRange>> {
        metadata::read_page_labels(&self.doc)
    }

    fn outline(&self) -> Result<Outline> {
        metadata::read_outline(&self.doc)
    }

    fn new_target(&self) -> LopdfTarget {
        LopdfTarget::new()
    }

    fn overlay_target(&self) -> Result<LopdfTarget> {
        Ok(LopdfTarget::from_document(self.doc.clone()))
    }
}

fn read_image_stream(doc: &Document, handle: ImageHandle, stream: &Stream) -> Result<ImageStream> {
    let dict = &stream.dict;
    let dimension = |key: &[u8]| -> Result<u32> {
        get(doc, dict, key)
            .and_then(integer)
            .and_then(|v| u32::try_from(v).ok())
            .ok_or_else(|| {
                Error::ImageExtract(format!(
                    "image {} has no valid /{}",
                    handle,
                    String::from_utf8_lossy(key)
                ))
            })
    };
    let width = dimension(b"Width")?;
    let height = dimension(b"Height")?;

    let image_mask = matches!(get(doc, dict, b"ImageMask"), Some(Object::Boolean(true)));
    let bits_per_component = if image_mask {
        1
    } else {
        get(doc, dict, b"BitsPerComponent")
            .and_then(integer)
            .and_then(|v| u8::try_from(v).ok())
            .unwrap_or(8)
    };
    let color_space = match get(doc, dict, b"ColorSpace") {
        Some(cs) => parse_color_space(doc, cs),
        None if image_mask => ColorSpace::DeviceGray,
        None => ColorSpace::Other("none".to_string()),
    };
    let decode = match get(doc, dict, b"Decode") {
        Some(Object::Array(arr)) => Some(DecodeArray(
            arr.iter()
                .filter_map(|v| objects::resolve(doc, v).and_then(objects::number))
                .collect(),
        )),
        _ => None,
    };
    let keys = dict
        .iter()
        .map(|(k, _)| format!("/{}", String::from_utf8_lossy(k)))
        .collect();

    let filters = filter_names(doc, dict);
    let (encoding, data) = match filters.as_slice() {
        [] => (StreamEncoding::Samples, stream.content.clone()),
        [only] if only == "DCTDecode" || only == "DCT" => (StreamEncoding::Dct, stream.content.clone()),
        [only] if only == "CCITTFaxDecode" || only == "CCF" => (
            StreamEncoding::Ccitt(ccitt_params(doc, dict, width)),
            stream.content.clone(),
        ),
        list => match list.iter().find(|f| !filters::is_sample_filter(f)) {
            Some(other) => (StreamEncoding::Unsupported(other.clone()), Vec::new()),
            None => {
                let mut data = stream.content.clone();
                for (filter, parms) in list.iter().zip(decode_parms(doc, dict, list.len())) {
                    let params = FilterParams::from_dict(doc, parms);
                    data = filters::decode(filter, &data, &params).map_err(|e| match e {
                        Error::ImageExtract(msg) => {
                            Error::ImageExtract(format!("image {}: {}", handle, msg))
                        }
                        other => other,
                    })?;
                }
                (StreamEncoding::Samples, data)
            }
        },
    };

    Ok(ImageStream {
        handle,
        width,
        height,
        bits_per_component,
        color_space,
        decode,
        image_mask,
        encoding,
        keys,
        data,
    })
}

fn filter_names(doc: &Document, dict: &Dictionary) -> Vec<String> {
    match get(doc, dict, b"Filter") {
        Some(Object::Name(n)) => vec![String::from_utf8_lossy(n).to_string()],
        Some(Object::Array(arr)) => arr
            .iter()
            .filter_map(|f| objects::resolve(doc, f).and_then(name))
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

/// One `/DecodeParms` dictionary per filter; a lone dictionary belongs to
/// the first filter.
fn decode_parms<'a>(doc: &'a Document, dict: &'a Dictionary, count: usize) -> Vec<Option<&'a Dictionary>> {
    let mut parms = vec![None; count];
    match get(doc, dict, b"DecodeParms") {
        Some(Object::Dictionary(d)) => {
            if let Some(first) = parms.first_mut() {
                *first = Some(d);
            }
        }
        Some(Object::Array(arr)) => {
            for (slot, item) in parms.iter_mut().zip(arr) {
                if let Some(Object::Dictionary(d)) = objects::resolve(doc, item) {
                    *slot = Some(d);
                }
            }
        }
        _ => {}
    }
    parms
}

fn ccitt_params(doc: &Document, dict: &Dictionary, width: u32) -> CcittParams {
    let parms = match get(doc, dict, b"DecodeParms") {
        Some(Object::Dictionary(d)) => Some(d),
        Some(Object::Array(arr)) => arr.iter().find_map(|p| match objects::resolve(doc, p) {
            Some(Object::Dictionary(d)) => Some(d),
            _ => None,
        }),
        _ => None,
    };
    let mut params = CcittParams {
        columns: width,
        ..CcittParams::default()
    };
    if let Some(parms) = parms {
        if let Some(k) = get(doc, parms, b"K").and_then(integer) {
            params.k = k;
        }
        if let Some(columns) = get(doc, parms, b"Columns").and_then(integer) {
            params.columns = columns.max(1) as u32;
        }
        params.rows = get(doc, parms, b"Rows")
            .and_then(integer)
            .and_then(|r| u32::try_from(r).ok());
        params.black_is_1 = matches!(get(doc, parms, b"BlackIs1"), Some(Object::Boolean(true)));
    }
    params
}

fn parse_color_space(doc: &Document, obj: &Object) -> ColorSpace {
    match obj {
        Object::Name(n) => match n.as_slice() {
            b"DeviceGray" | b"G" => ColorSpace::DeviceGray,
            b"DeviceRGB" | b"RGB" => ColorSpace::DeviceRgb,
            b"DeviceCMYK" | b"CMYK" => ColorSpace::DeviceCmyk,
            b"CalGray" => ColorSpace::CalGray,
            b"CalRGB" => ColorSpace::CalRgb,
            other => ColorSpace::Other(String::from_utf8_lossy(other).to_string()),
        },
        Object::Array(arr) => {
            let family = arr
                .first()
                .and_then(|f| objects::resolve(doc, f))
                .and_then(name)
                .unwrap_or("");
            match family {
                "CalGray" => ColorSpace::CalGray,
                "CalRGB" => ColorSpace::CalRgb,
                "DeviceGray" | "DeviceRGB" | "DeviceCMYK" => {
                    parse_color_space(doc, &Object::Name(family.as_bytes().to_vec()))
                }
                "ICCBased" => {
                    let components = arr
                        .get(1)
                        .and_then(|s| objects::resolve(doc, s))
                        .and_then(|s| s.as_stream().ok())
                        .and_then(|s| get(doc, &s.dict, b"N"))
                        .and_then(integer)
                        .and_then(|n| u8::try_from(n).ok())
                        .unwrap_or(0);
                    ColorSpace::IccBased { components }
                }
                "Indexed" | "I" => parse_indexed(doc, arr),
                other => ColorSpace::Other(other.to_string()),
            }
        }
        _ => ColorSpace::Other("unknown".to_string()),
    }
}

fn parse_indexed(doc: &Document, arr: &[Object]) -> ColorSpace {
    let resolved = |i: usize| arr.get(i).and_then(|o| objects::resolve(doc, o));
    let (Some(base), Some(hival)) = (resolved(1), resolved(2).and_then(integer)) else {
        return ColorSpace::Other("Indexed".to_string());
    };
    let lookup = match resolved(3) {
        Some(Object::String(bytes, _)) => bytes.clone(),
        Some(Object::Stream(s)) => s
            .decompressed_content()
            .unwrap_or_else(|_| s.content.clone()),
        _ => Vec::new(),
    };
    ColorSpace::Indexed {
        base: Box::new(parse_color_space(doc, base)),
        hival: hival.clamp(0, 255) as u8,
        lookup,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Rotation;
    use lopdf::dictionary;

    fn single_page(image: Option<Stream>, rotate: i64) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let mut resources = Dictionary::new();
        if let Some(image) = image {
            let form_id = doc.add_object(Stream::new(
                dictionary! { "Type" => "XObject", "Subtype" => "Form" },
                Vec::new(),
            ));
            let image_id = doc.add_object(image);
            resources.set(
                "XObject",
                dictionary! { "Fm0" => form_id, "Im0" => image_id },
            );
        }
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Resources" => resources,
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
                "MediaBox" => vec![0.into(), 0.into(), 600.into(), 800.into()],
                "Rotate" => rotate,
            }),
        );
        let catalog_id = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
        doc.trailer.set("Root", catalog_id);
        let mut buf = Vec::new();
        doc.save_to(&mut buf).unwrap();
        buf
    }

    fn gray_image(extra: Dictionary, data: Vec<u8>) -> Stream {
        let mut dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => 2,
            "Height" => 2,
            "BitsPerComponent" => 8,
            "ColorSpace" => "DeviceGray",
        };
        for (k, v) in extra.iter() {
            dict.set(k.clone(), v.clone());
        }
        Stream::new(dict, data)
    }

    #[test]
    fn test_source_page_inherits_box_and_rotation() {
        let source = LopdfSource::load_bytes(&single_page(None, 270)).unwrap();
        assert_eq!(source.page_count(), 1);
        let page = source.source_page(0).unwrap();
        assert_eq!(page.rotation, Rotation::Cw270);
        assert_eq!(page.size(), (800.0, 600.0));
        assert!(page.image.is_none());
        assert!(matches!(source.source_page(1), Err(Error::PageOutOfRange(1, 1))));
    }

    #[test]
    fn test_first_image_skips_forms() {
        let bytes = single_page(Some(gray_image(Dictionary::new(), vec![0, 64, 128, 255])), 0);
        let source = LopdfSource::load_bytes(&bytes).unwrap();
        let page = source.source_page(0).unwrap();
        let handle = page.image.unwrap();
        assert_eq!(handle.name, "Im0");

        let stream = source.image_stream(&handle).unwrap();
        assert_eq!((stream.width, stream.height), (2, 2));
        assert_eq!(stream.color_space, ColorSpace::DeviceGray);
        assert_eq!(stream.encoding, StreamEncoding::Samples);
        assert_eq!(stream.data, vec![0, 64, 128, 255]);
        assert!(stream.decode.is_none());
        assert!(stream.keys.contains(&"/ColorSpace".to_string()));
    }

    #[test]
    fn test_decode_array_and_filters() {
        let extra = dictionary! {
            "Decode" => vec![1.into(), 0.into()],
            "Filter" => "JPXDecode",
        };
        let bytes = single_page(Some(gray_image(extra, vec![1, 2, 3])), 0);
        let source = LopdfSource::load_bytes(&bytes).unwrap();
        let handle = source.source_page(0).unwrap().image.unwrap();
        let stream = source.image_stream(&handle).unwrap();
        assert_eq!(stream.decode, Some(DecodeArray(vec![1.0, 0.0])));
        assert_eq!(stream.encoding, StreamEncoding::Unsupported("JPXDecode".into()));
    }

    #[test]
    fn test_color_space_parsing() {
        let doc = Document::with_version("1.5");
        let indexed = Object::Array(vec![
            "Indexed".into(),
            "DeviceRGB".into(),
            Object::Integer(1),
            Object::string_literal(vec![0u8, 0, 0, 255, 255, 255]),
        ]);
        match parse_color_space(&doc, &indexed) {
            ColorSpace::Indexed { base, hival, lookup } => {
                assert_eq!(*base, ColorSpace::DeviceRgb);
                assert_eq!(hival, 1);
                assert_eq!(lookup.len(), 6);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(
            parse_color_space(&doc, &Object::Name(b"Lab".to_vec())),
            ColorSpace::Other("Lab".into())
        );
    }

    #[test]
    fn test_garbage_input() {
        assert!(LopdfSource::load_bytes(b"definitely not a pdf").is_err());
    }
}
