//! Fixture PDFs built in memory and helpers to inspect outputs.

#![allow(dead_code)]

use std::io::Write;
use std::path::Path;

use flate2::write::ZlibEncoder;
use flate2::Compression;

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use ocrpdf::{DetectedWord, WordBox};

/// One page of a fixture document.
pub struct PageSpec {
    pub media_box: [i64; 4],
    pub rotate: i64,
    pub image: Option<Stream>,
    /// Extra content drawn after the image
    pub extra_content: &'static str,
}

impl PageSpec {
    pub fn with_image(image: Stream) -> Self {
        Self {
            media_box: [0, 0, 600, 800],
            rotate: 0,
            image: Some(image),
            extra_content: "",
        }
    }

    pub fn blank() -> Self {
        Self {
            media_box: [0, 0, 600, 800],
            rotate: 0,
            image: None,
            extra_content: "",
        }
    }

    pub fn rotated(mut self, degrees: i64) -> Self {
        self.rotate = degrees;
        self
    }

    pub fn with_content(mut self, content: &'static str) -> Self {
        self.extra_content = content;
        self
    }
}

/// Uncompressed 8-bit image filled with one color.
pub fn solid_image(width: u32, height: u32, color_space: &str, fill: &[u8]) -> Stream {
    let data: Vec<u8> = fill
        .iter()
        .copied()
        .cycle()
        .take((width * height) as usize * fill.len())
        .collect();
    Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width as i64,
            "Height" => height as i64,
            "BitsPerComponent" => 8,
            "ColorSpace" => color_space,
        },
        data,
    )
}

/// Flate-compressed DeviceGray image filled with one value. With
/// `png_rows`, every row carries a PNG Sub predictor tag.
pub fn flate_gray(width: u32, height: u32, fill: u8, png_rows: bool) -> Stream {
    let mut raw = Vec::new();
    for _ in 0..height {
        if png_rows {
            raw.push(1);
            raw.push(fill);
            raw.extend(std::iter::repeat(0).take(width as usize - 1));
        } else {
            raw.extend(std::iter::repeat(fill).take(width as usize));
        }
    }
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&raw).unwrap();

    let mut dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => width as i64,
        "Height" => height as i64,
        "BitsPerComponent" => 8,
        "ColorSpace" => "DeviceGray",
        "Filter" => "FlateDecode",
    };
    if png_rows {
        dict.set(
            "DecodeParms",
            dictionary! { "Predictor" => 15, "Colors" => 1, "Columns" => width as i64 },
        );
    }
    Stream::new(dict, encoder.finish().unwrap())
}

/// White DeviceRGB image.
pub fn white_rgb(width: u32, height: u32) -> Stream {
    solid_image(width, height, "DeviceRGB", &[255, 255, 255])
}

/// Build a document; returns it with its page ids in order.
pub fn build(pages: Vec<PageSpec>) -> (Document, Vec<ObjectId>) {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut page_ids = Vec::new();

    for page in pages {
        let mut resources = Dictionary::new();
        let mut content = String::new();
        if let Some(image) = page.image {
            let image_id = doc.add_object(image);
            resources.set("XObject", dictionary! { "Im0" => image_id });
            let [x0, y0, x1, y1] = page.media_box;
            content.push_str(&format!("q {} 0 0 {} {} {} cm /Im0 Do Q ", x1 - x0, y1 - y0, x0, y0));
        }
        if !page.extra_content.is_empty() {
            resources.set(
                "Font",
                dictionary! {
                    "F1" => dictionary! {
                        "Type" => "Font", "Subtype" => "Type1", "BaseFont" => "Courier",
                    },
                },
            );
            content.push_str(page.extra_content);
        }
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content.into_bytes()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => page.media_box.iter().map(|&v| Object::Integer(v)).collect::<Vec<_>>(),
            "Rotate" => page.rotate,
            "Resources" => resources,
            "Contents" => content_id,
        });
        page_ids.push(page_id);
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => page_ids.iter().map(|&id| id.into()).collect::<Vec<Object>>(),
            "Count" => page_ids.len() as i64,
        }),
    );
    let catalog_id = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
    doc.trailer.set("Root", catalog_id);
    (doc, page_ids)
}

/// Set `/PageLabels` on the catalog from (start, style) pairs.
pub fn add_page_labels(doc: &mut Document, ranges: &[(i64, &str)]) {
    let mut nums = Vec::new();
    for &(start, style) in ranges {
        nums.push(Object::Integer(start));
        nums.push(Object::Dictionary(dictionary! { "S" => style }));
    }
    let labels = doc.add_object(dictionary! { "Nums" => nums });
    catalog(doc).set("PageLabels", labels);
}

/// Set a flat `/Outlines` tree with one item per (title, page index).
pub fn add_outline(doc: &mut Document, page_ids: &[ObjectId], items: &[(&str, usize)]) {
    let outlines_id = doc.new_object_id();
    let item_ids: Vec<ObjectId> = items.iter().map(|_| doc.new_object_id()).collect();
    for (i, &(title, page)) in items.iter().enumerate() {
        let mut item = dictionary! {
            "Title" => Object::string_literal(title),
            "Parent" => outlines_id,
            "Dest" => vec![
                page_ids[page].into(),
                "XYZ".into(),
                Object::Null,
                Object::Null,
                Object::Null,
            ],
        };
        if i > 0 {
            item.set("Prev", item_ids[i - 1]);
        }
        if i + 1 < item_ids.len() {
            item.set("Next", item_ids[i + 1]);
        }
        doc.objects.insert(item_ids[i], Object::Dictionary(item));
    }
    let mut outlines = dictionary! { "Type" => "Outlines", "Count" => items.len() as i64 };
    if let (Some(first), Some(last)) = (item_ids.first(), item_ids.last()) {
        outlines.set("First", *first);
        outlines.set("Last", *last);
    }
    doc.objects.insert(outlines_id, Object::Dictionary(outlines));
    catalog(doc).set("Outlines", outlines_id);
}

fn catalog(doc: &mut Document) -> &mut Dictionary {
    let root = doc
        .trailer
        .get(b"Root")
        .and_then(Object::as_reference)
        .unwrap();
    doc.get_dictionary_mut(root).unwrap()
}

pub fn save(doc: &mut Document, path: &Path) {
    doc.save(path).unwrap();
}

/// Pages of a written output, in order.
pub fn output_pages(path: &Path) -> (Document, Vec<ObjectId>) {
    let doc = Document::load(path).unwrap();
    let pages = doc.get_pages().into_values().collect();
    (doc, pages)
}

pub fn operations(doc: &Document, page_id: ObjectId) -> Vec<Operation> {
    let data = doc.get_page_content(page_id).unwrap();
    Content::decode(&data).unwrap().operations
}

pub fn operators(doc: &Document, page_id: ObjectId) -> Vec<String> {
    operations(doc, page_id)
        .into_iter()
        .map(|op| op.operator)
        .collect()
}

pub fn number(obj: &Object) -> f32 {
    match obj {
        Object::Integer(i) => *i as f32,
        Object::Real(r) => *r as f32,
        other => panic!("not a number: {:?}", other),
    }
}

/// Operands of every `Tm` on a page.
pub fn text_matrices(doc: &Document, page_id: ObjectId) -> Vec<Vec<f32>> {
    operations(doc, page_id)
        .into_iter()
        .filter(|op| op.operator == "Tm")
        .map(|op| op.operands.iter().map(number).collect())
        .collect()
}

/// Operand of every `Tr` on a page.
pub fn render_modes(doc: &Document, page_id: ObjectId) -> Vec<i64> {
    operations(doc, page_id)
        .into_iter()
        .filter(|op| op.operator == "Tr")
        .filter_map(|op| op.operands.first().and_then(|o| o.as_i64().ok()))
        .collect()
}

/// Raw bytes of every `Tj` string on a page.
pub fn shown_strings(doc: &Document, page_id: ObjectId) -> Vec<Vec<u8>> {
    operations(doc, page_id)
        .into_iter()
        .filter(|op| op.operator == "Tj")
        .filter_map(|op| match op.operands.first() {
            Some(Object::String(bytes, _)) => Some(bytes.clone()),
            _ => None,
        })
        .collect()
}

pub fn media_box(doc: &Document, page_id: ObjectId) -> Vec<f32> {
    doc.get_dictionary(page_id)
        .unwrap()
        .get(b"MediaBox")
        .unwrap()
        .as_array()
        .unwrap()
        .iter()
        .map(number)
        .collect()
}

pub fn word(text: &str, rect: (f32, f32, f32, f32), confidence: f32) -> DetectedWord {
    DetectedWord::new(WordBox::rect(rect.0, rect.1, rect.2, rect.3), text, confidence)
}
