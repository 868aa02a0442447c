//! Output document backed by `lopdf`.

use std::collections::{HashMap, HashSet};
use std::io::{BufWriter, Write};
use std::path::Path;

use flate2::write::ZlibEncoder;
use flate2::Compression;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};

use super::metadata;
use super::objects::{self, name};
use super::{PageRef, SaveOptions, TargetDocument};
use crate::error::{Error, Result};
use crate::geometry::{derotation, Matrix};
use crate::model::{EmbeddedImage, FontFamily, Outline, PageLabelRange, PdfRect, PlacedText};

/// Operators kept by [`TargetDocument::clear_marks`]: graphics state and
/// image painting.
const KEPT_OPERATORS: &[&str] = &["q", "Q", "cm", "gs", "BI", "ID", "EI"];

/// Form XObjects nested deeper than this are treated as marks.
const MAX_FORM_DEPTH: usize = 8;

/// Whether an XObject is an image, or a form that draws one somewhere
/// inside its own resources.
fn paints_image(doc: &Document, xobject: &Object, depth: usize) -> bool {
    let Some(stream) = objects::resolve(doc, xobject).and_then(|o| o.as_stream().ok()) else {
        return false;
    };
    match stream.dict.get(b"Subtype").ok().and_then(name) {
        Some("Image") => true,
        Some("Form") if depth < MAX_FORM_DEPTH => objects::get_dict(doc, &stream.dict, b"Resources")
            .and_then(|r| objects::get_dict(doc, r, b"XObject"))
            .map(|inner| inner.iter().any(|(_, v)| paints_image(doc, v, depth + 1)))
            .unwrap_or(false),
        _ => false,
    }
}

/// A PDF being written.
pub struct LopdfTarget {
    doc: Document,
    pages: Vec<ObjectId>,
    fonts: HashMap<FontFamily, ObjectId>,
    /// Pages whose earlier content is already isolated in `q`/`Q`
    wrapped: HashSet<ObjectId>,
}

impl Default for LopdfTarget {
    fn default() -> Self {
        Self::new()
    }
}

impl LopdfTarget {
    /// An empty document with a catalog and an empty page tree.
    pub fn new() -> Self {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.add_object(dictionary! {
            "Type" => "Pages",
            "Kids" => Vec::<Object>::new(),
            "Count" => 0,
        });
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        Self::from_document(doc)
    }

    /// Edit an existing document in place.
    pub fn from_document(doc: Document) -> Self {
        let pages = doc.get_pages().into_values().collect();
        Self {
            doc,
            pages,
            fonts: HashMap::new(),
            wrapped: HashSet::new(),
        }
    }

    /// Direct access to the underlying `lopdf::Document`.
    pub fn raw_doc(&self) -> &Document {
        &self.doc
    }

    fn pages_root(&self) -> Result<ObjectId> {
        Ok(self.doc.catalog()?.get(b"Pages")?.as_reference()?)
    }

    /// Copy the page's effective resources (inherited or shared) into the
    /// page itself so they can be extended without touching other pages.
    fn resources_mut(&mut self, page_id: ObjectId) -> Result<&mut Dictionary> {
        let mut resources = match objects::inherited(&self.doc, page_id, b"Resources") {
            Some(Object::Dictionary(d)) => d.clone(),
            _ => Dictionary::new(),
        };
        for key in [b"Font".as_slice(), b"XObject".as_slice()] {
            let direct = match objects::get(&self.doc, &resources, key) {
                Some(Object::Dictionary(sub)) => Some(sub.clone()),
                _ => None,
            };
            if let Some(sub) = direct {
                resources.set(key, sub);
            }
        }

        let page = self.doc.get_dictionary_mut(page_id)?;
        page.set("Resources", resources);
        Ok(page.get_mut(b"Resources")?.as_dict_mut()?)
    }

    /// Name `object` in the page's `category` resources, reusing an
    /// existing name that already points at it.
    fn register_resource(
        &mut self,
        page_id: ObjectId,
        category: &[u8],
        prefix: &str,
        object: ObjectId,
    ) -> Result<Vec<u8>> {
        let resources = self.resources_mut(page_id)?;
        if !resources.has(category) {
            resources.set(category, Dictionary::new());
        }
        let entries = resources.get_mut(category)?.as_dict_mut()?;

        if let Some((key, _)) = entries
            .iter()
            .find(|(_, v)| v.as_reference().ok() == Some(object))
        {
            return Ok(key.clone());
        }
        let mut n = 0;
        loop {
            let candidate = format!("{}{}", prefix, n).into_bytes();
            if !entries.has(&candidate) {
                entries.set(candidate.clone(), object);
                return Ok(candidate);
            }
            n += 1;
        }
    }

    /// Append a content stream. Content already on the page is wrapped in
    /// `q`/`Q` first so its graphics state cannot leak into ours.
    fn append_content(&mut self, page_id: ObjectId, operations: Vec<Operation>) -> Result<()> {
        let data = Content { operations }.encode()?;

        let page = self.doc.get_dictionary(page_id)?;
        let mut parts: Vec<Object> = match page.get(b"Contents") {
            Ok(Object::Reference(r)) => match self.doc.get_object(*r) {
                Ok(Object::Array(arr)) => arr.clone(),
                _ => vec![Object::Reference(*r)],
            },
            Ok(Object::Array(arr)) => arr.clone(),
            _ => Vec::new(),
        };

        if !parts.is_empty() && !self.wrapped.contains(&page_id) {
            let open = self.doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
            let close = self.doc.add_object(Stream::new(Dictionary::new(), b"\nQ\n".to_vec()));
            parts.insert(0, open.into());
            parts.push(close.into());
        }
        self.wrapped.insert(page_id);

        let stream_id = self.doc.add_object(Stream::new(Dictionary::new(), data));
        parts.push(stream_id.into());
        self.doc
            .get_dictionary_mut(page_id)?
            .set("Contents", Object::Array(parts));
        Ok(())
    }

    fn font_object(&mut self, family: FontFamily) -> ObjectId {
        if let Some(id) = self.fonts.get(&family) {
            return *id;
        }
        let id = match family {
            FontFamily::Helvetica => self.doc.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => "Helvetica",
                "Encoding" => "WinAnsiEncoding",
            }),
            FontFamily::Cjk => {
                let descriptor = self.doc.add_object(dictionary! {
                    "Type" => "FontDescriptor",
                    "FontName" => "STSong-Light",
                    "Flags" => 6,
                    "FontBBox" => vec![(-25).into(), (-254).into(), 1000.into(), 880.into()],
                    "ItalicAngle" => 0,
                    "Ascent" => 880,
                    "Descent" => -120,
                    "CapHeight" => 880,
                    "StemV" => 93,
                });
                let descendant = self.doc.add_object(dictionary! {
                    "Type" => "Font",
                    "Subtype" => "CIDFontType0",
                    "BaseFont" => "STSong-Light",
                    "CIDSystemInfo" => dictionary! {
                        "Registry" => Object::string_literal("Adobe"),
                        "Ordering" => Object::string_literal("GB1"),
                        "Supplement" => 2,
                    },
                    "FontDescriptor" => descriptor,
                    "DW" => 1000,
                    "W" => vec![1.into(), 95.into(), 500.into()],
                });
                self.doc.add_object(dictionary! {
                    "Type" => "Font",
                    "Subtype" => "Type0",
                    "BaseFont" => "STSong-Light-UniGB-UCS2-H",
                    "Encoding" => "UniGB-UCS2-H",
                    "DescendantFonts" => vec![descendant.into()],
                })
            }
        };
        self.fonts.insert(family, id);
        id
    }

    fn page_id(&self, page: PageRef) -> Result<ObjectId> {
        match self.pages.get(page.index) {
            Some(id) if *id == page.id => Ok(*id),
            _ => Err(Error::PageOutOfRange(page.index, self.pages.len())),
        }
    }

    fn write_err(path: &Path, message: impl ToString) -> Error {
        Error::Write {
            path: path.display().to_string(),
            message: message.to_string(),
        }
    }
}

/// Encode a run for its font: single bytes for Helvetica, UCS-2 for the
/// CJK font. Characters outside what the font can address become `?`.
fn encode_run(text: &str, font: FontFamily) -> Vec<u8> {
    match font {
        FontFamily::Helvetica => text
            .chars()
            .map(|c| if c.is_ascii() { c as u8 } else { b'?' })
            .collect(),
        FontFamily::Cjk => text
            .chars()
            .flat_map(|c| {
                let unit = u16::try_from(u32::from(c)).unwrap_or(u16::from(b'?'));
                unit.to_be_bytes()
            })
            .collect(),
    }
}

fn reals(values: &[f32]) -> Vec<Object> {
    values.iter().map(|v| Object::Real(*v)).collect()
}

impl TargetDocument for LopdfTarget {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn existing_page(&self, index: usize) -> Result<PageRef> {
        self.pages
            .get(index)
            .map(|id| PageRef { index, id: *id })
            .ok_or(Error::PageOutOfRange(index, self.pages.len()))
    }

    fn add_page(&mut self, width: f32, height: f32) -> Result<PageRef> {
        let pages_id = self.pages_root()?;
        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), Object::Real(width), Object::Real(height)],
            "Resources" => Dictionary::new(),
        });

        let root = self.doc.get_dictionary_mut(pages_id)?;
        root.get_mut(b"Kids")?.as_array_mut()?.push(page_id.into());
        let count = root.get(b"Count").and_then(Object::as_i64).unwrap_or(0);
        root.set("Count", count + 1);

        self.pages.push(page_id);
        Ok(PageRef {
            index: self.pages.len() - 1,
            id: page_id,
        })
    }

    fn clear_marks(&mut self, page: PageRef) -> Result<()> {
        let page_id = self.page_id(page)?;
        if self.doc.get_dictionary(page_id)?.get(b"Contents").is_err() {
            return Ok(());
        }

        let data = self.doc.get_page_content(page_id)?;
        let content = match Content::decode(&data) {
            Ok(content) => content,
            Err(e) => {
                log::warn!(
                    "Page {}: content could not be parsed ({}), left as is",
                    page.index + 1,
                    e
                );
                return Ok(());
            }
        };

        let images: HashSet<Vec<u8>> = objects::inherited(&self.doc, page_id, b"Resources")
            .and_then(|r| match r {
                Object::Dictionary(d) => objects::get_dict(&self.doc, d, b"XObject"),
                _ => None,
            })
            .map(|xobjects| {
                xobjects
                    .iter()
                    .filter(|(_, v)| paints_image(&self.doc, v, 0))
                    .map(|(k, _)| k.clone())
                    .collect()
            })
            .unwrap_or_default();

        let before = content.operations.len();
        let operations: Vec<Operation> = content
            .operations
            .into_iter()
            .filter(|op| match op.operator.as_str() {
                "Do" => op
                    .operands
                    .first()
                    .and_then(|o| o.as_name().ok())
                    .map(|n| images.contains(n))
                    .unwrap_or(false),
                other => KEPT_OPERATORS.contains(&other),
            })
            .collect();
        log::debug!(
            "Page {}: kept {} of {} content operations",
            page.index + 1,
            operations.len(),
            before
        );

        let stream_id = self
            .doc
            .add_object(Stream::new(Dictionary::new(), Content { operations }.encode()?));
        self.doc
            .get_dictionary_mut(page_id)?
            .set("Contents", stream_id);
        self.wrapped.remove(&page_id);
        Ok(())
    }

    fn place_image(&mut self, page: PageRef, image: &EmbeddedImage, matrix: &Matrix) -> Result<()> {
        let page_id = self.page_id(page)?;
        let mut stream = match image {
            EmbeddedImage::Jpeg {
                width,
                height,
                components,
                data,
            } => Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Image",
                    "Width" => i64::from(*width),
                    "Height" => i64::from(*height),
                    "ColorSpace" => if *components == 1 { "DeviceGray" } else { "DeviceRGB" },
                    "BitsPerComponent" => 8,
                    "Filter" => "DCTDecode",
                },
                data.clone(),
            ),
            EmbeddedImage::Samples {
                width,
                height,
                gray,
                data,
            } => {
                let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
                encoder.write_all(data)?;
                Stream::new(
                    dictionary! {
                        "Type" => "XObject",
                        "Subtype" => "Image",
                        "Width" => i64::from(*width),
                        "Height" => i64::from(*height),
                        "ColorSpace" => if *gray { "DeviceGray" } else { "DeviceRGB" },
                        "BitsPerComponent" => 8,
                        "Filter" => "FlateDecode",
                    },
                    encoder.finish()?,
                )
            }
        };
        stream.allows_compression = false;
        let image_id = self.doc.add_object(stream);
        let image_name = self.register_resource(page_id, b"XObject", "ImOcr", image_id)?;

        self.append_content(
            page_id,
            vec![
                Operation::new("q", vec![]),
                Operation::new("cm", reals(&matrix.0)),
                Operation::new("Do", vec![Object::Name(image_name)]),
                Operation::new("Q", vec![]),
            ],
        )
    }

    fn insert_text(&mut self, page: PageRef, text: &PlacedText) -> Result<()> {
        let page_id = self.page_id(page)?;
        let font_id = self.font_object(text.font);
        let prefix = match text.font {
            FontFamily::Helvetica => "FOcrH",
            FontFamily::Cjk => "FOcrC",
        };
        let font_name = self.register_resource(page_id, b"Font", prefix, font_id)?;

        let frame = objects::page_box(&self.doc, page_id)
            .unwrap_or_else(|| PdfRect::new(0.0, 0.0, 612.0, 792.0));
        let rotation = objects::page_rotation(&self.doc, page_id);
        let displayed_height = if rotation.swaps_axes() {
            frame.width()
        } else {
            frame.height()
        };

        // Placed text is y-down; flip to the displayed page, then undo the
        // page rotation.
        let (x, y) = text.origin();
        let tm = Matrix::translate(x, displayed_height - y).then(&derotation(rotation, &frame));

        self.append_content(
            page_id,
            vec![
                Operation::new("q", vec![]),
                Operation::new("BT", vec![]),
                Operation::new(
                    "Tf",
                    vec![Object::Name(font_name), Object::Real(text.font_size)],
                ),
                Operation::new("Tr", vec![Object::Integer(text.render_mode.operand())]),
                Operation::new("Tm", reals(&tm.0)),
                Operation::new(
                    "Tj",
                    vec![Object::String(
                        encode_run(&text.text, text.font),
                        StringFormat::Hexadecimal,
                    )],
                ),
                Operation::new("ET", vec![]),
                Operation::new("Q", vec![]),
            ],
        )
    }

    fn set_page_labels(&mut self, labels: &[PageLabelRange]) -> Result<()> {
        metadata::write_page_labels(&mut self.doc, labels, self.pages.len())
    }

    fn set_outline(&mut self, outline: &Outline) -> Result<()> {
        metadata::write_outline(&mut self.doc, outline, &self.pages)
    }

    fn save(&mut self, path: &Path, options: &SaveOptions) -> Result<()> {
        if options.garbage_collect {
            let pruned = self.doc.prune_objects();
            log::debug!("Pruned {} unreferenced objects", pruned.len());
        }
        if options.compress {
            self.doc.compress();
        }
        self.doc.renumber_objects();
        // Object ids changed; refresh everything keyed by them.
        self.pages = self.doc.get_pages().into_values().collect();
        self.fonts.clear();
        self.wrapped.clear();

        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let mut tmp =
            tempfile::NamedTempFile::new_in(dir).map_err(|e| Self::write_err(path, e))?;
        {
            let mut writer = BufWriter::new(tmp.as_file_mut());
            self.doc
                .save_to(&mut writer)
                .map_err(|e| Self::write_err(path, e))?;
            writer.flush().map_err(|e| Self::write_err(path, e))?;
        }
        tmp.persist(path)
            .map_err(|e| Self::write_err(path, e.error))?;
        log::info!("Wrote {}", path.display());
        Ok(())
    }
}
