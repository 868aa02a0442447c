//! Page labels and document outline, read from and written to `lopdf`
//! documents.

use std::collections::HashMap;

use lopdf::{dictionary, Dictionary, Document, Object, ObjectId};

use super::objects::{self, encode_text_string, get, get_dict, integer, name};
use crate::error::{Error, Result};
use crate::model::{LabelStyle, Outline, OutlineItem, PageLabelRange};

const MAX_TREE_DEPTH: usize = 32;

/// Read `/PageLabels` from the catalog. A missing entry yields no ranges.
pub fn read_page_labels(doc: &Document) -> Result<Vec<PageLabelRange>> {
    let catalog = doc.catalog()?;
    let Some(root) = get_dict(doc, catalog, b"PageLabels") else {
        return Ok(Vec::new());
    };

    let mut entries = Vec::new();
    collect_number_tree(doc, root, 0, &mut entries)?;

    let mut ranges = Vec::with_capacity(entries.len());
    for (start, value) in entries {
        let start_page = usize::try_from(start)
            .map_err(|_| Error::Metadata(format!("negative page label index {}", start)))?;
        let dict = match objects::resolve(doc, value) {
            Some(Object::Dictionary(d)) => d,
            _ => return Err(Error::Metadata(format!("page label {} is not a dictionary", start))),
        };

        let mut range = PageLabelRange::new(start_page);
        if let Some(style) = get(doc, dict, b"S").and_then(name).and_then(LabelStyle::from_name) {
            range = range.with_style(style);
        }
        if let Some(prefix) = objects::text(doc, dict, b"P") {
            range = range.with_prefix(prefix);
        }
        if let Some(first) = get(doc, dict, b"St").and_then(integer) {
            range = range.with_first_number(first.max(1) as u32);
        }
        ranges.push(range);
    }
    ranges.sort_by_key(|r| r.start_page);
    Ok(ranges)
}

fn collect_number_tree<'a>(
    doc: &'a Document,
    node: &'a Dictionary,
    depth: usize,
    out: &mut Vec<(i64, &'a Object)>,
) -> Result<()> {
    if depth > MAX_TREE_DEPTH {
        return Err(Error::Metadata("page label tree is too deep".to_string()));
    }
    if let Some(Object::Array(nums)) = get(doc, node, b"Nums") {
        for pair in nums.chunks(2) {
            if let [key, value] = pair {
                let key = objects::resolve(doc, key)
                    .and_then(integer)
                    .ok_or_else(|| Error::Metadata("page label key is not a number".to_string()))?;
                out.push((key, value));
            }
        }
    }
    if let Some(Object::Array(kids)) = get(doc, node, b"Kids") {
        for kid in kids {
            if let Some(Object::Dictionary(kid)) = objects::resolve(doc, kid) {
                collect_number_tree(doc, kid, depth + 1, out)?;
            }
        }
    }
    Ok(())
}

/// Replace `/PageLabels` in the catalog. Every range must start on an
/// existing page.
pub fn write_page_labels(doc: &mut Document, ranges: &[PageLabelRange], page_count: usize) -> Result<()> {
    if let Some(bad) = ranges.iter().find(|r| r.start_page >= page_count) {
        return Err(Error::Metadata(format!(
            "page label range starts at page {} but the document has {} pages",
            bad.start_page + 1,
            page_count
        )));
    }

    let mut nums = Vec::with_capacity(ranges.len() * 2);
    for range in ranges {
        let mut dict = Dictionary::new();
        if let Some(style) = range.style {
            dict.set("S", Object::Name(style.name().as_bytes().to_vec()));
        }
        if let Some(prefix) = &range.prefix {
            dict.set("P", encode_text_string(prefix));
        }
        if range.first_number != 1 {
            dict.set("St", Object::Integer(i64::from(range.first_number)));
        }
        nums.push(Object::Integer(range.start_page as i64));
        nums.push(Object::Dictionary(dict));
    }

    let catalog = doc.catalog_mut()?;
    if ranges.is_empty() {
        catalog.remove(b"PageLabels");
    } else {
        catalog.set("PageLabels", dictionary! { "Nums" => nums });
    }
    Ok(())
}

/// Read the `/Outlines` tree. Destinations resolve to 0-based page
/// indices; anything that does not resolve to a page keeps `None`.
pub fn read_outline(doc: &Document) -> Result<Outline> {
    let mut outline = Outline::new();
    let catalog = doc.catalog()?;
    let Some(root) = get_dict(doc, catalog, b"Outlines") else {
        return Ok(outline);
    };

    let page_index: HashMap<ObjectId, usize> = doc
        .get_pages()
        .values()
        .enumerate()
        .map(|(i, id)| (*id, i))
        .collect();
    let reader = OutlineReader { doc, page_index };

    if let Ok(first) = root.get(b"First").and_then(Object::as_reference) {
        reader.read_siblings(first, 0, &mut outline.items)?;
    }
    Ok(outline)
}

struct OutlineReader<'a> {
    doc: &'a Document,
    page_index: HashMap<ObjectId, usize>,
}

impl<'a> OutlineReader<'a> {
    fn read_siblings(&self, first: ObjectId, depth: usize, items: &mut Vec<OutlineItem>) -> Result<()> {
        if depth > MAX_TREE_DEPTH {
            return Err(Error::Metadata("outline is nested too deeply".to_string()));
        }
        let mut next = Some(first);
        let mut seen = std::collections::HashSet::new();
        while let Some(id) = next {
            if !seen.insert(id) {
                return Err(Error::Metadata("outline sibling chain loops".to_string()));
            }
            let dict = self.doc.get_dictionary(id)?;
            let title = objects::text(self.doc, dict, b"Title").unwrap_or_default();
            let mut item = OutlineItem::new(title, self.destination_page(dict));
            if let Ok(child) = dict.get(b"First").and_then(Object::as_reference) {
                self.read_siblings(child, depth + 1, &mut item.children)?;
            }
            items.push(item);
            next = dict.get(b"Next").and_then(Object::as_reference).ok();
        }
        Ok(())
    }

    fn destination_page(&self, item: &Dictionary) -> Option<usize> {
        if let Some(dest) = get(self.doc, item, b"Dest") {
            return self.resolve_destination(dest);
        }
        let action = get_dict(self.doc, item, b"A")?;
        if get(self.doc, action, b"S").and_then(name) != Some("GoTo") {
            return None;
        }
        self.resolve_destination(get(self.doc, action, b"D")?)
    }

    fn resolve_destination(&self, dest: &Object) -> Option<usize> {
        match dest {
            Object::Array(arr) => {
                let page = arr.first()?.as_reference().ok()?;
                self.page_index.get(&page).copied()
            }
            Object::Name(key) | Object::String(key, _) => {
                let target = self.named_destination(key)?;
                match target {
                    Object::Dictionary(d) => self.resolve_destination(get(self.doc, d, b"D")?),
                    Object::Array(_) => self.resolve_destination(target),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    /// Named destinations live in `/Dests` (PDF 1.1) or the `/Names`
    /// `/Dests` name tree.
    fn named_destination(&self, key: &[u8]) -> Option<&'a Object> {
        let catalog = self.doc.catalog().ok()?;
        if let Some(dests) = get_dict(self.doc, catalog, b"Dests") {
            if let Some(found) = get(self.doc, dests, key) {
                return Some(found);
            }
        }
        let names = get_dict(self.doc, catalog, b"Names")?;
        let tree = get_dict(self.doc, names, b"Dests")?;
        self.search_name_tree(tree, key, 0)
    }

    fn search_name_tree(&self, node: &'a Dictionary, key: &[u8], depth: usize) -> Option<&'a Object> {
        if depth > MAX_TREE_DEPTH {
            return None;
        }
        if let Some(Object::Array(names)) = get(self.doc, node, b"Names") {
            for pair in names.chunks(2) {
                if let [Object::String(k, _), value] = pair {
                    if k.as_slice() == key {
                        return objects::resolve(self.doc, value);
                    }
                }
            }
        }
        if let Some(Object::Array(kids)) = get(self.doc, node, b"Kids") {
            for kid in kids {
                if let Some(Object::Dictionary(kid)) = objects::resolve(self.doc, kid) {
                    if let Some(found) = self.search_name_tree(kid, key, depth + 1) {
                        return Some(found);
                    }
                }
            }
        }
        None
    }
}

/// Replace the document outline. Every resolved page must exist in
/// `pages` (the document's page objects, in order).
pub fn write_outline(doc: &mut Document, outline: &Outline, pages: &[ObjectId]) -> Result<()> {
    if let Some(max) = outline.max_page() {
        if max >= pages.len() {
            return Err(Error::Metadata(format!(
                "outline points to page {} but the document has {} pages",
                max + 1,
                pages.len()
            )));
        }
    }

    if outline.is_empty() {
        doc.catalog_mut()?.remove(b"Outlines");
        return Ok(());
    }

    let root_id = doc.new_object_id();
    let (first, last, count) = write_outline_level(doc, &outline.items, root_id, pages);
    let mut root = dictionary! { "Type" => "Outlines", "Count" => count as i64 };
    if let (Some(first), Some(last)) = (first, last) {
        root.set("First", first);
        root.set("Last", last);
    }
    doc.objects.insert(root_id, Object::Dictionary(root));
    doc.catalog_mut()?.set("Outlines", root_id);
    Ok(())
}

/// Write one sibling list. Returns (first, last, visible descendant count).
fn write_outline_level(
    doc: &mut Document,
    items: &[OutlineItem],
    parent: ObjectId,
    pages: &[ObjectId],
) -> (Option<ObjectId>, Option<ObjectId>, usize) {
    let ids: Vec<ObjectId> = items.iter().map(|_| doc.new_object_id()).collect();
    let mut count = ids.len();

    for (i, item) in items.iter().enumerate() {
        let mut dict = dictionary! {
            "Title" => encode_text_string(&item.title),
            "Parent" => parent,
        };
        if i > 0 {
            dict.set("Prev", ids[i - 1]);
        }
        if let Some(next) = ids.get(i + 1) {
            dict.set("Next", *next);
        }
        if let Some(page) = item.page.and_then(|p| pages.get(p)) {
            dict.set(
                "Dest",
                vec![Object::Reference(*page), "XYZ".into(), Object::Null, Object::Null, Object::Null],
            );
        }
        if !item.children.is_empty() {
            let (first, last, child_count) = write_outline_level(doc, &item.children, ids[i], pages);
            if let (Some(first), Some(last)) = (first, last) {
                dict.set("First", first);
                dict.set("Last", last);
                dict.set("Count", child_count as i64);
            }
            count += child_count;
        }
        doc.objects.insert(ids[i], Object::Dictionary(dict));
    }

    (ids.first().copied(), ids.last().copied(), count)
}
