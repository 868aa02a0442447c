//! Navigation metadata copied from the source document: page labels and
//! the outline (bookmarks / table of contents).

use serde::{Deserialize, Serialize};

/// Numbering style of a page label range (`/S`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LabelStyle {
    /// `/D` 1, 2, 3
    Decimal,
    /// `/R` I, II, III
    UpperRoman,
    /// `/r` i, ii, iii
    LowerRoman,
    /// `/A` A, B, C
    UpperAlpha,
    /// `/a` a, b, c
    LowerAlpha,
}

impl LabelStyle {
    /// Parse the `/S` name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "D" => Some(LabelStyle::Decimal),
            "R" => Some(LabelStyle::UpperRoman),
            "r" => Some(LabelStyle::LowerRoman),
            "A" => Some(LabelStyle::UpperAlpha),
            "a" => Some(LabelStyle::LowerAlpha),
            _ => None,
        }
    }

    /// The `/S` name.
    pub fn name(self) -> &'static str {
        match self {
            LabelStyle::Decimal => "D",
            LabelStyle::UpperRoman => "R",
            LabelStyle::LowerRoman => "r",
            LabelStyle::UpperAlpha => "A",
            LabelStyle::LowerAlpha => "a",
        }
    }
}

/// One entry of the `/PageLabels` number tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageLabelRange {
    /// First page (0-based) the range applies to
    pub start_page: usize,
    pub style: Option<LabelStyle>,
    pub prefix: Option<String>,
    /// Numeric value of the first label in the range (`/St`, default 1)
    pub first_number: u32,
}

impl PageLabelRange {
    pub fn new(start_page: usize) -> Self {
        Self {
            start_page,
            style: None,
            prefix: None,
            first_number: 1,
        }
    }

    pub fn with_style(mut self, style: LabelStyle) -> Self {
        self.style = Some(style);
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn with_first_number(mut self, first: u32) -> Self {
        self.first_number = first;
        self
    }
}

/// Document outline (bookmarks/table of contents).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Outline {
    /// Top-level outline items
    pub items: Vec<OutlineItem>,
}

impl Outline {
    /// Create a new empty outline.
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Add an item to the outline.
    pub fn add_item(&mut self, item: OutlineItem) {
        self.items.push(item);
    }

    /// Check if the outline is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Get the total number of items (including nested).
    pub fn total_items(&self) -> usize {
        fn count_items(items: &[OutlineItem]) -> usize {
            items
                .iter()
                .map(|item| 1 + count_items(&item.children))
                .sum()
        }
        count_items(&self.items)
    }

    /// Highest page index any item points to.
    pub fn max_page(&self) -> Option<usize> {
        fn walk(items: &[OutlineItem]) -> Option<usize> {
            items
                .iter()
                .filter_map(|item| item.page.max(walk(&item.children)))
                .max()
        }
        walk(&self.items)
    }
}

/// A single outline item (bookmark).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlineItem {
    /// Item title
    pub title: String,

    /// Target page index (0-based), if the destination resolved to a page
    pub page: Option<usize>,

    /// Child items
    pub children: Vec<OutlineItem>,
}

impl OutlineItem {
    /// Create a new outline item.
    pub fn new(title: impl Into<String>, page: Option<usize>) -> Self {
        Self {
            title: title.into(),
            page,
            children: Vec::new(),
        }
    }

    /// Add a child item.
    pub fn add_child(&mut self, child: OutlineItem) {
        self.children.push(child);
    }
}
