//! Flat re-rendering
//!
//! # Coordinate System
//!
//! PDF user space has its origin at the bottom-left corner of the page, so
//! "near the top margin" means `y = page_height - TOP_MARGIN`.
//!
//! # Strategy
//!
//! 1. Paint an opaque white rectangle over the whole page (fill variant only)
//! 2. Draw the text as one block of lines from a fixed origin
//!
//! There is no wrapping and no pagination. Text that runs off the page is
//! clipped by the viewer.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};

use super::error::{PdfError, PdfResult};

// =============================================================================
// Layout Constants
// =============================================================================

/// Resource name the text font is registered under.
const FONT_RESOURCE: &str = "FTpl";

/// Base font. One of the 14 standard fonts, so nothing is embedded.
const BASE_FONT: &str = "Helvetica";

const FONT_SIZE: f32 = 12.0;

/// Distance between consecutive baselines.
const LINE_HEIGHT: f32 = 14.0;

const TEXT_X: f32 = 50.0;
const TOP_MARGIN: f32 = 50.0;

/// Maximum depth when walking the page tree for inherited attributes.
const MAX_TREE_DEPTH: usize = 32;

// =============================================================================
// Public Types
// =============================================================================

/// Page dimensions in points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

impl PageSize {
    /// US Letter, used when a template page carries no usable MediaBox.
    pub const LETTER: PageSize = PageSize {
        width: 612.0,
        height: 792.0,
    };

    /// Size of pages created from free text.
    pub const TEMPLATE: PageSize = PageSize {
        width: 600.0,
        height: 400.0,
    };

    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

// =============================================================================
// Rendering
// =============================================================================

/// Re-render the first page of `template` with `text`.
///
/// The page keeps its original content; a white rectangle covering the
/// full MediaBox is painted over it and the text is drawn on top. Any
/// further pages are passed through untouched.
pub fn render_over(template: &[u8], text: &str) -> PdfResult<Vec<u8>> {
    let mut doc = Document::load_mem(template)
        .map_err(|e| PdfError::MalformedDocument(e.to_string()))?;

    let page_id = *doc
        .get_pages()
        .values()
        .next()
        .ok_or(PdfError::NoPages)?;

    let size = page_size(&doc, page_id);
    register_font(&mut doc, page_id)?;

    let mut operations = vec![
        Operation::new("rg", vec![1.0_f32.into(), 1.0_f32.into(), 1.0_f32.into()]),
        Operation::new(
            "re",
            vec![
                0.0_f32.into(),
                0.0_f32.into(),
                size.width.into(),
                size.height.into(),
            ],
        ),
        Operation::new("f", vec![]),
    ];
    operations.extend(text_operations(text, size));

    let overlay = Content { operations }
        .encode()
        .map_err(|e| PdfError::RenderError(e.to_string()))?;

    wrap_page_content(&mut doc, page_id, overlay)?;

    tracing::debug!(
        page_width = size.width,
        page_height = size.height,
        chars = text.chars().count(),
        "Rendered text over template page"
    );

    save(&mut doc)
}

/// Build a new single-page document of `size` containing `text`.
pub fn render_fresh(size: PageSize, text: &str) -> PdfResult<Vec<u8>> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(font_dictionary());
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            FONT_RESOURCE => font_id,
        },
    });

    let content = Content {
        operations: text_operations(text, size),
    };
    let encoded = content
        .encode()
        .map_err(|e| PdfError::RenderError(e.to_string()))?;
    let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));

    let media_box: Vec<Object> = vec![
        0.0_f32.into(),
        0.0_f32.into(),
        size.width.into(),
        size.height.into(),
    ];
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => resources_id,
        "MediaBox" => media_box,
    });

    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => vec![Object::Reference(page_id)],
        "Count" => 1,
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    save(&mut doc)
}

// =============================================================================
// Content Helpers
// =============================================================================

fn font_dictionary() -> Dictionary {
    dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => BASE_FONT,
        "Encoding" => "WinAnsiEncoding",
    }
}

/// Operations drawing `text` in black from the top-left anchor.
///
/// Each line gets its own text object so extraction sees the line breaks.
fn text_operations(text: &str, size: PageSize) -> Vec<Operation> {
    let mut operations = vec![Operation::new(
        "rg",
        vec![0.0_f32.into(), 0.0_f32.into(), 0.0_f32.into()],
    )];

    let top = size.height - TOP_MARGIN;
    for (index, line) in text.trim_end_matches(['\r', '\n']).lines().enumerate() {
        let y = top - index as f32 * LINE_HEIGHT;
        operations.push(Operation::new("BT", vec![]));
        operations.push(Operation::new(
            "Tf",
            vec![FONT_RESOURCE.into(), FONT_SIZE.into()],
        ));
        operations.push(Operation::new("Td", vec![TEXT_X.into(), y.into()]));
        operations.push(Operation::new(
            "Tj",
            vec![Object::String(encode_win_ansi(line), StringFormat::Literal)],
        ));
        operations.push(Operation::new("ET", vec![]));
    }

    operations
}

/// Encode a line for a WinAnsiEncoding simple font.
///
/// Latin-1 maps straight through; the typographic characters WinAnsi keeps
/// in 0x80..0x9F are mapped explicitly; anything else becomes `?`.
fn encode_win_ansi(line: &str) -> Vec<u8> {
    line.chars()
        .filter_map(|c| match c {
            '\t' => Some(b' '),
            c if c.is_control() => None,
            ' '..='~' => Some(c as u8),
            '\u{A0}'..='\u{FF}' => Some(c as u32 as u8),
            '€' => Some(0x80),
            '‚' => Some(0x82),
            'ƒ' => Some(0x83),
            '„' => Some(0x84),
            '…' => Some(0x85),
            '†' => Some(0x86),
            '‡' => Some(0x87),
            'ˆ' => Some(0x88),
            '‰' => Some(0x89),
            'Š' => Some(0x8A),
            '‹' => Some(0x8B),
            'Œ' => Some(0x8C),
            'Ž' => Some(0x8E),
            '‘' => Some(0x91),
            '’' => Some(0x92),
            '“' => Some(0x93),
            '”' => Some(0x94),
            '•' => Some(0x95),
            '–' => Some(0x96),
            '—' => Some(0x97),
            '˜' => Some(0x98),
            '™' => Some(0x99),
            'š' => Some(0x9A),
            '›' => Some(0x9B),
            'œ' => Some(0x9C),
            'ž' => Some(0x9E),
            'Ÿ' => Some(0x9F),
            _ => Some(b'?'),
        })
        .collect()
}

// =============================================================================
// Document Helpers
// =============================================================================

fn save(doc: &mut Document) -> PdfResult<Vec<u8>> {
    let mut output = Vec::new();
    doc.save_to(&mut output)
        .map_err(|e| PdfError::RenderError(format!("Failed to save PDF: {e}")))?;
    Ok(output)
}

/// Look up a page attribute, following `Parent` links for inherited ones.
fn inherited_attribute<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut node = doc.get_object(page_id).ok()?.as_dict().ok()?;

    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(value) = node.get(key) {
            return match value {
                Object::Reference(id) => doc.get_object(*id).ok(),
                other => Some(other),
            };
        }

        let parent_id = node.get(b"Parent").ok()?.as_reference().ok()?;
        node = doc.get_object(parent_id).ok()?.as_dict().ok()?;
    }

    None
}

/// Page size from the (possibly inherited) MediaBox, US Letter if absent.
fn page_size(doc: &Document, page_id: ObjectId) -> PageSize {
    let values: Vec<f32> = match inherited_attribute(doc, page_id, b"MediaBox") {
        Some(Object::Array(arr)) => arr
            .iter()
            .filter_map(|o| match o {
                Object::Integer(i) => Some(*i as f32),
                Object::Real(r) => Some(*r),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    };

    match values.as_slice() {
        [x0, y0, x1, y1] => PageSize::new((x1 - x0).abs(), (y1 - y0).abs()),
        _ => PageSize::LETTER,
    }
}

/// Add the text font to the page's font resources.
fn register_font(doc: &mut Document, page_id: ObjectId) -> PdfResult<()> {
    let font_id = doc.add_object(font_dictionary());

    // Give the page its own Resources so the font does not leak to siblings
    // through a shared parent dictionary.
    let (has_own, resources_ref) = {
        let page = doc.get_object(page_id)?.as_dict()?;
        match page.get(b"Resources") {
            Ok(Object::Reference(id)) => (true, Some(*id)),
            Ok(Object::Dictionary(_)) => (true, None),
            _ => (false, None),
        }
    };

    if !has_own {
        let inherited = match inherited_attribute(doc, page_id, b"Resources") {
            Some(Object::Dictionary(dict)) => dict.clone(),
            _ => Dictionary::new(),
        };
        doc.get_object_mut(page_id)?
            .as_dict_mut()?
            .set("Resources", inherited);
    }

    let fonts_ref = {
        let resources = match resources_ref {
            Some(id) => doc.get_object(id)?.as_dict()?,
            None => doc.get_object(page_id)?.as_dict()?.get(b"Resources")?.as_dict()?,
        };
        match resources.get(b"Font") {
            Ok(Object::Reference(id)) => Some(*id),
            _ => None,
        }
    };

    if let Some(id) = fonts_ref {
        doc.get_object_mut(id)?
            .as_dict_mut()?
            .set(FONT_RESOURCE, font_id);
        return Ok(());
    }

    let resources = match resources_ref {
        Some(id) => doc.get_object_mut(id)?.as_dict_mut()?,
        None => doc
            .get_object_mut(page_id)?
            .as_dict_mut()?
            .get_mut(b"Resources")?
            .as_dict_mut()?,
    };

    match resources.get_mut(b"Font") {
        Ok(Object::Dictionary(fonts)) => fonts.set(FONT_RESOURCE, font_id),
        _ => resources.set("Font", dictionary! { FONT_RESOURCE => font_id }),
    }

    Ok(())
}

/// Wrap the page's existing content in `q`/`Q` and append `overlay`.
///
/// Isolating the original content keeps any graphics state it leaves behind
/// from affecting the overlay.
fn wrap_page_content(doc: &mut Document, page_id: ObjectId, overlay: Vec<u8>) -> PdfResult<()> {
    let open_id = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));

    let mut tail = b"\nQ\n".to_vec();
    tail.extend_from_slice(&overlay);
    let close_id = doc.add_object(Stream::new(Dictionary::new(), tail));

    let page = doc.get_object_mut(page_id)?.as_dict_mut()?;
    let mut contents = vec![Object::Reference(open_id)];
    match page.get(b"Contents") {
        Ok(Object::Reference(existing)) => contents.push(Object::Reference(*existing)),
        Ok(Object::Array(existing)) => contents.extend(existing.iter().cloned()),
        _ => {}
    }
    contents.push(Object::Reference(close_id));
    page.set("Contents", Object::Array(contents));

    Ok(())
}
