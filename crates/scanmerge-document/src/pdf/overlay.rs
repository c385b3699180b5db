// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Overlay drawing: put text on top of existing page content without
// disturbing it. Used by the watermark, page-number, and OCR stages.

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat, dictionary};
use scanmerge_core::error::ScanmergeError;

use crate::pdf::reader::inherited_attribute;

/// One of the 14 standard fonts every PDF viewer provides.
pub fn standard_font(document: &mut Document, base_font: &str) -> ObjectId {
    document.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => base_font,
        "Encoding" => "WinAnsiEncoding",
    })
}

/// A graphics state that sets fill and stroke opacity.
pub fn opacity_state(document: &mut Document, opacity: f32) -> ObjectId {
    document.add_object(dictionary! {
        "Type" => "ExtGState",
        "ca" => Object::Real(opacity),
        "CA" => Object::Real(opacity),
    })
}

/// Make `target` available as `/category/name` in the page's resources.
///
/// Resource dictionaries may be inline, indirect, or inherited from the page
/// tree; each case is handled without touching unrelated entries.
pub fn register_resource(
    document: &mut Document,
    page_id: ObjectId,
    category: &[u8],
    name: &[u8],
    target: ObjectId,
) -> Result<(), ScanmergeError> {
    let indirect_category = resources_mut(document, page_id)?
        .get(category)
        .and_then(Object::as_reference)
        .ok();

    let entries = match indirect_category {
        Some(category_id) => document.get_dictionary_mut(category_id).map_err(|err| {
            ScanmergeError::PdfError(format!("resource category is not a dictionary: {}", err))
        })?,
        None => {
            let resources = resources_mut(document, page_id)?;
            if resources.get(category).and_then(Object::as_dict).is_err() {
                resources.set(category, Dictionary::new());
            }
            resources
                .get_mut(category)
                .and_then(Object::as_dict_mut)
                .map_err(|err| ScanmergeError::PdfError(format!("cannot edit page resources: {}", err)))?
        }
    };
    entries.set(name, Object::Reference(target));
    Ok(())
}

/// Draw `operations` over the page.
///
/// Existing content is wrapped in `q`/`Q` first so that whatever state it
/// leaves behind (a transform, a clip) does not leak into the overlay.
pub fn append_overlay(
    document: &mut Document,
    page_id: ObjectId,
    operations: Vec<Operation>,
) -> Result<(), ScanmergeError> {
    let existing = document.get_page_contents(page_id);

    let overlay = Content { operations }
        .encode()
        .map_err(|err| ScanmergeError::PdfError(format!("failed to encode overlay: {}", err)))?;
    let mut body = b"\nQ\n".to_vec();
    body.extend_from_slice(&overlay);

    let save_id = document.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
    let overlay_id = document.add_object(Stream::new(Dictionary::new(), body));

    let mut contents = Vec::with_capacity(existing.len() + 2);
    contents.push(Object::Reference(save_id));
    contents.extend(existing.into_iter().map(Object::Reference));
    contents.push(Object::Reference(overlay_id));

    document
        .get_dictionary_mut(page_id)
        .map_err(|err| ScanmergeError::PdfError(format!("page {:?} is not a dictionary: {}", page_id, err)))?
        .set("Contents", contents);
    Ok(())
}

/// Encode text for a WinAnsi standard font. Characters outside Latin-1
/// become `?`.
pub fn encode_text(text: &str) -> Object {
    let bytes = text
        .chars()
        .map(|ch| u8::try_from(u32::from(ch)).unwrap_or(b'?'))
        .collect();
    Object::String(bytes, StringFormat::Literal)
}

/// Approximate advance width of `text` in Helvetica at `size` points.
pub fn text_width(text: &str, size: f32, bold: bool) -> f32 {
    let em: f32 = text
        .chars()
        .map(|ch| match ch {
            'i' | 'j' | 'l' | '.' | ',' | ':' | ';' | '\'' | '!' | '|' => 0.278,
            ' ' | 'f' | 't' | 'I' | 'r' | '/' | '(' | ')' | '-' => 0.333,
            '0'..='9' => 0.556,
            'm' | 'M' | 'W' => 0.833,
            'w' => 0.722,
            'A'..='Z' => 0.667,
            _ => 0.556,
        })
        .sum();
    let weight = if bold { 1.06 } else { 1.0 };
    em * size * weight
}

pub fn real(value: f32) -> Object {
    Object::Real(value)
}

pub fn name(value: &str) -> Object {
    Object::Name(value.as_bytes().to_vec())
}

/// The page's resource dictionary, created or copied down from the page tree
/// if the page has none of its own.
fn resources_mut(document: &mut Document, page_id: ObjectId) -> Result<&mut Dictionary, ScanmergeError> {
    let own = document
        .get_dictionary(page_id)
        .map_err(|err| ScanmergeError::PdfError(format!("page {:?} is not a dictionary: {}", page_id, err)))?
        .get(b"Resources")
        .ok()
        .cloned();

    let resources = match own {
        Some(resources) => resources,
        None => {
            let resources = inherited_attribute(document, page_id, b"Resources")
                .cloned()
                .unwrap_or_else(|| Object::Dictionary(Dictionary::new()));
            if let Ok(page) = document.get_dictionary_mut(page_id) {
                page.set("Resources", resources.clone());
            }
            resources
        }
    };

    match resources {
        Object::Reference(resources_id) => document.get_dictionary_mut(resources_id),
        _ => document
            .get_dictionary_mut(page_id)
            .and_then(|page| page.get_mut(b"Resources"))
            .and_then(Object::as_dict_mut),
    }
    .map_err(|err| ScanmergeError::PdfError(format!("cannot edit page resources: {}", err)))
}
