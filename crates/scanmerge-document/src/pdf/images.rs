// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page images: find the scanned raster behind each page, decode it into an
// `image::DynamicImage`, and put a processed version back.
//
// A scanned page is normally one image XObject stretched over the whole page.
// Raster stages work on the largest image of each page and leave any other
// content alone.

use std::collections::HashSet;

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, GrayImage, ImageFormat, RgbImage};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, dictionary};
use scanmerge_core::error::ScanmergeError;
use tracing::{debug, warn};

use crate::pdf::reader::{inherited_attribute, media_box};

/// An image XObject painted on a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageImage {
    pub id: ObjectId,
    /// Resource name the page content uses to paint it.
    pub name: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// A page together with its dominant image.
#[derive(Debug, Clone)]
pub struct PageRaster {
    /// 0-based position in the document.
    pub index: usize,
    pub page_id: ObjectId,
    pub image: PageImage,
    pub media_box: [f32; 4],
}

impl PageRaster {
    /// Effective resolution of the image on the page, independent of
    /// page rotation.
    pub fn dpi(&self) -> f32 {
        let [x0, y0, x1, y1] = self.media_box;
        let page_area = ((x1 - x0) * (y1 - y0)).abs().max(1.0);
        let pixel_area = self.image.width as f32 * self.image.height as f32;
        72.0 * (pixel_area / page_area).sqrt()
    }
}

/// How a processed image is written back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageEncoding {
    Jpeg { quality: u8 },
    /// Lossless 8-bit samples, Flate-compressed.
    Flate,
}

impl ImageEncoding {
    /// Keep lossy sources lossy and lossless sources lossless.
    pub fn matching(document: &Document, id: ObjectId) -> Self {
        let is_dct = document
            .get_object(id)
            .and_then(Object::as_stream)
            .map(|stream| stream_filters(stream).iter().any(|filter| filter == b"DCTDecode"))
            .unwrap_or(false);
        if is_dct {
            ImageEncoding::Jpeg { quality: 92 }
        } else {
            ImageEncoding::Flate
        }
    }
}

// -- Discovery ----------------------------------------------------------------

/// Image XObjects referenced by a page's resources.
pub fn page_images(document: &Document, page_id: ObjectId) -> Vec<PageImage> {
    let Some(xobjects) = inherited_attribute(document, page_id, b"Resources")
        .and_then(|resources| resolve_dict(document, resources))
        .and_then(|resources| resources.get(b"XObject").ok())
        .and_then(|xobjects| resolve_dict(document, xobjects))
    else {
        return Vec::new();
    };

    xobjects
        .iter()
        .filter_map(|(name, value)| {
            let id = value.as_reference().ok()?;
            let stream = document.get_object(id).and_then(Object::as_stream).ok()?;
            let dict = &stream.dict;
            if dict.get(b"Subtype").and_then(Object::as_name).ok()? != b"Image" {
                return None;
            }
            let width = dict.get(b"Width").and_then(Object::as_i64).ok()?;
            let height = dict.get(b"Height").and_then(Object::as_i64).ok()?;
            Some(PageImage {
                id,
                name: name.clone(),
                width: u32::try_from(width).ok()?,
                height: u32::try_from(height).ok()?,
            })
        })
        .collect()
}

/// The largest image on every page that has one, in page order.
///
/// An image shared by several pages is reported for the first of them only,
/// so rewriting each raster once never processes the same pixels twice.
pub fn page_rasters(document: &Document) -> Vec<PageRaster> {
    let mut seen = HashSet::new();
    document
        .get_pages()
        .into_values()
        .enumerate()
        .filter_map(|(index, page_id)| {
            let image = page_images(document, page_id)
                .into_iter()
                .max_by_key(|image| u64::from(image.width) * u64::from(image.height))?;
            if !seen.insert(image.id) {
                return None;
            }
            Some(PageRaster {
                index,
                page_id,
                media_box: media_box(document, page_id),
                image,
            })
        })
        .collect()
}

// -- Decoding -----------------------------------------------------------------

/// Decode the image XObject `id`.
///
/// Supports JPEG (DCTDecode) and 1- or 8-bit gray/RGB samples, raw or
/// Flate/LZW-compressed.
pub fn decode_image(document: &Document, id: ObjectId) -> Result<DynamicImage, ScanmergeError> {
    let stream = document
        .get_object(id)
        .and_then(Object::as_stream)
        .map_err(|err| ScanmergeError::PdfError(format!("image {:?} is not a stream: {}", id, err)))?;
    let filters = stream_filters(stream);

    if filters.last().is_some_and(|filter| filter == b"DCTDecode") {
        let jpeg = if filters.len() > 1 {
            decode_leading_filters(stream)?
        } else {
            stream.content.clone()
        };
        return image::load_from_memory_with_format(&jpeg, ImageFormat::Jpeg).map_err(|err| {
            ScanmergeError::ImageError(format!("failed to decode JPEG image {:?}: {}", id, err))
        });
    }

    let samples = if filters.is_empty() {
        stream.content.clone()
    } else {
        stream.decompressed_content().map_err(|err| {
            ScanmergeError::ImageError(format!("unsupported image encoding {:?}: {}", filter_names(&filters), err))
        })?
    };

    let dict = &stream.dict;
    let width = dict.get(b"Width").and_then(Object::as_i64).unwrap_or(0);
    let height = dict.get(b"Height").and_then(Object::as_i64).unwrap_or(0);
    let (width, height) = match (u32::try_from(width), u32::try_from(height)) {
        (Ok(w), Ok(h)) if w > 0 && h > 0 => (w, h),
        _ => return Err(ScanmergeError::ImageError(format!("image {:?} has no valid size", id))),
    };
    let bits = dict.get(b"BitsPerComponent").and_then(Object::as_i64).unwrap_or(8);
    let components = dict
        .get(b"ColorSpace")
        .ok()
        .and_then(|space| color_components(document, space))
        .unwrap_or(1);

    let invalid = || ScanmergeError::ImageError(format!("image {:?} has fewer samples than its size implies", id));
    match (components, bits) {
        (1, 8) => GrayImage::from_raw(width, height, truncate(samples, width as usize * height as usize))
            .map(DynamicImage::ImageLuma8)
            .ok_or_else(invalid),
        (1, 1) => unpack_bilevel(&samples, width, height)
            .map(DynamicImage::ImageLuma8)
            .ok_or_else(invalid),
        (3, 8) => RgbImage::from_raw(width, height, truncate(samples, width as usize * height as usize * 3))
            .map(DynamicImage::ImageRgb8)
            .ok_or_else(invalid),
        (components, bits) => Err(ScanmergeError::ImageError(format!(
            "unsupported pixel layout: {components} components at {bits} bits"
        ))),
    }
}

// -- Replacement --------------------------------------------------------------

/// Replace the samples of image XObject `id` with `image`.
///
/// Gray images stay gray; everything else is stored as RGB. Soft masks are
/// dropped because they no longer match the new samples.
pub fn replace_image(
    document: &mut Document,
    id: ObjectId,
    image: &DynamicImage,
    encoding: ImageEncoding,
) -> Result<(), ScanmergeError> {
    let gray = matches!(image, DynamicImage::ImageLuma8(_) | DynamicImage::ImageLumaA8(_));
    let color_space = if gray { "DeviceGray" } else { "DeviceRGB" };

    let mut dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => i64::from(image.width()),
        "Height" => i64::from(image.height()),
        "ColorSpace" => color_space,
        "BitsPerComponent" => 8,
    };
    if let Ok(interpolate) = document
        .get_object(id)
        .and_then(Object::as_stream)
        .and_then(|old| old.dict.get(b"Interpolate"))
    {
        dict.set("Interpolate", interpolate.clone());
    }

    let stream = match encoding {
        ImageEncoding::Jpeg { quality } => {
            let mut jpeg = Vec::new();
            let encoder = JpegEncoder::new_with_quality(&mut jpeg, quality.clamp(1, 100));
            let encoded = if gray {
                image.to_luma8().write_with_encoder(encoder)
            } else {
                image.to_rgb8().write_with_encoder(encoder)
            };
            encoded.map_err(|err| ScanmergeError::ImageError(format!("JPEG encoding failed: {}", err)))?;
            dict.set("Filter", "DCTDecode");
            Stream::new(dict, jpeg).with_compression(false)
        }
        ImageEncoding::Flate => {
            let samples = if gray {
                image.to_luma8().into_raw()
            } else {
                image.to_rgb8().into_raw()
            };
            let mut stream = Stream::new(dict, samples);
            stream
                .compress()
                .map_err(|err| ScanmergeError::PdfError(format!("failed to compress image: {}", err)))?;
            stream
        }
    };

    debug!(?id, width = image.width(), height = image.height(), ?encoding, "Image replaced");
    document.objects.insert(id, Object::Stream(stream));
    Ok(())
}

/// Rebuild a page as a single full-bleed image.
///
/// Used when a raster changes aspect ratio (autocrop): the page is resized to
/// keep the image's resolution, and its content becomes one draw of
/// `image_name`. Other page content is discarded.
pub fn relayout_page(
    document: &mut Document,
    page_id: ObjectId,
    image_name: &[u8],
    width_pt: f32,
    height_pt: f32,
) -> Result<(), ScanmergeError> {
    let mut content = format!("q\n{:.3} 0 0 {:.3} 0 0 cm\n/", width_pt, height_pt).into_bytes();
    content.extend_from_slice(image_name);
    content.extend_from_slice(b" Do\nQ\n");
    let content_id = document.add_object(Stream::new(Dictionary::new(), content));

    let page = document
        .get_dictionary_mut(page_id)
        .map_err(|err| ScanmergeError::PdfError(format!("page {:?} is not a dictionary: {}", page_id, err)))?;
    let media_box: Vec<Object> = [0.0, 0.0, width_pt, height_pt]
        .into_iter()
        .map(Object::Real)
        .collect();
    page.set("MediaBox", media_box);
    page.remove(b"CropBox");
    page.remove(b"TrimBox");
    page.remove(b"BleedBox");
    page.remove(b"ArtBox");
    page.set("Contents", Object::Reference(content_id));
    Ok(())
}

// -- Helpers ------------------------------------------------------------------

fn resolve_dict<'a>(document: &'a Document, object: &'a Object) -> Option<&'a Dictionary> {
    document
        .dereference(object)
        .ok()
        .and_then(|(_, object)| object.as_dict().ok())
}

fn stream_filters(stream: &Stream) -> Vec<Vec<u8>> {
    stream
        .filters()
        .map(|filters| filters.into_iter().map(<[u8]>::to_vec).collect())
        .unwrap_or_default()
}

fn filter_names(filters: &[Vec<u8>]) -> Vec<String> {
    filters
        .iter()
        .map(|filter| String::from_utf8_lossy(filter).into_owned())
        .collect()
}

/// Undo every filter except a trailing DCTDecode.
fn decode_leading_filters(stream: &Stream) -> Result<Vec<u8>, ScanmergeError> {
    let mut outer = stream.clone();
    let filters = stream_filters(stream);
    let leading: Vec<Object> = filters[..filters.len() - 1]
        .iter()
        .map(|filter| Object::Name(filter.clone()))
        .collect();
    outer.dict.set("Filter", leading);
    outer
        .decompressed_content()
        .map_err(|err| ScanmergeError::ImageError(format!("cannot unwrap JPEG data: {}", err)))
}

/// Number of colour components for a /ColorSpace value.
fn color_components(document: &Document, space: &Object) -> Option<u8> {
    let (_, space) = document.dereference(space).ok()?;
    match space {
        Object::Name(name) => match name.as_slice() {
            b"DeviceGray" | b"CalGray" | b"G" => Some(1),
            b"DeviceRGB" | b"CalRGB" | b"RGB" => Some(3),
            b"DeviceCMYK" | b"CMYK" => Some(4),
            _ => None,
        },
        Object::Array(parts) => {
            let family = parts.first()?.as_name().ok()?;
            match family {
                b"ICCBased" => {
                    let (_, profile) = document.dereference(parts.get(1)?).ok()?;
                    let n = profile.as_stream().ok()?.dict.get(b"N").and_then(Object::as_i64).ok()?;
                    u8::try_from(n).ok()
                }
                b"CalGray" => Some(1),
                b"CalRGB" => Some(3),
                _ => {
                    warn!(family = %String::from_utf8_lossy(family), "Unsupported colour space");
                    None
                }
            }
        }
        _ => None,
    }
}

fn truncate(mut samples: Vec<u8>, expected: usize) -> Vec<u8> {
    samples.truncate(expected);
    samples
}

/// Expand 1-bit samples (rows padded to whole bytes, 0 = black) to 8-bit gray.
fn unpack_bilevel(samples: &[u8], width: u32, height: u32) -> Option<GrayImage> {
    let row_bytes = (width as usize).div_ceil(8);
    if samples.len() < row_bytes * height as usize {
        return None;
    }
    Some(GrayImage::from_fn(width, height, |x, y| {
        let byte = samples[y as usize * row_bytes + x as usize / 8];
        let bit = (byte >> (7 - (x % 8))) & 1;
        image::Luma([if bit == 1 { 255 } else { 0 }])
    }))
}
