//! First-page raster extraction from scanned PDFs using lopdf.

use std::borrow::Cow;
use std::io::Cursor;

use image::{DynamicImage, GrayImage, ImageFormat, RgbImage};
use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::{debug, trace};

use super::{is_pdf, Result};
use crate::error::PdfError;

/// Page the raster is taken from (1-indexed).
const RASTER_PAGE: u32 = 1;

/// Turns raw input bytes into page image bytes.
///
/// Scanned invoices often arrive as single-page PDFs wrapping one JPEG or
/// raw bitmap. The loader pulls that image out so the rest of the pipeline
/// only ever sees image bytes. Anything that is not a PDF passes through.
#[derive(Debug, Clone, Default)]
pub struct DocumentLoader;

impl DocumentLoader {
    pub fn new() -> Self {
        Self
    }

    /// Return page image bytes for `data`.
    pub fn load<'a>(&self, data: &'a [u8]) -> Result<Cow<'a, [u8]>> {
        if !is_pdf(data) {
            trace!("Input is not a PDF, passing {} bytes through", data.len());
            return Ok(Cow::Borrowed(data));
        }

        let doc = self.open(data)?;
        let image = self.first_page_raster(&doc)?;
        debug!("Extracted {}x{} raster from PDF page {}", image.width(), image.height(), RASTER_PAGE);

        let mut png = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .map_err(|e| {
                debug!("Failed to re-encode PDF raster: {}", e);
                PdfError::NoRaster(RASTER_PAGE)
            })?;
        Ok(Cow::Owned(png))
    }

    fn open(&self, data: &[u8]) -> Result<Document> {
        let mut doc = Document::load_mem(data).map_err(|e| PdfError::Parse(e.to_string()))?;

        // Scanner software often encrypts with an empty user password
        if doc.is_encrypted() {
            if doc.decrypt("").is_err() {
                return Err(PdfError::Encrypted);
            }
            debug!("Decrypted PDF with empty password");
        }

        if doc.get_pages().is_empty() {
            return Err(PdfError::NoPages);
        }

        debug!("Loaded PDF with {} pages", doc.get_pages().len());
        Ok(doc)
    }

    fn first_page_raster(&self, doc: &Document) -> Result<DynamicImage> {
        let pages = doc.get_pages();
        let page_id = pages.get(&RASTER_PAGE).ok_or(PdfError::NoPages)?;

        let resources = page_resources(doc, *page_id).ok_or(PdfError::NoRaster(RASTER_PAGE))?;
        let xobjects = match resources.get(b"XObject").ok().map(|o| doc.dereference(o)) {
            Some(Ok((_, Object::Dictionary(dict)))) => dict,
            _ => {
                debug!("Page {} has no XObject resources", RASTER_PAGE);
                return Err(PdfError::NoRaster(RASTER_PAGE));
            }
        };

        xobjects
            .iter()
            .filter_map(|(name, reference)| {
                let (_, object) = doc.dereference(reference).ok()?;
                trace!("Inspecting XObject {}", String::from_utf8_lossy(name));
                decode_image_object(doc, object)
            })
            .next()
            .ok_or(PdfError::NoRaster(RASTER_PAGE))
    }
}

/// Resources for a page, following `Parent` links for inherited entries.
fn page_resources(doc: &Document, node_id: ObjectId) -> Option<Dictionary> {
    let Ok(Object::Dictionary(dict)) = doc.get_object(node_id) else {
        return None;
    };

    if let Ok(resources) = dict.get(b"Resources") {
        if let Ok((_, Object::Dictionary(res_dict))) = doc.dereference(resources) {
            return Some(res_dict.clone());
        }
    }

    match dict.get(b"Parent") {
        Ok(Object::Reference(parent_id)) => page_resources(doc, *parent_id),
        _ => None,
    }
}

fn decode_image_object(doc: &Document, object: &Object) -> Option<DynamicImage> {
    let Object::Stream(stream) = object else {
        return None;
    };
    let dict = &stream.dict;

    if dict.get(b"Subtype").ok()?.as_name().ok()? != b"Image" {
        return None;
    }

    let width = u32::try_from(dict.get(b"Width").ok()?.as_i64().ok()?).ok()?;
    let height = u32::try_from(dict.get(b"Height").ok()?.as_i64().ok()?).ok()?;
    trace!("Found image object: {}x{}", width, height);

    let filter = dict.get(b"Filter").ok().and_then(|filter| match filter {
        Object::Name(name) => Some(name.as_slice()),
        Object::Array(arr) => arr.first().and_then(|o| o.as_name().ok()),
        _ => None,
    });

    match filter {
        Some(b"DCTDecode") => {
            return image::load_from_memory_with_format(&stream.content, ImageFormat::Jpeg).ok();
        }
        Some(b"JPXDecode") | Some(b"CCITTFaxDecode") | Some(b"JBIG2Decode") => {
            trace!("Unsupported image filter {:?}", filter.map(String::from_utf8_lossy));
            return None;
        }
        _ => {}
    }

    let data = stream.decompressed_content().unwrap_or_else(|_| stream.content.clone());

    let color_space = dict
        .get(b"ColorSpace")
        .ok()
        .and_then(|o| match o {
            Object::Name(name) => Some(name.as_slice()),
            Object::Array(arr) => arr.first().and_then(|o| o.as_name().ok()),
            Object::Reference(r) => doc.get_object(*r).ok().and_then(|o| o.as_name().ok()),
            _ => None,
        })
        .unwrap_or(b"DeviceRGB");

    let bits = dict
        .get(b"BitsPerComponent")
        .ok()
        .and_then(|o| o.as_i64().ok())
        .unwrap_or(8);

    raw_image(data, width, height, color_space, bits)
}

/// Build an image from uncompressed 8-bit samples.
fn raw_image(mut data: Vec<u8>, width: u32, height: u32, color_space: &[u8], bits: i64) -> Option<DynamicImage> {
    if bits != 8 {
        trace!("Unsupported bits per component: {}", bits);
        return None;
    }

    let pixels = (width as usize).checked_mul(height as usize)?;
    match color_space {
        b"DeviceRGB" | b"RGB" => {
            data.truncate(pixels.checked_mul(3)?);
            RgbImage::from_raw(width, height, data).map(DynamicImage::ImageRgb8)
        }
        b"DeviceGray" | b"G" => {
            data.truncate(pixels);
            GrayImage::from_raw(width, height, data).map(DynamicImage::ImageLuma8)
        }
        other => {
            trace!("Unsupported color space {}", String::from_utf8_lossy(other));
            None
        }
    }
}
