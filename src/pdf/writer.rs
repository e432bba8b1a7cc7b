//! Base document: title, body and rendered attachment pages, serialized
//! with `lopdf` in a single pass.

use std::io::Write;

use chrono::{DateTime, Utc};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, Stream, StringFormat};
use tracing::debug;

use crate::config::LayoutConfig;
use crate::error::{AttachmentRenderError, PipelineError, Result};
use crate::model::mail::ParsedMail;
use crate::model::metadata::MetadataField;
use crate::model::page::{FontStyle, PageElement, PageKind, RasterImage, RenderedPage};
use crate::pdf::layout::PageFlow;
use crate::render::{render_attachment, RenderOutcome};

const PRODUCER: &str = concat!("orderpdf ", env!("CARGO_PKG_VERSION"));

const REGULAR_FONT: &str = "F1";
const BOLD_FONT: &str = "F2";

/// Line width of heading underlines.
const RULE_WIDTH: f32 = 0.75;

/// Document-level facts the serializer needs besides the pages.
#[derive(Debug, Clone)]
pub struct AssemblyInput<'a> {
    pub order_id: &'a str,
    pub subject: &'a str,
    pub created: DateTime<Utc>,
    pub layout: &'a LayoutConfig,
}

/// Lay out every page of the base document, in final order: title, body
/// (only when non-blank), then each non-PDF attachment in attachment order.
///
/// Attachments that fail to render contribute a fallback page and an error.
pub fn build_pages(
    order_id: &str,
    mail: &ParsedMail,
    fields: &[MetadataField],
    layout: &LayoutConfig,
) -> (Vec<RenderedPage>, Vec<AttachmentRenderError>) {
    let mut pages = title_pages(order_id, mail, fields, layout);
    if !mail.body_text.trim().is_empty() {
        pages.extend(body_pages(&mail.body_text, layout));
    }

    let mut failures = Vec::new();
    for (index, attachment) in mail.attachments.iter().enumerate() {
        match render_attachment(index, attachment, layout) {
            RenderOutcome::Skip => {}
            RenderOutcome::Rendered(rendered) => pages.extend(rendered),
            RenderOutcome::Failed {
                pages: fallback,
                error,
            } => {
                pages.extend(fallback);
                failures.push(error);
            }
        }
    }
    (pages, failures)
}

fn title_pages(
    order_id: &str,
    mail: &ParsedMail,
    fields: &[MetadataField],
    layout: &LayoutConfig,
) -> Vec<RenderedPage> {
    let size = layout.body_font_size;
    let mut flow = PageFlow::new(layout, PageKind::Title, None);

    flow.heading(&format!("Order ID: {order_id}"), layout.title_font_size);
    if !mail.subject.is_empty() {
        flow.paragraph(&format!("Subject: {}", mail.subject), size);
    }
    flow.gap(size * 0.5);

    for field in fields {
        flow.paragraph(&field.to_string(), size);
    }

    if !mail.attachments.is_empty() {
        flow.gap(size);
        flow.line("Attachments:", size, FontStyle::Bold);
        for (i, att) in mail.attachments.iter().enumerate() {
            let human = humansize::format_size(att.size, humansize::BINARY);
            flow.paragraph(
                &format!("{}. {} ({}, {human})", i + 1, att.filename, att.content_type),
                size,
            );
        }
    }
    flow.finish()
}

fn body_pages(body: &str, layout: &LayoutConfig) -> Vec<RenderedPage> {
    let mut flow = PageFlow::new(layout, PageKind::Body, None);
    flow.heading("Email Body", layout.heading_font_size);
    flow.paragraph(body, layout.body_font_size);
    flow.finish()
}

/// Serialize laid-out pages into a PDF.
pub fn assemble(input: &AssemblyInput<'_>, pages: &[RenderedPage]) -> Result<Vec<u8>> {
    let layout = input.layout;
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let regular_id = doc.add_object(font(FontStyle::Regular));
    let bold_id = doc.add_object(font(FontStyle::Bold));

    let mut kids = Vec::with_capacity(pages.len());
    for page in pages {
        let mut xobjects = Dictionary::new();
        let mut operations = Vec::new();

        for element in &page.elements {
            match element {
                PageElement::Text {
                    x,
                    y,
                    size,
                    style,
                    text,
                } => {
                    let font_name = match style {
                        FontStyle::Regular => REGULAR_FONT,
                        FontStyle::Bold => BOLD_FONT,
                    };
                    operations.extend([
                        Operation::new("BT", vec![]),
                        Operation::new("Tf", vec![font_name.into(), (*size).into()]),
                        Operation::new("Td", vec![(*x).into(), (*y).into()]),
                        Operation::new(
                            "Tj",
                            vec![Object::String(encode_text(text), StringFormat::Literal)],
                        ),
                        Operation::new("ET", vec![]),
                    ]);
                }
                PageElement::Rule { x1, x2, y } => {
                    operations.extend([
                        Operation::new("w", vec![RULE_WIDTH.into()]),
                        Operation::new("m", vec![(*x1).into(), (*y).into()]),
                        Operation::new("l", vec![(*x2).into(), (*y).into()]),
                        Operation::new("S", vec![]),
                    ]);
                }
                PageElement::Image {
                    x,
                    y,
                    width,
                    height,
                    image,
                } => {
                    let image_id = doc.add_object(image_xobject(image)?);
                    let name = format!("Im{}", xobjects.len() + 1);
                    xobjects.set(name.as_bytes(), image_id);
                    operations.extend([
                        Operation::new("q", vec![]),
                        Operation::new(
                            "cm",
                            vec![
                                (*width).into(),
                                0.into(),
                                0.into(),
                                (*height).into(),
                                (*x).into(),
                                (*y).into(),
                            ],
                        ),
                        Operation::new("Do", vec![Object::Name(name.into_bytes())]),
                        Operation::new("Q", vec![]),
                    ]);
                }
            }
        }

        let content = Content { operations }.encode()?;
        let content_id = doc.add_object(flate_stream(dictionary! {}, &content)?);

        let mut resources = dictionary! {
            "Font" => dictionary! {
                REGULAR_FONT => regular_id,
                BOLD_FONT => bold_id,
            },
        };
        if !xobjects.is_empty() {
            resources.set("XObject", xobjects);
        }

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), layout.page_width.into(), layout.page_height.into()],
            "Resources" => resources,
            "Contents" => content_id,
        });
        kids.push(Object::from(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    let info_id = doc.add_object(info(input));
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| PipelineError::Assembly(format!("serialization failed: {e}")))?;

    debug!(
        order_id = input.order_id,
        pages = count,
        bytes = buffer.len(),
        "Serialized base document"
    );
    Ok(buffer)
}

fn font(style: FontStyle) -> Dictionary {
    let base = match style {
        FontStyle::Regular => "Helvetica",
        FontStyle::Bold => "Helvetica-Bold",
    };
    dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => base,
        "Encoding" => "WinAnsiEncoding",
    }
}

fn info(input: &AssemblyInput<'_>) -> Dictionary {
    let title = if input.subject.is_empty() {
        format!("Order {}", input.order_id)
    } else {
        format!("Order {}: {}", input.order_id, input.subject)
    };
    let created = input.created.format("D:%Y%m%d%H%M%SZ").to_string();
    dictionary! {
        "Title" => Object::String(encode_text(&title), StringFormat::Literal),
        "Producer" => Object::string_literal(PRODUCER),
        "CreationDate" => Object::string_literal(created),
    }
}

/// Lossless RGB image XObject.
fn image_xobject(image: &RasterImage) -> Result<Stream> {
    flate_stream(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => i64::from(image.width),
            "Height" => i64::from(image.height),
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
        },
        &image.rgb,
    )
}

fn flate_stream(mut dict: Dictionary, data: &[u8]) -> Result<Stream> {
    let mut encoder = ZlibEncoder::new(Vec::with_capacity(data.len() / 2), Compression::default());
    encoder
        .write_all(data)
        .map_err(|e| PipelineError::Assembly(format!("compression failed: {e}")))?;
    let compressed = encoder
        .finish()
        .map_err(|e| PipelineError::Assembly(format!("compression failed: {e}")))?;
    dict.set("Filter", "FlateDecode");
    Ok(Stream::new(dict, compressed).with_compression(false))
}

/// Encode text for a WinAnsiEncoding font. Characters without a
/// Windows-1252 code point become `?`.
pub fn encode_text(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    let mut buf = [0u8; 4];
    for c in text.chars() {
        if c.is_ascii() {
            out.push(c as u8);
            continue;
        }
        let (bytes, _, unmappable) = encoding_rs::WINDOWS_1252.encode(c.encode_utf8(&mut buf));
        if unmappable || bytes.len() != 1 {
            out.push(b'?');
        } else {
            out.push(bytes[0]);
        }
    }
    out
}
