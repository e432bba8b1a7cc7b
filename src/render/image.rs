//! Picture attachments: decoded to RGB and placed once, scaled into the image box.

use std::sync::Arc;

use crate::config::LayoutConfig;
use crate::model::attachment::Attachment;
use crate::model::page::{PageKind, RasterImage, RenderedPage};

use super::{section, RenderError};

/// Decode any supported raster format into 8-bit RGB.
pub fn decode(bytes: &[u8]) -> Result<RasterImage, RenderError> {
    let rgb = ::image::load_from_memory(bytes)?.to_rgb8();
    Ok(RasterImage {
        width: rgb.width(),
        height: rgb.height(),
        rgb: rgb.into_raw(),
    })
}

pub(super) fn render(
    index: usize,
    attachment: &Attachment,
    layout: &LayoutConfig,
) -> Result<Vec<RenderedPage>, RenderError> {
    let image = decode(&attachment.content)?;
    let mut flow = section(layout, PageKind::Image, index, attachment);
    flow.image(Arc::new(image));
    Ok(flow.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::page::PageElement;

    fn encode(width: u32, height: u32, format: ::image::ImageFormat) -> Vec<u8> {
        let img = ::image::RgbImage::from_pixel(width, height, ::image::Rgb([200, 10, 10]));
        let mut out = std::io::Cursor::new(Vec::new());
        img.write_to(&mut out, format).unwrap();
        out.into_inner()
    }

    fn png(width: u32, height: u32) -> Vec<u8> {
        encode(width, height, ::image::ImageFormat::Png)
    }

    /// A 1x1 24-bit BMP written byte by byte.
    fn bmp_1x1() -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(b"BM");
        out.extend_from_slice(&58u32.to_le_bytes()); // file size
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(&54u32.to_le_bytes()); // pixel data offset
        out.extend_from_slice(&40u32.to_le_bytes()); // BITMAPINFOHEADER
        out.extend_from_slice(&1i32.to_le_bytes());
        out.extend_from_slice(&1i32.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes());
        out.extend_from_slice(&24u16.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(&4u32.to_le_bytes());
        out.extend_from_slice(&2835i32.to_le_bytes());
        out.extend_from_slice(&2835i32.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(&[10, 20, 200, 0]); // BGR + row padding
        out
    }

    #[test]
    fn test_decode_png() {
        let image = decode(&png(4, 3)).unwrap();
        assert_eq!((image.width, image.height), (4, 3));
        assert_eq!(image.rgb.len(), 4 * 3 * 3);
        assert_eq!(&image.rgb[..3], &[200, 10, 10]);
    }

    #[test]
    fn test_render_single_image_page() {
        let att = Attachment::new("photo.png", "image/png", png(100, 50));
        let pages = render(1, &att, &LayoutConfig::default()).unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].kind, PageKind::Image);
        assert_eq!(pages[0].source, Some(1));
        let images = pages[0]
            .elements
            .iter()
            .filter(|e| matches!(e, PageElement::Image { .. }))
            .count();
        assert_eq!(images, 1);
    }

    #[test]
    fn test_hand_built_bmp_decodes() {
        let image = decode(&bmp_1x1()).unwrap();
        assert_eq!((image.width, image.height), (1, 1));
        assert_eq!(image.rgb, vec![200, 20, 10]);
    }

    #[test]
    fn test_every_classified_format_renders() {
        use crate::render::{render_attachment, RenderOutcome};
        use ::image::ImageFormat;

        let cases = [
            ("a.png", "image/png", png(8, 6)),
            ("b.jpg", "image/jpeg", encode(8, 6, ImageFormat::Jpeg)),
            ("c.bmp", "image/bmp", bmp_1x1()),
            ("d.bmp", "image/x-ms-bmp", encode(8, 6, ImageFormat::Bmp)),
            ("e.webp", "image/webp", encode(8, 6, ImageFormat::WebP)),
            ("f.tiff", "image/tiff", encode(8, 6, ImageFormat::Tiff)),
            ("g.webp", "application/octet-stream", encode(8, 6, ImageFormat::WebP)),
        ];
        for (name, content_type, bytes) in cases {
            let att = Attachment::new(name, content_type, bytes);
            match render_attachment(0, &att, &LayoutConfig::default()) {
                RenderOutcome::Rendered(pages) => {
                    assert_eq!(pages.len(), 1, "{name}");
                    assert_eq!(pages[0].kind, PageKind::Image, "{name}");
                }
                other => panic!("{name} ({content_type}) did not render: {other:?}"),
            }
        }
    }

    #[test]
    fn test_corrupt_image_is_error() {
        let att = Attachment::new("photo.jpg", "image/jpeg", b"\xff\xd8garbage".to_vec());
        assert!(matches!(
            render(0, &att, &LayoutConfig::default()),
            Err(RenderError::Image(_))
        ));
    }
}
