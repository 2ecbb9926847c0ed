use std::io::Cursor;

use notion_docx_core::contract::MockContentSource;
use notion_docx_core::document::{DocDocument, DocElement};
use notion_docx_core::notion::{Block, BlockKind, ImageSource};
use notion_docx_core::render::render_blocks;
use notion_docx_core::walker::PlacedBlock;

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbaImage::new(width, height);
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .expect("Encoding a PNG in memory succeeds");
    bytes
}

fn image_block(url: &str) -> PlacedBlock {
    PlacedBlock {
        block: Block {
            id: "img-1".to_string(),
            block_type: "image".to_string(),
            has_children: false,
            kind: BlockKind::Image {
                source: Some(ImageSource::External {
                    url: url.to_string(),
                }),
            },
        },
        depth: 0,
    }
}

#[tokio::test]
async fn oversized_image_is_scaled_into_bounds() {
    let mut source = MockContentSource::new();
    source
        .expect_fetch_image()
        .returning(|_| Ok(png_bytes(1000, 500)));

    let mut document = DocDocument::new();
    render_blocks(&source, &mut document, &[image_block("https://x/img.png")]).await;

    let DocElement::Image {
        width_in,
        height_in,
        resized,
        ..
    } = &document.elements[0]
    else {
        panic!("Expected an image element, got {:?}", document.elements[0]);
    };
    assert!(*resized);
    assert!((width_in - 5.5).abs() < 1e-3);
    assert!((height_in - 2.75).abs() < 1e-3);
}

#[tokio::test]
async fn image_within_bounds_is_placed_at_native_size() {
    let mut source = MockContentSource::new();
    source
        .expect_fetch_image()
        .returning(|_| Ok(png_bytes(200, 100)));

    let mut document = DocDocument::new();
    render_blocks(&source, &mut document, &[image_block("https://x/small.png")]).await;

    let DocElement::Image {
        width_in,
        height_in,
        resized,
        ..
    } = &document.elements[0]
    else {
        panic!("Expected an image element");
    };
    assert!(!*resized);
    assert!((width_in - 200.0 / 96.0).abs() < 1e-6);
    assert!((height_in - 100.0 / 96.0).abs() < 1e-6);
}

#[tokio::test]
async fn undecodable_bytes_leave_a_placeholder_and_continue() {
    let mut source = MockContentSource::new();
    source
        .expect_fetch_image()
        .returning(|_| Ok(b"definitely not an image".to_vec()));

    let mut document = DocDocument::new();
    render_blocks(&source, &mut document, &[image_block("https://x/bad.bin")]).await;

    let DocElement::Paragraph { runs, .. } = &document.elements[0] else {
        panic!("Expected a placeholder paragraph");
    };
    assert!(runs[0]
        .text
        .starts_with("Error processing image https://x/bad.bin"));
}
