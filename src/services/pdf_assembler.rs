//! PDF 组装
//!
//! 每张图片一页，页面尺寸与图片像素尺寸一致（1px = 1pt），
//! 图片以 JPEG（DCTDecode）嵌入。

use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageFormat};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use tracing::{debug, info};

use crate::error::RenderError;

/// 按给定顺序把图片合成为多页 PDF，返回页数
///
/// 图片列表为空时返回 [`RenderError::NoImagesGenerated`]，不会写出文件。
pub fn assemble_pdf(images: &[PathBuf], output_path: &Path) -> Result<usize, RenderError> {
    if images.is_empty() {
        return Err(RenderError::NoImagesGenerated);
    }

    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| RenderError::pdf(output_path, e))?;
    }

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut kids: Vec<Object> = Vec::with_capacity(images.len());

    for image_path in images {
        let page_id = add_image_page(&mut doc, pages_id, image_path)?;
        kids.push(page_id.into());
        debug!("已添加页面: {}", image_path.display());
    }

    let page_count = kids.len();
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => page_count as i64,
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    doc.save(output_path)
        .map_err(|e| RenderError::pdf(output_path, e))?;

    info!("📚 PDF 已生成: {} ({} 页)", output_path.display(), page_count);
    Ok(page_count)
}

fn add_image_page(
    doc: &mut Document,
    pages_id: ObjectId,
    image_path: &Path,
) -> Result<ObjectId, RenderError> {
    let rgb = image::open(image_path)
        .map_err(|e| RenderError::bitmap(image_path, e))?
        .to_rgb8();
    let (width, height) = rgb.dimensions();

    let mut jpeg = Vec::new();
    DynamicImage::ImageRgb8(rgb)
        .write_to(&mut Cursor::new(&mut jpeg), ImageFormat::Jpeg)
        .map_err(|e| RenderError::bitmap(image_path, e))?;

    let image_stream = Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width as i64,
            "Height" => height as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8i64,
            "Filter" => "DCTDecode",
        },
        jpeg,
    );
    let image_id = doc.add_object(image_stream);

    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    Object::Integer(width as i64),
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(height as i64),
                    Object::Integer(0),
                    Object::Integer(0),
                ],
            ),
            Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
            Operation::new("Q", vec![]),
        ],
    };
    let encoded = content
        .encode()
        .map_err(|e| RenderError::pdf(image_path, e))?;
    let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Integer(width as i64),
            Object::Integer(height as i64),
        ],
        "Resources" => dictionary! {
            "XObject" => dictionary! {
                "Im0" => image_id,
            },
        },
        "Contents" => content_id,
    });

    Ok(page_id)
}
