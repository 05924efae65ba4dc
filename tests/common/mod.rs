#![allow(dead_code)]

use std::fs;
use std::path::Path;

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

/// One line of text: content, font size, bold, baseline y (PDF space).
pub struct Line<'a> {
    pub text: &'a str,
    pub size: i64,
    pub bold: bool,
    pub y: i64,
}

pub fn line(text: &str, size: i64, y: i64) -> Line<'_> {
    Line {
        text,
        size,
        bold: false,
        y,
    }
}

pub fn bold(text: &str, size: i64, y: i64) -> Line<'_> {
    Line {
        text,
        size,
        bold: true,
        y,
    }
}

pub const BODY: &str = "This paragraph line is ordinary body text that runs across the full \
                        measure of the page and carries far more than twenty spaces in it";

/// Write a PDF with one content stream per page, Helvetica for regular
/// lines and Helvetica-Bold for bold ones.
pub fn write_pdf(path: &Path, title: Option<&str>, pages: &[Vec<Line<'_>>]) {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let regular = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let heavy = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
    });
    let resources = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => regular,
            "F2" => heavy,
        },
    });

    let mut kids: Vec<Object> = Vec::new();
    for lines in pages {
        let mut operations = Vec::new();
        for l in lines {
            let font = if l.bold { "F2" } else { "F1" };
            operations.push(Operation::new("BT", vec![]));
            operations.push(Operation::new("Tf", vec![font.into(), l.size.into()]));
            operations.push(Operation::new("Td", vec![72.into(), l.y.into()]));
            operations.push(Operation::new("Tj", vec![Object::string_literal(l.text)]));
            operations.push(Operation::new("ET", vec![]));
        }
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    let pages_dict = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => count,
        "Resources" => resources,
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    if let Some(title) = title {
        let info_id = doc.add_object(dictionary! {
            "Title" => Object::string_literal(title),
        });
        doc.trailer.set("Info", info_id);
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    doc.save(path).unwrap();
}

/// A chapter heading, a subsection heading, and a dozen body lines.
pub fn report_page() -> Vec<Line<'static>> {
    let mut lines = vec![
        bold("Chapter 1 Overview", 24, 740),
        line("1.1 Background", 18, 700),
    ];
    for i in 0..12 {
        lines.push(line(BODY, 11, 670 - i * 14));
    }
    lines
}
