#![allow(dead_code)]

use std::path::Path;

use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, ObjectId, Stream, dictionary};

fn build_document(
    path: &Path,
    page_contents: Vec<Vec<Operation>>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut doc = Document::with_version("1.5");

    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut page_ids: Vec<ObjectId> = Vec::new();
    for operations in page_contents {
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        page_ids.push(page_id);
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => page_ids.iter().map(|id| (*id).into()).collect::<Vec<_>>(),
            "Count" => i64::try_from(page_ids.len())?,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    doc.save(path)?;
    Ok(())
}

fn text_lines(lines: &[&str]) -> Vec<Operation> {
    let mut operations = vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec!["F1".into(), 12.into()]),
        Operation::new("TL", vec![16.into()]),
        Operation::new("Td", vec![50.into(), 780.into()]),
    ];

    for (index, line) in lines.iter().enumerate() {
        operations.push(Operation::new("Tj", vec![Object::string_literal(*line)]));
        if index + 1 < lines.len() {
            operations.push(Operation::new("T*", vec![]));
        }
    }
    operations.push(Operation::new("ET", vec![]));
    operations
}

/// One page per entry, each line written in Courier 12pt, 16pt apart. Use two
/// spaces between cells of a table row.
pub fn create_test_pdf(path: &Path, pages: &[Vec<&str>]) -> Result<(), Box<dyn std::error::Error>> {
    build_document(path, pages.iter().map(|lines| text_lines(lines)).collect())
}

/// One page holding `title` above a ruled grid: columns 150pt wide starting at
/// x=50, rows 20pt high starting at y=700, every cell text inset by 5pt.
pub fn create_grid_pdf(
    path: &Path,
    title: &str,
    rows: &[Vec<&str>],
) -> Result<(), Box<dyn std::error::Error>> {
    let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
    let left = 50_i64;
    let right = left + 150 * i64::try_from(columns)?;
    let top = 700_i64;
    let bottom = top - 20 * i64::try_from(rows.len())?;

    let mut operations = vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec!["F1".into(), 12.into()]),
        Operation::new("Td", vec![50.into(), 740.into()]),
        Operation::new("Tj", vec![Object::string_literal(title)]),
        Operation::new("ET", vec![]),
        Operation::new("w", vec![1.into()]),
    ];

    for row in 0..=rows.len() {
        let y = top - 20 * i64::try_from(row)?;
        operations.push(Operation::new("m", vec![left.into(), y.into()]));
        operations.push(Operation::new("l", vec![right.into(), y.into()]));
        operations.push(Operation::new("S", vec![]));
    }
    for column in 0..=columns {
        let x = left + 150 * i64::try_from(column)?;
        operations.push(Operation::new("m", vec![x.into(), top.into()]));
        operations.push(Operation::new("l", vec![x.into(), bottom.into()]));
        operations.push(Operation::new("S", vec![]));
    }

    for (row_index, row) in rows.iter().enumerate() {
        let baseline = top - 20 * i64::try_from(row_index + 1)? + 5;
        for (column_index, cell) in row.iter().enumerate() {
            let x = left + 150 * i64::try_from(column_index)? + 5;
            operations.extend([
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 10.into()]),
                Operation::new("Td", vec![x.into(), baseline.into()]),
                Operation::new("Tj", vec![Object::string_literal(*cell)]),
                Operation::new("ET", vec![]),
            ]);
        }
    }

    build_document(path, vec![operations])
}
