//! Tests for in-place output: original pages with their marks cleared.

mod common;

use common::*;
use image::RgbImage;
use lopdf::dictionary;
use ocrpdf::{process_file, DetectedWord, Ocrpdf, PageOutcome, ProcessOptions, Result};

const OLD_TEXT: &str = "BT /F1 12 Tf 10 10 Td (old scanner text) Tj ET 0 0 m 100 100 l S";

fn engine(_: &RgbImage, _: &str) -> Result<Vec<DetectedWord>> {
    Ok(vec![word("Hello", (5.0, 5.0, 15.0, 7.5), 0.95)])
}

#[test]
fn test_overlay_keeps_pages_and_replaces_text() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("scan.pdf");
    let output = dir.path().join("out.pdf");
    let (mut doc, _) = build(vec![
        PageSpec::with_image(white_rgb(60, 80)).with_content(OLD_TEXT),
        PageSpec::blank().with_content(OLD_TEXT),
    ]);
    save(&mut doc, &input);

    let options = ProcessOptions::new().overlay();
    let report = process_file(&input, &output, options, &mut engine).unwrap();

    assert_eq!(report.pages[0].rebuilt_page, None);
    assert_eq!(report.pages[1].outcome, PageOutcome::NoImage);

    let (out, pages) = output_pages(&output);
    assert_eq!(pages.len(), 2);

    // Image drawing survives; old text and paths do not.
    let ops = operators(&out, pages[0]);
    assert!(ops.contains(&"Do".to_string()));
    assert!(!ops.contains(&"S".to_string()));
    assert_eq!(shown_strings(&out, pages[0]), vec![b"Hello".to_vec()]);
    assert_eq!(render_modes(&out, pages[0]), vec![3]);
    assert_eq!(text_matrices(&out, pages[0]), vec![vec![1.0, 0.0, 0.0, 1.0, 50.0, 725.0]]);

    // Pages without an image are cleared too.
    assert!(shown_strings(&out, pages[1]).is_empty());
    assert!(!operators(&out, pages[1]).contains(&"S".to_string()));
}

#[test]
fn test_overlay_on_rotated_page() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("rotated.pdf");
    let output = dir.path().join("out.pdf");
    let (mut doc, _) = build(vec![PageSpec::with_image(white_rgb(60, 80)).rotated(90)]);
    save(&mut doc, &input);

    Ocrpdf::new()
        .in_place()
        .process(&input, &output, &mut engine)
        .unwrap();

    let (out, pages) = output_pages(&output);
    assert_eq!(media_box(&out, pages[0]), vec![0.0, 0.0, 600.0, 800.0]);
    assert_eq!(text_matrices(&out, pages[0]), vec![vec![0.0, 1.0, -1.0, 0.0, 75.0, 50.0]]);
}

#[test]
fn test_overlay_with_pure_document() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("scan.pdf");
    let output = dir.path().join("out.pdf");
    let (mut doc, _) = build(vec![
        PageSpec::with_image(white_rgb(60, 80)),
        PageSpec::blank(),
    ]);
    save(&mut doc, &input);

    let options = ProcessOptions::new().overlay().with_pure(true);
    let report = process_file(&input, &output, options, &mut engine).unwrap();

    assert_eq!(report.outputs[0].pages, 2);
    assert_eq!(report.outputs[1].pages, 1);
    let (pure, pages) = output_pages(&dir.path().join("out-pure.pdf"));
    assert_eq!(render_modes(&pure, pages[0]), vec![0]);
}

#[test]
fn test_overlay_keeps_form_wrapped_scan() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("wrapped.pdf");
    let output = dir.path().join("out.pdf");
    let (mut doc, page_ids) = build(vec![PageSpec::blank().with_content(OLD_TEXT)]);

    // The scan sits inside a form XObject, as many scanners write it.
    let image_id = doc.add_object(white_rgb(60, 80));
    let form_id = doc.add_object(lopdf::Stream::new(
        lopdf::dictionary! {
            "Type" => "XObject",
            "Subtype" => "Form",
            "BBox" => vec![0.into(), 0.into(), 600.into(), 800.into()],
            "Resources" => lopdf::dictionary! {
                "XObject" => lopdf::dictionary! { "Im0" => image_id },
            },
        },
        b"q 600 0 0 800 0 0 cm /Im0 Do Q".to_vec(),
    ));
    let content = format!("q /Fm0 Do Q {}", OLD_TEXT);
    let content_id = doc.add_object(lopdf::Stream::new(lopdf::Dictionary::new(), content.into_bytes()));
    let page = doc.get_dictionary_mut(page_ids[0]).unwrap();
    page.set("Contents", content_id);
    page.get_mut(b"Resources")
        .unwrap()
        .as_dict_mut()
        .unwrap()
        .set("XObject", lopdf::dictionary! { "Fm0" => form_id });
    save(&mut doc, &input);

    let options = ProcessOptions::new().overlay();
    process_file(&input, &output, options, &mut engine).unwrap();

    let (out, pages) = output_pages(&output);
    let draws: Vec<Vec<u8>> = operations(&out, pages[0])
        .into_iter()
        .filter(|op| op.operator == "Do")
        .filter_map(|op| op.operands.first().and_then(|o| o.as_name().ok()).map(<[u8]>::to_vec))
        .collect();
    assert_eq!(draws, vec![b"Fm0".to_vec()]);
    assert!(shown_strings(&out, pages[0]).is_empty());
    assert!(!operators(&out, pages[0]).contains(&"S".to_string()));
}
