//! Integration tests for annotation extraction on real (in-memory) PDFs.

mod common;

use common::{build_pdf, page_top, rect_over, TestPage};
use std::io::Write;
use unmark::{
    extract, extract_file, extract_reader, extract_with_options, list_annotations, AnnotationKind,
    CleanupPreset, Error, ExtractOptions, PageSelection, Unmark,
};

fn texts(fragments: &[unmark::Fragment]) -> Vec<&str> {
    fragments.iter().map(|f| f.text.as_str()).collect()
}

/// One page whose content is only `/X1 Do`, with X1 drawing `content`.
///
/// The Helvetica resource lives on the form when `font_on_form` is set and
/// on the page otherwise. The page carries a Highlight over `rect`.
fn form_pdf(
    content: &[u8],
    matrix: Option<[i64; 6]>,
    font_on_form: bool,
    rect: [i64; 4],
) -> Vec<u8> {
    use lopdf::{dictionary, Object, Stream};

    let mut doc = lopdf::Document::with_version("1.7");
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let fonts = dictionary! { "F1" => font_id };

    let mut form = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Form",
        "BBox" => vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Integer(612),
            Object::Integer(792),
        ],
    };
    if let Some(matrix) = matrix {
        form.set("Matrix", matrix.iter().map(|v| Object::Integer(*v)).collect::<Vec<_>>());
    }
    if font_on_form {
        form.set("Resources", dictionary! { "Font" => fonts.clone() });
    }
    let form_id = doc.add_object(Stream::new(form, content.to_vec()));

    let mut resources = dictionary! { "XObject" => dictionary! { "X1" => form_id } };
    if !font_on_form {
        resources.set("Font", fonts);
    }
    let content_id = doc.add_object(Stream::new(dictionary! {}, b"/X1 Do".to_vec()));
    let annot_id = doc.add_object(dictionary! {
        "Type" => "Annot",
        "Subtype" => "Highlight",
        "Rect" => rect.iter().map(|v| Object::Integer(*v)).collect::<Vec<_>>(),
    });

    let pages_id = doc.new_object_id();
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Integer(612),
            Object::Integer(792),
        ],
        "Contents" => content_id,
        "Resources" => resources,
        "Annots" => vec![Object::Reference(annot_id)],
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::Reference(page_id)],
            "Count" => Object::Integer(1),
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}

// ==================== Scenarios ====================

#[test]
fn test_single_highlight() {
    let pdf = build_pdf(&[TestPage::new()
        .text(72.0, 700.0, "Hello world")
        .highlight_over(72.0, 700.0, 11)]);

    let fragments = extract(&pdf).unwrap();
    assert_eq!(fragments.len(), 1);
    assert_eq!(fragments[0].page, 1);
    assert_eq!(fragments[0].text, "Hello world");
    assert_eq!(fragments[0].kind, AnnotationKind::Highlight);
}

#[test]
fn test_higher_fragment_comes_first() {
    // page-space tops: 100 for the first annotation, 50 for the second
    let pdf = build_pdf(&[TestPage::new()
        .text(72.0, 684.0, "lower")
        .text(72.0, 734.0, "upper")
        .highlight_over(72.0, 684.0, 5)
        .highlight_over(72.0, 734.0, 5)]);

    let fragments = extract(&pdf).unwrap();
    assert_eq!(texts(&fragments), vec!["upper", "lower"]);
    assert!((fragments[0].y0 - 50.0).abs() < 1e-3);
    assert!((fragments[1].y0 - 100.0).abs() < 1e-3);
    assert_eq!(fragments[0].x0, fragments[1].x0);
}

#[test]
fn test_page_order_beats_position() {
    let pdf = build_pdf(&[
        TestPage::new()
            .text(72.0, 40.0, "bottom of page one")
            .highlight_over(72.0, 40.0, 18),
        TestPage::new()
            .text(72.0, 774.0, "top of page two")
            .highlight_over(72.0, 774.0, 15),
    ]);

    let fragments = extract(&pdf).unwrap();
    assert_eq!(fragments.len(), 2);
    assert_eq!(fragments[0].page, 1);
    assert_eq!(fragments[0].text, "bottom of page one");
    assert_eq!(fragments[1].page, 2);
    assert!(fragments[1].y0 < fragments[0].y0);
}

#[test]
fn test_no_annotations_is_empty_not_error() {
    let pdf = build_pdf(&[TestPage::new().text(72.0, 700.0, "plain text")]);
    assert!(extract(&pdf).unwrap().is_empty());
}

#[test]
fn test_highlight_over_blank_area_dropped() {
    let pdf = build_pdf(&[TestPage::new()
        .text(72.0, 700.0, "Hello")
        .mark("Highlight", [300.0, 300.0, 400.0, 320.0])]);
    assert!(extract(&pdf).unwrap().is_empty());
}

#[test]
fn test_corrupted_input_is_parse_error() {
    let err = extract(b"\x00\x01garbage bytes").unwrap_err();
    assert!(err.is_parse_error());
    assert!(matches!(err, Error::UnknownFormat));

    let pdf = build_pdf(&[TestPage::new()
        .text(72.0, 700.0, "Hello")
        .highlight_over(72.0, 700.0, 5)]);
    let truncated = &pdf[..pdf.len() / 3];
    assert!(extract(truncated).unwrap_err().is_parse_error());
}

// ==================== Properties ====================

#[test]
fn test_reading_order_in_two_columns() {
    // annotations enumerated column by column; output reads row by row
    let pdf = build_pdf(&[TestPage::new()
        .text(72.0, 700.0, "left one")
        .text(72.0, 680.0, "left two")
        .text(320.0, 700.0, "right one")
        .text(320.0, 680.0, "right two")
        .highlight_over(72.0, 700.0, 8)
        .highlight_over(72.0, 680.0, 8)
        .highlight_over(320.0, 700.0, 9)
        .highlight_over(320.0, 680.0, 9)]);

    let fragments = extract(&pdf).unwrap();
    assert_eq!(
        texts(&fragments),
        vec!["left one", "right one", "left two", "right two"]
    );
    for pair in fragments.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        assert!(a.page < b.page || a.y0 < b.y0 || (a.y0 == b.y0 && a.x0 <= b.x0));
    }
}

#[test]
fn test_ties_keep_enumeration_order() {
    let pdf = build_pdf(&[TestPage::new()
        .text(72.0, 700.0, "same spot")
        .underline_over(72.0, 700.0, 9)
        .highlight_over(72.0, 700.0, 9)]);

    let fragments = extract(&pdf).unwrap();
    assert_eq!(fragments.len(), 2);
    assert_eq!(fragments[0].kind, AnnotationKind::Underline);
    assert_eq!(fragments[1].kind, AnnotationKind::Highlight);
    assert_eq!(fragments[0].text, fragments[1].text);
}

#[test]
fn test_overlapping_annotations_not_deduplicated() {
    let pdf = build_pdf(&[TestPage::new()
        .text(72.0, 700.0, "alpha beta gamma")
        .highlight_over(72.0, 700.0, 10)
        .underline_over(72.0, 700.0, 16)]);

    let fragments = extract(&pdf).unwrap();
    assert_eq!(texts(&fragments), vec!["alpha beta", "alpha beta gamma"]);
}

#[test]
fn test_non_markup_annotations_ignored() {
    let pdf = build_pdf(&[TestPage::new()
        .text(72.0, 700.0, "struck text")
        .mark_over("StrikeOut", 72.0, 700.0, 11)
        .mark_over("Text", 72.0, 700.0, 11)
        .mark_over("Square", 72.0, 700.0, 11)]);

    assert!(extract(&pdf).unwrap().is_empty());
    assert_eq!(list_annotations(&pdf).unwrap().len(), 3);
}

#[test]
fn test_extraction_is_idempotent() {
    let pdf = build_pdf(&[
        TestPage::new()
            .text(72.0, 700.0, "one")
            .text(200.0, 700.0, "two")
            .highlight_over(200.0, 700.0, 3)
            .highlight_over(72.0, 700.0, 3),
        TestPage::new()
            .text(72.0, 500.0, "three")
            .underline_over(72.0, 500.0, 5),
    ]);

    assert_eq!(extract(&pdf).unwrap(), extract(&pdf).unwrap());
}

#[test]
fn test_no_fragment_is_blank() {
    let pdf = build_pdf(&[TestPage::new()
        .text(72.0, 700.0, "x      y")
        .mark("Highlight", [82.0, 698.0, 103.0, 708.0])
        .highlight_over(72.0, 700.0, 1)]);

    let fragments = extract(&pdf).unwrap();
    assert!(fragments.iter().all(|f| !f.text.trim().is_empty()));
    assert_eq!(texts(&fragments), vec!["x"]);
}

// ==================== Geometry ====================

#[test]
fn test_fragment_position_is_unpadded_rect() {
    let pdf = build_pdf(&[TestPage::new()
        .text(100.0, 600.0, "target")
        .highlight_over(100.0, 600.0, 6)]);

    let fragment = &extract(&pdf).unwrap()[0];
    assert!((fragment.x0 - 100.0).abs() < 1e-3);
    assert!((fragment.y0 - page_top(600.0)).abs() < 1e-3);
}

#[test]
fn test_highlight_spanning_two_lines() {
    let [x0, y0, _, _] = rect_over(72.0, 686.0, 11);
    let [_, _, x1, y1] = rect_over(72.0, 700.0, 11);
    let pdf = build_pdf(&[TestPage::new()
        .text(72.0, 700.0, "first line")
        .text(72.0, 686.0, "second line")
        .mark("Highlight", [x0, y0, x1, y1])]);

    let fragments = extract(&pdf).unwrap();
    assert_eq!(texts(&fragments), vec!["first line\nsecond line"]);

    let options = ExtractOptions::new().with_cleanup(unmark::CleanupOptions::standard());
    let cleaned = extract_with_options(&pdf, options).unwrap();
    assert_eq!(texts(&cleaned), vec!["first line second line"]);
}

#[test]
fn test_inverted_rect_corners() {
    let [x0, y0, x1, y1] = rect_over(72.0, 700.0, 5);
    let pdf = build_pdf(&[TestPage::new()
        .text(72.0, 700.0, "Hello")
        .mark("Highlight", [x1, y1, x0, y0])]);

    assert_eq!(texts(&extract(&pdf).unwrap()), vec!["Hello"]);
}

#[test]
fn test_zero_area_annotation_skipped() {
    let pdf = build_pdf(&[TestPage::new()
        .text(72.0, 700.0, "Hello")
        .mark("Highlight", [72.0, 700.0, 72.0, 700.0])]);
    assert!(extract(&pdf).unwrap().is_empty());
}

// ==================== Options ====================

#[test]
fn test_page_selection() {
    let pdf = build_pdf(&[
        TestPage::new().text(72.0, 700.0, "one").highlight_over(72.0, 700.0, 3),
        TestPage::new().text(72.0, 700.0, "two").highlight_over(72.0, 700.0, 3),
        TestPage::new().text(72.0, 700.0, "three").highlight_over(72.0, 700.0, 5),
    ]);

    let options = ExtractOptions::new().with_pages(PageSelection::parse("2-3").unwrap());
    let fragments = extract_with_options(&pdf, options).unwrap();
    assert_eq!(texts(&fragments), vec!["two", "three"]);

    let options = ExtractOptions::new().with_pages(PageSelection::Pages(vec![7]));
    assert!(matches!(
        extract_with_options(&pdf, options),
        Err(Error::PageOutOfRange(7, 3))
    ));
}

#[test]
fn test_kinds_option() {
    let pdf = build_pdf(&[TestPage::new()
        .text(72.0, 700.0, "marked")
        .text(72.0, 650.0, "struck")
        .highlight_over(72.0, 700.0, 6)
        .mark_over("StrikeOut", 72.0, 650.0, 6)]);

    let options = ExtractOptions::new().with_kinds(vec![AnnotationKind::from_subtype("StrikeOut")]);
    let fragments = extract_with_options(&pdf, options).unwrap();
    assert_eq!(texts(&fragments), vec!["struck"]);
}

// ==================== Form XObjects ====================

#[test]
fn test_highlight_over_form_xobject_text() {
    let pdf = form_pdf(
        b"BT /F1 10 Tf 72 700 Td (Hello world) Tj ET",
        None,
        true,
        [72, 698, 127, 708],
    );

    let fragments = extract(&pdf).unwrap();
    assert_eq!(texts(&fragments), vec!["Hello world"]);
}

#[test]
fn test_form_xobject_matrix_and_page_fonts() {
    // the form draws at y=800 and its matrix moves it down to y=700
    let pdf = form_pdf(
        b"BT /F1 10 Tf 72 800 Td (Hello world) Tj ET",
        Some([1, 0, 0, 1, 0, -100]),
        false,
        [72, 698, 127, 708],
    );

    let fragments = extract(&pdf).unwrap();
    assert_eq!(texts(&fragments), vec!["Hello world"]);
}

#[test]
fn test_self_drawing_form_xobject_terminates() {
    let pdf = form_pdf(b"/X1 Do", None, false, [72, 698, 127, 708]);
    assert!(extract(&pdf).unwrap().is_empty());
}

// ==================== Entry points ====================

#[test]
fn test_extract_file_and_reader() {
    let pdf = build_pdf(&[TestPage::new()
        .text(72.0, 700.0, "from disk")
        .highlight_over(72.0, 700.0, 9)]);
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&pdf).unwrap();

    let from_file = extract_file(file.path()).unwrap();
    let from_reader = extract_reader(std::fs::File::open(file.path()).unwrap()).unwrap();
    assert_eq!(texts(&from_file), vec!["from disk"]);
    assert_eq!(from_file, from_reader);
}

#[test]
fn test_junk_before_header_tolerated() {
    let pdf = build_pdf(&[TestPage::new()
        .text(72.0, 700.0, "Hello world")
        .highlight_over(72.0, 700.0, 11)]);
    let mut prefixed = b"junk\n".to_vec();
    prefixed.extend_from_slice(&pdf);

    assert_eq!(texts(&extract(&prefixed).unwrap()), vec!["Hello world"]);

    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&prefixed).unwrap();
    assert_eq!(texts(&extract_file(file.path()).unwrap()), vec!["Hello world"]);
}

#[test]
fn test_list_annotations_metadata() {
    let pdf = build_pdf(&[TestPage::new()
        .text(72.0, 700.0, "Hello")
        .highlight_over(72.0, 700.0, 5)
        .by("Dr. Reader")
        .mark("Text", [10.0, 10.0, 30.0, 30.0])]);

    let annotations = list_annotations(&pdf).unwrap();
    assert_eq!(annotations.len(), 2);
    assert_eq!(annotations[0].kind, AnnotationKind::Highlight);
    assert_eq!(annotations[0].author.as_deref(), Some("Dr. Reader"));
    assert_eq!(annotations[1].kind, AnnotationKind::from_subtype("Text"));
    assert_eq!(annotations[1].index, 1);
    assert!((annotations[1].rect.y0 - 762.0).abs() < 1e-3);
}

#[test]
fn test_builder_output() {
    let pdf = build_pdf(&[TestPage::new()
        .text(72.0, 700.0, "Hello world")
        .highlight_over(72.0, 700.0, 11)]);

    let extraction = Unmark::new()
        .with_cleanup(CleanupPreset::Standard)
        .extract_bytes(&pdf)
        .unwrap();
    assert_eq!(extraction.len(), 1);
    assert_eq!(extraction.to_text(), "[Pg 1] Hello world");

    let extraction = Unmark::new().with_label("Pág").extract_bytes(&pdf).unwrap();
    assert_eq!(extraction.to_text(), "[Pág 1] Hello world");
    let json = extraction.to_json(unmark::JsonFormat::Compact).unwrap();
    assert!(json.contains("\"text\":\"Hello world\""));
}
