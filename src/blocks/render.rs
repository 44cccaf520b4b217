use super::ContentBlock;
use crate::model::{AnnotationKind, AnnotationRecord};

/// Trims and replaces every line break with a single space. Runs of inner whitespace are
/// kept as they are.
pub fn normalize_highlight(text: &str) -> String {
    text.trim().replace("\r\n", " ").replace(['\n', '\r'], " ")
}

fn render_one(annotation: &AnnotationRecord) -> Option<ContentBlock> {
    let highlight = annotation
        .text
        .as_deref()
        .map(normalize_highlight)
        .unwrap_or_default();

    match annotation.kind {
        AnnotationKind::Highlight => {
            (!highlight.is_empty()).then(|| ContentBlock::paragraph(highlight))
        }
        AnnotationKind::Note => {
            let note = annotation.note.as_deref().map(str::trim).unwrap_or_default();
            let content = match (note.is_empty(), highlight.is_empty()) {
                (false, false) => format!("{}\n{}", note, highlight),
                (false, true) => note.to_string(),
                (true, false) => highlight,
                (true, true) => return None,
            };
            Some(ContentBlock::quote(content))
        }
    }
}

/// Renders annotations into blocks, one per annotation, in input order. Annotations with
/// nothing to show are skipped.
pub fn render(annotations: &[AnnotationRecord]) -> Vec<ContentBlock> {
    annotations.iter().filter_map(render_one).collect()
}

/// The text handed to the summarizer: every highlight excerpt, one per line.
pub fn summary_source(annotations: &[AnnotationRecord]) -> String {
    annotations
        .iter()
        .filter_map(|a| a.text.as_deref())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_highlight_is_normalized() {
        let blocks = render(&[AnnotationRecord::highlight(" hi\nthere ")]);
        assert_eq!(blocks, vec![ContentBlock::paragraph("hi there")]);
    }

    #[test]
    fn test_inner_whitespace_is_kept() {
        let blocks = render(&[AnnotationRecord::highlight("a  b\r\nc")]);
        assert_eq!(blocks, vec![ContentBlock::paragraph("a  b c")]);
    }

    #[test]
    fn test_note_with_highlight() {
        let blocks = render(&[AnnotationRecord::note(Some("n"), Some("h"))]);
        assert_eq!(blocks, vec![ContentBlock::quote("n\nh")]);
    }

    #[test]
    fn test_note_alone_and_highlight_alone() {
        let blocks = render(&[
            AnnotationRecord::note(Some(" just a note "), None),
            AnnotationRecord::note(None, Some("only\nhighlight")),
            AnnotationRecord::note(Some(""), Some("x")),
        ]);
        assert_eq!(
            blocks,
            vec![
                ContentBlock::quote("just a note"),
                ContentBlock::quote("only highlight"),
                ContentBlock::quote("x"),
            ]
        );
    }

    #[test]
    fn test_empty_records_are_skipped() {
        let blocks = render(&[
            AnnotationRecord::highlight("first"),
            AnnotationRecord::highlight("   "),
            AnnotationRecord::note(None, None),
            AnnotationRecord::note(Some("  "), Some("\n")),
            AnnotationRecord::highlight("last"),
        ]);
        assert_eq!(
            blocks,
            vec![ContentBlock::paragraph("first"), ContentBlock::paragraph("last")]
        );
    }

    #[test]
    fn test_order_is_preserved() {
        let annotations: Vec<_> = (0..50)
            .map(|i| AnnotationRecord::highlight(&format!("h{}", i)))
            .collect();
        let blocks = render(&annotations);
        assert_eq!(blocks.len(), 50);
        for (i, block) in blocks.iter().enumerate() {
            assert_eq!(block.plain_text(), format!("h{}", i));
        }
    }

    #[test]
    fn test_markup_is_not_interpreted() {
        let blocks = render(&[AnnotationRecord::highlight("**not bold**")]);
        assert_eq!(blocks, vec![ContentBlock::paragraph("**not bold**")]);
    }

    #[test]
    fn test_summary_source_joins_highlights() {
        let source = summary_source(&[
            AnnotationRecord::highlight("one"),
            AnnotationRecord::note(Some("thoughts"), None),
            AnnotationRecord::note(Some("more"), Some("two")),
        ]);
        assert_eq!(source, "one\ntwo");
    }
}
