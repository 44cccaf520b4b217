//! Summary markup compiler.
//!
//! Understands the small markdown subset the summarizer is asked to produce: `#` headings,
//! `-`/`*` bullets, `1.` numbered items, `>` quotes, `**bold**` spans, and everything else
//! as paragraphs. One level of list nesting is modelled; anything indented deeper than the
//! open top-level item is flattened into that item's children.

use super::{ContentBlock, HeadingLevel, InlineSpan, ListItem, ListKind};

const BOLD_DELIMITER: &str = "**";

#[derive(Debug, PartialEq, Eq)]
enum Line<'a> {
    Blank,
    Heading(usize, &'a str),
    Item(ListKind, &'a str),
    Quote(&'a str),
    Paragraph(&'a str),
}

fn classify(line: &str) -> Line<'_> {
    let trimmed = line.trim();

    if trimmed.is_empty() {
        return Line::Blank;
    }

    if trimmed.starts_with('#') {
        let depth = trimmed.chars().take_while(|c| *c == '#').count();
        return Line::Heading(depth, trimmed.trim_start_matches('#').trim());
    }

    if trimmed.starts_with("- ") || trimmed.starts_with("* ") {
        return Line::Item(ListKind::Bullet, trimmed[2..].trim());
    }

    // Known weakness: "3. something" anywhere after a leading digit counts.
    if trimmed.starts_with(|c: char| c.is_ascii_digit()) {
        if let Some((_, rest)) = trimmed.split_once(". ") {
            return Line::Item(ListKind::Number, rest.trim());
        }
    }

    if let Some(rest) = trimmed.strip_prefix('>') {
        return Line::Quote(rest.trim());
    }

    Line::Paragraph(trimmed)
}

fn indent_width(line: &str) -> usize {
    line.chars().take_while(|c| c.is_whitespace()).count()
}

/// Splits text on `**` into alternating plain and bold spans, plain first.
///
/// Empty pieces are dropped. With an odd number of delimiters the text after the last
/// `**` is still marked bold; the dangling marker is not re-paired.
pub fn parse_spans(text: &str) -> Vec<InlineSpan> {
    text.split(BOLD_DELIMITER)
        .enumerate()
        .filter(|(_, piece)| !piece.is_empty())
        .map(|(i, piece)| InlineSpan {
            text: piece.to_string(),
            bold: i % 2 == 1,
        })
        .collect()
}

struct OpenList {
    kind: ListKind,
    item: ListItem,
    base_indent: usize,
}

#[derive(Default)]
struct Compiler {
    blocks: Vec<ContentBlock>,
    open: Option<OpenList>,
}

impl Compiler {
    fn close_list(&mut self) {
        if let Some(open) = self.open.take() {
            self.blocks.push(ContentBlock::list_item(open.kind, open.item));
        }
    }

    fn push(&mut self, block: ContentBlock) {
        self.close_list();
        self.blocks.push(block);
    }

    fn push_item(&mut self, kind: ListKind, indent: usize, text: &str) {
        let item = ListItem::new(parse_spans(text));

        if let Some(open) = self.open.as_mut() {
            if open.kind == kind && indent > open.base_indent {
                open.item.children.push(item);
                return;
            }
        }

        self.close_list();
        self.open = Some(OpenList {
            kind,
            item,
            base_indent: indent,
        });
    }

    fn finish(mut self) -> Vec<ContentBlock> {
        self.close_list();
        self.blocks
    }
}

/// Compiles summary markup into an ordered forest of content blocks.
pub fn compile(text: &str) -> Vec<ContentBlock> {
    let mut compiler = Compiler::default();

    for line in text.split('\n') {
        match classify(line) {
            Line::Blank => compiler.close_list(),
            Line::Heading(depth, rest) => compiler.push(ContentBlock::Heading {
                level: HeadingLevel::from_depth(depth),
                spans: parse_spans(rest),
            }),
            Line::Item(kind, rest) => compiler.push_item(kind, indent_width(line), rest),
            Line::Quote(rest) => compiler.push(ContentBlock::Quote {
                spans: parse_spans(rest),
            }),
            Line::Paragraph(rest) => compiler.push(ContentBlock::Paragraph {
                spans: parse_spans(rest),
            }),
        }
    }

    compiler.finish()
}
