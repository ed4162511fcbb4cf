//! Property tests over the shared building blocks and whole conversions

use crate::common::{convert, normalized, parse};
use moin_babel::common::cursor::{LineCursor, LineSource};
use moin_babel::Arguments;
use proptest::collection::{btree_map, vec};
use proptest::prelude::*;

fn value() -> impl Strategy<Value = String> {
    prop_oneof![
        "[-a-z0-9_]{1,8}",
        "[ -~]{0,12}",
        "[a-z]{1,4}[\n\t][a-z]{1,4}",
    ]
}

fn arguments() -> impl Strategy<Value = Arguments> {
    (
        vec(value(), 0..4),
        btree_map("[a-z&][-a-z0-9_]{0,6}", value(), 0..4),
    )
        .prop_map(|(positional, keywords)| {
            let mut args = Arguments::new();
            args.positional = positional;
            args.keyword.extend(keywords);
            args
        })
}

fn paragraphs() -> impl Strategy<Value = String> {
    vec(vec("[a-z]{1,8}", 1..6).prop_map(|words| words.join(" ")), 1..4)
        .prop_map(|paragraphs| paragraphs.join("\n\n") + "\n")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn arguments_survive_unparse_and_parse(args in arguments()) {
        let text = args.unparse().unwrap();
        prop_assert_eq!(Arguments::parse(&text), args);
    }

    #[test]
    fn cursor_yields_every_line_once_despite_push_back(
        lines in vec("[a-z ]{0,6}", 1..8),
        pushes in vec(any::<bool>(), 8),
    ) {
        let text = lines.join("\n");
        let mut cursor = LineCursor::from_text(&text);
        let mut seen = Vec::new();
        let mut index = 0;
        while let Some(line) = cursor.advance() {
            if pushes.get(index).copied().unwrap_or(false) {
                cursor.push_back(line);
                let again = cursor.advance();
                prop_assert_eq!(again, Some(line));
            }
            index += 1;
            prop_assert_eq!(cursor.lineno(), index);
            seen.push(line.to_string());
        }
        prop_assert_eq!(seen, lines);
    }

    #[test]
    fn plain_paragraphs_round_trip(source in paragraphs()) {
        for format in ["moinwiki", "markdown", "rst"] {
            prop_assert_eq!(convert(&source, format, format), source.clone());
        }
    }

    #[test]
    fn markdown_written_from_wiki_reads_back_the_same_tree(source in paragraphs()) {
        let wiki = parse(&source, "moinwiki");
        let markdown = convert(&source, "moinwiki", "markdown");
        prop_assert_eq!(normalized(&parse(&markdown, "markdown")), normalized(&wiki));
    }

    #[test]
    fn readers_accept_any_markup(source in "[ -~\n]{0,40}") {
        for format in ["moinwiki", "moinwiki19", "creole", "mediawiki", "markdown", "rst", "csv", "text"] {
            let doc = parse(&source, format);
            prop_assert!(doc.find("body").is_some(), "{} lost its body", format);
        }
    }
}
