//! Highlighted source code
//!
//! A small set of regex lexers marks up source text as
//! `blockcode class=highlight` with one `span class=<token>` per token. Token
//! classes use the short names common to highlighting stylesheets:
//!
//! | class | token |
//! |-------|-------|
//! | `k` / `kc` / `kt` | keyword / constant / type |
//! | `c` / `cp` | comment / preprocessor |
//! | `s` | string |
//! | `m` | number |
//! | `nb` / `nf` / `nv` | builtin / function or macro / variable |
//! | `nt` / `na` | tag / attribute |
//! | `o` / `p` | operator / punctuation |
//! | `gh` `gu` `gi` `gd` | diff header, hunk, insertion, deletion |
//!
//! A lexer is one alternation of rules tried left to right; text between
//! matches is emitted unmarked. A rule may hand its match to another lexer,
//! which is how XML tags get their inner tokens.

use crate::error::ConvertError;
use crate::format::{Format, ParseContext};
use crate::ir::names::attr;
use crate::ir::{Element, Node, QName};
use crate::mime::Type;
use once_cell::sync::Lazy;
use regex::Regex;

/// One token rule: class, pattern without capture groups, and an optional
/// lexer that re-tokenizes the match.
struct Rule {
    class: &'static str,
    pattern: &'static str,
    nested: Option<&'static str>,
}

const fn rule(class: &'static str, pattern: &'static str) -> Rule {
    Rule {
        class,
        pattern,
        nested: None,
    }
}

struct Definition {
    name: &'static str,
    aliases: &'static [&'static str],
    extensions: &'static [&'static str],
    mimetypes: &'static [&'static str],
    /// Internal lexers are only reachable through `nested`
    internal: bool,
    rules: Vec<Rule>,
}

/// A compiled lexer
pub struct Lexer {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub extensions: &'static [&'static str],
    pub mimetypes: &'static [&'static str],
    internal: bool,
    regex: Option<Regex>,
    classes: Vec<&'static str>,
    nested: Vec<Option<&'static str>>,
}

impl std::fmt::Debug for Lexer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lexer").field("name", &self.name).finish()
    }
}

impl Lexer {
    fn compile(definition: Definition) -> Self {
        let regex = if definition.rules.is_empty() {
            None
        } else {
            let alternation = definition
                .rules
                .iter()
                .map(|rule| format!("({})", rule.pattern))
                .collect::<Vec<_>>()
                .join("|");
            Some(Regex::new(&alternation).expect("highlight lexer pattern"))
        };
        Lexer {
            name: definition.name,
            aliases: definition.aliases,
            extensions: definition.extensions,
            mimetypes: definition.mimetypes,
            internal: definition.internal,
            regex,
            classes: definition.rules.iter().map(|rule| rule.class).collect(),
            nested: definition.rules.iter().map(|rule| rule.nested).collect(),
        }
    }

    fn matches_name(&self, name: &str) -> bool {
        !self.internal
            && (self.name == name || self.aliases.contains(&name) || self.extensions.contains(&name))
    }

    /// Tokens of `text` as page nodes.
    pub fn tokenize(&self, text: &str) -> Vec<Node> {
        let mut out = Vec::new();
        let Some(regex) = &self.regex else {
            if !text.is_empty() {
                out.push(Node::from(text));
            }
            return out;
        };
        let mut last = 0;
        for caps in regex.captures_iter(text) {
            let Some((index, token)) = caps
                .iter()
                .enumerate()
                .skip(1)
                .find_map(|(index, group)| group.map(|group| (index - 1, group)))
            else {
                continue;
            };
            if token.as_str().is_empty() {
                continue;
            }
            if token.start() > last {
                out.push(Node::from(&text[last..token.start()]));
            }
            match self.nested[index].and_then(internal_lexer) {
                Some(inner) => out.extend(inner.tokenize(token.as_str())),
                None => out.push(
                    Element::page("span")
                        .with_page_attr(attr::CLASS, self.classes[index])
                        .with_child(token.as_str())
                        .into(),
                ),
            }
            last = token.end();
        }
        if last < text.len() {
            out.push(Node::from(&text[last..]));
        }
        out
    }
}

const C_COMMENTS: &str = r"//[^\n]*";
const BLOCK_COMMENT: &str = r"(?s:/\*.*?\*/)";
const DOUBLE_QUOTED: &str = r#""(?:[^"\\\n]|\\.)*""#;
const SINGLE_QUOTED: &str = r"'(?:[^'\\\n]|\\.)*'";
const NUMBER: &str = r"\b(?:0[xX][0-9a-fA-F_]+|0[bB][01_]+|\d[\d_]*(?:\.\d+)?(?:[eE][+-]?\d+)?)[a-zA-Z0-9]*\b";
const OPERATOR: &str = r"[-+*/%=<>!&|^~?]+";

static LEXERS: Lazy<Vec<Lexer>> = Lazy::new(|| {
    vec![
        Lexer::compile(Definition {
            name: "python",
            aliases: &["py", "python3", "py3", "sage"],
            extensions: &["py", "pyw"],
            mimetypes: &["text/x-python", "application/x-python"],
            internal: false,
            rules: vec![
                rule("c", r"#[^\n]*"),
                rule("s", r#"(?s:[rRbBuUfF]{0,2}(?:"""(?:[^\\]|\\.)*?"""|'''(?:[^\\]|\\.)*?'''))"#),
                rule("s", r#"[rRbBuUfF]{0,2}(?:"(?:[^"\\\n]|\\.)*"|'(?:[^'\\\n]|\\.)*')"#),
                rule(
                    "k",
                    r"\b(?:and|as|assert|async|await|break|class|continue|def|del|elif|else|except|finally|for|from|global|if|import|in|is|lambda|nonlocal|not|or|pass|raise|return|try|while|with|yield)\b",
                ),
                rule("kc", r"\b(?:True|False|None)\b"),
                rule(
                    "nb",
                    r"\b(?:abs|all|any|bool|dict|enumerate|float|int|isinstance|len|list|map|max|min|object|open|print|range|repr|set|sorted|str|sum|super|tuple|type|zip)\b",
                ),
                rule("nf", r"@[A-Za-z_][\w.]*"),
                rule("m", NUMBER),
                rule("o", OPERATOR),
            ],
        }),
        Lexer::compile(Definition {
            name: "rust",
            aliases: &["rs"],
            extensions: &["rs"],
            mimetypes: &["text/x-rust", "text/rust"],
            internal: false,
            rules: vec![
                rule("c", C_COMMENTS),
                rule("c", BLOCK_COMMENT),
                rule("s", r#"b?"(?:[^"\\]|\\.)*""#),
                rule("s", r"b?'(?:[^'\\\n]|\\.)'"),
                rule(
                    "k",
                    r"\b(?:as|async|await|break|const|continue|crate|dyn|else|enum|extern|fn|for|if|impl|in|let|loop|match|mod|move|mut|pub|ref|return|static|struct|super|trait|type|unsafe|use|where|while)\b",
                ),
                rule("kc", r"\b(?:true|false|self|Self)\b"),
                rule(
                    "kt",
                    r"\b(?:u8|u16|u32|u64|u128|usize|i8|i16|i32|i64|i128|isize|f32|f64|bool|char|str|String|Vec|Option|Result|Box)\b",
                ),
                rule("nf", r"\b[a-z_][A-Za-z0-9_]*!"),
                rule("m", NUMBER),
                rule("o", OPERATOR),
            ],
        }),
        Lexer::compile(Definition {
            name: "cpp",
            aliases: &["c", "c++", "cplusplus", "cxx"],
            extensions: &["c", "h", "cpp", "hpp", "cc", "cxx", "hh"],
            mimetypes: &["text/x-csrc", "text/x-chdr", "text/x-c++src", "text/x-c++hdr"],
            internal: false,
            rules: vec![
                rule("cp", r"(?m:^[ \t]*#[^\n]*)"),
                rule("c", C_COMMENTS),
                rule("c", BLOCK_COMMENT),
                rule("s", DOUBLE_QUOTED),
                rule("s", SINGLE_QUOTED),
                rule(
                    "k",
                    r"\b(?:auto|break|case|catch|class|const|constexpr|continue|default|delete|do|else|enum|explicit|extern|for|friend|goto|if|inline|namespace|new|noexcept|operator|private|protected|public|register|return|sizeof|static|struct|switch|template|this|throw|try|typedef|typename|union|using|virtual|volatile|while)\b",
                ),
                rule("kc", r"\b(?:true|false|NULL|nullptr)\b"),
                rule(
                    "kt",
                    r"\b(?:bool|char|double|float|int|long|short|signed|unsigned|void|size_t|wchar_t)\b",
                ),
                rule("m", NUMBER),
                rule("o", OPERATOR),
            ],
        }),
        Lexer::compile(Definition {
            name: "java",
            aliases: &[],
            extensions: &["java"],
            mimetypes: &["text/x-java"],
            internal: false,
            rules: vec![
                rule("c", C_COMMENTS),
                rule("c", BLOCK_COMMENT),
                rule("s", DOUBLE_QUOTED),
                rule("s", SINGLE_QUOTED),
                rule("nf", r"@[A-Za-z_][\w.]*"),
                rule(
                    "k",
                    r"\b(?:abstract|assert|break|case|catch|class|continue|default|do|else|enum|extends|final|finally|for|if|implements|import|instanceof|interface|native|new|package|private|protected|public|return|static|super|switch|synchronized|this|throw|throws|transient|try|var|volatile|while)\b",
                ),
                rule("kc", r"\b(?:true|false|null)\b"),
                rule("kt", r"\b(?:boolean|byte|char|double|float|int|long|short|void|String)\b"),
                rule("m", NUMBER),
                rule("o", OPERATOR),
            ],
        }),
        Lexer::compile(Definition {
            name: "javascript",
            aliases: &["js", "ecmascript", "typescript", "ts"],
            extensions: &["js", "mjs", "cjs", "ts"],
            mimetypes: &["application/javascript", "text/javascript", "application/x-javascript"],
            internal: false,
            rules: vec![
                rule("c", C_COMMENTS),
                rule("c", BLOCK_COMMENT),
                rule("s", DOUBLE_QUOTED),
                rule("s", SINGLE_QUOTED),
                rule("s", r"`(?:[^`\\]|\\.)*`"),
                rule(
                    "k",
                    r"\b(?:async|await|break|case|catch|class|const|continue|debugger|default|delete|do|else|export|extends|finally|for|function|if|import|in|instanceof|let|new|of|return|static|super|switch|this|throw|try|typeof|var|void|while|with|yield)\b",
                ),
                rule("kc", r"\b(?:true|false|null|undefined|NaN|Infinity)\b"),
                rule("nb", r"\b(?:Array|Boolean|Date|Error|JSON|Math|Number|Object|Promise|RegExp|String|console|document|window)\b"),
                rule("m", NUMBER),
                rule("o", OPERATOR),
            ],
        }),
        Lexer::compile(Definition {
            name: "bash",
            aliases: &["sh", "shell", "zsh", "ksh"],
            extensions: &["sh", "bash", "zsh"],
            mimetypes: &["application/x-sh", "text/x-sh", "application/x-shellscript"],
            internal: false,
            rules: vec![
                rule("c", r"(?m:(?:^|[ \t])#[^\n]*)"),
                rule("s", r#""(?:[^"\\]|\\.)*""#),
                rule("s", r"'[^']*'"),
                rule("nv", r"\$\{[^}\n]*\}|\$[A-Za-z_][A-Za-z0-9_]*|\$[0-9#?@*$!-]"),
                rule(
                    "k",
                    r"\b(?:case|do|done|elif|else|esac|export|fi|for|function|if|in|local|return|select|then|until|while)\b",
                ),
                rule(
                    "nb",
                    r"\b(?:alias|cd|echo|eval|exec|exit|printf|pwd|read|set|shift|source|test|trap|unset)\b",
                ),
                rule("o", r"&&|\|\||[|&;<>]"),
            ],
        }),
        Lexer::compile(Definition {
            name: "sql",
            aliases: &["mysql", "postgresql", "sqlite"],
            extensions: &["sql"],
            mimetypes: &["text/x-sql"],
            internal: false,
            rules: vec![
                rule("c", r"--[^\n]*"),
                rule("c", BLOCK_COMMENT),
                rule("s", r"'(?:[^']|'')*'"),
                rule("nv", r#""(?:[^"]|"")*""#),
                rule(
                    "k",
                    r"(?i:\b(?:add|all|alter|and|as|asc|begin|between|by|case|commit|create|delete|desc|distinct|drop|else|end|exists|from|group|having|in|index|inner|insert|into|is|join|key|left|like|limit|not|null|offset|on|or|order|outer|primary|references|right|rollback|select|set|table|then|union|unique|update|values|view|when|where|with)\b)",
                ),
                rule(
                    "kt",
                    r"(?i:\b(?:bigint|blob|boolean|char|date|decimal|float|integer|int|numeric|real|smallint|text|timestamp|varchar)\b)",
                ),
                rule("m", NUMBER),
                rule("o", r"[-+*/%=<>!|]+"),
            ],
        }),
        Lexer::compile(Definition {
            name: "diff",
            aliases: &["udiff", "patch"],
            extensions: &["diff", "patch"],
            mimetypes: &["text/x-diff", "text/x-patch"],
            internal: false,
            rules: vec![
                rule("gh", r"(?m:^(?:diff|index|---|\+\+\+)[^\n]*)"),
                rule("gu", r"(?m:^@@[^\n]*)"),
                rule("gi", r"(?m:^\+[^\n]*)"),
                rule("gd", r"(?m:^-[^\n]*)"),
            ],
        }),
        Lexer::compile(Definition {
            name: "json",
            aliases: &["json-object"],
            extensions: &["json"],
            mimetypes: &["application/json"],
            internal: false,
            rules: vec![
                rule("s", DOUBLE_QUOTED),
                rule("kc", r"\b(?:true|false|null)\b"),
                rule("m", r"-?\d+(?:\.\d+)?(?:[eE][+-]?\d+)?"),
                rule("p", r"[{}\[\],:]"),
            ],
        }),
        Lexer::compile(Definition {
            name: "ini",
            aliases: &["toml", "cfg", "dosini", "conf"],
            extensions: &["ini", "toml", "cfg", "conf"],
            mimetypes: &["text/x-ini", "application/toml"],
            internal: false,
            rules: vec![
                rule("c", r"(?m:^[ \t]*[#;][^\n]*)"),
                rule("k", r"(?m:^[ \t]*\[[^\]\n]*\]+)"),
                rule("na", r"(?m:^[ \t]*[A-Za-z0-9_.\-]+)"),
                rule("s", r#""(?:[^"\\\n]|\\.)*"|'[^'\n]*'"#),
                rule("kc", r"\b(?:true|false)\b"),
                rule("m", r"\b\d[\d_]*(?:\.\d+)?\b"),
                rule("o", r"="),
            ],
        }),
        Lexer::compile(Definition {
            name: "xml",
            aliases: &["html", "xhtml", "svg", "xslt"],
            extensions: &["xml", "xsl", "xslt", "svg", "xhtml"],
            mimetypes: &["text/xml", "application/xml", "image/svg+xml"],
            internal: false,
            rules: vec![
                rule("c", r"(?s:<!--.*?-->)"),
                rule("cp", r"(?s:<\?.*?\?>)|(?s:<!\[CDATA\[.*?\]\]>)|<![A-Za-z][^>]*>"),
                Rule {
                    class: "nt",
                    pattern: r"(?s:</?[A-Za-z_][\w:.\-]*(?:[^>]*?)/?>)",
                    nested: Some("xml-tag"),
                },
            ],
        }),
        Lexer::compile(Definition {
            name: "xml-tag",
            aliases: &[],
            extensions: &[],
            mimetypes: &[],
            internal: true,
            rules: vec![
                rule("nt", r"</?[A-Za-z_][\w:.\-]*|/?>"),
                rule("s", r#""[^"]*"|'[^']*'"#),
                rule("na", r"[A-Za-z_:][\w:.\-]*"),
                rule("o", r"="),
            ],
        }),
        Lexer::compile(Definition {
            name: "text",
            aliases: &["plain", "plaintext", "none", "txt"],
            extensions: &[],
            mimetypes: &[],
            internal: false,
            rules: Vec::new(),
        }),
    ]
});

fn internal_lexer(name: &str) -> Option<&'static Lexer> {
    LEXERS.iter().find(|lexer| lexer.name == name)
}

/// Lexer by name, alias or file extension (case-insensitive).
pub fn lexer_by_name(name: &str) -> Option<&'static Lexer> {
    let name = name.trim().to_lowercase();
    if name.is_empty() {
        return None;
    }
    LEXERS.iter().find(|lexer| lexer.matches_name(&name))
}

/// Lexer registered for a media type.
pub fn lexer_by_mimetype(content_type: &Type) -> Option<&'static Lexer> {
    let base = content_type.base().to_string();
    LEXERS
        .iter()
        .find(|lexer| !lexer.internal && lexer.mimetypes.contains(&base.as_str()))
}

/// The lexer that marks nothing.
pub fn plain_lexer() -> &'static Lexer {
    LEXERS
        .iter()
        .find(|lexer| lexer.name == "text")
        .unwrap_or_else(|| &LEXERS[LEXERS.len() - 1])
}

/// Public lexers, in lookup order.
pub fn lexers() -> impl Iterator<Item = &'static Lexer> {
    LEXERS.iter().filter(|lexer| !lexer.internal)
}

/// `blockcode class=highlight` holding the tokens of `text`.
pub fn highlight_block(text: &str, lexer: &Lexer) -> Element {
    Element::page("blockcode")
        .with_page_attr(attr::CLASS, "highlight")
        .with_children(lexer.tokenize(text))
}

/// Code written in `language`: highlighted when a lexer knows the name, and
/// labelled with it for writers that tag code blocks.
pub fn code_block(text: &str, language: &str) -> Element {
    let code = match lexer_by_name(language) {
        Some(lexer) => highlight_block(text, lexer),
        None => Element::page("blockcode").with_child(text),
    };
    if language.is_empty() {
        code
    } else {
        code.with_attr(QName::html(attr::CODE_LANGUAGE), language)
    }
}

/// Format implementation for highlighted source
#[derive(Debug, Clone, Default)]
pub struct HighlightFormat;

impl HighlightFormat {
    /// The `lexer` keyword, the first positional argument, the content type,
    /// in that order.
    fn lexer_for(ctx: &ParseContext<'_>) -> &'static Lexer {
        let named = ctx
            .arguments
            .get("lexer")
            .or_else(|| ctx.arguments.positional(0))
            .or_else(|| ctx.content_type.parameter("lexer"));
        if let Some(name) = named {
            match lexer_by_name(name) {
                Some(lexer) => return lexer,
                None => tracing::warn!(lexer = name, "unknown lexer, highlighting as text"),
            }
        }
        lexer_by_mimetype(&ctx.content_type).unwrap_or_else(plain_lexer)
    }
}

impl Format for HighlightFormat {
    fn name(&self) -> &str {
        "highlight"
    }

    fn description(&self) -> &str {
        "Source code with syntax highlighting"
    }

    fn file_extensions(&self) -> &[&str] {
        &[
            "py", "rs", "c", "h", "cpp", "hpp", "cc", "java", "js", "mjs", "ts", "sh", "bash", "sql",
            "diff", "patch", "json", "ini", "toml", "cfg", "xml", "svg",
        ]
    }

    fn input_types(&self) -> Vec<Type> {
        let mut types = vec![Type::moin_format("highlight")];
        for lexer in lexers() {
            for mimetype in lexer.mimetypes {
                if let Ok(content_type) = Type::parse(mimetype) {
                    types.push(content_type);
                }
            }
        }
        types
    }

    fn supports_parsing(&self) -> bool {
        true
    }

    #[tracing::instrument(level = "debug", skip_all, fields(len = source.len()))]
    fn parse(&self, source: &str, ctx: &ParseContext<'_>) -> Result<Element, ConvertError> {
        let lexer = Self::lexer_for(ctx);
        tracing::debug!(lexer = lexer.name, "highlighting");
        let mut body = Element::page("body");
        let source = source.strip_suffix('\n').unwrap_or(source);
        if !source.is_empty() {
            body.push(highlight_block(source, lexer));
        }
        Ok(Element::document(body))
    }
}
