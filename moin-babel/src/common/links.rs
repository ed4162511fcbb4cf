//! Link targets
//!
//! Every dialect turns a written link target into one of three things:
//!
//! - an absolute URL whose scheme the host allows (`https://…`, `mailto:…`),
//! - an interwiki reference `Site:Item` to a site the host knows, written as
//!   `wiki://Site/Item`,
//! - anything else: a local item, written with the reserved `wiki.local` scheme
//!   and resolved by the host (`wiki.local:Sub/Item?action=x#frag`).
//!
//! Targets are written as IRIs: characters outside the unreserved set are
//! percent-encoded as UTF-8, non-ASCII letters are kept, and existing `%XX`
//! escapes are left alone.

use crate::format::HostConfig;
use percent_encoding::percent_decode_str;
use url::form_urlencoded;

/// Schemes accepted as external URLs unless the host configures its own list.
pub const DEFAULT_URI_SCHEMES: &[&str] = &[
    "apt", "ed2k", "file", "ftp", "gopher", "http", "https", "irc", "ircs", "mailto", "mumble",
    "news", "nntp", "notes", "rootz", "rtcp", "rtp", "rtsp", "ssh", "telnet", "webcal", "xmpp",
];

/// Prefix that old wikis used for attached files; now a sub-item.
pub const ATTACHMENT_PREFIX: &str = "attachment:";

/// Result of classifying a link target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkTarget {
    Url(String),
    Interwiki { site: String, item: String },
    Local(LocalTarget),
}

/// A `wiki.local` target split into its parts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalTarget {
    pub path: String,
    pub query: Option<String>,
    pub fragment: Option<String>,
}

impl LocalTarget {
    /// Split `item?query#fragment`, mapping `attachment:` to a sub-item.
    pub fn parse(item: &str) -> Self {
        let item = map_attachment(item);
        let (rest, fragment) = match item.rsplit_once('#') {
            Some((rest, fragment)) => (rest.to_string(), Some(fragment.to_string())),
            None => (item.clone(), None),
        };
        let (path, query) = match rest.rsplit_once('?') {
            Some((path, query)) => (path.to_string(), Some(query.to_string())),
            None => (rest, None),
        };
        LocalTarget {
            path,
            query,
            fragment,
        }
    }

    /// Append `&`-joined query terms after any query already present.
    pub fn add_query_terms(&mut self, terms: &[String]) {
        if terms.is_empty() && self.query.is_none() {
            return;
        }
        let mut parts: Vec<String> = Vec::new();
        if let Some(existing) = self.query.take() {
            parts.push(existing);
        }
        parts.extend(terms.iter().cloned());
        self.query = Some(format!("&{}", parts.join("&")));
    }

    pub fn to_iri(&self) -> String {
        wiki_local(&self.path, self.query.as_deref(), self.fragment.as_deref())
    }
}

/// `attachment:name` becomes the sub-item `/name`.
pub fn map_attachment(item: &str) -> String {
    match item.strip_prefix(ATTACHMENT_PREFIX) {
        Some(rest) => format!("/{rest}"),
        None => item.to_string(),
    }
}

impl LinkTarget {
    /// Classify a target written as `scheme:rest`, `Site:Item` or `Item`.
    pub fn classify(target: &str, host: &HostConfig, dialect: &str) -> Self {
        if let Some(scheme) = scheme_of(target) {
            if host.allows_scheme(dialect, scheme) {
                return LinkTarget::Url(target.to_string());
            }
            if let Some((site, item)) = split_interwiki(target) {
                if host.is_known_wiki(site) {
                    return LinkTarget::Interwiki {
                        site: site.to_string(),
                        item: item.to_string(),
                    };
                }
            }
        }
        LinkTarget::Local(LocalTarget::parse(target))
    }

    /// The `xlink:href` value.
    pub fn to_iri(&self) -> String {
        match self {
            LinkTarget::Url(url) => quote_iri(url),
            LinkTarget::Interwiki { site, item } => interwiki(site, item),
            LinkTarget::Local(local) => local.to_iri(),
        }
    }
}

/// The scheme of `target` when it starts with one (`[A-Za-z][A-Za-z0-9+.-]*:`).
pub fn scheme_of(target: &str) -> Option<&str> {
    let (scheme, _) = target.split_once(':')?;
    let mut chars = scheme.chars();
    let first = chars.next()?;
    if !first.is_ascii_alphabetic() {
        return None;
    }
    if chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '.' | '-')) {
        Some(scheme)
    } else {
        None
    }
}

/// `Site:Item` where the site is `[A-Za-z][A-Za-z0-9]+`.
pub fn split_interwiki(target: &str) -> Option<(&str, &str)> {
    let (site, item) = target.split_once(':')?;
    let mut chars = site.chars();
    let first = chars.next()?;
    if !first.is_ascii_alphabetic() || site.len() < 2 || item.is_empty() {
        return None;
    }
    if chars.all(|c| c.is_ascii_alphanumeric()) {
        Some((site, item))
    } else {
        None
    }
}

/// True when `uri` has no scheme or one the host allows.
pub fn allowed_uri_scheme(uri: &str, host: &HostConfig, dialect: &str) -> bool {
    match url::Url::parse(uri) {
        Ok(parsed) => host.allows_scheme(dialect, parsed.scheme()),
        Err(_) => match scheme_of(uri) {
            Some(scheme) => host.allows_scheme(dialect, scheme),
            None => true,
        },
    }
}

fn is_iri_safe(c: char) -> bool {
    c.is_ascii_alphanumeric()
        || matches!(c, '-' | '!' | '$' | '&' | '\'' | '*' | '+' | '.' | '=' | '_' | '|')
        || ('\u{00A0}'..='\u{D7FF}').contains(&c)
        || ('\u{F900}'..='\u{FDCF}').contains(&c)
        || ('\u{FDF0}'..='\u{FFEF}').contains(&c)
}

/// Percent-encode everything outside the IRI safe set and `keep`.
pub fn quote(input: &str, keep: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let bytes = input.as_bytes();
    let mut index = 0;
    for (pos, c) in input.char_indices() {
        if pos < index {
            continue;
        }
        if c == '%'
            && bytes.len() >= pos + 3
            && bytes[pos + 1].is_ascii_hexdigit()
            && bytes[pos + 2].is_ascii_hexdigit()
        {
            out.push_str(&input[pos..pos + 3]);
            index = pos + 3;
            continue;
        }
        if is_iri_safe(c) || keep.contains(c) {
            out.push(c);
        } else {
            let mut buf = [0u8; 4];
            for b in c.encode_utf8(&mut buf).bytes() {
                out.push_str(&format!("%{b:02X}"));
            }
        }
        index = pos + c.len_utf8();
    }
    out
}

pub fn quote_path(path: &str) -> String {
    quote(&remove_dots(path), "@:/")
}

pub fn quote_query(query: &str) -> String {
    quote(query, "@:/?")
}

pub fn quote_fragment(fragment: &str) -> String {
    quote(fragment, "@:/?")
}

/// Resolve `.` and `..` segments of an absolute path.
fn remove_dots(path: &str) -> String {
    if !path.starts_with('/') || !path.split('/').any(|s| s == "." || s == "..") {
        return path.to_string();
    }
    let mut output: Vec<&str> = Vec::new();
    for segment in path[1..].split('/') {
        match segment {
            "." => {}
            ".." => {
                output.pop();
            }
            other => output.push(other),
        }
    }
    format!("/{}", output.join("/"))
}

/// `wiki.local:path?query#fragment`. An empty query still writes the `?`.
pub fn wiki_local(path: &str, query: Option<&str>, fragment: Option<&str>) -> String {
    let mut iri = format!("wiki.local:{}", quote_path(path));
    if let Some(query) = query {
        iri.push('?');
        iri.push_str(&quote_query(query));
    }
    if let Some(fragment) = fragment {
        iri.push('#');
        iri.push_str(&quote_fragment(fragment));
    }
    iri
}

/// `wiki://Site/Item`
pub fn interwiki(site: &str, item: &str) -> String {
    format!("wiki://{}/{}", quote(site, ""), quote_path(item))
}

/// Requote an absolute IRI component by component.
pub fn quote_iri(iri: &str) -> String {
    let (before_fragment, fragment) = match iri.split_once('#') {
        Some((head, fragment)) => (head, Some(fragment)),
        None => (iri, None),
    };
    let (before_query, query) = match before_fragment.split_once('?') {
        Some((head, query)) => (head, Some(query)),
        None => (before_fragment, None),
    };
    let mut out = quote(before_query, "@:/[];,~");
    if let Some(query) = query {
        out.push('?');
        out.push_str(&quote_query(query));
    }
    if let Some(fragment) = fragment {
        out.push('#');
        out.push_str(&quote_fragment(fragment));
    }
    out
}

/// Anchor id for a heading with this text: a valid HTML id, starting with a letter.
pub fn anchor_name(text: &str) -> String {
    let underscored = text.trim().replace(' ', "_");
    let id = quote(&underscored, ":").replace('%', ".");
    if id.starts_with(|c: char| c.is_alphabetic()) {
        id
    } else {
        format!("A{id}")
    }
}

/// Undo `%XX` escapes, for writing a target back as markup.
pub fn unquote(input: &str) -> String {
    percent_decode_str(input).decode_utf8_lossy().into_owned()
}

/// `application/x-www-form-urlencoded` rendering of key/value pairs.
pub fn urlencode<'a, I>(pairs: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in pairs {
        serializer.append_pair(key, value);
    }
    serializer.finish()
}
