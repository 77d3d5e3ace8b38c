//! Template renderer – card record + HTML template → card HTML.
//!
//! Placeholders are `{{...}}` spans, classified once by a single-pass scanner:
//!
//! | Placeholder            | Result                                          |
//! |------------------------|-------------------------------------------------|
//! | `{{t:KEY}}`            | translation, else CSV field `last(KEY)`, else a missing-translation marker |
//! | `{{i18n:KEY}}`         | same as `t:`                                    |
//! | `{{index}}`            | 0-based row number                              |
//! | `{{index1}}`, `{{row}}`| 1-based row number                              |
//! | `{{Column}}`           | raw CSV field                                   |
//! | anything else          | unknown-placeholder marker                      |
//!
//! Substituted text is never rescanned, so a field value containing `{{x}}`
//! is emitted literally. After substitution, relative asset references are
//! rewritten through an [`AssetResolver`].

use std::path::Path;

use crate::assets::AssetResolver;
use crate::deck::{CardRecord, ColumnNames};
use crate::i18n::LocalizationBundle;

/// CSS class of the missing-translation marker.
pub const MISSING_TRANSLATION_CLASS: &str = "cf-missing-translation";
/// CSS class of the unknown-placeholder marker.
pub const UNKNOWN_PLACEHOLDER_CLASS: &str = "cf-unknown-placeholder";

const MISSING_TRANSLATION_STYLE: &str =
    "color:#b00020;background:#ffe4e6;outline:1px dashed #b00020;font-family:monospace";
const UNKNOWN_PLACEHOLDER_STYLE: &str =
    "color:#7a4b00;background:#fff3cd;outline:1px dotted #7a4b00;font-family:monospace";

/// A `{{...}}` span after classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placeholder<'a> {
    Translate(&'a str),
    Index,
    Index1,
    Field(&'a str),
    Unknown(&'a str),
}

/// Classify the trimmed body of a `{{...}}` span for `card`.
pub fn classify<'a>(body: &'a str, card: &CardRecord) -> Placeholder<'a> {
    let body = body.trim();
    if body.is_empty() {
        return Placeholder::Unknown(body);
    }
    match body {
        "index" => return Placeholder::Index,
        "index1" | "row" => return Placeholder::Index1,
        // A real column wins over the `prefix:key` reading.
        column if card.has_column(column) => return Placeholder::Field(column),
        _ => {}
    }
    match body.split_once(':') {
        Some((prefix, key)) => {
            let key = key.trim();
            match prefix.trim() {
                "t" | "i18n" if !key.is_empty() => Placeholder::Translate(key),
                _ => Placeholder::Unknown(body),
            }
        }
        None => Placeholder::Unknown(body),
    }
}

/// Rendered HTML plus what could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RenderedHtml {
    pub html: String,
    /// Translation keys that hit neither the bundle nor a CSV field.
    pub missing_translations: Vec<String>,
    /// Bodies of placeholders that matched nothing.
    pub unknown_placeholders: Vec<String>,
}

/// Renders card templates. Holds no mutable state: the same inputs always
/// produce the same HTML.
#[derive(Clone, Copy)]
pub struct TemplateRenderer<'a> {
    columns: &'a ColumnNames,
    bundle: Option<&'a LocalizationBundle>,
    assets: Option<(&'a dyn AssetResolver, &'a Path)>,
}

impl<'a> TemplateRenderer<'a> {
    pub fn new(columns: &'a ColumnNames, bundle: Option<&'a LocalizationBundle>) -> Self {
        Self {
            columns,
            bundle,
            assets: None,
        }
    }

    /// Rewrite relative asset references through `resolver`, relative to `root`.
    pub fn with_assets(mut self, resolver: &'a dyn AssetResolver, root: &'a Path) -> Self {
        self.assets = Some((resolver, root));
        self
    }

    pub fn render(&self, template: &str, card: &CardRecord, index: usize) -> String {
        self.render_detailed(template, card, index).html
    }

    pub fn render_detailed(&self, template: &str, card: &CardRecord, index: usize) -> RenderedHtml {
        let mut out = RenderedHtml {
            html: String::with_capacity(template.len()),
            ..RenderedHtml::default()
        };
        let mut rest = template;

        while let Some(open) = rest.find("{{") {
            out.html.push_str(&rest[..open]);
            let after = &rest[open + 2..];
            let Some(close) = after.find("}}") else {
                // Unterminated: keep the remainder verbatim.
                out.html.push_str(&rest[open..]);
                rest = "";
                break;
            };
            let body = &after[..close];
            if let Some(inner) = body.rfind("{{") {
                // A span never crosses into the next `{{`; emit the prefix literally.
                out.html.push_str(&rest[open..open + 2 + inner]);
                rest = &after[inner..];
                continue;
            }
            self.substitute(body, card, index, &mut out);
            rest = &after[close + 2..];
        }
        out.html.push_str(rest);

        if let Some((resolver, root)) = self.assets {
            out.html = rewrite_assets(&out.html, root, resolver);
        }
        out
    }

    fn substitute(&self, body: &str, card: &CardRecord, index: usize, out: &mut RenderedHtml) {
        match classify(body, card) {
            Placeholder::Translate(key) => match self.translate(key, card) {
                Some(text) => out.html.push_str(text),
                None => {
                    push_marker(
                        &mut out.html,
                        MISSING_TRANSLATION_CLASS,
                        MISSING_TRANSLATION_STYLE,
                        "Missing translation",
                        key,
                    );
                    out.missing_translations.push(key.to_string());
                }
            },
            Placeholder::Index => out.html.push_str(&index.to_string()),
            Placeholder::Index1 => out.html.push_str(&(index + 1).to_string()),
            Placeholder::Field(column) => out.html.push_str(card.get(column).unwrap_or("")),
            Placeholder::Unknown(raw) => {
                push_marker(
                    &mut out.html,
                    UNKNOWN_PLACEHOLDER_CLASS,
                    UNKNOWN_PLACEHOLDER_STYLE,
                    "Unknown placeholder",
                    &format!("{{{{{raw}}}}}"),
                );
                out.unknown_placeholders.push(raw.to_string());
            }
        }
    }

    /// Bundle lookup, then the CSV field named by the key's last segment.
    fn translate<'c>(&'c self, key: &str, card: &'c CardRecord) -> Option<&'c str> {
        if let Some(bundle) = self.bundle {
            if let Some(text) = bundle.resolve(key, card.id(self.columns)) {
                return Some(text);
            }
        }
        let field = key.rsplit('.').next().unwrap_or(key);
        card.get(field)
    }
}

/// Render one card with no asset rewriting.
pub fn render(
    template: &str,
    card: &CardRecord,
    index: usize,
    bundle: Option<&LocalizationBundle>,
    columns: &ColumnNames,
) -> String {
    TemplateRenderer::new(columns, bundle).render(template, card, index)
}

fn push_marker(out: &mut String, class: &str, style: &str, title: &str, text: &str) {
    out.push_str("<span class=\"");
    out.push_str(class);
    out.push_str("\" style=\"");
    out.push_str(style);
    out.push_str("\" title=\"");
    out.push_str(title);
    out.push_str("\">");
    out.push_str(&escape_html(text));
    out.push_str("</span>");
}

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Asset rewriting
// ---------------------------------------------------------------------------

/// Rewrite relative `src=`, `href=` and CSS `url(...)` references.
///
/// Absolute paths, protocol-relative URLs, fragments and scheme-prefixed
/// values (`http:`, `data:`, ...) are skipped; references the resolver cannot
/// map are left untouched.
pub fn rewrite_assets(html: &str, root: &Path, resolver: &dyn AssetResolver) -> String {
    let bytes = html.as_bytes();
    let mut out = String::with_capacity(html.len());
    let mut copied = 0;
    let mut i = 0;

    while i < bytes.len() {
        let Some((start, end)) = reference_at(bytes, i) else {
            i += 1;
            continue;
        };
        let value = &html[start..end];
        if is_relative_reference(value) {
            match resolver.resolve(root, value) {
                Some(url) => {
                    out.push_str(&html[copied..start]);
                    out.push_str(&url);
                    copied = end;
                }
                None => log::debug!("Asset reference '{value}' left unresolved"),
            }
        }
        i = end.max(i + 1);
    }
    out.push_str(&html[copied..]);
    out
}

/// If an asset reference starts at byte `i`, return the byte range of its value.
fn reference_at(b: &[u8], i: usize) -> Option<(usize, usize)> {
    if starts_with_ci(b, i, b"url(") {
        let mut j = skip_ws(b, i + 4);
        let quote = match b.get(j) {
            Some(&q) if q == b'"' || q == b'\'' => {
                j += 1;
                Some(q)
            }
            _ => None,
        };
        let end = match quote {
            Some(q) => find_byte(b, j, |c| c == q)?,
            None => find_byte(b, j, |c| c == b')')?,
        };
        return Some(trim_range(b, j, end));
    }

    if i == 0 || !b[i - 1].is_ascii_whitespace() {
        return None;
    }
    let name_len = if starts_with_ci(b, i, b"src") {
        3
    } else if starts_with_ci(b, i, b"href") {
        4
    } else {
        return None;
    };
    let j = skip_ws(b, i + name_len);
    if b.get(j) != Some(&b'=') {
        return None;
    }
    let j = skip_ws(b, j + 1);
    match b.get(j) {
        Some(&q) if q == b'"' || q == b'\'' => {
            let end = find_byte(b, j + 1, |c| c == q)?;
            Some(trim_range(b, j + 1, end))
        }
        Some(_) => {
            let end = find_byte(b, j, |c| c.is_ascii_whitespace() || c == b'>').unwrap_or(b.len());
            Some((j, end))
        }
        None => None,
    }
}

fn is_relative_reference(value: &str) -> bool {
    let Some(first) = value.chars().next() else {
        return false;
    };
    if matches!(first, '/' | '\\' | '#' | '<' | '{') {
        return false;
    }
    // scheme = ALPHA *( ALPHA / DIGIT / "+" / "-" / "." ) ":"
    if first.is_ascii_alphabetic() {
        if let Some(colon) = value.find(':') {
            let scheme = &value[..colon];
            if scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
            {
                return false;
            }
        }
    }
    true
}

fn starts_with_ci(b: &[u8], i: usize, needle: &[u8]) -> bool {
    b.len() >= i + needle.len() && b[i..i + needle.len()].eq_ignore_ascii_case(needle)
}

fn skip_ws(b: &[u8], mut i: usize) -> usize {
    while i < b.len() && b[i].is_ascii_whitespace() {
        i += 1;
    }
    i
}

fn find_byte(b: &[u8], from: usize, pred: impl Fn(u8) -> bool) -> Option<usize> {
    b.get(from..)?.iter().position(|&c| pred(c)).map(|p| from + p)
}

fn trim_range(b: &[u8], mut start: usize, mut end: usize) -> (usize, usize) {
    while start < end && b[start].is_ascii_whitespace() {
        start += 1;
    }
    while end > start && b[end - 1].is_ascii_whitespace() {
        end -= 1;
    }
    (start, end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::path::PathBuf;

    fn card() -> CardRecord {
        CardRecord::from_pairs([
            ("id", "fire"),
            ("Name", "Fireball"),
            ("Cost", "3"),
            ("Flavor", ""),
        ])
    }

    fn columns() -> ColumnNames {
        ColumnNames::default()
    }

    fn bundle() -> LocalizationBundle {
        LocalizationBundle::new(
            "de",
            vec![],
            json!({
                "common": { "cost": "Kosten" },
                "cards": { "fire": { "Name": "Feuerball" } }
            }),
        )
    }

    struct PrefixResolver;

    impl AssetResolver for PrefixResolver {
        fn resolve(&self, root: &Path, relative: &str) -> Option<String> {
            if relative.contains("missing") {
                return None;
            }
            Some(format!("asset://{}/{relative}", root.display()))
        }
    }

    #[test]
    fn substitutes_columns_and_meta() {
        let html = render(
            "<p>{{index}}/{{index1}}/{{row}} {{Name}} costs {{ Cost }}{{Flavor}}</p>",
            &card(),
            4,
            None,
            &columns(),
        );
        assert_eq!(html, "<p>4/5/5 Fireball costs 3</p>");
    }

    #[test]
    fn translations_use_bundle_then_field() {
        let b = bundle();
        let html = render(
            "{{t:card.Name}}|{{ i18n:common.cost }}|{{t:card.Cost}}",
            &card(),
            0,
            Some(&b),
            &columns(),
        );
        assert_eq!(html, "Feuerball|Kosten|3");
    }

    #[test]
    fn translation_without_bundle_falls_back_to_field() {
        let html = render("{{t:card.Name}}", &card(), 0, None, &columns());
        assert_eq!(html, "Fireball");
    }

    #[test]
    fn missing_translation_is_marked() {
        let cols = columns();
        let renderer = TemplateRenderer::new(&cols, None);
        let out = renderer.render_detailed("<b>{{t:unknown.key}}</b>", &card(), 0);
        assert!(out.html.contains(MISSING_TRANSLATION_CLASS));
        assert!(out.html.contains(">unknown.key</span>"));
        assert!(!out.html.contains(UNKNOWN_PLACEHOLDER_CLASS));
        assert_eq!(out.missing_translations, vec!["unknown.key".to_string()]);
    }

    #[test]
    fn unknown_placeholder_is_marked_differently() {
        let cols = columns();
        let renderer = TemplateRenderer::new(&cols, None);
        let out = renderer.render_detailed("{{NotAColumn}} {{x:y}} {{ }}", &card(), 0);
        assert!(out.html.contains(UNKNOWN_PLACEHOLDER_CLASS));
        assert!(out.html.contains("{{NotAColumn}}"));
        assert!(!out.html.contains(MISSING_TRANSLATION_CLASS));
        assert_eq!(out.unknown_placeholders, vec!["NotAColumn", "x:y", ""]);
    }

    #[test]
    fn spans_do_not_cross_boundaries() {
        let html = render("{{Name}} and {{ broken {{Cost}}", &card(), 0, None, &columns());
        assert_eq!(html, "Fireball and {{ broken 3");
        let html = render("tail {{Name", &card(), 0, None, &columns());
        assert_eq!(html, "tail {{Name");
    }

    #[test]
    fn substituted_values_are_not_rescanned() {
        let sneaky = CardRecord::from_pairs([("Name", "{{Cost}}"), ("Cost", "3")]);
        let html = render("{{Name}}", &sneaky, 0, None, &columns());
        assert_eq!(html, "{{Cost}}");
    }

    #[test]
    fn marker_text_is_escaped() {
        let html = render("{{<b>}}", &card(), 0, None, &columns());
        assert!(html.contains("{{&lt;b&gt;}}"));
    }

    #[test]
    fn rewrites_relative_assets_only() {
        let root = PathBuf::from("/deck");
        let cols = columns();
        let renderer = TemplateRenderer::new(&cols, None).with_assets(&PrefixResolver, &root);
        let template = concat!(
            r#"<img src="art/{{id}}.png">"#,
            r#"<img src='/abs.png'><img src="//cdn/x.png"><img src="https://x/y.png">"#,
            r##"<img src="data:image/png;base64,AA"><a href="#top">"##,
            r#"<link href=style.css><div style="background: url( 'bg/paper.jpg' )">"#,
            r#"<img src="missing.png"><img data-src="lazy.png"><img srcset="a.png 2x">"#,
        );
        let html = renderer.render(template, &card(), 0);
        assert!(html.contains(r#"src="asset:///deck/art/fire.png""#));
        assert!(html.contains("src='/abs.png'"));
        assert!(html.contains(r#"src="//cdn/x.png""#));
        assert!(html.contains(r#"src="https://x/y.png""#));
        assert!(html.contains(r#"src="data:image/png;base64,AA""#));
        assert!(html.contains(r##"href="#top""##));
        assert!(html.contains("href=asset:///deck/style.css>"));
        assert!(html.contains("url( 'asset:///deck/bg/paper.jpg' )"));
        assert!(html.contains(r#"src="missing.png""#));
        assert!(html.contains(r#"data-src="lazy.png""#));
        assert!(html.contains(r#"srcset="a.png 2x""#));
    }

    #[test]
    fn classification() {
        let c = card();
        assert_eq!(classify(" t : a.b ", &c), Placeholder::Translate("a.b"));
        assert_eq!(classify("i18n:x", &c), Placeholder::Translate("x"));
        assert_eq!(classify("t:", &c), Placeholder::Unknown("t:"));
        assert_eq!(classify("index", &c), Placeholder::Index);
        assert_eq!(classify("row", &c), Placeholder::Index1);
        assert_eq!(classify("Name", &c), Placeholder::Field("Name"));
        assert_eq!(classify("name", &c), Placeholder::Unknown("name"));
    }

    #[test]
    fn columns_with_colons_are_fields() {
        let card = CardRecord::from_pairs([("id", "wolf"), ("HP:Max", "12"), ("t:x", "raw")]);
        assert_eq!(classify("HP:Max", &card), Placeholder::Field("HP:Max"));
        assert_eq!(classify(" t:x ", &card), Placeholder::Field("t:x"));
        let html = render("<b>{{HP:Max}}</b> {{HP:Min}}", &card, 0, None, &columns());
        assert!(html.starts_with("<b>12</b> "), "{html}");
        assert!(html.contains(UNKNOWN_PLACEHOLDER_CLASS));
    }
}
