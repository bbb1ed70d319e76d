//! Style pipeline stages
//!
//! Each stage is a pure transform over strings. The renderer drives them on
//! the blocking pool since Sass compilation and HTML parsing are CPU bound.

use std::borrow::Cow;
use std::path::Path;

use css_inline::{CSSInliner, Url};
use lightningcss::declaration::DeclarationBlock;
use lightningcss::properties::Property;
use lightningcss::rules::{CssRule, CssRuleList};
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::targets::{Browsers, Targets};
use lightningcss::traits::ToCss;

use super::types::{TemplateError, TemplateResult};

const VENDOR_PREFIXES: [&str; 4] = ["-webkit-", "-moz-", "-ms-", "-o-"];

/// Compile Sass source to CSS.
///
/// Empty source means "no custom styles" and yields `None` without invoking
/// the compiler. `load_path` resolves `@import`/`@use` relative to the
/// template directory.
pub fn sass_to_css(source: &str, load_path: &Path) -> TemplateResult<Option<String>> {
    if source.is_empty() {
        return Ok(None);
    }

    let options = grass::Options::default().load_path(load_path);
    let css = grass::from_string(source.to_owned(), &options)
        .map_err(|e| TemplateError::Sass(e.to_string()))?;

    if css.trim().is_empty() {
        Ok(None)
    } else {
        Ok(Some(css))
    }
}

/// Add vendor-prefixed declarations for the browsers matched by `browsers`
/// (a browserslist query such as `last 2 versions`).
///
/// Only adds: every source declaration is kept, including prefixed ones the
/// targets no longer need. Missing prefixed variants are inserted in front
/// of the declaration they derive from.
pub fn autoprefix_css(css: &str, browsers: &str) -> TemplateResult<String> {
    let browsers = Browsers::from_browserslist([browsers]).map_err(prefix_error)?;
    let targets = Targets {
        browsers,
        ..Targets::default()
    };

    let blocks = {
        let stylesheet = parse_stylesheet(css)?;
        let mut blocks = Vec::new();
        collect_insertions(&stylesheet.rules, &targets, &mut blocks)?;
        blocks
    };

    let mut additions = Vec::with_capacity(blocks.len());
    for block in &blocks {
        let mut parsed = Vec::with_capacity(block.len());
        for insertion in block {
            let properties = parse_declarations(&insertion.source, insertion.important)?;
            parsed.push((insertion.index, insertion.important, properties));
        }
        additions.push(parsed);
    }

    let mut stylesheet = parse_stylesheet(css)?;
    splice_insertions(&mut stylesheet.rules, &mut additions.into_iter());

    let output = stylesheet
        .to_css(PrinterOptions::default())
        .map_err(prefix_error)?;
    Ok(output.code)
}

/// Prefixed declarations to add in front of one source declaration
struct Insertion {
    index: usize,
    important: bool,
    /// `.x{...}` wrapper around the declarations
    source: String,
}

type BlockAdditions<'i> = Vec<(usize, bool, Vec<Property<'i>>)>;

fn prefix_error(e: impl std::fmt::Display) -> TemplateError {
    TemplateError::Prefix(e.to_string())
}

fn parse_stylesheet(css: &str) -> TemplateResult<StyleSheet<'_>> {
    StyleSheet::parse(css, ParserOptions::default()).map_err(prefix_error)
}

fn declaration_text(property: &Property, important: bool) -> TemplateResult<String> {
    property
        .to_css_string(important, PrinterOptions::default())
        .map_err(prefix_error)
}

/// One entry per style rule, in document order
fn collect_insertions(
    rules: &CssRuleList,
    targets: &Targets,
    blocks: &mut Vec<Vec<Insertion>>,
) -> TemplateResult<()> {
    for rule in &rules.0 {
        match rule {
            CssRule::Style(style) => {
                blocks.push(block_insertions(&style.declarations, targets)?);
                collect_insertions(&style.rules, targets, blocks)?;
            }
            CssRule::Media(media) => collect_insertions(&media.rules, targets, blocks)?,
            CssRule::Supports(supports) => collect_insertions(&supports.rules, targets, blocks)?,
            _ => {}
        }
    }
    Ok(())
}

fn block_insertions(block: &DeclarationBlock, targets: &Targets) -> TemplateResult<Vec<Insertion>> {
    let mut insertions = Vec::new();

    for (important, declarations) in [
        (false, &block.declarations),
        (true, &block.important_declarations),
    ] {
        let existing = declarations
            .iter()
            .map(|property| declaration_text(property, important))
            .collect::<TemplateResult<Vec<_>>>()?;

        for (index, text) in existing.iter().enumerate() {
            let missing: Vec<String> = prefixed_variants(text, targets)?
                .into_iter()
                .filter(|variant| !is_present(variant, &existing))
                .collect();

            if !missing.is_empty() {
                insertions.push(Insertion {
                    index,
                    important,
                    source: format!(".x{{{}}}", missing.join(";")),
                });
            }
        }
    }

    Ok(insertions)
}

/// Vendor-prefixed forms lightningcss emits for a single declaration
fn prefixed_variants(declaration: &str, targets: &Targets) -> TemplateResult<Vec<String>> {
    let source = format!(".x{{{}}}", declaration);
    let mut stylesheet = parse_stylesheet(&source)?;
    stylesheet
        .minify(MinifyOptions {
            targets: targets.clone(),
            ..MinifyOptions::default()
        })
        .map_err(prefix_error)?;

    let mut variants = Vec::new();
    for rule in &stylesheet.rules.0 {
        if let CssRule::Style(style) = rule {
            for (important, declarations) in [
                (false, &style.declarations.declarations),
                (true, &style.declarations.important_declarations),
            ] {
                for property in declarations {
                    let text = declaration_text(property, important)?;
                    if is_vendor_prefixed(&text) {
                        variants.push(text);
                    }
                }
            }
        }
    }
    Ok(variants)
}

fn is_vendor_prefixed(declaration: &str) -> bool {
    declaration
        .split(|c: char| c.is_whitespace() || matches!(c, ':' | '(' | ','))
        .any(|token| VENDOR_PREFIXES.iter().any(|prefix| token.starts_with(prefix)))
}

fn property_name(declaration: &str) -> &str {
    declaration.split(':').next().unwrap_or("").trim()
}

/// A prefixed property counts as present whatever its value
fn is_present(variant: &str, existing: &[String]) -> bool {
    let name = property_name(variant);
    existing
        .iter()
        .any(|e| e == variant || (name.starts_with('-') && property_name(e) == name))
}

fn parse_declarations(source: &str, important: bool) -> TemplateResult<Vec<Property<'_>>> {
    let stylesheet = parse_stylesheet(source)?;
    let mut properties = Vec::new();
    for rule in stylesheet.rules.0 {
        if let CssRule::Style(style) = rule {
            let block = style.declarations;
            if important {
                properties.extend(block.important_declarations);
            } else {
                properties.extend(block.declarations);
            }
        }
    }
    Ok(properties)
}

/// Walks rules in the same order as `collect_insertions`
fn splice_insertions<'i>(
    rules: &mut CssRuleList<'i>,
    additions: &mut std::vec::IntoIter<BlockAdditions<'i>>,
) {
    for rule in rules.0.iter_mut() {
        match rule {
            CssRule::Style(style) => {
                if let Some(block) = additions.next() {
                    // Back to front so earlier indexes stay valid
                    for (index, important, properties) in block.into_iter().rev() {
                        let declarations = if important {
                            &mut style.declarations.important_declarations
                        } else {
                            &mut style.declarations.declarations
                        };
                        let tail = declarations.split_off(index);
                        declarations.extend(properties);
                        declarations.extend(tail);
                    }
                }
                splice_insertions(&mut style.rules, additions);
            }
            CssRule::Media(media) => splice_insertions(&mut media.rules, additions),
            CssRule::Supports(supports) => splice_insertions(&mut supports.rules, additions),
            _ => {}
        }
    }
}

/// Move `css` rule declarations into the `style` attribute of each element
/// they match. Rules that cannot be inlined (at-rules such as `@media`, and
/// selectors with pseudo-classes) are kept in a `<style>` block in the
/// document head. Relative references resolve against `template_dir`.
pub fn inline_css(html: &str, css: &str, template_dir: &Path) -> TemplateResult<String> {
    let (inlinable, retained) = split_inlinable(css)?;

    let base_url = std::path::absolute(template_dir)
        .ok()
        .and_then(|dir| Url::from_directory_path(dir).ok());

    let inliner = CSSInliner::options()
        .extra_css(Some(Cow::Owned(inlinable)))
        .base_url(base_url)
        .load_remote_stylesheets(false)
        .build();

    let inlined = inliner
        .inline(html)
        .map_err(|e| TemplateError::Inline(e.to_string()))?;

    if retained.is_empty() {
        Ok(inlined)
    } else {
        Ok(insert_style_block(inlined, &retained))
    }
}

/// Split CSS into plain style rules and everything an inliner cannot apply
fn split_inlinable(css: &str) -> TemplateResult<(String, String)> {
    let stylesheet = StyleSheet::parse(css, ParserOptions::default())
        .map_err(|e| TemplateError::Inline(e.to_string()))?;

    let mut inlinable = Vec::new();
    let mut retained = Vec::new();
    for rule in &stylesheet.rules.0 {
        let text = rule
            .to_css_string(PrinterOptions::default())
            .map_err(|e| TemplateError::Inline(e.to_string()))?;

        match rule {
            CssRule::Style(_) if !has_pseudo_selector(&text) => inlinable.push(text),
            CssRule::Ignored => {}
            _ => retained.push(text),
        }
    }

    Ok((inlinable.join("\n"), retained.join("\n")))
}

/// Whether the selector part of a serialized style rule uses `:`
/// outside an attribute selector
fn has_pseudo_selector(rule: &str) -> bool {
    let selector = rule.split('{').next().unwrap_or("");
    let mut depth = 0usize;
    for c in selector.chars() {
        match c {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            ':' if depth == 0 => return true,
            _ => {}
        }
    }
    false
}

/// Put `<style>css</style>` at the end of `<head>`, or at the very start
/// when the document has no head.
fn insert_style_block(html: String, css: &str) -> String {
    let block = format!("<style>{}</style>", css);
    let lower = html.to_ascii_lowercase();
    let position = lower
        .find("</head>")
        .or_else(|| lower.find("<body"))
        .unwrap_or(0);

    let mut output = String::with_capacity(html.len() + block.len());
    output.push_str(&html[..position]);
    output.push_str(&block);
    output.push_str(&html[position..]);
    output
}

/// Minify HTML: collapse whitespace, minify `<style>` contents, strip
/// comments. Closing tags and the document shell are kept for mail clients,
/// and attribute values are always quoted: minify-html drops quotes where
/// the HTML spec allows, which some mail clients mishandle.
pub fn minify_html(html: &str) -> TemplateResult<String> {
    let mut cfg = minify_html::Cfg::new();
    cfg.minify_css = true;
    cfg.keep_comments = false;
    cfg.keep_closing_tags = true;
    cfg.keep_html_and_head_opening_tags = true;
    cfg.do_not_minify_doctype = true;
    cfg.ensure_spec_compliant_unquoted_attribute_values = true;

    let minified = minify_html::minify(html.as_bytes(), &cfg);
    let minified = String::from_utf8(minified).map_err(|e| TemplateError::Minify(e.to_string()))?;
    Ok(quote_attribute_values(&minified))
}

/// Wrap every unquoted attribute value in double quotes. Text inside
/// `<style>` and `<script>` is copied unchanged.
fn quote_attribute_values(html: &str) -> String {
    let mut output = String::with_capacity(html.len() + html.len() / 8);
    let mut rest = html;

    while let Some(start) = rest.find('<') {
        output.push_str(&rest[..start]);
        rest = &rest[start..];

        let name: String = rest[1..]
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        if name.is_empty() {
            output.push('<');
            rest = &rest[1..];
            continue;
        }

        let (tag, after) = quote_tag(rest);
        output.push_str(&tag);
        rest = after;

        if name == "style" || name == "script" {
            let close = format!("</{}", name);
            let end = rest.to_ascii_lowercase().find(&close).unwrap_or(rest.len());
            output.push_str(&rest[..end]);
            rest = &rest[end..];
        }
    }

    output.push_str(rest);
    output
}

/// Quote the attributes of the tag at the start of `tag`; returns the
/// rewritten tag and the input after its closing `>`.
fn quote_tag(tag: &str) -> (String, &str) {
    let mut output = String::with_capacity(tag.len().min(256));
    let mut chars = tag.char_indices().peekable();
    let mut quote: Option<char> = None;

    while let Some((i, c)) = chars.next() {
        output.push(c);
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None => match c {
                '"' | '\'' => quote = Some(c),
                '>' => return (output, &tag[i + 1..]),
                '=' => {
                    let unquoted = chars
                        .peek()
                        .is_some_and(|&(_, next)| !matches!(next, '"' | '\'' | '>') && !next.is_whitespace());
                    if unquoted {
                        output.push('"');
                        while let Some(&(_, v)) = chars.peek() {
                            if v.is_whitespace() || v == '>' {
                                break;
                            }
                            if v == '"' {
                                output.push_str("&quot;");
                            } else {
                                output.push(v);
                            }
                            chars.next();
                        }
                        output.push('"');
                    }
                }
                _ => {}
            },
        }
    }

    (output, "")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn squash(s: &str) -> String {
        s.chars().filter(|c| !c.is_whitespace()).collect()
    }

    #[test]
    fn test_empty_sass_skips_compilation() {
        let css = sass_to_css("", Path::new(".")).unwrap();
        assert!(css.is_none());
    }

    #[test]
    fn test_sass_nesting_and_variables() {
        let source = "$accent: red;\n.card { h1 { color: $accent; } }";
        let css = sass_to_css(source, Path::new(".")).unwrap().unwrap();
        assert!(squash(&css).contains(".cardh1{color:red;}"));
    }

    #[test]
    fn test_sass_without_rules_yields_no_css() {
        let css = sass_to_css("$unused: 1px;", Path::new(".")).unwrap();
        assert!(css.is_none());
    }

    #[test]
    fn test_invalid_sass_is_a_pipeline_error() {
        let err = sass_to_css("h1 { color: ", Path::new(".")).unwrap_err();
        assert!(matches!(err, TemplateError::Sass(_)));
    }

    #[test]
    fn test_autoprefix_keeps_declarations() {
        let css = autoprefix_css("h1 { color: red; }", "last 2 versions").unwrap();
        assert!(squash(&css).contains("color:red"));
    }

    #[test]
    fn test_autoprefix_rejects_bad_query() {
        let err = autoprefix_css("h1 { color: red; }", "not a real browser query !!").unwrap_err();
        assert!(matches!(err, TemplateError::Prefix(_)));
    }

    #[test]
    fn test_autoprefix_keeps_existing_prefixes() {
        let source = ".a{-webkit-border-radius:3px;border-radius:3px;-moz-box-sizing:border-box;box-sizing:border-box}";
        let css = squash(&autoprefix_css(source, "last 2 versions").unwrap());
        assert!(css.contains("-webkit-border-radius:3px"));
        assert!(css.contains("border-radius:3px"));
        assert!(css.contains("-moz-box-sizing:border-box"));
        assert!(css.contains("box-sizing:border-box"));
    }

    #[test]
    fn test_autoprefix_adds_missing_prefix() {
        let css = squash(&autoprefix_css("p { user-select: none; }", "last 2 versions").unwrap());
        let prefixed = css.find("-webkit-user-select:none").unwrap();
        let plain = css.find(";user-select:none").unwrap();
        assert!(prefixed < plain);
    }

    #[test]
    fn test_autoprefix_does_not_duplicate_prefixes() {
        let source = "p { -webkit-user-select: none; user-select: none; }";
        let css = autoprefix_css(source, "last 2 versions").unwrap();
        assert_eq!(css.matches("-webkit-user-select").count(), 1);
    }

    #[test]
    fn test_autoprefix_reaches_media_rules() {
        let source = "@media (max-width: 600px) { p { user-select: none; } }";
        let css = squash(&autoprefix_css(source, "last 2 versions").unwrap());
        assert!(css.contains("@media(max-width:600px)"));
        assert!(css.contains("-webkit-user-select:none"));
    }

    #[test]
    fn test_inline_css_sets_style_attribute() {
        let html = "<html><head></head><body><h1>Hello!</h1></body></html>";
        let inlined = inline_css(html, "h1 { color: red; }", Path::new(".")).unwrap();
        assert!(squash(&inlined).contains("<h1style=\"color:red"));
    }

    #[test]
    fn test_inline_css_keeps_media_queries() {
        let html = "<html><head></head><body><h1>Hello!</h1></body></html>";
        let css = "h1 { color: red; }\n@media (max-width: 600px) { h1 { color: blue; } }";
        let output = minify_html(&inline_css(html, css, Path::new(".")).unwrap()).unwrap();
        let output = squash(&output);
        assert!(output.contains("<h1style=\"color:red"));
        assert!(output.contains("@media"));
        assert!(output.contains("max-width:600px"));
    }

    #[test]
    fn test_inline_css_keeps_pseudo_class_rules() {
        let html = "<html><head></head><body><a href=\"#\">Link</a></body></html>";
        let inlined = inline_css(html, "a:hover { color: red; }", Path::new(".")).unwrap();
        let inlined = squash(&inlined);
        assert!(inlined.contains("<style>a:hover{color:red"));
        assert!(!inlined.contains("style=\""));
    }

    #[test]
    fn test_style_block_goes_before_head_close() {
        let html = "<HTML><HEAD><title>t</title></HEAD><body></body></HTML>".to_string();
        let output = insert_style_block(html, "p{}");
        assert_eq!(output, "<HTML><HEAD><title>t</title><style>p{}</style></HEAD><body></body></HTML>");
        assert_eq!(insert_style_block("<p>x</p>".to_string(), "p{}"), "<style>p{}</style><p>x</p>");
    }

    #[test]
    fn test_pseudo_selector_detection() {
        assert!(has_pseudo_selector("a:hover{color:red}"));
        assert!(!has_pseudo_selector("a[href^=\"http:\"]{color:red}"));
        assert!(!has_pseudo_selector("p{background:url(http://x)}"));
    }

    #[test]
    fn test_minify_strips_comments_and_whitespace() {
        let html = "<html>\n  <body>\n    <!-- hidden -->\n    <p>Hi</p>\n  </body>\n</html>";
        let minified = minify_html(html).unwrap();
        assert!(!minified.contains("hidden"));
        assert!(minified.contains("<p>Hi</p>"));
        assert!(minified.len() < html.len());
    }

    #[test]
    fn test_minify_keeps_attribute_quotes() {
        let html = "<html><head></head><body><h1 style=\"color:red\" class=title>Hi</h1></body></html>";
        let minified = minify_html(html).unwrap();
        assert!(minified.contains("<h1 style=\"color:red\" class=\"title\">"));
    }

    #[test]
    fn test_quoting_skips_style_and_script_text() {
        let html = "<p id=a>x</p><style>a[b=c]{}</style><script>if (a<b) x=1</script>";
        assert_eq!(
            quote_attribute_values(html),
            "<p id=\"a\">x</p><style>a[b=c]{}</style><script>if (a<b) x=1</script>"
        );
    }

    #[test]
    fn test_quoting_leaves_quoted_values_alone() {
        let html = "<a href='x y' title=\"a=b\">t</a> 1 < 2";
        assert_eq!(quote_attribute_values(html), html);
    }
}
