#![deny(clippy::all, clippy::pedantic)]

//! Markdown compilation: frontmatter extraction, syntax-highlighted HTML,
//! sanitisation and content hashing.

use std::collections::HashSet;

use comrak::{
    Arena, format_html,
    nodes::{AstNode, NodeHtmlBlock, NodeValue},
    options::Options,
    parse_document,
};
use sha2::{Digest, Sha256};
use syntect::{
    html::{ClassStyle, ClassedHTMLGenerator},
    parsing::{SyntaxReference, SyntaxSet},
    util::LinesWithEndings,
};
use thiserror::Error;

use taccuino_api_types::{ArticleDocument, Frontmatter};

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("document has no `---` frontmatter block")]
    MissingFrontmatter,
    #[error("invalid frontmatter: {message}")]
    Frontmatter { message: String },
    #[error("failed to highlight `{language}` block: {message}")]
    Highlighting { language: String, message: String },
    #[error("failed to render markdown: {message}")]
    Markdown { message: String },
}

/// Compiles one markdown source into a publishable article document.
pub struct Compiler {
    options: Options<'static>,
    syntax_set: SyntaxSet,
    class_style: ClassStyle,
    sanitizer: ammonia::Builder<'static>,
}

impl Compiler {
    pub fn new() -> Self {
        Self {
            options: default_options(),
            syntax_set: SyntaxSet::load_defaults_newlines(),
            class_style: ClassStyle::SpacedPrefixed { prefix: "syntax-" },
            sanitizer: build_sanitizer(),
        }
    }

    /// Compile a source document.
    ///
    /// The hash covers the raw frontmatter text and the compiled body, so
    /// any change to either produces a new cache-validation token.
    pub fn compile(&self, slug: &str, source: &str) -> Result<ArticleDocument, CompileError> {
        let (raw_frontmatter, body) = split_frontmatter(source)?;
        let frontmatter = parse_frontmatter(raw_frontmatter)?;

        let arena = Arena::new();
        let root = parse_document(&arena, body, &self.options);
        self.rewrite_code_blocks(root)?;

        let mut rendered = String::new();
        format_html(root, &self.options, &mut rendered).map_err(|err| CompileError::Markdown {
            message: err.to_string(),
        })?;
        let code = self.sanitizer.clean(&rendered).to_string();

        let hash = content_hash(raw_frontmatter, &code);
        let html = format!("<article>{code}</article>");

        Ok(ArticleDocument {
            slug: slug.to_string(),
            frontmatter,
            code: Some(code),
            html: Some(html),
            hash: Some(hash),
        })
    }

    fn rewrite_code_blocks<'a>(&self, node: &'a AstNode<'a>) -> Result<(), CompileError> {
        if let Some((info, literal)) = extract_code_block(node) {
            let mut segments = info.split_whitespace();
            let language = segments.next().map(ToString::to_string);
            let meta = segments.collect::<Vec<_>>().join(" ");

            let html = highlight_code(
                language.as_deref(),
                (!meta.is_empty()).then_some(meta.as_str()),
                &literal,
                &self.syntax_set,
                self.class_style,
            )?;

            let mut data = node.data.borrow_mut();
            data.value = NodeValue::HtmlBlock(NodeHtmlBlock {
                block_type: 0,
                literal: html,
            });
        }

        let mut child = node.first_child();
        while let Some(next) = child {
            self.rewrite_code_blocks(next)?;
            child = next.next_sibling();
        }

        Ok(())
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

fn default_options() -> Options<'static> {
    let mut options = Options::default();

    let ext = &mut options.extension;
    ext.strikethrough = true;
    ext.table = true;
    ext.autolink = true;
    ext.tasklist = true;
    ext.footnotes = true;

    let render = &mut options.render;
    render.github_pre_lang = true;
    render.full_info_string = true;
    // Raw output is sanitised as a whole after rendering.
    render.r#unsafe = true;

    options
}

fn build_sanitizer() -> ammonia::Builder<'static> {
    let mut builder = ammonia::Builder::default();

    let tags: HashSet<&'static str> = HashSet::from([
        "a",
        "blockquote",
        "br",
        "code",
        "del",
        "div",
        "em",
        "h1",
        "h2",
        "h3",
        "h4",
        "h5",
        "h6",
        "hr",
        "img",
        "input",
        "li",
        "ol",
        "p",
        "pre",
        "section",
        "span",
        "strong",
        "sub",
        "sup",
        "table",
        "tbody",
        "td",
        "th",
        "thead",
        "tr",
        "ul",
    ]);
    builder.tags(tags);

    let generic: HashSet<&'static str> = HashSet::from([
        "class",
        "id",
        "data-footnote-ref",
        "data-footnotes",
        "data-footnote-backref",
    ]);
    builder.generic_attributes(generic);

    builder.add_tag_attributes("a", &["target"]);
    builder.add_tag_attributes("img", &["alt", "title", "width", "height", "loading"]);
    builder.add_tag_attributes("code", &["data-meta", "data-language"]);
    builder.add_tag_attributes("pre", &["data-language"]);
    builder.add_tag_attributes("th", &["align", "colspan", "rowspan", "scope"]);
    builder.add_tag_attributes("td", &["align", "colspan", "rowspan"]);
    builder.add_tag_attributes("input", &["type", "checked", "disabled"]);
    builder.add_url_schemes(["http", "https", "mailto"].iter().copied());

    builder
}

fn split_frontmatter(source: &str) -> Result<(&str, &str), CompileError> {
    let rest = source
        .strip_prefix("---")
        .ok_or(CompileError::MissingFrontmatter)?;
    let rest = rest
        .strip_prefix("\r\n")
        .or_else(|| rest.strip_prefix('\n'))
        .ok_or(CompileError::MissingFrontmatter)?;

    let close = rest
        .find("\n---")
        .ok_or(CompileError::MissingFrontmatter)?;
    let raw = &rest[..close];
    let after = &rest[close + "\n---".len()..];
    let body = after
        .strip_prefix("\r\n")
        .or_else(|| after.strip_prefix('\n'))
        .unwrap_or(after);

    Ok((raw, body))
}

fn parse_frontmatter(raw: &str) -> Result<Frontmatter, CompileError> {
    let value: serde_json::Value =
        serde_yaml::from_str(raw).map_err(|err| CompileError::Frontmatter {
            message: err.to_string(),
        })?;
    serde_json::from_value(value).map_err(|err| CompileError::Frontmatter {
        message: err.to_string(),
    })
}

fn highlight_code(
    language: Option<&str>,
    meta: Option<&str>,
    code: &str,
    syntax_set: &SyntaxSet,
    class_style: ClassStyle,
) -> Result<String, CompileError> {
    let lang_token = language.unwrap_or("text");
    let syntax =
        find_syntax(syntax_set, lang_token).unwrap_or_else(|| syntax_set.find_syntax_plain_text());

    let mut code_with_newline = code.to_string();
    if !code_with_newline.ends_with('\n') {
        code_with_newline.push('\n');
    }

    let mut generator = ClassedHTMLGenerator::new_with_class_style(syntax, syntax_set, class_style);
    for line in LinesWithEndings::from(code_with_newline.as_str()) {
        generator
            .parse_html_for_line_which_includes_newline(line)
            .map_err(|err| CompileError::Highlighting {
                language: lang_token.to_string(),
                message: err.to_string(),
            })?;
    }
    let highlighted = generator.finalize();

    let lang_lower = lang_token.to_ascii_lowercase();
    let meta_attr = meta
        .filter(|m| !m.is_empty())
        .map(|m| format!(" data-meta=\"{}\"", ammonia::clean_text(m)))
        .unwrap_or_default();

    Ok(format!(
        "<pre class=\"syntax-highlight syntax-lang-{lang_lower}\" data-language=\"{lang_token}\"><code class=\"language-{lang_lower} syntax-code\"{meta_attr}>{highlighted}</code></pre>"
    ))
}

fn find_syntax<'a>(syntax_set: &'a SyntaxSet, token: &str) -> Option<&'a SyntaxReference> {
    let lowercase = token.to_ascii_lowercase();
    syntax_set
        .find_syntax_by_token(&lowercase)
        .or_else(|| syntax_set.find_syntax_by_name(&lowercase))
        .or_else(|| syntax_set.find_syntax_by_extension(&lowercase))
}

fn extract_code_block(node: &AstNode<'_>) -> Option<(String, String)> {
    let data = node.data.borrow();
    if let NodeValue::CodeBlock(block) = &data.value {
        Some((block.info.trim().to_string(), block.literal.clone()))
    } else {
        None
    }
}

fn content_hash(frontmatter: &str, code: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(frontmatter.as_bytes());
    hasher.update(code.as_bytes());
    hex::encode(hasher.finalize())
}
