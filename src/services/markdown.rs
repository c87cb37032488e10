//! A small markdown subset to HTML converter, shared by the documents and
//! the song report. Each call site picks a [`RenderProfile`] that sets the
//! block tags and adds its own pre/post passes.
//!
//! Input is trusted text (bundled documents or model output). Nothing is
//! HTML-escaped.

use regex::{Captures, Regex};
use std::sync::OnceLock;

pub type Hook = fn(&str) -> String;

#[derive(Clone, Debug)]
pub struct RenderProfile {
    pub name: &'static str,
    /// Drop `![alt](src)` image tags before anything else.
    pub strip_images: bool,
    pub paragraph_open: &'static str,
    pub pre_open: &'static str,
    /// Replacement for `> *text*` lines; `${1}` is the quoted text.
    pub blockquote: &'static str,
    pub horizontal_rule: &'static str,
    pub pre_hooks: Vec<Hook>,
    pub post_hooks: Vec<Hook>,
}

impl RenderProfile {
    fn plain(name: &'static str) -> Self {
        Self {
            name,
            strip_images: false,
            paragraph_open: "<p>",
            pre_open: "<pre>",
            blockquote: "<blockquote><em>${1}</em></blockquote>",
            horizontal_rule: "<hr />",
            pre_hooks: Vec::new(),
            post_hooks: Vec::new(),
        }
    }

    pub fn about() -> Self {
        Self {
            strip_images: true,
            ..Self::plain("about")
        }
    }

    pub fn manual() -> Self {
        Self::plain("manual")
    }

    pub fn tos() -> Self {
        Self::plain("tos")
    }

    /// In-app report: class-styled blocks, karaoke div restyled, every
    /// remaining newline turned into a line break.
    pub fn report_view() -> Self {
        Self {
            pre_open: "<pre class=\"bg-[var(--bg-inset)] p-4 rounded-md whitespace-pre-wrap font-sans text-[var(--text-secondary)] overflow-x-auto\">",
            blockquote: "<blockquote class=\"border-l-4 border-[var(--border-secondary)] pl-4 italic text-[var(--text-muted)] my-2\">${1}</blockquote>",
            horizontal_rule: "<hr class=\"my-8 border-[var(--border-primary)]\" />",
            post_hooks: vec![restyle_karaoke_div, newlines_to_breaks],
            ..Self::plain("report_view")
        }
    }

    /// Standalone report file: inline styles only, karaoke section
    /// rendered before the generic rules run.
    pub fn report_export() -> Self {
        Self {
            paragraph_open: "<p style=\"line-height: 1.6;\">",
            pre_open: "<pre style=\"background-color: #f3f4f6; padding: 1rem; border-radius: 0.375rem; white-space: pre-wrap; font-family: monospace; font-size: 0.875rem; color: #4b5563; overflow-x: auto;\">",
            horizontal_rule: "<hr style=\"margin-top: 2rem; margin-bottom: 2rem; border-top: 1px solid #d1d5db;\" />",
            pre_hooks: vec![inline_karaoke_section],
            ..Self::plain("report_export")
        }
    }

    pub fn with_pre_hook(mut self, hook: Hook) -> Self {
        self.pre_hooks.push(hook);
        self
    }

    pub fn with_post_hook(mut self, hook: Hook) -> Self {
        self.post_hooks.push(hook);
        self
    }
}

pub const KARAOKE_VIEW_MARKER: &str = "<div class=\"karaoke-lyrics\">";
const KARAOKE_VIEW_CLASSES: &str =
    "<div class=\"text-xl leading-relaxed whitespace-pre-wrap font-sans bg-[var(--bg-inset)] p-4 rounded-md\">";
const KARAOKE_EXPORT_DIV: &str = "<div style=\"font-size: 1.25rem; line-height: 1.75rem; white-space: pre-wrap; font-family: sans-serif; background-color: #f3f4f6; padding: 1rem; border-radius: 0.375rem; color: #374151;\">";

/// Blocks starting with these are already HTML and are not wrapped.
const BLOCK_PREFIXES: [&str; 6] = ["<h", "<ul>", "<hr", "<pre", "<blockquote", "<div"];
const CODE_PLACEHOLDER: &str = "\u{1}CODE";

macro_rules! cached_regex {
    ($fn_name:ident, $pattern:expr) => {
        fn $fn_name() -> &'static Regex {
            static RE: OnceLock<Regex> = OnceLock::new();
            RE.get_or_init(|| Regex::new($pattern).expect("Invalid markdown regex"))
        }
    };
}

cached_regex!(code_fence, r"```([\s\S]*?)```");
cached_regex!(image_tag, r"!\[.*?\]\(.*?\)");
cached_regex!(h1, r"(?m)^# (.*)$");
cached_regex!(h2, r"(?m)^## (.*)$");
cached_regex!(h3, r"(?m)^### (.*)$");
cached_regex!(blockquote, r"(?m)^> \*(.*)\*");
cached_regex!(bold, r"\*\*(.*?)\*\*");
cached_regex!(italic, r"\*(.*?)\*");
cached_regex!(rule, r"(?m)^---$");
cached_regex!(link, r"\[(.*?)\]\((.*?)\)");
cached_regex!(list_item, r"(?m)^[ \t]*[-*] (.*)$");
cached_regex!(list_wrap, r"(<li>[\s\S]*?</li>)");
cached_regex!(list_merge, r"</ul>\s*<ul>");
cached_regex!(placeholder, "\u{1}CODE(\\d+)\u{1}");
cached_regex!(karaoke_section, r"### Karaoke Lyrics\n([\s\S]*?)(\n---|\n##)");

#[derive(Clone, Debug)]
pub struct MarkdownRenderer {
    profile: RenderProfile,
}

impl MarkdownRenderer {
    pub fn new(profile: RenderProfile) -> Self {
        Self { profile }
    }

    pub fn profile(&self) -> &RenderProfile {
        &self.profile
    }

    pub fn render(&self, markdown: &str) -> String {
        let mut text = markdown.to_string();
        for hook in &self.profile.pre_hooks {
            text = hook(&text);
        }

        // Fenced blocks are lifted out so no inline rule touches their content.
        let mut code_blocks = Vec::new();
        let mut html = code_fence()
            .replace_all(&text, |caps: &Captures| {
                code_blocks.push(caps[1].trim().to_string());
                format!("{}{}\u{1}", CODE_PLACEHOLDER, code_blocks.len() - 1)
            })
            .into_owned();

        if self.profile.strip_images {
            html = image_tag().replace_all(&html, "").into_owned();
        }
        html = h1().replace_all(&html, "<h1>${1}</h1>").into_owned();
        html = h2().replace_all(&html, "<h2>${1}</h2>").into_owned();
        html = h3().replace_all(&html, "<h3>${1}</h3>").into_owned();
        html = blockquote().replace_all(&html, self.profile.blockquote).into_owned();
        html = bold().replace_all(&html, "<strong>${1}</strong>").into_owned();
        html = italic().replace_all(&html, "<em>${1}</em>").into_owned();
        html = rule().replace_all(&html, self.profile.horizontal_rule).into_owned();
        html = link()
            .replace_all(&html, "<a href=\"${2}\" target=\"_blank\" rel=\"noopener noreferrer\">${1}</a>")
            .into_owned();

        html = list_item().replace_all(&html, "<li>${1}</li>").into_owned();
        html = list_wrap().replace_all(&html, "<ul>${1}</ul>").into_owned();
        html = list_merge().replace_all(&html, "").into_owned();

        html = self.wrap_paragraphs(&html);

        let pre_open = self.profile.pre_open;
        html = placeholder()
            .replace_all(&html, |caps: &Captures| {
                let content = caps[1]
                    .parse::<usize>()
                    .ok()
                    .and_then(|i| code_blocks.get(i))
                    .map(String::as_str)
                    .unwrap_or_default();
                format!("{}{}</pre>", pre_open, content)
            })
            .into_owned();

        for hook in &self.profile.post_hooks {
            html = hook(&html);
        }
        html
    }

    fn wrap_paragraphs(&self, html: &str) -> String {
        html.split("\n\n")
            .filter_map(|block| {
                let trimmed = block.trim();
                if trimmed.is_empty() {
                    return None;
                }
                if trimmed.starts_with(CODE_PLACEHOLDER) || BLOCK_PREFIXES.iter().any(|p| trimmed.starts_with(p)) {
                    return Some(trimmed.to_string());
                }
                Some(format!(
                    "{}{}</p>",
                    self.profile.paragraph_open,
                    trimmed.replace('\n', "<br/>")
                ))
            })
            .collect()
    }
}

fn restyle_karaoke_div(html: &str) -> String {
    html.replacen(KARAOKE_VIEW_MARKER, KARAOKE_VIEW_CLASSES, 1)
}

fn newlines_to_breaks(html: &str) -> String {
    html.replace('\n', "<br />")
}

/// Renders the first "Karaoke Lyrics" section as an inline-styled block
/// with explicit line breaks.
fn inline_karaoke_section(markdown: &str) -> String {
    karaoke_section()
        .replacen(markdown, 1, |caps: &Captures| {
            let lyrics = caps[1].trim().replace('\n', "<br />");
            format!(
                "<h3>Karaoke Lyrics</h3>{}{}</div>{}",
                KARAOKE_EXPORT_DIV, lyrics, &caps[2]
            )
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(profile: RenderProfile, text: &str) -> String {
        MarkdownRenderer::new(profile).render(text)
    }

    #[test]
    fn test_headers_and_inline_rules() {
        let html = render(
            RenderProfile::manual(),
            "# Title\n## Part\n### Step\n\nSome **bold** and *soft* text with [a link](https://x.y).",
        );
        assert_eq!(
            html,
            "<h1>Title</h1>\n<h2>Part</h2>\n<h3>Step</h3><p>Some <strong>bold</strong> and <em>soft</em> text with <a href=\"https://x.y\" target=\"_blank\" rel=\"noopener noreferrer\">a link</a>.</p>"
        );
    }

    #[test]
    fn test_lists_are_wrapped_once() {
        let html = render(RenderProfile::manual(), "Intro\n\n- one\n* two\n  - three\n\nOutro");
        assert_eq!(
            html,
            "<p>Intro</p><ul><li>one</li><li>two</li><li>three</li></ul><p>Outro</p>"
        );
    }

    #[test]
    fn test_paragraph_line_breaks() {
        let html = render(RenderProfile::tos(), "Line one\nLine two\n\n\n\nNext");
        assert_eq!(html, "<p>Line one<br/>Line two</p><p>Next</p>");
    }

    #[test]
    fn test_code_fence_content_is_untouched() {
        let html = render(RenderProfile::manual(), "```\n  [Verse] *clap*\n- not a list\n```");
        assert_eq!(html, "<pre>[Verse] *clap*\n- not a list</pre>");
    }

    #[test]
    fn test_blockquote_of_italic_and_rule() {
        let html = render(RenderProfile::report_export(), "> *Retro synths.*\n---");
        assert!(html.starts_with("<blockquote><em>Retro synths.</em></blockquote>"));
        assert!(html.contains("<hr style=\"margin-top: 2rem;"));
        assert!(!html.contains("<p"));
    }

    #[test]
    fn test_about_strips_images() {
        let html = render(RenderProfile::about(), "![Band](/band.png)Hello");
        assert_eq!(html, "<p>Hello</p>");
        let kept = render(RenderProfile::manual(), "![Band](/band.png)");
        assert!(kept.contains("<a href=\"/band.png\""));
    }

    #[test]
    fn test_export_karaoke_pre_hook() {
        let html = render(
            RenderProfile::report_export(),
            "### Karaoke Lyrics\nHello\nWorld\n---\n## Chapter 5: About",
        );
        assert!(html.starts_with(&format!(
            "<h3>Karaoke Lyrics</h3>{}Hello<br />World</div>",
            KARAOKE_EXPORT_DIV
        )));
        assert!(html.ends_with("<h2>Chapter 5: About</h2>"));
    }

    #[test]
    fn test_view_post_hooks() {
        let html = render(
            RenderProfile::report_view(),
            "### Karaoke Lyrics\n<div class=\"karaoke-lyrics\">Hello\nWorld</div>",
        );
        assert_eq!(
            html,
            format!("<h3>Karaoke Lyrics</h3><br />{}Hello<br />World</div>", KARAOKE_VIEW_CLASSES)
        );
    }

    #[test]
    fn test_custom_hooks_compose() {
        let profile = RenderProfile::manual()
            .with_pre_hook(|s| s.replace("{name}", "Noor"))
            .with_post_hook(|s| format!("<article>{}</article>", s));
        assert_eq!(render(profile, "Hi {name}"), "<article><p>Hi Noor</p></article>");
    }

    #[test]
    fn test_render_is_deterministic() {
        let text = "# A\n\n- x\n\n> *q*\n\n```\ncode\n```\n\ntext";
        let renderer = MarkdownRenderer::new(RenderProfile::report_view());
        assert_eq!(renderer.render(text), renderer.render(text));
    }
}
