//! HTML page for the browser flow: upload form, preview and the rendered result.

use crate::session::SessionState;
use crate::upload::UploadedImage;
use pulldown_cmark::{Options, Parser, html};
use std::fmt::Write as _;

pub const PLACEHOLDER: &str = "Upload an image to see the extracted text here.";

/// Markdown is rendered as given. Raw HTML in the model output passes through.
pub fn markdown_to_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);
    options.insert(Options::ENABLE_FOOTNOTES);

    let parser = Parser::new_ext(markdown, options);
    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
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

/// What the page needs to know about the running service.
#[derive(Debug, Clone)]
pub struct PageContext<'a> {
    pub backend: &'a str,
    pub model: &'a str,
}

fn render_preview(out: &mut String, image: &UploadedImage) {
    let _ = write!(
        out,
        r#"<figure class="preview"><img src="{}" alt="Uploaded image"><figcaption>{}</figcaption></figure>"#,
        image.data_url(),
        escape_html(&image.filename)
    );
}

fn render_result(out: &mut String, session: &SessionState) {
    out.push_str(r#"<section class="result"><h2>Extracted Markdown</h2>"#);
    if let Some(error) = &session.last_error {
        let _ = write!(
            out,
            r#"<div class="error" role="alert">Error during analysis: {}</div>"#,
            escape_html(error)
        );
    }
    match &session.ocr_result {
        Some(result) if !result.markdown.is_empty() => {
            let _ = write!(
                out,
                r#"<article class="markdown" data-source="{}">{}</article>"#,
                escape_html(session.last_uploaded_filename.as_deref().unwrap_or_default()),
                markdown_to_html(&result.markdown)
            );
        }
        _ => {
            let _ = write!(out, r#"<div class="info">{}</div>"#, PLACEHOLDER);
        }
    }
    out.push_str("</section>");
}

const STYLE: &str = "body{font-family:system-ui,sans-serif;margin:0;display:flex;min-height:100vh}\
aside{width:16rem;padding:1rem;background:#f4f4f6}\
main{flex:1;padding:1rem 2rem;display:grid;grid-template-columns:3fr 1fr;gap:2rem}\
.preview img{max-width:100%}\
.error{background:#fde8e8;color:#8a1c1c;padding:.75rem;border-radius:4px}\
.info{background:#e8f0fd;padding:.75rem;border-radius:4px}\
.spinner{display:none}form.busy .spinner{display:inline}\
table{border-collapse:collapse}td,th{border:1px solid #ccc;padding:.25rem .5rem}\
footer{grid-column:1/-1;color:#666;border-top:1px solid #ddd;padding-top:.5rem}";

pub fn render_page(ctx: &PageContext<'_>, session: &SessionState) -> String {
    let mut out = String::with_capacity(4096);
    let model = escape_html(ctx.model);

    let _ = write!(
        out,
        r#"<!DOCTYPE html><html lang="en"><head><meta charset="utf-8"><title>OCR &amp; Markdown Formatter ({model})</title><style>{STYLE}</style></head><body>"#
    );
    let _ = write!(
        out,
        r#"<aside><h3>How to use</h3><ol><li>Upload an image (JPG/PNG).</li><li>The image is analyzed as soon as it is uploaded.</li><li>The structured Markdown appears next to the preview.</li></ol><p>Text is extracted and formatted by <strong>{model}</strong> through the {} backend.</p></aside>"#,
        escape_html(ctx.backend)
    );

    out.push_str(r#"<main><div class="text-column"><h1>OCR &amp; Markdown Formatter</h1>"#);
    render_result(&mut out, session);
    out.push_str("</div>");

    out.push_str(r#"<div class="upload-column"><form method="post" action="/" enctype="multipart/form-data" onsubmit="this.classList.add('busy')">"#);
    out.push_str(r#"<label>Upload an image (JPG/PNG) <input type="file" name="file" accept=".jpg,.jpeg,.png,image/jpeg,image/png" required></label>"#);
    let _ = write!(
        out,
        r#"<button type="submit">Analyze Image</button> <span class="spinner">Processing image with {model}...</span></form>"#
    );
    if let Some(image) = &session.image {
        render_preview(&mut out, image);
    }
    out.push_str("</div>");

    out.push_str("<footer><em>Tip: for best results upload clear images with good contrast and legible text.</em></footer>");
    out.push_str("</main></body></html>");
    out
}
