//! MIME message parsing: subject, body text, attachments, HTML-to-text conversion.

use chrono::{DateTime, Utc};
use mail_parser::{MessageParser, MimeHeaders, PartType};
use tracing::debug;

use crate::error::{PipelineError, Result};
use crate::model::attachment::Attachment;
use crate::model::mail::{ParsedMail, RawMessage};

/// Decode a raw message into subject, body text and ordered attachments.
///
/// A message without a text body or without attachments is valid and yields
/// empty values. Only input that has no recognizable header block at all is
/// rejected as malformed.
pub fn parse_message(raw: &RawMessage) -> Result<ParsedMail> {
    let message_bytes = skip_from_line(&raw.bytes);
    if message_bytes.iter().all(|b| b.is_ascii_whitespace()) {
        return Err(PipelineError::MalformedMessage("message is empty".into()));
    }

    let msg = MessageParser::default()
        .parse(message_bytes)
        .ok_or_else(|| PipelineError::MalformedMessage("not a MIME message".into()))?;

    if msg.headers().is_empty() {
        return Err(PipelineError::MalformedMessage(
            "no header block found".into(),
        ));
    }

    let subject = msg.subject().unwrap_or_default().to_string();

    // Without a text/plain part the first text body is the HTML part itself.
    let body_text = match msg.text_bodies().next().map(|part| &part.body) {
        Some(PartType::Text(text)) => text.to_string(),
        Some(PartType::Html(html)) => html_to_text(html),
        _ => String::new(),
    };

    let date = msg
        .date()
        .and_then(|d| DateTime::<Utc>::from_timestamp(d.to_timestamp(), 0));

    let attachments = attachments_from_parsed(&msg);

    debug!(
        subject = %subject,
        body_len = body_text.len(),
        attachments = attachments.len(),
        "Parsed message"
    );

    Ok(ParsedMail {
        subject,
        body_text,
        date,
        attachments,
    })
}

/// Build the attachment list from a parsed `mail_parser::Message`, in MIME order.
fn attachments_from_parsed(msg: &mail_parser::Message<'_>) -> Vec<Attachment> {
    msg.attachments()
        .enumerate()
        .map(|(idx, part)| {
            let filename = part
                .attachment_name()
                .map(String::from)
                .unwrap_or_else(|| format!("attachment_{idx}"));

            let content_type = part
                .content_type()
                .map(|ct: &mail_parser::ContentType| {
                    let main = ct.ctype();
                    match ct.subtype() {
                        Some(sub) => format!("{main}/{sub}"),
                        None => main.to_string(),
                    }
                })
                .unwrap_or_else(|| "application/octet-stream".to_string());

            Attachment::new(filename, content_type, part.contents().to_vec())
        })
        .collect()
}

/// Skip a UTF-8 BOM and the `From ` separator line that MBOX messages carry.
pub(crate) fn skip_from_line(data: &[u8]) -> &[u8] {
    let data = data.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(data);

    if data.starts_with(b"From ") {
        if let Some(pos) = data.iter().position(|&b| b == b'\n') {
            return &data[pos + 1..];
        }
    }
    data
}

/// Convert HTML to plain text.
///
/// - Preserves line breaks from `<br>`, `<p>`, `<div>`, `<tr>`, `<li>`, headings
/// - Removes scripts and styles
/// - Decodes common HTML entities
/// - Collapses runs of blank lines
pub fn html_to_text(html: &str) -> String {
    let mut text = html.to_string();

    text = remove_tag_block(&text, "script");
    text = remove_tag_block(&text, "style");

    for tag in &["br", "BR", "br/", "br /"] {
        text = text.replace(&format!("<{tag}>"), "\n");
    }
    for tag in &["p", "div", "tr", "li", "h1", "h2", "h3", "h4", "h5", "h6"] {
        text = text.replace(&format!("<{tag}>"), "\n");
        text = text.replace(&format!("<{tag} "), "\n<");
        let upper = tag.to_uppercase();
        text = text.replace(&format!("<{upper}>"), "\n");
        text = text.replace(&format!("</{tag}>"), "\n");
        text = text.replace(&format!("</{upper}>"), "\n");
    }

    // Strip all remaining tags
    let mut result = String::with_capacity(text.len());
    let mut in_tag = false;
    for ch in text.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => result.push(ch),
            _ => {}
        }
    }

    // `&amp;` last so that `&amp;lt;` stays a literal `&lt;`
    result = result.replace("&lt;", "<");
    result = result.replace("&gt;", ">");
    result = result.replace("&quot;", "\"");
    result = result.replace("&#39;", "'");
    result = result.replace("&apos;", "'");
    result = result.replace("&nbsp;", " ");
    result = result.replace("&#160;", " ");
    result = result.replace("&amp;", "&");

    let mut prev_was_blank = false;
    let mut cleaned = String::with_capacity(result.len());
    for line in result.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            if !prev_was_blank {
                cleaned.push('\n');
                prev_was_blank = true;
            }
        } else {
            cleaned.push_str(trimmed);
            cleaned.push('\n');
            prev_was_blank = false;
        }
    }

    cleaned.trim().to_string()
}

/// Remove an entire tag block (e.g. `<script>…</script>`).
fn remove_tag_block(html: &str, tag: &str) -> String {
    let mut result = String::with_capacity(html.len());
    let mut remaining = html;
    let open = format!("<{tag}");
    let close = format!("</{tag}>");

    while let Some(start) = remaining.to_lowercase().find(&open) {
        result.push_str(&remaining[..start]);
        let after = &remaining[start..];
        if let Some(end) = after.to_lowercase().find(&close) {
            remaining = &after[end + close.len()..];
        } else {
            remaining = "";
            break;
        }
    }
    result.push_str(remaining);
    result
}
