//! Synthetic fixtures: MIME messages, images, Office documents, PDFs and
//! an in-memory mailbox.

#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use lopdf::{dictionary, Document, Object, Stream};
use zip::write::SimpleFileOptions;

use orderpdf::error::{PipelineError, Result};
use orderpdf::mailbox::{MailboxConnector, MailboxSession, MessageId};
use orderpdf::model::mail::RawMessage;
use orderpdf::model::request::RetrievalRequest;

pub const XLSX: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const DOCX: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

// ─── MIME ───────────────────────────────────────────────────────────

fn base64(data: &[u8]) -> String {
    const ALPHABET: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";
    let mut out = String::with_capacity(data.len() * 4 / 3 + 4);
    for chunk in data.chunks(3) {
        let b = [chunk[0], *chunk.get(1).unwrap_or(&0), *chunk.get(2).unwrap_or(&0)];
        let n = (u32::from(b[0]) << 16) | (u32::from(b[1]) << 8) | u32::from(b[2]);
        out.push(ALPHABET[(n >> 18) as usize & 63] as char);
        out.push(ALPHABET[(n >> 12) as usize & 63] as char);
        out.push(if chunk.len() > 1 {
            ALPHABET[(n >> 6) as usize & 63] as char
        } else {
            '='
        });
        out.push(if chunk.len() > 2 {
            ALPHABET[n as usize & 63] as char
        } else {
            '='
        });
    }
    // 76-column lines
    out.as_bytes()
        .chunks(76)
        .map(|line| String::from_utf8_lossy(line).into_owned())
        .collect::<Vec<_>>()
        .join("\r\n")
}

/// Builds a `multipart/mixed` message with base64 attachments.
pub struct MessageBuilder {
    subject: String,
    body: String,
    attachments: Vec<(String, String, Vec<u8>)>,
}

impl MessageBuilder {
    pub fn new(subject: &str) -> Self {
        Self {
            subject: subject.to_string(),
            body: String::new(),
            attachments: Vec::new(),
        }
    }

    pub fn body(mut self, body: &str) -> Self {
        self.body = body.to_string();
        self
    }

    pub fn attach(mut self, filename: &str, content_type: &str, bytes: Vec<u8>) -> Self {
        self.attachments
            .push((filename.to_string(), content_type.to_string(), bytes));
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let boundary = "=_orderpdf_boundary";
        let mut msg = format!(
            "From: shop@example.com\r\n\
             To: orders@example.com\r\n\
             Subject: {}\r\n\
             Date: Thu, 04 Jan 2024 10:00:00 +0000\r\n\
             MIME-Version: 1.0\r\n\
             Content-Type: multipart/mixed; boundary=\"{boundary}\"\r\n\r\n",
            self.subject
        );
        msg.push_str(&format!(
            "--{boundary}\r\nContent-Type: text/plain; charset=utf-8\r\n\r\n{}\r\n",
            self.body.replace('\n', "\r\n")
        ));
        for (filename, content_type, bytes) in &self.attachments {
            msg.push_str(&format!(
                "--{boundary}\r\n\
                 Content-Type: {content_type}; name=\"{filename}\"\r\n\
                 Content-Disposition: attachment; filename=\"{filename}\"\r\n\
                 Content-Transfer-Encoding: base64\r\n\r\n{}\r\n",
                base64(bytes)
            ));
        }
        msg.push_str(&format!("--{boundary}--\r\n"));
        msg.into_bytes()
    }

    pub fn raw(&self) -> RawMessage {
        RawMessage::new(self.build(), None)
    }
}

/// Concatenate messages into MBOX format (LF line endings).
pub fn mbox(messages: &[Vec<u8>]) -> Vec<u8> {
    let mut out = Vec::new();
    for (i, msg) in messages.iter().enumerate() {
        out.extend_from_slice(
            format!("From shop@example.com Thu Jan {:02} 10:00:00 2024\n", i + 1).as_bytes(),
        );
        let text = String::from_utf8_lossy(msg).replace("\r\n", "\n");
        out.extend_from_slice(text.as_bytes());
        if !text.ends_with('\n') {
            out.push(b'\n');
        }
        out.push(b'\n');
    }
    out
}

// ─── Attachments ────────────────────────────────────────────────────

pub fn png(width: u32, height: u32) -> Vec<u8> {
    encode_image(width, height, image::ImageFormat::Png)
}

pub fn jpeg(width: u32, height: u32) -> Vec<u8> {
    encode_image(width, height, image::ImageFormat::Jpeg)
}

fn encode_image(width: u32, height: u32, format: image::ImageFormat) -> Vec<u8> {
    let img = image::RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, format).unwrap();
    out.into_inner()
}

fn column(index: usize) -> char {
    (b'A' + index as u8) as char
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// A minimal `.xlsx` with inline-string cells.
pub fn xlsx(sheets: &[(&str, Vec<Vec<String>>)]) -> Vec<u8> {
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();

    let mut content_types = String::from(
        r#"<?xml version="1.0" encoding="UTF-8"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>"#,
    );
    let mut workbook = String::from(
        r#"<?xml version="1.0" encoding="UTF-8"?><workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets>"#,
    );
    let mut rels = String::from(
        r#"<?xml version="1.0" encoding="UTF-8"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    );

    for (i, (name, rows)) in sheets.iter().enumerate() {
        let n = i + 1;
        content_types.push_str(&format!(
            r#"<Override PartName="/xl/worksheets/sheet{n}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#
        ));
        workbook.push_str(&format!(
            r#"<sheet name="{}" sheetId="{n}" r:id="rId{n}"/>"#,
            escape_xml(name)
        ));
        rels.push_str(&format!(
            r#"<Relationship Id="rId{n}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{n}.xml"/>"#
        ));

        let mut sheet = String::from(
            r#"<?xml version="1.0" encoding="UTF-8"?><worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>"#,
        );
        for (r, row) in rows.iter().enumerate() {
            sheet.push_str(&format!(r#"<row r="{}">"#, r + 1));
            for (c, value) in row.iter().enumerate() {
                sheet.push_str(&format!(
                    r#"<c r="{}{}" t="inlineStr"><is><t>{}</t></is></c>"#,
                    column(c),
                    r + 1,
                    escape_xml(value)
                ));
            }
            sheet.push_str("</row>");
        }
        sheet.push_str("</sheetData></worksheet>");
        zip.start_file(format!("xl/worksheets/sheet{n}.xml"), options)
            .unwrap();
        zip.write_all(sheet.as_bytes()).unwrap();
    }
    content_types.push_str("</Types>");
    workbook.push_str("</sheets></workbook>");
    rels.push_str("</Relationships>");

    zip.start_file("[Content_Types].xml", options).unwrap();
    zip.write_all(content_types.as_bytes()).unwrap();
    zip.start_file("_rels/.rels", options).unwrap();
    zip.write_all(
        br#"<?xml version="1.0" encoding="UTF-8"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#,
    )
    .unwrap();
    zip.start_file("xl/workbook.xml", options).unwrap();
    zip.write_all(workbook.as_bytes()).unwrap();
    zip.start_file("xl/_rels/workbook.xml.rels", options).unwrap();
    zip.write_all(rels.as_bytes()).unwrap();

    zip.finish().unwrap().into_inner()
}

/// `rows` rows of `SKU-n | Widget | n` in one sheet named `Items`.
pub fn item_rows(rows: usize) -> Vec<Vec<String>> {
    (0..rows)
        .map(|i| vec![format!("SKU-{i}"), "Widget".to_string(), i.to_string()])
        .collect()
}

/// A minimal `.docx` holding one paragraph per entry.
pub fn docx(paragraphs: &[&str]) -> Vec<u8> {
    let mut body = String::new();
    for p in paragraphs {
        body.push_str(&format!("<w:p><w:r><w:t>{}</w:t></w:r></w:p>", escape_xml(p)));
    }
    let document = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body}</w:body></w:document>"#
    );
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    zip.start_file("word/document.xml", SimpleFileOptions::default())
        .unwrap();
    zip.write_all(document.as_bytes()).unwrap();
    zip.finish().unwrap().into_inner()
}

/// A PDF with one Helvetica text line per page.
pub fn pdf(page_texts: &[&str]) -> Vec<u8> {
    let mut doc = Document::with_version("1.4");

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut page_ids = Vec::new();
    for text in page_texts {
        let content = format!("BT /F1 12 Tf 100 700 Td ({text}) Tj ET");
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Resources" => resources_id,
            "Contents" => content_id,
        });
        page_ids.push(page_id);
    }

    let kids: Vec<Object> = page_ids.iter().map(|&id| id.into()).collect();
    let pages_id = doc.add_object(dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => Object::Integer(page_texts.len() as i64),
    });
    for page_id in &page_ids {
        if let Ok(Object::Dictionary(dict)) = doc.get_object_mut(*page_id) {
            dict.set("Parent", pages_id);
        }
    }

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

// ─── Mailbox ────────────────────────────────────────────────────────

/// An in-memory mailbox that counts how often sessions are closed.
#[derive(Clone, Default)]
pub struct RecordingMailbox {
    pub messages: Vec<(String, Vec<u8>)>,
    closes: Arc<AtomicUsize>,
}

impl RecordingMailbox {
    pub fn new(messages: Vec<(&str, Vec<u8>)>) -> Self {
        Self {
            messages: messages
                .into_iter()
                .map(|(s, b)| (s.to_string(), b))
                .collect(),
            closes: Arc::default(),
        }
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

struct RecordingSession(RecordingMailbox);

impl MailboxConnector for RecordingMailbox {
    fn connect(&self, _request: &RetrievalRequest) -> Result<Box<dyn MailboxSession>> {
        Ok(Box::new(RecordingSession(self.clone())))
    }
}

impl MailboxSession for RecordingSession {
    fn select_mailbox(&mut self, _name: &str) -> Result<()> {
        Ok(())
    }

    fn search_by_subject(&mut self, needle: &str) -> Result<Vec<MessageId>> {
        Ok(self
            .0
            .messages
            .iter()
            .enumerate()
            .filter(|(_, (subject, _))| subject.contains(needle))
            .map(|(i, _)| i as MessageId)
            .collect())
    }

    fn fetch_raw_message(&mut self, id: MessageId) -> Result<RawMessage> {
        let (_, bytes) = self
            .0
            .messages
            .get(id as usize)
            .ok_or_else(|| PipelineError::connection("memory", "no such message"))?;
        Ok(RawMessage::new(bytes.clone(), None))
    }

    fn close(&mut self) -> Result<()> {
        self.0.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub fn request(order_id: &str) -> RetrievalRequest {
    RetrievalRequest::new("orders@example.com", "secret", "mail.example.com", 993, order_id)
}
