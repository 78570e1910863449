use std::io::{Cursor, Read};
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use quick_xml::events::Event;
use quick_xml::Reader;
use thiserror::Error;
use zip::ZipArchive;

use crate::services::llm::{ChatMessage, LlmClient, LlmError};

const SUMMARY_INSTRUCTION: &str =
    "Summarize this medical document in a concise and structured manner.";

#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum DocumentError {
    #[error("Unsupported document format: {0}")]
    UnsupportedFormat(String),
    #[error("Document is not valid UTF-8 text")]
    InvalidUtf8,
    #[error("Document contains no text")]
    Empty,
    #[error("Could not read {0} document")]
    Unreadable(&'static str),
}

const DOCX_BODY: &str = "word/document.xml";

pub(crate) fn extension_of(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

/// Text content of an uploaded document: plain text, markdown, PDF or Word.
pub(crate) fn extract_text(
    filename: &str,
    bytes: &[u8],
    allowed_extensions: &[String],
) -> Result<String, DocumentError> {
    let extension = extension_of(filename)
        .ok_or_else(|| DocumentError::UnsupportedFormat(filename.to_string()))?;
    if !allowed_extensions.iter().any(|allowed| allowed == &extension) {
        return Err(DocumentError::UnsupportedFormat(extension));
    }

    let text = match extension.as_str() {
        "txt" | "md" => plain_text(bytes)?,
        "pdf" => pdf_text(bytes)?,
        "docx" => docx_text(bytes)?,
        _ => return Err(DocumentError::UnsupportedFormat(extension)),
    };

    let text = text.trim();
    if text.is_empty() {
        return Err(DocumentError::Empty);
    }
    Ok(text.to_string())
}

fn plain_text(bytes: &[u8]) -> Result<String, DocumentError> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    std::str::from_utf8(bytes).map(str::to_string).map_err(|_| DocumentError::InvalidUtf8)
}

fn pdf_text(bytes: &[u8]) -> Result<String, DocumentError> {
    // pdf-extract panics on some malformed files instead of returning an error.
    match panic::catch_unwind(AssertUnwindSafe(|| pdf_extract::extract_text_from_mem(bytes))) {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(err)) => {
            tracing::debug!(error = %err, "PDF text extraction failed");
            Err(DocumentError::Unreadable("PDF"))
        }
        Err(_) => {
            tracing::warn!("PDF text extraction panicked");
            Err(DocumentError::Unreadable("PDF"))
        }
    }
}

/// Paragraph text of `word/document.xml`, one paragraph per line.
fn docx_text(bytes: &[u8]) -> Result<String, DocumentError> {
    let mut archive =
        ZipArchive::new(Cursor::new(bytes)).map_err(|_| DocumentError::Unreadable("Word"))?;
    let mut xml = String::new();
    archive
        .by_name(DOCX_BODY)
        .map_err(|_| DocumentError::Unreadable("Word"))?
        .read_to_string(&mut xml)
        .map_err(|_| DocumentError::Unreadable("Word"))?;

    let mut reader = Reader::from_str(&xml);
    let mut text = String::new();
    let mut in_run_text = false;
    loop {
        match reader.read_event() {
            Ok(Event::Start(tag)) if tag.name().as_ref() == b"w:t" => in_run_text = true,
            Ok(Event::End(tag)) => match tag.name().as_ref() {
                b"w:t" => in_run_text = false,
                b"w:p" => text.push('\n'),
                _ => {}
            },
            Ok(Event::Empty(tag)) => match tag.name().as_ref() {
                b"w:tab" => text.push('\t'),
                b"w:br" => text.push('\n'),
                _ => {}
            },
            Ok(Event::Text(run)) if in_run_text => {
                let run = run.unescape().map_err(|_| DocumentError::Unreadable("Word"))?;
                text.push_str(&run);
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(err) => {
                tracing::debug!(error = %err, "Word document XML is malformed");
                return Err(DocumentError::Unreadable("Word"));
            }
        }
    }

    Ok(text)
}

/// First `max_chars` characters, never splitting a code point.
pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}

pub(crate) fn sanitized_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let sanitized: String = base
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '.' || *c == '_' || *c == '-')
        .collect();

    if sanitized.trim_matches('.').is_empty() {
        "document".to_string()
    } else {
        sanitized
    }
}

fn summary_request(text: &str, max_chars: usize) -> Vec<ChatMessage> {
    vec![ChatMessage::system(SUMMARY_INSTRUCTION), ChatMessage::user(truncate_chars(text, max_chars))]
}

pub(crate) async fn summarize(
    llm: &LlmClient,
    text: &str,
    max_chars: usize,
) -> Result<String, LlmError> {
    llm.complete(&summary_request(text, max_chars)).await
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Write;

    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    fn allowed() -> Vec<String> {
        ["txt", "md", "pdf", "docx"].iter().map(|ext| ext.to_string()).collect()
    }

    fn docx_with_body(body: &str) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        writer.start_file("[Content_Types].xml", SimpleFileOptions::default()).unwrap();
        writer.write_all(b"<?xml version=\"1.0\"?><Types/>").unwrap();
        writer.start_file(DOCX_BODY, SimpleFileOptions::default()).unwrap();
        let xml = format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
             <w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\">\
             <w:body>{body}</w:body></w:document>"
        );
        writer.write_all(xml.as_bytes()).unwrap();
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn extracts_trimmed_utf8_text() {
        let text = extract_text("Notes.MD", b"\xEF\xBB\xBF  # Heart\nMurmurs\n", &allowed()).unwrap();
        assert_eq!(text, "# Heart\nMurmurs");
    }

    #[test]
    fn rejects_unsupported_extension() {
        assert_eq!(
            extract_text("slides.pptx", b"PK", &allowed()),
            Err(DocumentError::UnsupportedFormat("pptx".to_string()))
        );
        assert_eq!(
            extract_text("scan.pdf", b"%PDF-1.7", &["txt".to_string()]),
            Err(DocumentError::UnsupportedFormat("pdf".to_string()))
        );
        assert!(matches!(
            extract_text("README", b"text", &allowed()),
            Err(DocumentError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn rejects_binary_and_blank_documents() {
        assert_eq!(extract_text("a.txt", &[0xff, 0xfe, 0x00], &allowed()), Err(DocumentError::InvalidUtf8));
        assert_eq!(extract_text("a.txt", b" \n\t ", &allowed()), Err(DocumentError::Empty));
    }

    #[test]
    fn docx_paragraphs_become_lines() {
        let body = "<w:p><w:r><w:t>Aortic</w:t></w:r><w:r><w:t xml:space=\"preserve\"> stenosis</w:t></w:r></w:p>\
                    <w:p><w:r><w:t>S2 &amp; S4</w:t><w:tab/><w:t>soft</w:t></w:r></w:p>";
        let text = extract_text("Cardio.DOCX", &docx_with_body(body), &allowed()).unwrap();
        assert_eq!(text, "Aortic stenosis\nS2 & S4\tsoft");
    }

    #[test]
    fn docx_without_text_or_body_is_rejected() {
        let empty = docx_with_body("<w:p><w:r></w:r></w:p>");
        assert_eq!(extract_text("blank.docx", &empty, &allowed()), Err(DocumentError::Empty));

        assert_eq!(
            extract_text("fake.docx", b"not a zip archive", &allowed()),
            Err(DocumentError::Unreadable("Word"))
        );
    }

    fn pdf_with_line(line: &str) -> Vec<u8> {
        use lopdf::content::{Content, Operation};
        use lopdf::{dictionary, Document, Object, Stream};

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 24.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(line)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn pdf_text_is_extracted() {
        let text = extract_text("lecture.pdf", &pdf_with_line("Mitral valve prolapse"), &allowed())
            .unwrap();
        assert!(text.contains("Mitral"), "unexpected text: {text:?}");
    }

    #[test]
    fn corrupt_pdf_is_a_typed_error() {
        assert_eq!(
            extract_text("scan.pdf", b"%PDF-1.7\nthis is not a real pdf", &allowed()),
            Err(DocumentError::Unreadable("PDF"))
        );
        assert_eq!(extract_text("scan.pdf", b"", &allowed()), Err(DocumentError::Unreadable("PDF")));
    }

    #[test]
    fn truncation_counts_characters() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("abc", 0), "");
    }

    #[test]
    fn summary_request_limits_input() {
        let long = "x".repeat(6000);
        let messages = summary_request(&long, 5000);
        assert_eq!(messages[0], ChatMessage::system(SUMMARY_INSTRUCTION));
        assert_eq!(messages[1].content.chars().count(), 5000);
    }

    #[test]
    fn sanitized_filename_filters_path_and_symbols() {
        assert_eq!(sanitized_filename("../../etc/pass wd.txt"), "passwd.txt");
        assert_eq!(sanitized_filename("C:\\docs\\cardio notes.md"), "cardionotes.md");
        assert_eq!(sanitized_filename("..."), "document");
    }
}
