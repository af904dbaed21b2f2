use crate::error::ExtractError;
use lopdf::Document;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{info, warn};

pub const DEFAULT_OCR_DPI: u32 = 300;

/// Settings for the rasterize-then-recognize fallback path.
#[derive(Debug, Clone)]
pub struct OcrOptions {
    /// Rasterization resolution. Higher is slower but more accurate.
    pub dpi: u32,
    /// Tesseract language code.
    pub language: String,
}

impl Default for OcrOptions {
    fn default() -> Self {
        Self {
            dpi: DEFAULT_OCR_DPI,
            language: "eng".to_string(),
        }
    }
}

/// Chooses digital text-layer extraction vs. OCR for a single PDF.
#[derive(Debug, Clone, Default)]
pub struct TextExtractor {
    ocr: OcrOptions,
}

impl TextExtractor {
    pub fn new(ocr: OcrOptions) -> Self {
        Self { ocr }
    }

    /// Extract the document text, page texts joined by blank lines.
    ///
    /// The digital text layer is tried first unless `force_ocr` is set; any
    /// failure there is logged and falls through to OCR, as does an
    /// empty/whitespace-only result. An empty return value is valid and
    /// means "extraction found nothing", distinct from an error.
    pub fn extract(&self, path: &Path, force_ocr: bool) -> Result<String, ExtractError> {
        if !force_ocr {
            match extract_text_layer(path) {
                Ok(text) if !text.trim().is_empty() => return Ok(text),
                Ok(_) => {
                    info!(path = %path.display(), "digital text layer is empty, falling back to ocr");
                }
                Err(error) => {
                    warn!(path = %path.display(), %error, "digital text extraction failed, falling back to ocr");
                }
            }
        }

        self.ocr_document(path)
    }

    /// Rasterize every page with pdftoppm, then recognize each image with
    /// tesseract. One failed attempt is fatal for the document; there is no
    /// retry.
    fn ocr_document(&self, path: &Path) -> Result<String, ExtractError> {
        let pdftoppm = resolve_tool(&PDFTOPPM)?;
        let tesseract = resolve_tool(&TESSERACT)?;

        let workdir = tempfile::tempdir()?;
        let prefix = workdir.path().join("page");

        let rasterized = Command::new(&pdftoppm)
            .arg("-png")
            .arg("-r")
            .arg(self.ocr.dpi.to_string())
            .arg(path)
            .arg(&prefix)
            .output()?;

        if !rasterized.status.success() {
            return Err(ExtractError::OcrFailed(format!(
                "pdftoppm exited with {}: {}",
                rasterized.status,
                String::from_utf8_lossy(&rasterized.stderr).trim()
            )));
        }

        let mut images: Vec<PathBuf> = std::fs::read_dir(workdir.path())?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|candidate| {
                candidate
                    .extension()
                    .is_some_and(|extension| extension == "png")
            })
            .collect();
        images.sort();

        if images.is_empty() {
            return Err(ExtractError::OcrFailed(format!(
                "pdftoppm produced no page images for {}",
                path.display()
            )));
        }

        let mut pages = Vec::with_capacity(images.len());
        for (index, image) in images.iter().enumerate() {
            let recognized = Command::new(&tesseract)
                .arg(image)
                .arg("stdout")
                .arg("-l")
                .arg(&self.ocr.language)
                .output()?;

            if !recognized.status.success() {
                return Err(ExtractError::OcrFailed(format!(
                    "tesseract failed on page {}: {}",
                    index + 1,
                    String::from_utf8_lossy(&recognized.stderr).trim()
                )));
            }

            let text = String::from_utf8_lossy(&recognized.stdout)
                .trim()
                .to_string();
            if !text.is_empty() {
                pages.push(text);
            }
        }

        info!(path = %path.display(), pages = pages.len(), "ocr extraction complete");
        Ok(pages.join("\n\n"))
    }
}

/// Extract the embedded text layer, non-empty page texts joined by blank
/// lines. Returns an empty string when no page has readable text.
pub fn extract_text_layer(path: &Path) -> Result<String, ExtractError> {
    let document =
        Document::load(path).map_err(|error| ExtractError::PdfParse(error.to_string()))?;

    let mut pages = Vec::new();
    for (page_no, _page_id) in document.get_pages() {
        let text = document
            .extract_text(&[page_no])
            .map_err(|error| ExtractError::PdfParse(error.to_string()))?;

        if !text.trim().is_empty() {
            pages.push(text.trim().to_string());
        }
    }

    Ok(pages.join("\n\n"))
}

struct ExternalTool {
    binary: &'static str,
    env_var: &'static str,
    probe_flag: &'static str,
    install_hint: &'static str,
}

const PDFTOPPM: ExternalTool = ExternalTool {
    binary: "pdftoppm",
    env_var: "PDFTOPPM_PATH",
    probe_flag: "-v",
    install_hint: "install poppler-utils",
};

const TESSERACT: ExternalTool = ExternalTool {
    binary: "tesseract",
    env_var: "TESSERACT_PATH",
    probe_flag: "--version",
    install_hint: "install tesseract-ocr",
};

fn resolve_tool(tool: &ExternalTool) -> Result<PathBuf, ExtractError> {
    let configured = std::env::var(tool.env_var).ok();
    resolve_tool_from(configured.as_deref(), tool)
}

/// Resolve an external binary: an env override must point at an existing
/// executable, otherwise the PATH is probed. Misconfiguration yields a
/// `Configuration` error naming the tool and how to fix it, since OCR setup
/// failures are the most common operator error.
fn resolve_tool_from(
    configured: Option<&str>,
    tool: &ExternalTool,
) -> Result<PathBuf, ExtractError> {
    if let Some(configured) = configured.map(str::trim).filter(|value| !value.is_empty()) {
        let candidate = PathBuf::from(configured);
        if candidate.is_file() {
            return Ok(candidate);
        }
        return Err(ExtractError::Configuration {
            subject: tool.binary.to_string(),
            detail: format!(
                "{} is set to {configured} but no executable exists there; \
                 point it at the {} binary or unset it to search PATH",
                tool.env_var, tool.binary
            ),
        });
    }

    match Command::new(tool.binary).arg(tool.probe_flag).output() {
        Ok(_) => Ok(PathBuf::from(tool.binary)),
        Err(error) => Err(ExtractError::Configuration {
            subject: tool.binary.to_string(),
            detail: format!(
                "{} was not found on PATH ({error}); {} or set {} to its location",
                tool.binary, tool.install_hint, tool.env_var
            ),
        }),
    }
}
