// Document assembly and rendering.
// `assembler` is pure (CanonicalResume → blocks); `renderer` turns blocks into bytes.

pub mod assembler;
pub mod renderer;

pub use assembler::{assemble, DocumentBlock};
pub use renderer::{DocumentRenderer, RenderError, WordMlRenderer};

/// Attachment filename for a rendered résumé, e.g. `jane-doe-cv.doc`.
pub fn document_filename(full_name: &str, extension: &str) -> String {
    let slug = full_name
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(str::to_ascii_lowercase)
        .collect::<Vec<_>>()
        .join("-");
    let slug = if slug.is_empty() { "candidate".to_string() } else { slug };
    format!("{slug}-cv.{extension}")
}
