//! Document Assembler: turns a `CanonicalResume` into an ordered list of
//! typed blocks. Pure data; no serialization happens here.

use serde::Serialize;

use crate::models::resume::{CanonicalResume, EducationEntry, ExperienceEntry};

pub const SUMMARY_LABEL: &str = "PROFILE SUMMARY";
pub const SKILLS_LABEL: &str = "KEY SKILLS";
pub const EXPERIENCE_LABEL: &str = "PROFESSIONAL EXPERIENCE";
pub const EDUCATION_LABEL: &str = "EDUCATION";

/// Shown under the experience label when there are no roles.
pub const EXPERIENCE_PLACEHOLDER: &str = "Details of professional experience available on request.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DocumentBlock {
    Heading { level: u8, text: String },
    CenteredLine { text: String },
    Label { text: String },
    Paragraph { text: String },
    Bullet { text: String },
}

impl DocumentBlock {
    pub fn text(&self) -> &str {
        match self {
            DocumentBlock::Heading { text, .. }
            | DocumentBlock::CenteredLine { text }
            | DocumentBlock::Label { text }
            | DocumentBlock::Paragraph { text }
            | DocumentBlock::Bullet { text } => text,
        }
    }
}

pub fn assemble(resume: &CanonicalResume) -> Vec<DocumentBlock> {
    let mut blocks = vec![DocumentBlock::Heading {
        level: 1,
        text: resume.full_name.clone(),
    }];

    if !resume.target_title.is_empty() {
        blocks.push(DocumentBlock::CenteredLine {
            text: resume.target_title.clone(),
        });
    }

    let contact = join_present(
        &[
            resume.contact.email.as_str(),
            resume.contact.phone.as_str(),
            resume.contact.linkedin.as_str(),
        ],
        " · ",
    );
    if !contact.is_empty() {
        blocks.push(DocumentBlock::CenteredLine { text: contact });
    }

    push_labelled_paragraph(&mut blocks, SUMMARY_LABEL, &resume.summary);
    push_labelled_paragraph(&mut blocks, SKILLS_LABEL, &resume.skills_line);

    blocks.push(label(EXPERIENCE_LABEL));
    if resume.experience.is_empty() {
        blocks.push(DocumentBlock::Paragraph {
            text: EXPERIENCE_PLACEHOLDER.to_string(),
        });
    }
    for entry in &resume.experience {
        push_role(&mut blocks, entry);
    }

    if !resume.education.is_empty() {
        blocks.push(label(EDUCATION_LABEL));
        blocks.extend(resume.education.iter().map(|entry| DocumentBlock::Paragraph {
            text: education_line(entry),
        }));
    }

    blocks
}

fn label(text: &str) -> DocumentBlock {
    DocumentBlock::Label {
        text: text.to_string(),
    }
}

fn push_labelled_paragraph(blocks: &mut Vec<DocumentBlock>, heading: &str, text: &str) {
    let text = text.trim();
    if text.is_empty() {
        return;
    }
    blocks.push(label(heading));
    blocks.push(DocumentBlock::Paragraph {
        text: text.to_string(),
    });
}

fn push_role(blocks: &mut Vec<DocumentBlock>, entry: &ExperienceEntry) {
    let heading = join_present(&[entry.title.as_str(), entry.company.as_str()], " — ");
    if !heading.is_empty() {
        blocks.push(DocumentBlock::Heading {
            level: 2,
            text: heading,
        });
    }

    let dates = entry.date_range();
    let meta = join_present(&[entry.location.as_str(), dates.as_str()], " | ");
    if !meta.is_empty() {
        blocks.push(DocumentBlock::Paragraph { text: meta });
    }

    blocks.extend(entry.bullets.iter().map(|b| DocumentBlock::Bullet { text: b.clone() }));
}

fn education_line(entry: &EducationEntry) -> String {
    join_present(
        &[
            entry.degree.as_str(),
            entry.institution.as_str(),
            entry.year.as_str(),
        ],
        ", ",
    )
}

fn join_present(parts: &[&str], separator: &str) -> String {
    parts
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(separator)
}
