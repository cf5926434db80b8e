//! # Learning document
//!
//! The composite artifact assembled from specialist outputs. Sections are
//! kept in canonical order no matter which order they were added in.

use serde::{Deserialize, Serialize};

/// The kind of a specialist section. The derive order is the canonical
/// document order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    Language,
    Explanation,
    Documentation,
    DiffAnalysis,
}

impl SectionKind {
    pub const ALL: [SectionKind; 4] = [
        SectionKind::Language,
        SectionKind::Explanation,
        SectionKind::Documentation,
        SectionKind::DiffAnalysis,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Language => "language",
            Self::Explanation => "explanation",
            Self::Documentation => "documentation",
            Self::DiffAnalysis => "diff_analysis",
        }
    }

    /// Fixed heading used in the rendered document
    pub fn heading(&self) -> &'static str {
        match self {
            Self::Language => "Language Concepts Explained",
            Self::Explanation => "How The Code Works",
            Self::Documentation => "Implementation Documentation",
            Self::DiffAnalysis => "Code Evolution & History",
        }
    }
}

impl std::fmt::Display for SectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Text produced by one specialist call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialistOutput {
    pub kind: SectionKind,
    pub text: String,
}

impl SpecialistOutput {
    pub fn new(kind: SectionKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub kind: SectionKind,
    pub heading: String,
    pub text: String,
}

/// Final document persisted once per analysis
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearningDocument {
    pub title: String,
    /// Name of the analyzed source file
    pub file_name: String,
    sections: Vec<Section>,
}

impl LearningDocument {
    pub fn new(file_name: impl Into<String>) -> Self {
        let file_name = file_name.into();
        Self {
            title: format!("{} - Learning Documentation", file_name),
            file_name,
            sections: Vec::new(),
        }
    }

    /// Insert a specialist's output at its canonical position. A second
    /// output of the same kind replaces the first.
    pub fn add(&mut self, output: SpecialistOutput) {
        let section = Section {
            kind: output.kind,
            heading: output.kind.heading().to_string(),
            text: output.text,
        };
        match self.sections.binary_search_by(|s| s.kind.cmp(&section.kind)) {
            Ok(pos) => self.sections[pos] = section,
            Err(pos) => self.sections.insert(pos, section),
        }
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn section(&self, kind: SectionKind) -> Option<&Section> {
        self.sections.iter().find(|s| s.kind == kind)
    }

    pub fn kinds(&self) -> Vec<SectionKind> {
        self.sections.iter().map(|s| s.kind).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Render as Markdown: the title as a level-1 heading, each section as
    /// a level-2 heading followed by its text.
    pub fn to_markdown(&self) -> String {
        let mut out = format!("# {}\n", self.title);
        for section in &self.sections {
            out.push_str(&format!("\n## {}\n\n{}\n", section.heading, section.text.trim_end()));
        }
        out
    }
}
