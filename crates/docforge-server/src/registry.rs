//! Template identifier registry

use std::collections::BTreeMap;

/// Identifier used when a request names no template.
pub const DEFAULT_TEMPLATE_ID: &str = "default";

/// Identifier served by the `/test-doc` route.
pub const TEST_TEMPLATE_ID: &str = "test";

const DEFAULT_TEMPLATE_FILE: &str = "default-resume.docx";

const BUILTIN_TEMPLATES: &[(&str, &str)] = &[
    (DEFAULT_TEMPLATE_ID, DEFAULT_TEMPLATE_FILE),
    ("professional", "professional-resume.docx"),
    ("creative", "creative-resume.docx"),
    ("academic", "academic-resume.docx"),
    ("minimalistic", "minimalistic-resume.docx"),
    (TEST_TEMPLATE_ID, "test-resume.docx"),
];

/// Closed mapping from template identifiers to file names.
///
/// Built once at startup and never modified.
#[derive(Debug, Clone)]
pub struct TemplateRegistry {
    entries: BTreeMap<&'static str, &'static str>,
}

impl TemplateRegistry {
    pub fn builtin() -> Self {
        Self {
            entries: BUILTIN_TEMPLATES.iter().copied().collect(),
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// File name for `id`, or the default template's file name when the
    /// identifier is unknown.
    pub fn file_name(&self, id: &str) -> &'static str {
        self.entries
            .get(id)
            .or_else(|| self.entries.get(DEFAULT_TEMPLATE_ID))
            .copied()
            .unwrap_or(DEFAULT_TEMPLATE_FILE)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&'static str, &'static str)> + '_ {
        self.entries.iter().map(|(id, file)| (*id, *file))
    }
}

impl Default for TemplateRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
