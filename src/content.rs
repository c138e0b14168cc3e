//! The subject's curated facts.
//!
//! [`StructuredContent`] is owned by the surrounding application and is
//! read-only at query time. It is loaded from a JSON file with a fixed
//! schema; every record belongs to one of the closed set of kinds in
//! [`Record`], so both the fallback selector and the structured ingestion
//! renderer work over statically checked shapes.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::IngestionError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuredContent {
    pub profile: Profile,
    #[serde(default)]
    pub skills: Vec<SkillCategory>,
    pub contact: Contact,
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub experience: Vec<Experience>,
    #[serde(default)]
    pub education: Vec<Education>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    pub title: String,
    pub bio: String,
    #[serde(default)]
    pub location: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SkillCategory {
    pub category: String,
    pub skills: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub email: String,
    #[serde(default)]
    pub linkedin: Option<String>,
    #[serde(default)]
    pub github: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub tech: Vec<String>,
    #[serde(default)]
    pub link: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Experience {
    pub role: String,
    pub company: String,
    pub period: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub responsibilities: Vec<String>,
    #[serde(default)]
    pub stack: Vec<String>,
    /// Outcome metrics, e.g. `"latency" => "-40%"`. Ordered by key.
    #[serde(default)]
    pub impact: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Education {
    pub degree: String,
    pub institution: String,
    pub period: String,
    #[serde(default)]
    pub details: Option<String>,
}

/// One logical unit of structured content.
#[derive(Debug, Clone, Copy)]
pub enum Record<'a> {
    About(&'a Profile),
    Project(&'a Project),
    Experience(&'a Experience),
    Education(&'a Education),
}

impl StructuredContent {
    /// Parse content from a JSON string.
    pub fn from_json(source_id: &str, json: &str) -> Result<Self, IngestionError> {
        serde_json::from_str(json).map_err(|e| IngestionError::Structured {
            source_id: source_id.to_string(),
            message: e.to_string(),
        })
    }

    /// Load content from a JSON file.
    pub fn load(path: &Path) -> Result<Self, IngestionError> {
        let json = std::fs::read_to_string(path).map_err(|source| IngestionError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&path.display().to_string(), &json)
    }

    /// All records in rendering order: about, projects, experience, education.
    pub fn records(&self) -> Vec<Record<'_>> {
        let mut records = vec![Record::About(&self.profile)];
        records.extend(self.projects.iter().map(Record::Project));
        records.extend(self.experience.iter().map(Record::Experience));
        records.extend(self.education.iter().map(Record::Education));
        records
    }

    /// Records paired with unique provenance ids.
    ///
    /// Repeated ids (two roles at one company, projects sharing a title)
    /// get an ordinal suffix: `experience:acme-corp`, `experience:acme-corp-2`.
    pub fn identified_records(&self) -> Vec<(String, Record<'_>)> {
        let mut seen: HashMap<String, usize> = HashMap::new();
        self.records()
            .into_iter()
            .map(|record| {
                let base = record.source_id();
                let count = seen.entry(base.clone()).or_insert(0);
                *count += 1;
                let id = if *count == 1 {
                    base
                } else {
                    format!("{}-{}", base, count)
                };
                (id, record)
            })
            .collect()
    }

    /// Single-line summary of how to reach the subject.
    pub fn contact_line(&self) -> String {
        let mut parts = vec![format!("Email: {}", self.contact.email)];
        if let Some(linkedin) = &self.contact.linkedin {
            parts.push(format!("LinkedIn: {}", linkedin));
        }
        if let Some(github) = &self.contact.github {
            parts.push(format!("GitHub: {}", github));
        }
        if let Some(website) = &self.contact.website {
            parts.push(format!("Website: {}", website));
        }
        format!("Contact - {}", parts.join(", "))
    }
}

impl<'a> Record<'a> {
    pub fn label(&self) -> &'static str {
        match self {
            Record::About(_) => "about",
            Record::Project(_) => "project",
            Record::Experience(_) => "experience",
            Record::Education(_) => "education",
        }
    }

    /// Provenance id, e.g. `experience:acme-corp`.
    pub fn source_id(&self) -> String {
        let name = match self {
            Record::About(p) => p.name.as_str(),
            Record::Project(p) => p.title.as_str(),
            Record::Experience(e) => e.company.as_str(),
            Record::Education(e) => e.institution.as_str(),
        };
        format!("{}:{}", self.label(), slugify(name))
    }

    /// Denormalized `Field: value` block used as the record's single chunk.
    pub fn render(&self) -> String {
        let mut lines: Vec<String> = Vec::new();
        match self {
            Record::About(p) => {
                lines.push(format!("Name: {}", p.name));
                lines.push(format!("Title: {}", p.title));
                if let Some(location) = &p.location {
                    lines.push(format!("Location: {}", location));
                }
                lines.push(format!("About: {}", p.bio));
            }
            Record::Project(p) => {
                lines.push(format!("Project: {}", p.title));
                lines.push(format!("Description: {}", p.description));
                if !p.tech.is_empty() {
                    lines.push(format!("Technologies: {}", p.tech.join(", ")));
                }
                if let Some(link) = &p.link {
                    lines.push(format!("Link: {}", link));
                }
            }
            Record::Experience(e) => {
                lines.push(format!("Role: {}", e.role));
                lines.push(format!("Company: {}", e.company));
                lines.push(format!("Period: {}", e.period));
                if !e.tags.is_empty() {
                    lines.push(format!("Tags: {}", e.tags.join(", ")));
                }
                if !e.responsibilities.is_empty() {
                    lines.push(format!("Responsibilities: {}", e.responsibilities.join("; ")));
                }
                if !e.stack.is_empty() {
                    lines.push(format!("Stack: {}", e.stack.join(", ")));
                }
                if !e.impact.is_empty() {
                    lines.push(format!("Impact: {}", impact_pairs(&e.impact)));
                }
            }
            Record::Education(e) => {
                lines.push(format!("Degree: {}", e.degree));
                lines.push(format!("Institution: {}", e.institution));
                lines.push(format!("Period: {}", e.period));
                if let Some(details) = &e.details {
                    lines.push(format!("Details: {}", details));
                }
            }
        }
        lines.join("\n")
    }
}

/// `key: value` pairs joined by `, `, in key order.
pub(crate) fn impact_pairs(impact: &BTreeMap<String, String>) -> String {
    impact
        .iter()
        .map(|(k, v)| format!("{}: {}", k, v))
        .collect::<Vec<_>>()
        .join(", ")
}

fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut dash = false;
    for ch in name.chars() {
        if ch.is_alphanumeric() {
            slug.extend(ch.to_lowercase());
            dash = false;
        } else if !dash && !slug.is_empty() {
            slug.push('-');
            dash = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}
