//! Rule-based context selection over [`StructuredContent`].
//!
//! Used when vector retrieval yields nothing. Always emits the bio, the
//! contact line and one line per skill category, then adds experience,
//! projects and education when the query asks for them. The output is
//! capped at [`MAX_CONTEXT_ITEMS`] in assembly order.

use crate::content::{impact_pairs, Education, Experience, Project, StructuredContent};

pub const MAX_CONTEXT_ITEMS: usize = 10;

const EXPERIENCE_KEYWORDS: &[&str] = &[
    "experience",
    "work",
    "job",
    "role",
    "position",
    "summarize",
    "tell me about",
];
const PROJECT_KEYWORDS: &[&str] = &["project", "built", "app"];
const EDUCATION_KEYWORDS: &[&str] = &["education", "degree", "university"];

/// Select fallback context lines for `query`. Pure and deterministic.
pub fn select_context(query: &str, content: &StructuredContent) -> Vec<String> {
    let lower = query.to_lowercase();
    let mut context = Vec::new();

    context.push(format!(
        "About {} ({}): {}",
        content.profile.name, content.profile.title, content.profile.bio
    ));
    context.push(content.contact_line());
    for category in &content.skills {
        context.push(format!("{}: {}", category.category, category.skills.join(", ")));
    }

    if contains_any(&lower, EXPERIENCE_KEYWORDS) || mentions_company(query, &content.experience) {
        context.extend(content.experience.iter().map(experience_line));
    }
    if contains_any(&lower, PROJECT_KEYWORDS) {
        context.extend(content.projects.iter().map(project_line));
    }
    if contains_any(&lower, EDUCATION_KEYWORDS) {
        context.extend(content.education.iter().map(education_line));
    }

    context.truncate(MAX_CONTEXT_ITEMS);
    context
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

/// Lower-cased, alphanumeric characters only.
fn normalize(text: &str) -> String {
    text.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Bidirectional substring match between the query and any company name.
fn mentions_company(query: &str, experience: &[Experience]) -> bool {
    let query = normalize(query);
    if query.is_empty() {
        return false;
    }
    experience.iter().any(|entry| {
        let company = normalize(&entry.company);
        !company.is_empty() && (query.contains(&company) || company.contains(&query))
    })
}

fn experience_line(entry: &Experience) -> String {
    let mut line = format!("{} at {} ({})", entry.role, entry.company, entry.period);
    if !entry.tags.is_empty() {
        line.push_str(&format!(". Tags: {}", entry.tags.join(", ")));
    }
    if !entry.responsibilities.is_empty() {
        line.push_str(&format!(
            ". Responsibilities: {}",
            entry.responsibilities.join("; ")
        ));
    }
    if !entry.stack.is_empty() {
        line.push_str(&format!(". Stack: {}", entry.stack.join(", ")));
    }
    if !entry.impact.is_empty() {
        line.push_str(&format!(". Impact: {}", impact_pairs(&entry.impact)));
    }
    line
}

fn project_line(project: &Project) -> String {
    let mut line = format!("Project {}: {}", project.title, project.description);
    if !project.tech.is_empty() {
        line.push_str(&format!(" (Tech: {})", project.tech.join(", ")));
    }
    line
}

fn education_line(entry: &Education) -> String {
    let mut line = format!("{}, {} ({})", entry.degree, entry.institution, entry.period);
    if let Some(details) = &entry.details {
        line.push_str(&format!(". {}", details));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{Contact, Profile, SkillCategory};
    use std::collections::BTreeMap;

    fn content() -> StructuredContent {
        StructuredContent {
            profile: Profile {
                name: "Jordan Lee".into(),
                title: "Software Engineer".into(),
                bio: "Builds distributed systems.".into(),
                location: None,
            },
            skills: vec![
                SkillCategory {
                    category: "Languages".into(),
                    skills: vec!["Rust".into(), "Go".into()],
                },
                SkillCategory {
                    category: "Data".into(),
                    skills: vec!["Postgres".into()],
                },
            ],
            contact: Contact {
                email: "jordan@example.com".into(),
                ..Default::default()
            },
            projects: vec![Project {
                title: "Folio".into(),
                description: "Portfolio assistant".into(),
                tech: vec!["Rust".into()],
                link: None,
            }],
            experience: vec![
                Experience {
                    role: "Staff Engineer".into(),
                    company: "Acme Corp".into(),
                    period: "2020 - 2024".into(),
                    tags: vec!["backend".into()],
                    responsibilities: vec!["Led payments".into()],
                    stack: vec!["Rust".into()],
                    impact: BTreeMap::from([("latency".into(), "-40%".into())]),
                },
                Experience {
                    role: "Engineer".into(),
                    company: "Globex".into(),
                    period: "2016 - 2020".into(),
                    ..Default::default()
                },
            ],
            education: vec![Education {
                degree: "BSc Computer Science".into(),
                institution: "State University".into(),
                period: "2012 - 2016".into(),
                details: None,
            }],
        }
    }

    #[test]
    fn baseline_has_bio_contact_and_skills() {
        let context = select_context("hello", &content());
        assert_eq!(
            context,
            vec![
                "About Jordan Lee (Software Engineer): Builds distributed systems.".to_string(),
                "Contact - Email: jordan@example.com".to_string(),
                "Languages: Rust, Go".to_string(),
                "Data: Postgres".to_string(),
            ]
        );
    }

    #[test]
    fn keyword_includes_all_experience() {
        let context = select_context("Summarize his work history", &content());
        assert_eq!(context.len(), 6);
        assert_eq!(
            context[4],
            "Staff Engineer at Acme Corp (2020 - 2024). Tags: backend. \
             Responsibilities: Led payments. Stack: Rust. Impact: latency: -40%"
        );
        assert!(context[5].contains("Globex"));
    }

    #[test]
    fn company_name_matches_without_keyword() {
        let context = select_context("What did he do at Acme Corp?", &content());
        assert!(context.iter().any(|c| c.contains("Acme Corp")));
    }

    #[test]
    fn company_contains_query_matches() {
        let context = select_context("globex", &content());
        assert!(context.iter().any(|c| c.contains("Globex")));
    }

    #[test]
    fn punctuation_only_query_matches_nothing() {
        assert_eq!(select_context("?!", &content()).len(), 4);
    }

    #[test]
    fn projects_and_education_by_keyword() {
        let context = select_context("What has he built, and what degree?", &content());
        assert!(context.iter().any(|c| c.starts_with("Project Folio")));
        assert!(context.iter().any(|c| c.starts_with("BSc Computer Science")));
        assert!(!context.iter().any(|c| c.contains("Acme Corp (")));
    }

    #[test]
    fn output_is_capped_in_assembly_order() {
        let mut content = content();
        content.projects = (0..20)
            .map(|i| Project {
                title: format!("P{}", i),
                description: "demo".into(),
                ..Default::default()
            })
            .collect();
        let context = select_context("projects", &content);
        assert_eq!(context.len(), MAX_CONTEXT_ITEMS);
        assert!(context[4].starts_with("Project P0"));
        assert!(context[9].starts_with("Project P5"));
    }

    #[test]
    fn selection_is_deterministic() {
        let c = content();
        let q = "tell me about the job at acme";
        assert_eq!(select_context(q, &c), select_context(q, &c));
    }
}
