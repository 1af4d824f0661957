use crate::models::UserProfile;

/// Concatenate the discoverable fields of a profile into one line of text.
///
/// Order is fixed: name, username, title, location, custom status, then each
/// visible work experience (title, company), education entry (degree,
/// institution, field of study) and project (title, company). Hidden
/// entries and empty fields are skipped and whitespace is collapsed, so the
/// same field values always yield the same text.
pub fn build_searchable_text(profile: &UserProfile) -> String {
    let mut parts: Vec<&str> = vec![profile.name.as_str(), profile.username.as_str()];
    parts.extend(profile.title.as_deref());
    parts.extend(profile.location.as_deref());
    parts.extend(profile.custom_status.as_deref());

    for exp in profile.experience.iter().filter(|e| !e.hidden) {
        parts.push(&exp.title);
        parts.push(&exp.company);
    }
    for edu in profile.education.iter().filter(|e| !e.hidden) {
        parts.push(&edu.degree);
        parts.push(&edu.institution);
        parts.extend(edu.field_of_study.as_deref());
    }
    for project in profile.projects.iter().filter(|p| !p.hidden) {
        parts.push(&project.title);
        parts.extend(project.company.as_deref());
    }

    parts
        .iter()
        .flat_map(|part| part.split_whitespace())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Contact, Education, Project, SearchState, WorkExperience};
    use chrono::Utc;
    use uuid::Uuid;

    fn profile() -> UserProfile {
        UserProfile {
            id: Uuid::new_v4(),
            name: "Alice   Smith".to_string(),
            username: "alice".to_string(),
            title: Some("Software Engineer".to_string()),
            about: Some("Not indexed".to_string()),
            location: Some("  Vancouver ".to_string()),
            website: Some("https://alice.dev".to_string()),
            custom_status: Some(String::new()),
            image: None,
            created_at: Utc::now(),
            experience: vec![
                WorkExperience {
                    id: Uuid::new_v4(),
                    title: "Backend Developer".to_string(),
                    company: "Acme".to_string(),
                    hidden: false,
                },
                WorkExperience {
                    id: Uuid::new_v4(),
                    title: "Secret Agent".to_string(),
                    company: "Hidden Corp".to_string(),
                    hidden: true,
                },
            ],
            education: vec![Education {
                id: Uuid::new_v4(),
                degree: "BSc".to_string(),
                institution: "UBC".to_string(),
                field_of_study: Some("Computer\nScience".to_string()),
                hidden: false,
            }],
            projects: vec![Project {
                id: Uuid::new_v4(),
                title: "Search Engine".to_string(),
                company: None,
                description: Some("Not indexed either".to_string()),
                hidden: false,
            }],
            contacts: vec![Contact {
                id: Uuid::new_v4(),
                kind: "email".to_string(),
                value: "alice@example.com".to_string(),
                hidden: false,
            }],
            search: SearchState::default(),
        }
    }

    #[test]
    fn test_field_order_and_whitespace() {
        assert_eq!(
            build_searchable_text(&profile()),
            "Alice Smith alice Software Engineer Vancouver Backend Developer Acme \
             BSc UBC Computer Science Search Engine"
        );
    }

    #[test]
    fn test_hidden_entries_excluded() {
        let text = build_searchable_text(&profile());
        assert!(!text.contains("Secret"));
        assert!(!text.contains("Hidden Corp"));
    }

    #[test]
    fn test_non_discoverable_fields_excluded() {
        let text = build_searchable_text(&profile());
        assert!(!text.contains("Not indexed"));
        assert!(!text.contains("alice@example.com"));
        assert!(!text.contains("alice.dev"));
    }

    #[test]
    fn test_deterministic() {
        let p = profile();
        assert_eq!(build_searchable_text(&p), build_searchable_text(&p));
    }

    #[test]
    fn test_minimal_profile() {
        let mut p = profile();
        p.title = None;
        p.location = None;
        p.experience.clear();
        p.education.clear();
        p.projects.clear();
        assert_eq!(build_searchable_text(&p), "Alice Smith alice");
    }
}
