//! Static table registry. Each entry turns into a fully mounted CRUD router;
//! adding a table here is all it takes to expose it under `/api/{table}`.

use crate::domain::table::{FieldSpec, IdColumn, IdKind, TableDescriptor};
use std::sync::LazyLock;

static TABLES: LazyLock<Vec<TableDescriptor>> = LazyLock::new(|| {
    vec![
        TableDescriptor {
            name: "users",
            id_columns: vec![IdColumn::new("id", IdKind::Uuid)],
            fields: vec![
                FieldSpec::text("email").required().email(),
                FieldSpec::text("password_hash").required().min_len(10),
                FieldSpec::text("role").required().min_len(2),
                FieldSpec::text("phone_number").max_len(20),
                FieldSpec::timestamp("created_at"),
            ],
            write_requires_auth: true,
        },
        TableDescriptor {
            name: "skills",
            id_columns: vec![IdColumn::new("id", IdKind::Int)],
            fields: vec![FieldSpec::text("skill_name").required().min_len(1)],
            write_requires_auth: true,
        },
        TableDescriptor {
            name: "job_categories",
            id_columns: vec![IdColumn::new("id", IdKind::Int)],
            fields: vec![FieldSpec::text("name").required().min_len(1)],
            write_requires_auth: true,
        },
        TableDescriptor {
            name: "locations",
            id_columns: vec![IdColumn::new("id", IdKind::Int)],
            fields: vec![
                FieldSpec::text("department").required().min_len(1),
                FieldSpec::text("municipality").required().min_len(1),
            ],
            write_requires_auth: true,
        },
        TableDescriptor {
            name: "company_profiles",
            id_columns: vec![IdColumn::new("user_id", IdKind::Uuid)],
            fields: vec![
                FieldSpec::uuid("user_id").required(),
                FieldSpec::text("company_name").required().min_len(1),
                FieldSpec::text("description"),
                FieldSpec::text("industry"),
                FieldSpec::text("website_url").url(),
                FieldSpec::text("logo_url").url(),
                FieldSpec::text("address"),
            ],
            write_requires_auth: true,
        },
        TableDescriptor {
            name: "candidate_profiles",
            id_columns: vec![IdColumn::new("user_id", IdKind::Uuid)],
            fields: vec![
                FieldSpec::uuid("user_id").required(),
                FieldSpec::text("full_name").required().min_len(1),
                FieldSpec::text("professional_title"),
                FieldSpec::text("bio"),
                FieldSpec::text("profile_picture_url").url(),
                FieldSpec::text("resume_url").url(),
            ],
            write_requires_auth: true,
        },
        TableDescriptor {
            name: "jobs",
            id_columns: vec![IdColumn::new("id", IdKind::Uuid)],
            fields: vec![
                FieldSpec::uuid("company_id").required(),
                FieldSpec::text("title").required().min_len(1),
                FieldSpec::text("description").required().min_len(1),
                FieldSpec::text("requirements"),
                FieldSpec::integer("job_category_id"),
                FieldSpec::integer("location_id"),
                FieldSpec::text("employment_type").required().min_len(1),
                FieldSpec::float("salary_min").min(0.0),
                FieldSpec::float("salary_max").min(0.0),
                FieldSpec::text("salary_currency"),
                FieldSpec::text("status"),
                FieldSpec::timestamp("expires_at"),
                FieldSpec::timestamp("created_at"),
            ],
            write_requires_auth: true,
        },
        TableDescriptor {
            name: "education",
            id_columns: vec![IdColumn::new("id", IdKind::Uuid)],
            fields: vec![
                FieldSpec::uuid("candidate_id").required(),
                FieldSpec::text("institution_name").required().min_len(1),
                FieldSpec::text("degree").required().min_len(1),
                FieldSpec::text("field_of_study"),
                FieldSpec::timestamp("start_date").required(),
                FieldSpec::timestamp("end_date"),
            ],
            write_requires_auth: true,
        },
        TableDescriptor {
            name: "work_experience",
            id_columns: vec![IdColumn::new("id", IdKind::Uuid)],
            fields: vec![
                FieldSpec::uuid("candidate_id").required(),
                FieldSpec::text("job_title").required().min_len(1),
                FieldSpec::text("company_name").required().min_len(1),
                FieldSpec::text("description"),
                FieldSpec::timestamp("start_date").required(),
                FieldSpec::timestamp("end_date"),
            ],
            write_requires_auth: true,
        },
        TableDescriptor {
            name: "candidate_skills",
            id_columns: vec![IdColumn::new("candidate_id", IdKind::Uuid), IdColumn::new("skill_id", IdKind::Int)],
            fields: vec![FieldSpec::uuid("candidate_id").required(), FieldSpec::integer("skill_id").required()],
            write_requires_auth: true,
        },
        TableDescriptor {
            name: "job_applications",
            id_columns: vec![IdColumn::new("id", IdKind::Uuid)],
            fields: vec![
                FieldSpec::uuid("job_id").required(),
                FieldSpec::uuid("candidate_id").required(),
                FieldSpec::text("status").required().min_len(1),
                FieldSpec::text("cover_letter"),
                FieldSpec::timestamp("applied_at"),
            ],
            write_requires_auth: true,
        },
        TableDescriptor {
            name: "conversations",
            id_columns: vec![IdColumn::new("id", IdKind::Uuid)],
            fields: vec![
                FieldSpec::uuid("job_application_id"),
                FieldSpec::timestamp("last_message_at"),
                FieldSpec::timestamp("created_at"),
            ],
            write_requires_auth: true,
        },
        TableDescriptor {
            name: "conversation_participants",
            id_columns: vec![IdColumn::new("user_id", IdKind::Uuid), IdColumn::new("conversation_id", IdKind::Uuid)],
            fields: vec![FieldSpec::uuid("user_id").required(), FieldSpec::uuid("conversation_id").required()],
            write_requires_auth: true,
        },
        TableDescriptor {
            name: "messages",
            id_columns: vec![IdColumn::new("id", IdKind::Uuid)],
            fields: vec![
                FieldSpec::uuid("conversation_id").required(),
                FieldSpec::uuid("sender_id").required(),
                FieldSpec::text("message_text").required().min_len(1),
                FieldSpec::timestamp("created_at"),
            ],
            write_requires_auth: true,
        },
        TableDescriptor {
            name: "reviews",
            id_columns: vec![IdColumn::new("id", IdKind::Uuid)],
            fields: vec![
                FieldSpec::uuid("job_application_id").required(),
                FieldSpec::text("author_role").required().min_len(1),
                FieldSpec::text("subject_role").required().min_len(1),
                FieldSpec::integer("rating").required().min(1.0).max(5.0),
                FieldSpec::text("comment"),
                FieldSpec::timestamp("created_at"),
            ],
            write_requires_auth: true,
        },
    ]
});

#[must_use]
pub fn all() -> &'static [TableDescriptor] {
    &TABLES
}

#[must_use]
pub fn find(name: &str) -> Option<&'static TableDescriptor> {
    TABLES.iter().find(|t| t.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_names_are_unique() {
        let mut names: Vec<_> = all().iter().map(|t| t.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), all().len());
    }

    #[test]
    fn composite_key_tables_declare_two_id_columns() {
        assert_eq!(find("candidate_skills").unwrap().id_columns.len(), 2);
        assert_eq!(find("conversation_participants").unwrap().id_columns.len(), 2);
        assert_eq!(find("jobs").unwrap().id_columns.len(), 1);
    }

    #[test]
    fn every_table_has_at_least_one_field() {
        for table in all() {
            assert!(!table.fields.is_empty(), "{} has no fields", table.name);
            assert!(!table.id_columns.is_empty(), "{} has no id columns", table.name);
        }
    }
}
