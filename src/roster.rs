//! # Roster CSV
//!
//! Member import/export in the fixed six-column, header-free layout:
//! `email, first_name, last_name, phone, unit_number, ownership_share`.
//! Deliberately naive comma splitting with no quoting, matching the format
//! the admin tooling has always produced. Rows without an email are skipped;
//! an unparseable share becomes 0.
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    error::AppError,
    model::{Member, MemberRole},
    store::Store,
};

#[derive(Debug, Clone, PartialEq)]
pub struct MemberImport {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub unit_number: String,
    pub ownership_share: f64,
}

pub fn parse_members_csv(data: &str) -> Vec<MemberImport> {
    data.lines()
        .map(|line| {
            let values: Vec<&str> = line.split(',').map(|cell| cell.trim()).collect();
            let cell = |i: usize| values.get(i).copied().unwrap_or("").to_string();

            MemberImport {
                email: cell(0),
                first_name: cell(1),
                last_name: cell(2),
                phone: Some(cell(3)).filter(|p| !p.is_empty()),
                unit_number: cell(4),
                ownership_share: cell(5).parse().unwrap_or(0.0),
            }
        })
        .filter(|row| !row.email.is_empty())
        .collect()
}

pub fn export_members_csv(members: &[Member]) -> String {
    let header = "email,first_name,last_name,phone,unit_number,ownership_share,role";

    let rows = members.iter().map(|m| {
        format!(
            "{},{},{},{},{},{},{}",
            m.email,
            m.first_name,
            m.last_name,
            m.phone.as_deref().unwrap_or(""),
            m.unit_number,
            m.ownership_share,
            m.role.as_str(),
        )
    });

    std::iter::once(header.to_string())
        .chain(rows)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Parses and persists imported rows. Imported members join as active regular
/// members of the given building.
pub async fn import_members(
    store: &dyn Store,
    building_id: Uuid,
    csv_data: &str,
    now: DateTime<Utc>,
) -> Result<Vec<Member>, AppError> {
    let members: Vec<Member> = parse_members_csv(csv_data)
        .into_iter()
        .map(|row| Member {
            id: Uuid::new_v4(),
            building_id,
            email: row.email,
            first_name: row.first_name,
            last_name: row.last_name,
            phone: row.phone,
            unit_number: row.unit_number,
            ownership_share: row.ownership_share,
            role: MemberRole::Member,
            is_active: true,
            created_at: now,
            updated_at: now,
        })
        .collect();

    store.insert_members(&members).await?;

    Ok(members)
}
