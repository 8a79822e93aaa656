use serde::Serialize;

use super::table::Table;

/// Headline visit counts for a date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VisitStatistics {
    pub total_visits: i64,
    pub unique_patients: i64,
    pub clinics: i64,
    pub doctors: i64,
}

impl VisitStatistics {
    /// Read the single aggregate row produced by the statistics query.
    pub fn from_table(table: &Table) -> Option<Self> {
        let count = |column: &str| table.get(0, column).and_then(|v| v.as_i64());
        Some(Self {
            total_visits: count("total_kunjungan")?,
            unique_patients: count("total_pasien_unik")?,
            clinics: count("total_poliklinik")?,
            doctors: count("total_dokter")?,
        })
    }
}

/// Visits grouped by clinic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClinicVisits {
    pub clinic: String,
    pub visits: i64,
}

impl ClinicVisits {
    pub fn from_table(table: &Table) -> Vec<Self> {
        table
            .records()
            .filter_map(|r| {
                Some(Self {
                    clinic: r.get("nm_poli")?.as_str()?.to_string(),
                    visits: r.get("jumlah_kunjungan")?.as_i64()?,
                })
            })
            .collect()
    }
}

/// Visits grouped by registration hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HourlyVisits {
    pub hour: i64,
    pub visits: i64,
}

impl HourlyVisits {
    pub fn from_table(table: &Table) -> Vec<Self> {
        table
            .records()
            .filter_map(|r| {
                Some(Self {
                    hour: r.get("jam")?.as_i64()?,
                    visits: r.get("jumlah_kunjungan")?.as_i64()?,
                })
            })
            .collect()
    }
}
