//! SQL text for the report entry points. All values are bound positionally.

/// Clinic codes that never appear in the registration report.
pub const EXCLUDED_CLINICS: [&str; 6] = ["IGDK", "HDL", "BBL", "IRM", "006", "U0016"];

/// Continuation status of inpatient admissions, excluded from the report.
pub const INPATIENT_STATUS: &str = "Ranap";

/// Columns produced by [`PATIENT_REGISTRATIONS`], in order.
pub const REGISTRATION_COLUMNS: [&str; 20] = [
    "no_rawat",
    "tgl_registrasi",
    "jam_reg",
    "kd_dokter",
    "nm_dokter",
    "no_rkm_medis",
    "nm_pasien",
    "kd_poli",
    "nm_poli",
    "status_lanjut",
    "kd_pj",
    "png_jawab",
    "tanggal_periksa",
    "nomor_kartu",
    "nomor_referensi",
    "kodebooking",
    "jenis_kunjungan",
    "status_kirim",
    "keterangan",
    "USER",
];

/// Outpatient registrations joined with their BPJS referral and SEP.
///
/// Binds: `start, end, start, end`.
pub const PATIENT_REGISTRATIONS: &str = "\
SELECT
    rp.no_rawat,
    rp.tgl_registrasi,
    rp.jam_reg,
    rp.kd_dokter,
    d.nm_dokter,
    rp.no_rkm_medis,
    pas.nm_pasien,
    rp.kd_poli,
    p.nm_poli,
    rp.status_lanjut,
    rp.kd_pj,
    pj.png_jawab,
    mar.tanggal_periksa,
    mar.nomor_kartu,
    mar.nomor_referensi,
    mar.kodebooking,
    mar.jenis_kunjungan,
    mar.status_kirim,
    mar.keterangan,
    bs.USER
FROM
    reg_periksa rp
    JOIN mlite_antrian_referensi mar ON rp.no_rkm_medis = mar.no_rkm_medis
    JOIN poliklinik p ON rp.kd_poli = p.kd_poli
    JOIN dokter d ON rp.kd_dokter = d.kd_dokter
    JOIN penjab pj ON rp.kd_pj = pj.kd_pj
    JOIN pasien pas ON rp.no_rkm_medis = pas.no_rkm_medis
    JOIN bridging_sep bs ON rp.no_rawat = bs.no_rawat
WHERE
    rp.tgl_registrasi BETWEEN ? AND ?
    AND mar.tanggal_periksa BETWEEN ? AND ?
    AND rp.kd_poli NOT IN ('IGDK', 'HDL', 'BBL', 'IRM', '006', 'U0016')
    AND rp.status_lanjut NOT IN ('Ranap')
ORDER BY
    rp.no_rawat";

/// Every query-log row created in the range, newest first.
///
/// Binds: `start, end`.
pub const SERVICE_LOGS: &str = "\
SELECT
    *
FROM
    mlite_query_logs
WHERE
    DATE(created_at) BETWEEN ? AND ?
ORDER BY
    created_at DESC";

/// Binds: `start, end`.
pub const VISIT_STATISTICS: &str = "\
SELECT
    COUNT(*) AS total_kunjungan,
    COUNT(DISTINCT rp.no_rkm_medis) AS total_pasien_unik,
    COUNT(DISTINCT rp.kd_poli) AS total_poliklinik,
    COUNT(DISTINCT rp.kd_dokter) AS total_dokter
FROM reg_periksa rp
WHERE rp.tgl_registrasi BETWEEN ? AND ?";

/// Binds: `start, end, limit`.
pub const TOP_CLINICS: &str = "\
SELECT
    p.nm_poli,
    COUNT(*) AS jumlah_kunjungan
FROM reg_periksa rp
JOIN poliklinik p ON rp.kd_poli = p.kd_poli
WHERE rp.tgl_registrasi BETWEEN ? AND ?
GROUP BY rp.kd_poli, p.nm_poli
ORDER BY jumlah_kunjungan DESC
LIMIT ?";

/// Binds: `start, end`.
pub const HOURLY_DISTRIBUTION: &str = "\
SELECT
    HOUR(rp.jam_reg) AS jam,
    COUNT(*) AS jumlah_kunjungan
FROM reg_periksa rp
WHERE rp.tgl_registrasi BETWEEN ? AND ?
GROUP BY HOUR(rp.jam_reg)
ORDER BY jam";
