//! Inventory scan integration tests: bootstrap store, scan inventory, write audits

use std::path::{Path, PathBuf};

use nvdmirror_record_store::{RecordStore, RecordStoreConfig};
use nvdmirror_vuln_matcher::{
    FINDINGS_HEADER, FindingsAudit, VerdictReason, VulnScanner, load_inventory,
};

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn bootstrapped_store(dir: &Path) -> RecordStore {
    let config =
        RecordStoreConfig::new(dir.join("partitions")).with_audit_dir(dir.join("audit"));
    let mut store = RecordStore::open(config).unwrap();
    let summary = store.import_file(&fixture_path("history.csv")).unwrap();
    assert_eq!(summary.total_appended(), 6);
    store
}

/// Every inventory entry is judged against each matching CVE row
#[test]
fn test_scan_inventory_against_bootstrapped_store() {
    let dir = tempfile::tempdir().unwrap();
    let store = bootstrapped_store(dir.path());
    let inventory = load_inventory(&fixture_path("inventory.json")).unwrap();

    let report = VulnScanner::new(&store).scan(&inventory).unwrap();
    assert_eq!(report.packages_scanned, 5);
    assert_eq!(report.findings.len(), 8);

    let vulnerable: Vec<(&str, &str)> = report
        .vulnerable()
        .map(|f| (f.package.as_str(), f.cve_id.as_str()))
        .collect();
    assert_eq!(
        vulnerable,
        [
            ("commons_text", "CVE-2022-42889"),
            ("log4j", "CVE-2021-44228"),
            ("log4j", "CVE-2021-45046"),
            ("openssl", "CVE-2022-0778"),
        ]
    );

    // 1.1.1k cannot be compared numerically against 1.1.1
    let edge = report
        .findings
        .iter()
        .find(|f| f.version == "1.1.1k" && f.cve_id == "CVE-2022-0778")
        .unwrap();
    assert_eq!(
        edge.reason,
        VerdictReason::AssumedVulnerableIncomparable {
            component: "1k".to_owned(),
            version: "1.1.1k".to_owned(),
        }
    );

    // exclusive upper bound equal to the installed version
    let web = report
        .findings
        .iter()
        .find(|f| f.version == "3.0.9" && f.cve_id == "CVE-2023-2650")
        .unwrap();
    assert!(!web.vulnerable);
    assert_eq!(web.reason, VerdictReason::DefiniteSane);
}

/// Package-name searches leave a per-package audit of the matched rows
#[test]
fn test_search_audit_written_per_package() {
    let dir = tempfile::tempdir().unwrap();
    let store = bootstrapped_store(dir.path());
    let inventory = load_inventory(&fixture_path("inventory.json")).unwrap();

    VulnScanner::new(&store).scan(&inventory).unwrap();

    let openssl_audit = dir.path().join("audit").join("search_openssl.csv");
    let content = std::fs::read_to_string(&openssl_audit).unwrap();
    assert_eq!(content.lines().count(), 3, "header plus two openssl rows");
    assert!(content.contains("CVE-2022-0778"));
    assert!(content.contains("CVE-2023-2650"));
}

/// The findings audit carries one row per verdict with the documented columns
#[test]
fn test_findings_audit_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let store = bootstrapped_store(dir.path());
    let inventory = load_inventory(&fixture_path("inventory.json")).unwrap();
    let report = VulnScanner::new(&store).scan(&inventory).unwrap();

    let audit = FindingsAudit::new(dir.path().join("findings.csv"));
    assert_eq!(audit.write(&report.findings).unwrap(), 8);

    let mut reader = csv::Reader::from_path(audit.path()).unwrap();
    let header: Vec<String> = reader.headers().unwrap().iter().map(str::to_owned).collect();
    assert_eq!(header, FINDINGS_HEADER);

    let rows: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
    assert_eq!(rows.len(), 8);

    let commons = rows.iter().find(|r| &r[1] == "commons_text").unwrap();
    assert_eq!(&commons[0], "pom.xml");
    assert_eq!(&commons[3], "true");
    assert_eq!(&commons[6], "1.9");
    assert_eq!(&commons[7], "");
    assert_eq!(&commons[8], "definite-vulnerable");
    assert_eq!(&commons[9], "Variable interpolation, arbitrary code execution");
}
