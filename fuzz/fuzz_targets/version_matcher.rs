#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use nvdmirror_core::types::VersionBounds;
use nvdmirror_vuln_matcher::{VerdictReason, evaluate};

/// 퍼저용 구조적 입력
#[derive(Arbitrary, Debug)]
struct FuzzInput {
    installed: String,
    start_including: Option<String>,
    end_excluding: Option<String>,
    end_including: Option<String>,
}

fuzz_target!(|input: FuzzInput| {
    let bounds = VersionBounds {
        start_including: input.start_including,
        end_excluding: input.end_excluding,
        end_including: input.end_including,
    };
    let verdict = evaluate(&input.installed, &bounds);

    match verdict.reason {
        VerdictReason::DefiniteVulnerable
        | VerdictReason::VulnerableOpenEnded
        | VerdictReason::AssumedVulnerableIncomparable { .. } => assert!(verdict.vulnerable),
        VerdictReason::DefiniteSane | VerdictReason::UnknownInsufficientPrecision => {
            assert!(!verdict.vulnerable)
        }
    }
});
