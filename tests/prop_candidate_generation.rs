// Property: candidate lists are deterministic, bounded, duplicate-free, never
// contain the original URL, preserve the path and sweep every other shard.

use proptest::prelude::*;
use shard_mirror::candidate_generator::CandidateGenerator;
use shard_mirror::config::MirrorConfig;
use shard_mirror::url_parser::parse_reference;
use std::collections::HashSet;
use std::sync::Arc;

const MAX_ATTEMPTS: usize = 30;

fn default_generator() -> CandidateGenerator {
    CandidateGenerator::new(Arc::new(MirrorConfig::default()))
}

fn sharded_url() -> impl Strategy<Value = String> {
    (
        prop_oneof![Just("k"), Just("n"), Just("s"), Just("zz")],
        0u16..40,
        prop_oneof![Just("mbdny.org"), Just("bato.to"), Just("mbqgu.org"), Just("other.net")],
        prop_oneof![Just(String::new()), "(/[a-z0-9]{1,8}){1,3}(\\.jpg)?"],
    )
        .prop_map(|(prefix, shard, root, path)| {
            format!("https://{}{:02}.{}{}", prefix, shard, root, path)
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_generation_is_deterministic(url in sharded_url()) {
        let parsed = parse_reference(&url).unwrap();
        let first = default_generator().generate(&parsed);
        let second = default_generator().generate(&parsed);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_bounded_unique_and_excludes_original(url in sharded_url()) {
        let parsed = parse_reference(&url).unwrap();
        let candidates = default_generator().generate(&parsed);

        prop_assert!(candidates.len() <= MAX_ATTEMPTS);
        prop_assert!(!candidates.contains(&url), "original URL {} in candidates", url);
        prop_assert!(!candidates.contains(&parsed.to_url()));

        let unique: HashSet<&String> = candidates.iter().collect();
        prop_assert_eq!(unique.len(), candidates.len());
    }

    #[test]
    fn prop_every_candidate_keeps_path_and_differs(url in sharded_url()) {
        let parsed = parse_reference(&url).unwrap();
        for candidate in default_generator().generate(&parsed).iter() {
            prop_assert!(candidate.starts_with("https://"));

            let reparsed = parse_reference(candidate).unwrap();
            prop_assert_eq!(&reparsed.path, &parsed.path);
            prop_assert!(
                reparsed.prefix != parsed.prefix
                    || reparsed.shard_number != parsed.shard_number
                    || reparsed.root_domain != parsed.root_domain,
                "candidate {} does not differ from {}", candidate, url
            );
        }
    }

    /// With swap strategies disabled the list is exactly the shard sweep
    #[test]
    fn prop_shard_sweep_covers_all_other_shards(shard in 0u16..=15) {
        let config = MirrorConfig {
            fallback_prefixes: Vec::new(),
            fallback_roots: Vec::new(),
            ..Default::default()
        };
        let url = format!("https://k{:02}.mbdny.org/a.jpg", shard);
        let parsed = parse_reference(&url).unwrap();
        let candidates = CandidateGenerator::new(Arc::new(config)).generate(&parsed);

        let expected: Vec<String> = (0u16..=15)
            .filter(|n| *n != shard)
            .map(|n| format!("https://k{:02}.mbdny.org/a.jpg", n))
            .collect();
        prop_assert_eq!(candidates.as_slice(), expected.as_slice());
    }

    #[test]
    fn prop_cap_is_respected(max_attempts in 1usize..40) {
        let config = MirrorConfig {
            max_attempts,
            ..Default::default()
        };
        let parsed = parse_reference("https://zz07.other.net/a.jpg").unwrap();
        let candidates = CandidateGenerator::new(Arc::new(config)).generate(&parsed);
        // 9 prefixes + 6 roots + 15 shards are available for this reference
        prop_assert_eq!(candidates.len(), max_attempts.min(30));
    }
}

#[test]
fn test_shard_sweep_example() {
    let parsed = parse_reference("https://k02.mbdny.org/a.jpg").unwrap();
    let candidates = default_generator().generate(&parsed);

    assert!(candidates.contains("https://k00.mbdny.org/a.jpg"));
    assert!(candidates.contains("https://k01.mbdny.org/a.jpg"));
    assert!(candidates.contains("https://k03.mbdny.org/a.jpg"));
    assert!(candidates.contains("https://k15.mbdny.org/a.jpg"));
    assert!(!candidates.contains("https://k02.mbdny.org/a.jpg"));
    assert!(!candidates.contains("https://k16.mbdny.org/a.jpg"));
}

#[test]
fn test_host_only_reference_keeps_empty_path() {
    let parsed = parse_reference("https://k05.mbdny.org").unwrap();
    let candidates = default_generator().generate(&parsed);

    assert_eq!(candidates.get(0), Some("https://n05.mbdny.org"));
    assert!(candidates.contains("https://k00.mbdny.org"));
    assert!(!candidates.contains("https://k00.mbdny.org.jpg"));
    for candidate in candidates.iter() {
        assert_eq!(parse_reference(candidate).unwrap().path, "");
    }
}
