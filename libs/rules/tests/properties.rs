//! Cross-module properties of compiled rule sets.

use std::collections::BTreeSet;

use jobrouter_expr::{JobAd, Value};
use jobrouter_rules::{attr, compile, marker, Category, CompileOptions, Compilation, SkipReason};
use jobrouter_sites::{SourceToDests, WhitelistKey};
use jobrouter_testing::{policy, sample_policy, JobBuilder};

fn compiled(doc: &jobrouter_policy::PolicyDocument) -> Compilation {
    compile(doc, &CompileOptions::default())
}

/// Jobs that together trigger every category of the sample policy.
fn job_pool() -> Vec<JobAd> {
    vec![
        JobBuilder::new("wf_alpha", "/wf_alpha/Gen").resizable().build(),
        JobBuilder::new("wf_alpha", "/wf_alpha/Digi")
            .sites("T2_US_Nebraska,T2_FR_GRIF")
            .build(),
        JobBuilder::new("wf_beta", "/wf_beta/Reco")
            .sites("T1_IT_CNAF")
            .memory(22_092)
            .resizable()
            .build(),
        JobBuilder::new("wf_beta", "/wf_beta/Merge").build(),
        JobBuilder::new("wf_gamma", "/wf_gamma/Skim").build(),
        JobBuilder::new("wf_delta", "/wf_delta/Skim")
            .with(marker::HAS_BEEN_SET_HELD, true)
            .with(attr::HELD_DESIRED_SITES, "T1_UK_RAL")
            .build(),
        JobBuilder::new("wf_t0", "/wf_t0/Express")
            .sites("T0_CH_CERN")
            .memory(15_200)
            .build(),
        JobBuilder::new("wf_eps", "/wf_eps/Multi")
            .sites("T2_ES_IFCA")
            .cpus(8)
            .build(),
        JobBuilder::new("wf_eps", "/wf_eps/Long")
            .sites("T1_DE_KIT")
            .with(attr::ORIGINAL_MAX_WALL_TIME, 2_000)
            .build(),
        JobBuilder::new("wf_drain", "/wf_drain/Proc")
            .job_id("vocms0250.cern.ch#123.0#1700000000")
            .build(),
        JobBuilder::new("wf_bari", "/wf_bari/Proc")
            .with("HasBeenHeldFromT2_IT_Bari", true)
            .build(),
    ]
    .into_iter()
    .map(|ad| {
        let mut ad = ad;
        ad.set(marker::HAS_BEEN_ROUTED, false);
        ad
    })
    .collect()
}

/// One pass over the rule set, applying every rule that matches in turn.
fn sweep(compilation: &Compilation, ad: &mut JobAd) -> usize {
    let mut fired = 0;
    for rule in &compilation.rules {
        if rule.matches(ad) {
            rule.apply(ad);
            fired += 1;
        }
    }
    fired
}

#[test]
fn test_every_rule_disables_itself() {
    let compilation = compiled(&sample_policy());
    let mut exercised = BTreeSet::new();

    for job in job_pool() {
        for rule in &compilation.rules {
            let mut ad = job.clone();
            if !rule.matches(&ad) {
                continue;
            }
            rule.apply(&mut ad);
            assert!(
                !rule.matches(&ad),
                "rule {:?} still matches after applying",
                rule.name()
            );
            exercised.insert(rule.category());
        }
    }

    let emitted: BTreeSet<Category> = compilation.counts().into_iter().map(|(c, _)| c).collect();
    assert_eq!(exercised, emitted);
}

#[test]
fn test_second_sweep_changes_nothing() {
    let compilation = compiled(&sample_policy());

    for mut ad in job_pool() {
        assert!(sweep(&compilation, &mut ad) > 0);
        let after_first = ad.clone();
        assert_eq!(sweep(&compilation, &mut ad), 0);
        assert_eq!(ad, after_first);
    }
}

#[test]
fn test_reset_rule_disables_itself() {
    let compilation = compiled(&policy(r#"{"reset_routing": ["HasBeenMemoryTuned"]}"#));
    let rule = compilation
        .rules
        .by_category(Category::Reset)
        .next()
        .expect("reset rule");

    let mut ad = JobBuilder::new("wf", "/wf/A")
        .with(marker::HAS_BEEN_MEMORY_TUNED, true)
        .build();
    assert!(rule.matches(&ad));
    rule.apply(&mut ad);
    assert!(!rule.matches(&ad));
    assert_eq!(ad.eval_attr(marker::HAS_BEEN_MEMORY_TUNED), Value::Bool(false));
}

#[test]
fn test_task_keyed_categories_are_mutually_exclusive() {
    let doc = policy(
        r#"{
            "memory": {"2000": ["/wf/A", "/wf/B"], "4000": ["/wf/A", "/wf/C"]},
            "time": {"600": ["/wf/A"], "900": ["/wf/B"]},
            "slope": {"100": ["/wf/A", "/wf/C"], "250": ["/wf/C"]},
            "read": {"3000": ["/wf/B"], "5000": ["/wf/A", "/wf/B"]},
            "resizing": {
                "/wf/A": {"memoryPerThread": 1000},
                "/wf/B": {"memoryPerThread": 2000}
            },
            "overflow": {
                "reversed_mapping": {"T2_US_MIT": ["T1_US_FNAL"], "T2_US_Purdue": ["T1_US_FNAL"]},
                "modifications": {
                    "wf1": {"/wf/A": {"AddWhitelist": ["T2_US_MIT"]}},
                    "wf2": {"/wf/A": {"AddWhitelist": ["T2_US_Purdue"]}, "/wf/B": {"AddWhitelist": ["T2_US_Purdue"]}}
                }
            }
        }"#,
    );
    let compilation = compiled(&doc);

    for task in ["/wf/A", "/wf/B", "/wf/C"] {
        let ad = JobBuilder::new("wf", task).resizable().build();
        for category in [
            Category::Overflow,
            Category::Memory,
            Category::Time,
            Category::Slope,
            Category::Resize,
            Category::Read,
        ] {
            let matching = compilation
                .rules
                .by_category(category)
                .filter(|r| r.matches(&ad))
                .count();
            assert!(matching <= 1, "{task}: {matching} {category} rules match");
        }
    }

    // Each task stays under its lowest threshold.
    for (category, task, kept) in [
        (Category::Memory, "/wf/A", "2000"),
        (Category::Slope, "/wf/C", "100"),
        (Category::Read, "/wf/B", "3000"),
    ] {
        assert!(compilation.skipped.iter().any(|s| s.category == category
            && matches!(
                &s.reason,
                SkipReason::DuplicateTask { task: t, kept: k, .. } if t == task && k == kept
            )));
    }
}

#[test]
fn test_one_rule_per_distinct_threshold() {
    let compilation = compiled(&policy(
        r#"{"memory": {"2000": ["taskA", "taskB"], "4000": ["taskC"]}}"#,
    ));
    let memory: Vec<_> = compilation.rules.by_category(Category::Memory).collect();
    assert_eq!(memory.len(), 2);

    let selects = |task: &str| {
        let ad = JobBuilder::new("wf", task).build();
        memory.iter().position(|r| r.matches(&ad))
    };
    assert_eq!(selects("taskA"), Some(0));
    assert_eq!(selects("taskB"), Some(0));
    assert_eq!(selects("taskC"), Some(1));
    assert_eq!(
        memory[0].guard().to_string(),
        r#"member(WMAgent_SubTaskName, { "taskA", "taskB" }) && HasBeenMemoryTuned =!= true && OriginalMemory =!= 2000"#
    );
}

#[test]
fn test_site_mapping_is_scoped_to_whitelist() {
    let reversed = [(
        "T2_X".to_string(),
        vec!["T1_A".to_string(), "T1_B".to_string()],
    )]
    .into_iter()
    .collect();
    let mapping = SourceToDests::invert(&reversed);

    let x = WhitelistKey::canonical(["T2_X"]).expect("key");
    assert_eq!(mapping.scoped(&x).get("T1_B"), Some(&["T2_X".to_string()][..]));

    let y = WhitelistKey::canonical(["T2_Y"]).expect("key");
    let scoped = mapping.scoped(&y);
    assert_eq!(scoped.get("T1_B"), None);
    assert!(scoped.is_empty());
}

#[test]
fn test_hold_then_release_restores_whitelist() {
    let mut ad = JobBuilder::new("wf", "/wf/A")
        .sites("T1_US_FNAL,T2_CH_CERN")
        .build();

    let hold = compiled(&policy(r#"{"hold": {"/wf/A": []}}"#));
    sweep(&hold, &mut ad);
    assert_eq!(ad.eval_attr(attr::DESIRED_SITES), Value::from("T2_NW_NOWHERE"));
    assert_eq!(ad.eval_attr(marker::HAS_BEEN_SET_HELD), Value::Bool(true));

    let release = compiled(&policy(r#"{"release": {"/wf/A": []}}"#));
    sweep(&release, &mut ad);
    assert_eq!(
        ad.eval_attr(attr::DESIRED_SITES),
        Value::from("T1_US_FNAL,T2_CH_CERN")
    );
    assert_eq!(ad.eval_attr(marker::HAS_BEEN_SET_HELD), Value::Bool(false));
}

#[test]
fn test_invalid_site_is_skipped_alone() {
    let compilation = compiled(&policy(
        r#"{"hold_site": ["not_a_site", "T2_FR_GRIF"], "release_site": ["T2_IT_Bari", "CERN"]}"#,
    ));

    let names: Vec<&str> = compilation
        .rules
        .iter()
        .filter(|r| matches!(r.category(), Category::HoldSite | Category::ReleaseSite))
        .map(|r| r.name())
        .collect();
    assert_eq!(
        names,
        vec!["Holding jobs from T2_FR_GRIF", "Releasing jobs for T2_IT_Bari"]
    );

    let invalid: Vec<(Category, &SkipReason)> = compilation
        .skipped
        .iter()
        .map(|s| (s.category, &s.reason))
        .collect();
    assert_eq!(
        invalid,
        vec![
            (
                Category::HoldSite,
                &SkipReason::InvalidSite {
                    site: "not_a_site".to_string()
                }
            ),
            (
                Category::ReleaseSite,
                &SkipReason::InvalidSite {
                    site: "CERN".to_string()
                }
            ),
        ]
    );
}

#[test]
fn test_emission_order_is_exact() {
    let compilation = compiled(&sample_policy());
    let names: Vec<&str> = compilation.rules.iter().map(|r| r.name()).collect();
    assert_eq!(
        names,
        vec![
            "Site Replacement for /wf_beta/Merge",
            "Master overflow rule to run at T2_CH_CERN in addition",
            "Master overflow rule to run at T2_US_MIT,T2_US_Purdue in addition",
            "Sort Ads",
            "Prio Corrections",
            "Set memory requirement to 2000",
            "Set memory requirement to 4000",
            "Set timing requirement to 600",
            "Set memory per thread requirement to 250",
            "Resize Jobs (2-4 cores, 1500 MB/thread)",
            "Resize Jobs (3-8 cores, 2000 MB/thread)",
            "Set read requirement to 5000",
            "Holding tasks",
            "Releasing tasks",
            "Holding jobs from T2_FR_GRIF",
            "Releasing jobs for T2_IT_Bari",
            "Raising to highprio group",
            "Drain agent vocms0250",
            "Correcting memory requirement of 22092",
            "Correcting memory requirement of 23260",
            "Correcting memory requirement of 15200 for T0",
            "Draining T0 VMs",
            "Routing multicore job from IFCA to other sites",
            "Shortening long job on KIT",
        ]
    );

    let positions: Vec<usize> = compilation.rules.iter().map(|r| r.category().position()).collect();
    assert!(positions.windows(2).all(|w| w[0] <= w[1]));
    assert!(compilation.skipped.is_empty());
}

#[test]
fn test_compilation_is_deterministic() {
    let first = compiled(&sample_policy());
    let second = compiled(&sample_policy());
    assert_eq!(
        first.rules.fingerprint().expect("fingerprint"),
        second.rules.fingerprint().expect("fingerprint")
    );
}

// Site matching is an unanchored regex: holding a site also matches any
// site whose name contains it.
#[test]
fn test_site_hold_matches_longer_site_names() {
    let compilation = compiled(&policy(r#"{"hold_site": ["T2_CH_CERN"]}"#));
    let rule = compilation
        .rules
        .by_category(Category::HoldSite)
        .next()
        .expect("hold-site rule");

    let hlt = JobBuilder::new("wf", "/wf/A").sites("T2_CH_CERN_HLT").build();
    assert!(rule.matches(&hlt));

    let mut ad = hlt.clone();
    rule.apply(&mut ad);
    // Removal is exact, so the longer name survives.
    assert_eq!(ad.eval_attr(attr::DESIRED_SITES), Value::from("T2_CH_CERN_HLT"));

    // The job is marked as held, so a later release adds the site it never had.
    let released = compiled(&policy(r#"{"release_site": ["T2_CH_CERN"]}"#));
    let release = released
        .rules
        .by_category(Category::ReleaseSite)
        .next()
        .expect("release-site rule");
    assert!(release.matches(&ad));
    release.apply(&mut ad);
    assert_eq!(
        ad.eval_attr(attr::DESIRED_SITES),
        Value::from("T2_CH_CERN_HLT,T2_CH_CERN")
    );
}
