//! Overflow routing: per-task whitelist replacement and grouped additive
//! whitelists expanded through the site mapping.

use std::collections::BTreeMap;

use jobrouter_expr::{guard, CmpOp, Expr, Func, Value};
use jobrouter_policy::PolicyDocument;
use jobrouter_sites::{sitelist, GroupInsert, SiteMapGroup, SourceToDests, WhitelistGroups};

use super::{Context, SkipReason};
use crate::{attr, marker, Category, Rule};

const CATEGORY: Category = Category::Overflow;

pub(super) fn compile(doc: &PolicyDocument, ctx: &mut Context<'_>) -> Vec<Rule> {
    let modifications = &doc.overflow.modifications;
    let mut rules = Vec::new();

    // Replacements first: a replaced task never joins an additive group.
    let mut replaced: BTreeMap<&str, &str> = BTreeMap::new();
    for (workflow, tasks) in modifications {
        for (task, modification) in tasks {
            let Some(sites) = &modification.replace_site_whitelist else {
                continue;
            };
            if let Some(kept) = replaced.get(task.as_str()) {
                ctx.skip(
                    CATEGORY,
                    SkipReason::DuplicateTask {
                        task: task.clone(),
                        kept: format!("replacement from {kept}"),
                        ignored: format!("replacement from {workflow}"),
                    },
                );
                continue;
            }
            replaced.insert(task.as_str(), workflow.as_str());

            match replacement_rule(task, &checked_sites(sites, ctx)) {
                Some(rule) => rules.push(rule),
                None => ctx.skip(CATEGORY, SkipReason::EmptyWhitelist { task: task.clone() }),
            }
        }
    }

    let mut groups = WhitelistGroups::new();
    for tasks in modifications.values() {
        for (task, modification) in tasks {
            if modification.replace_site_whitelist.is_some() {
                continue;
            }
            let Some(sites) = &modification.add_whitelist else {
                continue;
            };
            if replaced.contains_key(task.as_str()) {
                ctx.skip(
                    CATEGORY,
                    SkipReason::DuplicateTask {
                        task: task.clone(),
                        kept: "site replacement".to_string(),
                        ignored: sitelist::join(sites),
                    },
                );
                continue;
            }

            match groups.insert(task, checked_sites(sites, ctx)) {
                GroupInsert::Added(_) => {}
                GroupInsert::Duplicate { existing } => ctx.skip(
                    CATEGORY,
                    SkipReason::DuplicateTask {
                        task: task.clone(),
                        kept: existing.to_string(),
                        ignored: sitelist::join(sites),
                    },
                ),
                GroupInsert::EmptyWhitelist => {
                    ctx.skip(CATEGORY, SkipReason::EmptyWhitelist { task: task.clone() })
                }
            }
        }
    }

    let mapping = SourceToDests::invert(&checked_mapping(&doc.overflow.reversed_mapping, ctx));
    for group in groups.into_site_map_groups(&mapping) {
        if group.mapping.is_empty() {
            ctx.skip(
                CATEGORY,
                SkipReason::EmptySiteMapping {
                    whitelist: group.whitelist.to_string(),
                },
            );
            continue;
        }
        match master_rule(&group) {
            Some(rule) => rules.push(rule),
            None => ctx.skip(
                CATEGORY,
                SkipReason::EmptySelector {
                    rule: master_name(&group),
                },
            ),
        }
    }

    rules
}

/// Prefer slots at sites that read the input locally.
fn rank_expr() -> Expr {
    Expr::call(
        Func::StringListMember,
        vec![
            Expr::attr(attr::GLIDEIN_SITE),
            Expr::attr(attr::EXT_DESIRED_SITES),
        ],
    )
}

/// Valid sites in input order. Blank entries are dropped without a report.
fn checked_sites(sites: &[String], ctx: &mut Context<'_>) -> Vec<String> {
    let present: Vec<&str> = sites
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();
    ctx.valid_sites(CATEGORY, &present)
        .into_iter()
        .map(|site| site.as_str().to_string())
        .collect()
}

/// The reverse mapping with every invalid destination or source removed.
fn checked_mapping(
    reversed: &BTreeMap<String, Vec<String>>,
    ctx: &mut Context<'_>,
) -> BTreeMap<String, Vec<String>> {
    let mut checked: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (dest, sources) in reversed {
        let Some(dest) = ctx.valid_sites(CATEGORY, &[dest]).pop() else {
            continue;
        };
        let sources = checked_sites(sources, ctx);
        if !sources.is_empty() {
            checked
                .entry(dest.as_str().to_string())
                .or_default()
                .extend(sources);
        }
    }
    checked
}

fn replacement_rule(task: &str, whitelist: &[String]) -> Option<Rule> {
    if whitelist.is_empty() {
        return None;
    }

    let rule = Rule::builder(CATEGORY, format!("Site Replacement for {task}"))
        .guard(guard::flag_is_not_true(marker::HAS_BEEN_REPLACED))
        .guard(guard::compare(attr::SUBTASK_NAME, CmpOp::Is, task))
        .eval_set(attr::DESIRED_SITES, Value::from(sitelist::join(whitelist)))
        .set(attr::RANK, rank_expr())
        .marker(marker::HAS_BEEN_REPLACED, true)
        .build();
    Some(rule)
}

fn master_name(group: &SiteMapGroup) -> String {
    format!(
        "Master overflow rule to run at {} in addition",
        group.whitelist
    )
}

fn master_rule(group: &SiteMapGroup) -> Option<Rule> {
    let selector = guard::member_of(attr::SUBTASK_NAME, group.tasks.iter().cloned())?;

    let mapped = Expr::call(
        Func::SiteMapping,
        vec![
            Expr::attr(attr::PRE_DESIRED_SITES),
            Expr::lit(Value::from(&group.mapping)),
        ],
    );
    let expanded = Expr::if_then_else(
        mapped.clone().isnt(Expr::lit(Value::Error)),
        mapped,
        Expr::attr(attr::PRE_DESIRED_SITES),
    );

    let rule = Rule::builder(CATEGORY, master_name(group))
        .guard(selector)
        .guard(guard::flag_is_not_true(marker::HAS_BEEN_ROUTED_OVERFLOW))
        .copy(attr::DESIRED_SITES, attr::PRE_DESIRED_SITES)
        .eval_set(attr::DESIRED_SITES, expanded)
        .set(attr::RANK, rank_expr())
        .marker(marker::HAS_BEEN_ROUTED_OVERFLOW, true)
        .build();
    Some(rule)
}

#[cfg(test)]
mod tests {
    use jobrouter_expr::JobAd;

    use super::*;
    use crate::CompileOptions;

    fn doc(json: &str) -> PolicyDocument {
        PolicyDocument::parse(json).unwrap()
    }

    fn run(doc: &PolicyDocument) -> (Vec<Rule>, Vec<SkipReason>) {
        let options = CompileOptions::default();
        let mut ctx = Context::new(&options);
        let rules = compile(doc, &mut ctx);
        let skipped = ctx.skipped.into_iter().map(|s| s.reason).collect();
        (rules, skipped)
    }

    #[test]
    fn test_tasks_sharing_whitelist_share_a_rule() {
        let doc = doc(
            r#"{"overflow": {
                "reversed_mapping": {"T2_US_Purdue": ["T1_US_FNAL"]},
                "modifications": {
                    "wf1": {"/wf1/A": {"AddWhitelist": ["T2_US_Purdue"]}},
                    "wf2": {"/wf2/B": {"AddWhitelist": [" T2_US_Purdue", "T2_US_Purdue"]}}
                }
            }}"#,
        );
        let (rules, skipped) = run(&doc);
        assert!(skipped.is_empty());
        assert_eq!(rules.len(), 1);
        assert_eq!(
            rules[0].guard().to_string(),
            r#"member(WMAgent_SubTaskName, { "/wf1/A", "/wf2/B" }) && HasBeenRouted_Overflow =!= true"#
        );
    }

    #[test]
    fn test_master_rule_expands_whitelist_once() {
        let doc = doc(
            r#"{"overflow": {
                "reversed_mapping": {"T2_US_Purdue": ["T1_US_FNAL"], "T2_US_MIT": ["T1_US_FNAL"]},
                "modifications": {"wf": {"/wf/A": {"AddWhitelist": ["T2_US_Purdue"]}}}
            }}"#,
        );
        let (rules, _) = run(&doc);
        let rule = &rules[0];

        let mut ad = JobAd::new();
        ad.set(attr::SUBTASK_NAME, "/wf/A");
        ad.set(attr::DESIRED_SITES, "T1_US_FNAL");
        assert!(rule.matches(&ad));
        rule.apply(&mut ad);

        assert_eq!(
            ad.eval_attr(attr::DESIRED_SITES),
            Value::from("T1_US_FNAL,T2_US_Purdue")
        );
        assert_eq!(ad.eval_attr(attr::PRE_DESIRED_SITES), Value::from("T1_US_FNAL"));
        assert!(!rule.matches(&ad));
    }

    #[test]
    fn test_empty_scoped_mapping_is_skipped() {
        let doc = doc(
            r#"{"modifications": {"wf": {"/wf/A": {"AddWhitelist": ["T2_IT_Pisa"]}}},
                "reversed_mapping": {"T2_DE_DESY": ["T1_IT_CNAF"]}}"#,
        );
        let (rules, skipped) = run(&doc);
        assert!(rules.is_empty());
        assert_eq!(
            skipped,
            vec![SkipReason::EmptySiteMapping {
                whitelist: "T2_IT_Pisa".to_string()
            }]
        );
    }

    #[test]
    fn test_replacement_rules_come_first_and_exclude_task_from_groups() {
        let doc = doc(
            r#"{"overflow": {
                "reversed_mapping": {"T2_DE_DESY": ["T1_IT_CNAF"]},
                "modifications": {
                    "wf": {
                        "/wf/A": {"ReplaceSiteWhitelist": ["T2_CH_CERN", "T1_US_FNAL"], "AddWhitelist": ["T2_DE_DESY"]},
                        "/wf/B": {"AddWhitelist": ["T2_DE_DESY"]}
                    }
                }
            }}"#,
        );
        let (rules, skipped) = run(&doc);
        assert!(skipped.is_empty());
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].name(), "Site Replacement for /wf/A");
        assert!(rules[1].guard().to_string().contains(r#"{ "/wf/B" }"#));

        let mut ad = JobAd::new();
        ad.set(attr::SUBTASK_NAME, "/wf/A");
        ad.set(attr::DESIRED_SITES, "T1_IT_CNAF");
        rules[0].apply(&mut ad);
        assert_eq!(
            ad.eval_attr(attr::DESIRED_SITES),
            Value::from("T2_CH_CERN,T1_US_FNAL")
        );
        assert!(!rules[0].matches(&ad));
    }

    #[test]
    fn test_empty_whitelists_are_skipped() {
        let doc = doc(
            r#"{"modifications": {"wf": {
                "/wf/A": {"ReplaceSiteWhitelist": []},
                "/wf/B": {"AddWhitelist": [" "]}
            }}}"#,
        );
        let (rules, skipped) = run(&doc);
        assert!(rules.is_empty());
        assert_eq!(
            skipped,
            vec![
                SkipReason::EmptyWhitelist {
                    task: "/wf/A".to_string()
                },
                SkipReason::EmptyWhitelist {
                    task: "/wf/B".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_invalid_sites_are_dropped_from_overflow_rules() {
        let doc = doc(
            r#"{"overflow": {
                "reversed_mapping": {
                    "not_a_site": ["T1_US_FNAL"],
                    "T2_US_MIT": ["T1_US_FNAL", "fnal"]
                },
                "modifications": {"wf": {
                    "/wf/A": {"AddWhitelist": ["not_a_site"]},
                    "/wf/B": {"ReplaceSiteWhitelist": ["garbage", "T2_CH_CERN"]},
                    "/wf/C": {"AddWhitelist": ["T2_US_MIT", "mit"]}
                }}
            }}"#,
        );
        let (rules, skipped) = run(&doc);

        let names: Vec<&str> = rules.iter().map(Rule::name).collect();
        assert_eq!(
            names,
            vec![
                "Site Replacement for /wf/B",
                "Master overflow rule to run at T2_US_MIT in addition",
            ]
        );

        let mut ad = JobAd::new();
        ad.set(attr::SUBTASK_NAME, "/wf/B");
        ad.set(attr::DESIRED_SITES, "T1_US_FNAL");
        rules[0].apply(&mut ad);
        assert_eq!(ad.eval_attr(attr::DESIRED_SITES), Value::from("T2_CH_CERN"));

        let invalid = |site: &str| SkipReason::InvalidSite {
            site: site.to_string(),
        };
        assert_eq!(
            skipped,
            vec![
                invalid("garbage"),
                invalid("not_a_site"),
                SkipReason::EmptyWhitelist {
                    task: "/wf/A".to_string()
                },
                invalid("mit"),
                invalid("fnal"),
                invalid("not_a_site"),
            ]
        );
        let directives: Vec<String> = rules[1].mutations().iter().map(|m| m.directive()).collect();
        assert!(directives.iter().all(|d| !d.contains("fnal")));
    }

    #[test]
    fn test_task_in_two_workflows_keeps_first_whitelist() {
        let doc = doc(
            r#"{"overflow": {
                "reversed_mapping": {"T2_DE_DESY": ["T1_IT_CNAF"], "T2_IT_Pisa": ["T1_IT_CNAF"]},
                "modifications": {
                    "wf1": {"/shared": {"AddWhitelist": ["T2_DE_DESY"]}},
                    "wf2": {"/shared": {"AddWhitelist": ["T2_IT_Pisa"]}}
                }
            }}"#,
        );
        let (rules, skipped) = run(&doc);
        assert_eq!(rules.len(), 1);
        assert!(rules[0].name().contains("T2_DE_DESY"));
        assert!(matches!(
            &skipped[..],
            [SkipReason::DuplicateTask { task, .. }] if task == "/shared"
        ));
    }
}
