//! Property tests for normalization, overlap resolution and dedup
//!
//! Run with: cargo test --test properties

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use proptest::prelude::*;

use bio_entity_linker::agentic::{LlmClient, LlmMentionProposer};
use bio_entity_linker::entity_linking::exact;
use bio_entity_linker::entity_linking::snapshot::DEFAULT_MIN_ALIAS_LEN;
use bio_entity_linker::entity_linking::{
    normalize, token_set_ratio, AliasIndex, AliasRecord, Database, EntityResolver, HitRanker,
    Mention, ResolveOptions,
};

// -- Fixtures --

fn make_overlapping_index() -> AliasIndex {
    let records = vec![
        AliasRecord::new("C06427", "alpha-Linolenic acid", "all", Database::Compound),
        AliasRecord::new("C06426", "Linolenic acid", "all", Database::Compound),
        AliasRecord::new("C00022", "Pyruvate", "all", Database::Compound),
        AliasRecord::new("C00022", "Pyruvic acid", "all", Database::Compound),
        AliasRecord::new("C00031", "glucose", "all", Database::Compound),
        AliasRecord::new("C00267", "alpha-D-glucose", "all", Database::Compound),
        AliasRecord::new("ath:AT2G07050", "CAS1", "ath", Database::Gene),
        AliasRecord::new("map00010", "glycolysis", "all", Database::Pathway),
    ];
    AliasIndex::build(records, DEFAULT_MIN_ALIAS_LEN).unwrap()
}

/// Aliases here never contain or overlap one another and no word is a
/// species keyword, ID shape or enzyme suffix. `CAS1` names a gene in two
/// species.
fn make_species_index() -> Arc<AliasIndex> {
    let records = vec![
        AliasRecord::new("ath:AT2G07050", "CAS1", "ath", Database::Gene),
        AliasRecord::new("gmx:100787", "CAS1", "gmx", Database::Gene),
        AliasRecord::new("ath:AT1G01010", "NAC001", "ath", Database::Gene),
        AliasRecord::new("C00022", "pyruvate", "all", Database::Compound),
        AliasRecord::new("gmx:100101", "glyma01", "gmx", Database::Gene),
        AliasRecord::new("map00100", "sterols", "all", Database::Pathway),
    ];
    Arc::new(AliasIndex::build(records, DEFAULT_MIN_ALIAS_LEN).unwrap())
}

/// LLM stand-in with one fixed reply: an exact alias and a near miss.
struct ScriptedClient;

#[async_trait]
impl LlmClient for ScriptedClient {
    async fn generate(&self, _prompt: &str) -> anyhow::Result<String> {
        Ok(r#"{"mentions": [
            {"text": "pyruvate", "start": 0, "end": 8},
            {"text": "sterol", "start": 0, "end": 6}
        ]}"#
            .to_string())
    }

    fn model_name(&self) -> &str {
        "scripted"
    }

    fn provider_name(&self) -> &str {
        "Scripted"
    }
}

fn make_llm_resolver() -> EntityResolver {
    EntityResolver::builder()
        .index(make_species_index())
        .proposer(LlmMentionProposer::new(Arc::new(ScriptedClient)))
        .build()
}

fn arb_question() -> impl Strategy<Value = String> {
    let words = prop::sample::select(vec![
        "cas1", "CAS1", "nac001", "pyruvate", "glyma01", "sterols", "of", "the", "role", "in",
        "and", "which", "genes", "make", "alpha", "linolenic", "acid", "glucose", "glycolysis",
    ]);
    prop::collection::vec(words, 0..12).prop_map(|w| w.join(" "))
}

fn entities(mentions: &[Mention]) -> HashSet<(String, Database, String)> {
    mentions
        .iter()
        .map(|m| (m.id.clone(), m.database, m.species.clone()))
        .collect()
}

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(future)
}

// -- Properties --

proptest! {
    #[test]
    fn normalize_is_a_fixed_point(text in "[a-zA-Z0-9 αβγ&,;:()\\[\\]\\-]{0,40}") {
        let once = normalize(&text);
        prop_assert_eq!(normalize(&once), once.clone());
    }

    #[test]
    fn normalize_never_leaves_outer_whitespace(text in "[a-zA-Z0-9 \\-,]{0,40}") {
        let out = normalize(&text);
        prop_assert_eq!(out.trim(), out.as_str());
        prop_assert!(!out.contains("  "));
    }

    #[test]
    fn token_set_ratio_is_symmetric_and_bounded(a in "[a-z ]{0,20}", b in "[a-z ]{0,20}") {
        let ab = token_set_ratio(&a, &b);
        let ba = token_set_ratio(&b, &a);
        prop_assert!((ab - ba).abs() < 1e-9);
        prop_assert!((0.0..=100.0).contains(&ab));
    }

    #[test]
    fn exact_hits_never_overlap(question in arb_question()) {
        let index = make_overlapping_index();
        let normalized = normalize(&question);
        let hits = exact::search(&normalized, &index, None, &HitRanker::default());

        let spans: Vec<(usize, usize)> = hits.iter().map(|h| (h.start, h.end)).collect();
        for (i, a) in spans.iter().enumerate() {
            for b in &spans[i + 1..] {
                prop_assert!(a == b || a.1 <= b.0 || b.1 <= a.0, "{:?} overlaps {:?}", a, b);
            }
        }
    }

    #[test]
    fn mentions_name_distinct_entities(question in arb_question()) {
        let resolver = EntityResolver::new(make_species_index());
        let mentions = block_on(resolver.extract_mentions(&question, &ResolveOptions::default()));
        prop_assert_eq!(entities(&mentions).len(), mentions.len());
    }

    #[test]
    fn resolution_is_deterministic(question in arb_question()) {
        let resolver = EntityResolver::new(make_species_index());
        let options = ResolveOptions::default();
        let first = block_on(resolver.extract_mentions(&question, &options));
        let second = block_on(resolver.extract_mentions(&question, &options));
        prop_assert_eq!(first, second);
    }

    #[test]
    fn resolution_with_fixed_llm_reply_is_deterministic(question in arb_question()) {
        let resolver = make_llm_resolver();
        let options = ResolveOptions::default();
        let first = block_on(resolver.extract_mentions(&question, &options));
        let second = block_on(resolver.extract_mentions(&question, &options));
        prop_assert_eq!(&first, &second);

        let batch = block_on(resolver.resolve_batch(&[question.as_str()], &options, 1));
        prop_assert_eq!(&batch[0], &first);
    }

    #[test]
    fn species_hint_only_narrows(
        question in arb_question(),
        hint in prop::sample::select(vec!["ath", "gmx"]),
    ) {
        let resolver = EntityResolver::new(make_species_index());
        let all = block_on(resolver.extract_mentions(&question, &ResolveOptions::default()));
        let hinted = block_on(
            resolver.extract_mentions(&question, &ResolveOptions::default().with_species(hint)),
        );

        let without = entities(&all);
        for entity in entities(&hinted) {
            prop_assert!(without.contains(&entity), "{:?} appeared only with hint {}", entity, hint);
            prop_assert!(entity.2 == hint || entity.2 == "all");
        }
    }
}
