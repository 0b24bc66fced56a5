//! LLM-assisted mention proposal
//!
//! The LLM is trusted for span detection only. Every proposed span is
//! reconciled against the alias vocabulary before it becomes a hit, so the
//! model can widen recall but never invent an identifier.
//!
//! Any failure (transport error, timeout, cancellation, malformed JSON) is
//! logged and yields no proposals.

use std::future::Future;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use regex::Regex;
use serde_json::Value;

use super::llm_client::LlmClient;
use crate::entity_linking::fuzzy::{FuzzyMatcher, PHRASE_TOP_K};
use crate::entity_linking::normalize::normalize;
use crate::entity_linking::patterns::{find_enzyme_phrase, ENZYME_DATABASES};
use crate::entity_linking::snapshot::AliasIndex;
use crate::entity_linking::types::{Hit, HitSource};
use crate::error::LlmError;

/// Confidence of an LLM span whose text is a known alias
pub const LLM_EXACT_CONFIDENCE: f64 = 0.85;

const MENTION_PROMPT: &str = r#"Extract all biological/chemical entity mentions from this question.
Entities include: genes, proteins, compounds, enzymes, reactions, pathways, orthologs.

Question: {question}

Return ONLY a valid JSON object with this exact format:
{
  "mentions": [
    {"text": "entity name", "start": character_index, "end": character_index},
    ...
  ]
}

Rules:
- Include ONLY entity names (genes, proteins, compounds, enzymes, pathways, reactions)
- Provide exact character positions (0-indexed, where start is inclusive, end is exclusive)
- Don't overlap entities
- Order by appearance in the question
- Return empty array if no entities found

Example:
Question: "What is the role of TP53 in apoptosis?"
Output: {"mentions": [{"text": "TP53", "start": 20, "end": 24}, {"text": "apoptosis", "start": 28, "end": 37}]}

Now extract from the question above. Return ONLY the JSON, no other text:"#;

static CODE_FENCE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"```(?:json)?\s*").unwrap());
static JSON_OBJECT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)\{.*\}").unwrap());

/// A span proposed by the LLM, in byte offsets over the question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProposedMention {
    pub text: String,
    pub start: usize,
    pub end: usize,
}

/// Build the extraction prompt for `question`.
pub fn build_prompt(question: &str) -> String {
    MENTION_PROMPT.replacen("{question}", question, 1)
}

/// Parse an LLM response into validated proposals.
///
/// Offsets in the response are character offsets; they are checked against
/// `0 <= start < end <= chars(question)` and converted to byte offsets.
/// Entries with missing or mistyped fields are skipped; an unparseable body
/// or a missing `mentions` array is an error.
pub fn parse_response(response: &str, question: &str) -> Result<Vec<ProposedMention>, LlmError> {
    let cleaned = CODE_FENCE.replace_all(response.trim(), "");
    let body = JSON_OBJECT
        .find(&cleaned)
        .map(|m| m.as_str())
        .unwrap_or(&*cleaned);

    let value: Value = serde_json::from_str(body)
        .map_err(|e| LlmError::MalformedResponse(format!("invalid JSON: {}", e)))?;
    let mentions = value
        .get("mentions")
        .and_then(Value::as_array)
        .ok_or_else(|| LlmError::MalformedResponse("missing 'mentions' array".to_string()))?;

    // byte offset of every char boundary, including the end of the string
    let boundaries: Vec<usize> = question
        .char_indices()
        .map(|(b, _)| b)
        .chain(std::iter::once(question.len()))
        .collect();
    let char_len = boundaries.len() - 1;

    let mut proposals = Vec::with_capacity(mentions.len());
    for entry in mentions {
        let (Some(text), Some(start), Some(end)) = (
            entry.get("text").and_then(Value::as_str),
            entry.get("start").and_then(Value::as_u64),
            entry.get("end").and_then(Value::as_u64),
        ) else {
            tracing::debug!(?entry, "Skipping LLM mention with missing fields");
            continue;
        };
        let (start, end) = (start as usize, end as usize);
        if !(start < end && end <= char_len) {
            tracing::debug!(text, start, end, "Skipping LLM mention with out-of-range offsets");
            continue;
        }
        proposals.push(realign(question, text, boundaries[start], boundaries[end]));
    }
    Ok(proposals)
}

/// Trust the offsets when they frame the proposed text; otherwise move the
/// span to the occurrence of the text nearest the proposed start.
fn realign(question: &str, text: &str, start: usize, end: usize) -> ProposedMention {
    if &question[start..end] == text || text.is_empty() {
        return ProposedMention {
            text: question[start..end].to_string(),
            start,
            end,
        };
    }
    match question
        .match_indices(text)
        .map(|(i, _)| i)
        .min_by_key(|&i| i.abs_diff(start))
    {
        Some(found) => ProposedMention {
            text: text.to_string(),
            start: found,
            end: found + text.len(),
        },
        None => ProposedMention {
            text: text.to_string(),
            start,
            end,
        },
    }
}

/// Asks an LLM for entity spans in a question.
#[derive(Clone)]
pub struct LlmMentionProposer {
    client: Arc<dyn LlmClient>,
    timeout: Option<Duration>,
}

impl std::fmt::Debug for LlmMentionProposer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmMentionProposer")
            .field("provider", &self.client.provider_name())
            .field("model", &self.client.model_name())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl LlmMentionProposer {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self {
            client,
            timeout: None,
        }
    }

    /// Give up on the LLM after `timeout`; the call then counts as unavailable.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Propose mention spans for `question`. Never fails: errors are logged
    /// and produce an empty list.
    pub async fn propose(&self, question: &str) -> Vec<ProposedMention> {
        self.propose_until(question, std::future::pending::<()>()).await
    }

    /// Like [`propose`](Self::propose), abandoning the call as soon as
    /// `cancel` completes.
    pub async fn propose_until<F>(&self, question: &str, cancel: F) -> Vec<ProposedMention>
    where
        F: Future<Output = ()>,
    {
        if question.trim().is_empty() {
            return Vec::new();
        }

        let result = tokio::select! {
            biased;
            _ = cancel => Err(LlmError::Unavailable("cancelled".to_string())),
            result = self.request(question) => result,
        };

        match result {
            Ok(proposals) => {
                tracing::debug!(
                    provider = self.client.provider_name(),
                    count = proposals.len(),
                    "LLM proposed mentions"
                );
                proposals
            }
            Err(e) => {
                tracing::warn!(
                    provider = self.client.provider_name(),
                    model = self.client.model_name(),
                    error = %e,
                    "LLM mention source degraded"
                );
                Vec::new()
            }
        }
    }

    async fn request(&self, question: &str) -> Result<Vec<ProposedMention>, LlmError> {
        let prompt = build_prompt(question);
        let call = self.client.generate(&prompt);

        let response = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .map_err(|_| LlmError::Unavailable(format!("timed out after {:?}", limit)))?,
            None => call.await,
        }
        .map_err(|e| LlmError::Unavailable(e.to_string()))?;

        parse_response(&response, question)
    }
}

/// Resolve LLM proposals against the alias vocabulary.
///
/// A proposal that embeds an enzyme phrase is narrowed to that phrase and
/// restricted to enzyme databases. A known alias becomes `LlmExact` at
/// [`LLM_EXACT_CONFIDENCE`]; otherwise the closest aliases scoring at least
/// `threshold` become `LlmFuzzy` with confidence scaled by the same factor.
pub fn reconcile(
    question: &str,
    proposed: &[ProposedMention],
    index: &AliasIndex,
    species_hint: Option<&str>,
    threshold: f64,
) -> Vec<Hit> {
    let matcher = FuzzyMatcher::new(index).with_species_hint(species_hint);
    let mut hits = Vec::new();

    for proposal in proposed {
        let (text, start, end, allowed) = match find_enzyme_phrase(&proposal.text) {
            Some(phrase) => (
                phrase.text,
                proposal.start + phrase.start,
                proposal.start + phrase.end,
                Some(ENZYME_DATABASES),
            ),
            None => (proposal.text.clone(), proposal.start, proposal.end, None),
        };

        let query = normalize(&text);
        if query.is_empty() {
            continue;
        }

        if let Some(records) = matcher.exact_candidates(&query, allowed) {
            hits.extend(records.into_iter().map(|r| {
                Hit::from_record(r, &text, (start, end), HitSource::LlmExact, LLM_EXACT_CONFIDENCE, None)
            }));
            continue;
        }

        for ranked in matcher.rank(&query, PHRASE_TOP_K) {
            if ranked.score < threshold {
                continue;
            }
            let confidence = ranked.score / 100.0 * LLM_EXACT_CONFIDENCE;
            hits.extend(matcher.candidates_at(ranked.position, allowed).into_iter().map(|r| {
                Hit::from_record(r, &text, (start, end), HitSource::LlmFuzzy, confidence, Some(ranked.score))
            }));
        }
    }

    tracing::debug!(
        question_len = question.len(),
        proposals = proposed.len(),
        hits = hits.len(),
        "Reconciled LLM proposals"
    );
    hits
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity_linking::snapshot::DEFAULT_MIN_ALIAS_LEN;
    use crate::entity_linking::types::{AliasRecord, Database};
    use async_trait::async_trait;

    struct ScriptedClient {
        response: anyhow::Result<String>,
        delay: Option<Duration>,
    }

    impl ScriptedClient {
        fn replying(body: &str) -> Arc<dyn LlmClient> {
            Arc::new(Self {
                response: Ok(body.to_string()),
                delay: None,
            })
        }
    }

    #[async_trait]
    impl LlmClient for ScriptedClient {
        async fn generate(&self, _prompt: &str) -> anyhow::Result<String> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            match &self.response {
                Ok(body) => Ok(body.clone()),
                Err(e) => Err(anyhow::anyhow!("{}", e)),
            }
        }

        fn model_name(&self) -> &str {
            "scripted"
        }

        fn provider_name(&self) -> &str {
            "Test"
        }
    }

    fn make_test_index() -> AliasIndex {
        AliasIndex::build(
            vec![
                AliasRecord::new("C00022", "Pyruvate", "all", Database::Compound),
                AliasRecord::new("5.4.99.8", "cycloartenol synthase", "all", Database::Ec),
                AliasRecord::new("K01853", "cycloartenol synthase", "all", Database::Ortholog),
                AliasRecord::new("C01902", "cycloartenol", "all", Database::Compound),
            ],
            DEFAULT_MIN_ALIAS_LEN,
        )
        .unwrap()
    }

    #[test]
    fn test_prompt_embeds_question() {
        let prompt = build_prompt("Where is pyruvate made?");
        assert!(prompt.contains("Question: Where is pyruvate made?"));
        assert!(prompt.contains(r#""mentions""#));
    }

    #[test]
    fn test_parse_plain_json() {
        let question = "What is the role of TP53 in apoptosis?";
        let parsed = parse_response(
            r#"{"mentions": [{"text": "TP53", "start": 20, "end": 24}]}"#,
            question,
        )
        .unwrap();
        assert_eq!(
            parsed,
            vec![ProposedMention {
                text: "TP53".to_string(),
                start: 20,
                end: 24
            }]
        );
    }

    #[test]
    fn test_parse_strips_code_fences_and_prose() {
        let question = "Where is pyruvate made?";
        let response = "Sure!\n```json\n{\"mentions\": [{\"text\": \"pyruvate\", \"start\": 9, \"end\": 17}]}\n```";
        let parsed = parse_response(response, question).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(&question[parsed[0].start..parsed[0].end], "pyruvate");
    }

    #[test]
    fn test_parse_rejects_malformed_json() {
        let err = parse_response("mentions: pyruvate", "pyruvate").unwrap_err();
        assert!(matches!(err, LlmError::MalformedResponse(_)));

        let err = parse_response(r#"{"entities": []}"#, "pyruvate").unwrap_err();
        assert!(matches!(err, LlmError::MalformedResponse(_)));
    }

    #[test]
    fn test_parse_drops_bad_entries() {
        let question = "pyruvate";
        let parsed = parse_response(
            r#"{"mentions": [
                {"text": "pyruvate", "start": 0, "end": 99},
                {"text": "pyruvate", "start": 5, "end": 5},
                {"text": "pyruvate", "start": -1, "end": 3},
                {"text": "pyruvate"},
                {"text": "pyruvate", "start": 0, "end": 8}
            ]}"#,
            question,
        )
        .unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!((parsed[0].start, parsed[0].end), (0, 8));
    }

    #[test]
    fn test_char_offsets_become_byte_offsets() {
        let question = "Is β-carotene a pigment?";
        // chars 3..13 cover "β-carotene"; β is two bytes
        let parsed = parse_response(
            r#"{"mentions": [{"text": "β-carotene", "start": 3, "end": 13}]}"#,
            question,
        )
        .unwrap();
        assert_eq!((parsed[0].start, parsed[0].end), (3, 14));
        assert_eq!(&question[parsed[0].start..parsed[0].end], "β-carotene");
    }

    #[test]
    fn test_misaligned_offsets_snap_to_text() {
        let question = "Where is pyruvate made?";
        let parsed = parse_response(
            r#"{"mentions": [{"text": "pyruvate", "start": 8, "end": 16}]}"#,
            question,
        )
        .unwrap();
        assert_eq!((parsed[0].start, parsed[0].end), (9, 17));
    }

    #[tokio::test]
    async fn test_propose_skips_blank_question() {
        let proposer = LlmMentionProposer::new(ScriptedClient::replying("not even called"));
        assert!(proposer.propose("   ").await.is_empty());
    }

    #[tokio::test]
    async fn test_propose_absorbs_malformed_response() {
        let proposer = LlmMentionProposer::new(ScriptedClient::replying("{ not json"));
        assert!(proposer.propose("Where is pyruvate made?").await.is_empty());
    }

    #[tokio::test]
    async fn test_propose_absorbs_client_error() {
        let client: Arc<dyn LlmClient> = Arc::new(ScriptedClient {
            response: Err(anyhow::anyhow!("connection refused")),
            delay: None,
        });
        let proposer = LlmMentionProposer::new(client);
        assert!(proposer.propose("Where is pyruvate made?").await.is_empty());
    }

    #[tokio::test]
    async fn test_propose_times_out() {
        let client: Arc<dyn LlmClient> = Arc::new(ScriptedClient {
            response: Ok(r#"{"mentions": [{"text": "pyruvate", "start": 9, "end": 17}]}"#.to_string()),
            delay: Some(Duration::from_secs(30)),
        });
        let proposer = LlmMentionProposer::new(client).with_timeout(Duration::from_millis(50));
        assert!(proposer.propose("Where is pyruvate made?").await.is_empty());
    }

    #[tokio::test]
    async fn test_propose_until_cancelled() {
        // a valid, immediate reply still loses to an already-fired cancel
        let proposer = LlmMentionProposer::new(ScriptedClient::replying(
            r#"{"mentions": [{"text": "pyruvate", "start": 9, "end": 17}]}"#,
        ));
        let proposals = proposer
            .propose_until("Where is pyruvate made?", std::future::ready(()))
            .await;
        assert!(proposals.is_empty());
    }

    #[test]
    fn test_reconcile_exact_alias() {
        let index = make_test_index();
        let question = "Where is pyruvate made?";
        let proposed = vec![ProposedMention {
            text: "pyruvate".to_string(),
            start: 9,
            end: 17,
        }];
        let hits = reconcile(question, &proposed, &index, None, 95.0);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "C00022");
        assert_eq!(hits[0].source, HitSource::LlmExact);
        assert_eq!(hits[0].confidence, LLM_EXACT_CONFIDENCE);
    }

    #[test]
    fn test_reconcile_narrows_to_enzyme_phrase() {
        let index = make_test_index();
        let question = "the cycloartenol synthase enzyme";
        let proposed = vec![ProposedMention {
            text: "cycloartenol synthase enzyme".to_string(),
            start: 4,
            end: 32,
        }];
        let hits = reconcile(question, &proposed, &index, None, 95.0);
        // enzyme databases only: the compound "cycloartenol" is excluded
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|h| (h.start, h.end) == (4, 25)));
        assert!(hits
            .iter()
            .all(|h| matches!(h.database, Database::Ec | Database::Ortholog)));
        assert!(hits.iter().all(|h| h.source == HitSource::LlmExact));
    }

    #[test]
    fn test_reconcile_fuzzy_scales_confidence() {
        let index = make_test_index();
        let question = "pyruvate anion levels";
        let proposed = vec![ProposedMention {
            text: "pyruvate anion".to_string(),
            start: 0,
            end: 14,
        }];
        let hits = reconcile(question, &proposed, &index, None, 95.0);
        let pyruvate = hits.iter().find(|h| h.id == "C00022").unwrap();
        assert_eq!(pyruvate.source, HitSource::LlmFuzzy);
        assert_eq!(pyruvate.score, Some(100.0));
        assert!((pyruvate.confidence - 0.85).abs() < 1e-9);
    }

    #[test]
    fn test_reconcile_below_threshold() {
        let index = make_test_index();
        let proposed = vec![ProposedMention {
            text: "apoptosis".to_string(),
            start: 0,
            end: 9,
        }];
        assert!(reconcile("apoptosis", &proposed, &index, None, 95.0).is_empty());
    }
}
