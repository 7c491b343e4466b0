//! Semantic cache contracts.
//!
//! A cache entry is keyed by tenant, module, the normalized question, the
//! fingerprint of the offered tool set and the execution plan. Callers must
//! consult [`RequestPolicy::should_bypass_cache`](crate::policy::RequestPolicy::should_bypass_cache)
//! before touching an implementation of [`SemanticCache`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::tool::tool_set_fingerprint;

/// Identity of a cached answer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub tenant: String,
    pub module: String,
    /// Question after [`normalize_question`]
    pub question: String,
    pub tool_fingerprint: String,
    /// Canonical JSON of the execution plan, empty when there is none
    pub plan: String,
}

impl CacheKey {
    pub fn new<I, S>(
        tenant: impl Into<String>,
        module: impl Into<String>,
        question: &str,
        tools: I,
        plan: Option<&Value>,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            tenant: tenant.into(),
            module: module.into(),
            question: normalize_question(question),
            tool_fingerprint: tool_set_fingerprint(tools),
            plan: plan.map(Value::to_string).unwrap_or_default(),
        }
    }

    /// SHA-256 over all key components, hex encoded.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for part in [
            &self.tenant,
            &self.module,
            &self.question,
            &self.tool_fingerprint,
            &self.plan,
        ] {
            hasher.update(part.as_bytes());
            hasher.update([0u8]);
        }
        hex::encode(hasher.finalize())
    }
}

/// Lowercase, trim, collapse internal whitespace and drop trailing
/// sentence punctuation.
pub fn normalize_question(question: &str) -> String {
    let collapsed = question
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    collapsed
        .trim_end_matches(['?', '!', '.'])
        .trim_end()
        .to_string()
}

/// A previously computed answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedAnswer {
    pub content: String,
    pub model: String,
}

/// Storage for previously computed answers.
#[async_trait]
pub trait SemanticCache: Send + Sync {
    async fn get(&self, key: &CacheKey) -> Option<CachedAnswer>;

    async fn put(&self, key: CacheKey, answer: CachedAnswer);

    /// Drop every entry of `tenant`; returns how many were removed.
    async fn invalidate_tenant(&self, tenant: &str) -> usize;
}
