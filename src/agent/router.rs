//! Persona routing for free-form queries
//!
//! A query is classified into one of four personas by a keyword scan
//! over the lower-cased text. Categories are checked in a fixed order
//! (coding, reasoning, fast) and the first one with a matching keyword
//! wins; anything else is `General`. Each persona owns its own backend,
//! which today all point at the same endpoint and model unless the
//! config overrides them.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::llm::{ChatBackend, ChatMessage, GatewayError, OllamaClient};
use crate::config::ModelConfig;

/// Nominal model persona chosen for a query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Persona {
    Coding,
    Reasoning,
    Fast,
    General,
}

impl Persona {
    pub const ALL: [Persona; 4] = [
        Persona::Coding,
        Persona::Reasoning,
        Persona::Fast,
        Persona::General,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Persona::Coding => "coding",
            Persona::Reasoning => "reasoning",
            Persona::Fast => "fast",
            Persona::General => "general",
        }
    }
}

impl fmt::Display for Persona {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Keywords that select each non-general persona
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordTable {
    #[serde(default = "default_coding")]
    pub coding: Vec<String>,
    #[serde(default = "default_reasoning")]
    pub reasoning: Vec<String>,
    #[serde(default = "default_fast")]
    pub fast: Vec<String>,
}

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|w| w.to_string()).collect()
}

fn default_coding() -> Vec<String> {
    words(&["code", "python", "bug", "function", "error"])
}

fn default_reasoning() -> Vec<String> {
    words(&["why", "how does", "explain", "theory", "concept"])
}

fn default_fast() -> Vec<String> {
    words(&["summarize", "tl;dr", "short version", "brief"])
}

impl Default for KeywordTable {
    fn default() -> Self {
        Self {
            coding: default_coding(),
            reasoning: default_reasoning(),
            fast: default_fast(),
        }
    }
}

impl KeywordTable {
    /// Pick the persona for `text`
    pub fn classify(&self, text: &str) -> Persona {
        let lower = text.to_lowercase();
        let hit = |keywords: &[String]| {
            keywords
                .iter()
                .filter(|k| !k.is_empty())
                .any(|k| lower.contains(&k.to_lowercase()))
        };

        if hit(&self.coding) {
            Persona::Coding
        } else if hit(&self.reasoning) {
            Persona::Reasoning
        } else if hit(&self.fast) {
            Persona::Fast
        } else {
            Persona::General
        }
    }
}

/// Classifier plus one backend per persona
pub struct PersonaRouter {
    table: KeywordTable,
    backends: HashMap<Persona, Arc<dyn ChatBackend>>,
    fallback: Arc<dyn ChatBackend>,
}

impl PersonaRouter {
    /// Route every persona to the same backend
    pub fn uniform(table: KeywordTable, backend: Arc<dyn ChatBackend>) -> Self {
        Self {
            table,
            backends: HashMap::new(),
            fallback: backend,
        }
    }

    /// One `OllamaClient` per overridden persona, sharing the HTTP pool
    pub fn from_config(table: KeywordTable, model: &ModelConfig, timeout: Option<Duration>) -> Self {
        let mut base = OllamaClient::new(&model.endpoint, &model.model);
        if let Some(t) = timeout {
            base = base.with_timeout(t);
        }
        let mut router = Self::uniform(table, Arc::new(base.clone()));
        for persona in Persona::ALL {
            let name = model.model_for(persona);
            if name != model.model {
                router = router.with_backend(persona, Arc::new(base.for_model(name)));
            }
        }
        router
    }

    /// Plug a dedicated backend in for one persona
    pub fn with_backend(mut self, persona: Persona, backend: Arc<dyn ChatBackend>) -> Self {
        self.backends.insert(persona, backend);
        self
    }

    pub fn classify(&self, text: &str) -> Persona {
        self.table.classify(text)
    }

    pub fn backend(&self, persona: Persona) -> &Arc<dyn ChatBackend> {
        self.backends.get(&persona).unwrap_or(&self.fallback)
    }

    /// Classify `query` and send `history` to the chosen persona
    pub async fn answer(&self, query: &str, history: Vec<ChatMessage>) -> Result<(Persona, String), GatewayError> {
        let persona = self.classify(query);
        tracing::debug!("Routing query to {} persona", persona);
        let reply = self.backend(persona).chat(history).await?;
        Ok((persona, reply))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::llm::MockChatBackend;

    #[test]
    fn test_classify_examples() {
        let table = KeywordTable::default();
        assert_eq!(table.classify("There is a bug in my loop"), Persona::Coding);
        assert_eq!(table.classify("Why is the sky blue?"), Persona::Reasoning);
        assert_eq!(table.classify("tl;dr of this article please"), Persona::Fast);
        assert_eq!(table.classify("What's the weather like"), Persona::General);
    }

    #[test]
    fn test_classify_order_and_case() {
        let table = KeywordTable::default();
        // Coding wins over reasoning when both match
        assert_eq!(table.classify("Explain this PYTHON error"), Persona::Coding);
        // Reasoning wins over fast
        assert_eq!(table.classify("brief: why does it rain"), Persona::Reasoning);
        // Substring match, not whole word
        assert_eq!(table.classify("debugging tips"), Persona::Coding);
    }

    #[test]
    fn test_classify_is_deterministic() {
        let table = KeywordTable::default();
        let input = "how does a compiler work";
        let first = table.classify(input);
        for _ in 0..10 {
            assert_eq!(table.classify(input), first);
        }
    }

    #[test]
    fn test_custom_table() {
        let table = KeywordTable {
            coding: vec!["rust".to_string()],
            reasoning: vec![],
            fast: vec!["".to_string(), "quick".to_string()],
        };
        assert_eq!(table.classify("Rust lifetimes"), Persona::Coding);
        assert_eq!(table.classify("python bug"), Persona::General);
        assert_eq!(table.classify("quick one"), Persona::Fast);
    }

    #[tokio::test]
    async fn test_answer_uses_persona_backend() {
        let mut general = MockChatBackend::new();
        general.expect_chat().times(0);

        let mut coding = MockChatBackend::new();
        coding
            .expect_chat()
            .withf(|messages| messages.len() == 2 && messages[1].content == "fix this bug")
            .times(1)
            .returning(|_| Ok("patched".to_string()));

        let router = PersonaRouter::uniform(KeywordTable::default(), Arc::new(general))
            .with_backend(Persona::Coding, Arc::new(coding));

        let history = vec![ChatMessage::system("sys"), ChatMessage::user("fix this bug")];
        let (persona, reply) = router.answer("fix this bug", history).await.unwrap();
        assert_eq!(persona, Persona::Coding);
        assert_eq!(reply, "patched");
    }

    #[tokio::test]
    async fn test_answer_propagates_gateway_error() {
        let mut backend = MockChatBackend::new();
        backend
            .expect_chat()
            .returning(|_| Err(GatewayError::Malformed("no message".to_string())));

        let router = PersonaRouter::uniform(KeywordTable::default(), Arc::new(backend));
        let err = router.answer("hello", vec![ChatMessage::user("hello")]).await.unwrap_err();
        assert!(matches!(err, GatewayError::Malformed(_)));
    }
}
