use crate::error::{RagError, Result};

pub const DEFAULT_TEMPLATE: &str = "Answer the question based on the context below. If you can't answer the question, reply \"I don't know\".

Context: {context}

Question: {question}
";

const CONTEXT: &str = "{context}";
const QUESTION: &str = "{question}";

#[derive(Debug, Clone)]
pub struct PromptTemplate {
    template: String,
}

impl PromptTemplate {
    pub fn new(template: impl Into<String>) -> Result<Self> {
        let template = template.into();
        for placeholder in [CONTEXT, QUESTION] {
            if !template.contains(placeholder) {
                return Err(RagError::Template(format!("missing {} placeholder", placeholder)));
            }
        }
        Ok(Self { template })
    }

    pub fn as_str(&self) -> &str {
        &self.template
    }

    /// Substitutes both placeholders in one pass over the template; text
    /// inside `context` or `question` is copied verbatim.
    pub fn render(&self, context: &str, question: &str) -> String {
        let mut out = String::with_capacity(self.template.len() + context.len() + question.len());
        let mut rest = self.template.as_str();
        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let tail = &rest[open..];
            if tail.starts_with(CONTEXT) {
                out.push_str(context);
                rest = &tail[CONTEXT.len()..];
            } else if tail.starts_with(QUESTION) {
                out.push_str(question);
                rest = &tail[QUESTION.len()..];
            } else {
                out.push('{');
                rest = &tail[1..];
            }
        }
        out.push_str(rest);
        out
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self {
            template: DEFAULT_TEMPLATE.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_default_template() {
        let prompt = PromptTemplate::default().render("Llama is a model.", "What is Llama?");
        assert!(prompt.contains("Context: Llama is a model.\n"));
        assert!(prompt.contains("Question: What is Llama?\n"));
        assert!(!prompt.contains("{context}"));
    }

    #[test]
    fn requires_both_placeholders() {
        assert!(PromptTemplate::new("only {question}").is_err());
        assert!(PromptTemplate::new("only {context}").is_err());
        assert!(PromptTemplate::new("{context} / {question}").is_ok());
    }

    #[test]
    fn substituted_values_are_not_expanded_again() {
        let template = PromptTemplate::new("[{context}] [{question}]").unwrap();
        assert_eq!(
            template.render("says {question}", "why {context}?"),
            "[says {question}] [why {context}?]"
        );
    }

    #[test]
    fn other_braces_survive() {
        let template = PromptTemplate::new("{json} {context} {question} }{").unwrap();
        assert_eq!(template.render("c", "q"), "{json} c q }{");
    }

    #[test]
    fn repeated_placeholders_all_substituted() {
        let template = PromptTemplate::new("{question}\n{context}\n{question}").unwrap();
        assert_eq!(template.render("ctx", "q"), "q\nctx\nq");
    }
}
