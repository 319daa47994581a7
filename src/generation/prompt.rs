//! Prompt templates for grounded Q&A and summarization

/// Prompt builder for answer generation
pub struct PromptBuilder;

/// Default system prompt instructing the engine to answer only from the
/// supplied context and to cite sources by index
const DEFAULT_SYSTEM_PROMPT: &str = "\
You are a helpful assistant that answers questions based on provided context from documents.

Your role:
1. Answer questions accurately using ONLY the information in the provided context
2. If the context doesn't contain enough information to answer, say so clearly
3. Cite sources inline using their bracketed index, e.g. [Source 2]
4. Be concise but thorough
5. If multiple sources discuss the topic, synthesize information from all relevant ones

Important guidelines:
- Don't make up information not present in the context
- Don't use external knowledge unless explicitly asked
- Only cite source indices that actually appear in the context
- If uncertain, express your level of confidence";

impl PromptBuilder {
    /// Resolve the system prompt, honoring a per-request override
    pub fn system_prompt(custom: Option<&str>) -> &str {
        custom.unwrap_or(DEFAULT_SYSTEM_PROMPT)
    }

    /// Build the final user message from the question and rendered context
    ///
    /// An empty context gets an explicit no-context instruction so the
    /// answer reflects that honestly instead of hallucinating.
    pub fn user_message(question: &str, context: &str) -> String {
        if context.is_empty() {
            return format!(
                "No relevant context was found in the document corpus for this question. \
                 Say that the available documents do not contain the information needed, \
                 and do not invent an answer.\n\nQuestion: {}",
                question
            );
        }

        format!(
            "Context from documents:\n{}\n\nQuestion: {}\n\n\
             Provide an answer based on the context above. Remember to cite sources.",
            context, question
        )
    }

    /// System prompt for summarization calls
    pub fn summary_system_prompt(target_words: usize) -> String {
        format!(
            "You are a helpful assistant that creates concise summaries. \
             Limit summaries to approximately {} words.",
            target_words
        )
    }

    /// User message for summarizing a span of document text
    pub fn summary_user_message(text: &str) -> String {
        format!("Please summarize the following text:\n\n{}", text)
    }

    /// User message for the reduce phase over partial summaries
    pub fn reduce_user_message(summaries: &str) -> String {
        format!(
            "The following are partial summaries of consecutive sections of one document. \
             Combine them into a single coherent summary:\n\n{}",
            summaries
        )
    }
}
