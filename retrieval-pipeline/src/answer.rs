use async_openai::{
    error::OpenAIError,
    types::{
        ChatCompletionRequestSystemMessage, ChatCompletionRequestUserMessage,
        CreateChatCompletionRequest, CreateChatCompletionRequestArgs,
        CreateChatCompletionResponse,
    },
};
use common::error::AppError;

use crate::context::ContextSelection;

/// Fixed grounding instructions sent as the system message with every
/// question. They bind the model to the supplied context, require a citation
/// tag on every claim, and name the exact refusal sentence so the validator
/// can recognize a legitimate refusal.
pub const GROUNDING_INSTRUCTIONS: &str = "\
You answer questions using ONLY the context passages provided. Each passage \
is labeled with a citation tag such as [C1] or [C2]. Every claim in your \
answer must cite the passage it came from by including its tag, e.g. \
\"The project started in 2019 [C1].\" Use only the tags that appear in the \
context. Do not use outside knowledge. If the context does not contain the \
answer, reply exactly: I don't have enough information from the document to \
answer that question.";

pub fn create_user_message(context: &str, question: &str) -> String {
    format!(
        r"
        Context passages:
        ==================
        {context}

        User Question:
        ==================
        {question}
        "
    )
}

pub fn create_chat_request(
    model_id: &str,
    selection: &ContextSelection,
    question: &str,
) -> Result<CreateChatCompletionRequest, OpenAIError> {
    let user_message = create_user_message(&selection.render(), question);

    CreateChatCompletionRequestArgs::default()
        .model(model_id)
        .messages([
            ChatCompletionRequestSystemMessage::from(GROUNDING_INSTRUCTIONS).into(),
            ChatCompletionRequestUserMessage::from(user_message).into(),
        ])
        .build()
}

pub fn extract_answer_text(response: CreateChatCompletionResponse) -> Result<String, AppError> {
    response
        .choices
        .first()
        .and_then(|choice| choice.message.content.clone())
        .ok_or(AppError::LLMParsing(
            "No content found in model response".into(),
        ))
}
