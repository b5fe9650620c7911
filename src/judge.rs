use crate::error::JudgeError;
use crate::types::{TranscriptEntry, Verdict};
use async_trait::async_trait;

/// System prompt paired with [`build_judgment_prompt`].
pub const JUDGE_SYSTEM_PROMPT: &str = "你是一个群聊观察助手，请严格遵守格式要求。";

/// External collaborator wrapping the LLM relevance call.
///
/// Implementations own their own timeout; the watcher only maps an error to
/// a negative verdict and stays silent.
#[async_trait]
pub trait RelevanceJudge: Send + Sync {
    /// Given the bot's last utterance and the transcript observed since,
    /// decide whether the bot should interject, and with what.
    async fn evaluate(
        &self,
        last_bot_utterance: &str,
        transcript: &[TranscriptEntry],
    ) -> anyhow::Result<Verdict>;
}

/// Render the judgment prompt an implementation sends to its model. The
/// answer is requested as strict JSON so [`parse_verdict`] can read it.
pub fn build_judgment_prompt(last_bot_utterance: &str, transcript: &[TranscriptEntry]) -> String {
    let history: Vec<String> = transcript
        .iter()
        .map(TranscriptEntry::as_prompt_line)
        .collect();
    format!(
        "你是一个群聊观察助手。请分析以下在机器人发言后的一段聊天记录，判断机器人是否应该主动插话参与讨论。\n\
         \n\
         机器人的上一条发言:\n\
         {last_bot_utterance}\n\
         \n\
         聊天记录:\n\
         ---\n\
         {history}\n\
         ---\n\
         \n\
         请根据以上内容，严格按照以下JSON格式返回你的决定，不要添加任何额外的解释或文字：\n\
         {{\n\
           \"should_reply\": boolean,\n\
           \"reply_content\": \"如果should_reply为true，这里是你的回复内容\"\n\
         }}\n",
        history = history.join("\n"),
    )
}

/// Parse a model answer into a [`Verdict`], tolerating surrounding
/// whitespace and a Markdown code fence. Anything else malformed is an
/// error; the caller treats that as "stay silent".
pub fn parse_verdict(raw: &str) -> Result<Verdict, JudgeError> {
    let payload = strip_code_fence(raw);
    serde_json::from_str(payload)
        .map_err(|e| JudgeError::MalformedVerdict(format!("{e}: {payload}")))
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    rest.trim()
}
