//! Completion request and response types

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Parameters of one completion call, taken from committed form values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest
{   /// Single user turn
    pub user_message: String
  , /// System instruction
    pub system_instruction: String
  , /// Model identifier
    pub model: String
  , /// Generation cap
    pub max_output_tokens: u32
  , /// Sampling temperature
    pub temperature: f32
}

/// One block of response content.
/// Anything that is not a text block is kept verbatim.
#[derive(Debug, Clone, PartialEq)]
#[derive(Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum ContentBlock
{   Text(String)
  , Other(Value)
}

impl From<Value> for ContentBlock
{   fn from(value: Value) -> Self
    {   let text = match (value.get("type"), value.get("text"))
        {   (Some(Value::String(kind)), Some(Value::String(text)))
              if kind == "text" => Some(text.clone())
          , _ => None
        };
        match text
        {   Some(text) => ContentBlock::Text(text)
          , None => ContentBlock::Other(value)
        }
    }
}

impl From<ContentBlock> for Value
{   fn from(block: ContentBlock) -> Self
    {   match block
        {   ContentBlock::Text(text) => {
              serde_json::json!({ "type": "text", "text": text })
            }
          , ContentBlock::Other(value) => value
        }
    }
}

/// How a block is shown to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayBlock<'a>
{   /// Text split into display lines on '\n'
    Lines(Vec<&'a str>)
  , /// Pretty-printed JSON of an opaque block
    Verbatim(String)
}

impl ContentBlock
{   pub fn display(&self) -> DisplayBlock<'_>
    {   match self
        {   ContentBlock::Text(text) => {
              DisplayBlock::Lines(text.split('\n').collect())
            }
          , ContentBlock::Other(value) => {
              DisplayBlock::Verbatim(
                serde_json::to_string_pretty(value)
                  .unwrap_or_else(|_| value.to_string())
              )
            }
        }
    }
}

/// Token accounting reported by the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[derive(Serialize, Deserialize)]
pub struct Usage
{   pub input_tokens: u64
  , pub output_tokens: u64
}

/// Completion response; immutable once received
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message
{   pub id: String
  , #[serde(rename = "type", default = "message_type")]
    pub kind: String
  , pub role: String
  , pub model: String
  , pub content: Vec<ContentBlock>
  , pub stop_reason: Option<String>
  , #[serde(default)]
    pub stop_sequence: Option<String>
  , #[serde(default)]
    pub usage: Usage
}

fn message_type() -> String
{   "message".to_string()
}

impl Message
{   /// Canned response shown before the first real submission
    pub fn example() -> Self
    {   Message
        {   id: "id".to_string()
          , kind: message_type()
          , role: "assistant".to_string()
          , model: crate::DEFAULT_MODEL.to_string()
          , content: vec![
              ContentBlock::Text(
                "Artificial mind\n\
                 Silicon dreams, language's dance\n\
                 I am Claude, AI".to_string()
              )
            ]
          , stop_reason: Some("end_turn".to_string())
          , stop_sequence: None
          , usage: Usage
            {   input_tokens: 19
              , output_tokens: 18
            }
        }
    }

    /// Every display line of every text block, in order
    pub fn text_lines(&self) -> Vec<&str>
    {   self.content.iter()
          .filter_map(|block| match block
          {   ContentBlock::Text(text) => Some(text.split('\n'))
            , ContentBlock::Other(_) => None
          })
          .flatten()
          .collect()
    }
}

#[cfg(test)]
mod tests
{   use super::*;

    #[test]
    fn parses_provider_message_with_opaque_block()
    {   let body = r#"{
          "id": "msg_01",
          "type": "message",
          "role": "assistant",
          "model": "claude-3-5-sonnet-20240620",
          "content": [
            {"type": "text", "text": "a\nb"},
            {"type": "tool_use", "id": "t1", "name": "calc", "input": {}}
          ],
          "stop_reason": "end_turn",
          "stop_sequence": null,
          "usage": {"input_tokens": 3, "output_tokens": 4}
        }"#;
        let msg: Message = serde_json::from_str(body).unwrap();
        assert_eq!(msg.content.len(), 2);
        assert_eq!(msg.content[0], ContentBlock::Text("a\nb".to_string()));
        assert_eq!(msg.content[0].display(), DisplayBlock::Lines(vec!["a", "b"]));
        match &msg.content[1]
        {   ContentBlock::Other(v) => assert_eq!(v["name"], "calc")
          , other => panic!("expected opaque block, got {:?}", other)
        }
        assert_eq!(msg.usage.output_tokens, 4);
    }

    #[test]
    fn example_has_three_lines()
    {   let msg = Message::example();
        assert_eq!(
          msg.text_lines(),
          vec![
            "Artificial mind",
            "Silicon dreams, language's dance",
            "I am Claude, AI",
          ]
        );
    }

    #[test]
    fn text_block_serializes_with_type_tag()
    {   let v = serde_json::to_value(ContentBlock::Text("x".into())).unwrap();
        assert_eq!(v, serde_json::json!({"type": "text", "text": "x"}));
    }
}
