// ============================================
// src/recognition.rs
// 手書き文字認識 (外部の認識サービスに問い合わせる)
// ============================================

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;

use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str =
    "https://inputtools.google.com/request?itc=ja-t-i0-handwrit&app=translate";

/// 上位何番目までの候補に入っていれば正解とするか
pub const CANDIDATE_WINDOW: usize = 5;

/// 1画ぶんの座標 (x, y, 時刻ミリ秒)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    #[serde(default)]
    pub t: Vec<u64>,
}

/// 書かれた文字 (描画領域の大きさ + 画の一覧)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ink {
    pub width: u32,
    pub height: u32,
    pub strokes: Vec<Stroke>,
}

#[derive(Debug, Error)]
pub enum RecognitionError {
    #[error("何も書かれていません")]
    Empty,
    #[error("通信に失敗しました: {0}")]
    Http(#[from] reqwest::Error),
    #[error("認識サービスがエラーを返しました: {0}")]
    Rejected(String),
    #[error("認識結果の形式が正しくありません")]
    MalformedResponse,
}

/// 手書き文字認識の窓口
pub trait Recognizer {
    /// 第1候補リストを返す (可能性の高い順)
    fn recognize(&self, ink: &Ink) -> Result<Vec<String>, RecognitionError>;
}

/// HTTP で認識サービスに問い合わせる
pub struct HttpRecognizer {
    client: reqwest::blocking::Client,
    endpoint: String,
}

impl HttpRecognizer {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, RecognitionError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

/// 送信する JSON を組み立てる
pub fn request_body(ink: &Ink) -> Value {
    let strokes: Vec<Value> = ink
        .strokes
        .iter()
        .map(|s| json!([s.x, s.y, s.t]))
        .collect();
    json!({
        "options": "enable_pre_space",
        "requests": [{
            "writing_guide": {
                "writing_area_width": ink.width,
                "writing_area_height": ink.height,
            },
            "ink": strokes,
            "language": "ja",
        }],
    })
}

/// `["SUCCESS", [[id, [候補...], ...]]]` から候補リストを取り出す
pub fn parse_response(body: &Value) -> Result<Vec<String>, RecognitionError> {
    let status = body
        .get(0)
        .and_then(Value::as_str)
        .ok_or(RecognitionError::MalformedResponse)?;
    if status != "SUCCESS" {
        return Err(RecognitionError::Rejected(status.to_string()));
    }
    let candidates = body
        .get(1)
        .and_then(|r| r.get(0))
        .and_then(|r| r.get(1))
        .and_then(Value::as_array)
        .ok_or(RecognitionError::MalformedResponse)?;
    Ok(candidates
        .iter()
        .filter_map(Value::as_str)
        .map(str::to_string)
        .collect())
}

impl Recognizer for HttpRecognizer {
    fn recognize(&self, ink: &Ink) -> Result<Vec<String>, RecognitionError> {
        if ink.strokes.is_empty() {
            return Err(RecognitionError::Empty);
        }
        let body: Value = self
            .client
            .post(&self.endpoint)
            .json(&request_body(ink))
            .send()?
            .error_for_status()?
            .json()?;
        log::debug!("認識結果: {body}");
        parse_response(&body)
    }
}

/// 書いた文字が期待した文字として認識されたか
pub fn grade(recognizer: &dyn Recognizer, ink: &Ink, expected: &str) -> Result<bool, RecognitionError> {
    let candidates = recognizer.recognize(ink)?;
    Ok(candidates
        .iter()
        .take(CANDIDATE_WINDOW)
        .any(|c| c == expected))
}
