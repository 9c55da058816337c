//! 署名レビューの型定義
//!
//! CLIとセッションで共有される型:
//! - SignatureRecord: 抽出された署名行（オペレータが編集可能）
//! - ReviewStatus: エントリのレビュー状態
//! - CandidateMatch / MatchResultSet: 照合サービスが返す有権者候補

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// 抽出された署名レコード
///
/// `signature_line` は表示用の値であり、オペレータが編集できるため
/// 識別子としては使わない（セッション側で `EntryId` を振る）。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureRecord {
    pub signature_line: String,

    #[serde(default)]
    pub date: String,

    #[serde(default)]
    pub first_name: String,

    #[serde(default)]
    pub last_name: String,

    #[serde(default, deserialize_with = "empty_as_none")]
    pub address_number: Option<String>,

    #[serde(default, deserialize_with = "empty_as_none")]
    pub address_name: Option<String>,
}

impl SignatureRecord {
    /// 氏名（表示用）
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }

    /// 住所（表示用）
    pub fn address(&self) -> String {
        let parts: Vec<&str> = [self.address_number.as_deref(), self.address_name.as_deref()]
            .into_iter()
            .flatten()
            .collect();
        parts.join(" ")
    }

    /// 前後の空白を除去し、空の住所項目を `None` にする
    pub fn normalized(self) -> Self {
        let optional = |value: Option<String>| {
            value
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        };
        Self {
            signature_line: self.signature_line.trim().to_string(),
            date: self.date.trim().to_string(),
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            address_number: optional(self.address_number),
            address_name: optional(self.address_name),
        }
    }

    /// 必須項目のうち空のものを返す
    pub fn missing_required_fields(&self) -> Vec<&'static str> {
        let required = [
            ("signature_line", &self.signature_line),
            ("date", &self.date),
            ("first_name", &self.first_name),
            ("last_name", &self.last_name),
        ];
        required
            .iter()
            .filter(|(_, v)| v.trim().is_empty())
            .map(|(name, _)| *name)
            .collect()
    }
}

fn empty_as_none<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.and_then(|s| {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }))
}

/// レビュー状態
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    /// 未処理
    #[default]
    Default,
    /// 候補を確定済み
    Matched,
    /// 該当なし
    NoMatch,
}

impl ReviewStatus {
    pub fn is_decided(&self) -> bool {
        !matches!(self, ReviewStatus::Default)
    }
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReviewStatus::Default => write!(f, "pending"),
            ReviewStatus::Matched => write!(f, "matched"),
            ReviewStatus::NoMatch => write!(f, "no match"),
        }
    }
}

/// 照合方法
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMethod {
    #[default]
    Exact,
    Address,
    FuzzyName,
    FuzzyAddress,
}

impl MatchMethod {
    /// 表示順
    pub const ALL: [MatchMethod; 4] = [
        MatchMethod::Exact,
        MatchMethod::Address,
        MatchMethod::FuzzyName,
        MatchMethod::FuzzyAddress,
    ];

    /// レスポンス内のリスト名
    pub fn list_key(&self) -> &'static str {
        match self {
            MatchMethod::Exact => "exact_matches",
            MatchMethod::Address => "address_matches",
            MatchMethod::FuzzyName => "fuzzy_name_matches",
            MatchMethod::FuzzyAddress => "fuzzy_address_matches",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MatchMethod::Exact => "EXACT MATCHES",
            MatchMethod::Address => "ADDRESS MATCHES",
            MatchMethod::FuzzyName => "FUZZY NAME MATCHES",
            MatchMethod::FuzzyAddress => "FUZZY ADDRESS MATCHES",
        }
    }
}

/// 有権者名簿の候補
///
/// 照合サービスが返したオブジェクトをそのまま保持する。確定時には
/// 受け取った内容を改変せずに送り返すので、`null` の項目や未知の項目も
/// 残る。既知の項目は読み取り用のアクセサで参照する。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CandidateMatch {
    /// どのリストから来たか（レスポンスには含まれない）
    #[serde(skip)]
    pub method: MatchMethod,

    fields: Map<String, Value>,
}

impl CandidateMatch {
    pub const FIRST_NAME: &'static str = "FirstName";
    pub const LAST_NAME: &'static str = "LastName";
    pub const STREET_NUMBER: &'static str = "RegStreetNumber";
    pub const STREET_NAME: &'static str = "RegStreetName";
    pub const PARTY: &'static str = "PoliticalParty";
    pub const FUZZY_SCORE: &'static str = "fuzzy_score";
    pub const ADDRESS_FUZZY_SCORE: &'static str = "address_fuzzy_score";

    pub fn new(method: MatchMethod) -> Self {
        Self {
            method,
            fields: Map::new(),
        }
    }

    /// 項目を追加する
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    /// 受け取ったままの全項目
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// 文字列項目（`null`・欠落・文字列以外は `None`）
    fn text(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    pub fn first_name(&self) -> &str {
        self.text(Self::FIRST_NAME).unwrap_or_default()
    }

    pub fn last_name(&self) -> &str {
        self.text(Self::LAST_NAME).unwrap_or_default()
    }

    /// 番地（数値で返るサービスもある）
    pub fn street_number(&self) -> Option<String> {
        match self.fields.get(Self::STREET_NUMBER) {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Null) | None => None,
            Some(other) => Some(other.to_string()),
        }
    }

    pub fn street_name(&self) -> Option<&str> {
        self.text(Self::STREET_NAME)
    }

    pub fn party(&self) -> Option<&str> {
        self.text(Self::PARTY)
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name(), self.last_name()).trim().to_string()
    }

    pub fn address(&self) -> String {
        format!(
            "{} {}",
            self.street_number().unwrap_or_default(),
            self.street_name().unwrap_or_default()
        )
        .trim()
        .to_string()
    }

    /// あいまい照合スコア（名前優先）
    pub fn score(&self) -> Option<f64> {
        let number = |key: &str| self.fields.get(key).and_then(Value::as_f64);
        number(Self::FUZZY_SCORE).or_else(|| number(Self::ADDRESS_FUZZY_SCORE))
    }
}

/// 1レコード分の照合結果（方法別の4リスト）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchResultSet {
    #[serde(rename = "exact_matches", default)]
    pub exact: Vec<CandidateMatch>,

    #[serde(rename = "address_matches", default)]
    pub address: Vec<CandidateMatch>,

    #[serde(rename = "fuzzy_name_matches", default)]
    pub fuzzy_name: Vec<CandidateMatch>,

    #[serde(rename = "fuzzy_address_matches", default)]
    pub fuzzy_address: Vec<CandidateMatch>,
}

impl MatchResultSet {
    pub fn matches(&self, method: MatchMethod) -> &[CandidateMatch] {
        match method {
            MatchMethod::Exact => &self.exact,
            MatchMethod::Address => &self.address,
            MatchMethod::FuzzyName => &self.fuzzy_name,
            MatchMethod::FuzzyAddress => &self.fuzzy_address,
        }
    }

    fn matches_mut(&mut self, method: MatchMethod) -> &mut Vec<CandidateMatch> {
        match method {
            MatchMethod::Exact => &mut self.exact,
            MatchMethod::Address => &mut self.address,
            MatchMethod::FuzzyName => &mut self.fuzzy_name,
            MatchMethod::FuzzyAddress => &mut self.fuzzy_address,
        }
    }

    /// 各候補の `method` をリストに合わせて設定する
    pub fn tag_methods(&mut self) {
        for method in MatchMethod::ALL {
            for candidate in self.matches_mut(method).iter_mut() {
                candidate.method = method;
            }
        }
    }

    /// 方法順に全候補を列挙
    pub fn iter(&self) -> impl Iterator<Item = &CandidateMatch> {
        MatchMethod::ALL
            .into_iter()
            .flat_map(move |m| self.matches(m).iter())
    }

    pub fn candidate(&self, method: MatchMethod, index: usize) -> Option<&CandidateMatch> {
        self.matches(method).get(index)
    }

    pub fn total(&self) -> usize {
        MatchMethod::ALL.iter().map(|m| self.matches(*m).len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// 確定リクエストの応答
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ack {
    #[serde(default)]
    pub message: Option<String>,
}
