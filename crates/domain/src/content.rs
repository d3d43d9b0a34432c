//! # コンテンツ正規化
//!
//! 上流から届くアドバイス・次のステップのデータは、配列・オブジェクト・
//! JSON 文字列・自由記述のいずれの形でも届き得る。これを表示用の
//! 空でない文字列リスト（正規リスト）に変換する。
//!
//! ## 変換規則（入力の形で分岐）
//!
//! | 入力 | 結果 |
//! |------|------|
//! | 欠落 / `null` | 既定リスト |
//! | 配列 | 空でない文字列要素（trim 済み）を順序どおり。空なら既定リスト |
//! | オブジェクト | 値が空でない文字列のエントリごとに 1 行。`dimension_advice` のみ次元ラベルを前置。空なら既定リスト |
//! | 文字列 | JSON として解釈し配列/オブジェクトなら上の規則へ。JSON 文字列リテラルなら中身を 1 要素に。解釈できなければ文字列そのものを 1 要素として保持 |
//! | その他 | 既定リスト |
//!
//! 出力は常に空でなく、各要素は trim 済みの空でない文字列になる。

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::IntoStaticStr;

/// 正規化対象のフィールド
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    IntoStaticStr,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ContentField {
    /// 次元別アドバイス（次元キー → アドバイス）
    DimensionAdvice,
    /// 次のステップ
    NextSteps,
}

/// 次元キーと表示ラベルの対応表
const DIMENSION_LABELS: &[(&str, &str)] = &[
    ("time_management", "时间管理"),
    ("learning_method", "学习方法"),
    ("self_discipline", "自律能力"),
    ("focus", "专注力"),
    ("goal_setting", "目标设定"),
    ("stress_management", "压力管理"),
    ("communication", "沟通表达"),
];

const DEFAULT_DIMENSION_ADVICE: &[&str] = &[
    "保持良好的学习与生活习惯，定期回顾自己的进步。",
    "优先改进得分较低的维度，每次专注一个小目标。",
];

const DEFAULT_NEXT_STEPS: &[&str] = &[
    "查看完整测评报告，了解各维度的详细分析。",
    "制定一个为期一周的小目标并坚持执行。",
    "一个月后重新测评，检验改进效果。",
];

impl ContentField {
    /// 既定リスト（空でない固定の汎用文言）
    pub fn default_list(self) -> Vec<String> {
        let items = match self {
            Self::DimensionAdvice => DEFAULT_DIMENSION_ADVICE,
            Self::NextSteps => DEFAULT_NEXT_STEPS,
        };
        items.iter().map(|s| (*s).to_string()).collect()
    }

    /// オブジェクト形式のエントリを 1 行に整形する
    ///
    /// `next_steps` はラベルを付けない。未知の次元キーは trim したキーをそのままラベルにし、
    /// 空白だけのキーはラベルなしで値のみとする。
    fn format_entry(self, key: &str, value: &str) -> String {
        let key = key.trim();
        match self {
            Self::DimensionAdvice if !key.is_empty() => {
                format!("{}: {value}", dimension_label(key))
            }
            Self::DimensionAdvice | Self::NextSteps => value.to_string(),
        }
    }
}

/// 次元キーの表示ラベル
pub fn dimension_label(key: &str) -> &str {
    DIMENSION_LABELS
        .iter()
        .find(|(k, _)| *k == key)
        .map_or(key, |&(_, label)| label)
}

/// 入力の形
enum RawShape<'a> {
    Missing,
    List(&'a [Value]),
    Mapping(&'a Map<String, Value>),
    Text(&'a str),
    Other,
}

impl<'a> RawShape<'a> {
    fn detect(raw: Option<&'a Value>) -> Self {
        match raw {
            None | Some(Value::Null) => Self::Missing,
            Some(Value::Array(items)) => Self::List(items),
            Some(Value::Object(map)) => Self::Mapping(map),
            Some(Value::String(text)) => Self::Text(text),
            Some(Value::Bool(_) | Value::Number(_)) => Self::Other,
        }
    }
}

/// 上流データを正規リストに変換する
///
/// 結果は空にならない。使えない入力は `field` の既定リストに置き換わる。
pub fn normalize(field: ContentField, raw: Option<&Value>) -> Vec<String> {
    normalize_shape(field, RawShape::detect(raw)).unwrap_or_else(|| field.default_list())
}

fn normalize_shape(field: ContentField, shape: RawShape<'_>) -> Option<Vec<String>> {
    match shape {
        RawShape::Missing | RawShape::Other => None,
        RawShape::List(items) => non_empty(from_list(items)),
        RawShape::Mapping(map) => non_empty(from_mapping(field, map)),
        RawShape::Text(text) => match serde_json::from_str::<Value>(text) {
            Ok(Value::Array(items)) => non_empty(from_list(&items)),
            Ok(Value::Object(map)) => non_empty(from_mapping(field, &map)),
            Ok(Value::Null) => None,
            // JSON 文字列リテラルは引用符を外した中身を使う
            Ok(Value::String(inner)) => trimmed(&inner).map(|item| vec![item]),
            // 解釈できない・数値や真偽値になる文字列は自由記述として残す
            Ok(Value::Bool(_) | Value::Number(_)) | Err(_) => {
                trimmed(text).map(|item| vec![item])
            }
        },
    }
}

fn from_list(items: &[Value]) -> Vec<String> {
    items
        .iter()
        .filter_map(Value::as_str)
        .filter_map(trimmed)
        .collect()
}

fn from_mapping(field: ContentField, map: &Map<String, Value>) -> Vec<String> {
    map.iter()
        .filter_map(|(key, value)| {
            let value = value.as_str().and_then(trimmed)?;
            Some(field.format_entry(key, &value))
        })
        .collect()
}

fn trimmed(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

fn non_empty(items: Vec<String>) -> Option<Vec<String>> {
    (!items.is_empty()).then_some(items)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_配列は空要素を除きtrimして順序を保つ() {
        let raw = json!(["a", "", " b "]);

        assert_eq!(
            normalize(ContentField::NextSteps, Some(&raw)),
            strings(&["a", "b"])
        );
    }

    #[test]
    fn test_空オブジェクトは既定リストになる() {
        let raw = json!({});

        assert_eq!(
            normalize(ContentField::NextSteps, Some(&raw)),
            ContentField::NextSteps.default_list()
        );
    }

    #[test]
    fn test_jsonでない文字列はそのまま1要素になる() {
        let raw = json!("not json");

        assert_eq!(
            normalize(ContentField::NextSteps, Some(&raw)),
            strings(&["not json"])
        );
    }

    #[test]
    fn test_次元別アドバイスはラベルを前置する() {
        let raw = json!({ "time_management": "improve planning" });

        assert_eq!(
            normalize(ContentField::DimensionAdvice, Some(&raw)),
            strings(&["时间管理: improve planning"])
        );
    }

    #[test]
    fn test_次のステップのオブジェクトはラベルを付けない() {
        let raw = json!({ "time_management": "先做计划", "focus": " 关掉手机 " });

        assert_eq!(
            normalize(ContentField::NextSteps, Some(&raw)),
            strings(&["先做计划", "关掉手机"])
        );
    }

    #[test]
    fn test_オブジェクトは挿入順を保つ() {
        let raw: Value =
            serde_json::from_str(r#"{"stress_management": "b", "communication": "a"}"#).unwrap();

        assert_eq!(
            normalize(ContentField::DimensionAdvice, Some(&raw)),
            strings(&["压力管理: b", "沟通表达: a"])
        );
    }

    #[test]
    fn test_未知の次元キーはキーをラベルにする() {
        let raw = json!({ "creativity": "多尝试新方法" });

        assert_eq!(
            normalize(ContentField::DimensionAdvice, Some(&raw)),
            strings(&["creativity: 多尝试新方法"])
        );
    }

    #[test]
    fn test_json文字列の配列は配列として扱う() {
        let raw = json!(r#"["第一步", "  ", "第二步"]"#);

        assert_eq!(
            normalize(ContentField::NextSteps, Some(&raw)),
            strings(&["第一步", "第二步"])
        );
    }

    #[test]
    fn test_json文字列のオブジェクトはオブジェクトとして扱う() {
        let raw = json!(r#"{"focus": "每天专注 25 分钟"}"#);

        assert_eq!(
            normalize(ContentField::DimensionAdvice, Some(&raw)),
            strings(&["专注力: 每天专注 25 分钟"])
        );
    }

    #[rstest]
    #[case::欠落(None)]
    #[case::null(Some(json!(null)))]
    #[case::数値(Some(json!(42)))]
    #[case::真偽値(Some(json!(true)))]
    #[case::空配列(Some(json!([])))]
    #[case::非文字列の配列(Some(json!([1, null, {"a": "b"}])))]
    #[case::空白だけの配列(Some(json!(["  ", ""])))]
    #[case::値が空のオブジェクト(Some(json!({"focus": "  ", "communication": 3})))]
    #[case::空文字列(Some(json!("")))]
    #[case::空白文字列(Some(json!("   ")))]
    #[case::json_nullの文字列(Some(json!("null")))]
    #[case::json空配列の文字列(Some(json!("[]")))]
    #[case::json空オブジェクトの文字列(Some(json!("{}")))]
    #[case::json空文字列リテラル(Some(json!(r#""""#)))]
    #[case::json空白文字列リテラル(Some(json!(r#""   ""#)))]
    fn test_使えない入力は既定リストになる(#[case] raw: Option<Value>) {
        for field in [ContentField::DimensionAdvice, ContentField::NextSteps] {
            assert_eq!(normalize(field, raw.as_ref()), field.default_list());
        }
    }

    #[rstest]
    #[case(json!(null))]
    #[case(json!(["a", "", " b "]))]
    #[case(json!({"time_management": "x", "bad": 1}))]
    #[case(json!("free text"))]
    #[case(json!("  padded  "))]
    #[case(json!("123"))]
    #[case(json!(r#"["x"]"#))]
    #[case(json!([[], {}, ""]))]
    #[case(json!(3.5))]
    #[case(json!({" ": "x"}))]
    #[case(json!({"": "x"}))]
    #[case(json!({"time_management ": "x"}))]
    #[case(json!({" creativity\t": " y "}))]
    #[case(json!(r#"{" ": "x", "focus": "z"}"#))]
    #[case(json!(r#"" hi ""#))]
    #[case(json!(r#""""#))]
    fn test_結果は常に空でなくtrim済みの要素だけになる(#[case] raw: Value) {
        for field in [ContentField::DimensionAdvice, ContentField::NextSteps] {
            let result = normalize(field, Some(&raw));

            assert!(!result.is_empty());
            assert!(
                result
                    .iter()
                    .all(|s| !s.is_empty() && s.trim() == s.as_str()),
                "{result:?}"
            );
        }
    }

    #[test]
    fn test_次元キーは前後の空白を除いてラベルを引く() {
        let raw = json!({ "time_management ": "x", " creativity ": "y" });

        assert_eq!(
            normalize(ContentField::DimensionAdvice, Some(&raw)),
            strings(&["时间管理: x", "creativity: y"])
        );
    }

    #[test]
    fn test_空白だけの次元キーは値だけを残す() {
        let raw = json!({ " ": "x", "": "y" });

        assert_eq!(
            normalize(ContentField::DimensionAdvice, Some(&raw)),
            strings(&["x", "y"])
        );
    }

    #[test]
    fn test_json文字列リテラルは引用符を外した中身になる() {
        let raw = json!(r#"" 先做计划 ""#);

        assert_eq!(
            normalize(ContentField::NextSteps, Some(&raw)),
            strings(&["先做计划"])
        );
    }

    #[test]
    fn test_スカラーになるjson文字列は自由記述として残す() {
        let raw = json!(" 123 ");

        assert_eq!(
            normalize(ContentField::NextSteps, Some(&raw)),
            strings(&["123"])
        );
    }

    #[test]
    fn test_既定リストはどのフィールドも空でない() {
        assert!(!ContentField::DimensionAdvice.default_list().is_empty());
        assert!(!ContentField::NextSteps.default_list().is_empty());
    }
}
